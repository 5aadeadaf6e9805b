//! Sweep orchestration: nested enumeration, failure policy, and mesh
//! bookkeeping.
//!
//! A sweep enumerates the Cartesian product of its dimensions in a fixed
//! nested order, outermost to innermost, and for each point runs the same
//! sequence: frame setup, run control, aggregation, persistence. Result
//! rows land in the table in exact enumeration order; a failed point is
//! skipped, never reordered.
//!
//! Two failure policies exist and are deliberately distinct per sweep mode:
//!
//! - [`FailurePolicy::AbortOnError`] (propeller mode): any error terminates
//!   the sweep.
//! - [`FailurePolicy::ContinueOnError`] (attitude mode): I/O and numeric
//!   errors raised by a point's post-processing are logged and the sweep
//!   proceeds. Configuration errors — a named object absent from the engine
//!   session — abort under either policy, since the session does not match
//!   the script and no later point can succeed.

mod attitude;
mod propeller;

pub use attitude::{AttitudePoint, AttitudeSweep};
pub use propeller::{LadderStopping, PropellerGeometry, PropellerPoint, PropellerSweep};

use thiserror::Error;
use tracing::warn;

use crate::aggregate::AggregateError;
use crate::engine::EngineError;
use crate::io::{SeriesFileError, TableError};

/// Error policy applied to per-point post-processing failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any error terminates the sweep.
    AbortOnError,
    /// Recoverable post-processing errors are logged; the sweep continues
    /// with the next point.
    ContinueOnError,
}

/// Error type for a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Engine session failure (configuration or run)
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Exported series file unreadable
    #[error(transparent)]
    Series(#[from] SeriesFileError),

    /// Result table failure
    #[error(transparent)]
    Table(#[from] TableError),

    /// Aggregation or coefficient derivation failure
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl SweepError {
    /// Whether this error aborts the sweep even under
    /// [`FailurePolicy::ContinueOnError`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, SweepError::Engine(_))
    }
}

/// Point accounting for one sweep run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Points fully processed and appended to the table.
    pub completed: usize,
    /// Points whose post-processing failed and was absorbed.
    pub failed: usize,
}

impl SweepSummary {
    /// Total points attempted.
    pub fn attempted(&self) -> usize {
        self.completed + self.failed
    }
}

/// Apply the failure policy to one point's post-processing result.
///
/// Under [`FailurePolicy::ContinueOnError`], recoverable errors are logged
/// and counted; fatal errors and all errors under
/// [`FailurePolicy::AbortOnError`] propagate.
pub(crate) fn absorb_point_failure(
    policy: FailurePolicy,
    err: SweepError,
    title: &str,
    summary: &mut SweepSummary,
) -> Result<(), SweepError> {
    if policy == FailurePolicy::ContinueOnError && !err.is_fatal() {
        warn!(title, error = %err, "point failed, continuing sweep");
        summary.failed += 1;
        return Ok(());
    }
    Err(err)
}

/// Mesh generation counter.
///
/// Incremented once per mesh rebuild triggered by a mesh-affecting
/// dimension value — not once per sweep point — and reset when the sweep
/// re-enters the dimension from the top. The resulting [`MeshIndex`] keys
/// the per-mesh calibration table, so an off-by-one here silently
/// misaligns every normalized coefficient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshCounter {
    current: Option<usize>,
}

/// Index of the currently built mesh within one pass over the
/// mesh-affecting dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshIndex(usize);

impl MeshIndex {
    /// Wrap a raw index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index, for calibration table lookup.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl MeshCounter {
    /// Counter with no mesh built yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all built meshes (outer dimension changed).
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Record a mesh rebuild and return the new mesh's index.
    pub fn advance(&mut self) -> MeshIndex {
        let next = self.current.map_or(0, |c| c + 1);
        self.current = Some(next);
        MeshIndex(next)
    }

    /// Index of the most recently built mesh, if any.
    pub fn current(&self) -> Option<MeshIndex> {
        self.current.map(MeshIndex)
    }
}
