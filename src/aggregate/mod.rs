//! Windowed statistical aggregation of monitor series.
//!
//! After a run ends, each channel group's exported series is reduced to
//! summary statistics over the trailing revolution window: the last
//! `W = 360 / step_deg` samples, one full propeller revolution. Samples
//! before the window are excluded entirely, so start-up transients never
//! leak into the reported values.
//!
//! Which statistics a channel emits is declared per channel in a
//! [`ChannelSpec`] list consumed by one generic routine: most channels emit
//! the mean only, while the per-blade thrust and torque channels emit mean,
//! max, and min as three columns. Column order in the output follows the
//! declared channel list, never file positions.
//!
//! The no-window variant for steady configurations reads each monitor's
//! current instantaneous value instead; see
//! [`instantaneous_value`].

mod coefficients;

pub use coefficients::{
    Calibration, PropellerCoefficients, propeller_coefficients, IN_PER_FT, MPH_TO_FT_PER_S,
    WATER_DENSITY_SLUG_FT3,
};

use thiserror::Error;

use crate::io::MonitorSeries;

/// Error type for aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Zero-width window (angular step misconfigured)
    #[error("aggregation window is empty")]
    EmptyWindow,

    /// Fewer samples than one revolution
    #[error("series has {len} samples but one revolution spans {window}")]
    ShortSeries {
        /// Samples available
        len: usize,
        /// Samples required
        window: usize,
    },

    /// A declared channel is absent from the exported series
    #[error("channel '{0}' not present in exported series")]
    MissingChannel(String),

    /// No calibration entry for this mesh
    #[error("no submerged-area ratio for mesh index {0}")]
    MissingCalibration(usize),

    /// Calibration entry unusable as a divisor
    #[error("submerged-area ratio for mesh index {index} is not positive: {ratio}")]
    BadCalibration {
        /// Offending mesh index
        index: usize,
        /// Stored ratio
        ratio: f64,
    },

    /// A monitor reported a non-finite instantaneous value
    #[error("monitor '{monitor}' read a non-finite value: {value}")]
    NonFinite {
        /// Monitor name
        monitor: String,
        /// Offending value
        value: f64,
    },
}

/// Which statistics a channel emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStat {
    /// Mean over the window: one output column.
    Mean,
    /// Mean, max, and min over the window: three output columns.
    MeanMaxMin,
}

/// Declarative aggregation rule for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelSpec {
    /// Channel name as it appears in the series header.
    pub channel: String,
    /// Statistics to emit.
    pub stat: ChannelStat,
}

impl ChannelSpec {
    /// Channel emitting its windowed mean.
    pub fn mean(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            stat: ChannelStat::Mean,
        }
    }

    /// Channel emitting windowed mean, max, and min.
    pub fn mean_max_min(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            stat: ChannelStat::MeanMaxMin,
        }
    }
}

/// Summary statistics over one window of samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Largest sample.
    pub max: f64,
    /// Smallest sample.
    pub min: f64,
    /// Number of samples in the window.
    pub n: usize,
}

impl WindowStats {
    /// Compute statistics over `samples`.
    ///
    /// # Errors
    /// [`AggregateError::EmptyWindow`] if `samples` is empty.
    pub fn compute(samples: &[f64]) -> Result<Self, AggregateError> {
        if samples.is_empty() {
            return Err(AggregateError::EmptyWindow);
        }
        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(Self { mean, max, min, n })
    }
}

/// Aggregated statistics for one channel.
#[derive(Clone, Debug)]
pub struct ChannelAggregate {
    /// The rule that produced this entry.
    pub spec: ChannelSpec,
    /// Statistics over the trailing window.
    pub stats: WindowStats,
}

/// All channel aggregates for one series, in declaration order.
#[derive(Clone, Debug)]
pub struct AggregateReport {
    channels: Vec<ChannelAggregate>,
}

impl AggregateReport {
    /// Per-channel aggregates in declaration order.
    pub fn channels(&self) -> &[ChannelAggregate] {
        &self.channels
    }

    /// Windowed mean of a named channel.
    ///
    /// # Errors
    /// [`AggregateError::MissingChannel`] if the channel was not declared.
    pub fn mean(&self, channel: &str) -> Result<f64, AggregateError> {
        self.channels
            .iter()
            .find(|c| c.spec.channel == channel)
            .map(|c| c.stats.mean)
            .ok_or_else(|| AggregateError::MissingChannel(channel.to_string()))
    }

    /// Flatten to output columns: one per `Mean` channel, three
    /// (mean, max, min) per `MeanMaxMin` channel, in declaration order.
    pub fn columns(&self) -> Vec<f64> {
        let mut out = Vec::new();
        for c in &self.channels {
            match c.spec.stat {
                ChannelStat::Mean => out.push(c.stats.mean),
                ChannelStat::MeanMaxMin => {
                    out.push(c.stats.mean);
                    out.push(c.stats.max);
                    out.push(c.stats.min);
                }
            }
        }
        out
    }
}

/// Aggregate the trailing `window` samples of each declared channel.
///
/// `window` is the revolution span `360 / step_deg`
/// (see [`crate::run::revolution_steps`]). Samples before the window do not
/// influence the result.
///
/// # Errors
/// - [`AggregateError::EmptyWindow`] if `window` is zero
/// - [`AggregateError::ShortSeries`] if the series is shorter than `window`
/// - [`AggregateError::MissingChannel`] if a declared channel is absent
pub fn aggregate_revolution(
    series: &MonitorSeries,
    specs: &[ChannelSpec],
    window: usize,
) -> Result<AggregateReport, AggregateError> {
    if window == 0 {
        return Err(AggregateError::EmptyWindow);
    }
    if series.len() < window {
        return Err(AggregateError::ShortSeries {
            len: series.len(),
            window,
        });
    }

    let mut channels = Vec::with_capacity(specs.len());
    for spec in specs {
        let samples = series
            .channel(&spec.channel)
            .ok_or_else(|| AggregateError::MissingChannel(spec.channel.clone()))?;
        let tail = &samples[samples.len() - window..];
        channels.push(ChannelAggregate {
            spec: spec.clone(),
            stats: WindowStats::compute(tail)?,
        });
    }

    Ok(AggregateReport { channels })
}

/// Validate one instantaneous monitor readout (the no-window variant for
/// steady configurations).
///
/// # Errors
/// [`AggregateError::NonFinite`] if the monitor reported NaN or infinity,
/// which marks the point's solution as unusable.
pub fn instantaneous_value(monitor: &str, value: f64) -> Result<f64, AggregateError> {
    if !value.is_finite() {
        return Err(AggregateError::NonFinite {
            monitor: monitor.to_string(),
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series_of(channel: &str, samples: Vec<f64>) -> MonitorSeries {
        let iterations = (1..=samples.len()).map(|i| i as f64).collect();
        MonitorSeries::new(vec![channel.to_string()], iterations, vec![samples])
    }

    #[test]
    fn statistics_cover_only_the_trailing_window() {
        // Last four samples are 10, 20, 30, 40 in both series; everything
        // before the window differs wildly and must not matter.
        let a = series_of("Thrust", vec![0.0, 0.0, 1e6, 10.0, 20.0, 30.0, 40.0]);
        let b = series_of("Thrust", vec![-1e9, 7.0, 3.5, 10.0, 20.0, 30.0, 40.0]);
        let specs = [ChannelSpec::mean_max_min("Thrust")];

        let ra = aggregate_revolution(&a, &specs, 4).unwrap();
        let rb = aggregate_revolution(&b, &specs, 4).unwrap();

        for report in [&ra, &rb] {
            let stats = report.channels()[0].stats;
            assert_relative_eq!(stats.mean, 25.0);
            assert_relative_eq!(stats.max, 40.0);
            assert_relative_eq!(stats.min, 10.0);
            assert_eq!(stats.n, 4);
        }
    }

    #[test]
    fn series_exactly_one_window_long_is_accepted() {
        let s = series_of("Thrust", vec![1.0, 2.0, 3.0]);
        let report = aggregate_revolution(&s, &[ChannelSpec::mean("Thrust")], 3).unwrap();
        assert_relative_eq!(report.mean("Thrust").unwrap(), 2.0);
    }

    #[test]
    fn short_series_is_rejected() {
        let s = series_of("Thrust", vec![1.0, 2.0]);
        match aggregate_revolution(&s, &[ChannelSpec::mean("Thrust")], 3) {
            Err(AggregateError::ShortSeries { len, window }) => {
                assert_eq!(len, 2);
                assert_eq!(window, 3);
            }
            other => panic!("expected ShortSeries, got {:?}", other),
        }
    }

    #[test]
    fn zero_window_is_rejected() {
        let s = series_of("Thrust", vec![1.0]);
        assert!(matches!(
            aggregate_revolution(&s, &[ChannelSpec::mean("Thrust")], 0),
            Err(AggregateError::EmptyWindow)
        ));
    }

    #[test]
    fn undeclared_channel_is_rejected() {
        let s = series_of("Thrust", vec![1.0, 2.0]);
        assert!(matches!(
            aggregate_revolution(&s, &[ChannelSpec::mean("Torque")], 2),
            Err(AggregateError::MissingChannel(name)) if name == "Torque"
        ));
    }

    #[test]
    fn columns_expand_mean_max_min_channels() {
        let iterations = vec![1.0, 2.0];
        let series = MonitorSeries::new(
            vec!["Lift".to_string(), "Blade Thrust".to_string()],
            iterations,
            vec![vec![4.0, 6.0], vec![10.0, 30.0]],
        );
        let specs = [
            ChannelSpec::mean("Lift"),
            ChannelSpec::mean_max_min("Blade Thrust"),
        ];

        let report = aggregate_revolution(&series, &specs, 2).unwrap();
        let columns = report.columns();

        assert_eq!(columns.len(), 4);
        assert_relative_eq!(columns[0], 5.0); // Lift mean
        assert_relative_eq!(columns[1], 20.0); // Blade Thrust mean
        assert_relative_eq!(columns[2], 30.0); // Blade Thrust max
        assert_relative_eq!(columns[3], 10.0); // Blade Thrust min
    }

    #[test]
    fn instantaneous_rejects_non_finite() {
        assert_eq!(instantaneous_value("Fx", 1.5).unwrap(), 1.5);
        assert!(matches!(
            instantaneous_value("Fx", f64::NAN),
            Err(AggregateError::NonFinite { .. })
        ));
        assert!(matches!(
            instantaneous_value("Fx", f64::INFINITY),
            Err(AggregateError::NonFinite { .. })
        ));
    }
}
