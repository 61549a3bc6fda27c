use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;

/// Butterworth band-pass order.
pub const FILTER_ORDER: usize = 4;
/// Quality factor of the mains notch.
pub const NOTCH_Q: f64 = 30.0;
/// Substituted for a non-positive power denominator.
pub const POWER_EPSILON: f64 = 1e-12;
/// Fused ratios are renormalized when their sum drifts further than this from 1.
pub const RENORM_TOLERANCE: f64 = 1e-6;

/// The five canonical EEG bands, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Gamma,
    Beta,
    Alpha,
    Theta,
    Delta,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Gamma, Band::Beta, Band::Alpha, Band::Theta, Band::Delta];

    pub fn index(self) -> usize {
        match self {
            Band::Gamma => 0,
            Band::Beta => 1,
            Band::Alpha => 2,
            Band::Theta => 3,
            Band::Delta => 4,
        }
    }
}

/// Closed frequency interval in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyRange {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

/// Band name to interval mapping plus the normalization interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandTable {
    pub gamma: FrequencyRange,
    pub beta: FrequencyRange,
    pub alpha: FrequencyRange,
    pub theta: FrequencyRange,
    pub delta: FrequencyRange,
    /// Interval integrated for the ratio denominator.
    pub total: FrequencyRange,
}

impl Default for BandTable {
    fn default() -> Self {
        Self {
            gamma: FrequencyRange::new(30.0, 45.0),
            beta: FrequencyRange::new(14.0, 30.0),
            alpha: FrequencyRange::new(8.0, 14.0),
            theta: FrequencyRange::new(4.0, 8.0),
            delta: FrequencyRange::new(0.5, 4.0),
            total: FrequencyRange::new(0.5, 45.0),
        }
    }
}

impl BandTable {
    pub fn range(&self, band: Band) -> FrequencyRange {
        match band {
            Band::Gamma => self.gamma,
            Band::Beta => self.beta,
            Band::Alpha => self.alpha,
            Band::Theta => self.theta,
            Band::Delta => self.delta,
        }
    }
}

/// Immutable filter parameters derived from an [`AnalysisConfig`] for one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub sample_rate_hz: f64,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub notch_hz: f64,
    pub order: usize,
    pub notch_q: f64,
}

impl FilterSpec {
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz * 0.5
    }
}

/// Every tunable of the focus/relax analysis. Missing fields deserialize to defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate_hz: f64,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub notch_hz: f64,
    /// Welch segment length in samples.
    pub nperseg: usize,
    /// Welch overlap as a fraction of `nperseg`.
    pub overlap: f64,
    pub base_focus: f64,
    pub base_relax: f64,
    pub focus_gain: f64,
    pub relax_gain: f64,
    /// Weight of the EEG channel; each EOG channel receives half the remainder.
    pub eeg_weight: f64,
    pub filter_order: usize,
    pub notch_q: f64,
    pub bands: BandTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            lowcut_hz: 1.0,
            highcut_hz: 45.0,
            notch_hz: 50.0,
            nperseg: 512,
            overlap: 0.5,
            base_focus: 10.0,
            base_relax: 10.0,
            focus_gain: 1.0,
            relax_gain: 1.0,
            eeg_weight: 0.8,
            filter_order: FILTER_ORDER,
            notch_q: NOTCH_Q,
            bands: BandTable::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_sample_rate(mut self, sample_rate_hz: f64) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let nyquist = self.sample_rate_hz * 0.5;
        if !(self.lowcut_hz > 0.0 && self.lowcut_hz < self.highcut_hz && self.highcut_hz < nyquist)
        {
            return Err(AnalysisError::InvalidCutoff {
                low: self.lowcut_hz,
                high: self.highcut_hz,
                nyquist,
            });
        }
        if !(self.notch_hz > 0.0 && self.notch_hz < nyquist) {
            return Err(AnalysisError::InvalidNotch {
                freq: self.notch_hz,
                nyquist,
            });
        }
        if self.filter_order == 0 {
            return Err(AnalysisError::InvalidOrder(self.filter_order));
        }
        if !(self.notch_q.is_finite() && self.notch_q > 0.0) {
            return Err(AnalysisError::InvalidQuality(self.notch_q));
        }
        if self.nperseg < 2 {
            return Err(AnalysisError::InvalidSegment(self.nperseg));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(AnalysisError::InvalidOverlap(self.overlap));
        }
        if !(0.0..=1.0).contains(&self.eeg_weight) {
            return Err(AnalysisError::InvalidWeight(self.eeg_weight));
        }
        Ok(())
    }

    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            sample_rate_hz: self.sample_rate_hz,
            lowcut_hz: self.lowcut_hz,
            highcut_hz: self.highcut_hz,
            notch_hz: self.notch_hz,
            order: self.filter_order,
            notch_q: self.notch_q,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_validate() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        let spec = config.filter_spec();
        assert_eq!(spec.order, 4);
        assert_eq!(spec.notch_q, 30.0);
        assert_eq!(spec.nyquist_hz(), 125.0);
    }
    #[test]
    fn notch_above_nyquist_is_rejected() {
        // 50 Hz mains cannot be notched at 100 Hz sampling.
        let config = AnalysisConfig {
            highcut_hz: 40.0,
            ..AnalysisConfig::default()
        }
        .with_sample_rate(100.0);
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidNotch { .. })
        ));
    }
    #[test]
    fn degenerate_filter_parameters_are_rejected() {
        let zero_order = AnalysisConfig {
            filter_order: 0,
            ..AnalysisConfig::default()
        };
        assert_eq!(zero_order.validate(), Err(AnalysisError::InvalidOrder(0)));
        for q in [0.0, -30.0, f64::INFINITY] {
            let config = AnalysisConfig {
                notch_q: q,
                ..AnalysisConfig::default()
            };
            assert_eq!(config.validate(), Err(AnalysisError::InvalidQuality(q)));
        }
        let config: AnalysisConfig = serde_json::from_str(r#"{"notch_q": 0.0}"#).unwrap();
        assert!(config.validate().is_err());
    }
    #[test]
    fn partial_json_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"eeg_weight": 1.0, "nperseg": 256}"#).unwrap();
        assert_eq!(config.eeg_weight, 1.0);
        assert_eq!(config.nperseg, 256);
        assert_eq!(config.sample_rate_hz, 250.0);
        assert_eq!(config.bands.alpha, FrequencyRange::new(8.0, 14.0));
    }
    #[test]
    fn band_table_covers_total_range() {
        let table = BandTable::default();
        let low = Band::ALL
            .iter()
            .map(|b| table.range(*b).low_hz)
            .fold(f64::MAX, f64::min);
        let high = Band::ALL
            .iter()
            .map(|b| table.range(*b).high_hz)
            .fold(f64::MIN, f64::max);
        assert_eq!(FrequencyRange::new(low, high), table.total);
    }
}
