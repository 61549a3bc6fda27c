use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisConfig, BandRatios, POWER_EPSILON, RENORM_TOLERANCE};

/// Highest score reported. No lower clamp is applied.
pub const MAX_SCORE: f64 = 100.0;

/// Fused band ratios plus the two derived scores.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub gamma: f64,
    pub beta: f64,
    pub alpha: f64,
    pub theta: f64,
    pub delta: f64,
    pub focus: f64,
    pub relax: f64,
}

impl AnalysisResult {
    pub fn ratios(&self) -> BandRatios {
        BandRatios {
            gamma: self.gamma,
            beta: self.beta,
            alpha: self.alpha,
            theta: self.theta,
            delta: self.delta,
        }
    }
}

/// Weighted sum of the three channels' ratios, renormalized to sum to one.
pub fn fuse(eeg: &BandRatios, eogl: &BandRatios, eogr: &BandRatios, eeg_weight: f64) -> BandRatios {
    let eog_weight = (1.0 - eeg_weight) / 2.0;
    let mut fused = BandRatios::from_fn(|band| {
        eeg_weight * eeg.get(band) + eog_weight * eogl.get(band) + eog_weight * eogr.get(band)
    });
    let total = fused.sum();
    if (total - 1.0).abs() > RENORM_TOLERANCE {
        let denom = if total > 0.0 {
            total
        } else {
            warn!("fused ratio sum {} is not positive, substituting epsilon", total);
            POWER_EPSILON
        };
        fused = BandRatios::from_fn(|band| fused.get(band) / denom);
    }
    fused
}

/// alpha / (theta + alpha + beta)
pub fn raw_relax(ratios: &BandRatios) -> f64 {
    ratios.alpha / (ratios.theta + ratios.alpha + ratios.beta)
}

/// beta / (alpha + theta); unbounded above.
pub fn raw_focus(ratios: &BandRatios) -> f64 {
    ratios.beta / (ratios.alpha + ratios.theta)
}

/// `raw * 100 * gain + base`, capped at [`MAX_SCORE`].
///
/// NaN (from an all-zero ratio set) passes through unchanged.
pub fn map_score(raw: f64, gain: f64, base: f64) -> f64 {
    let score = raw * 100.0 * gain + base;
    if score > MAX_SCORE {
        MAX_SCORE
    } else {
        score
    }
}

pub fn score(fused: BandRatios, config: &AnalysisConfig) -> AnalysisResult {
    AnalysisResult {
        gamma: fused.gamma,
        beta: fused.beta,
        alpha: fused.alpha,
        theta: fused.theta,
        delta: fused.delta,
        focus: map_score(raw_focus(&fused), config.focus_gain, config.base_focus),
        relax: map_score(raw_relax(&fused), config.relax_gain, config.base_relax),
    }
}
