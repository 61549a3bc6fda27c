use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::{Band, BandTable, FrequencyRange, PowerSpectrum, POWER_EPSILON};

/// Fraction of total power per band, indexed by [`Band::index`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandRatios {
    pub gamma: f64,
    pub beta: f64,
    pub alpha: f64,
    pub theta: f64,
    pub delta: f64,
}

impl BandRatios {
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Gamma => self.gamma,
            Band::Beta => self.beta,
            Band::Alpha => self.alpha,
            Band::Theta => self.theta,
            Band::Delta => self.delta,
        }
    }

    pub fn set(&mut self, band: Band, value: f64) {
        match band {
            Band::Gamma => self.gamma = value,
            Band::Beta => self.beta = value,
            Band::Alpha => self.alpha = value,
            Band::Theta => self.theta = value,
            Band::Delta => self.delta = value,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Band) -> f64) -> Self {
        let mut ratios = Self::default();
        for band in Band::ALL {
            ratios.set(band, f(band));
        }
        ratios
    }

    pub fn sum(&self) -> f64 {
        Band::ALL.iter().map(|&b| self.get(b)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL.into_iter().map(move |b| (b, self.get(b)))
    }
}

/// Trapezoidal integral of `power` over the bins whose frequency lies in `range`.
pub fn integrate_range(spectrum: &PowerSpectrum, range: FrequencyRange) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    for (&f, &p) in spectrum.frequencies_hz.iter().zip(spectrum.power.iter()) {
        if !range.contains(f) {
            continue;
        }
        if let Some((f0, p0)) = previous {
            total += (f - f0) * (p0 + p) * 0.5;
        }
        previous = Some((f, p));
    }
    total
}

/// Band power divided by the power of the table's total range.
///
/// A silent spectrum (non-positive total) divides by [`POWER_EPSILON`] instead of
/// failing, so near-silent input can produce very large ratios.
pub fn band_ratios(spectrum: &PowerSpectrum, table: &BandTable) -> BandRatios {
    let mut total = integrate_range(spectrum, table.total);
    if total <= 0.0 {
        warn!("total band power {} is not positive, substituting epsilon", total);
        total = POWER_EPSILON;
    }
    BandRatios::from_fn(|band| integrate_range(spectrum, table.range(band)) / total)
}
