use std::f64::consts::PI;

use log::{debug, warn};
use ndarray::{s, Array1, ArrayView1};
use rustfft::{num_complex::Complex64, FftPlanner};

use crate::analysis::AnalysisError;

/// One-sided power spectral density of a single channel.
#[derive(Clone, Debug, PartialEq)]
pub struct PowerSpectrum {
    pub frequencies_hz: Array1<f64>,
    pub power: Array1<f64>,
}

impl PowerSpectrum {
    pub fn resolution_hz(&self) -> f64 {
        if self.frequencies_hz.len() < 2 {
            return 0.0;
        }
        self.frequencies_hz[1] - self.frequencies_hz[0]
    }
}

/// Welch PSD estimator: Hann-windowed, mean-detrended, overlapping segments.
pub struct SpectrumBuilder {
    sample_rate_hz: f64,
    nperseg: usize,
    overlap: f64,
}

impl SpectrumBuilder {
    pub fn new(sample_rate_hz: f64, nperseg: usize, overlap: f64) -> Self {
        Self {
            sample_rate_hz,
            nperseg,
            overlap,
        }
    }

    pub fn compute(&self, signal: ArrayView1<f64>) -> Result<PowerSpectrum, AnalysisError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        if signal.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }
        let mut nperseg = self.nperseg;
        if nperseg > signal.len() {
            warn!(
                "segment length {} exceeds signal length {}, using {}",
                nperseg,
                signal.len(),
                signal.len()
            );
            nperseg = signal.len();
        }
        if nperseg < 2 {
            return Err(AnalysisError::InvalidSegment(nperseg));
        }
        let noverlap = (self.overlap * nperseg as f64).floor() as usize;
        if noverlap >= nperseg {
            return Err(AnalysisError::InvalidOverlap(self.overlap));
        }
        let step = nperseg - noverlap;

        let window = hann_window(nperseg);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sample_rate_hz * window_power);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nperseg);
        let bins = nperseg / 2 + 1;
        let mut accum = Array1::<f64>::zeros(bins);
        let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];

        let mut segments = 0usize;
        let mut start = 0usize;
        while start + nperseg <= signal.len() {
            let segment = signal.slice(s![start..start + nperseg]);
            let mean = segment.sum() / nperseg as f64;
            for ((dst, &x), &w) in buffer.iter_mut().zip(segment.iter()).zip(window.iter()) {
                *dst = Complex64::new((x - mean) * w, 0.0);
            }
            fft.process(&mut buffer);
            for (k, acc) in accum.iter_mut().enumerate() {
                let mut p = buffer[k].norm_sqr() * scale;
                // Fold negative frequencies onto positive ones; DC and Nyquist are unique.
                if k != 0 && !(nperseg % 2 == 0 && k == nperseg / 2) {
                    p *= 2.0;
                }
                *acc += p;
            }
            segments += 1;
            start += step;
        }
        accum /= segments as f64;
        debug!(
            "welch: {} samples, {} segments of {} (step {})",
            signal.len(),
            segments,
            nperseg,
            step
        );

        let resolution = self.sample_rate_hz / nperseg as f64;
        Ok(PowerSpectrum {
            frequencies_hz: Array1::from_shape_fn(bins, |k| k as f64 * resolution),
            power: accum,
        })
    }
}

/// Periodic Hann window, the variant used for spectral estimation.
fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / len as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    fn sine(freq_hz: f64, amplitude: f64, sample_rate_hz: f64, len: usize) -> Array1<f64> {
        Array1::from_shape_fn(len, |i| {
            amplitude * (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin()
        })
    }
    #[test]
    fn bins_span_zero_to_nyquist() {
        let spectrum = SpectrumBuilder::new(250.0, 512, 0.5)
            .compute(Array1::<f64>::zeros(1250).view())
            .unwrap();
        assert_eq!(spectrum.frequencies_hz.len(), 257);
        assert_eq!(spectrum.power.len(), 257);
        assert_eq!(spectrum.frequencies_hz[0], 0.0);
        assert!((spectrum.frequencies_hz[256] - 125.0).abs() < 1e-12);
        assert!((spectrum.resolution_hz() - 250.0 / 512.0).abs() < 1e-12);
        assert!(spectrum.power.iter().all(|&p| p == 0.0));
    }
    #[test]
    fn peak_lands_on_tone_frequency() {
        let spectrum = SpectrumBuilder::new(250.0, 500, 0.5)
            .compute(sine(20.0, 1.0, 250.0, 2000).view())
            .unwrap();
        let (peak, _) = spectrum
            .power
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert!((spectrum.frequencies_hz[peak] - 20.0).abs() < 1e-9);
        assert!(spectrum.power.iter().all(|&p| p >= 0.0));
    }
    #[test]
    fn integrated_density_matches_signal_power() {
        // A unit sine carries 0.5 of power; density scaling preserves it.
        let sample_rate = 250.0;
        let spectrum = SpectrumBuilder::new(sample_rate, 500, 0.5)
            .compute(sine(20.0, 1.0, sample_rate, 2500).view())
            .unwrap();
        let total: f64 = spectrum.power.sum() * spectrum.resolution_hz();
        assert!((total - 0.5).abs() < 0.01, "total {total}");
    }
    #[test]
    fn constant_offset_is_detrended() {
        let spectrum = SpectrumBuilder::new(250.0, 256, 0.5)
            .compute(Array1::from_elem(1024, 3.0).view())
            .unwrap();
        assert!(spectrum.power.iter().all(|&p| p.abs() < 1e-20));
    }
    #[test]
    fn segment_longer_than_signal_is_clamped() {
        let spectrum = SpectrumBuilder::new(250.0, 512, 0.5)
            .compute(sine(10.0, 1.0, 250.0, 300).view())
            .unwrap();
        assert_eq!(spectrum.power.len(), 151);
    }
    #[test]
    fn empty_signal_is_rejected() {
        let empty = Array1::<f64>::zeros(0);
        assert_eq!(
            SpectrumBuilder::new(250.0, 512, 0.5).compute(empty.view()),
            Err(AnalysisError::EmptySignal)
        );
    }
}
