//! IIR filter design and zero-phase application.
//!
//! Filters are cascades of second-order sections evaluated in transposed direct
//! form II. The Butterworth band-pass goes through the usual analog prototype,
//! low-pass to band-pass transform and pre-warped bilinear transform, so the
//! sections match what a `butter(N, [low, high], btype="band")` design produces.
//!
//! Zero-phase filtering pads both ends with an odd extension, seeds every section
//! with its step-response steady state, then runs the cascade forward and backward.
use std::f64::consts::PI;

use log::debug;
use ndarray::{Array1, ArrayView1};
use rustfft::num_complex::Complex64;

use crate::analysis::{AnalysisError, FilterSpec};

/// Normalized (`a0 == 1`) coefficients of one second-order section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// State reached after an infinitely long unit step.
    fn step_state(&self) -> BiquadState {
        let y = self.dc_gain();
        let z2 = self.b2 - self.a2 * y;
        let z1 = self.b1 - self.a1 * y + z2;
        BiquadState { z1, z2 }
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        (self.b0 + z_inv * self.b1 + z_inv2 * self.b2) / (1.0 + z_inv * self.a1 + z_inv2 * self.a2)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadState {
    fn scaled(self, factor: f64) -> Self {
        Self {
            z1: self.z1 * factor,
            z2: self.z2 * factor,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    fn with_state(coeffs: BiquadCoeffs, state: BiquadState) -> Self {
        Self { coeffs, state }
    }

    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}

/// Cascade of second-order sections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain {
    sections: Vec<BiquadCoeffs>,
}

impl FilterChain {
    /// Digital Butterworth band-pass of the given prototype order (`order` sections,
    /// `2 * order` poles).
    pub fn butterworth_bandpass(
        sample_rate_hz: f64,
        low_hz: f64,
        high_hz: f64,
        order: usize,
    ) -> Result<Self, AnalysisError> {
        if !(sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let nyquist = sample_rate_hz * 0.5;
        if order == 0 {
            return Err(AnalysisError::InvalidOrder(order));
        }
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(AnalysisError::InvalidCutoff {
                low: low_hz,
                high: high_hz,
                nyquist,
            });
        }

        // Bilinear transform with fs = 2, frequencies normalized to Nyquist.
        const FS2: f64 = 4.0;
        let warp = |freq_hz: f64| FS2 * (PI * (freq_hz / nyquist) / 2.0).tan();
        let (w_low, w_high) = (warp(low_hz), warp(high_hz));
        let bandwidth = w_high - w_low;
        let center = (w_low * w_high).sqrt();

        let n = order as i32;
        let mut analog_poles = Vec::with_capacity(2 * order);
        for m in (-n + 1..n).step_by(2) {
            let proto = -Complex64::from_polar(1.0, PI * m as f64 / (2.0 * n as f64));
            let shifted = proto * (bandwidth / 2.0);
            let spread = (shifted * shifted - center * center).sqrt();
            analog_poles.push(shifted + spread);
            analog_poles.push(shifted - spread);
        }

        // Analog zeros sit at s = 0, which the bilinear map sends to z = 1.
        let denom = analog_poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (FS2 - *p));
        let gain = (bandwidth.powi(n) * FS2.powi(n) / denom).re;

        let digital_poles: Vec<Complex64> = analog_poles
            .iter()
            .map(|&p| (FS2 + p) / (FS2 - p))
            .collect();

        let mut pole_pairs: Vec<(f64, f64)> = Vec::with_capacity(order);
        let mut real_poles = Vec::new();
        for p in &digital_poles {
            if p.im.abs() <= 1e-12 {
                real_poles.push(p.re);
            } else if p.im > 0.0 {
                // Conjugate pair (p, p*) -> z^2 - 2 Re(p) z + |p|^2
                pole_pairs.push((-2.0 * p.re, p.norm_sqr()));
            }
        }
        for pair in real_poles.chunks(2) {
            match pair {
                [r1, r2] => pole_pairs.push((-(r1 + r2), r1 * r2)),
                [r] => pole_pairs.push((-r, 0.0)),
                _ => {}
            }
        }

        // Each section takes one zero at z = 1 and one at z = -1: b = [1, 0, -1].
        let sections = pole_pairs
            .into_iter()
            .enumerate()
            .map(|(i, (a1, a2))| {
                let k = if i == 0 { gain } else { 1.0 };
                BiquadCoeffs::normalize(k, 0.0, -k, 1.0, a1, a2)
            })
            .collect();
        Ok(Self { sections })
    }

    /// Second-order IIR notch centred on `freq_hz`, -3 dB bandwidth `freq_hz / q`.
    pub fn notch(sample_rate_hz: f64, freq_hz: f64, q: f64) -> Result<Self, AnalysisError> {
        if !(sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let nyquist = sample_rate_hz * 0.5;
        if !(freq_hz > 0.0 && freq_hz < nyquist) {
            return Err(AnalysisError::InvalidNotch {
                freq: freq_hz,
                nyquist,
            });
        }
        if !(q.is_finite() && q > 0.0) {
            return Err(AnalysisError::InvalidQuality(q));
        }
        let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
        let bw = w0 / q;
        let gain = 1.0 / (1.0 + (bw / 2.0).tan());
        let cos_w0 = w0.cos();
        let coeffs = BiquadCoeffs::normalize(
            gain,
            -2.0 * gain * cos_w0,
            gain,
            1.0,
            -2.0 * gain * cos_w0,
            2.0 * gain - 1.0,
        );
        Ok(Self {
            sections: vec![coeffs],
        })
    }

    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Edge samples mirrored on each side before zero-phase filtering.
    pub fn padlen(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate_hz;
        let z_inv = Complex64::from_polar(1.0, -w);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
            .norm()
    }

    /// Forward-backward filtering; the output is time-aligned with `signal`.
    pub fn filtfilt(&self, signal: ArrayView1<f64>) -> Result<Array1<f64>, AnalysisError> {
        if self.is_empty() {
            return Ok(signal.to_owned());
        }
        let len = signal.len();
        let padlen = self.padlen();
        if len <= padlen {
            return Err(AnalysisError::SignalTooShort { len, padlen });
        }

        let first = signal[0];
        let last = signal[len - 1];
        let mut extended = Vec::with_capacity(len + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend(signal.iter().copied());
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[len - 1 - i]));

        let x0 = extended[0];
        let mut forward = self.run(&extended, x0);
        forward.reverse();
        let y0 = forward[0];
        let mut backward = self.run(&forward, y0);
        backward.reverse();

        Ok(Array1::from(backward[padlen..padlen + len].to_vec()))
    }

    /// Causal pass with every section starting at the steady state of a step of
    /// height `initial`.
    fn run(&self, input: &[f64], initial: f64) -> Vec<f64> {
        let mut scale = initial;
        let mut filters: Vec<BiquadFilter> = self
            .sections
            .iter()
            .map(|coeffs| {
                let filter = BiquadFilter::with_state(*coeffs, coeffs.step_state().scaled(scale));
                scale *= coeffs.dc_gain();
                filter
            })
            .collect();
        input
            .iter()
            .map(|&x| filters.iter_mut().fold(x, |value, f| f.process(value)))
            .collect()
    }
}

/// Band-pass then notch, both zero-phase, with one design shared by all channels.
#[derive(Clone, Debug)]
pub struct ChannelConditioner {
    bandpass: FilterChain,
    notch: FilterChain,
}

impl ChannelConditioner {
    pub fn new(spec: &FilterSpec) -> Result<Self, AnalysisError> {
        let bandpass = FilterChain::butterworth_bandpass(
            spec.sample_rate_hz,
            spec.lowcut_hz,
            spec.highcut_hz,
            spec.order,
        )?;
        let notch = FilterChain::notch(spec.sample_rate_hz, spec.notch_hz, spec.notch_q)?;
        debug!(
            "designed {} band-pass sections ({}-{} Hz) and notch at {} Hz",
            bandpass.sections().len(),
            spec.lowcut_hz,
            spec.highcut_hz,
            spec.notch_hz
        );
        Ok(Self { bandpass, notch })
    }

    pub fn condition(&self, signal: ArrayView1<f64>) -> Result<Array1<f64>, AnalysisError> {
        let passed = self.bandpass.filtfilt(signal)?;
        self.notch.filtfilt(passed.view())
    }
}
