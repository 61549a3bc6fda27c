//! Focus and relax indices from a four-channel EEG/EOG recording.
//!
//! The analysis is a single pass: subtract the reference channel, band-pass and
//! notch each channel with zero-phase IIR filters, estimate a Welch PSD, turn it
//! into five band-energy ratios, fuse the three channels and map the fused ratios
//! onto bounded scores.
//!
//! `service` wraps the analysis in the newline-delimited JSON protocol spoken by
//! the host process.

pub mod analysis;
pub mod service;
pub mod types;

pub use analysis::{analyze, analyze_slices, AnalysisConfig, AnalysisError, AnalysisResult};
