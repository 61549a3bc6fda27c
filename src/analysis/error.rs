use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel `{channel}` has {actual} samples, expected {expected}")]
    LengthMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("signal has {len} samples; zero-phase filtering needs more than {padlen}")]
    SignalTooShort { len: usize, padlen: usize },
    #[error("signal is empty")]
    EmptySignal,
    #[error("band-pass cutoffs must satisfy 0 < {low} < {high} < {nyquist} Hz")]
    InvalidCutoff { low: f64, high: f64, nyquist: f64 },
    #[error("notch frequency {freq} Hz must lie strictly between 0 and {nyquist} Hz")]
    InvalidNotch { freq: f64, nyquist: f64 },
    #[error("filter order must be at least 1, got {0}")]
    InvalidOrder(usize),
    #[error("notch quality factor must be finite and positive, got {0}")]
    InvalidQuality(f64),
    #[error("segment length must be at least 2 samples, got {0}")]
    InvalidSegment(usize),
    #[error("overlap fraction must be in [0, 1), got {0}")]
    InvalidOverlap(f64),
    #[error("EEG trust weight must be in [0, 1], got {0}")]
    InvalidWeight(f64),
    #[error("sample rate mismatch: expected {expected}, got {actual}")]
    SampleRateMismatch { expected: f64, actual: f64 },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("{buffered} samples buffered, window needs {required}")]
    InsufficientSamples { buffered: usize, required: usize },
    #[error("buffer not initialized yet; feed at least one batch first")]
    BufferUninitialized,
}
