// src/analysis/mod.rs
pub mod bands;
pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod pipeline;
pub mod reference;
pub mod source;
pub mod spectrum;
pub use bands::{band_ratios, integrate_range, BandRatios};
pub use buffer::{SignalBuffer, TimeSeriesFrame};
pub use config::{
    AnalysisConfig, Band, BandTable, FilterSpec, FrequencyRange, FILTER_ORDER, NOTCH_Q,
    POWER_EPSILON, RENORM_TOLERANCE,
};
pub use error::AnalysisError;
pub use filter::{BiquadCoeffs, ChannelConditioner, FilterChain};
pub use fusion::{fuse, map_score, raw_focus, raw_relax, score, AnalysisResult, MAX_SCORE};
pub use pipeline::{
    analyze, analyze_frame, analyze_slices, StreamEvent, StreamSettings, StreamingAnalyzer,
};
pub use reference::{rereference, Rereferenced};
pub use source::{
    ByteOrder, ManualSource, PacketDecoder, PacketSource, SignalBatch, SignalSource,
    CHANNEL_COUNT, CHANNEL_LABELS,
};
pub use spectrum::{PowerSpectrum, SpectrumBuilder};
