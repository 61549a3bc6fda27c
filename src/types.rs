// src/types.rs
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Host -> service record, one JSON object per line.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Request {
    Compute(ComputeRequest),
    /// Liveness probe, answered with `ready`.
    Ping,
}

/// Four equal-length channels; `m1` is the reference electrode.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ComputeRequest {
    pub eeg: Vec<f64>,
    pub eogl: Vec<f64>,
    pub eogr: Vec<f64>,
    pub m1: Vec<f64>,
    /// Overrides the configured sampling rate for this request only.
    #[serde(default)]
    pub sfreq: Option<f64>,
}

/// Service -> host record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    Ready,
    Result { payload: AnalysisResult },
    Error { err: String },
}
