use log::{debug, error};
use ndarray::{Array1, ArrayView1};

use crate::analysis::bands::{band_ratios, BandRatios};
use crate::analysis::buffer::{SignalBuffer, TimeSeriesFrame};
use crate::analysis::filter::ChannelConditioner;
use crate::analysis::fusion::{fuse, score, AnalysisResult};
use crate::analysis::reference::rereference;
use crate::analysis::source::{SignalBatch, SignalSource, CHANNEL_COUNT};
use crate::analysis::spectrum::SpectrumBuilder;
use crate::analysis::{AnalysisConfig, AnalysisError};

/// Re-reference, condition, estimate, extract and fuse one four-channel segment.
///
/// All four channels must have the same length, and that length must exceed the
/// band-pass padding (27 samples for the default order).
pub fn analyze(
    eeg: ArrayView1<f64>,
    eogl: ArrayView1<f64>,
    eogr: ArrayView1<f64>,
    reference: ArrayView1<f64>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    let channels = rereference(eeg, eogl, eogr, reference)?;
    let conditioner = ChannelConditioner::new(&config.filter_spec())?;
    let spectrum = SpectrumBuilder::new(config.sample_rate_hz, config.nperseg, config.overlap);

    let channel_ratios = |signal: &Array1<f64>| -> Result<BandRatios, AnalysisError> {
        let conditioned = conditioner.condition(signal.view())?;
        let psd = spectrum.compute(conditioned.view())?;
        Ok(band_ratios(&psd, &config.bands))
    };
    let eeg_ratios = channel_ratios(&channels.eeg)?;
    let eogl_ratios = channel_ratios(&channels.eogl)?;
    let eogr_ratios = channel_ratios(&channels.eogr)?;

    let fused = fuse(&eeg_ratios, &eogl_ratios, &eogr_ratios, config.eeg_weight);
    let result = score(fused, config);
    debug!(
        "analyzed {} samples: focus {:.2}, relax {:.2}",
        eeg.len(),
        result.focus,
        result.relax
    );
    Ok(result)
}

/// Slice-based convenience wrapper around [`analyze`].
pub fn analyze_slices(
    eeg: &[f64],
    eogl: &[f64],
    eogr: &[f64],
    reference: &[f64],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    analyze(
        ArrayView1::from(eeg),
        ArrayView1::from(eogl),
        ArrayView1::from(eogr),
        ArrayView1::from(reference),
        config,
    )
}

/// Analyze a frame whose rows follow the EEG, EOG-L, EOG-R, reference order.
pub fn analyze_frame(
    frame: &TimeSeriesFrame,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    if frame.samples.nrows() != CHANNEL_COUNT {
        return Err(AnalysisError::ChannelMismatch {
            expected: CHANNEL_COUNT,
            actual: frame.samples.nrows(),
        });
    }
    let config = config.clone().with_sample_rate(frame.sample_rate_hz);
    analyze(
        frame.channel(0),
        frame.channel(1),
        frame.channel(2),
        frame.channel(3),
        &config,
    )
}

/// Timing of the rolling analysis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamSettings {
    pub window_seconds: f64,
    pub hop_seconds: f64,
    /// Extra history kept beyond one window.
    pub slack_seconds: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            window_seconds: 5.0,
            hop_seconds: 1.0,
            slack_seconds: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Batch absorbed, no analysis due yet.
    Buffered { samples: usize },
    Analysis(AnalysisResult),
}

/// Rolling front end: buffers batches and analyzes the latest window once per hop.
pub struct StreamingAnalyzer<S: SignalSource> {
    source: S,
    buffer: Option<SignalBuffer>,
    config: AnalysisConfig,
    settings: StreamSettings,
    since_last: usize,
}

impl<S: SignalSource> StreamingAnalyzer<S> {
    pub fn new(source: S, config: AnalysisConfig, settings: StreamSettings) -> Self {
        Self {
            source,
            buffer: None,
            config,
            settings,
            since_last: 0,
        }
    }

    /// `Ok(None)` once the source is exhausted.
    pub fn pump_once(&mut self) -> Result<Option<StreamEvent>, AnalysisError> {
        let Some(batch) = self.source.next_batch()? else {
            return Ok(None);
        };
        let event = self.push_batch(batch)?;
        Ok(Some(event))
    }

    /// Drain the source, collecting every analysis produced along the way.
    pub fn run_to_end(&mut self) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let mut results = Vec::new();
        while let Some(event) = self.pump_once()? {
            if let StreamEvent::Analysis(result) = event {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Absorb one batch. A window that fails to analyze is logged and skipped.
    pub fn push_batch(&mut self, batch: SignalBatch) -> Result<StreamEvent, AnalysisError> {
        let added = batch.samples_per_channel().unwrap_or(0);
        let buffer = self.ensure_buffer(&batch)?;
        buffer.push_batch(&batch)?;
        let sample_rate = buffer.sample_rate_hz();
        let buffered = buffer.len();
        self.since_last += added;

        let window = samples_for(self.settings.window_seconds, sample_rate);
        let hop = samples_for(self.settings.hop_seconds, sample_rate).max(1);
        if buffered < window || self.since_last < hop {
            return Ok(StreamEvent::Buffered { samples: buffered });
        }
        self.since_last = 0;
        let frame = self.latest_frame(window)?;
        match analyze_frame(&frame, &self.config) {
            Ok(result) => Ok(StreamEvent::Analysis(result)),
            Err(err) => {
                error!("window analysis failed: {}", err);
                Ok(StreamEvent::Buffered { samples: buffered })
            }
        }
    }

    pub fn latest_frame(&self, samples: usize) -> Result<TimeSeriesFrame, AnalysisError> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or(AnalysisError::BufferUninitialized)?;
        buffer
            .latest(samples)
            .ok_or(AnalysisError::InsufficientSamples {
                buffered: buffer.len(),
                required: samples,
            })
    }

    pub fn reset(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
        self.since_last = 0;
    }

    fn ensure_buffer(&mut self, batch: &SignalBatch) -> Result<&mut SignalBuffer, AnalysisError> {
        if self.buffer.is_none() {
            batch.validate()?;
            self.buffer = Some(SignalBuffer::with_history_seconds(
                batch.channel_labels.clone(),
                batch.sample_rate_hz,
                self.settings.window_seconds + self.settings.slack_seconds,
            )?);
        }
        self.buffer
            .as_mut()
            .ok_or(AnalysisError::BufferUninitialized)
    }
}

fn samples_for(seconds: f64, sample_rate_hz: f64) -> usize {
    (seconds * sample_rate_hz).round() as usize
}
