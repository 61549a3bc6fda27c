use std::collections::VecDeque;

use ndarray::{Array2, ArrayView1};

use crate::analysis::{AnalysisError, SignalBatch};

/// Fixed-length multi-channel window, channels along rows.
#[derive(Clone, Debug)]
pub struct TimeSeriesFrame {
    pub sample_rate_hz: f64,
    pub channel_labels: Vec<String>,
    pub samples: Array2<f64>, // channels x samples
}

impl TimeSeriesFrame {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.ncols() as f64 / self.sample_rate_hz
    }

    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.samples.row(index)
    }
}

/// Rolling buffer that stores recent samples per channel.
pub struct SignalBuffer {
    per_channel: Vec<VecDeque<f64>>, // channel -> samples
    channel_labels: Vec<String>,
    sample_rate_hz: f64,
    capacity: usize,
}

impl SignalBuffer {
    pub fn with_history_seconds(
        channel_labels: Vec<String>,
        sample_rate_hz: f64,
        history_seconds: f64,
    ) -> Result<Self, AnalysisError> {
        if !(sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let capacity = (sample_rate_hz * history_seconds).ceil() as usize;
        let per_channel = channel_labels
            .iter()
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();
        Ok(Self {
            per_channel,
            channel_labels,
            sample_rate_hz,
            capacity,
        })
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples currently held per channel.
    pub fn len(&self) -> usize {
        self.per_channel.first().map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_batch(&mut self, batch: &SignalBatch) -> Result<(), AnalysisError> {
        batch.validate()?;
        if batch.sample_rate_hz != self.sample_rate_hz {
            return Err(AnalysisError::SampleRateMismatch {
                expected: self.sample_rate_hz,
                actual: batch.sample_rate_hz,
            });
        }
        if batch.num_channels() != self.per_channel.len() {
            return Err(AnalysisError::ChannelMismatch {
                expected: self.per_channel.len(),
                actual: batch.num_channels(),
            });
        }
        for (channel_queue, new_samples) in self.per_channel.iter_mut().zip(&batch.samples) {
            for &sample in new_samples {
                if channel_queue.len() == self.capacity {
                    channel_queue.pop_front();
                }
                channel_queue.push_back(sample);
            }
        }
        Ok(())
    }

    /// The most recent `samples` samples of every channel, or `None` while fewer are buffered.
    pub fn latest(&self, samples: usize) -> Option<TimeSeriesFrame> {
        if self.len() < samples {
            return None;
        }
        let skip = self.len() - samples;
        let data = Array2::from_shape_fn((self.per_channel.len(), samples), |(c, i)| {
            self.per_channel[c][skip + i]
        });
        Some(TimeSeriesFrame {
            sample_rate_hz: self.sample_rate_hz,
            channel_labels: self.channel_labels.clone(),
            samples: data,
        })
    }

    pub fn clear(&mut self) {
        for queue in &mut self.per_channel {
            queue.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn labels() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }
    fn batch(values: &[f64]) -> SignalBatch {
        SignalBatch {
            sample_rate_hz: 10.0,
            samples: vec![values.to_vec(), values.iter().map(|v| -v).collect()],
            channel_labels: labels(),
        }
    }
    #[test]
    fn keeps_only_capacity_samples() {
        let mut buffer = SignalBuffer::with_history_seconds(labels(), 10.0, 0.5).unwrap();
        assert_eq!(buffer.capacity(), 5);
        buffer.push_batch(&batch(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        buffer.push_batch(&batch(&[5.0, 6.0, 7.0])).unwrap();
        assert_eq!(buffer.len(), 5);
        let frame = buffer.latest(3).unwrap();
        assert_eq!(frame.channel_labels, labels());
        assert_eq!(frame.channel(0).to_vec(), vec![5.0, 6.0, 7.0]);
        assert_eq!(frame.channel(1).to_vec(), vec![-5.0, -6.0, -7.0]);
        assert!((frame.duration_seconds() - 0.3).abs() < 1e-12);
    }
    #[test]
    fn latest_waits_for_enough_samples() {
        let mut buffer = SignalBuffer::with_history_seconds(labels(), 10.0, 1.0).unwrap();
        buffer.push_batch(&batch(&[1.0, 2.0])).unwrap();
        assert!(buffer.latest(3).is_none());
        buffer.clear();
        assert!(buffer.is_empty());
    }
    #[test]
    fn rejects_mismatched_batches() {
        let mut buffer = SignalBuffer::with_history_seconds(labels(), 10.0, 1.0).unwrap();
        let mut wrong_rate = batch(&[1.0]);
        wrong_rate.sample_rate_hz = 20.0;
        assert_eq!(
            buffer.push_batch(&wrong_rate),
            Err(AnalysisError::SampleRateMismatch {
                expected: 10.0,
                actual: 20.0
            })
        );
        let mut buffer =
            SignalBuffer::with_history_seconds(vec!["A".into()], 10.0, 1.0).unwrap();
        assert_eq!(
            buffer.push_batch(&batch(&[1.0])),
            Err(AnalysisError::ChannelMismatch {
                expected: 1,
                actual: 2
            })
        );
    }
    #[test]
    fn zero_sample_rate_is_rejected() {
        assert!(matches!(
            SignalBuffer::with_history_seconds(labels(), 0.0, 1.0),
            Err(AnalysisError::InvalidSampleRate)
        ));
    }
}
