use std::collections::VecDeque;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;

/// Device channel order: EEG, left EOG, right EOG, mastoid reference.
pub const CHANNEL_LABELS: [&str; 4] = ["EEG", "EOG-L", "EOG-R", "M1"];
pub const CHANNEL_COUNT: usize = CHANNEL_LABELS.len();

/// Frame marker of EEG packets.
pub const EEG_MARKER: [u8; 2] = [0xFC, 0xFA];
/// Bytes before the first sample, marker included.
pub const HEADER_LEN: usize = 6;
const MIN_PACKET_LEN: usize = 8;
const BYTES_PER_SAMPLE: usize = 3;

/// Single batch of multi-channel samples.
#[derive(Clone, Debug)]
pub struct SignalBatch {
    pub sample_rate_hz: f64,
    pub samples: Vec<Vec<f64>>, // channels x samples
    pub channel_labels: Vec<String>,
}

impl SignalBatch {
    pub fn new(sample_rate_hz: f64, samples: Vec<Vec<f64>>) -> Self {
        Self {
            sample_rate_hz,
            samples,
            channel_labels: CHANNEL_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let channel_count = self.samples.len();
        if channel_count != self.channel_labels.len() {
            return Err(AnalysisError::ChannelMismatch {
                expected: self.channel_labels.len(),
                actual: channel_count,
            });
        }
        if let Some(expected) = self.samples_per_channel() {
            for (label, channel) in self.channel_labels.iter().zip(&self.samples) {
                if channel.len() != expected {
                    return Err(AnalysisError::LengthMismatch {
                        channel: static_label(label),
                        expected,
                        actual: channel.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    pub fn samples_per_channel(&self) -> Option<usize> {
        self.samples.first().map(|c| c.len())
    }
}

fn static_label(label: &str) -> &'static str {
    CHANNEL_LABELS
        .iter()
        .find(|known| **known == label)
        .copied()
        .unwrap_or("unlabelled")
}

/// Trait representing something that can yield signal batches on demand.
pub trait SignalSource {
    fn next_batch(&mut self) -> Result<Option<SignalBatch>, AnalysisError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SignalBatch>,
}

impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = SignalBatch>) -> Self {
        Self {
            queue: batches.into_iter().collect(),
        }
    }
}

impl SignalSource for ManualSource {
    fn next_batch(&mut self) -> Result<Option<SignalBatch>, AnalysisError> {
        Ok(self.queue.pop_front())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Lsb,
    Msb,
}

/// Decodes raw device packets into four-channel batches.
///
/// Layout: `FC FA` marker, header up to byte 6, then interleaved samples, three
/// bytes per channel per sample, signed 24-bit. Packets with any other marker are
/// not EEG frames and are skipped.
#[derive(Clone, Copy, Debug)]
pub struct PacketDecoder {
    sample_rate_hz: f64,
    byte_order: ByteOrder,
}

impl PacketDecoder {
    pub fn new(sample_rate_hz: f64, byte_order: ByteOrder) -> Self {
        Self {
            sample_rate_hz,
            byte_order,
        }
    }

    pub fn decode(&self, packet: &[u8]) -> Option<SignalBatch> {
        if packet.len() < MIN_PACKET_LEN || packet[..2] != EEG_MARKER {
            trace!("skipping non-EEG packet of {} bytes", packet.len());
            return None;
        }
        let body = &packet[HEADER_LEN..];
        let stride = CHANNEL_COUNT * BYTES_PER_SAMPLE;
        let count = body.len() / stride;
        if count == 0 {
            return None;
        }
        let mut samples = vec![Vec::with_capacity(count); CHANNEL_COUNT];
        for frame in body.chunks_exact(stride) {
            for (channel, bytes) in samples.iter_mut().zip(frame.chunks_exact(BYTES_PER_SAMPLE)) {
                let value = match self.byte_order {
                    ByteOrder::Lsb => decode_i24(bytes[0], bytes[1], bytes[2]),
                    ByteOrder::Msb => decode_i24(bytes[2], bytes[1], bytes[0]),
                };
                channel.push(value as f64);
            }
        }
        Some(SignalBatch::new(self.sample_rate_hz, samples))
    }
}

/// Sign-extends a little-endian 24-bit integer.
fn decode_i24(b0: u8, b1: u8, b2: u8) -> i32 {
    i32::from_le_bytes([b0, b1, b2, 0]) << 8 >> 8
}

/// Source that decodes a sequence of raw packets, skipping the ones that carry no EEG.
pub struct PacketSource<I> {
    packets: I,
    decoder: PacketDecoder,
}

impl<I> PacketSource<I>
where
    I: Iterator<Item = Vec<u8>>,
{
    pub fn new(packets: I, decoder: PacketDecoder) -> Self {
        Self { packets, decoder }
    }
}

impl<I> SignalSource for PacketSource<I>
where
    I: Iterator<Item = Vec<u8>>,
{
    fn next_batch(&mut self) -> Result<Option<SignalBatch>, AnalysisError> {
        for packet in self.packets.by_ref() {
            if let Some(batch) = self.decoder.decode(&packet) {
                return Ok(Some(batch));
            }
        }
        Ok(None)
    }
}
