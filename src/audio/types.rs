// ABOUTME: Stream parameters and derived jitter/ring geometry
// ABOUTME: Sizing math shared by the pipeline, feeder, and scheduler

use crate::error::Error;

/// Upper bound on a single encoded packet, in bytes.
///
/// 4 KiB far exceeds the largest legal Opus packet (<= 1275 B per RFC 6716).
pub const MAX_PACKET_BYTES: usize = 4096;

/// Jitter target used when the session override is zero.
pub const DEFAULT_TARGET_MS: u32 = 100;

/// Fixed per-session audio stream parameters, as negotiated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Sample rate in Hz (e.g., 48000)
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u8,
    /// Decoded samples per channel per packet
    pub samples_per_frame: u32,
}

impl StreamParams {
    /// Interleaved sample count of one decoded frame (all channels).
    #[inline]
    pub fn frame_elems(&self) -> usize {
        self.samples_per_frame as usize * self.channels as usize
    }

    /// Duration of one decoded frame in milliseconds.
    #[inline]
    pub fn frame_duration_ms(&self) -> f64 {
        self.samples_per_frame as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Reject parameter sets the pipeline cannot be sized from.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 || self.channels == 0 || self.samples_per_frame == 0 {
            return Err(Error::Session(format!(
                "invalid stream parameters: rate={} ch={} spf={}",
                self.sample_rate, self.channels, self.samples_per_frame
            )));
        }
        Ok(())
    }
}

/// Buffer geometry derived from [`StreamParams`] and the session jitter target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Target buffering depth in milliseconds
    pub target_ms: u32,
    /// Frames whose combined duration covers `target_ms`
    pub jitter_frames: usize,
    /// PCM ring capacity in frames
    pub ring_cap: usize,
    /// Encoded packet queue capacity
    pub pkt_cap: usize,
}

impl Geometry {
    /// Derive buffer geometry. `jitter_ms_override` of 0 selects the
    /// default target of [`DEFAULT_TARGET_MS`].
    pub fn derive(params: &StreamParams, jitter_ms_override: u32) -> Self {
        let target_ms = if jitter_ms_override != 0 {
            jitter_ms_override
        } else {
            DEFAULT_TARGET_MS
        };
        let jitter_frames = (target_ms as f64 / params.frame_duration_ms()).ceil() as usize;
        Self {
            target_ms,
            jitter_frames,
            ring_cap: (jitter_frames * 4).max(32),
            pkt_cap: (jitter_frames * 4).max(64),
        }
    }
}
