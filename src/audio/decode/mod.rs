// ABOUTME: Streaming decoder seam between the feeder and the codec
// ABOUTME: One encoded packet in, one interleaved PCM frame out

/// Opus decoder implementation
pub mod opus;

pub use self::opus::OpusStreamDecoder;

use crate::error::Error;

/// Streaming audio decoder: consumes one encoded packet and emits one
/// fixed-size frame of interleaved i16 PCM.
///
/// The feeder thread owns the decoder for its whole lifetime, so
/// implementations may keep mutable codec state without synchronization.
pub trait StreamDecoder: Send {
    /// Decode one packet into `out`, which holds exactly one frame of
    /// interleaved samples. Returns the number of samples decoded per
    /// channel. Errors are per-packet: the caller drops the packet and
    /// continues with the next one.
    fn decode(&mut self, packet: &[u8], out: &mut [i16]) -> Result<usize, Error>;
}
