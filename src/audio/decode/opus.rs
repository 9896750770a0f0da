// ABOUTME: Opus decoder implementation behind the StreamDecoder seam
// ABOUTME: Wraps an opus::Decoder sized for one frame per packet

use crate::audio::decode::StreamDecoder;
use crate::audio::types::StreamParams;
use crate::error::Error;

/// Opus streaming decoder producing one interleaved i16 frame per packet.
pub struct OpusStreamDecoder {
    decoder: opus::Decoder,
    samples_per_frame: usize,
}

impl OpusStreamDecoder {
    /// Create a decoder for the session's stream parameters.
    pub fn new(params: &StreamParams) -> Result<Self, Error> {
        let channels = match params.channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            n => {
                return Err(Error::Decoder(format!(
                    "unsupported channel count: {n}"
                )))
            }
        };
        let decoder = opus::Decoder::new(params.sample_rate, channels)
            .map_err(|e| Error::Decoder(e.to_string()))?;
        Ok(Self {
            decoder,
            samples_per_frame: params.samples_per_frame as usize,
        })
    }

    /// Samples per channel this decoder emits per packet.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }
}

impl StreamDecoder for OpusStreamDecoder {
    fn decode(&mut self, packet: &[u8], out: &mut [i16]) -> Result<usize, Error> {
        self.decoder
            .decode(packet, out, false)
            .map_err(|e| Error::Decoder(e.to_string()))
    }
}
