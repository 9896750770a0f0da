// ABOUTME: Shared test doubles for the pipeline and scheduler suites
// ABOUTME: Manually clocked sink plus a deterministic marker decoder

// Each suite uses its own subset of these doubles
#![allow(dead_code)]

use gamestream_audio::audio::decode::StreamDecoder;
use gamestream_audio::audio::output::{AudioSink, NodeId, SinkState};
use gamestream_audio::error::Error;

/// One recorded sink submission.
pub struct Submission {
    pub id: NodeId,
    pub when: f64,
    pub channels: Vec<Vec<f32>>,
}

/// Sink with a manually advanced clock that records every call.
pub struct MockSink {
    pub clock: f64,
    pub state: SinkState,
    pub resume_requests: u32,
    pub submissions: Vec<Submission>,
    pub cancelled: Vec<NodeId>,
    next_id: NodeId,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            state: SinkState::Running,
            resume_requests: 0,
            submissions: Vec::new(),
            cancelled: Vec::new(),
            next_id: 1,
        }
    }
}

impl AudioSink for MockSink {
    fn clock_now(&self) -> f64 {
        self.clock
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn resume(&mut self) {
        self.resume_requests += 1;
    }

    fn submit(&mut self, when: f64, channels: Vec<Vec<f32>>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.submissions.push(Submission { id, when, channels });
        id
    }

    fn cancel(&mut self, node: NodeId) {
        self.cancelled.push(node);
    }
}

/// Decoder that stamps every output sample with the packet's first byte,
/// so frame ordering and byte-exact delivery are observable downstream.
/// Packets starting with `0xFF` fail to decode.
pub struct MarkerDecoder {
    samples_per_frame: usize,
}

impl MarkerDecoder {
    pub fn new(samples_per_frame: usize) -> Self {
        Self { samples_per_frame }
    }
}

impl StreamDecoder for MarkerDecoder {
    fn decode(&mut self, packet: &[u8], out: &mut [i16]) -> Result<usize, Error> {
        if packet[0] == 0xFF {
            return Err(Error::Decoder("corrupt packet".to_string()));
        }
        out.fill(i16::from(packet[0]));
        Ok(self.samples_per_frame)
    }
}
