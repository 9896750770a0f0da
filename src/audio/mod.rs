// ABOUTME: Audio pipeline building blocks
// ABOUTME: Intake, decoder seam, PCM ring, shared handshake, feeder, sink

/// Streaming decoder seam and Opus implementation
pub mod decode;
/// Decoder worker thread
pub mod feeder;
/// Shared region and its publication slot
pub mod handshake;
/// Bounded encoded-packet intake
pub mod intake;
/// Audio sink trait and implementations
pub mod output;
/// SPSC PCM ring
pub mod ring;
/// Stream parameters and derived geometry
pub mod types;

pub use decode::{OpusStreamDecoder, StreamDecoder};
pub use feeder::FeederStats;
pub use handshake::{ConfigSlot, SharedRegion};
pub use intake::PacketIntake;
pub use output::{AudioSink, CpalSink, NodeId, SinkState};
pub use ring::PcmRing;
pub use types::{Geometry, StreamParams, DEFAULT_TARGET_MS, MAX_PACKET_BYTES};
