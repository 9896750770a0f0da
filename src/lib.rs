// ABOUTME: Main library entry point for gamestream-audio
// ABOUTME: Exports the audio pipeline, scheduler, and sink abstractions

//! # gamestream-audio
//!
//! Audio decode and playback pipeline for a game-streaming client.
//!
//! Encoded Opus packets arrive from a network callback on one thread; decoded
//! PCM has to reach an audio sink driven by a different, single-threaded
//! cooperative context with bounded latency. The pipeline is built from a
//! bounded encoded-packet intake, a decoder worker thread, a lock-free SPSC
//! PCM ring shared between both contexts, and a cooperative scheduler that
//! pre-schedules PCM into sink nodes, detects wall-clock gaps, and performs
//! atomic flushes coordinated with the decoder.

#![warn(missing_docs)]

/// Audio pipeline building blocks: intake, ring, decoder seam, feeder, sink
pub mod audio;
/// Pipeline lifecycle controller and session options
pub mod pipeline;
/// Cooperative scheduler for timed sink submission
pub mod scheduler;

pub use audio::handshake::ConfigSlot;
pub use audio::output::{AudioSink, NodeId, SinkState};
pub use pipeline::{AudioPipeline, SessionOptions};
pub use scheduler::{SchedulerHandle, UiScheduler};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for the audio pipeline
pub mod error {
    use thiserror::Error;

    /// Error types for pipeline operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// Decoder creation or per-packet decode error
        #[error("Decoder error: {0}")]
        Decoder(String),

        /// Audio output error
        #[error("Audio output error: {0}")]
        Output(String),

        /// Invalid session parameters or lifecycle failure
        #[error("Session error: {0}")]
        Session(String),
    }
}
