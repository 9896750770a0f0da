// ABOUTME: Lifecycle controller wiring intake, feeder, ring, and handshake
// ABOUTME: Owns session start/stop and the network packet entry point

use crate::audio::decode::StreamDecoder;
use crate::audio::feeder::{self, FeederStats};
use crate::audio::handshake::{ConfigSlot, SharedRegion};
use crate::audio::intake::PacketIntake;
use crate::audio::types::{Geometry, StreamParams};
use crate::error::Error;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use typed_builder::TypedBuilder;

/// Per-session pipeline options.
#[derive(TypedBuilder, Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Jitter target override in milliseconds; 0 selects the 100 ms default.
    #[builder(default = 0)]
    pub jitter_ms_override: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Snapshot of the pipeline's drop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Packets rejected at the intake for an out-of-range length.
    pub rejected_packets: u64,
    /// Packets evicted from the intake by drop-oldest on overflow.
    pub dropped_oldest: u64,
    /// Packets the decoder failed on.
    pub decode_failures: u64,
    /// Decoded packets dropped because the PCM ring was saturated.
    pub ring_overflows: u64,
}

/// Owner of one audio session's decode pipeline.
///
/// Construction wires the intake, shared region, and feeder thread together
/// and publishes the region to the scheduler's [`ConfigSlot`]; dropping (or
/// calling [`stop`](Self::stop)) tears everything down in the reverse order.
pub struct AudioPipeline {
    shared: Arc<SharedRegion>,
    intake: Arc<PacketIntake>,
    running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    slot: ConfigSlot,
    stats: Arc<FeederStats>,
}

impl AudioPipeline {
    /// Start a session pipeline and publish it to `slot`.
    ///
    /// Readiness is published last, so a scheduler that observes the region
    /// always sees valid geometry. On any failure everything constructed so
    /// far is undone and the slot is left clear.
    pub fn start(
        params: StreamParams,
        options: SessionOptions,
        decoder: Box<dyn StreamDecoder>,
        slot: &ConfigSlot,
    ) -> Result<Self, Error> {
        params.validate()?;
        let geometry = Geometry::derive(&params, options.jitter_ms_override);
        info!(
            "audio init: ch={} spf={} rate={} jitter_frames={} target={}ms ring_cap={} pkt_cap={}",
            params.channels,
            params.samples_per_frame,
            params.sample_rate,
            geometry.jitter_frames,
            geometry.target_ms,
            geometry.ring_cap,
            geometry.pkt_cap
        );

        let intake = Arc::new(PacketIntake::new(geometry.pkt_cap));
        let shared = Arc::new(SharedRegion::new(params, geometry));
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(FeederStats::default());

        shared.mark_ready();
        slot.publish(Arc::clone(&shared));

        let feeder = match feeder::spawn(
            Arc::clone(&intake),
            Arc::clone(&shared),
            decoder,
            Arc::clone(&running),
            Arc::clone(&stats),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                shared.mark_down();
                slot.clear();
                return Err(Error::Session(format!("failed to start feeder: {e}")));
            }
        };
        debug!("audio init: feeder thread started");

        Ok(Self {
            shared,
            intake,
            running,
            feeder: Some(feeder),
            slot: slot.clone(),
            stats,
        })
    }

    /// Network entry point: hand one encoded packet to the pipeline.
    ///
    /// Silently discards packets while the feeder is not running. Lengths
    /// outside `[1, MAX_PACKET_BYTES]` are rejected inside the intake.
    pub fn push_packet(&self, bytes: &[u8]) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }
        self.intake.push(bytes);
    }

    /// Tear the session down: withdraw readiness, stop and join the feeder,
    /// clear the publication slot. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.feeder.take() else {
            return;
        };
        // Readiness goes first so the scheduler stops consuming before the
        // ring goes away underneath it.
        self.shared.mark_down();
        self.running.store(false, Ordering::Release);
        self.intake.close();
        let _ = handle.join();
        self.slot.clear();
        debug!("audio pipeline stopped");
    }

    /// The shared region this pipeline published.
    pub fn shared(&self) -> &Arc<SharedRegion> {
        &self.shared
    }

    /// The encoded-packet intake.
    pub fn intake(&self) -> &PacketIntake {
        &self.intake
    }

    /// Whether the feeder is accepting packets.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Current drop counters.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            rejected_packets: self.intake.rejected_packets(),
            dropped_oldest: self.intake.dropped_oldest(),
            decode_failures: self.stats.decode_failures.load(Ordering::Relaxed),
            ring_overflows: self.stats.ring_overflows.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
