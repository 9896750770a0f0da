// ABOUTME: Decoder worker thread draining the intake into the PCM ring
// ABOUTME: Observes flush requests and publishes frames with release ordering

use crate::audio::decode::StreamDecoder;
use crate::audio::handshake::SharedRegion;
use crate::audio::intake::PacketIntake;
use crate::audio::types::MAX_PACKET_BYTES;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long one pop may block while the intake is empty. Short enough to
/// keep shutdown and flush observation responsive.
const IDLE_WAIT: Duration = Duration::from_millis(1);

const DIAG_PERIOD: Duration = Duration::from_secs(5);

/// Counters published by the feeder thread.
#[derive(Default)]
pub struct FeederStats {
    /// Packets the decoder rejected.
    pub decode_failures: AtomicU64,
    /// Packets dropped because the PCM ring was saturated.
    pub ring_overflows: AtomicU64,
}

/// Start the feeder thread.
///
/// The thread exclusively owns intake consumption, the ring write side, and
/// the decoder until `running` reads false and the intake wakes it.
pub(crate) fn spawn(
    intake: Arc<PacketIntake>,
    region: Arc<SharedRegion>,
    decoder: Box<dyn StreamDecoder>,
    running: Arc<AtomicBool>,
    stats: Arc<FeederStats>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("audio-feeder".to_string())
        .spawn(move || feeder_loop(intake, region, decoder, running, stats))
}

fn feeder_loop(
    intake: Arc<PacketIntake>,
    region: Arc<SharedRegion>,
    mut decoder: Box<dyn StreamDecoder>,
    running: Arc<AtomicBool>,
    stats: Arc<FeederStats>,
) {
    let ring = region.ring();
    let ring_cap = ring.cap();
    let frame_elems = region.params().frame_elems();

    let mut decode_buf = vec![0i16; frame_elems];
    let mut pkt_buf = [0u8; MAX_PACKET_BYTES];
    // Writer-private index of the next ring slot.
    let mut tail = 0usize;
    let mut overflow_count = 0u64;
    let mut last_diag = Instant::now();

    while running.load(Ordering::Relaxed) {
        if last_diag.elapsed() >= DIAG_PERIOD {
            debug!(
                "feeder: diag init_done={} ring_size={} ring_cap={}",
                region.is_ready() as i32,
                ring.len(),
                ring_cap
            );
            last_diag = Instant::now();
        }

        // Gap-recovery flush. The scheduler stopped consuming when it raised
        // the request, so it must find head = tail = 0 and an empty ring the
        // moment the request reads clear. Order is load-bearing: intake
        // first, then tail, then the published count, then the ack.
        if region.flush_requested() {
            intake.clear();
            tail = 0;
            ring.reset();
            region.ack_flush();
            info!("feeder: packet queue flushed by gap recovery");
        }

        let (popped, _shutdown) = intake.pop_into(&mut pkt_buf, IDLE_WAIT);
        let Some(len) = popped else {
            // Timed out or woken for shutdown; re-check flags.
            continue;
        };

        if ring.is_saturated() {
            overflow_count += 1;
            stats.ring_overflows.fetch_add(1, Ordering::Relaxed);
            if overflow_count <= 3 || overflow_count % 100 == 0 {
                warn!("feeder: PCM ring overflow #{overflow_count}, dropping packet");
            }
            continue;
        }

        match decoder.decode(&pkt_buf[..len], &mut decode_buf) {
            Ok(n) if n > 0 => {
                ring.write_frame(tail, &decode_buf);
                tail = (tail + 1) % ring_cap;
                ring.publish();
            }
            Ok(n) => {
                stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("feeder: decoder produced {n} samples, dropping packet");
            }
            Err(e) => {
                stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("feeder: decode failed: {e}");
            }
        }
    }

    debug!("feeder: thread exiting");
}
