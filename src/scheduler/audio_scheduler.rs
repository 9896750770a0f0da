// ABOUTME: Cooperative scheduler feeding the audio sink from the PCM ring
// ABOUTME: Maintains lookahead, detects wall-clock gaps, drives flush recovery

use crate::audio::handshake::{ConfigSlot, SharedRegion};
use crate::audio::output::{AudioSink, NodeId, SinkState};
use crate::error::Error;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Tick period of the scheduler loop.
pub const TICK_PERIOD: Duration = Duration::from_millis(5);

/// Observable phase of the scheduler, derived from its internal gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No pipeline configuration acquired yet.
    Unconfigured,
    /// Configured, accumulating the jitter buffer before playback.
    Filling,
    /// Steady-state playback with lookahead maintenance.
    Playing,
    /// Waiting for the decoder worker to acknowledge a flush.
    FlushRequested,
}

struct PendingNode {
    id: NodeId,
    end_time: f64,
}

/// Cooperative scheduler on the sink's context.
///
/// One [`tick`](Self::tick) roughly every 5 ms polls the [`ConfigSlot`],
/// gates playback on the jitter buffer, keeps the sink supplied with up to
/// `target_ms` of lookahead in a single node per tick, and recovers from
/// wall-clock gaps (host suspensions) with a flush handshake against the
/// decoder worker.
///
/// The scheduler never blocks; every per-tick decision is bounded by the
/// batched fill. One node per tick keeps sink API crossings bounded even on
/// constrained hosts, where per-frame submission can blow the tick budget and
/// cascade into false gap detection.
pub struct UiScheduler<S: AudioSink> {
    sink: S,
    slot: ConfigSlot,
    cached: Option<Arc<SharedRegion>>,
    /// Clock position for the start of the next scheduled node.
    next_time: f64,
    /// Consumer index into the ring, invisible to the decoder worker.
    ring_head: usize,
    /// Playback does not start until the ring fills to `jitter_frames`.
    jit_ready: bool,
    /// Raised a flush, awaiting the decoder worker's acknowledgement.
    pending_flush: bool,
    /// Wall clock of the last tick that saw a running sink, in ms. Not
    /// updated while suspended, so the first running tick measures the
    /// whole suspension as one gap.
    last_wall_ms: f64,
    pending_nodes: Vec<PendingNode>,
    scratch: Vec<i16>,
    epoch: Instant,
}

impl<S: AudioSink> UiScheduler<S> {
    /// Create a scheduler polling `slot` and submitting into `sink`.
    pub fn new(slot: ConfigSlot, sink: S) -> Self {
        Self {
            sink,
            slot,
            cached: None,
            next_time: 0.0,
            ring_head: 0,
            jit_ready: false,
            pending_flush: false,
            last_wall_ms: 0.0,
            pending_nodes: Vec::new(),
            scratch: Vec::new(),
            epoch: Instant::now(),
        }
    }

    /// Run one tick against the real wall clock.
    pub fn tick(&mut self) {
        let wall_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.tick_at(wall_ms);
    }

    /// Run one tick at an explicit wall-clock time in milliseconds.
    ///
    /// Wall time only feeds gap detection; scheduling positions come from
    /// the sink's audio clock.
    pub fn tick_at(&mut self, wall_ms: f64) {
        // A suspended clock cannot be scheduled against. Leave last_wall_ms
        // untouched so the gap measured on the next running tick spans the
        // entire suspension.
        if self.sink.state() == SinkState::Suspended {
            self.sink.resume();
            return;
        }

        let mut wall_gap_ms = if self.last_wall_ms > 0.0 {
            wall_ms - self.last_wall_ms
        } else {
            0.0
        };
        self.last_wall_ms = wall_ms;

        if self.cached.is_none() {
            let Some(region) = self.slot.get().filter(|r| config_valid(r)) else {
                return;
            };
            debug!(
                "scheduler: configured rate={} ch={} ring_cap={} jitter_frames={} target={}ms",
                region.params().sample_rate,
                region.params().channels,
                region.geometry().ring_cap,
                region.geometry().jitter_frames,
                region.geometry().target_ms
            );
            self.cached = Some(region);
            self.next_time = 0.0;
            self.ring_head = 0;
            self.jit_ready = false;
            self.pending_flush = false;
            self.last_wall_ms = 0.0;
            wall_gap_ms = 0.0;
        }
        let Some(region) = self.cached.clone() else {
            return;
        };

        if !region.is_ready() {
            debug!("scheduler: pipeline down, releasing config");
            self.cancel_pending();
            self.cached = None;
            return;
        }

        let params = *region.params();
        let geometry = *region.geometry();
        let ring = region.ring();
        let target_ms = geometry.target_ms as f64;

        let clock_now = self.sink.clock_now();
        self.pending_nodes.retain(|n| n.end_time > clock_now);

        // Gap recovery: the host stalled longer than the jitter buffer can
        // absorb, so everything queued or decoded is stale. Cancel the
        // scheduled tail and hand the ring back to the decoder worker.
        if wall_gap_ms > target_ms {
            info!(
                "scheduler: wall gap {:.0}ms > {:.0}ms, requesting flush",
                wall_gap_ms, target_ms
            );
            self.cancel_pending();
            self.next_time = 0.0;
            region.request_flush();
            self.pending_flush = true;
            self.jit_ready = false;
        }

        if self.pending_flush {
            if region.flush_requested() {
                return;
            }
            // Decoder worker acknowledged: intake cleared, ring reset to
            // slot zero. Rebuild the jitter buffer from there.
            self.pending_flush = false;
            self.ring_head = 0;
        }

        if !self.jit_ready {
            if ring.len() < geometry.jitter_frames {
                return;
            }
            debug!(
                "scheduler: jitter buffer filled ({} frames), starting playback",
                geometry.jitter_frames
            );
            self.jit_ready = true;
        }

        if self.next_time < clock_now {
            self.next_time = clock_now;
        }

        // Batched fill: top the lookahead back up to target_ms with one
        // sink node covering every frame we can take this tick.
        let lookahead_ms = (self.next_time - clock_now) * 1000.0;
        if lookahead_ms >= target_ms {
            return;
        }
        let frame_duration_ms = params.frame_duration_ms();
        let needed = ((target_ms - lookahead_ms) / frame_duration_ms).ceil() as usize;
        let frame_count = needed.min(ring.len());

        if frame_count == 0 {
            // Fully drained with nothing in flight: drop the anchor so
            // playback re-anchors at the clock position of the next fill.
            if self.pending_nodes.is_empty() {
                self.next_time = 0.0;
            }
            return;
        }

        let channels = params.channels as usize;
        let spf = params.samples_per_frame as usize;
        self.scratch.resize(params.frame_elems(), 0);

        let mut planar: Vec<Vec<f32>> = (0..channels)
            .map(|_| Vec::with_capacity(frame_count * spf))
            .collect();
        for i in 0..frame_count {
            let slot = (self.ring_head + i) % geometry.ring_cap;
            ring.read_frame(slot, &mut self.scratch);
            for frame in self.scratch.chunks_exact(channels) {
                for (ch, sample) in frame.iter().enumerate() {
                    planar[ch].push(f32::from(*sample) / 32768.0);
                }
            }
        }

        let duration = (frame_count * spf) as f64 / params.sample_rate as f64;
        let id = self.sink.submit(self.next_time, planar);
        self.pending_nodes.push(PendingNode {
            id,
            end_time: self.next_time + duration,
        });
        self.next_time += duration;
        self.ring_head = (self.ring_head + frame_count) % geometry.ring_cap;
        ring.consume(frame_count);
    }

    /// Current phase, derived from the internal gates.
    pub fn phase(&self) -> SchedulerPhase {
        if self.cached.is_none() {
            SchedulerPhase::Unconfigured
        } else if self.pending_flush {
            SchedulerPhase::FlushRequested
        } else if !self.jit_ready {
            SchedulerPhase::Filling
        } else {
            SchedulerPhase::Playing
        }
    }

    /// Nodes submitted to the sink and not yet past their end time.
    pub fn pending_node_count(&self) -> usize {
        self.pending_nodes.len()
    }

    /// Clock position of the next scheduled node, 0 when unanchored.
    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    /// Shared access to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn cancel_pending(&mut self) {
        for node in self.pending_nodes.drain(..) {
            self.sink.cancel(node.id);
        }
    }
}

fn config_valid(region: &SharedRegion) -> bool {
    let p = region.params();
    let g = region.geometry();
    region.is_ready()
        && p.sample_rate > 0
        && p.channels > 0
        && p.samples_per_frame > 0
        && g.ring_cap > 0
        && g.jitter_frames > 0
        && g.target_ms > 0
}

/// Owner of the scheduler's tick thread.
///
/// The sink is constructed on the tick thread itself via `make_sink`, since
/// platform audio handles are frequently bound to their creating thread.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Start ticking against `slot`. Returns once the sink has been
    /// constructed; a sink construction failure is returned here.
    pub fn start<S, F>(slot: ConfigSlot, make_sink: F) -> Result<Self, Error>
    where
        S: AudioSink + 'static,
        F: FnOnce() -> Result<S, Error> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("audio-scheduler".to_string())
            .spawn(move || {
                let sink = match make_sink() {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let mut scheduler = UiScheduler::new(slot, sink);
                while !flag.load(Ordering::Relaxed) {
                    scheduler.tick();
                    std::thread::sleep(TICK_PERIOD);
                }
                debug!("scheduler: tick thread exiting");
            })
            .map_err(|e| Error::Output(format!("failed to start scheduler thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                error!("scheduler: tick thread died during sink construction");
                let _ = thread.join();
                Err(Error::Output("scheduler thread panicked".to_string()))
            }
        }
    }

    /// Stop ticking and join the thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
