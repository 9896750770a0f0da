// ABOUTME: Scheduler tests driven with synthetic wall clock and mock sink
// ABOUTME: Cold start, steady state, gap recovery, teardown, anchor reset

mod common;

use common::MockSink;
use gamestream_audio::audio::handshake::{ConfigSlot, SharedRegion};
use gamestream_audio::audio::output::SinkState;
use gamestream_audio::audio::types::{Geometry, StreamParams};
use gamestream_audio::scheduler::SchedulerPhase;
use gamestream_audio::UiScheduler;
use std::sync::Arc;

fn seed_params() -> StreamParams {
    StreamParams {
        sample_rate: 48_000,
        channels: 2,
        samples_per_frame: 240,
    }
}

fn ready_region(params: StreamParams, jitter_ms_override: u32) -> Arc<SharedRegion> {
    let region = Arc::new(SharedRegion::new(
        params,
        Geometry::derive(&params, jitter_ms_override),
    ));
    region.mark_ready();
    region
}

/// Stand-in for the feeder's write side with its private tail index.
struct Filler {
    tail: usize,
}

impl Filler {
    fn new() -> Self {
        Self { tail: 0 }
    }

    fn fill(&mut self, region: &SharedRegion, frames: usize, marker: i16) {
        let ring = region.ring();
        let frame = vec![marker; ring.frame_elems()];
        for _ in 0..frames {
            ring.write_frame(self.tail, &frame);
            self.tail = (self.tail + 1) % ring.cap();
            ring.publish();
        }
    }

    fn reset(&mut self) {
        self.tail = 0;
    }
}

#[test]
fn test_unconfigured_without_publication() {
    let slot = ConfigSlot::new();
    let mut sched = UiScheduler::new(slot, MockSink::new());

    for i in 0..5 {
        sched.tick_at(i as f64 * 5.0);
    }
    assert_eq!(sched.phase(), SchedulerPhase::Unconfigured);
    assert!(sched.sink().submissions.is_empty());
}

#[test]
fn test_unready_region_is_not_acquired() {
    let params = seed_params();
    let region = Arc::new(SharedRegion::new(params, Geometry::derive(&params, 0)));
    let slot = ConfigSlot::new();
    slot.publish(region);

    let mut sched = UiScheduler::new(slot, MockSink::new());
    sched.tick_at(0.0);
    assert_eq!(sched.phase(), SchedulerPhase::Unconfigured);
}

#[test]
fn test_cold_start_waits_for_jitter_fill() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());
    let mut filler = Filler::new();

    // 19 of 20 jitter frames: no audio may start
    filler.fill(&region, 19, 1);
    for i in 0..10 {
        sched.tick_at(i as f64 * 5.0);
    }
    assert_eq!(sched.phase(), SchedulerPhase::Filling);
    assert!(sched.sink().submissions.is_empty());

    // The 20th frame opens the gate; the whole buffer goes out as one node
    filler.fill(&region, 1, 1);
    sched.tick_at(55.0);
    assert_eq!(sched.phase(), SchedulerPhase::Playing);
    assert_eq!(sched.sink().submissions.len(), 1);

    let submission = &sched.sink().submissions[0];
    assert_eq!(submission.when, 0.0);
    assert_eq!(submission.channels.len(), 2);
    assert_eq!(submission.channels[0].len(), 20 * 240);
    assert!((sched.next_time() - 0.1).abs() < 1e-9);
    assert!(region.ring().is_empty());
}

#[test]
fn test_steady_state_one_node_per_tick() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());
    let mut filler = Filler::new();

    filler.fill(&region, 20, 1);
    sched.tick_at(0.0);
    sched.tick_at(5.0);
    assert_eq!(sched.sink().submissions.len(), 1);

    // One 5 ms frame arrives per 5 ms tick, clock advancing in lockstep
    let mut wall = 5.0;
    for _ in 0..20 {
        wall += 5.0;
        sched.sink_mut().clock += 0.005;
        filler.fill(&region, 1, 1);
        let before = sched.sink().submissions.len();
        sched.tick_at(wall);
        assert_eq!(sched.sink().submissions.len(), before + 1);

        let lookahead = sched.next_time() - sched.sink().clock_now();
        assert!(lookahead >= 0.0, "lookahead went negative: {lookahead}");
        assert!(lookahead <= 0.1 + 0.005 + 1e-9, "lookahead too deep: {lookahead}");
    }
}

#[test]
fn test_suspension_gap_triggers_flush_handshake() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());
    let mut filler = Filler::new();

    filler.fill(&region, 20, 1);
    sched.tick_at(0.0);
    sched.tick_at(5.0);
    assert_eq!(sched.phase(), SchedulerPhase::Playing);
    assert_eq!(sched.pending_node_count(), 1);

    // Host suspends the clock: ticks only attempt resume, wall time is
    // not recorded, so the eventual gap spans the whole suspension
    sched.sink_mut().state = SinkState::Suspended;
    for i in 0..3 {
        sched.tick_at(10.0 + i as f64 * 5.0);
    }
    assert_eq!(sched.sink().resume_requests, 3);
    assert!(sched.sink().submissions.len() == 1);

    // Clock comes back 500 ms later with stale frames in the ring
    filler.fill(&region, 30, 2);
    sched.sink_mut().state = SinkState::Running;
    sched.tick_at(505.0);
    assert_eq!(sched.phase(), SchedulerPhase::FlushRequested);
    assert!(region.flush_requested());
    assert_eq!(sched.sink().cancelled.len(), 1);
    assert_eq!(sched.pending_node_count(), 0);
    assert_eq!(sched.next_time(), 0.0);

    // Ack still outstanding: the scheduler must not consume
    sched.tick_at(510.0);
    assert_eq!(sched.phase(), SchedulerPhase::FlushRequested);
    assert_eq!(sched.sink().submissions.len(), 1);

    // Decoder worker acks: ring reset to slot zero, then the request clears
    region.ring().reset();
    filler.reset();
    region.ack_flush();
    sched.tick_at(515.0);
    assert_eq!(sched.phase(), SchedulerPhase::Filling);

    // Audio resumes only after a fresh jitter buffer accumulates
    filler.fill(&region, 19, 3);
    sched.tick_at(520.0);
    assert_eq!(sched.phase(), SchedulerPhase::Filling);
    assert_eq!(sched.sink().submissions.len(), 1);

    filler.fill(&region, 1, 3);
    sched.sink_mut().clock = 1.0;
    sched.tick_at(525.0);
    assert_eq!(sched.phase(), SchedulerPhase::Playing);
    assert_eq!(sched.sink().submissions.len(), 2);
    // Post-flush playback reads from slot zero: marker 3, not the stale 2
    let resumed = sched.sink().submissions.last().unwrap();
    assert_eq!(resumed.channels[0][0], 3.0 / 32768.0);
}

#[test]
fn test_pipeline_down_releases_config_and_cancels() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot.clone(), MockSink::new());
    let mut filler = Filler::new();

    filler.fill(&region, 20, 1);
    sched.tick_at(0.0);
    sched.tick_at(5.0);
    assert_eq!(sched.pending_node_count(), 1);

    region.mark_down();
    slot.clear();
    sched.tick_at(10.0);
    assert_eq!(sched.phase(), SchedulerPhase::Unconfigured);
    assert_eq!(sched.sink().cancelled.len(), 1);

    // Stays quiet until a new session publishes
    sched.tick_at(15.0);
    assert_eq!(sched.sink().submissions.len(), 1);
}

#[test]
fn test_anchor_resets_when_drained() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());
    let mut filler = Filler::new();

    filler.fill(&region, 20, 1);
    sched.tick_at(0.0);
    sched.tick_at(5.0);
    assert!((sched.next_time() - 0.1).abs() < 1e-9);

    // Playback runs past the scheduled tail with no new frames
    sched.sink_mut().clock = 0.2;
    sched.tick_at(10.0);
    assert_eq!(sched.pending_node_count(), 0);
    assert_eq!(sched.next_time(), 0.0);

    // New audio re-anchors at the current clock position
    filler.fill(&region, 20, 2);
    sched.tick_at(15.0);
    let resumed = sched.sink().submissions.last().unwrap();
    assert_eq!(resumed.when, 0.2);
}

#[test]
fn test_sample_conversion_and_deinterleave() {
    let params = seed_params();
    // Tiny jitter target so one frame starts playback
    let region = ready_region(params, 5);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());

    let ring = region.ring();
    let mut frame = vec![0i16; ring.frame_elems()];
    for pair in frame.chunks_exact_mut(2) {
        pair[0] = 1000;
        pair[1] = -2000;
    }
    ring.write_frame(0, &frame);
    ring.publish();

    sched.tick_at(0.0);
    sched.tick_at(5.0);
    let submission = sched.sink().submissions.last().unwrap();
    assert_eq!(submission.channels.len(), 2);
    assert!(submission.channels[0].iter().all(|&s| s == 1000.0 / 32768.0));
    assert!(submission.channels[1].iter().all(|&s| s == -2000.0 / 32768.0));
}

#[test]
fn test_next_time_snaps_forward_to_clock() {
    let region = ready_region(seed_params(), 0);
    let slot = ConfigSlot::new();
    slot.publish(Arc::clone(&region));

    let mut sched = UiScheduler::new(slot, MockSink::new());
    let mut filler = Filler::new();

    filler.fill(&region, 20, 1);
    sched.sink_mut().clock = 3.5;
    sched.tick_at(0.0);
    sched.tick_at(5.0);

    // Scheduling in the past is impossible: the node lands at the clock
    let submission = sched.sink().submissions.last().unwrap();
    assert_eq!(submission.when, 3.5);
    assert!(sched.next_time() >= 3.5);
}
