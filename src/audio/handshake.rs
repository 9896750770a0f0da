// ABOUTME: Shared region published from the pipeline to the scheduler context
// ABOUTME: Carries ring geometry plus the readiness and flush signals

use crate::audio::ring::PcmRing;
use crate::audio::types::{Geometry, StreamParams};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// State shared between the decoder worker and the scheduler context.
///
/// Geometry fields are written once before the region is published and never
/// change afterwards. `init_done` gates the scheduler: it is stored 1 as the
/// last step of initialization and 0 as the first step of teardown.
/// `flush_request` is a two-way signal with exactly one writer per direction:
/// the scheduler raises it, the decoder worker clears it.
pub struct SharedRegion {
    params: StreamParams,
    geometry: Geometry,
    ring: PcmRing,
    init_done: AtomicI32,
    flush_request: AtomicI32,
}

impl SharedRegion {
    /// Allocate a region for the given stream and geometry. Not yet ready:
    /// call [`mark_ready`](Self::mark_ready) once every collaborator is up.
    pub fn new(params: StreamParams, geometry: Geometry) -> Self {
        Self {
            params,
            geometry,
            ring: PcmRing::new(geometry.ring_cap, params.frame_elems()),
            init_done: AtomicI32::new(0),
            flush_request: AtomicI32::new(0),
        }
    }

    /// Stream parameters this region was sized for.
    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Derived buffer geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The shared PCM ring.
    pub fn ring(&self) -> &PcmRing {
        &self.ring
    }

    /// Publish readiness. Must be the last initialization step so a reader
    /// that observes it sees valid geometry and an empty ring.
    pub fn mark_ready(&self) {
        self.init_done.store(1, Ordering::Release);
    }

    /// Withdraw readiness. Must be the first teardown step; the scheduler
    /// releases its cached handle within one tick of observing it.
    pub fn mark_down(&self) {
        self.init_done.store(0, Ordering::Release);
    }

    /// True while the pipeline behind this region is live.
    pub fn is_ready(&self) -> bool {
        self.init_done.load(Ordering::Acquire) == 1
    }

    /// Scheduler side: request a flush of all queued and decoded audio.
    /// The caller must stop consuming until the request reads clear again.
    pub fn request_flush(&self) {
        self.flush_request.store(1, Ordering::Release);
    }

    /// True while a flush request is outstanding.
    pub fn flush_requested(&self) -> bool {
        self.flush_request.load(Ordering::Acquire) == 1
    }

    /// Decoder worker side: acknowledge a flush. Only valid after the intake
    /// has been cleared and the ring reset, in that order, so an observer of
    /// the clear signal finds a quiescent ring.
    pub fn ack_flush(&self) {
        self.flush_request.store(0, Ordering::Release);
    }
}

/// Publication slot for the shared region handle.
///
/// The pipeline stores its region here when it becomes ready and clears it at
/// teardown; the scheduler polls the slot each tick until a handle appears.
/// Cloning shares the slot.
#[derive(Clone, Default)]
pub struct ConfigSlot {
    inner: Arc<Mutex<Option<Arc<SharedRegion>>>>,
}

impl ConfigSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a region handle.
    pub fn publish(&self, region: Arc<SharedRegion>) {
        *self.inner.lock() = Some(region);
    }

    /// Withdraw the published handle.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    /// Current handle, if any.
    pub fn get(&self) -> Option<Arc<SharedRegion>> {
        self.inner.lock().clone()
    }
}
