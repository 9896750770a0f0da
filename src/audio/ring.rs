// ABOUTME: SPSC ring of decoded PCM frames shared across contexts
// ABOUTME: Release/acquire on the frame count is the only synchronization

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, Ordering};

/// Fixed-capacity ring of decoded PCM frames shared between the feeder
/// thread (writer) and the scheduler context (reader).
///
/// One contiguous allocation of `cap * frame_elems` interleaved i16 samples.
/// The writer keeps its own tail index and the reader keeps its own head
/// index; the only shared state is the atomic frame count.
///
/// # Safety
///
/// This type uses `UnsafeCell` internally but upholds the usual SPSC
/// contract:
/// - Exactly one writer ([`write_frame`](Self::write_frame),
///   [`publish`](Self::publish), [`reset`](Self::reset)) and one reader
///   ([`read_frame`](Self::read_frame), [`consume`](Self::consume)) at a
///   time, enforced by design, not by the type system.
/// - The writer only touches slots the reader cannot see (count below
///   capacity, slot at its private tail), and publishes them with a release
///   increment; the reader loads the count with acquire before reading.
/// - A reader that observes a count one less than actual is delayed by one
///   frame for one tick; it never observes a torn frame.
pub struct PcmRing {
    pcm: UnsafeCell<Box<[i16]>>,
    size: CachePadded<AtomicI32>,
    cap: usize,
    frame_elems: usize,
}

// SAFETY: single producer, single consumer, coordinated through `size`.
// No mutable aliasing is possible within those rules.
unsafe impl Sync for PcmRing {}
unsafe impl Send for PcmRing {}

impl PcmRing {
    /// Allocate a zeroed ring of `cap` frames of `frame_elems` samples each.
    pub fn new(cap: usize, frame_elems: usize) -> Self {
        Self {
            pcm: UnsafeCell::new(vec![0i16; cap * frame_elems].into_boxed_slice()),
            size: CachePadded::new(AtomicI32::new(0)),
            cap,
            frame_elems,
        }
    }

    /// Ring capacity in frames.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Interleaved samples per frame slot.
    pub fn frame_elems(&self) -> usize {
        self.frame_elems
    }

    /// Frames currently visible to the reader.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire).max(0) as usize
    }

    /// True when no frames are visible to the reader.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writer-side saturation test; a relaxed load is enough because only
    /// the writer increments the count.
    pub fn is_saturated(&self) -> bool {
        self.size.load(Ordering::Relaxed) as usize >= self.cap
    }

    /// Copy one frame into the slot at `tail`. Writer side only; the slot
    /// must not yet be published.
    pub fn write_frame(&self, tail: usize, frame: &[i16]) {
        debug_assert!(tail < self.cap);
        debug_assert_eq!(frame.len(), self.frame_elems);
        let offset = tail * self.frame_elems;
        // SAFETY: the slot at `tail` is outside the published window, so the
        // reader cannot access it concurrently.
        unsafe {
            let pcm = &mut *self.pcm.get();
            pcm[offset..offset + self.frame_elems].copy_from_slice(frame);
        }
    }

    /// Make the most recently written frame visible to the reader.
    pub fn publish(&self) {
        self.size.fetch_add(1, Ordering::Release);
    }

    /// Copy the frame at `head` out. Reader side only; the slot must have
    /// been observed via [`len`](Self::len) before reading.
    pub fn read_frame(&self, head: usize, out: &mut [i16]) {
        debug_assert!(head < self.cap);
        debug_assert_eq!(out.len(), self.frame_elems);
        let offset = head * self.frame_elems;
        // SAFETY: published slots are never rewritten until the reader
        // consumes them, so this read cannot race with the writer.
        unsafe {
            let pcm = &*self.pcm.get();
            out.copy_from_slice(&pcm[offset..offset + self.frame_elems]);
        }
    }

    /// Return `n` consumed frames to the writer.
    pub fn consume(&self, n: usize) {
        self.size.fetch_sub(n as i32, Ordering::AcqRel);
    }

    /// Drop all published frames. Writer side only; the writer resets its
    /// tail to zero alongside this call.
    pub fn reset(&self) {
        self.size.store(0, Ordering::Release);
    }
}
