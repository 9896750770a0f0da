// ABOUTME: Bounded circular buffer for encoded audio packets
// ABOUTME: Mutex+condvar handoff from the network context to the feeder

use crate::audio::types::MAX_PACKET_BYTES;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One pre-allocated packet slot. Bytes outside `[0, len)` are undefined.
struct PacketSlot {
    data: [u8; MAX_PACKET_BYTES],
    len: usize,
}

impl PacketSlot {
    fn empty() -> Self {
        Self {
            data: [0; MAX_PACKET_BYTES],
            len: 0,
        }
    }
}

struct IntakeState {
    slots: Box<[PacketSlot]>,
    head: usize,
    tail: usize,
    count: usize,
    shutdown: bool,
}

/// Bounded circular queue of encoded packets between the network context
/// (producer) and the feeder thread (consumer).
///
/// Pre-allocated fixed-size slots avoid per-packet heap allocation. The
/// producer never blocks: an oversized or empty packet is rejected, and a
/// full queue drops its oldest entry to preserve recency under load.
pub struct PacketIntake {
    state: Mutex<IntakeState>,
    available: Condvar,
    cap: usize,
    rejected: AtomicU64,
    dropped_oldest: AtomicU64,
}

impl PacketIntake {
    /// Create an intake holding up to `cap` packets.
    pub fn new(cap: usize) -> Self {
        let slots = (0..cap).map(|_| PacketSlot::empty()).collect();
        Self {
            state: Mutex::new(IntakeState {
                slots,
                head: 0,
                tail: 0,
                count: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
            cap,
            rejected: AtomicU64::new(0),
            dropped_oldest: AtomicU64::new(0),
        }
    }

    /// Copy one encoded packet in and wake the consumer.
    ///
    /// Packets with length outside `[1, MAX_PACKET_BYTES]` are rejected and
    /// counted. When the queue is full the oldest packet is dropped first.
    pub fn push(&self, bytes: &[u8]) {
        let len = bytes.len();
        if len == 0 || len > MAX_PACKET_BYTES {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("intake: packet length {len} out of range, dropping");
            return;
        }

        {
            let mut st = self.state.lock();
            if st.count == self.cap {
                st.head = (st.head + 1) % self.cap;
                st.count -= 1;
                self.dropped_oldest.fetch_add(1, Ordering::Relaxed);
                warn!("intake: queue overflow, dropping oldest packet");
            }
            let tail = st.tail;
            st.slots[tail].data[..len].copy_from_slice(bytes);
            st.slots[tail].len = len;
            st.tail = (st.tail + 1) % self.cap;
            st.count += 1;
        }
        self.available.notify_one();
    }

    /// Pop one packet into `buf`, blocking up to `timeout` when empty.
    ///
    /// Returns the packet length (if any) and whether the intake has been
    /// closed. A wait ends on push, close, or timeout, whichever is first.
    pub fn pop_into(
        &self,
        buf: &mut [u8; MAX_PACKET_BYTES],
        timeout: Duration,
    ) -> (Option<usize>, bool) {
        let mut st = self.state.lock();
        if st.count == 0 && !st.shutdown {
            self.available.wait_for(&mut st, timeout);
        }
        if st.count > 0 {
            let head = st.head;
            let len = st.slots[head].len;
            buf[..len].copy_from_slice(&st.slots[head].data[..len]);
            st.head = (st.head + 1) % self.cap;
            st.count -= 1;
            return (Some(len), st.shutdown);
        }
        (None, st.shutdown)
    }

    /// Drop all queued packets.
    pub fn clear(&self) {
        let mut st = self.state.lock();
        st.head = 0;
        st.tail = 0;
        st.count = 0;
    }

    /// Mark the intake closed and wake any blocked consumer.
    pub fn close(&self) {
        {
            let mut st = self.state.lock();
            st.shutdown = true;
        }
        self.available.notify_all();
        debug!("intake: closed");
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    /// True when no packets are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue capacity in packets.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Packets rejected for an out-of-range length.
    pub fn rejected_packets(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Packets evicted by drop-oldest on overflow.
    pub fn dropped_oldest(&self) -> u64 {
        self.dropped_oldest.load(Ordering::Relaxed)
    }
}
