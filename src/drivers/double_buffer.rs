//! Two-slot handoff between a completion context and the control loop.
//!
//! The writer always fills the slot that is not currently readable and then
//! flips the readable index. The reader announces the slot it is copying so
//! that a writer which has lapped it drops the sample instead of
//! overwriting the slot under the copy. Neither side ever waits.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

const NO_SLOT: u8 = u8::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotId {
    First,
    Second,
}

impl SlotId {
    fn from_index(index: u8) -> Self {
        if index == 0 {
            SlotId::First
        } else {
            SlotId::Second
        }
    }
}

#[derive(Clone, Copy)]
struct Stamped<T> {
    value: T,
    /// 0 means "never written".
    stamp: u32,
}

pub struct DoubleBuffer<T> {
    slots: [UnsafeCell<Stamped<T>>; 2],
    readable: AtomicU8,
    reading: AtomicU8,
}

// Slot access is partitioned between exactly one `Writer` and one `Reader`
// by the `readable`/`reading` protocol.
unsafe impl<T: Send> Sync for DoubleBuffer<T> {}

impl<T: Copy> DoubleBuffer<T> {
    /// Both slots start out holding `initial`; it is what the reader sees
    /// until the first write completes.
    pub const fn new(initial: T) -> Self {
        Self {
            slots: [
                UnsafeCell::new(Stamped { value: initial, stamp: 0 }),
                UnsafeCell::new(Stamped { value: initial, stamp: 0 }),
            ],
            readable: AtomicU8::new(0),
            reading: AtomicU8::new(NO_SLOT),
        }
    }

    /// Hands out the single writer and the single reader.
    pub fn split(&mut self) -> (Writer<'_, T>, Reader<'_, T>) {
        let this: &Self = self;
        (
            Writer { buf: this, next_stamp: 1, dropped: 0 },
            Reader { buf: this, last_seen: 0 },
        )
    }
}

/// Completion-side handle.
pub struct Writer<'a, T> {
    buf: &'a DoubleBuffer<T>,
    next_stamp: u32,
    dropped: u32,
}

impl<'a, T: Copy> Writer<'a, T> {
    /// Publishes `value` and returns the slot that is readable afterwards.
    ///
    /// If the reader is still copying the slot this write would target, the
    /// sample is dropped and the previously published slot is returned.
    pub fn write_done(&mut self, value: T) -> SlotId {
        self.write_with(|slot| *slot = value)
    }

    /// Like [`Writer::write_done`] but fills the inactive slot in place.
    pub fn write_with(&mut self, fill: impl FnOnce(&mut T)) -> SlotId {
        let current = self.buf.readable.load(Ordering::SeqCst);
        let target = current ^ 1;
        if self.buf.reading.load(Ordering::SeqCst) == target {
            self.dropped = self.dropped.wrapping_add(1);
            return SlotId::from_index(current);
        }

        // SAFETY: `target` is not readable and the reader has not claimed
        // it, so no reader copy of this slot can start until the flip below.
        let slot = unsafe { &mut *self.buf.slots[target as usize].get() };
        fill(&mut slot.value);
        slot.stamp = self.next_stamp;
        self.next_stamp = match self.next_stamp.wrapping_add(1) {
            0 => 1,
            n => n,
        };

        self.buf.readable.store(target, Ordering::SeqCst);
        SlotId::from_index(target)
    }

    /// Samples discarded because the reader held the target slot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Control-loop-side handle.
pub struct Reader<'a, T> {
    buf: &'a DoubleBuffer<T>,
    last_seen: u32,
}

impl<'a, T: Copy> Reader<'a, T> {
    fn read_stamped(&self) -> Stamped<T> {
        loop {
            let index = self.buf.readable.load(Ordering::SeqCst);
            self.buf.reading.store(index, Ordering::SeqCst);
            if self.buf.readable.load(Ordering::SeqCst) != index {
                // Flipped between the load and the claim; the writer may
                // already be inside `index`.
                continue;
            }

            // SAFETY: `index` is claimed and was readable after the claim,
            // so the writer skips it until `reading` is cleared.
            let copy = unsafe { *self.buf.slots[index as usize].get() };
            self.buf.reading.store(NO_SLOT, Ordering::SeqCst);
            return copy;
        }
    }

    /// Returns the readable slot if a write completed since the last call
    /// that returned `Some`.
    pub fn try_read(&mut self) -> Option<T> {
        let copy = self.read_stamped();
        if copy.stamp == 0 || copy.stamp == self.last_seen {
            return None;
        }
        self.last_seen = copy.stamp;
        Some(copy.value)
    }

    /// Returns the readable slot unconditionally; the initial value until
    /// the first write.
    pub fn latest(&mut self) -> T {
        let copy = self.read_stamped();
        if copy.stamp != 0 {
            self.last_seen = copy.stamp;
        }
        copy.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_initial_value_until_first_write() {
        let mut buf = DoubleBuffer::new([0u8; 6]);
        let (mut writer, mut reader) = buf.split();

        assert_eq!(reader.try_read(), None);
        assert_eq!(reader.latest(), [0u8; 6]);

        assert_eq!(writer.write_done([1u8; 6]), SlotId::Second);
        assert_eq!(reader.try_read(), Some([1u8; 6]));
    }

    #[test]
    fn test_try_read_only_reports_new_writes() {
        let mut buf = DoubleBuffer::new(0u32);
        let (mut writer, mut reader) = buf.split();

        writer.write_done(7);
        assert_eq!(reader.try_read(), Some(7));
        assert_eq!(reader.try_read(), None);
        assert_eq!(reader.latest(), 7);

        // Same value twice is still two writes.
        writer.write_done(7);
        assert_eq!(reader.try_read(), Some(7));
    }

    #[test]
    fn test_slots_alternate() {
        let mut buf = DoubleBuffer::new(0u16);
        let (mut writer, mut reader) = buf.split();

        assert_eq!(writer.write_done(1), SlotId::Second);
        assert_eq!(writer.write_done(2), SlotId::First);
        assert_eq!(writer.write_done(3), SlotId::Second);
        // Only the newest survives.
        assert_eq!(reader.try_read(), Some(3));
        assert_eq!(writer.dropped(), 0);
    }

    #[test]
    fn test_write_with_fills_in_place() {
        let mut buf = DoubleBuffer::new([0u8; 4]);
        let (mut writer, mut reader) = buf.split();

        writer.write_with(|slot| slot[2] = 9);
        assert_eq!(reader.try_read(), Some([0, 0, 9, 0]));
    }

    /// Writer thread hammers the buffer with uniform arrays; every read
    /// must be uniform and never go backwards.
    #[test]
    fn test_no_torn_reads_under_contention() {
        const WRITES: u32 = 200_000;
        let mut buf = DoubleBuffer::new([0u32; 32]);
        let (mut writer, mut reader) = buf.split();
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 1..=WRITES {
                    writer.write_done([i; 32]);
                }
                done.store(true, Ordering::SeqCst);
            });

            let mut last = 0;
            let mut reads = 0u32;
            loop {
                let finished = done.load(Ordering::SeqCst);
                let value = reader.latest();
                assert!(value.iter().all(|&v| v == value[0]), "torn read: {value:?}");
                assert!(value[0] >= last);
                last = value[0];
                reads += 1;
                if finished {
                    break;
                }
            }
            assert!(reads > 0);
        });
    }
}
