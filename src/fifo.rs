//! Staging FIFO (design §4.5 and §5): the byte ring producers stage MIDI
//! events into before the consumer drains them into the TX ring.
//!
//! A lock-free byte ring shared between producers and a single consumer,
//! in the idiom of an atomic head/tail ring buffer. The consumer side is
//! genuinely lock-free (`Acquire`/`Release` on two counters); concurrent
//! producers serialize with a short-held [`spin::Mutex`] so that each push
//! — including a variable-length sysex-data chunk — commits atomically.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::FifoFull;
use crate::status;

/// Chunk-ID byte for a "set max packet size" control chunk.
pub const SIZE_CONTROL: u8 = 0x0C;
/// Chunk-ID byte for a sysex-data chunk.
pub const SYSEX_DATA: u8 = 0x0D;

/// Largest a sysex-data chunk's body may be: the wire format caps it at
/// 255 bytes (design §4.5); the orchestrator's scratch buffer must be at
/// least this big to always pop a chunk whole.
pub const SYSEX_DATA_CHUNK_MAX_SIZE: usize = 3 + 255;

/// What kind of chunk sits at the head of the FIFO.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkKind {
    /// A 3-byte non-sysex message, or a sysex start/end marker.
    Message,
    SizeControl,
    /// Declared sysex data length in bytes (`<= 255`).
    SysexData(u16),
    /// A chunk-ID byte outside the reserved ranges; the FIFO is corrupt.
    Corrupt,
}

/// Byte ring FIFO of compile-time capacity `N`.
pub struct Fifo<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    head: AtomicUsize,
    tail: AtomicUsize,
    push_lock: spin::Mutex<()>,
}

unsafe impl<const N: usize> Sync for Fifo<N> {}

impl<const N: usize> Default for Fifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Fifo<N> {
    pub fn new() -> Self {
        Fifo {
            buf: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            push_lock: spin::Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn free(&self) -> usize {
        N - self.len()
    }

    fn write_at(&self, start: usize, bytes: &[u8]) {
        // SAFETY: the caller holds `push_lock`, so this is the only writer;
        // the consumer only reads bytes the (already-published) `head` has
        // passed, so it never races this region.
        let buf = unsafe { &mut *self.buf.get() };
        for (i, &b) in bytes.iter().enumerate() {
            buf[(start + i) % N] = b;
        }
    }

    fn read_at(&self, pos: usize) -> u8 {
        // SAFETY: single consumer; only reads bytes already published by a
        // producer's `Release` store to `head`.
        let buf = unsafe { &*self.buf.get() };
        buf[pos % N]
    }

    fn try_reserve(&self, n: usize) -> Result<usize, FifoFull> {
        if self.free() < n {
            return Err(FifoFull);
        }
        Ok(self.head.load(Ordering::Relaxed))
    }

    /// Stage a complete non-sysex message, or a sysex start/end marker
    /// (`status` is `0xF0`/`0xF7`, `d1`/`d2` zero).
    pub fn push_message(&self, status: u8, d1: u8, d2: u8) -> Result<(), FifoFull> {
        let _guard = self.push_lock.lock();
        let head = self.try_reserve(3)?;
        self.write_at(head, &[status, d1, d2]);
        self.head.store(head.wrapping_add(3), Ordering::Release);
        Ok(())
    }

    pub fn push_sysex_start(&self) -> Result<(), FifoFull> {
        self.push_message(status::SYSEX_START, 0, 0)
    }

    pub fn push_sysex_end(&self) -> Result<(), FifoFull> {
        self.push_message(status::SYSEX_END, 0, 0)
    }

    pub fn push_size_control(&self, cap: u16) -> Result<(), FifoFull> {
        let _guard = self.push_lock.lock();
        let head = self.try_reserve(3)?;
        let [lo, hi] = cap.to_le_bytes();
        self.write_at(head, &[SIZE_CONTROL, lo, hi]);
        self.head.store(head.wrapping_add(3), Ordering::Release);
        Ok(())
    }

    /// Stage as much of `data` as currently fits, returning the count
    /// accepted. A short write (`0 < k < data.len()`) is normal; the
    /// caller loops with `&data[k..]`.
    pub fn push_sysex_data(&self, data: &[u8]) -> Result<usize, FifoFull> {
        let _guard = self.push_lock.lock();
        if self.free() < 4 {
            return Err(FifoFull);
        }
        let room_for_data = self.free() - 3;
        let n = room_for_data.min(data.len()).min(255);
        let head = self.head.load(Ordering::Relaxed);
        let [lo, hi] = (n as u16).to_le_bytes();
        self.write_at(head, &[SYSEX_DATA, lo, hi]);
        self.write_at(head.wrapping_add(3), &data[..n]);
        self.head.store(head.wrapping_add(3 + n), Ordering::Release);
        Ok(n)
    }

    /// Identify the chunk at the head without consuming it.
    pub fn peek_kind(&self) -> Option<ChunkKind> {
        if self.is_empty() {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        Some(match self.read_at(tail) {
            0x80..=0xFF => ChunkKind::Message,
            SIZE_CONTROL => ChunkKind::SizeControl,
            SYSEX_DATA => {
                let lo = self.read_at(tail.wrapping_add(1));
                let hi = self.read_at(tail.wrapping_add(2));
                ChunkKind::SysexData(u16::from_le_bytes([lo, hi]))
            }
            _ => ChunkKind::Corrupt,
        })
    }

    /// Pop a 3-byte message/marker/size-control chunk's raw bytes.
    pub fn pop_fixed(&self) -> Option<[u8; 3]> {
        let out = self.peek_fixed()?;
        self.consume_fixed();
        Some(out)
    }

    /// Read a 3-byte chunk's raw bytes without consuming it.
    pub fn peek_fixed(&self) -> Option<[u8; 3]> {
        if self.len() < 3 {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        Some([
            self.read_at(tail),
            self.read_at(tail.wrapping_add(1)),
            self.read_at(tail.wrapping_add(2)),
        ])
    }

    /// Drop the 3-byte chunk a prior [`Fifo::peek_fixed`] observed.
    pub fn consume_fixed(&self) {
        let tail = self.tail.load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(3), Ordering::Release);
    }

    /// Pop a whole sysex-data chunk into `scratch`, returning the number
    /// of data bytes copied. `scratch` must be at least
    /// [`SYSEX_DATA_CHUNK_MAX_SIZE`] `- 3` bytes so a chunk is never
    /// truncated (the wire format caps a single chunk at 255 data bytes).
    /// `None` if the chunk has not been fully staged yet.
    pub fn pop_sysex_data(&self, scratch: &mut [u8]) -> Option<usize> {
        if self.len() < 3 {
            return None;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let lo = self.read_at(tail.wrapping_add(1));
        let hi = self.read_at(tail.wrapping_add(2));
        let total = u16::from_le_bytes([lo, hi]) as usize;
        if self.len() < 3 + total {
            return None;
        }
        let n = total.min(scratch.len());
        for (i, slot) in scratch.iter_mut().take(n).enumerate() {
            *slot = self.read_at(tail.wrapping_add(3 + i));
        }
        self.tail.store(tail.wrapping_add(3 + total), Ordering::Release);
        Some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_message_round_trips() {
        let fifo: Fifo<32> = Fifo::new();
        fifo.push_message(0x90, 60, 100).unwrap();
        assert_eq!(fifo.peek_kind(), Some(ChunkKind::Message));
        assert_eq!(fifo.pop_fixed(), Some([0x90, 60, 100]));
        assert!(fifo.is_empty());
    }

    #[test]
    fn sysex_markers_are_3_byte_messages() {
        let fifo: Fifo<32> = Fifo::new();
        fifo.push_sysex_start().unwrap();
        fifo.push_sysex_end().unwrap();
        assert_eq!(fifo.pop_fixed(), Some([0xF0, 0, 0]));
        assert_eq!(fifo.pop_fixed(), Some([0xF7, 0, 0]));
    }

    #[test]
    fn size_control_round_trips() {
        let fifo: Fifo<32> = Fifo::new();
        fifo.push_size_control(247).unwrap();
        assert_eq!(fifo.peek_kind(), Some(ChunkKind::SizeControl));
        let bytes = fifo.pop_fixed().unwrap();
        assert_eq!(u16::from_le_bytes([bytes[1], bytes[2]]), 247);
    }

    #[test]
    fn sysex_data_round_trips() {
        let fifo: Fifo<32> = Fifo::new();
        let data = [1u8, 2, 3, 4, 5];
        let n = fifo.push_sysex_data(&data).unwrap();
        assert_eq!(n, 5);
        assert_eq!(fifo.peek_kind(), Some(ChunkKind::SysexData(5)));
        let mut scratch = [0u8; 255];
        assert_eq!(fifo.pop_sysex_data(&mut scratch), Some(5));
        assert_eq!(&scratch[..5], &data);
    }

    #[test]
    fn sysex_data_short_write_when_fifo_nearly_full() {
        let fifo: Fifo<10> = Fifo::new();
        // 3-byte header leaves 7 bytes of room.
        let n = fifo.push_sysex_data(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn full_fifo_rejects_message() {
        let fifo: Fifo<3> = Fifo::new();
        fifo.push_message(0x90, 1, 2).unwrap();
        assert_eq!(fifo.push_message(0x80, 1, 2).unwrap_err(), FifoFull);
    }

    #[test]
    fn preserves_producer_order() {
        let fifo: Fifo<64> = Fifo::new();
        for i in 0u8..10 {
            fifo.push_message(0x90, i, 127).unwrap();
        }
        for i in 0u8..10 {
            assert_eq!(fifo.pop_fixed(), Some([0x90, i, 127]));
        }
    }

    #[test]
    fn corrupt_chunk_id_is_reported() {
        let fifo: Fifo<32> = Fifo::new();
        // Bypass the producer API to simulate a corrupted chunk-ID byte.
        fifo.write_at(0, &[0x01, 0, 0]);
        fifo.head.store(3, Ordering::Release);
        assert_eq!(fifo.peek_kind(), Some(ChunkKind::Corrupt));
    }
}
