//! Service facade (design §4.7, §9): the public surface applications call.
//!
//! Owns the TX queue/ring/FIFO, a sink and a clock, and exposes `tx_*`
//! plus a ready-state callback. Per design §9 ("Global mutable state"),
//! there is no singleton: everything lives on this struct, built once by
//! [`Service::init`] and owned by the caller.

use crate::error::ServiceError;
use crate::packet::Writer;
use crate::ports::{Clock, SendResult, Sink};
use crate::queue::TxQueue;

/// BLE MIDI service UUID (`03B80E5A-EDE8-4B33-A751-6CE34EC4C700`), RFC 4122
/// byte order. GATT registration itself is out of scope here (the platform
/// owns that); this is just the constant the platform needs to use it.
pub const SERVICE_UUID: [u8; 16] = [
    0x03, 0xB8, 0x0E, 0x5A, 0xED, 0xE8, 0x4B, 0x33, 0xA7, 0x51, 0x6C, 0xE3, 0x4E, 0xC4, 0xC7, 0x00,
];

/// BLE MIDI characteristic UUID (`7772E5DB-3868-4112-A1A9-F2669D106BF3`).
pub const CHARACTERISTIC_UUID: [u8; 16] = [
    0x77, 0x72, 0xE5, 0xDB, 0x38, 0x68, 0x41, 0x12, 0xA1, 0xA9, 0xF2, 0x66, 0x9D, 0x10, 0x6B, 0xF3,
];

/// One of the three mutually-exclusive build-time operating modes
/// (design §4.7), chosen once at construction rather than by
/// conditional compilation (design §9).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Every `tx_*` synchronously produces one notification; no FIFO, no ring.
    SingleMessage,
    /// Producers push into the FIFO; a connection-event tick drains it.
    BatchedOnTick,
    /// Producers push into the FIFO; the user calls `tx_flush`.
    BatchedManual,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadyState {
    Disconnected,
    Connected,
    Ready,
}

/// Application hooks the facade drives. Stored on the [`Service`] instance
/// rather than as a global function-pointer table (design §9).
pub trait Callbacks {
    fn on_ready(&mut self, state: ReadyState);
    /// A previously `BufferFull` send has drained. No-op by default.
    fn on_tx_done(&mut self) {}
}

/// `K`/`CAP`/`N` are the TX ring depth, per-packet buffer capacity, and
/// staging FIFO capacity (the reference `RING_DEPTH`, `PACKET_MAX_SIZE`,
/// `FIFO_CAPACITY` knobs).
pub struct Service<const K: usize, const CAP: usize, const N: usize, S: Sink, C: Clock, U: Callbacks>
{
    queue: TxQueue<K, CAP, N>,
    mode: Mode,
    sink: S,
    clock: C,
    callbacks: Option<U>,
    ready: ReadyState,
    /// *single-message* mode has no ring to carry `in_sysex` across calls,
    /// so the facade tracks it directly.
    single_msg_in_sysex: bool,
}

impl<const K: usize, const CAP: usize, const N: usize, S: Sink, C: Clock, U: Callbacks>
    Service<K, CAP, N, S, C, U>
{
    pub fn new(
        mode: Mode,
        sink: S,
        clock: C,
        running_status_enabled: bool,
        note_off_as_note_on: bool,
    ) -> Self {
        Service {
            queue: TxQueue::new(running_status_enabled, note_off_as_note_on),
            mode,
            sink,
            clock,
            callbacks: None,
            ready: ReadyState::Disconnected,
            single_msg_in_sysex: false,
        }
    }

    /// Install the application's callbacks. A second call returns
    /// `AlreadyInitialized` rather than replacing them.
    pub fn init(&mut self, user_callbacks: U) -> Result<(), ServiceError> {
        if self.callbacks.is_some() {
            return Err(ServiceError::AlreadyInitialized);
        }
        self.callbacks = Some(user_callbacks);
        Ok(())
    }

    /// Platform GATT-connection-state glue calls this as the link comes up,
    /// goes ready, and goes down. On disconnect, resets the orchestrator
    /// (design §5: "clears FIFO, resets ring, clears atomics").
    pub fn on_ready_state_changed(&mut self, state: ReadyState) {
        self.ready = state;
        if state == ReadyState::Disconnected {
            self.queue.reset();
            self.single_msg_in_sysex = false;
        }
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_ready(state);
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn require_connected(&self) -> Result<(), ServiceError> {
        if self.ready == ReadyState::Ready {
            Ok(())
        } else {
            Err(ServiceError::NotConnected)
        }
    }

    fn send_packet(&mut self, w: &Writer<CAP>) -> Result<(), ServiceError> {
        match self.sink.send(w.bytes()) {
            SendResult::Ok => Ok(()),
            SendResult::BufferFull => Err(ServiceError::TxFifoFull),
            SendResult::Other(_) => Err(ServiceError::InvalidArgument),
        }
    }

    pub fn tx_msg(&mut self, bytes: [u8; 3]) -> Result<(), ServiceError> {
        self.require_connected()?;
        match self.mode {
            Mode::SingleMessage => {
                let mut w: Writer<CAP> = Writer::new(false, false);
                let now = self.clock.now();
                w.append_message(bytes, now)?;
                self.send_packet(&w)
            }
            Mode::BatchedOnTick | Mode::BatchedManual => {
                self.queue.push_message(bytes[0], bytes[1], bytes[2])?;
                Ok(())
            }
        }
    }

    pub fn tx_sysex_start(&mut self) -> Result<(), ServiceError> {
        self.require_connected()?;
        match self.mode {
            Mode::SingleMessage => {
                if self.single_msg_in_sysex {
                    return Err(ServiceError::InvalidArgument);
                }
                let mut w: Writer<CAP> = Writer::new(false, false);
                let now = self.clock.now();
                w.begin_sysex(now)?;
                self.send_packet(&w)?;
                self.single_msg_in_sysex = true;
                Ok(())
            }
            Mode::BatchedOnTick | Mode::BatchedManual => {
                self.queue.push_sysex_start()?;
                Ok(())
            }
        }
    }

    pub fn tx_sysex_data(&mut self, data: &[u8]) -> Result<usize, ServiceError> {
        self.require_connected()?;
        match self.mode {
            Mode::SingleMessage => {
                if !self.single_msg_in_sysex {
                    return Err(ServiceError::InvalidArgument);
                }
                let mut w: Writer<CAP> = Writer::new(false, false);
                w.continue_sysex();
                let now = self.clock.now();
                let n = w.append_sysex_data(data, now)?;
                self.send_packet(&w)?;
                Ok(n)
            }
            Mode::BatchedOnTick | Mode::BatchedManual => Ok(self.queue.push_sysex_data(data)?),
        }
    }

    pub fn tx_sysex_end(&mut self) -> Result<(), ServiceError> {
        self.require_connected()?;
        match self.mode {
            Mode::SingleMessage => {
                if !self.single_msg_in_sysex {
                    return Err(ServiceError::InvalidArgument);
                }
                let mut w: Writer<CAP> = Writer::new(false, false);
                w.continue_sysex();
                let now = self.clock.now();
                w.end_sysex(now)?;
                self.send_packet(&w)?;
                self.single_msg_in_sysex = false;
                Ok(())
            }
            Mode::BatchedOnTick | Mode::BatchedManual => {
                self.queue.push_sysex_end()?;
                Ok(())
            }
        }
    }

    /// *batched-manual* mode only: runs the orchestrator's send loop once.
    pub fn tx_flush(&mut self) -> Result<(), ServiceError> {
        if self.mode != Mode::BatchedManual {
            return Err(ServiceError::InvalidArgument);
        }
        self.queue.flush_ring_to_sink(&mut self.sink, &self.clock);
        Ok(())
    }

    /// *batched-on-tick* mode: drives the send loop from the platform's
    /// connection-event tick. A no-op in the other two modes.
    pub fn on_tick(&mut self) {
        if self.mode == Mode::BatchedOnTick {
            self.queue.flush_ring_to_sink(&mut self.sink, &self.clock);
        }
    }

    /// Platform notify-complete callback: clears the orchestrator's
    /// backpressure flag and forwards `tx_done` to the application.
    pub fn on_send_complete(&mut self) {
        self.queue.on_send_complete();
        if let Some(cb) = self.callbacks.as_mut() {
            cb.on_tx_done();
        }
    }
}
