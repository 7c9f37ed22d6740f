//! Capability interfaces the orchestrator (C6) and facade (C7) are generic
//! over (design §9, "Function-pointer tables"): a [`Sink`] that actually
//! puts bytes on the air, and a [`Clock`] for timestamps. The connection-event
//! tick itself is not a capability the core calls out to — it is an inbound
//! notification the platform delivers via [`crate::Service::on_tick`].

/// Outcome of handing a finished packet to the sink.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendResult<E> {
    Ok,
    /// The platform's own notify buffer is saturated; retry after
    /// `on_send_complete`.
    BufferFull,
    Other(E),
}

/// The BLE notify characteristic (or an equivalent transport).
pub trait Sink {
    type Error;

    /// Attempt to send one finished packet.
    fn send(&mut self, bytes: &[u8]) -> SendResult<Self::Error>;
}

/// Source of the millisecond timestamps the writer and parser traffic in.
pub trait Clock {
    fn now(&self) -> u16;
}
