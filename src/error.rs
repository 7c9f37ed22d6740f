//! Error taxonomy (design §7).
//!
//! Three tiers, matching the three tiers of the design: writer/parser
//! errors are internal to C2/C3 and mostly recovered from locally by the
//! orchestrator (C6); FIFO errors are a single `Full` signal to a producer;
//! service errors are what actually reaches the application through the
//! facade (C7).

/// Errors from the packet writer (C2) and packet parser (C3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// The packet has no room left for the bytes being appended. Internal
    /// to C2; the orchestrator reacts to this by advancing the ring, it is
    /// never returned to the application (§7).
    PacketFull,
    /// `begin_sysex` called while already inside a sysex message.
    AlreadyInSysex,
    /// `append_sysex_data` / `end_sysex` called while not inside a sysex
    /// message.
    NotInSysex,
    /// A status byte that is not valid in the current context (e.g. a
    /// non-realtime status while `in_sysex`, or an unrecognized byte).
    InvalidStatus,
    /// A data byte with the high bit set where a data byte was expected.
    InvalidData,
    /// The payload ended before a complete message could be read.
    UnexpectedEof,
    /// `payload[0]` did not look like a BLE MIDI packet header.
    InvalidHeaderByte,
    /// A data byte turned up where a status byte was expected.
    UnexpectedDataByte,
}

/// Error from the staging FIFO (C5): the chunk being pushed does not fit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoFull;

/// Errors surfaced by the service facade (C7) to application code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError {
    /// `init` was called a second time.
    AlreadyInitialized,
    /// GATT service registration failed at the platform boundary.
    ServiceRegistrationError,
    /// `tx_*` called with no active link.
    NotConnected,
    /// The staging FIFO had no room for this chunk; the caller should
    /// retry after backpressure.
    TxFifoFull,
    /// Malformed argument (e.g. a status byte that isn't a valid MIDI
    /// message, or a sysex data byte with the high bit set).
    InvalidArgument,
}

impl From<FifoFull> for ServiceError {
    fn from(_: FifoFull) -> Self {
        ServiceError::TxFifoFull
    }
}

/// §7's policy table: writer-level errors collapse to `InvalidArgument` at
/// the public surface. `PacketFull` should never reach this conversion —
/// the orchestrator handles it internally — but if it ever does escape, we
/// still map it to something sensible rather than panicking.
impl From<PacketError> for ServiceError {
    fn from(e: PacketError) -> Self {
        match e {
            PacketError::PacketFull => ServiceError::TxFifoFull,
            PacketError::AlreadyInSysex
            | PacketError::NotInSysex
            | PacketError::InvalidStatus
            | PacketError::InvalidData
            | PacketError::UnexpectedEof
            | PacketError::InvalidHeaderByte
            | PacketError::UnexpectedDataByte => ServiceError::InvalidArgument,
        }
    }
}
