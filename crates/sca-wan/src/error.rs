use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScaError>;

/// Errors surfaced to the owner of a [`crate::Controller`].
///
/// None of these are fatal to the controller: configuration errors are reported before any
/// register is touched, and the rest reject a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("unsupported port count {0} (expected 1 or 2)")]
    PortCount(usize),

    #[error("no such port: {0}")]
    NoSuchPort(usize),

    #[error("invalid ring layout: {0}")]
    RingLayout(&'static str),

    #[error("network is down")]
    NetworkDown,

    #[error("address family {0} not supported")]
    AddressFamilyNotSupported(u16),

    #[error("no buffer space available")]
    NoBufferSpace,
}

/// Why the transmit engine refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("transmitter busy")]
    Busy,

    #[error("transmit ring full")]
    RingFull,

    #[error("frame of {len} bytes exceeds descriptor buffer of {max} bytes")]
    FrameTooLong { len: usize, max: usize },
}

/// The receive DMA reported a current descriptor address that is not part of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("current descriptor address {cda:#06x} is outside the receive ring")]
pub struct RingDesync {
    pub cda: u16,
}
