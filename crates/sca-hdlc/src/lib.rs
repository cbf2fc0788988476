//! Cisco HDLC framing and the Cisco keepalive sub-protocol.
//!
//! This crate only deals with byte layouts: it knows nothing about descriptor rings or the
//! controller. The `sca-wan` driver core decodes every received buffer exactly once through
//! [`decode`] and builds outgoing frames with [`encode_frame`].
#![forbid(unsafe_code)]

mod error;
mod frame;
mod header;
mod keepalive;

pub use error::DecodeError;
pub use frame::{decode, encode_frame, ipv4_low_delay, Frame, Payload};
pub use header::{
    HdlcHeader, CISCO_KEEPALIVE, CISCO_MULTICAST, CISCO_UNICAST, HDLC_HDRLEN, HDLC_PROTOCOL_IP,
    HDLC_PROTOCOL_IPV6,
};
pub use keepalive::{
    KeepaliveKind, KeepalivePacket, CISCO_ADDR_REPLY, CISCO_ADDR_REQ, CISCO_KEEPALIVE_REQ,
    CISCO_PKT_LEN,
};
