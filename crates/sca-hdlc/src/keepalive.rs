//! Cisco keepalive ("SLARP") packets carried behind protocol [`crate::CISCO_KEEPALIVE`].

use crate::DecodeError;

pub const CISCO_ADDR_REQ: u32 = 0;
pub const CISCO_ADDR_REPLY: u32 = 1;
pub const CISCO_KEEPALIVE_REQ: u32 = 2;

/// Keepalive body length: type, two sequence numbers, reliability, two timestamp halves.
pub const CISCO_PKT_LEN: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveKind {
    AddressRequest,
    AddressReply,
    Request,
    Unknown(u32),
}

impl KeepaliveKind {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            CISCO_ADDR_REQ => Self::AddressRequest,
            CISCO_ADDR_REPLY => Self::AddressReply,
            CISCO_KEEPALIVE_REQ => Self::Request,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::AddressRequest => CISCO_ADDR_REQ,
            Self::AddressReply => CISCO_ADDR_REPLY,
            Self::Request => CISCO_KEEPALIVE_REQ,
            Self::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepalivePacket {
    pub kind: KeepaliveKind,
    pub sender_sequence: u32,
    pub echoed_sequence: u32,
    pub reliability: u16,
    pub time_high: u16,
    pub time_low: u16,
}

impl KeepalivePacket {
    pub const LEN: usize = CISCO_PKT_LEN;

    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::LEN {
            return Err(DecodeError::KeepaliveTruncated {
                len: buf.len(),
                min: Self::LEN,
            });
        }
        let be32 = |off: usize| {
            u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
        };
        let be16 = |off: usize| u16::from_be_bytes([buf[off], buf[off + 1]]);
        Ok(Self {
            kind: KeepaliveKind::from_raw(be32(0)),
            sender_sequence: be32(4),
            echoed_sequence: be32(8),
            reliability: be16(12),
            time_high: be16(14),
            time_low: be16(16),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.kind.raw().to_be_bytes());
        out[4..8].copy_from_slice(&self.sender_sequence.to_be_bytes());
        out[8..12].copy_from_slice(&self.echoed_sequence.to_be_bytes());
        out[12..14].copy_from_slice(&self.reliability.to_be_bytes());
        out[14..16].copy_from_slice(&self.time_high.to_be_bytes());
        out[16..18].copy_from_slice(&self.time_low.to_be_bytes());
        out
    }

    /// Builds the answer to this request.
    ///
    /// The peer's sequence number is echoed back and `local_sequence` becomes ours.
    /// `uptime_millis` is split into the two 16-bit timestamp halves. Kind and reliability are
    /// kept.
    pub fn reply(&self, local_sequence: u32, uptime_millis: u32) -> Self {
        Self {
            kind: self.kind,
            sender_sequence: local_sequence,
            echoed_sequence: self.sender_sequence,
            reliability: self.reliability,
            time_high: (uptime_millis >> 16) as u16,
            time_low: (uptime_millis & 0xffff) as u16,
        }
    }

    pub fn timestamp(&self) -> u32 {
        (u32::from(self.time_high) << 16) | u32::from(self.time_low)
    }
}
