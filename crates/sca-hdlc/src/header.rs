use crate::DecodeError;

/// Length of the Cisco HDLC header: address, control, 16-bit protocol.
pub const HDLC_HDRLEN: usize = 4;

pub const CISCO_UNICAST: u8 = 0x0f;
pub const CISCO_MULTICAST: u8 = 0x8f;

pub const HDLC_PROTOCOL_IP: u16 = 0x0800;
pub const HDLC_PROTOCOL_IPV6: u16 = 0x86dd;
pub const CISCO_KEEPALIVE: u16 = 0x8035;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdlcHeader {
    pub address: u8,
    pub control: u8,
    pub protocol: u16,
}

impl HdlcHeader {
    pub const LEN: usize = HDLC_HDRLEN;

    pub fn new(protocol: u16, multicast: bool) -> Self {
        Self {
            address: if multicast {
                CISCO_MULTICAST
            } else {
                CISCO_UNICAST
            },
            control: 0,
            protocol,
        }
    }

    pub fn is_multicast(&self) -> bool {
        self.address == CISCO_MULTICAST
    }

    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < Self::LEN {
            return Err(DecodeError::Truncated {
                len: buf.len(),
                min: Self::LEN,
            });
        }
        Ok(Self {
            address: buf[0],
            control: buf[1],
            protocol: u16::from_be_bytes([buf[2], buf[3]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let proto = self.protocol.to_be_bytes();
        [self.address, self.control, proto[0], proto[1]]
    }
}
