use crate::header::{CISCO_KEEPALIVE, HDLC_PROTOCOL_IP, HDLC_PROTOCOL_IPV6};
use crate::{DecodeError, HdlcHeader, KeepalivePacket};

const IPTOS_LOWDELAY: u8 = 0x10;

/// Payload of a received frame, classified by the header's protocol field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Ipv4(&'a [u8]),
    Ipv6(&'a [u8]),
    Keepalive(KeepalivePacket),
    Unknown(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header: HdlcHeader,
    pub payload: Payload<'a>,
}

impl Frame<'_> {
    pub fn protocol(&self) -> u16 {
        self.header.protocol
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.header.to_bytes());
        match self.payload {
            Payload::Ipv4(data) | Payload::Ipv6(data) | Payload::Unknown(data) => {
                out.extend_from_slice(data)
            }
            Payload::Keepalive(pkt) => out.extend_from_slice(&pkt.to_bytes()),
        }
        out
    }
}

/// Decodes one received HDLC frame.
///
/// Bytes past the keepalive body (some peers pad keepalives) are ignored.
pub fn decode(buf: &[u8]) -> Result<Frame<'_>, DecodeError> {
    let header = HdlcHeader::parse(buf)?;
    let body = &buf[HdlcHeader::LEN..];
    let payload = match header.protocol {
        HDLC_PROTOCOL_IP => Payload::Ipv4(body),
        HDLC_PROTOCOL_IPV6 => Payload::Ipv6(body),
        CISCO_KEEPALIVE => Payload::Keepalive(KeepalivePacket::parse(body)?),
        _ => Payload::Unknown(body),
    };
    Ok(Frame { header, payload })
}

pub fn encode_frame(protocol: u16, multicast: bool, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HdlcHeader::LEN + payload.len());
    out.extend_from_slice(&HdlcHeader::new(protocol, multicast).to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Whether an IPv4 datagram asks for low-delay service in its TOS byte.
pub fn ipv4_low_delay(datagram: &[u8]) -> bool {
    datagram
        .get(1)
        .is_some_and(|tos| tos & IPTOS_LOWDELAY == IPTOS_LOWDELAY)
}
