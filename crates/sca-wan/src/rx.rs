//! Receive engine: completed descriptors -> decoded frames -> network stack.
//!
//! The receive DMA fills descriptors from the current descriptor address (CDA) up to, but never
//! onto, the error descriptor address (EDA). The driver keeps EDA exactly one descriptor behind
//! its consumption point, so there is always one free descriptor between the two cursors.

use sca_hdlc::{
    Frame, HdlcHeader, KeepaliveKind, KeepalivePacket, Payload, HDLC_HDRLEN, HDLC_PROTOCOL_IP,
    HDLC_PROTOCOL_IPV6,
};
use tracing::{debug, trace, warn};

use crate::bus::{NetworkStack, RegisterAccess};
use crate::error::RingDesync;
use crate::memory::DescriptorAccess;
use crate::port::{Channel, Port};
use crate::regs::{
    DescStatus, DmaStatus, BFLL, CDAL, CPB, DCR, DCR_ABRT, DIR, DMR, DMR_NF, DMR_TMOD, DSR, EDAL,
};
use crate::ring::RingKind;

impl Port {
    /// Stops the receive DMA, rebuilds the ring and restarts reception at descriptor 0.
    ///
    /// Running this twice in a row leaves the ring and the channel registers exactly as running
    /// it once.
    pub fn rx_reinit<R: RegisterAccess, A: DescriptorAccess>(
        &mut self,
        regs: &mut R,
        mem: &mut A,
    ) {
        self.dmac_write(regs, Channel::Rx, DSR, 0);
        self.dmac_write(regs, Channel::Rx, DCR, DCR_ABRT);
        self.dmac_write(regs, Channel::Rx, DMR, DMR_TMOD | DMR_NF);
        self.dmac_write16(regs, Channel::Rx, BFLL, self.rx_ring.buffer_size());

        self.rx_start = 0;
        self.rx_end = self.rx_ring.capacity() - 1;
        self.rx_discarding = false;
        self.rx_ring.initialize(mem, RingKind::Receive);

        let cpb = self.rx_ring.chain_base();
        let cda = self.rx_ring.desc_low16(self.rx_start);
        let eda = self.rx_ring.desc_low16(self.rx_end);
        self.dmac_write(regs, Channel::Rx, CPB, cpb);
        self.dmac_write16(regs, Channel::Rx, CDAL, cda);
        self.dmac_write16(regs, Channel::Rx, EDAL, eda);

        let dir = DmaStatus::EOT | DmaStatus::EOM | DmaStatus::BOF | DmaStatus::COF;
        self.dmac_write(regs, Channel::Rx, DIR, dir.bits());
        self.dmac_write(regs, Channel::Rx, DSR, DmaStatus::DE.bits());
        debug!(port = self.index, cda, eda, "rx dma initialized");
    }

    /// Scans from `rx_start` towards the hardware's current descriptor for the next complete,
    /// error-free frame.
    ///
    /// Descriptors with error bits end a (dropped) frame. A descriptor without EOM means the
    /// frame did not fit one buffer: it and every following descriptor up to and including the
    /// next EOM are skipped, and the frame counts as one input error.
    pub fn frame_available<R: RegisterAccess, A: DescriptorAccess>(
        &mut self,
        regs: &mut R,
        mem: &mut A,
    ) -> Result<bool, RingDesync> {
        let cda = self.dmac_read16(regs, Channel::Rx, CDAL);
        let current = self.rx_ring.index_of(cda).ok_or(RingDesync { cda })?;

        while self.rx_start != current {
            let status = self.rx_ring.read_status(mem, self.rx_start);
            trace!(
                port = self.index,
                index = self.rx_start,
                status = status.bits(),
                "rx descriptor"
            );

            if status.has_errors() {
                self.stats.ierrors += 1;
                self.rx_discarding = false;
            } else if status.contains(DescStatus::EOM) {
                if !self.rx_discarding {
                    return Ok(true);
                }
                self.rx_discarding = false;
            } else if !self.rx_discarding {
                self.stats.ierrors += 1;
                self.rx_discarding = true;
                debug!(port = self.index, index = self.rx_start, "dropping multi-buffer frame");
            }
            self.advance_consumed(regs);
        }
        Ok(false)
    }

    /// Releases the descriptor at `rx_start` and moves the hardware's end cursor behind it.
    pub fn advance_consumed<R: RegisterAccess>(&mut self, regs: &mut R) {
        self.rx_end = self.rx_start;
        let (next, wrapped) = self.rx_ring.advance(self.rx_start);
        self.rx_start = next;
        if wrapped {
            trace!(port = self.index, "rx ring wrapped");
        }
        let eda = self.rx_ring.desc_low16(self.rx_end);
        self.dmac_write16(regs, Channel::Rx, EDAL, eda);
    }

    /// Hands every available frame to [`Port::input`]. Returns the number of frames read.
    pub fn process<R: RegisterAccess, A: DescriptorAccess, S: NetworkStack>(
        &mut self,
        regs: &mut R,
        mem: &mut A,
        stack: &mut S,
        uptime_millis: u32,
    ) -> Result<usize, RingDesync> {
        let mut frames = 0;
        while self.frame_available(regs, mem)? {
            let buf = self.rx_ring.read_frame(mem, self.rx_start);
            self.input(&buf, stack, uptime_millis);
            self.advance_consumed(regs);
            frames += 1;
        }
        Ok(frames)
    }

    /// Decodes one received frame and dispatches it by protocol.
    pub fn input<S: NetworkStack>(&mut self, buf: &[u8], stack: &mut S, uptime_millis: u32) {
        if buf.len() < HDLC_HDRLEN {
            self.stats.ierrors += 1;
            debug!(port = self.index, len = buf.len(), "runt frame");
            return;
        }
        self.stats.ipackets += 1;

        let frame = match sca_hdlc::decode(buf) {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.ierrors += 1;
                debug!(port = self.index, %err, "undecodable frame");
                return;
            }
        };

        let (payload, ethertype) = match frame.payload {
            Payload::Ipv4(payload) => (payload, HDLC_PROTOCOL_IP),
            Payload::Ipv6(payload) => (payload, HDLC_PROTOCOL_IPV6),
            Payload::Keepalive(packet) => {
                self.handle_keepalive(frame.header, packet, uptime_millis);
                return;
            }
            Payload::Unknown(_) => {
                self.stats.noproto += 1;
                debug!(port = self.index, protocol = frame.protocol(), "unknown protocol");
                return;
            }
        };
        if !stack.deliver(self.index, payload, ethertype) {
            self.stats.iqdrops += 1;
        }
    }

    /// Answers keepalive requests on the link queue; other sub-types are dropped.
    pub fn handle_keepalive(
        &mut self,
        header: HdlcHeader,
        packet: KeepalivePacket,
        uptime_millis: u32,
    ) {
        match packet.kind {
            KeepaliveKind::Request => {
                trace!(
                    port = self.index,
                    seq = packet.sender_sequence,
                    echoed = packet.echoed_sequence,
                    reliability = packet.reliability,
                    "keepalive request"
                );
                self.keepalive_last_rx_seq = packet.sender_sequence;
                self.keepalive_last_tx_seq = self.keepalive_last_tx_seq.wrapping_add(1);
                let reply = packet.reply(self.keepalive_last_tx_seq, uptime_millis);
                let bytes = Frame {
                    header,
                    payload: Payload::Keepalive(reply),
                }
                .encode();
                if self.link_queue.push(bytes).is_err() {
                    self.stats.oqdrops += 1;
                    warn!(port = self.index, "link queue full, keepalive reply dropped");
                    return;
                }
                self.tx_kick = true;
            }
            KeepaliveKind::AddressRequest | KeepaliveKind::AddressReply => {
                self.stats.ierrors += 1;
                debug!(
                    port = self.index,
                    kind = packet.kind.raw(),
                    "ignoring keepalive address packet"
                );
            }
            KeepaliveKind::Unknown(kind) => {
                self.stats.noproto += 1;
                debug!(port = self.index, kind, "unknown keepalive type");
            }
        }
    }
}
