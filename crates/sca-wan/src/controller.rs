use sca_hdlc::{encode_frame, ipv4_low_delay, HDLC_PROTOCOL_IP, HDLC_PROTOCOL_IPV6};
use tracing::{debug, error, warn};

use crate::bus::{NetworkStack, Platform, RegisterAccess};
use crate::config::{PortConfig, ScaConfig};
use crate::memory::DescriptorMemory;
use crate::port::{Channel, Port};
use crate::regs::*;
use crate::ring::{DescriptorRing, RingKind, DESC_LEN};
use crate::stats::PortStats;
use crate::{Result, ScaError};

/// Address family of an outbound packet handed to [`Controller::output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
    Other(u16),
}

/// A network-layer packet to be framed and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    pub family: AddressFamily,
    pub payload: Vec<u8>,
    /// Broadcast or multicast destination.
    pub multicast: bool,
}

/// One SCA chip with its one or two ports.
///
/// The controller owns every collaborator it drives. All entry points run to completion; the
/// owner must not call into the controller from its own interrupt handler while another call is
/// in progress (mask the interrupt source instead).
pub struct Controller<R, M, P, S> {
    pub(crate) regs: R,
    mem: M,
    platform: P,
    stack: S,
    pub(crate) config: ScaConfig,
    pub(crate) ports: Vec<Port>,
}

impl<R, M, P, S> Controller<R, M, P, S>
where
    R: RegisterAccess,
    M: DescriptorMemory,
    P: Platform,
    S: NetworkStack,
{
    /// Validates the configuration, resets the chip and initializes every port (ports start
    /// Down).
    pub fn attach(
        regs: R,
        mem: M,
        platform: P,
        stack: S,
        config: ScaConfig,
        ports: Vec<PortConfig>,
    ) -> Result<Self> {
        config.validate()?;
        if ports.is_empty() || ports.len() > 2 {
            return Err(ScaError::PortCount(ports.len()));
        }
        for port in &ports {
            port.layout.validate(&config)?;
        }

        let ports = ports
            .into_iter()
            .enumerate()
            .map(|(index, port)| Port::new(index, port, &config))
            .collect::<Result<Vec<_>>>()?;

        if let Some(mask) = mem.page_mask() {
            for port in &ports {
                if !fits_one_page(port.tx_ring(), mask) || !fits_one_page(port.rx_ring(), mask) {
                    return Err(ScaError::RingLayout(
                        "ring descriptors and buffers must share one memory page",
                    ));
                }
            }
        }

        let mut controller = Self {
            regs,
            mem,
            platform,
            stack,
            config,
            ports,
        };
        controller.init_chip();
        for index in 0..controller.ports.len() {
            let port = &controller.ports[index];
            port.init_msci(&mut controller.regs, &mut controller.platform);
            controller.init_dmac(index);
        }
        debug!(ports = controller.ports.len(), "sca attached");
        Ok(controller)
    }

    fn init_chip(&mut self) {
        let regs = &mut self.regs;
        regs.write_u8(DMER, 0);
        regs.write_u8(IER0, 0);
        regs.write_u8(IER1, 0);
        regs.write_u8(IER2, 0);

        regs.write_u8(ITCR, ITCR_INTR_PRI_MSCI | ITCR_ACK_NONE | ITCR_VOUT_IVR);

        // Zero wait states.
        regs.write_u8(PABR0, 0);
        regs.write_u8(PABR1, 0);
        regs.write_u8(WCRL, 0);
        regs.write_u8(WCRM, 0);
        regs.write_u8(WCRH, 0);

        regs.write_u8(PCR, PCR_PR2);

        for base in [DMAC_OFF_0, DMAC_OFF_1] {
            for channel in [0, DMAC_TX_CHANNEL] {
                regs.write_u8(base + channel + DSR, 0);
                regs.write_u8(base + channel + DCR, DCR_ABRT);
            }
        }

        regs.write_u8(DMER, DMER_EN);
    }

    /// Rebuilds both rings of a port and reprograms its DMA channels.
    fn init_dmac(&mut self, index: usize) {
        let port = &mut self.ports[index];
        {
            let mut session = self.mem.session(port.tx_ring.desc_base());
            port.tx_ring.initialize(&mut session, RingKind::Transmit);
        }
        port.tx_reset();

        let regs = &mut self.regs;
        port.dmac_write(regs, Channel::Tx, DSR, 0);
        port.dmac_write(regs, Channel::Tx, DCR, DCR_ABRT);
        port.dmac_write(regs, Channel::Tx, DMR, DMR_TMOD | DMR_NF);
        let dir = DmaStatus::EOM | DmaStatus::EOT | DmaStatus::BOF | DmaStatus::COF;
        port.dmac_write(regs, Channel::Tx, DIR, dir.bits());
        let cpb = port.tx_ring.chain_base();
        port.dmac_write(regs, Channel::Tx, CPB, cpb);

        let mut session = self.mem.session(port.rx_ring.desc_base());
        port.rx_reinit(regs, &mut session);
    }

    /// Disables DMA and every interrupt source for all ports.
    pub fn shutdown(&mut self) {
        self.regs.write_u8(DMER, 0);
        self.regs.write_u8(IER0, 0);
        self.regs.write_u8(IER1, 0);
        debug!("sca shut down");
    }

    fn port_index(&self, port: usize) -> Result<usize> {
        if port < self.ports.len() {
            Ok(port)
        } else {
            Err(ScaError::NoSuchPort(port))
        }
    }

    pub fn port_up(&mut self, port: usize) -> Result<()> {
        let index = self.port_index(port)?;
        self.init_dmac(index);
        self.ports[index].bring_up(&mut self.regs, &mut self.platform);
        Ok(())
    }

    pub fn port_down(&mut self, port: usize) -> Result<()> {
        let index = self.port_index(port)?;
        self.ports[index].bring_down(&mut self.regs, &mut self.platform);
        Ok(())
    }

    /// Frames `packet` with a Cisco HDLC header and queues it for transmission.
    pub fn output(&mut self, port: usize, packet: OutboundPacket) -> Result<()> {
        let index = self.port_index(port)?;
        if !self.ports[index].is_up() {
            return Err(ScaError::NetworkDown);
        }
        let protocol = match packet.family {
            AddressFamily::Inet => HDLC_PROTOCOL_IP,
            AddressFamily::Inet6 => HDLC_PROTOCOL_IPV6,
            AddressFamily::Other(family) => {
                warn!(port = index, family, "address family unsupported");
                return Err(ScaError::AddressFamilyNotSupported(family));
            }
        };
        let fast = self.config.use_fast_queue
            && packet.family == AddressFamily::Inet
            && ipv4_low_delay(&packet.payload);
        let frame = encode_frame(protocol, packet.multicast, &packet.payload);
        self.queue_frame(index, frame, packet.multicast, fast)
    }

    /// Queues an already framed HDLC frame on the send queue.
    pub fn enqueue_outbound(&mut self, port: usize, frame: Vec<u8>) -> Result<()> {
        let index = self.port_index(port)?;
        if !self.ports[index].is_up() {
            return Err(ScaError::NetworkDown);
        }
        let multicast = frame.first() == Some(&sca_hdlc::CISCO_MULTICAST);
        self.queue_frame(index, frame, multicast, false)
    }

    fn queue_frame(
        &mut self,
        index: usize,
        frame: Vec<u8>,
        multicast: bool,
        fast: bool,
    ) -> Result<()> {
        let port = &mut self.ports[index];
        let len = frame.len() as u64;
        let queue = if fast {
            &mut port.fast_queue
        } else {
            &mut port.send_queue
        };
        if queue.push(frame).is_err() {
            port.stats.oerrors += 1;
            port.stats.collisions += 1;
            return Err(ScaError::NoBufferSpace);
        }
        port.stats.obytes += len;
        if multicast {
            port.stats.omcasts += 1;
        }
        self.transmit(index);
        Ok(())
    }

    /// Pulls waiting frames (including the network stack's own queue) into the ring and starts
    /// the transmitter if it is idle.
    pub fn start(&mut self, port: usize) -> Result<()> {
        let index = self.port_index(port)?;
        if self.ports[index].is_up() {
            self.transmit(index);
        }
        Ok(())
    }

    pub(crate) fn transmit(&mut self, index: usize) -> bool {
        let port = &mut self.ports[index];
        if !port.is_up() || port.tx_busy {
            return false;
        }
        let queued = {
            let mut session = self.mem.session(port.tx_ring.desc_base());
            port.drain(&mut session, &mut self.stack)
        };
        if queued == 0 {
            return false;
        }
        port.start_tx(&mut self.regs)
    }

    /// Reads every completed frame from the receive ring. Keepalive replies generated on the way
    /// are sent once the ring has been released.
    pub(crate) fn receive(&mut self, index: usize) {
        let uptime = self.platform.uptime_millis();
        let port = &mut self.ports[index];
        {
            let mut session = self.mem.session(port.rx_ring.desc_base());
            if let Err(err) = port.process(&mut self.regs, &mut session, &mut self.stack, uptime) {
                error!(port = index, cda = err.cda, "{err}; reinitializing receive ring");
                port.stats.rx_ring_resets += 1;
                port.rx_reinit(&mut self.regs, &mut session);
            }
        }
        if std::mem::take(&mut port.tx_kick) {
            self.transmit(index);
        }
    }

    /// Rebuilds the receive ring after an overflow.
    pub(crate) fn reset_rx_ring(&mut self, index: usize) {
        let port = &mut self.ports[index];
        port.stats.rx_ring_resets += 1;
        let mut session = self.mem.session(port.rx_ring.desc_base());
        port.rx_reinit(&mut self.regs, &mut session);
    }

    /// Rebuilds the transmit ring and forgets everything queued on it.
    pub(crate) fn reset_tx_ring(&mut self, index: usize) {
        let port = &mut self.ports[index];
        port.stats.tx_ring_resets += 1;
        {
            let mut session = self.mem.session(port.tx_ring.desc_base());
            port.tx_ring.initialize(&mut session, RingKind::Transmit);
        }
        port.tx_reset();
    }

    pub fn config(&self) -> &ScaConfig {
        &self.config
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn port(&self, port: usize) -> Option<&Port> {
        self.ports.get(port)
    }

    pub fn port_mut(&mut self, port: usize) -> Option<&mut Port> {
        self.ports.get_mut(port)
    }

    pub fn stats(&self, port: usize) -> Option<&PortStats> {
        self.ports.get(port).map(Port::stats)
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }
}

fn fits_one_page(ring: &DescriptorRing, mask: u32) -> bool {
    let page = ring.desc_base() & !mask;
    let desc_last = ring.desc_base() + (ring.capacity() * DESC_LEN) as u32 - 1;
    let buf_last = ring.buf_base() + ring.capacity() as u32 * u32::from(ring.buffer_size()) - 1;
    [desc_last, ring.buf_base(), buf_last]
        .iter()
        .all(|addr| addr & !mask == page)
}
