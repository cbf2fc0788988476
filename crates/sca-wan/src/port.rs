//! Per-port state and the Up/Down state machine.
//!
//! A [`Port`] bundles one MSCI channel with its receive and transmit DMA channels. The transmit
//! and receive engines are implemented as further `impl Port` blocks in `tx.rs` and `rx.rs`.

use std::collections::VecDeque;

use tracing::debug;

use crate::bus::{Platform, RegisterAccess};
use crate::config::{PortConfig, ScaConfig};
use crate::regs::*;
use crate::ring::DescriptorRing;
use crate::stats::PortStats;
use crate::{Result, ScaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortState {
    #[default]
    Down,
    Up,
}

/// The two DMA channels serving a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Rx,
    Tx,
}

/// A bounded FIFO of ready-to-send HDLC frames.
#[derive(Debug, Clone)]
pub(crate) struct FrameQueue {
    frames: VecDeque<Vec<u8>>,
    limit: usize,
}

impl FrameQueue {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            limit,
        }
    }

    /// Appends `frame`, handing it back if the queue is at its limit.
    pub(crate) fn push(&mut self, frame: Vec<u8>) -> std::result::Result<(), Vec<u8>> {
        if self.frames.len() >= self.limit {
            return Err(frame);
        }
        self.frames.push_back(frame);
        Ok(())
    }

    /// Puts a frame that could not be sent back at the head, ignoring the limit.
    pub(crate) fn requeue(&mut self, frame: Vec<u8>) {
        self.frames.push_front(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Which queue a frame pulled by the transmit engine came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueKind {
    Link,
    Fast,
    Send,
    Stack,
}

#[derive(Debug)]
pub struct Port {
    pub(crate) index: usize,
    msci_off: u16,
    dmac_off: u16,
    config: PortConfig,
    pub(crate) state: PortState,

    pub(crate) tx_ring: DescriptorRing,
    pub(crate) tx_busy: bool,
    pub(crate) tx_current: usize,
    pub(crate) tx_in_use: usize,
    pub(crate) tx_interrupt_spacing: usize,

    pub(crate) rx_ring: DescriptorRing,
    pub(crate) rx_start: usize,
    pub(crate) rx_end: usize,
    /// Skipping the remaining descriptors of a frame that did not fit one buffer.
    pub(crate) rx_discarding: bool,

    pub(crate) keepalive_last_tx_seq: u32,
    pub(crate) keepalive_last_rx_seq: u32,
    pub(crate) keepalive_last_sent: u32,

    pub(crate) link_queue: FrameQueue,
    pub(crate) fast_queue: FrameQueue,
    pub(crate) send_queue: FrameQueue,
    /// A keepalive reply was queued while the receive ring was being walked.
    pub(crate) tx_kick: bool,

    pub(crate) stats: PortStats,
}

impl Port {
    pub fn new(index: usize, port: PortConfig, config: &ScaConfig) -> Result<Self> {
        let (msci_off, dmac_off) = match index {
            0 => (MSCI_OFF_0, DMAC_OFF_0),
            1 => (MSCI_OFF_1, DMAC_OFF_1),
            other => return Err(ScaError::NoSuchPort(other)),
        };
        let layout = port.layout;
        Ok(Self {
            index,
            msci_off,
            dmac_off,
            config: port,
            state: PortState::Down,
            tx_ring: DescriptorRing::new(
                layout.tx_desc,
                layout.tx_buf,
                config.tx_descriptors,
                config.buffer_size,
            )?,
            tx_busy: false,
            tx_current: 0,
            tx_in_use: 0,
            tx_interrupt_spacing: config.tx_interrupt_spacing.max(1),
            rx_ring: DescriptorRing::new(
                layout.rx_desc,
                layout.rx_buf,
                config.rx_descriptors,
                config.buffer_size,
            )?,
            rx_start: 0,
            rx_end: config.rx_descriptors - 1,
            rx_discarding: false,
            keepalive_last_tx_seq: 0,
            keepalive_last_rx_seq: 0,
            keepalive_last_sent: 0,
            link_queue: FrameQueue::new(config.link_queue_len),
            fast_queue: FrameQueue::new(config.fast_queue_len),
            send_queue: FrameQueue::new(config.send_queue_len),
            tx_kick: false,
            stats: PortStats::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn is_up(&self) -> bool {
        self.state == PortState::Up
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn stats(&self) -> &PortStats {
        &self.stats
    }

    pub fn tx_ring(&self) -> &DescriptorRing {
        &self.tx_ring
    }

    pub fn rx_ring(&self) -> &DescriptorRing {
        &self.rx_ring
    }

    /// Whether the transmit DMA currently owns the queued descriptors.
    pub fn tx_busy(&self) -> bool {
        self.tx_busy
    }

    pub fn tx_current(&self) -> usize {
        self.tx_current
    }

    pub fn tx_in_use(&self) -> usize {
        self.tx_in_use
    }

    pub fn rx_start(&self) -> usize {
        self.rx_start
    }

    pub fn rx_end(&self) -> usize {
        self.rx_end
    }

    pub fn keepalive_last_tx_seq(&self) -> u32 {
        self.keepalive_last_tx_seq
    }

    pub fn keepalive_last_rx_seq(&self) -> u32 {
        self.keepalive_last_rx_seq
    }

    /// Sets the local keepalive sequence counter; the next reply carries `seq + 1`.
    pub fn set_keepalive_last_tx_seq(&mut self, seq: u32) {
        self.keepalive_last_tx_seq = seq;
    }

    pub fn keepalive_last_sent(&self) -> u32 {
        self.keepalive_last_sent
    }

    /// Frames waiting on the link, fast and send queues.
    pub fn queued(&self) -> (usize, usize, usize) {
        (
            self.link_queue.len(),
            self.fast_queue.len(),
            self.send_queue.len(),
        )
    }

    /// Bit mask of this port's causes in ISR0/ISR1 and IER0/IER1.
    pub(crate) fn interrupt_nibble(&self) -> u8 {
        if self.index == 0 {
            0x0f
        } else {
            0xf0
        }
    }

    pub(crate) fn msci_read<R: RegisterAccess>(&self, regs: &mut R, reg: u16) -> u8 {
        regs.read_u8(self.msci_off + reg)
    }

    pub(crate) fn msci_write<R: RegisterAccess>(&self, regs: &mut R, reg: u16, value: u8) {
        regs.write_u8(self.msci_off + reg, value);
    }

    fn dmac_base(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Rx => self.dmac_off,
            Channel::Tx => self.dmac_off + DMAC_TX_CHANNEL,
        }
    }

    pub(crate) fn dmac_read<R: RegisterAccess>(&self, regs: &mut R, ch: Channel, reg: u16) -> u8 {
        regs.read_u8(self.dmac_base(ch) + reg)
    }

    pub(crate) fn dmac_read16<R: RegisterAccess>(
        &self,
        regs: &mut R,
        ch: Channel,
        reg: u16,
    ) -> u16 {
        regs.read_u16(self.dmac_base(ch) + reg)
    }

    pub(crate) fn dmac_write<R: RegisterAccess>(
        &self,
        regs: &mut R,
        ch: Channel,
        reg: u16,
        value: u8,
    ) {
        regs.write_u8(self.dmac_base(ch) + reg, value);
    }

    pub(crate) fn dmac_write16<R: RegisterAccess>(
        &self,
        regs: &mut R,
        ch: Channel,
        reg: u16,
        value: u16,
    ) {
        regs.write_u16(self.dmac_base(ch) + reg, value);
    }

    /// Resets the serial channel and programs HDLC mode, clocks, interrupt enables and FIFO
    /// thresholds. RTS is left low until the port is brought up.
    pub(crate) fn init_msci<R: RegisterAccess, P: Platform>(
        &self,
        regs: &mut R,
        platform: &mut P,
    ) {
        self.msci_write(regs, CMD, CMD_RESET);
        self.msci_write(
            regs,
            MD0,
            MD0_CRC_1 | MD0_CRC_CCITT | MD0_CRC_ENABLE | MD0_MODE_HDLC,
        );
        self.msci_write(regs, MD1, MD1_NOADDRCHK);
        self.msci_write(regs, MD2, MD2_DUPLEX | MD2_ADPLLX8 | MD2_NRZ);
        self.msci_write(regs, CMD, CMD_RXRESET);
        self.msci_write(
            regs,
            CTL,
            CTL_IDLC_PATTERN | CTL_UDRNC_AFTER_FCS | CTL_RTS_LOW,
        );
        self.msci_write(regs, CMD, CMD_TXRESET);

        self.msci_write(regs, RXS, self.config.rx_clock);
        self.msci_write(regs, TXS, self.config.tx_clock);
        self.msci_write(regs, TMC, self.config.time_constant);
        platform.set_port_clock(self.index, self.config.external_clock);

        // Underrun is the only MSCI cause acted upon.
        self.msci_write(regs, IE1, ST1_UDRN);
        self.msci_write(regs, IE0, ST0_TXINT);
        self.msci_write(regs, IE2, 0);
        self.msci_write(regs, FIE, 0);

        self.msci_write(regs, SA0, 0);
        self.msci_write(regs, SA1, 0);
        self.msci_write(regs, IDL, IDLE_PATTERN);

        self.msci_write(regs, RRC, RRC_DEFAULT);
        self.msci_write(regs, TRC0, TRC0_DEFAULT);
        self.msci_write(regs, TRC1, TRC_MAX);
        debug!(port = self.index, "msci initialized");
    }

    /// Down -> Up. Rings are expected to have been re-initialized by the caller.
    pub(crate) fn bring_up<R: RegisterAccess, P: Platform>(
        &mut self,
        regs: &mut R,
        platform: &mut P,
    ) {
        self.tx_busy = false;
        self.state = PortState::Up;

        platform.set_dtr(self.index, true);
        let ctl = self.msci_read(regs, CTL);
        self.msci_write(regs, CTL, (ctl & !CTL_RTS_MASK) | CTL_RTS_HIGH);

        let nibble = self.interrupt_nibble();
        let ier0 = regs.read_u8(IER0);
        regs.write_u8(IER0, ier0 | nibble);
        let ier1 = regs.read_u8(IER1);
        regs.write_u8(IER1, ier1 | nibble);

        self.msci_write(regs, CMD, CMD_TXENABLE);
        self.msci_write(regs, CMD, CMD_RXENABLE);

        self.tx_in_use = 0;
        self.tx_current = 0;
        self.keepalive_last_tx_seq = 0;
        self.keepalive_last_rx_seq = 0;
        self.keepalive_last_sent = platform.micro_time();
        debug!(port = self.index, "port up");
    }

    /// Up -> Down.
    pub(crate) fn bring_down<R: RegisterAccess, P: Platform>(
        &mut self,
        regs: &mut R,
        platform: &mut P,
    ) {
        platform.set_dtr(self.index, false);
        let ctl = self.msci_read(regs, CTL);
        self.msci_write(regs, CTL, (ctl & !CTL_RTS_MASK) | CTL_RTS_LOW);

        let keep = !self.interrupt_nibble();
        let ier0 = regs.read_u8(IER0);
        regs.write_u8(IER0, ier0 & keep);
        let ier1 = regs.read_u8(IER1);
        regs.write_u8(IER1, ier1 & keep);

        self.msci_write(regs, CMD, CMD_RXDISABLE);
        self.msci_write(regs, CMD, CMD_TXDISABLE);

        self.tx_reset();
        self.state = PortState::Down;
        debug!(port = self.index, "port down");
    }
}
