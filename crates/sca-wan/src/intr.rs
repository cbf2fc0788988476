//! Interrupt dispatch.
//!
//! ISR1 carries the DMA causes (port 0 in the low nibble, port 1 in the high nibble) and ISR0
//! the serial channel causes. Each DMA channel's status register is read and acknowledged in a
//! loop until no cause of interest is left.

use tracing::{debug, error, trace, warn};

use crate::bus::{NetworkStack, Platform, RegisterAccess};
use crate::controller::Controller;
use crate::memory::DescriptorMemory;
use crate::port::Channel;
use crate::regs::*;

impl<R, M, P, S> Controller<R, M, P, S>
where
    R: RegisterAccess,
    M: DescriptorMemory,
    P: Platform,
    S: NetworkStack,
{
    /// Services every pending cause. Returns the number of causes handled; zero means the
    /// interrupt was not ours.
    pub fn hardware_interrupt(&mut self) -> u32 {
        let mut handled = 0;
        for _ in 0..self.config.max_interrupt_passes {
            let isr0 = self.regs.read_u8(ISR0);
            let isr1 = self.regs.read_u8(ISR1);
            let isr2 = self.regs.read_u8(ISR2);
            if isr0 == 0 && isr1 == 0 && isr2 == 0 {
                return handled;
            }
            trace!(isr0, isr1, isr2, "sca interrupt");

            if isr1 & 0x0f != 0 {
                handled += self.dmac_interrupt(0, isr1 & 0x0f);
            }
            if isr1 & 0xf0 != 0 {
                handled += self.dmac_interrupt(1, isr1 >> 4);
            }
            if isr0 & 0x0f != 0 {
                handled += self.msci_interrupt(0);
            }
            if isr0 & 0xf0 != 0 {
                handled += self.msci_interrupt(1);
            }
            if isr2 != 0 {
                // Timer interrupts are never enabled.
                debug!(isr2, "ignoring timer interrupt");
            }
        }
        warn!(
            passes = self.config.max_interrupt_passes,
            "interrupt causes still pending, giving up"
        );
        handled
    }

    /// Reads the channel's DSR and acknowledges every status bit that was set.
    fn ack_dma_status(&mut self, index: usize, channel: Channel) -> DmaStatus {
        let port = &self.ports[index];
        let regs = &mut self.regs;
        let dsr = port.dmac_read(regs, channel, DSR);
        port.dmac_write(regs, channel, DSR, dsr | DmaStatus::DEWD.bits());
        DmaStatus::from_bits_truncate(dsr)
    }

    fn dmac_interrupt(&mut self, index: usize, isr: u8) -> u32 {
        if index >= self.ports.len() {
            warn!(port = index, isr, "dma interrupt for missing port");
            return 0;
        }
        let mut handled = 0;
        if isr & (ISR1_DMAC_TX0A | ISR1_DMAC_TX0B) != 0 {
            handled += self.tx_dma_interrupt(index);
        }
        if isr & (ISR1_DMAC_RX0A | ISR1_DMAC_RX0B) != 0 {
            handled += self.rx_dma_interrupt(index);
        }
        handled
    }

    fn tx_dma_interrupt(&mut self, index: usize) -> u32 {
        let mut handled = 0;
        for _ in 0..self.config.max_interrupt_passes {
            handled += 1;
            let dsr = self.ack_dma_status(index, Channel::Tx)
                & (DmaStatus::COF | DmaStatus::BOF | DmaStatus::EOT);
            if dsr.is_empty() {
                break;
            }

            if dsr.contains(DmaStatus::COF) {
                error!(port = index, "tx dma counter overflow");
                self.reset_tx_ring(index);
            }
            if dsr.contains(DmaStatus::BOF) {
                let port = &self.ports[index];
                let regs = &mut self.regs;
                let cda = port.dmac_read16(regs, Channel::Tx, CDAL);
                let eda = port.dmac_read16(regs, Channel::Tx, EDAL);
                let cpb = port.dmac_read(regs, Channel::Tx, CPB);
                error!(port = index, cda, eda, cpb, "tx dma buffer overflow");
                self.reset_tx_ring(index);
            }
            if dsr.contains(DmaStatus::EOT) && self.ports[index].tx_busy {
                let port = &self.ports[index];
                let regs = &mut self.regs;
                if !port.tx_end_reached(regs) {
                    // The DMA stops after every EOT descriptor.
                    trace!(port = index, "tx progress, resuming dma");
                    port.tx_resume(regs);
                    continue;
                }
                trace!(port = index, "tx complete");
                self.ports[index].tx_reset();
            }
            self.transmit(index);
        }
        handled
    }

    fn rx_dma_interrupt(&mut self, index: usize) -> u32 {
        let mut handled = 0;
        for _ in 0..self.config.max_interrupt_passes {
            handled += 1;
            let dsr = self.ack_dma_status(index, Channel::Rx)
                & (DmaStatus::EOM | DmaStatus::COF | DmaStatus::BOF | DmaStatus::EOT);
            if dsr.is_empty() {
                break;
            }

            // Salvage what was received before any overflow recovery discards the ring.
            self.receive(index);

            if dsr.contains(DmaStatus::COF) {
                error!(port = index, "rx dma counter overflow");
                self.reset_rx_ring(index);
            } else if dsr.intersects(DmaStatus::BOF | DmaStatus::EOT) {
                error!(port = index, "rx dma buffer overflow");
                self.reset_rx_ring(index);
            }
        }
        handled
    }

    /// Handles serial channel causes; only transmit underrun is acted upon.
    fn msci_interrupt(&mut self, index: usize) -> u32 {
        if index >= self.ports.len() {
            warn!(port = index, "msci interrupt for missing port");
            return 0;
        }
        let port = &self.ports[index];
        let regs = &mut self.regs;
        let st1 = port.msci_read(regs, ST1);
        if st1 == 0 {
            return 0;
        }
        port.msci_write(regs, ST1, st1);

        if st1 & ST1_UDRN != 0 {
            let trc0 = port.msci_read(regs, TRC0);
            if trc0 >= TRC_MAX {
                warn!(port = index, "tx underrun with fifo threshold already at maximum");
            } else {
                let trc0 = trc0.saturating_add(TRC_UNDERRUN_STEP).min(TRC_MAX);
                port.msci_write(regs, TRC0, trc0);
                debug!(port = index, trc0, "tx underrun, raising fifo threshold");
            }
            self.ports[index].stats.tx_underruns += 1;
        }
        1
    }
}
