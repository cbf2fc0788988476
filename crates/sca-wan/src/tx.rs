//! Transmit engine: queued frames -> descriptors -> transmit DMA.
//!
//! Frames are never split across descriptors; one that does not fit a descriptor buffer is
//! dropped and counted as an output error. While the DMA owns a batch (`tx_busy`) nothing new is
//! queued; the completion interrupt resets the ring bookkeeping and drains again.

use tracing::{trace, warn};

use crate::bus::{NetworkStack, RegisterAccess};
use crate::error::TxError;
use crate::memory::DescriptorAccess;
use crate::port::{Channel, Port, QueueKind};
use crate::regs::{DescStatus, DmaStatus, CDAL, DSR, EDAL};

impl Port {
    /// Number of descriptors that can be queued before the ring is considered full.
    ///
    /// One descriptor always stays free so the end-of-list address never equals descriptor 0.
    pub fn tx_capacity(&self) -> usize {
        self.tx_ring.capacity() - 1
    }

    /// Writes one frame into the next free transmit descriptor.
    pub fn enqueue<A: DescriptorAccess>(
        &mut self,
        mem: &mut A,
        frame: &[u8],
    ) -> Result<(), TxError> {
        if self.tx_busy {
            return Err(TxError::Busy);
        }
        if self.tx_in_use >= self.tx_capacity() {
            return Err(TxError::RingFull);
        }
        let max = usize::from(self.tx_ring.buffer_size());
        if frame.len() > max {
            return Err(TxError::FrameTooLong {
                len: frame.len(),
                max,
            });
        }

        let next = if self.tx_in_use == 0 {
            0
        } else {
            self.tx_ring.advance(self.tx_current).0
        };
        self.tx_ring.write_frame(mem, next, frame);
        self.tx_in_use += 1;

        let mut status = DescStatus::EOM;
        if self.tx_in_use % self.tx_interrupt_spacing == 0 {
            status |= DescStatus::EOT;
        }
        self.tx_ring.write_status(mem, next, status);
        self.tx_current = next;
        self.stats.opackets += 1;
        trace!(port = self.index, index = next, len = frame.len(), "tx descriptor queued");
        Ok(())
    }

    fn next_outbound<S: NetworkStack>(&mut self, stack: &mut S) -> Option<(Vec<u8>, QueueKind)> {
        if let Some(frame) = self.link_queue.pop() {
            return Some((frame, QueueKind::Link));
        }
        if let Some(frame) = self.fast_queue.pop() {
            return Some((frame, QueueKind::Fast));
        }
        if let Some(frame) = self.send_queue.pop() {
            return Some((frame, QueueKind::Send));
        }
        stack
            .dequeue_next(self.index)
            .map(|frame| (frame, QueueKind::Stack))
    }

    fn requeue(&mut self, frame: Vec<u8>, from: QueueKind) {
        match from {
            QueueKind::Link => self.link_queue.requeue(frame),
            QueueKind::Fast => self.fast_queue.requeue(frame),
            QueueKind::Send | QueueKind::Stack => self.send_queue.requeue(frame),
        }
    }

    /// Moves frames from the link, fast and send queues (then the network stack) into the ring
    /// until the ring is full or everything is queued. Returns the number of frames queued.
    pub fn drain<A: DescriptorAccess, S: NetworkStack>(
        &mut self,
        mem: &mut A,
        stack: &mut S,
    ) -> usize {
        let mut queued = 0;
        while !self.tx_busy && self.tx_in_use < self.tx_capacity() {
            let Some((frame, from)) = self.next_outbound(stack) else {
                break;
            };
            match self.enqueue(mem, &frame) {
                Ok(()) => queued += 1,
                Err(TxError::FrameTooLong { len, max }) => {
                    self.stats.oerrors += 1;
                    warn!(port = self.index, len, max, "dropping oversized frame");
                }
                Err(_) => {
                    self.requeue(frame, from);
                    break;
                }
            }
        }

        if queued > 0 {
            let last = self.tx_current;
            let status = self.tx_ring.read_status(mem, last);
            self.tx_ring.write_status(mem, last, status | DescStatus::EOT);
        }
        queued
    }

    /// Rings the doorbell if descriptors are queued and the DMA is idle.
    ///
    /// The DMA runs from descriptor 0 up to, but not including, the end-of-list address one past
    /// the last queued descriptor.
    pub fn start_tx<R: RegisterAccess>(&mut self, regs: &mut R) -> bool {
        if self.tx_busy || self.tx_in_use == 0 {
            return false;
        }
        self.tx_busy = true;

        let end = self.tx_ring.advance(self.tx_current).0;
        let eda = self.tx_ring.desc_low16(end);
        let cda = self.tx_ring.desc_low16(0);
        self.dmac_write16(regs, Channel::Tx, EDAL, eda);
        self.dmac_write16(regs, Channel::Tx, CDAL, cda);
        self.dmac_write(regs, Channel::Tx, DSR, DmaStatus::DE.bits());
        trace!(port = self.index, cda, eda, in_use = self.tx_in_use, "tx dma started");
        true
    }

    /// Re-enables the transmit DMA after it halted on an intermediate EOT descriptor. It picks up
    /// at its current descriptor address.
    pub(crate) fn tx_resume<R: RegisterAccess>(&self, regs: &mut R) {
        self.dmac_write(regs, Channel::Tx, DSR, DmaStatus::DE.bits());
    }

    /// Forgets every queued descriptor and releases the ring.
    pub fn tx_reset(&mut self) {
        self.tx_busy = false;
        self.tx_current = 0;
        self.tx_in_use = 0;
    }

    /// Whether the transmit DMA has consumed the whole batch.
    pub(crate) fn tx_end_reached<R: RegisterAccess>(&self, regs: &mut R) -> bool {
        let cda = self.dmac_read16(regs, Channel::Tx, CDAL);
        let eda = self.dmac_read16(regs, Channel::Tx, EDAL);
        cda == eda
    }
}
