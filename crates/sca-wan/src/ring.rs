//! Circular descriptor rings shared between the driver and the DMA controller.
//!
//! The ring itself is an index space over a fixed array of descriptors; it owns no memory.
//! Descriptor and buffer bytes are read and written through a [`DescriptorAccess`] session so
//! the same code drives both memory backends.

use crate::memory::DescriptorAccess;
use crate::regs::DescStatus;
use crate::{Result, ScaError};

/// Size of one descriptor in controller memory.
pub const DESC_LEN: usize = 10;

pub(crate) const DESC_CHAINP: u32 = 0;
pub(crate) const DESC_BUFP: u32 = 2;
pub(crate) const DESC_HBUFP: u32 = 4;
pub(crate) const DESC_BUFLEN: u32 = 6;
pub(crate) const DESC_STAT: u32 = 8;

/// A descriptor, as the controller sees it.
///
/// The chain pointer holds the low 16 bits of the next descriptor's address; the high byte is
/// shared by the whole ring and programmed once into the channel's CPB register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor {
    pub chain_pointer: u16,
    pub buffer_pointer: u32,
    pub buffer_length: u16,
    pub status: DescStatus,
}

impl Descriptor {
    pub const LEN: usize = DESC_LEN;

    pub fn read<A: DescriptorAccess>(mem: &mut A, addr: u32) -> Self {
        Self {
            chain_pointer: mem.read_chain_pointer(addr),
            buffer_pointer: mem.read_buffer_pointer(addr),
            buffer_length: mem.read_length(addr),
            status: mem.read_status(addr),
        }
    }

    pub fn write<A: DescriptorAccess>(&self, mem: &mut A, addr: u32) {
        mem.write_chain_pointer(addr, self.chain_pointer);
        mem.write_buffer_pointer(addr, self.buffer_pointer);
        mem.write_length(addr, self.buffer_length);
        mem.write_status(addr, self.status);
    }
}

/// What the length field of a freshly initialized descriptor holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    /// Transmit descriptors advertise the full buffer.
    Transmit,
    /// Receive descriptors start empty; the controller fills in the received length.
    Receive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRing {
    desc_base: u32,
    buf_base: u32,
    capacity: usize,
    buffer_size: u16,
}

impl DescriptorRing {
    pub fn new(desc_base: u32, buf_base: u32, capacity: usize, buffer_size: u16) -> Result<Self> {
        if capacity == 0 {
            return Err(ScaError::InvalidConfig("descriptor ring capacity is zero"));
        }
        let desc_len = capacity
            .checked_mul(DESC_LEN)
            .filter(|&len| len <= 0x1_0000)
            .ok_or(ScaError::RingLayout("descriptor ring larger than 64 KiB"))?;
        // Every descriptor and buffer address must fit in a u32.
        if desc_base.checked_add(desc_len as u32 - 1).is_none() {
            return Err(ScaError::RingLayout("descriptor ring wraps the address space"));
        }
        let buf_len = u32::try_from(capacity)
            .ok()
            .and_then(|n| n.checked_mul(u32::from(buffer_size)));
        if buf_len.and_then(|len| buf_base.checked_add(len.saturating_sub(1))).is_none() {
            return Err(ScaError::RingLayout("ring buffers wrap the address space"));
        }
        Ok(Self {
            desc_base,
            buf_base,
            capacity,
            buffer_size,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffer_size(&self) -> u16 {
        self.buffer_size
    }

    pub fn desc_base(&self) -> u32 {
        self.desc_base
    }

    pub fn buf_base(&self) -> u32 {
        self.buf_base
    }

    pub fn desc_addr(&self, index: usize) -> u32 {
        self.desc_base + (index * DESC_LEN) as u32
    }

    /// Low 16 bits of a descriptor address, as used by chain pointers and CDA/EDA registers.
    pub fn desc_low16(&self, index: usize) -> u16 {
        (self.desc_addr(index) & 0xffff) as u16
    }

    pub fn buffer_addr(&self, index: usize) -> u32 {
        self.buf_base + index as u32 * u32::from(self.buffer_size)
    }

    /// Chain pointer base (CPB register value) for this ring.
    pub fn chain_base(&self) -> u8 {
        ((self.desc_base >> 16) & 0xff) as u8
    }

    /// Converts a 16-bit descriptor address read from the controller back to a ring index.
    pub fn index_of(&self, low16: u16) -> Option<usize> {
        let offset = usize::from(low16.wrapping_sub((self.desc_base & 0xffff) as u16));
        if offset % DESC_LEN != 0 {
            return None;
        }
        let index = offset / DESC_LEN;
        (index < self.capacity).then_some(index)
    }

    /// Next index, and whether the step wrapped back to index 0.
    pub fn advance(&self, index: usize) -> (usize, bool) {
        let next = (index + 1) % self.capacity;
        (next, next == 0)
    }

    /// Lays every buffer out behind its descriptor, clears all status bits and closes the chain
    /// so the last descriptor points back at the first.
    pub fn initialize<A: DescriptorAccess>(&self, mem: &mut A, kind: RingKind) {
        let length = match kind {
            RingKind::Transmit => self.buffer_size,
            RingKind::Receive => 0,
        };
        for index in 0..self.capacity {
            let (next, _) = self.advance(index);
            Descriptor {
                chain_pointer: self.desc_low16(next),
                buffer_pointer: self.buffer_addr(index),
                buffer_length: length,
                status: DescStatus::empty(),
            }
            .write(mem, self.desc_addr(index));
        }
    }

    pub fn read_descriptor<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> Descriptor {
        Descriptor::read(mem, self.desc_addr(index))
    }

    pub fn read_status<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> DescStatus {
        mem.read_status(self.desc_addr(index))
    }

    pub fn write_status<A: DescriptorAccess>(&self, mem: &mut A, index: usize, status: DescStatus) {
        mem.write_status(self.desc_addr(index), status);
    }

    pub fn read_length<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> u16 {
        mem.read_length(self.desc_addr(index))
    }

    pub fn write_length<A: DescriptorAccess>(&self, mem: &mut A, index: usize, len: u16) {
        mem.write_length(self.desc_addr(index), len);
    }

    pub fn read_buffer_pointer<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> u32 {
        mem.read_buffer_pointer(self.desc_addr(index))
    }

    pub fn write_buffer_pointer<A: DescriptorAccess>(&self, mem: &mut A, index: usize, buf: u32) {
        mem.write_buffer_pointer(self.desc_addr(index), buf);
    }

    /// Follows the chain pointer of `index`. `None` if it leaves the ring.
    pub fn next_index<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> Option<usize> {
        self.index_of(mem.read_chain_pointer(self.desc_addr(index)))
    }

    /// Copies `data` into the buffer of descriptor `index` and records its length.
    ///
    /// Callers check `data` against [`DescriptorRing::buffer_size`] first; longer data is cut.
    pub fn write_frame<A: DescriptorAccess>(&self, mem: &mut A, index: usize, data: &[u8]) {
        let len = data.len().min(usize::from(self.buffer_size));
        self.write_buffer_pointer(mem, index, self.buffer_addr(index));
        mem.write_buffer(self.buffer_addr(index), &data[..len]);
        self.write_length(mem, index, len as u16);
    }

    /// Reads the bytes the controller stored in descriptor `index`'s buffer.
    pub fn read_frame<A: DescriptorAccess>(&self, mem: &mut A, index: usize) -> Vec<u8> {
        let len = self.read_length(mem, index).min(self.buffer_size);
        let mut out = vec![0u8; usize::from(len)];
        mem.read_buffer(self.buffer_addr(index), &mut out);
        out
    }
}
