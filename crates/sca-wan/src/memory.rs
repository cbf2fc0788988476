//! Descriptor and buffer memory backends.
//!
//! Cards that bus-master into host memory see descriptors as plain bytes
//! ([`CoherentMemory`]). Cards with on-board memory expose it through a paged window
//! ([`PagedMemory`]). The ring and engine code is written once against [`DescriptorAccess`] and
//! never asks which backend it is talking to; the backend is chosen when the
//! [`crate::Controller`] is built and fixed for its lifetime.

use crate::bus::MemoryWindow;
use crate::regs::DescStatus;
use crate::ring::{DESC_BUFLEN, DESC_BUFP, DESC_CHAINP, DESC_HBUFP, DESC_STAT};

/// Field-level access to descriptors and buffers by controller address.
pub trait DescriptorAccess {
    fn read_chain_pointer(&mut self, desc: u32) -> u16;
    fn write_chain_pointer(&mut self, desc: u32, chain: u16);
    fn read_buffer_pointer(&mut self, desc: u32) -> u32;
    fn write_buffer_pointer(&mut self, desc: u32, buf: u32);
    fn read_length(&mut self, desc: u32) -> u16;
    fn write_length(&mut self, desc: u32, len: u16);
    fn read_status(&mut self, desc: u32) -> DescStatus;
    fn write_status(&mut self, desc: u32, status: DescStatus);
    fn read_buffer(&mut self, addr: u32, out: &mut [u8]);
    fn write_buffer(&mut self, addr: u32, data: &[u8]);
}

impl<T: DescriptorAccess + ?Sized> DescriptorAccess for &mut T {
    fn read_chain_pointer(&mut self, desc: u32) -> u16 {
        (**self).read_chain_pointer(desc)
    }

    fn write_chain_pointer(&mut self, desc: u32, chain: u16) {
        (**self).write_chain_pointer(desc, chain);
    }

    fn read_buffer_pointer(&mut self, desc: u32) -> u32 {
        (**self).read_buffer_pointer(desc)
    }

    fn write_buffer_pointer(&mut self, desc: u32, buf: u32) {
        (**self).write_buffer_pointer(desc, buf);
    }

    fn read_length(&mut self, desc: u32) -> u16 {
        (**self).read_length(desc)
    }

    fn write_length(&mut self, desc: u32, len: u16) {
        (**self).write_length(desc, len);
    }

    fn read_status(&mut self, desc: u32) -> DescStatus {
        (**self).read_status(desc)
    }

    fn write_status(&mut self, desc: u32, status: DescStatus) {
        (**self).write_status(desc, status);
    }

    fn read_buffer(&mut self, addr: u32, out: &mut [u8]) {
        (**self).read_buffer(addr, out);
    }

    fn write_buffer(&mut self, addr: u32, data: &[u8]) {
        (**self).write_buffer(addr, data);
    }
}

/// A backend that hands out scoped [`DescriptorAccess`] sessions.
///
/// All ring work for one direction of one port happens inside a single session. For paged
/// memory the session owns the window, so two sessions can never interleave page selections.
pub trait DescriptorMemory {
    type Session<'a>: DescriptorAccess
    where
        Self: 'a;

    /// Opens a session on the page containing `addr`.
    fn session(&mut self, addr: u32) -> Self::Session<'_>;

    /// Mask selecting the in-page offset, or `None` if all memory is directly addressable.
    fn page_mask(&self) -> Option<u32> {
        None
    }
}

/// Host memory shared with a bus-mastering controller.
///
/// Accesses outside the arena read as zero and are otherwise ignored, the way a write to an
/// unmapped bus address would be.
#[derive(Debug, Clone)]
pub struct CoherentMemory {
    base: u32,
    bytes: Vec<u8>,
}

impl CoherentMemory {
    pub fn new(base: u32, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0u8; len],
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn range(&self, addr: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start..end)
    }

    fn read_u8(&self, addr: u32) -> u8 {
        self.range(addr, 1).map_or(0, |r| self.bytes[r.start])
    }

    fn read_u16(&self, addr: u32) -> u16 {
        self.range(addr, 2)
            .map_or(0, |r| u16::from_le_bytes([self.bytes[r.start], self.bytes[r.start + 1]]))
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        if let Some(r) = self.range(addr, 1) {
            self.bytes[r.start] = value;
        }
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        if let Some(r) = self.range(addr, 2) {
            self.bytes[r].copy_from_slice(&value.to_le_bytes());
        }
    }
}

impl DescriptorAccess for CoherentMemory {
    fn read_chain_pointer(&mut self, desc: u32) -> u16 {
        self.read_u16(desc + DESC_CHAINP)
    }

    fn write_chain_pointer(&mut self, desc: u32, chain: u16) {
        self.write_u16(desc + DESC_CHAINP, chain);
    }

    fn read_buffer_pointer(&mut self, desc: u32) -> u32 {
        let lo = u32::from(self.read_u16(desc + DESC_BUFP));
        let hi = u32::from(self.read_u8(desc + DESC_HBUFP));
        lo | (hi << 16)
    }

    fn write_buffer_pointer(&mut self, desc: u32, buf: u32) {
        self.write_u16(desc + DESC_BUFP, (buf & 0xffff) as u16);
        self.write_u8(desc + DESC_HBUFP, ((buf >> 16) & 0xff) as u8);
    }

    fn read_length(&mut self, desc: u32) -> u16 {
        self.read_u16(desc + DESC_BUFLEN)
    }

    fn write_length(&mut self, desc: u32, len: u16) {
        self.write_u16(desc + DESC_BUFLEN, len);
    }

    fn read_status(&mut self, desc: u32) -> DescStatus {
        DescStatus::from_bits_retain(self.read_u8(desc + DESC_STAT))
    }

    fn write_status(&mut self, desc: u32, status: DescStatus) {
        self.write_u8(desc + DESC_STAT, status.bits());
    }

    fn read_buffer(&mut self, addr: u32, out: &mut [u8]) {
        match self.range(addr, out.len()) {
            Some(r) => out.copy_from_slice(&self.bytes[r]),
            None => out.fill(0),
        }
    }

    fn write_buffer(&mut self, addr: u32, data: &[u8]) {
        if let Some(r) = self.range(addr, data.len()) {
            self.bytes[r].copy_from_slice(data);
        }
    }
}

impl DescriptorMemory for CoherentMemory {
    type Session<'a> = &'a mut CoherentMemory;

    fn session(&mut self, _addr: u32) -> Self::Session<'_> {
        self
    }
}

/// On-card memory behind a [`MemoryWindow`].
#[derive(Debug)]
pub struct PagedMemory<W> {
    window: W,
    page_mask: u32,
}

impl<W: MemoryWindow> PagedMemory<W> {
    /// `page_mask` selects the in-page offset bits, e.g. `0x3fff` for a 16 KiB window.
    pub fn new(window: W, page_mask: u32) -> Self {
        Self { window, page_mask }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }
}

impl<W: MemoryWindow> DescriptorMemory for PagedMemory<W> {
    type Session<'a>
        = PageSession<'a, W>
    where
        Self: 'a;

    fn session(&mut self, addr: u32) -> Self::Session<'_> {
        PageSession::open(&mut self.window, addr, self.page_mask)
    }

    fn page_mask(&self) -> Option<u32> {
        Some(self.page_mask)
    }
}

/// The window, with one page selected and switched on until the session is dropped.
#[derive(Debug)]
pub struct PageSession<'a, W: MemoryWindow> {
    window: &'a mut W,
    page_mask: u32,
}

impl<'a, W: MemoryWindow> PageSession<'a, W> {
    fn open(window: &'a mut W, addr: u32, page_mask: u32) -> Self {
        window.page_on();
        window.select_page(addr & !page_mask);
        Self { window, page_mask }
    }

    fn offset(&self, addr: u32) -> u32 {
        addr & self.page_mask
    }
}

impl<W: MemoryWindow> Drop for PageSession<'_, W> {
    fn drop(&mut self) {
        self.window.page_off();
    }
}

impl<W: MemoryWindow> DescriptorAccess for PageSession<'_, W> {
    fn read_chain_pointer(&mut self, desc: u32) -> u16 {
        let off = self.offset(desc + DESC_CHAINP);
        self.window.read_u16(off)
    }

    fn write_chain_pointer(&mut self, desc: u32, chain: u16) {
        let off = self.offset(desc + DESC_CHAINP);
        self.window.write_u16(off, chain);
    }

    fn read_buffer_pointer(&mut self, desc: u32) -> u32 {
        let lo = self.offset(desc + DESC_BUFP);
        let hi = self.offset(desc + DESC_HBUFP);
        u32::from(self.window.read_u16(lo)) | (u32::from(self.window.read_u8(hi)) << 16)
    }

    fn write_buffer_pointer(&mut self, desc: u32, buf: u32) {
        let lo = self.offset(desc + DESC_BUFP);
        let hi = self.offset(desc + DESC_HBUFP);
        self.window.write_u16(lo, (buf & 0xffff) as u16);
        self.window.write_u8(hi, ((buf >> 16) & 0xff) as u8);
    }

    fn read_length(&mut self, desc: u32) -> u16 {
        let off = self.offset(desc + DESC_BUFLEN);
        self.window.read_u16(off)
    }

    fn write_length(&mut self, desc: u32, len: u16) {
        let off = self.offset(desc + DESC_BUFLEN);
        self.window.write_u16(off, len);
    }

    fn read_status(&mut self, desc: u32) -> DescStatus {
        let off = self.offset(desc + DESC_STAT);
        DescStatus::from_bits_retain(self.window.read_u8(off))
    }

    fn write_status(&mut self, desc: u32, status: DescStatus) {
        let off = self.offset(desc + DESC_STAT);
        self.window.write_u8(off, status.bits());
    }

    fn read_buffer(&mut self, addr: u32, out: &mut [u8]) {
        let off = self.offset(addr);
        self.window.read_region(off, out);
    }

    fn write_buffer(&mut self, addr: u32, data: &[u8]) {
        let off = self.offset(addr);
        self.window.write_region(off, data);
    }
}
