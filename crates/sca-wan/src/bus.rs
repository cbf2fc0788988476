//! Collaborators the driver core is wired to by its owner.
//!
//! Nothing here knows about rings or frames; these traits are the seams where platform glue
//! (bus access, modem signals, the network stack) plugs in, and where tests plug in fakes.

/// Access to the controller's 8/16-bit register file.
///
/// Reads take `&mut self` because reading a status register may have side effects.
pub trait RegisterAccess {
    fn read_u8(&mut self, offset: u16) -> u8;
    fn read_u16(&mut self, offset: u16) -> u16;
    fn write_u8(&mut self, offset: u16, value: u8);
    fn write_u16(&mut self, offset: u16, value: u16);
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read_u8(&mut self, offset: u16) -> u8 {
        <T as RegisterAccess>::read_u8(&mut **self, offset)
    }

    fn read_u16(&mut self, offset: u16) -> u16 {
        <T as RegisterAccess>::read_u16(&mut **self, offset)
    }

    fn write_u8(&mut self, offset: u16, value: u8) {
        <T as RegisterAccess>::write_u8(&mut **self, offset, value);
    }

    fn write_u16(&mut self, offset: u16, value: u16) {
        <T as RegisterAccess>::write_u16(&mut **self, offset, value);
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for Box<T> {
    fn read_u8(&mut self, offset: u16) -> u8 {
        <T as RegisterAccess>::read_u8(&mut **self, offset)
    }

    fn read_u16(&mut self, offset: u16) -> u16 {
        <T as RegisterAccess>::read_u16(&mut **self, offset)
    }

    fn write_u8(&mut self, offset: u16, value: u8) {
        <T as RegisterAccess>::write_u8(&mut **self, offset, value);
    }

    fn write_u16(&mut self, offset: u16, value: u16) {
        <T as RegisterAccess>::write_u16(&mut **self, offset, value);
    }
}

/// On-card memory reached through a movable window (cards without bus-master DMA).
///
/// Offsets passed to the accessors are relative to the currently selected page.
pub trait MemoryWindow {
    fn select_page(&mut self, addr: u32);
    fn page_on(&mut self);
    fn page_off(&mut self);

    fn read_u8(&mut self, offset: u32) -> u8;
    fn read_u16(&mut self, offset: u32) -> u16;
    fn write_u8(&mut self, offset: u32, value: u8);
    fn write_u16(&mut self, offset: u32, value: u16);
    fn read_region(&mut self, offset: u32, buf: &mut [u8]);
    fn write_region(&mut self, offset: u32, data: &[u8]);
}

/// Board-level callbacks and time.
pub trait Platform {
    /// Select whether the port drives the line clock.
    fn set_port_clock(&mut self, port: usize, external: bool);

    /// Raise or lower DTR on the port's connector.
    fn set_dtr(&mut self, port: usize, asserted: bool);

    /// Milliseconds since boot; carried in keepalive replies.
    fn uptime_millis(&self) -> u32;

    /// Sub-second clock in microseconds, recorded as the last keepalive send time.
    fn micro_time(&self) -> u32 {
        0
    }
}

/// The network layer above the driver.
pub trait NetworkStack {
    /// Hand a received IPv4/IPv6 payload upstream. Returns `false` if the packet was refused
    /// (input queue full).
    fn deliver(&mut self, port: usize, payload: &[u8], ethertype: u16) -> bool;

    /// Next already-framed HDLC frame waiting to be sent on `port`, if any.
    fn dequeue_next(&mut self, _port: usize) -> Option<Vec<u8>> {
        None
    }
}

impl NetworkStack for () {
    fn deliver(&mut self, _port: usize, _payload: &[u8], _ethertype: u16) -> bool {
        true
    }
}
