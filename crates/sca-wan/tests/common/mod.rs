#![allow(dead_code)]

use std::collections::VecDeque;

use sca_wan::regs::*;
use sca_wan::{
    CoherentMemory, Controller, DescriptorAccess, MemoryWindow, NetworkStack, Platform,
    PortConfig, PortLayout, RegisterAccess, ScaConfig,
};

pub type TestController = Controller<FakeRegs, CoherentMemory, FakePlatform, FakeStack>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Base address of port `index`'s descriptors and buffers.
pub fn port_base(index: usize) -> u32 {
    0x1_0000 * (index as u32 + 1)
}

pub fn port_configs(cfg: &ScaConfig, count: usize) -> Vec<PortConfig> {
    (0..count)
        .map(|index| {
            let mut port = PortConfig::new(PortLayout::contiguous(port_base(index), cfg));
            port.external_clock = index == 0;
            port.rx_clock = 0x40;
            port.tx_clock = 0x40;
            port.time_constant = 0x10;
            port
        })
        .collect()
}

pub fn attach(cfg: ScaConfig, ports: usize) -> TestController {
    init_tracing();
    let configs = port_configs(&cfg, ports);
    let mem = CoherentMemory::new(0, 0x1_0000 * (ports + 1));
    Controller::attach(
        FakeRegs::new(),
        mem,
        FakePlatform::default(),
        FakeStack::default(),
        cfg,
        configs,
    )
    .unwrap()
}

pub fn attach_up(cfg: ScaConfig) -> TestController {
    let mut ctl = attach(cfg, 1);
    ctl.port_up(0).unwrap();
    ctl
}

fn dmac_base(port: usize) -> u16 {
    if port == 0 {
        DMAC_OFF_0
    } else {
        DMAC_OFF_1
    }
}

pub fn rx_reg(port: usize, reg: u16) -> u16 {
    dmac_base(port) + reg
}

pub fn tx_reg(port: usize, reg: u16) -> u16 {
    dmac_base(port) + DMAC_TX_CHANNEL + reg
}

pub fn msci_reg(port: usize, reg: u16) -> u16 {
    if port == 0 {
        MSCI_OFF_0 + reg
    } else {
        MSCI_OFF_1 + reg
    }
}

/// An HD64570 register file: plain storage plus the write-one-to-clear status registers and
/// interrupt status registers derived from them.
pub struct FakeRegs {
    file: [u8; 256],
    pub writes: Vec<(u16, u8)>,
}

impl FakeRegs {
    pub fn new() -> Self {
        Self {
            file: [0; 256],
            writes: Vec::new(),
        }
    }

    pub fn get(&self, offset: u16) -> u8 {
        self.file[usize::from(offset)]
    }

    pub fn get16(&self, offset: u16) -> u16 {
        let at = usize::from(offset);
        u16::from_le_bytes([self.file[at], self.file[at + 1]])
    }

    /// Stores a value the way the chip itself would, bypassing register side effects.
    pub fn set(&mut self, offset: u16, value: u8) {
        self.file[usize::from(offset)] = value;
    }

    pub fn set16(&mut self, offset: u16, value: u16) {
        let at = usize::from(offset);
        self.file[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Latches DMA status bits on a channel, as the DMAC does when it raises an interrupt.
    pub fn raise(&mut self, dsr: u16, bits: DmaStatus) {
        let value = self.get(dsr) | bits.bits();
        self.set(dsr, value);
    }

    fn is_dsr(offset: u16) -> bool {
        [DMAC_OFF_0, DMAC_OFF_1]
            .iter()
            .any(|base| offset == base + DSR || offset == base + DMAC_TX_CHANNEL + DSR)
    }

    fn is_st1(offset: u16) -> bool {
        offset == MSCI_OFF_0 + ST1 || offset == MSCI_OFF_1 + ST1
    }

    fn isr0(&self) -> u8 {
        let mut isr = 0;
        if self.get(MSCI_OFF_0 + ST1) != 0 {
            isr |= 0x04;
        }
        if self.get(MSCI_OFF_1 + ST1) != 0 {
            isr |= 0x40;
        }
        isr
    }

    fn isr1(&self) -> u8 {
        let causes = DmaStatus::EOT | DmaStatus::EOM | DmaStatus::BOF | DmaStatus::COF;
        let mut isr = 0;
        for (shift, base) in [(0, DMAC_OFF_0), (4, DMAC_OFF_1)] {
            if self.get(base + DSR) & causes.bits() != 0 {
                isr |= ISR1_DMAC_RX0A << shift;
            }
            if self.get(base + DMAC_TX_CHANNEL + DSR) & causes.bits() != 0 {
                isr |= ISR1_DMAC_TX0A << shift;
            }
        }
        isr
    }
}

impl RegisterAccess for FakeRegs {
    fn read_u8(&mut self, offset: u16) -> u8 {
        match offset {
            ISR0 => self.isr0(),
            ISR1 => self.isr1(),
            ISR2 => 0,
            _ => self.get(offset),
        }
    }

    fn read_u16(&mut self, offset: u16) -> u16 {
        self.get16(offset)
    }

    fn write_u8(&mut self, offset: u16, value: u8) {
        self.writes.push((offset, value));
        let old = self.get(offset);
        let new = if Self::is_dsr(offset) {
            let status = old & 0xf0 & !(value & 0xf0);
            let de = if value & DmaStatus::DEWD.bits() != 0 {
                old & DmaStatus::DE.bits()
            } else {
                value & DmaStatus::DE.bits()
            };
            status | de
        } else if Self::is_st1(offset) {
            old & !value
        } else {
            value
        };
        self.set(offset, new);
    }

    fn write_u16(&mut self, offset: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.writes.push((offset, lo));
        self.writes.push((offset + 1, hi));
        self.set16(offset, value);
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub dtr: [bool; 2],
    pub clock_calls: Vec<(usize, bool)>,
    pub uptime: u32,
    pub micros: u32,
}

impl Platform for FakePlatform {
    fn set_port_clock(&mut self, port: usize, external: bool) {
        self.clock_calls.push((port, external));
    }

    fn set_dtr(&mut self, port: usize, asserted: bool) {
        self.dtr[port] = asserted;
    }

    fn uptime_millis(&self) -> u32 {
        self.uptime
    }

    fn micro_time(&self) -> u32 {
        self.micros
    }
}

#[derive(Default)]
pub struct FakeStack {
    pub delivered: Vec<(usize, Vec<u8>, u16)>,
    pub outbound: [VecDeque<Vec<u8>>; 2],
    pub refuse: bool,
}

impl NetworkStack for FakeStack {
    fn deliver(&mut self, port: usize, payload: &[u8], ethertype: u16) -> bool {
        if self.refuse {
            return false;
        }
        self.delivered.push((port, payload.to_vec(), ethertype));
        true
    }

    fn dequeue_next(&mut self, port: usize) -> Option<Vec<u8>> {
        self.outbound[port].pop_front()
    }
}

/// On-card memory behind a window. Touching the window while it is switched off panics.
pub struct FakeWindow {
    pub mem: Vec<u8>,
    pub page: u32,
    pub on: bool,
    pub page_ons: usize,
    pub page_offs: usize,
    pub selects: Vec<u32>,
}

impl FakeWindow {
    pub fn new(len: usize) -> Self {
        Self {
            mem: vec![0; len],
            page: 0,
            on: false,
            page_ons: 0,
            page_offs: 0,
            selects: Vec::new(),
        }
    }

    fn at(&self, offset: u32) -> usize {
        assert!(self.on, "memory window accessed while switched off");
        (self.page + offset) as usize
    }
}

impl MemoryWindow for FakeWindow {
    fn select_page(&mut self, addr: u32) {
        self.page = addr;
        self.selects.push(addr);
    }

    fn page_on(&mut self) {
        assert!(!self.on, "memory window switched on twice");
        self.on = true;
        self.page_ons += 1;
    }

    fn page_off(&mut self) {
        self.on = false;
        self.page_offs += 1;
    }

    fn read_u8(&mut self, offset: u32) -> u8 {
        self.mem[self.at(offset)]
    }

    fn read_u16(&mut self, offset: u32) -> u16 {
        let at = self.at(offset);
        u16::from_le_bytes([self.mem[at], self.mem[at + 1]])
    }

    fn write_u8(&mut self, offset: u32, value: u8) {
        let at = self.at(offset);
        self.mem[at] = value;
    }

    fn write_u16(&mut self, offset: u32, value: u16) {
        let at = self.at(offset);
        self.mem[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn read_region(&mut self, offset: u32, buf: &mut [u8]) {
        let at = self.at(offset);
        buf.copy_from_slice(&self.mem[at..at + buf.len()]);
    }

    fn write_region(&mut self, offset: u32, data: &[u8]) {
        let at = self.at(offset);
        self.mem[at..at + data.len()].copy_from_slice(data);
    }
}

/// Plays the receive DMA: stores `frame` in descriptor `index` of `port` with `status`, then
/// moves the current descriptor address past it.
pub fn hw_receive(
    ctl: &mut TestController,
    port: usize,
    index: usize,
    frame: &[u8],
    status: DescStatus,
) {
    let ring = ctl.port(port).unwrap().rx_ring().clone();
    let mem = ctl.memory_mut();
    ring.write_frame(mem, index, frame);
    ring.write_status(mem, index, status);
    let next = ring.advance(index).0;
    ctl.regs_mut().set16(rx_reg(port, CDAL), ring.desc_low16(next));
}

/// Plays the transmit DMA finishing its batch: CDA catches up with EDA, the channel stops and EOT
/// is latched.
pub fn hw_tx_complete(ctl: &mut TestController, port: usize) {
    let eda = ctl.regs().get16(tx_reg(port, EDAL));
    ctl.regs_mut().set16(tx_reg(port, CDAL), eda);
    ctl.regs_mut().set(tx_reg(port, DSR), DmaStatus::EOT.bits());
}

/// Plays the transmit DMA stopping after an EOT descriptor short of the end of the batch, with
/// CDA left on descriptor `next`.
pub fn hw_tx_halt(ctl: &mut TestController, port: usize, next: usize) {
    let cda = ctl.port(port).unwrap().tx_ring().desc_low16(next);
    ctl.regs_mut().set16(tx_reg(port, CDAL), cda);
    ctl.regs_mut().set(tx_reg(port, DSR), DmaStatus::EOT.bits());
}

pub fn tx_frame(ctl: &mut TestController, port: usize, index: usize) -> Vec<u8> {
    let ring = ctl.port(port).unwrap().tx_ring().clone();
    ring.read_frame(ctl.memory_mut(), index)
}

pub fn tx_status(ctl: &mut TestController, port: usize, index: usize) -> DescStatus {
    let ring = ctl.port(port).unwrap().tx_ring().clone();
    ctl.memory_mut().read_status(ring.desc_addr(index))
}
