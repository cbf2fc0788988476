//! HD64570 register offsets and bit definitions used by the driver core.
//!
//! Only the registers the driver touches are listed. Per-channel MSCI and DMAC registers are
//! relative to the port's MSCI/DMAC base; the receive DMA channel is channel 0 and the transmit
//! channel is channel 1 (`+ DMAC_TX_CHANNEL`).

use bitflags::bitflags;

// Global registers.
pub const PABR0: u16 = 0x02;
pub const PABR1: u16 = 0x03;
pub const WCRL: u16 = 0x04;
pub const WCRM: u16 = 0x05;
pub const WCRH: u16 = 0x06;
pub const PCR: u16 = 0x08;
pub const DMER: u16 = 0x09;
pub const ISR0: u16 = 0x10;
pub const ISR1: u16 = 0x11;
pub const ISR2: u16 = 0x12;
pub const IER0: u16 = 0x14;
pub const IER1: u16 = 0x15;
pub const IER2: u16 = 0x16;
pub const ITCR: u16 = 0x18;

pub const PCR_PR2: u8 = 0x04;
pub const DMER_EN: u8 = 0x80;
pub const ITCR_INTR_PRI_MSCI: u8 = 0x80;
pub const ITCR_ACK_NONE: u8 = 0x00;
pub const ITCR_VOUT_IVR: u8 = 0x00;

// Channel bases.
pub const MSCI_OFF_0: u16 = 0x20;
pub const MSCI_OFF_1: u16 = 0x40;
pub const DMAC_OFF_0: u16 = 0x80;
pub const DMAC_OFF_1: u16 = 0xc0;
pub const DMAC_TX_CHANNEL: u16 = 0x20;

// MSCI registers.
pub const ST1: u16 = 0x03;
pub const IE0: u16 = 0x08;
pub const IE1: u16 = 0x09;
pub const IE2: u16 = 0x0a;
pub const FIE: u16 = 0x0b;
pub const CMD: u16 = 0x0c;
pub const MD0: u16 = 0x0e;
pub const MD1: u16 = 0x0f;
pub const MD2: u16 = 0x10;
pub const CTL: u16 = 0x11;
pub const SA0: u16 = 0x12;
pub const SA1: u16 = 0x13;
pub const IDL: u16 = 0x14;
pub const TMC: u16 = 0x15;
pub const RXS: u16 = 0x16;
pub const TXS: u16 = 0x17;
pub const TRC0: u16 = 0x18;
pub const TRC1: u16 = 0x19;
pub const RRC: u16 = 0x1a;

pub const CMD_TXRESET: u8 = 0x01;
pub const CMD_TXENABLE: u8 = 0x02;
pub const CMD_TXDISABLE: u8 = 0x03;
pub const CMD_RXRESET: u8 = 0x11;
pub const CMD_RXENABLE: u8 = 0x12;
pub const CMD_RXDISABLE: u8 = 0x13;
pub const CMD_RESET: u8 = 0x21;

pub const MD0_CRC_1: u8 = 0x01;
pub const MD0_CRC_CCITT: u8 = 0x02;
pub const MD0_CRC_ENABLE: u8 = 0x04;
pub const MD0_MODE_HDLC: u8 = 0x80;
pub const MD1_NOADDRCHK: u8 = 0x00;
pub const MD2_DUPLEX: u8 = 0x00;
pub const MD2_ADPLLX8: u8 = 0x08;
pub const MD2_NRZ: u8 = 0x00;

pub const CTL_RTS_MASK: u8 = 0x01;
pub const CTL_RTS_HIGH: u8 = 0x01;
pub const CTL_RTS_LOW: u8 = 0x00;
pub const CTL_IDLC_PATTERN: u8 = 0x10;
pub const CTL_UDRNC_AFTER_FCS: u8 = 0x20;

pub const ST0_TXINT: u8 = 0x80;
pub const ST1_UDRN: u8 = 0x80;

pub const IDLE_PATTERN: u8 = 0x7e;
pub const RRC_DEFAULT: u8 = 0x0e;
/// Largest transmit-ready threshold; TRC0 never grows past this.
pub const TRC_MAX: u8 = 0x1f;
pub const TRC0_DEFAULT: u8 = 0x00;
pub const TRC_UNDERRUN_STEP: u8 = 2;

// DMAC registers (relative to the channel base).
pub const CPB: u16 = 0x06;
pub const CDAL: u16 = 0x08;
pub const EDAL: u16 = 0x0a;
pub const BFLL: u16 = 0x0c;
pub const DSR: u16 = 0x10;
pub const DMR: u16 = 0x11;
pub const DIR: u16 = 0x14;
pub const DCR: u16 = 0x15;

pub const DMR_TMOD: u8 = 0x10;
pub const DMR_NF: u8 = 0x04;
pub const DCR_ABRT: u8 = 0x01;

// ISR1 bits for port 0; port 1 uses the high nibble.
pub const ISR1_DMAC_RX0A: u8 = 0x01;
pub const ISR1_DMAC_RX0B: u8 = 0x02;
pub const ISR1_DMAC_TX0A: u8 = 0x04;
pub const ISR1_DMAC_TX0B: u8 = 0x08;

bitflags! {
    /// DMA status register (DSR) and, for the upper four bits, the DMA interrupt enable
    /// register (DIR).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DmaStatus: u8 {
        const EOT = 0x80;
        const EOM = 0x40;
        const BOF = 0x20;
        const COF = 0x10;
        const DE = 0x02;
        const DEWD = 0x01;
    }
}

bitflags! {
    /// Status byte of a buffer descriptor.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct DescStatus: u8 {
        const EOM = 0x80;
        const SHORT_FRAME = 0x40;
        const ABORT = 0x20;
        const RESIDUAL = 0x10;
        const OVERRUN = 0x08;
        const CRC = 0x04;
        const EOT = 0x01;
    }
}

impl DescStatus {
    pub const ERRORS: Self = Self::SHORT_FRAME
        .union(Self::ABORT)
        .union(Self::RESIDUAL)
        .union(Self::OVERRUN)
        .union(Self::CRC);

    pub fn has_errors(self) -> bool {
        self.intersects(Self::ERRORS)
    }
}
