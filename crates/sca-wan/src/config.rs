#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ring::DESC_LEN;
use crate::{Result, ScaError};

/// Per-descriptor buffer size: 1500 byte MTU plus the 4 byte HDLC header.
pub const SCA_BSIZE: u16 = 1504;
pub const SCA_MTU: u16 = 1500;

/// Controller-wide settings shared by every port.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScaConfig {
    pub tx_descriptors: usize,
    pub rx_descriptors: usize,
    pub buffer_size: u16,
    /// Every `tx_interrupt_spacing`-th descriptor of a transmit batch requests an interrupt,
    /// in addition to the last one.
    pub tx_interrupt_spacing: usize,
    /// Depth of the queue carrying keepalive replies.
    pub link_queue_len: usize,
    pub fast_queue_len: usize,
    pub send_queue_len: usize,
    /// Route low-delay IPv4 traffic through the fast queue.
    pub use_fast_queue: bool,
    /// Upper bound on cause-register re-reads per [`crate::Controller::hardware_interrupt`].
    pub max_interrupt_passes: usize,
}

impl Default for ScaConfig {
    fn default() -> Self {
        Self {
            tx_descriptors: 8,
            rx_descriptors: 16,
            buffer_size: SCA_BSIZE,
            tx_interrupt_spacing: 4,
            link_queue_len: 5,
            fast_queue_len: 50,
            send_queue_len: 50,
            use_fast_queue: false,
            max_interrupt_passes: 64,
        }
    }
}

impl ScaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tx_descriptors == 0 || self.rx_descriptors == 0 {
            return Err(ScaError::InvalidConfig("descriptor ring capacity is zero"));
        }
        // One descriptor always stays free, so a single-entry ring could never carry a frame.
        if self.tx_descriptors < 2 || self.rx_descriptors < 2 {
            return Err(ScaError::InvalidConfig("descriptor rings need at least two entries"));
        }
        if usize::from(self.buffer_size) < sca_hdlc::HDLC_HDRLEN {
            return Err(ScaError::InvalidConfig("buffer size smaller than an HDLC header"));
        }
        if self.tx_interrupt_spacing == 0 {
            return Err(ScaError::InvalidConfig("tx interrupt spacing is zero"));
        }
        if self.max_interrupt_passes == 0 {
            return Err(ScaError::InvalidConfig("max interrupt passes is zero"));
        }
        Ok(())
    }
}

/// Where a port's descriptors and buffers live in the controller's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortLayout {
    pub tx_desc: u32,
    pub tx_buf: u32,
    pub rx_desc: u32,
    pub rx_buf: u32,
}

impl PortLayout {
    /// Packs tx descriptors, rx descriptors, tx buffers and rx buffers back to back from `base`.
    pub fn contiguous(base: u32, config: &ScaConfig) -> Self {
        let tx_desc = base;
        let rx_desc = tx_desc + (config.tx_descriptors * DESC_LEN) as u32;
        let tx_buf = rx_desc + (config.rx_descriptors * DESC_LEN) as u32;
        let rx_buf = tx_buf + config.tx_descriptors as u32 * u32::from(config.buffer_size);
        Self {
            tx_desc,
            tx_buf,
            rx_desc,
            rx_buf,
        }
    }

    /// Total bytes spanned by [`PortLayout::contiguous`] for `config`.
    pub fn contiguous_len(config: &ScaConfig) -> usize {
        (config.tx_descriptors + config.rx_descriptors)
            * (DESC_LEN + usize::from(config.buffer_size))
    }

    /// Checks the addressing limits of the DMA engine.
    ///
    /// Chain pointers are 16 bits wide below a shared 8-bit base, so a descriptor array must not
    /// cross a 64 KiB boundary. Buffer pointers are 24 bits wide.
    pub fn validate(&self, config: &ScaConfig) -> Result<()> {
        let spans = [
            (self.tx_desc, config.tx_descriptors * DESC_LEN, 0xffff_0000u32),
            (self.rx_desc, config.rx_descriptors * DESC_LEN, 0xffff_0000),
            (
                self.tx_buf,
                config.tx_descriptors * usize::from(config.buffer_size),
                0xff00_0000,
            ),
            (
                self.rx_buf,
                config.rx_descriptors * usize::from(config.buffer_size),
                0xff00_0000,
            ),
        ];
        for (start, len, mask) in spans {
            let last = u32::try_from(len)
                .ok()
                .and_then(|len| start.checked_add(len - 1))
                .ok_or(ScaError::RingLayout("ring runs past the end of the address space"))?;
            if start & mask != last & mask {
                return Err(ScaError::RingLayout(
                    "descriptors or buffers cross an addressing boundary",
                ));
            }
        }
        Ok(())
    }
}

/// Clock and memory settings of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    pub layout: PortLayout,
    /// Raw RXS register value (clock source and divider).
    pub rx_clock: u8,
    /// Raw TXS register value.
    pub tx_clock: u8,
    /// Raw TMC register value.
    pub time_constant: u8,
    /// Drive the line clock from this port.
    pub external_clock: bool,
}

impl PortConfig {
    pub fn new(layout: PortLayout) -> Self {
        Self {
            layout,
            rx_clock: 0,
            tx_clock: 0,
            time_constant: 0,
            external_clock: false,
        }
    }
}
