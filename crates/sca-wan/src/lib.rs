//! Driver core for HD64570-class synchronous serial (SCA) WAN controllers.
//!
//! The crate implements the descriptor ring engines, Cisco HDLC framing dispatch, the port
//! Up/Down state machine and interrupt dispatch. Everything platform specific is reached through
//! the traits in [`bus`]: register access, the paged memory window of cards without bus-master
//! DMA, board callbacks and the network stack.
//!
//! A [`Controller`] is built once with [`Controller::attach`] and then driven by
//! [`Controller::hardware_interrupt`] plus the output/enqueue entry points.
#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
mod controller;
mod error;
mod intr;
pub mod memory;
mod port;
pub mod regs;
pub mod ring;
mod rx;
mod stats;
mod tx;

pub use bus::{MemoryWindow, NetworkStack, Platform, RegisterAccess};
pub use config::{PortConfig, PortLayout, ScaConfig, SCA_BSIZE, SCA_MTU};
pub use controller::{AddressFamily, Controller, OutboundPacket};
pub use error::{Result, RingDesync, ScaError, TxError};
pub use memory::{CoherentMemory, DescriptorAccess, DescriptorMemory, PageSession, PagedMemory};
pub use port::{Port, PortState};
pub use ring::{Descriptor, DescriptorRing, RingKind, DESC_LEN};
pub use stats::PortStats;
