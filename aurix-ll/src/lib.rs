#![no_std]
#![warn(missing_docs)]
//! # AURIX low-level drivers
//!
//! ## Overview
//! This crate provides platform-agnostic low-level drivers for the
//! peripherals of AURIX TriCore microcontrollers that this project uses:
//!
//! - [`eth`]: the Ethernet MAC with its DMA descriptor rings
//! - [`can`]: the MultiCAN module (nodes and message objects)
//! - [`port`]: the port (GPIO) register files
//! - [`dma`]: DMA channel control
//!
//! Every peripheral is identified by a marker type carrying the address of
//! its register file (see [`EthId`], [`CanId`], [`PortId`], [`DmaId`] in
//! [`aurix_ll_core`]). Drivers are constructed from an instance of a
//! [`Dependencies`] implementing struct whose safety requirements guarantee
//! that module clocks are running, ENDINIT protection has been handled and
//! pins are routed — all of which is derivative and board specific and
//! therefore out of scope for this crate.
//!
//! ## Descriptor memory
//!
//! The Ethernet DMA engine exchanges frames with software through rings of
//! four-word descriptors plus the frame buffers they point to. This memory is
//! shared between the CPU and the DMA engine and must stay at a fixed
//! address for the lifetime of the driver. It is allocated statically via
//! [`eth::ram::DescriptorMemory`] and is best placed in an uncached memory
//! region through a linker section:
//!
//! ```text
//! MEMORY
//! {
//!   FLASH : ORIGIN = 0x80000000, LENGTH = 2M
//!   ETHRAM : ORIGIN = 0x70000000, LENGTH = 16K
//! }
//!
//! SECTIONS {
//!   .eth_ram (NOLOAD) :
//!   {
//!     *(.eth_ram .eth_ram.*);
//!   } > ETHRAM
//! }
//! ```
//!
//! ```no_run
//! use aurix_ll::eth::ram::{Capacities, DescriptorMemory};
//! use aurix_ll::generic_array::typenum::consts::*;
//!
//! struct RingSizes;
//! impl Capacities for RingSizes {
//!     type TxRing = U4;
//!     type RxRing = U8;
//! }
//!
//! #[link_section = ".eth_ram"]
//! static mut ETH_RAM: DescriptorMemory<RingSizes> = DescriptorMemory::new();
//! ```
//!
//! ## Usage sketch
//!
//! ```no_run
//! # use aurix_ll::eth::ram::{Capacities, DescriptorMemory};
//! # use aurix_ll::generic_array::typenum::consts::*;
//! # struct RingSizes;
//! # impl Capacities for RingSizes {
//! #     type TxRing = U4;
//! #     type RxRing = U8;
//! # }
//! # static mut ETH_RAM: DescriptorMemory<RingSizes> = DescriptorMemory::new();
//! # pub enum Eth0 {}
//! # unsafe impl aurix_ll::core::EthId for Eth0 {
//! #     const ADDRESS: *const () = 0xF001_D000 as *const _;
//! # }
//! # struct Deps;
//! # unsafe impl aurix_ll::core::Dependencies<Eth0> for Deps {
//! #     fn host_clock(&self) -> fugit::HertzU32 { unreachable!() }
//! #     fn module_clock(&self) -> fugit::HertzU32 { unreachable!() }
//! # }
//! # let dependencies = Deps;
//! use aurix_ll::eth::{config::LineSpeed, EthConfigurable};
//! use aurix_ll::eth::smi::Phy;
//!
//! let mut eth = EthConfigurable::<Eth0, _, _>::new(
//!     [0x00, 0x20, 0x30, 0x40, 0x50, 0x60],
//!     dependencies,
//!     unsafe { &mut ETH_RAM },
//! );
//! eth.config().speed = LineSpeed::Mbit100;
//! let mut eth = eth.finalize().unwrap();
//!
//! let phy = Phy::new(0);
//! if phy.link_up(&mut eth.smi) {
//!     eth.start_transmitter();
//! }
//! ```
//!
//! [`EthId`]: aurix_ll_core::EthId
//! [`CanId`]: aurix_ll_core::CanId
//! [`PortId`]: aurix_ll_core::PortId
//! [`DmaId`]: aurix_ll_core::DmaId
//! [`Dependencies`]: aurix_ll_core::Dependencies

pub mod can;
pub mod dma;
pub mod eth;
pub mod port;
pub mod prelude;

pub use aurix_ll_core as core;
pub use embedded_can;
pub use embedded_hal;
pub use generic_array;
