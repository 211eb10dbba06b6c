#![no_std]
#![warn(missing_docs)]

//! `aurix-ll-core` provides the essential contracts that serve as a thin
//! integration layer between the platform independent [`aurix-ll`] crate and
//! platform specific startup/board crates (in documentation also referred to
//! as _target integrations_).
//!
//! Traits from this crate are not supposed to be implemented by the
//! application developer; implementations should be provided by the target
//! integration for a concrete AURIX derivative (pin multiplexing, clock tree
//! and watchdog handling differ between derivatives and board designs).
//!
//! Integrators of this crate are responsible for the soundness of their trait
//! implementations and for conforming to the respective safety prerequisites.
//!
//! [`aurix-ll`]: ../aurix_ll/index.html

pub use fugit;

/// Trait representing the identity of an Ethernet MAC instance
///
/// Types implementing this trait are expected to be used as marker types
/// identifying a specific ETH peripheral instance. The trait only conveys
/// *where* the register file is located, not that it may be accessed; the
/// latter is expressed by [`Dependencies`].
///
/// # Safety
/// `EthId::ADDRESS` points to the start of a valid ETH register file.
pub unsafe trait EthId {
    /// Static address of the register file of the corresponding peripheral
    const ADDRESS: *const ();
}

/// Trait representing the identity of a MultiCAN module instance
///
/// # Safety
/// `CanId::ADDRESS` points to the start of a valid MultiCAN register file.
pub unsafe trait CanId {
    /// Static address of the register file of the corresponding peripheral
    const ADDRESS: *const ();
}

/// Trait representing the identity of a port (GPIO) register file
///
/// # Safety
/// `PortId::ADDRESS` points to the start of a valid port register file.
pub unsafe trait PortId {
    /// Static address of the register file of the corresponding port
    const ADDRESS: *const ();
}

/// Trait representing the identity of a DMA module instance
///
/// # Safety
/// `DmaId::ADDRESS` points to the start of a valid DMA register file.
pub unsafe trait DmaId {
    /// Static address of the register file of the corresponding peripheral
    const ADDRESS: *const ();
}

/// Trait representing the dependencies of a peripheral identified by `Id`
///
/// Structs implementing [`Dependencies`] should
/// - enclose all object representable dependencies of `Id` and release them
///   upon destruction
/// - be constructible only when it is safe and sound to interact with the
///   peripheral (module clock enabled, ENDINIT handling done, pins routed)
/// - be a singleton (only a single instance of [`Dependencies`] for a
///   specific `Id` must exist at the same time)
///
/// in order to prevent aliasing and guarantee that the abstractions provided
/// by `aurix-ll` are the sole owners of the peripheral.
///
/// # Safety
/// While a [`Dependencies`] instance exists
/// - the clocks reported by it must not change
/// - the pin modes routed to the peripheral must not change
/// - the register file must not be accessed by other parts of the target
///   integration nor be safely reachable by the application developer
pub unsafe trait Dependencies<Id> {
    /// Frequency of the host / SPB clock the register interface runs at.
    fn host_clock(&self) -> fugit::HertzU32;
    /// Frequency of the module clock of the peripheral.
    ///
    /// For CAN this is the clock feeding the bit timing logic; for ETH it is
    /// the clock the MDIO clock range is derived from.
    fn module_clock(&self) -> fugit::HertzU32;
}
