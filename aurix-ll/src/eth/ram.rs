//! Statically allocated memory shared between the CPU and the Ethernet DMA
//! engine.

use super::descriptor::{Buffer, RxDescriptor, TxDescriptor};
use core::mem::MaybeUninit;
use generic_array::{ArrayLength, GenericArray};

/// Ring capacities
///
/// Select the number of descriptors (and therefore frame buffers) per
/// direction by implementing this trait on a marker type.
pub trait Capacities {
    /// Number of transmit descriptors and buffers
    type TxRing: ArrayLength<TxDescriptor> + ArrayLength<Buffer>;
    /// Number of receive descriptors and buffers
    type RxRing: ArrayLength<RxDescriptor> + ArrayLength<Buffer>;
}

#[repr(C)]
pub(super) struct DescriptorMemoryInner<C: Capacities> {
    pub(super) tx_descriptors: GenericArray<TxDescriptor, C::TxRing>,
    pub(super) rx_descriptors: GenericArray<RxDescriptor, C::RxRing>,
    pub(super) tx_buffers: GenericArray<Buffer, C::TxRing>,
    pub(super) rx_buffers: GenericArray<Buffer, C::RxRing>,
}

/// Memory shared between the CPU and the DMA engine. Provide a struct `C`
/// that implements [`Capacities`] to select the ring sizes, then construct
/// this using `DescriptorMemory::<C>::new()`.
///
/// The DMA engine addresses this memory by the pointers written into the
/// descriptors at initialization, so the memory must not move afterwards.
pub struct DescriptorMemory<C: Capacities>(MaybeUninit<DescriptorMemoryInner<C>>);

impl<C: Capacities> DescriptorMemory<C> {
    pub(super) fn init(&mut self) -> &mut DescriptorMemoryInner<C> {
        self.0 = MaybeUninit::zeroed();
        // Safety: all bits 0 is a valid value for descriptors and buffers.
        unsafe { self.0.assume_init_mut() }
    }

    /// All initialization is handled by the driver that uses the memory, so
    /// this type can safely be assigned to a link_section that is not
    /// initialized by the startup code to control its position in memory.
    pub const fn new() -> Self {
        Self(MaybeUninit::uninit())
    }
}

impl<C: Capacities> Default for DescriptorMemory<C> {
    fn default() -> Self {
        Self::new()
    }
}
