//! Transmit and receive descriptor ring management
//!
//! Each ring is a fixed array of descriptors wired into a circular chain at
//! initialization. Exactly one descriptor per direction is *current*; the
//! ownership bit of the current descriptor is the only synchronization
//! between software and the DMA engine. Software only ever touches a
//! descriptor whose ownership bit is cleared.

use super::descriptor::{Buffer, ChecksumMode, RxDescriptor, TxDescriptor, BUFFER_SIZE};
use super::ram::Capacities;
use super::regs::{self, RegisterBlock, Status};
use aurix_ll_core::EthId;
use core::convert::Infallible;
use core::marker::PhantomData;
use generic_array::GenericArray;

/// The requested frame does not fit into one DMA buffer
#[derive(Debug)]
pub struct FrameTooLong;

/// Transmit descriptor ring of the peripheral identified by `Id`
pub struct TxRing<'a, Id, C: Capacities> {
    descriptors: &'a GenericArray<TxDescriptor, C::TxRing>,
    buffers: &'a mut GenericArray<Buffer, C::TxRing>,
    index: usize,
    frames_transmitted: u32,
    _marker: PhantomData<Id>,
}

impl<'a, Id: EthId, C: Capacities> TxRing<'a, Id, C> {
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `Id`.
    /// The constructed type assumes ownership of the following registers;
    /// do not use them elsewhere to avoid aliasing and do not keep multiple
    /// instances for the same peripheral.
    /// - TRANSMIT_POLL_DEMAND
    /// - the transmit bits of STATUS
    pub(crate) unsafe fn new(
        descriptors: &'a GenericArray<TxDescriptor, C::TxRing>,
        buffers: &'a mut GenericArray<Buffer, C::TxRing>,
    ) -> Self {
        let mut ring = Self {
            descriptors,
            buffers,
            index: 0,
            frames_transmitted: 0,
            _marker: PhantomData,
        };
        ring.link();
        ring
    }

    /// Wire the descriptors into a circular chain and reset the cursor
    fn link(&mut self) {
        let first = &self.descriptors[0] as *const TxDescriptor;
        let count = self.descriptors.len();
        for (i, descriptor) in self.descriptors.iter().enumerate() {
            let next = if i + 1 < count {
                &self.descriptors[i + 1] as *const TxDescriptor
            } else {
                first
            };
            descriptor.init_chained(next);
            descriptor.set_buffer(self.buffers[i].as_ptr());
        }
        self.descriptors[count - 1].mark_ring_end();
        self.index = 0;
    }

    /// Re-initialize the ring, dropping frames the engine has not fetched
    ///
    /// The descriptor list base address must be rewritten afterwards; the
    /// driver does this in [`restart_transmitter`].
    ///
    /// [`restart_transmitter`]: super::Eth::restart_transmitter
    pub(crate) fn reset(&mut self) {
        self.link();
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: the ring owns the registers listed in `new`.
        unsafe { &*regs::register_block::<Id>() }
    }

    /// Address of the first descriptor, for the descriptor list register
    pub(crate) fn base_address(&self) -> u32 {
        self.descriptors.as_ptr() as usize as u32
    }

    fn current(&self) -> &TxDescriptor {
        &self.descriptors[self.index]
    }

    /// Number of descriptors in the ring
    pub fn capacity(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of frames handed to the engine since initialization
    pub fn frames_transmitted(&self) -> u32 {
        self.frames_transmitted
    }

    /// `true` if the current descriptor is free for setup
    pub fn is_available(&self) -> bool {
        self.current().is_available()
    }

    /// Access the buffer of the current descriptor
    ///
    /// Fails with [`nb::Error::WouldBlock`] while the engine still owns the
    /// descriptor. The data placed here is sent with [`Self::send`].
    pub fn buffer(&mut self) -> nb::Result<&mut [u8], Infallible> {
        if self.current().is_available() {
            Ok(&mut self.buffers[self.index][..])
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Full buffer of the current descriptor without an availability check
    #[cfg(feature = "smoltcp")]
    pub(crate) fn slot(&mut self) -> &mut [u8] {
        &mut self.buffers[self.index][..]
    }

    /// Request transmission of the first `len` bytes of the current buffer
    ///
    /// Releases the current descriptor to the engine, wakes a suspended
    /// transmitter and moves the cursor to the next descriptor.
    pub fn send(&mut self, len: usize) -> nb::Result<(), FrameTooLong> {
        if len > BUFFER_SIZE {
            return Err(nb::Error::Other(FrameTooLong));
        }
        if !self.current().is_available() {
            return Err(nb::Error::WouldBlock);
        }
        self.current().submit(len as u16);
        self.wake_transmitter();
        self.index = (self.index + 1) % self.capacity();
        self.frames_transmitted = self.frames_transmitted.wrapping_add(1);
        Ok(())
    }

    /// Resume a transmitter that ran dry before the descriptor was released
    fn wake_transmitter(&self) {
        let status = Status(self.regs().status.get());
        if status.ts() == Status::TS_SUSPENDED {
            if status.tu() {
                let mut clear = Status(0);
                clear.set_tu(true);
                clear.set_unf(true);
                self.regs().status.set(clear.0);
            }
            self.regs().transmit_poll_demand.set(1);
        }
    }

    pub(crate) fn set_checksum_insertion(&mut self, mode: ChecksumMode) {
        for descriptor in self.descriptors.iter() {
            descriptor.set_checksum_insertion(mode);
        }
    }
}

/// Receive descriptor ring of the peripheral identified by `Id`
pub struct RxRing<'a, Id, C: Capacities> {
    descriptors: &'a GenericArray<RxDescriptor, C::RxRing>,
    buffers: &'a GenericArray<Buffer, C::RxRing>,
    index: usize,
    frames_received: u32,
    _marker: PhantomData<Id>,
}

impl<'a, Id: EthId, C: Capacities> RxRing<'a, Id, C> {
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `Id`.
    /// The constructed type assumes ownership of the following registers;
    /// do not use them elsewhere to avoid aliasing and do not keep multiple
    /// instances for the same peripheral.
    /// - RECEIVE_POLL_DEMAND
    /// - the receive bits of STATUS
    pub(crate) unsafe fn new(
        descriptors: &'a GenericArray<RxDescriptor, C::RxRing>,
        buffers: &'a GenericArray<Buffer, C::RxRing>,
    ) -> Self {
        let first = &descriptors[0] as *const RxDescriptor;
        let count = descriptors.len();
        for (i, descriptor) in descriptors.iter().enumerate() {
            let next = if i + 1 < count {
                &descriptors[i + 1] as *const RxDescriptor
            } else {
                first
            };
            descriptor.set_buffer(buffers[i].as_ptr());
            descriptor.init_chained(next);
        }
        descriptors[count - 1].mark_ring_end();
        Self {
            descriptors,
            buffers,
            index: 0,
            frames_received: 0,
            _marker: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: the ring owns the registers listed in `new`.
        unsafe { &*regs::register_block::<Id>() }
    }

    /// Address of the first descriptor, for the descriptor list register
    pub(crate) fn base_address(&self) -> u32 {
        self.descriptors.as_ptr() as usize as u32
    }

    fn current(&self) -> &RxDescriptor {
        &self.descriptors[self.index]
    }

    /// Number of descriptors in the ring
    pub fn capacity(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of frames consumed since initialization
    pub fn frames_received(&self) -> u32 {
        self.frames_received
    }

    /// Release descriptors the engine flagged with an error summary
    pub(crate) fn skip_errored(&mut self) {
        while self.current().is_available() && self.current().has_error() {
            self.release_current();
        }
    }

    /// `true` if the current descriptor holds a received frame
    pub fn is_frame_available(&self) -> bool {
        self.current().is_available()
    }

    /// Received data of the current descriptor, empty if there is none
    pub(crate) fn frame(&self) -> &[u8] {
        let descriptor = self.current();
        if descriptor.is_available() && !descriptor.has_error() {
            let len = descriptor.frame_length().min(BUFFER_SIZE);
            &self.buffers[self.index][..len]
        } else {
            &[]
        }
    }

    /// Consume the oldest received frame
    ///
    /// Error frames are released and skipped. The buffer is only valid for
    /// the duration of the closure; afterwards the descriptor goes back to
    /// the engine and a suspended receiver is woken, as the receive path of
    /// the hardware expects.
    pub fn receive<R>(&mut self, f: impl FnOnce(&[u8]) -> R) -> nb::Result<R, Infallible> {
        self.skip_errored();
        if !self.current().is_available() {
            self.wake_receiver();
            return Err(nb::Error::WouldBlock);
        }
        let result = f(self.frame());
        self.count_frame();
        self.release_current();
        self.wake_receiver();
        Ok(result)
    }

    /// Return the current descriptor to the engine and advance the cursor
    pub(crate) fn release_current(&mut self) {
        self.current().release();
        self.index = (self.index + 1) % self.capacity();
    }

    pub(crate) fn count_frame(&mut self) {
        self.frames_received = self.frames_received.wrapping_add(1);
    }

    /// Resume a receiver that ran out of descriptors
    pub(crate) fn wake_receiver(&self) {
        let status = Status(self.regs().status.get());
        if status.rs() == Status::RS_SUSPENDED {
            if status.ru() {
                let mut clear = Status(0);
                clear.set_ru(true);
                self.regs().status.set(clear.0);
            }
            self.regs().receive_poll_demand.set(1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eth::ram::{Capacities, DescriptorMemory};
    use generic_array::typenum::consts::*;

    struct TestCapacities;
    impl Capacities for TestCapacities {
        type TxRing = U4;
        type RxRing = U4;
    }

    enum FakeEth {}
    // Safety: the tests below never dereference the register block.
    unsafe impl EthId for FakeEth {
        const ADDRESS: *const () = 0x5000_0000 as *const ();
    }

    #[test]
    fn tx_ring_is_circularly_chained() {
        let mut memory = DescriptorMemory::<TestCapacities>::new();
        let memory = memory.init();
        let ring = unsafe {
            TxRing::<FakeEth, TestCapacities>::new(&memory.tx_descriptors, &mut memory.tx_buffers)
        };

        for i in 0..ring.capacity() {
            let expected = if i + 1 < ring.capacity() { i + 1 } else { 0 };
            let next = &ring.descriptors[expected] as *const TxDescriptor as usize as u32;
            assert_eq!(ring.descriptors[i].next(), next);
            assert_eq!(
                ring.descriptors[i].buffer() as usize,
                ring.buffers[i].as_ptr() as usize
            );
            assert!(ring.descriptors[i].is_available());
        }
        // Only the last descriptor carries the end-of-ring flag
        const TER: u32 = 0x0020_0000;
        assert_eq!(ring.descriptors[0].word0() & TER, 0);
        assert_ne!(ring.descriptors[3].word0() & TER, 0);
    }

    #[test]
    fn rx_ring_is_owned_by_the_engine_after_init() {
        let mut memory = DescriptorMemory::<TestCapacities>::new();
        let memory = memory.init();
        let ring = unsafe {
            RxRing::<FakeEth, TestCapacities>::new(&memory.rx_descriptors, &memory.rx_buffers)
        };

        for i in 0..ring.capacity() {
            assert!(!ring.descriptors[i].is_available());
            let expected = if i + 1 < ring.capacity() { i + 1 } else { 0 };
            let next = &ring.descriptors[expected] as *const RxDescriptor as usize as u32;
            assert_eq!(ring.descriptors[i].next(), next);
        }
        const RER: u32 = 0x0000_8000;
        assert_eq!(ring.descriptors[0].word1() & RER, 0);
        assert_ne!(ring.descriptors[3].word1() & RER, 0);
        assert!(!ring.is_frame_available());
    }

    #[test]
    fn rx_error_frames_are_skipped() {
        let mut memory = DescriptorMemory::<TestCapacities>::new();
        let memory = memory.init();
        let mut ring = unsafe {
            RxRing::<FakeEth, TestCapacities>::new(&memory.rx_descriptors, &memory.rx_buffers)
        };

        ring.descriptors[0].simulate_writeback(64, true);
        ring.descriptors[1].simulate_writeback(128, false);
        ring.skip_errored();

        assert!(ring.is_frame_available());
        assert_eq!(ring.frame().len(), 128);
        assert_eq!(ring.frames_received(), 0);

        ring.count_frame();
        ring.release_current();
        assert!(!ring.is_frame_available());
        assert_eq!(ring.frames_received(), 1);
    }

    #[test]
    fn tx_buffer_follows_the_cursor() {
        let mut memory = DescriptorMemory::<TestCapacities>::new();
        let memory = memory.init();
        let mut ring = unsafe {
            TxRing::<FakeEth, TestCapacities>::new(&memory.tx_descriptors, &mut memory.tx_buffers)
        };

        assert!(ring.is_available());
        ring.buffer().unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);
        // The cursor has not moved yet; `send` would, but it touches the
        // poll demand register which is not backed by hardware here.
        assert_eq!(ring.index, 0);
        assert_eq!(&ring.buffers[0][..4], &[1, 2, 3, 4]);
    }
}
