//! DMA channel control
//!
//! Only the move-engine channel interface is modelled: address and count
//! setup, software-requested transactions and the per-channel interrupt
//! flag. Linked lists and the double-buffering modes are not used by this
//! project.

use aurix_ll_core::{DmaId, Dependencies};
use core::marker::PhantomData;
use vcell::VolatileCell;

/// Number of channels in the move engine
pub const CHANNEL_COUNT: usize = 16;

/// Per-channel register layout, one 32 byte block per channel
#[repr(C)]
pub struct ChannelRegisterBlock {
    /// Read data CRC (0x00)
    pub rdcrcr: VolatileCell<u32>,
    /// Source and destination address CRC (0x04)
    pub sdcrcr: VolatileCell<u32>,
    /// Source address (0x08)
    pub sadr: VolatileCell<u32>,
    /// Destination address (0x0C)
    pub dadr: VolatileCell<u32>,
    /// Address and interrupt control (0x10)
    pub adicr: VolatileCell<u32>,
    /// Channel configuration (0x14)
    pub chcfgr: VolatileCell<u32>,
    /// Shadow address (0x18)
    pub shadr: VolatileCell<u32>,
    /// Channel control and status (0x1C)
    pub chcsr: VolatileCell<u32>,
}

/// DMA register layout, channels only
#[repr(C)]
pub struct RegisterBlock {
    /// Clock control (0x0000)
    pub clc: VolatileCell<u32>,
    _reserved0: [u32; 2047],
    /// Channel register blocks (0x2000)
    pub channels: [ChannelRegisterBlock; CHANNEL_COUNT],
}

bitfield::bitfield! {
    /// Channel configuration view
    #[derive(Copy, Clone)]
    pub struct Chcfgr(u32);
    impl Debug;
    /// Transfer reload value, moves per transaction
    pub u16, trel, set_trel: 13, 0;
    /// Block mode, moves per transfer
    pub u8, blkm, set_blkm: 18, 16;
    /// Reset request only, 1 = single transaction per request
    pub rroat, set_rroat: 19;
    /// Channel operation mode, 1 = continuous
    pub chmode, set_chmode: 20;
    /// Channel data width
    pub u8, chdw, set_chdw: 23, 21;
    /// Pattern detection
    pub u8, pattsel, set_pattsel: 27, 24;
    /// Peripheral request select
    pub peral, set_peral: 28;
}

bitfield::bitfield! {
    /// Channel control and status view
    #[derive(Copy, Clone)]
    pub struct Chcsr(u32);
    impl Debug;
    /// Remaining moves of the running transaction
    pub u16, tcount, _: 13, 0;
    /// Old value of the pattern comparison
    pub lxo, _: 15;
    /// Wrap source buffer flag
    pub wrps, _: 16;
    /// Wrap destination buffer flag
    pub wrpd, _: 17;
    /// Interrupt from channel
    pub ich, _: 18;
    /// Interrupt pending mask
    pub ipm, _: 19;
    /// Set transaction request, software-requested start
    pub sch, set_sch: 26;
    /// Clear interrupt from channel
    pub cich, set_cich: 27;
    /// Channel frozen
    pub frozen, _: 30;
}

/// Transfer width of one move
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveSize {
    /// 8 bit moves
    Byte = 0,
    /// 16 bit moves
    HalfWord = 1,
    /// 32 bit moves
    Word = 2,
    /// 64 bit moves
    DoubleWord = 3,
}

/// Configuration of one channel transaction
#[derive(Copy, Clone)]
pub struct ChannelConfig {
    /// Source address of the first move
    pub source: u32,
    /// Destination address of the first move
    pub destination: u32,
    /// Number of moves per transaction
    pub transfer_count: u16,
    /// Width of each move
    pub move_size: MoveSize,
    /// Restart the transaction automatically on each request
    pub continuous: bool,
}

/// DMA module driver for the peripheral identified by `Id`
pub struct Dma<Id, D> {
    dependencies: D,
    _marker: PhantomData<Id>,
}

impl<Id: DmaId, D: Dependencies<Id>> Dma<Id, D> {
    /// Enable the module
    pub fn new(dependencies: D) -> Self {
        let dma = Self {
            dependencies,
            _marker: PhantomData,
        };
        dma.regs().clc.set(0);
        dma
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `DmaId::ADDRESS` points to a valid register file.
        unsafe { &*(Id::ADDRESS as *const RegisterBlock) }
    }

    /// Handle to one channel
    ///
    /// One handle per channel; two handles to the same index alias the
    /// hardware state machine and are not supported.
    pub fn channel(&mut self, index: u8) -> Channel<Id> {
        Channel {
            index: index % CHANNEL_COUNT as u8,
            _marker: PhantomData,
        }
    }

    /// Release the driver and hand back the dependencies
    pub fn release(self) -> D {
        self.dependencies
    }
}

/// Handle to one DMA channel of the peripheral identified by `Id`
pub struct Channel<Id> {
    index: u8,
    _marker: PhantomData<Id>,
}

impl<Id: DmaId> Channel<Id> {
    fn regs(&self) -> &ChannelRegisterBlock {
        // Safety: `DmaId::ADDRESS` points to a valid register file and the
        // index is wrapped into range at construction.
        unsafe { &(*(Id::ADDRESS as *const RegisterBlock)).channels[usize::from(self.index)] }
    }

    /// Apply a transaction configuration
    pub fn init(&mut self, config: &ChannelConfig) {
        self.regs().sadr.set(config.source);
        self.regs().dadr.set(config.destination);

        let mut chcfgr = Chcfgr(0);
        chcfgr.set_trel(config.transfer_count);
        chcfgr.set_chdw(config.move_size as u8);
        chcfgr.set_chmode(config.continuous);
        chcfgr.set_rroat(!config.continuous);
        self.regs().chcfgr.set(chcfgr.0);

        self.regs().adicr.set(0);
    }

    /// Source address of the next move
    pub fn set_source_address(&mut self, address: u32) {
        self.regs().sadr.set(address);
    }

    /// Destination address of the next move
    pub fn set_destination_address(&mut self, address: u32) {
        self.regs().dadr.set(address);
    }

    /// Number of moves per transaction
    pub fn set_transfer_count(&mut self, count: u16) {
        let mut chcfgr = Chcfgr(self.regs().chcfgr.get());
        chcfgr.set_trel(count);
        self.regs().chcfgr.set(chcfgr.0);
    }

    /// Request a transaction from software
    pub fn start_transaction(&mut self) {
        let mut chcsr = Chcsr(0);
        chcsr.set_sch(true);
        self.regs().chcsr.set(chcsr.0);
    }

    /// `true` while moves of the current transaction remain
    pub fn is_transaction_pending(&self) -> bool {
        Chcsr(self.regs().chcsr.get()).tcount() > 0
    }

    /// `true` if the channel raised its interrupt
    pub fn has_interrupt(&self) -> bool {
        Chcsr(self.regs().chcsr.get()).ich()
    }

    /// Acknowledge the channel interrupt
    pub fn clear_interrupt(&mut self) {
        let mut chcsr = Chcsr(0);
        chcsr.set_cich(true);
        self.regs().chcsr.set(chcsr.0);
    }

    /// Read and acknowledge the channel interrupt in one go
    pub fn take_interrupt(&mut self) -> bool {
        let pending = self.has_interrupt();
        if pending {
            self.clear_interrupt();
        }
        pending
    }
}
