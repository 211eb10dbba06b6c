//! MultiCAN module driver
//!
//! The module hosts up to four protocol nodes and a pool of message objects
//! wired to nodes through hardware-managed lists. List membership is only
//! changed through the command panel; everything else is per-node or
//! per-object state handled by [`Node`] and [`MsgObj`].
//!
//! ```no_run
//! # pub enum Can0 {}
//! # unsafe impl aurix_ll_core::CanId for Can0 {
//! #     const ADDRESS: *const () = 0xF001_8000 as *const _;
//! # }
//! # struct Deps;
//! # unsafe impl aurix_ll_core::Dependencies<Can0> for Deps {
//! #     fn host_clock(&self) -> fugit::HertzU32 { unreachable!() }
//! #     fn module_clock(&self) -> fugit::HertzU32 { unreachable!() }
//! # }
//! # let dependencies = Deps;
//! use aurix_ll::can::{Can, NodeConfig, NodeId, MsgObjConfig};
//! use aurix_ll::can::message::Message;
//! use fugit::RateExtU32 as _;
//!
//! let mut can = Can::<Can0, _>::new(dependencies);
//! let mut node = can.node(NodeId::Node0);
//! node.init(&NodeConfig::new(500.kHz()), can.module_frequency()).unwrap();
//!
//! let mut tx = can
//!     .setup_msg_obj(0, NodeId::Node0, &MsgObjConfig::transmit())
//!     .unwrap();
//! node.activate();
//!
//! let frame = Message::standard(0x100, &[1, 2, 3, 4]).unwrap();
//! nb::block!(tx.send(&frame)).unwrap();
//! ```

pub mod config;
pub mod message;
pub mod msg_obj;
pub mod node;
pub mod regs;

pub use config::{BitTiming, BitTimingError, NodeTiming};
pub use msg_obj::{Direction, MsgObj, MsgObjConfig, MsgObjId, ReadStatus, Received, StatusFlag};
pub use node::{BusOffRecovery, Node, NodeConfig, NodeId};

use aurix_ll_core::{CanId, Dependencies};
use fugit::HertzU32;
use msg_obj::MessageMode;
use regs::{Fdr, MoFcr, Panctr};

/// Commands understood by the list command panel
#[derive(Copy, Clone, Debug)]
#[repr(u8)]
enum PanelCommand {
    /// Re-initialize all lists
    InitializeLists = 0x01,
    /// Move an object to the end of a list
    StaticAllocate = 0x02,
}

/// Errors of the module-level object management
#[derive(Debug)]
pub enum AllocationError {
    /// The object index is outside the message RAM
    InvalidObject(MsgObjId),
    /// A FIFO would run past the end of the message RAM
    FifoOutOfRange(MsgObjId, u8),
}

/// MultiCAN module driver for the peripheral identified by `Id`
pub struct Can<Id, D> {
    regs: regs::Can<Id>,
    dependencies: D,
}

impl<Id: CanId, D: Dependencies<Id>> Can<Id, D> {
    /// Enable the module and initialize the list machinery
    ///
    /// The fractional divider is set to pass the module clock through
    /// undivided; [`Self::set_clock_divider`] narrows it down later if
    /// needed.
    pub fn new(dependencies: D) -> Self {
        // Safety: `dependencies` implies ownership of the register file
        // pointed to by `Id: CanId`, so `regs` has unique access to it.
        let regs = unsafe { regs::Can::<Id>::new() };

        // Request the module clock; DISS clears once it is running.
        regs.clc.set(0);
        while regs.clc.get() & (1 << 1) != 0 {}

        let mut fdr = Fdr(0);
        fdr.set_dm(1);
        fdr.set_step(1023);
        regs.fdr.set(fdr.0);

        let mut can = Self { regs, dependencies };
        can.panel_command(PanelCommand::InitializeLists, 0, 0);
        can
    }

    /// Clock the message handling with `module_clock / divider`
    pub fn set_clock_divider(&mut self, divider: u16) {
        let mut fdr = Fdr(0);
        fdr.set_dm(1);
        fdr.set_step(1024 - divider.clamp(1, 1024));
        self.regs.fdr.set(fdr.0);
    }

    /// Effective frequency of the message handling clock
    pub fn module_frequency(&self) -> HertzU32 {
        let fdr = Fdr(self.regs.fdr.get());
        let divider = u32::from(1024 - fdr.step().min(1023));
        HertzU32::from_raw(self.dependencies.module_clock().to_Hz() / divider)
    }

    /// Handle to a protocol node
    ///
    /// One handle per node; see [`Node`] for the aliasing rules.
    pub fn node(&mut self, id: NodeId) -> Node<Id> {
        Node::new(id)
    }

    /// Allocate a message object to a node and configure it
    ///
    /// For `fifo_slots > 1` the follow-up objects are allocated to the same
    /// node and chained as FIFO slaves of the base, mirroring the layout the
    /// hardware expects for a transmit or receive FIFO.
    pub fn setup_msg_obj(
        &mut self,
        index: MsgObjId,
        node: NodeId,
        config: &MsgObjConfig,
    ) -> Result<MsgObj<Id>, AllocationError> {
        let count = regs::MSG_OBJ_COUNT as u16;
        if u16::from(index) >= count {
            return Err(AllocationError::InvalidObject(index));
        }
        let slots = config.fifo_slots.max(1);
        if u16::from(index) + u16::from(slots) > count {
            return Err(AllocationError::FifoOutOfRange(index, slots));
        }

        // Node lists start after the list of unallocated objects.
        let list = node as u8 + 1;
        for slave in u16::from(index)..u16::from(index) + u16::from(slots) {
            self.panel_command(PanelCommand::StaticAllocate, slave as u8, list);
        }

        let mut obj = MsgObj::new(index);
        obj.configure(config);

        for slave in u16::from(index) + 1..u16::from(index) + u16::from(slots) {
            let mut slave = MsgObj::<Id>::new(slave as u8);
            let mut fcr = MoFcr(0);
            fcr.set_mmc(MessageMode::FifoSlave as u8);
            slave.regs().fcr.set(fcr.0);
            match config.direction {
                Direction::Transmit => slave.set_flag(StatusFlag::Direction),
                Direction::Receive => slave.clear_flag(StatusFlag::Direction),
            }
            slave.set_flag(StatusFlag::MessageValid);
        }

        Ok(obj)
    }

    /// Wipe an object and return it to the list of unallocated objects
    pub fn release_msg_obj(&mut self, mut obj: MsgObj<Id>) {
        self.panel_command(PanelCommand::StaticAllocate, obj.index(), 0);
        obj.reset_registers();
    }

    /// Oldest message object with a pending notification in `group`
    ///
    /// Clears the pending bit of the returned object, as the interrupt
    /// handlers of the hardware reference flow expect.
    pub fn pending_message(&self, group: usize) -> Option<MsgObjId> {
        let index = self.regs.msid[group % regs::PENDING_GROUP_COUNT].get();
        if index == 0x20 {
            return None;
        }
        self.regs.mspnd[group % regs::PENDING_GROUP_COUNT].set(!(1 << index));
        Some((index as u8) + (group as u8) * 32)
    }

    /// Issue a panel command and wait for the panel to settle
    fn panel_command(&mut self, command: PanelCommand, arg1: u8, arg2: u8) {
        let mut panctr = Panctr(0);
        panctr.set_pancmd(command as u8);
        panctr.set_panar1(arg1);
        panctr.set_panar2(arg2);
        self.regs.panctr.set(panctr.0);
        self.wait_panel_ready();
    }

    fn wait_panel_ready(&self) {
        while {
            let panctr = Panctr(self.regs.panctr.get());
            panctr.busy() || panctr.rbusy()
        } {}
    }

    /// Reset the module kernel
    ///
    /// A reset is only executed once both kernel reset bits are set; the
    /// status bit is cleared again afterwards.
    pub fn reset(&mut self) {
        self.regs.krst0.set(1);
        self.regs.krst1.set(1);
        while self.regs.krst0.get() & (1 << 1) == 0 {}
        self.regs.krstclr.set(1);

        self.panel_command(PanelCommand::InitializeLists, 0, 0);
    }

    /// Release the driver and hand back the dependencies
    pub fn release(self) -> D {
        self.dependencies
    }
}
