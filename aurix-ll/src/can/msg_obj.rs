//! Message objects, the slots of the controller's message RAM
//!
//! Every object is one 32 byte register slot holding identifier, mask,
//! payload and control state. The `MOCTR` write protocol is strictly
//! set-xor-reset: bit `n` resets flag `n`, bit `n + 16` sets it, and a
//! single write never does both for the same flag.

use super::message::Message;
use super::regs::{self, MoFcr, MoFgpr, MoIpr, MoStat, MsgObjRegisterBlock};
use aurix_ll_core::CanId;
use core::convert::Infallible;
use core::marker::PhantomData;
use embedded_can::{Frame, Id, StandardId};

/// Index of a message object inside the module
pub type MsgObjId = u8;

/// Flags of the message object control/status machinery
///
/// The discriminant is the reset bit position in `MOCTR`; the matching set
/// bit lives 16 positions higher.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusFlag {
    /// Receive pending
    RxPending = 0,
    /// Transmit pending
    TxPending = 1,
    /// Receive updating
    RxUpdating = 2,
    /// New data
    NewData = 3,
    /// Message lost
    MessageLost = 4,
    /// Message valid
    MessageValid = 5,
    /// Receive/transmit selected
    RtSelected = 6,
    /// Receive enable
    RxEnable = 7,
    /// Transmit request
    TxRequest = 8,
    /// Transmit enable 0
    TxEnable0 = 9,
    /// Transmit enable 1
    TxEnable1 = 10,
    /// Message direction
    Direction = 11,
}

pub(crate) fn set_mask(flag: StatusFlag) -> u32 {
    1 << (flag as u32 + 16)
}

pub(crate) fn reset_mask(flag: StatusFlag) -> u32 {
    1 << (flag as u32)
}

/// Transfer direction of a message object
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The object transmits frames
    Transmit,
    /// The object receives frames
    Receive,
}

/// Message mode of an object, the `MOFCR.MMC` encoding
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum MessageMode {
    Standard = 0,
    ReceiveFifoBase = 1,
    TransmitFifoBase = 2,
    FifoSlave = 3,
}

/// Configuration of one message object
#[derive(Copy, Clone)]
pub struct MsgObjConfig {
    /// Identifier the object transmits with or matches against
    pub id: Id,
    /// Acceptance mask in identifier units, ones are relevant bits
    pub acceptance_mask: u32,
    /// Require the IDE bit to match the identifier type
    pub matching_id: bool,
    /// Transfer direction
    pub direction: Direction,
    /// Data length code preset for transmit objects
    pub dlc: u8,
    /// Number of objects in the FIFO; 1 means a single object
    pub fifo_slots: u8,
    /// Interrupt node a reception is signalled on, `None` keeps interrupts
    /// off
    pub rx_interrupt_node: Option<u8>,
}

impl MsgObjConfig {
    /// Transmit object with a standard identifier, lowest priority by
    /// default
    pub fn transmit() -> Self {
        Self {
            id: Id::Standard(StandardId::MAX),
            acceptance_mask: 0x7FFF_FFFF,
            matching_id: true,
            direction: Direction::Transmit,
            dlc: 8,
            fifo_slots: 1,
            rx_interrupt_node: None,
        }
    }

    /// Receive object matching exactly `id`
    pub fn receive(id: Id) -> Self {
        Self {
            id,
            direction: Direction::Receive,
            ..Self::transmit()
        }
    }
}

/// Result of a successful read from a message object
#[derive(Copy, Clone, Debug)]
pub struct Received {
    /// The frame read from the object
    pub message: Message,
    /// Reception bookkeeping the hardware reported alongside
    pub status: ReadStatus,
}

/// Loss bookkeeping of a read
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// The frame was read without interference
    Fresh,
    /// The object was updated during the read; the returned frame is the
    /// newer one and one frame was lost
    OneLost,
    /// The hardware flagged a lost frame before the read
    Lost,
}

/// Handle to one message object of the peripheral identified by `Id`
///
/// Handles are created by [`Can::setup_msg_obj`] which guarantees panel
/// allocation; keeping two handles to the same object index aliases the
/// hardware state machine and is not supported.
///
/// [`Can::setup_msg_obj`]: super::Can::setup_msg_obj
pub struct MsgObj<Id> {
    index: MsgObjId,
    _marker: PhantomData<Id>,
}

impl<Id: CanId> MsgObj<Id> {
    pub(crate) fn new(index: MsgObjId) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Index of this object inside the module
    pub fn index(&self) -> MsgObjId {
        self.index
    }

    pub(crate) fn regs(&self) -> &MsgObjRegisterBlock {
        // Safety: `CanId::ADDRESS` points to a valid register file and the
        // object index is range checked at allocation.
        unsafe { &(*regs::register_block::<Id>()).msg_objs[usize::from(self.index)] }
    }

    /// Snapshot of the object status
    pub fn status(&self) -> MoStat {
        MoStat(self.regs().ctr.get())
    }

    /// Set a single control flag
    pub fn set_flag(&mut self, flag: StatusFlag) {
        self.regs().ctr.set(set_mask(flag));
    }

    /// Clear a single control flag
    pub fn clear_flag(&mut self, flag: StatusFlag) {
        self.regs().ctr.set(reset_mask(flag));
    }

    /// `true` while a received frame waits in the object
    pub fn is_rx_pending(&self) -> bool {
        let stat = self.status();
        stat.rxpnd() && stat.newdat()
    }

    /// `true` while a transmission has not left the object
    pub fn is_tx_pending(&self) -> bool {
        let stat = self.status();
        stat.txpnd() && stat.txrq()
    }

    /// Apply a configuration; the object must be allocated to a node list
    pub(crate) fn configure(&mut self, config: &MsgObjConfig) {
        // Invalidate while identifier and mode change
        self.clear_flag(StatusFlag::MessageValid);

        let mut fcr = MoFcr(0);
        fcr.set_mmc(if config.fifo_slots > 1 {
            match config.direction {
                Direction::Transmit => MessageMode::TransmitFifoBase as u8,
                Direction::Receive => MessageMode::ReceiveFifoBase as u8,
            }
        } else {
            MessageMode::Standard as u8
        });
        fcr.set_dlc(config.dlc.min(8));
        fcr.set_rxie(config.rx_interrupt_node.is_some());
        self.regs().fcr.set(fcr.0);

        let mut ipr = MoIpr(0);
        if let Some(node) = config.rx_interrupt_node {
            ipr.set_rxinp(node);
        }
        ipr.set_mpn(self.index);
        self.regs().ipr.set(ipr.0);

        let base = self.index;
        let mut fgpr = MoFgpr(0);
        fgpr.set_bot(base);
        fgpr.set_top(base + (config.fifo_slots.max(1) - 1));
        fgpr.set_cur(base);
        self.regs().fgpr.set(fgpr.0);

        self.set_filter(config.id, config.acceptance_mask, config.matching_id);

        match config.direction {
            Direction::Transmit => {
                self.set_flag(StatusFlag::Direction);
                self.set_flag(StatusFlag::TxEnable0);
                self.set_flag(StatusFlag::TxEnable1);
            }
            Direction::Receive => {
                self.clear_flag(StatusFlag::Direction);
                self.set_flag(StatusFlag::RxEnable);
            }
        }
        self.set_flag(StatusFlag::MessageValid);
    }

    /// Program identifier and acceptance mask
    ///
    /// The object is invalidated for the duration of the update and
    /// revalidated afterwards, so the hardware never matches against a half
    /// written filter.
    pub fn set_filter(&mut self, id: embedded_can::Id, acceptance_mask: u32, matching_id: bool) {
        self.clear_flag(StatusFlag::MessageValid);

        // A standard identifier and its mask live in the upper bits of the
        // 29 bit field.
        let (raw, ide, mask) = match id {
            embedded_can::Id::Standard(id) => (
                u32::from(id.as_raw()) << regs::AR_STANDARD_SHIFT,
                0,
                acceptance_mask << regs::AR_STANDARD_SHIFT,
            ),
            embedded_can::Id::Extended(id) => (id.as_raw(), regs::AR_IDE, acceptance_mask),
        };
        let mask_ide = if matching_id { regs::AR_IDE } else { 0 };
        self.regs().amr.set((mask & 0x1FFF_FFFF) | mask_ide);
        self.regs().ar.set(raw | ide);

        self.set_flag(StatusFlag::MessageValid);
    }

    /// Queue a frame for transmission
    ///
    /// Fails with [`nb::Error::WouldBlock`] while the previous frame has not
    /// been fetched, e.g. due to a busy bus or bus-off.
    pub fn send(&mut self, message: &Message) -> nb::Result<(), Infallible> {
        if self.status().txrq() {
            return Err(nb::Error::WouldBlock);
        }

        self.clear_flag(StatusFlag::MessageValid);

        self.regs().datal.set(message.data_low());
        self.regs().datah.set(message.data_high());

        let ide = if message.is_extended() {
            regs::AR_IDE
        } else {
            0
        };
        self.regs().ar.set(message.raw_id() | ide);

        let mut fcr = MoFcr(self.regs().fcr.get());
        fcr.set_dlc(message.dlc() as u8);
        self.regs().fcr.set(fcr.0);

        self.set_flag(StatusFlag::NewData);
        self.set_flag(StatusFlag::MessageValid);
        self.set_flag(StatusFlag::TxRequest);
        Ok(())
    }

    /// Take a frame out of transmission again
    ///
    /// Returns `true` if a queued frame was withdrawn.
    pub fn cancel_send(&mut self) -> bool {
        let stat = self.status();
        if stat.txrq() && stat.newdat() {
            self.clear_flag(StatusFlag::RtSelected);
            true
        } else {
            false
        }
    }

    /// Read the pending frame out of the object
    ///
    /// Fails with [`nb::Error::WouldBlock`] while no new data is pending.
    /// Concurrent hardware updates are detected and reported through
    /// [`ReadStatus`] rather than retried forever: if new data arrived while
    /// copying, the read is repeated once on the assumption that the CPU
    /// outpaces the bus.
    pub fn receive(&mut self) -> nb::Result<Received, Infallible> {
        if !self.status().newdat() {
            return Err(nb::Error::WouldBlock);
        }

        let message = self.read_message();
        let stat = self.status();
        let (message, status) = if stat.rxupd() {
            (message, ReadStatus::Lost)
        } else if stat.newdat() {
            // updated right at the end of the previous read
            (self.read_message(), ReadStatus::OneLost)
        } else if stat.msglst() {
            self.clear_flag(StatusFlag::MessageLost);
            (message, ReadStatus::Lost)
        } else {
            (message, ReadStatus::Fresh)
        };
        Ok(Received { message, status })
    }

    fn read_message(&mut self) -> Message {
        self.clear_flag(StatusFlag::NewData);

        let data = [self.regs().datal.get(), self.regs().datah.get()];
        let fcr = MoFcr(self.regs().fcr.get());
        let ar = self.regs().ar.get();
        let id = if ar & regs::AR_IDE != 0 {
            // Safety: masked to 29 bits
            embedded_can::Id::Extended(unsafe {
                embedded_can::ExtendedId::new_unchecked(ar & 0x1FFF_FFFF)
            })
        } else {
            // Safety: masked to 11 bits
            embedded_can::Id::Standard(unsafe {
                embedded_can::StandardId::new_unchecked(
                    ((ar >> regs::AR_STANDARD_SHIFT) & 0x7FF) as u16,
                )
            })
        };
        Message::from_raw(id, data, fcr.dlc(), false)
    }

    /// Reset the object registers to their cleared state
    ///
    /// The caller is expected to return the object to the free list through
    /// the panel afterwards.
    pub(crate) fn reset_registers(&mut self) {
        // Control word first, so the object is invalid while being wiped
        self.regs().ctr.set(0x0000_FFFF);
        self.regs().fcr.set(0);
        self.regs().fgpr.set(0);
        self.regs().ipr.set(0);
        self.regs().amr.set(0x3FFF_FFFF);
        self.regs().datal.set(0);
        self.regs().datah.set(0);
        self.regs().ar.set(0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_and_reset_masks_never_overlap() {
        for flag in [
            StatusFlag::RxPending,
            StatusFlag::TxPending,
            StatusFlag::RxUpdating,
            StatusFlag::NewData,
            StatusFlag::MessageLost,
            StatusFlag::MessageValid,
            StatusFlag::RtSelected,
            StatusFlag::RxEnable,
            StatusFlag::TxRequest,
            StatusFlag::TxEnable0,
            StatusFlag::TxEnable1,
            StatusFlag::Direction,
        ] {
            assert_eq!(set_mask(flag) & reset_mask(flag), 0);
            assert_eq!(set_mask(flag), reset_mask(flag) << 16);
        }
    }

    #[test]
    fn status_flags_match_the_stat_layout() {
        let stat = MoStat(reset_mask(StatusFlag::NewData) | reset_mask(StatusFlag::TxRequest));
        assert!(stat.newdat());
        assert!(stat.txrq());
        assert!(!stat.msgval());
    }
}
