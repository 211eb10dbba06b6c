//! MultiCAN register file
//!
//! The module block carries clock control, the list panel and the pending
//! machinery; each node owns a 0x100 byte block and each message object a
//! 32 byte slot of message RAM. `MOCTR` and `MOSTAT` share one offset: a
//! read returns the status, a write drives the set/reset flag protocol.

use aurix_ll_core::CanId;
use core::marker::PhantomData;
use core::ops::Deref;
use vcell::VolatileCell;

/// Number of CAN nodes in the module
pub const NODE_COUNT: usize = 4;
/// Number of message objects in the module
pub const MSG_OBJ_COUNT: usize = 256;
/// Number of message pending groups
pub const PENDING_GROUP_COUNT: usize = 8;

/// MultiCAN register file of the peripheral identified by `Id`
pub struct Can<Id> {
    _id: PhantomData<Id>,
}

impl<Id: CanId> Can<Id> {
    /// # Safety
    /// The caller must have unique access to the peripheral referenced by
    /// `Id`.
    pub(crate) unsafe fn new() -> Self {
        Self { _id: PhantomData }
    }
}

impl<Id: CanId> Deref for Can<Id> {
    type Target = RegisterBlock;

    fn deref(&self) -> &RegisterBlock {
        // Safety: `CanId::ADDRESS` points to a valid register file.
        unsafe { &*register_block::<Id>() }
    }
}

pub(crate) fn register_block<Id: CanId>() -> *const RegisterBlock {
    Id::ADDRESS as *const RegisterBlock
}

/// MultiCAN module register layout
#[repr(C)]
pub struct RegisterBlock {
    /// Clock control (0x0000)
    pub clc: VolatileCell<u32>,
    _reserved0: [u32; 1],
    /// Module identification (0x0008)
    pub id: VolatileCell<u32>,
    /// Fractional divider (0x000C)
    pub fdr: VolatileCell<u32>,
    _reserved1: [u32; 60],
    /// List registers (0x0100)
    pub list: [VolatileCell<u32>; 16],
    /// Message pending registers (0x0140)
    pub mspnd: [VolatileCell<u32>; PENDING_GROUP_COUNT],
    _reserved2: [u32; 8],
    /// Message index registers (0x0180)
    pub msid: [VolatileCell<u32>; PENDING_GROUP_COUNT],
    _reserved3: [u32; 8],
    /// Message index mask (0x01C0)
    pub msimask: VolatileCell<u32>,
    /// Panel control (0x01C4)
    pub panctr: VolatileCell<u32>,
    /// Module control (0x01C8)
    pub mcr: VolatileCell<u32>,
    /// Module interrupt trigger (0x01CC)
    pub mitr: VolatileCell<u32>,
    _reserved4: [u32; 7],
    /// Kernel reset status clear (0x01EC)
    pub krstclr: VolatileCell<u32>,
    /// Kernel reset 1 (0x01F0)
    pub krst1: VolatileCell<u32>,
    /// Kernel reset 0 (0x01F4)
    pub krst0: VolatileCell<u32>,
    _reserved5: [u32; 2],
    /// Node register blocks (0x0200)
    pub nodes: [NodeRegisterBlock; NODE_COUNT],
    _reserved6: [u32; 640],
    /// Message object register blocks (0x1000)
    pub msg_objs: [MsgObjRegisterBlock; MSG_OBJ_COUNT],
}

/// Per-node register layout, one 0x100 byte block per node
#[repr(C)]
pub struct NodeRegisterBlock {
    /// Node control
    pub cr: VolatileCell<u32>,
    /// Node status
    pub sr: VolatileCell<u32>,
    /// Node interrupt pointer
    pub ipr: VolatileCell<u32>,
    /// Node port control
    pub pcr: VolatileCell<u32>,
    /// Node bit timing
    pub btr: VolatileCell<u32>,
    /// Node error counters
    pub ecnt: VolatileCell<u32>,
    /// Node frame counter
    pub fcr: VolatileCell<u32>,
    _reserved: [u32; 57],
}

/// Per-object register layout, one 32 byte slot per message object
#[repr(C)]
pub struct MsgObjRegisterBlock {
    /// Function control
    pub fcr: VolatileCell<u32>,
    /// FIFO/gateway pointers
    pub fgpr: VolatileCell<u32>,
    /// Interrupt pointer
    pub ipr: VolatileCell<u32>,
    /// Acceptance mask
    pub amr: VolatileCell<u32>,
    /// Data low, bytes 0 to 3
    pub datal: VolatileCell<u32>,
    /// Data high, bytes 4 to 7
    pub datah: VolatileCell<u32>,
    /// Arbitration, message identifier
    pub ar: VolatileCell<u32>,
    /// Control on write, status on read
    pub ctr: VolatileCell<u32>,
}

bitfield::bitfield! {
    /// Fractional divider view
    #[derive(Copy, Clone)]
    pub struct Fdr(u32);
    impl Debug;
    /// Step value, the divider is `1024 - STEP` in normal divider mode
    pub u16, step, set_step: 9, 0;
    /// Divider mode, 1 = normal divider
    pub u8, dm, set_dm: 15, 14;
}

bitfield::bitfield! {
    /// Panel control view
    #[derive(Copy, Clone)]
    pub struct Panctr(u32);
    impl Debug;
    /// Panel command
    pub u8, pancmd, set_pancmd: 7, 0;
    /// Panel busy
    pub busy, _: 8;
    /// Result busy
    pub rbusy, _: 9;
    /// Panel argument 1
    pub u8, panar1, set_panar1: 23, 16;
    /// Panel argument 2
    pub u8, panar2, set_panar2: 31, 24;
}

bitfield::bitfield! {
    /// Node control view
    #[derive(Copy, Clone)]
    pub struct NodeControl(u32);
    impl Debug;
    /// Node initialization, 1 = offline
    pub init, set_init: 0;
    /// Transfer interrupt enable
    pub trie, set_trie: 1;
    /// LEC indicated error interrupt enable
    pub lecie, set_lecie: 2;
    /// Alert interrupt enable
    pub alie, set_alie: 3;
    /// CAN disable
    pub candis, set_candis: 4;
    /// Configuration change enable
    pub cce, set_cce: 6;
    /// CAN analyzer mode
    pub calm, set_calm: 7;
    /// Suspend enable
    pub susen, set_susen: 8;
}

bitfield::bitfield! {
    /// Node status view
    #[derive(Copy, Clone)]
    pub struct NodeStatus(u32);
    impl Debug;
    /// Last error code
    pub u8, lec, set_lec: 2, 0;
    /// A frame has been transmitted correctly
    pub txok, set_txok: 3;
    /// A frame has been received correctly
    pub rxok, set_rxok: 4;
    /// Alert warning
    pub alert, set_alert: 5;
    /// Error warning status
    pub ewrn, set_ewrn: 6;
    /// Bus-off status
    pub boff, _: 7;
    /// List length error
    pub lle, set_lle: 8;
    /// List object error
    pub loe, set_loe: 9;
    /// Suspend acknowledge
    pub susack, _: 10;
}

bitfield::bitfield! {
    /// Node error counter view
    #[derive(Copy, Clone)]
    pub struct NodeErrorCounters(u32);
    impl Debug;
    /// Receive error counter
    pub u8, rec, set_rec: 7, 0;
    /// Transmit error counter
    pub u8, tec, set_tec: 15, 8;
    /// Error warning level
    pub u8, ewrnlvl, set_ewrnlvl: 23, 16;
    /// Last error transfer direction
    pub letd, _: 24;
    /// Last error incremental
    pub leinc, _: 25;
}

bitfield::bitfield! {
    /// Node bit timing register view
    #[derive(Copy, Clone)]
    pub struct Nbtr(u32);
    impl Debug;
    /// Baud rate prescaler
    pub u8, brp, set_brp: 5, 0;
    /// (Re)synchronization jump width
    pub u8, sjw, set_sjw: 7, 6;
    /// Time segment before the sample point
    pub u8, tseg1, set_tseg1: 11, 8;
    /// Time segment after the sample point
    pub u8, tseg2, set_tseg2: 14, 12;
    /// Divide prescaler clock by 8
    pub div8, set_div8: 15;
}

bitfield::bitfield! {
    /// Message object function control view
    #[derive(Copy, Clone)]
    pub struct MoFcr(u32);
    impl Debug;
    /// Message mode control
    pub u8, mmc, set_mmc: 3, 0;
    /// Receive interrupt enable
    pub rxie, set_rxie: 16;
    /// Transmit interrupt enable
    pub txie, set_txie: 17;
    /// Overflow interrupt enable
    pub ovie, set_ovie: 18;
    /// Foreign remote request enable
    pub frren, set_frren: 20;
    /// Remote monitoring mode
    pub rmm, set_rmm: 21;
    /// Single data transfer
    pub sdt, set_sdt: 22;
    /// Single transmit trial
    pub stt, set_stt: 23;
    /// Data length code
    pub u8, dlc, set_dlc: 27, 24;
}

bitfield::bitfield! {
    /// Message object FIFO/gateway pointer view
    #[derive(Copy, Clone)]
    pub struct MoFgpr(u32);
    impl Debug;
    /// Bottom pointer
    pub u8, bot, set_bot: 7, 0;
    /// Top pointer
    pub u8, top, set_top: 15, 8;
    /// Current pointer
    pub u8, cur, set_cur: 23, 16;
    /// Object select pointer
    pub u8, sel, set_sel: 31, 24;
}

bitfield::bitfield! {
    /// Message object interrupt pointer view
    #[derive(Copy, Clone)]
    pub struct MoIpr(u32);
    impl Debug;
    /// Receive interrupt node pointer
    pub u8, rxinp, set_rxinp: 3, 0;
    /// Transmit interrupt node pointer
    pub u8, txinp, set_txinp: 7, 4;
    /// Message pending number
    pub u8, mpn, set_mpn: 15, 8;
}

bitfield::bitfield! {
    /// Message object status view, the read shape of `MOCTR`
    #[derive(Copy, Clone)]
    pub struct MoStat(u32);
    impl Debug;
    /// Receive pending
    pub rxpnd, _: 0;
    /// Transmit pending
    pub txpnd, _: 1;
    /// Receive updating
    pub rxupd, _: 2;
    /// New data
    pub newdat, _: 3;
    /// Message lost
    pub msglst, _: 4;
    /// Message valid
    pub msgval, _: 5;
    /// Receive/transmit selected
    pub rtsel, _: 6;
    /// Receive enable
    pub rxen, _: 7;
    /// Transmit request
    pub txrq, _: 8;
    /// Transmit enable 0
    pub txen0, _: 9;
    /// Transmit enable 1
    pub txen1, _: 10;
    /// Message direction, 1 = transmit
    pub dir, _: 11;
    /// List allocation
    pub u8, list, _: 15, 12;
    /// Pointer to previous object in the list
    pub u8, pprev, _: 23, 16;
    /// Pointer to next object in the list
    pub u8, pnext, _: 31, 24;
}

/// Arbitration register identifier layout: a standard identifier occupies
/// bits 28..18, an extended one bits 28..0.
pub const AR_STANDARD_SHIFT: u32 = 18;
/// Identifier extension bit of `MOAR`/mask extension bit of `MOAMR`
pub const AR_IDE: u32 = 1 << 29;
/// Priority class field of `MOAR`, bits 31..30
pub const AR_PRI_SHIFT: u32 = 30;
