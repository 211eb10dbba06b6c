//! Ethernet MAC register file
//!
//! The register file is split in three regions: the TriCore module wrapper
//! (clock control and input multiplexing), the MAC core registers and the
//! DMA registers. Field-rich registers get a [`bitfield`] view which mirrors
//! the hardware reference manual's bit assignments.

use aurix_ll_core::EthId;
use core::marker::PhantomData;
use core::ops::Deref;
use vcell::VolatileCell;

/// Ethernet register file of the peripheral identified by `Id`
pub struct Eth<Id> {
    _id: PhantomData<Id>,
}

impl<Id: EthId> Eth<Id> {
    /// # Safety
    /// The caller must have unique access to the peripheral referenced by
    /// `Id`. Keeping multiple instances for the same peripheral aliases the
    /// hardware and breaks the assumptions of every abstraction built on top.
    pub(crate) unsafe fn new() -> Self {
        Self { _id: PhantomData }
    }
}

impl<Id: EthId> Deref for Eth<Id> {
    type Target = RegisterBlock;

    fn deref(&self) -> &RegisterBlock {
        // Safety: `EthId::ADDRESS` points to a valid register file.
        unsafe { &*register_block::<Id>() }
    }
}

pub(crate) fn register_block<Id: EthId>() -> *const RegisterBlock {
    Id::ADDRESS as *const RegisterBlock
}

/// Ethernet MAC register layout
#[repr(C)]
pub struct RegisterBlock {
    /// Clock control (0x0000)
    pub clc: VolatileCell<u32>,
    _reserved0: [u32; 1],
    /// Module identification (0x0008)
    pub id: VolatileCell<u32>,
    _reserved1: [u32; 1],
    /// General purpose control, input multiplexing (0x0010)
    pub gpctl: VolatileCell<u32>,
    _reserved2: [u32; 2043],
    /// MAC configuration (0x2000)
    pub mac_configuration: VolatileCell<u32>,
    /// MAC frame filter (0x2004)
    pub mac_frame_filter: VolatileCell<u32>,
    /// Hash table high (0x2008)
    pub hash_table_high: VolatileCell<u32>,
    /// Hash table low (0x200C)
    pub hash_table_low: VolatileCell<u32>,
    /// MII management address (0x2010)
    pub gmii_address: VolatileCell<u32>,
    /// MII management data (0x2014)
    pub gmii_data: VolatileCell<u32>,
    /// Flow control (0x2018)
    pub flow_control: VolatileCell<u32>,
    _reserved3: [u32; 9],
    /// MAC address 0 high (0x2040)
    pub mac_address_g00_high: VolatileCell<u32>,
    /// MAC address 0 low (0x2044)
    pub mac_address_g00_low: VolatileCell<u32>,
    _reserved4: [u32; 46],
    /// MMC counter control (0x2100)
    pub mmc_control: VolatileCell<u32>,
    _reserved5: [u32; 959],
    /// DMA bus mode (0x3000)
    pub bus_mode: VolatileCell<u32>,
    /// Transmit poll demand (0x3004)
    pub transmit_poll_demand: VolatileCell<u32>,
    /// Receive poll demand (0x3008)
    pub receive_poll_demand: VolatileCell<u32>,
    /// Receive descriptor list base address (0x300C)
    pub receive_descriptor_list_address: VolatileCell<u32>,
    /// Transmit descriptor list base address (0x3010)
    pub transmit_descriptor_list_address: VolatileCell<u32>,
    /// DMA status, write 1 to clear the interrupt bits (0x3014)
    pub status: VolatileCell<u32>,
    /// DMA operation mode (0x3018)
    pub operation_mode: VolatileCell<u32>,
    /// DMA interrupt enable (0x301C)
    pub interrupt_enable: VolatileCell<u32>,
    /// Missed frame and buffer overflow counter (0x3020)
    pub missed_frame_counter: VolatileCell<u32>,
    /// Receive interrupt watchdog timer (0x3024)
    pub receive_interrupt_watchdog_timer: VolatileCell<u32>,
    _reserved6: [u32; 8],
    /// Current host transmit descriptor (0x3048)
    pub current_host_transmit_descriptor: VolatileCell<u32>,
    /// Current host receive descriptor (0x304C)
    pub current_host_receive_descriptor: VolatileCell<u32>,
}

bitfield::bitfield! {
    /// GPCTL view, alternate input and mode selection
    #[derive(Copy, Clone)]
    pub struct Gpctl(u32);
    impl Debug;
    /// Alternate input select for MDIO
    pub u8, alti0, set_alti0: 1, 0;
    /// Alternate input select for the reference clock
    pub u8, alti1, set_alti1: 3, 2;
    /// Alternate input select for CRS_DV
    pub u8, alti4, set_alti4: 9, 8;
    /// Alternate input select for RXD0
    pub u8, alti6, set_alti6: 13, 12;
    /// Alternate input select for RXD1
    pub u8, alti7, set_alti7: 15, 14;
    /// External PHY interface RMII select, needs a module reset to latch
    pub epr, set_epr: 22;
}

bitfield::bitfield! {
    /// MAC configuration view
    #[derive(Copy, Clone)]
    pub struct MacConfiguration(u32);
    impl Debug;
    /// Preamble length, 0 = 7 bytes
    pub u8, prelen, set_prelen: 1, 0;
    /// Receiver enable
    pub re, set_re: 2;
    /// Transmitter enable
    pub te, set_te: 3;
    /// Deferral check
    pub dc, set_dc: 4;
    /// Backoff limit
    pub u8, bl, set_bl: 6, 5;
    /// Automatic pad/CRC stripping
    pub acs, set_acs: 7;
    /// Disable retry
    pub dr, set_dr: 9;
    /// Receive IP frame checksum engine enable
    pub ipc, set_ipc: 10;
    /// Duplex mode, 1 = full duplex
    pub dm, set_dm: 11;
    /// Loopback mode
    pub lm, set_lm: 12;
    /// Disable receive own
    pub _do, set_do: 13;
    /// Speed, 0 = 10 Mbit/s, 1 = 100 Mbit/s
    pub fes, set_fes: 14;
    /// Port select, 1 = 10/100 Mbit/s interface
    pub ps, set_ps: 15;
    /// Disable carrier sense during transmission
    pub dcrs, set_dcrs: 16;
    /// Inter-frame gap, 0 = 96 bit times
    pub u8, ifg, set_ifg: 19, 17;
    /// Jumbo frame enable
    pub je, set_je: 20;
    /// Jabber disable
    pub jd, set_jd: 22;
    /// Watchdog disable
    pub wd, set_wd: 23;
    /// CRC stripping of type frames
    pub cst, set_cst: 25;
    /// 2K packets enable
    pub twokpe, set_twokpe: 27;
}

bitfield::bitfield! {
    /// DMA bus mode view
    #[derive(Copy, Clone)]
    pub struct BusMode(u32);
    impl Debug;
    /// Software reset, self clearing
    pub swr, set_swr: 0;
    /// Descriptor skip length in ring mode
    pub u8, dsl, set_dsl: 6, 2;
    /// Alternate descriptor size, 0 = 4 words
    pub atds, set_atds: 7;
    /// Programmable burst length
    pub u8, pbl, set_pbl: 13, 8;
    /// DMA arbitration, 0 = weighted round-robin
    pub da, set_da: 25;
}

bitfield::bitfield! {
    /// DMA status view
    ///
    /// The low interrupt bits are write-one-to-clear through the register.
    #[derive(Copy, Clone)]
    pub struct Status(u32);
    impl Debug;
    /// Transmit interrupt
    pub ti, set_ti: 0;
    /// Transmit process stopped
    pub tps, set_tps: 1;
    /// Transmit buffer unavailable
    pub tu, set_tu: 2;
    /// Transmit jabber timeout
    pub tjt, set_tjt: 3;
    /// Receive overflow
    pub ovf, set_ovf: 4;
    /// Transmit underflow
    pub unf, set_unf: 5;
    /// Receive interrupt
    pub ri, set_ri: 6;
    /// Receive buffer unavailable
    pub ru, set_ru: 7;
    /// Receive process stopped
    pub rps, set_rps: 8;
    /// Receive watchdog timeout
    pub rwt, set_rwt: 9;
    /// Early transmit interrupt
    pub eti, set_eti: 10;
    /// Fatal bus error interrupt
    pub fbi, set_fbi: 13;
    /// Early receive interrupt
    pub eri, set_eri: 14;
    /// Abnormal interrupt summary
    pub ais, set_ais: 15;
    /// Normal interrupt summary
    pub nis, set_nis: 16;
    /// Receive process state
    pub u8, rs, _: 19, 17;
    /// Transmit process state
    pub u8, ts, _: 22, 20;
    /// Error bits
    pub u8, eb, _: 25, 23;
}

impl Status {
    /// Transmit process state value for "suspended"
    pub const TS_SUSPENDED: u8 = 6;
    /// Receive process state value for "suspended"
    pub const RS_SUSPENDED: u8 = 4;
}

bitfield::bitfield! {
    /// DMA operation mode view
    #[derive(Copy, Clone)]
    pub struct OperationMode(u32);
    impl Debug;
    /// Start receiver
    pub sr, set_sr: 1;
    /// Operate on second frame
    pub osf, set_osf: 2;
    /// Forward undersized good frames
    pub fugf, set_fugf: 6;
    /// Forward error frames
    pub fef, set_fef: 7;
    /// Start transmitter
    pub st, set_st: 13;
    /// Flush transmit FIFO
    pub ftf, set_ftf: 20;
    /// Transmit store and forward
    pub tsf, set_tsf: 21;
    /// Disable flushing of received frames
    pub dff, set_dff: 24;
    /// Receive store and forward
    pub rsf, set_rsf: 25;
    /// Disable dropping of TCP/IP checksum error frames
    pub dt, set_dt: 26;
}

bitfield::bitfield! {
    /// MII management address view
    #[derive(Copy, Clone)]
    pub struct GmiiAddress(u32);
    impl Debug;
    /// MII busy
    pub gb, set_gb: 0;
    /// MII write
    pub gw, set_gw: 1;
    /// CSR clock range
    pub u8, cr, set_cr: 5, 2;
    /// MII register
    pub u8, gr, set_gr: 10, 6;
    /// Physical layer address
    pub u8, pa, set_pa: 15, 11;
}

/// Frame filter value for hash unicast filtering
pub const FRAME_FILTER_HASH_UNICAST: u32 = 0x0000_0010;
/// Frame filter value for promiscuous reception
pub const FRAME_FILTER_PROMISCUOUS: u32 = 0x0000_0001;
/// MMC control value freezing all counters
pub const MMC_COUNTER_FREEZE: u32 = 0x0000_0008;
/// All DMA status interrupt flags, for a global clear
pub const STATUS_ALL_INTERRUPTS: u32 = 0x0001_e7ff;
/// Interrupt enable value for normal summary + transmit + receive
pub const INTERRUPT_ENABLE_TX_RX: u32 = 0x0001_0041;
