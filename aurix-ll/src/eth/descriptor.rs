//! DMA descriptors in the layout the Ethernet DMA engine expects
//!
//! Both directions use the four-word alternate descriptor format in chained
//! mode: word 0 carries status and the ownership bit, word 1 the buffer
//! size, word 2 the buffer pointer and word 3 the link to the next
//! descriptor. A descriptor must not be moved once its address has been
//! handed to the DMA engine.

use vcell::VolatileCell;

/// Size of one frame buffer in bytes
///
/// Large enough for a maximum size untagged frame plus FCS, kept word
/// aligned for the DMA engine.
pub const BUFFER_SIZE: usize = 1536;

/// Backing storage for one DMA frame buffer
pub type Buffer = [u8; BUFFER_SIZE];

/// Transmit and receive descriptor word bits
#[allow(dead_code)]
mod consts {
    pub const DES0_OWN: u32 = 0x8000_0000;

    // TDES0, control
    pub const TDES0_IC: u32 = 0x4000_0000;
    pub const TDES0_LS: u32 = 0x2000_0000;
    pub const TDES0_FS: u32 = 0x1000_0000;
    pub const TDES0_DC: u32 = 0x0800_0000;
    pub const TDES0_DP: u32 = 0x0400_0000;
    pub const TDES0_CIC: u32 = 0x00C0_0000;
    pub const TDES0_CIC_SHIFT: u32 = 22;
    pub const TDES0_TER: u32 = 0x0020_0000;
    pub const TDES0_TCH: u32 = 0x0010_0000;
    // TDES0, status written back by the engine
    pub const TDES0_ES: u32 = 0x0000_8000;
    pub const TDES0_UF: u32 = 0x0000_0002;
    pub const TDES0_DB: u32 = 0x0000_0001;
    // TDES1
    pub const TDES1_TBS1: u32 = 0x0000_1FFF;

    // RDES0, status written back by the engine
    pub const RDES0_AFM: u32 = 0x4000_0000;
    pub const RDES0_FL: u32 = 0x3FFF_0000;
    pub const RDES0_FL_SHIFT: u32 = 16;
    pub const RDES0_ES: u32 = 0x0000_8000;
    pub const RDES0_FS: u32 = 0x0000_0200;
    pub const RDES0_LS: u32 = 0x0000_0100;
    // RDES1
    pub const RDES1_DIC: u32 = 0x8000_0000;
    pub const RDES1_RER: u32 = 0x0000_8000;
    pub const RDES1_RCH: u32 = 0x0000_4000;
    pub const RDES1_RBS1: u32 = 0x0000_1FFF;
}
use consts::*;

/// Checksum insertion performed by the MAC on transmit
///
/// Written to the CIC field of every transmit descriptor when the checksum
/// engine is enabled.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ChecksumMode {
    /// Checksum insertion bypassed
    #[default]
    Bypass = 0,
    /// Insert the IP header checksum only
    IpHeader = 1,
    /// Insert IP header and payload checksums
    IpHeaderAndPayload = 2,
    /// Insert IP header and payload checksums including the pseudo header
    Full = 3,
}

/// One transmit descriptor
#[repr(C)]
pub struct TxDescriptor {
    tdes0: VolatileCell<u32>,
    tdes1: VolatileCell<u32>,
    tdes2: VolatileCell<u32>,
    tdes3: VolatileCell<u32>,
}

impl TxDescriptor {
    /// `true` if the descriptor is owned by software and may be set up
    pub fn is_available(&self) -> bool {
        self.tdes0.get() & DES0_OWN == 0
    }

    /// Set up the descriptor for chained mode
    ///
    /// Every frame occupies exactly one descriptor (first and last segment),
    /// completion raises an interrupt and word 3 links to `next`.
    pub(crate) fn init_chained(&self, next: *const TxDescriptor) {
        self.tdes0.set(TDES0_IC | TDES0_FS | TDES0_LS | TDES0_TCH);
        self.tdes1.set(0);
        self.tdes3.set(next as usize as u32);
    }

    /// Flag this descriptor as the last one of the ring
    pub(crate) fn mark_ring_end(&self) {
        self.tdes0.set(self.tdes0.get() | TDES0_TER);
    }

    pub(crate) fn set_buffer(&self, buffer: *const u8) {
        self.tdes2.set(buffer as usize as u32);
    }

    pub(crate) fn buffer(&self) -> *mut u8 {
        self.tdes2.get() as usize as *mut u8
    }

    pub(crate) fn next(&self) -> u32 {
        self.tdes3.get()
    }

    pub(crate) fn set_checksum_insertion(&self, mode: ChecksumMode) {
        let tdes0 = self.tdes0.get() & !TDES0_CIC;
        self.tdes0
            .set(tdes0 | ((mode as u32) << TDES0_CIC_SHIFT));
    }

    /// Hand the descriptor to the DMA engine for transmission of `len` bytes
    ///
    /// The control bits written at init are preserved; with TCH set, TBS1 is
    /// the only used size field.
    pub(crate) fn submit(&self, len: u16) {
        self.tdes1.set(u32::from(len) & TDES1_TBS1);
        self.tdes0.set(self.tdes0.get() | DES0_OWN);
    }

    #[cfg(test)]
    pub(crate) fn word0(&self) -> u32 {
        self.tdes0.get()
    }

    #[cfg(test)]
    pub(crate) fn word1(&self) -> u32 {
        self.tdes1.get()
    }
}

/// One receive descriptor
#[repr(C)]
pub struct RxDescriptor {
    rdes0: VolatileCell<u32>,
    rdes1: VolatileCell<u32>,
    rdes2: VolatileCell<u32>,
    rdes3: VolatileCell<u32>,
}

impl RxDescriptor {
    /// `true` if the descriptor has been written back by the DMA engine
    pub fn is_available(&self) -> bool {
        self.rdes0.get() & DES0_OWN == 0
    }

    /// `true` if the engine flagged any receive error for this frame
    pub fn has_error(&self) -> bool {
        self.rdes0.get() & RDES0_ES != 0
    }

    /// Frame length in bytes as reported by the engine
    pub fn frame_length(&self) -> usize {
        ((self.rdes0.get() & RDES0_FL) >> RDES0_FL_SHIFT) as usize
    }

    /// Set up the descriptor for chained mode and give it to the engine
    pub(crate) fn init_chained(&self, next: *const RxDescriptor) {
        self.rdes1.set(RDES1_RCH | (BUFFER_SIZE as u32 & RDES1_RBS1));
        self.rdes3.set(next as usize as u32);
        self.rdes0.set(DES0_OWN);
    }

    /// Flag this descriptor as the last one of the ring
    pub(crate) fn mark_ring_end(&self) {
        self.rdes1.set(self.rdes1.get() | RDES1_RER);
    }

    pub(crate) fn set_buffer(&self, buffer: *const u8) {
        self.rdes2.set(buffer as usize as u32);
    }

    pub(crate) fn buffer(&self) -> *const u8 {
        self.rdes2.get() as usize as *const u8
    }

    pub(crate) fn next(&self) -> u32 {
        self.rdes3.get()
    }

    /// Return the descriptor to the DMA engine, discarding the status
    pub(crate) fn release(&self) {
        self.rdes0.set(DES0_OWN);
    }

    #[cfg(test)]
    pub(crate) fn word0(&self) -> u32 {
        self.rdes0.get()
    }

    #[cfg(test)]
    pub(crate) fn word1(&self) -> u32 {
        self.rdes1.get()
    }

    #[cfg(test)]
    pub(crate) fn simulate_writeback(&self, len: usize, error: bool) {
        let mut rdes0 = ((len as u32) << RDES0_FL_SHIFT) | RDES0_FS | RDES0_LS;
        if error {
            rdes0 |= RDES0_ES;
        }
        self.rdes0.set(rdes0);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::MaybeUninit;

    fn zeroed<T>() -> T {
        // Safety: descriptors are all-zero valid, as in the shared memory init
        unsafe { MaybeUninit::zeroed().assume_init() }
    }

    #[test]
    fn tx_setup_keeps_control_bits_on_submit() {
        let d: TxDescriptor = zeroed();
        d.init_chained(core::ptr::null());
        d.mark_ring_end();
        assert!(d.is_available());

        d.submit(100);
        assert!(!d.is_available());
        assert_eq!(d.word1(), 100);
        assert_eq!(
            d.word0(),
            DES0_OWN | TDES0_IC | TDES0_FS | TDES0_LS | TDES0_TCH | TDES0_TER
        );
    }

    #[test]
    fn tx_checksum_insertion_is_idempotent() {
        let d: TxDescriptor = zeroed();
        d.init_chained(core::ptr::null());
        d.set_checksum_insertion(ChecksumMode::Full);
        d.set_checksum_insertion(ChecksumMode::IpHeader);
        assert_eq!((d.word0() & TDES0_CIC) >> TDES0_CIC_SHIFT, 1);
    }

    #[test]
    fn rx_init_hands_ownership_to_the_engine() {
        let d: RxDescriptor = zeroed();
        d.init_chained(core::ptr::null());
        assert!(!d.is_available());
        assert_eq!(d.word1() & RDES1_RBS1, BUFFER_SIZE as u32);
        assert_ne!(d.word1() & RDES1_RCH, 0);
    }

    #[test]
    fn rx_writeback_reports_length_and_errors() {
        let d: RxDescriptor = zeroed();
        d.init_chained(core::ptr::null());
        d.simulate_writeback(64, false);
        assert!(d.is_available());
        assert!(!d.has_error());
        assert_eq!(d.frame_length(), 64);

        d.simulate_writeback(1514, true);
        assert!(d.has_error());
        assert_eq!(d.frame_length(), 1514);
    }
}
