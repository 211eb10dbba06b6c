//! MII station management (MDIO) and generic PHY access
//!
//! The MDC clock must stay in the 1.0 - 2.5 MHz window the standard allows;
//! the divider is derived from the host clock at construction.

use super::regs::{self, GmiiAddress, RegisterBlock};
use aurix_ll_core::EthId;
use core::marker::PhantomData;
use fugit::HertzU32;

/// Station management interface of the peripheral identified by `Id`
pub struct Smi<Id> {
    clock_range: u8,
    _marker: PhantomData<Id>,
}

impl<Id: EthId> Smi<Id> {
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `Id`.
    /// The constructed type assumes ownership of GMII_ADDRESS and GMII_DATA;
    /// do not use them elsewhere and do not keep multiple instances for the
    /// same peripheral.
    pub(crate) unsafe fn new(host_clock: HertzU32) -> Self {
        Self {
            clock_range: csr_clock_range(host_clock),
            _marker: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: the interface owns the registers listed in `new`.
        unsafe { &*regs::register_block::<Id>() }
    }

    fn wait_ready(&self) {
        while GmiiAddress(self.regs().gmii_address.get()).gb() {}
    }

    /// Read a PHY register over SMI
    pub fn read(&mut self, phy: u8, register: u8) -> u16 {
        self.wait_ready();
        let mut cmd = GmiiAddress(0);
        cmd.set_pa(phy);
        cmd.set_gr(register);
        cmd.set_cr(self.clock_range);
        cmd.set_gb(true);
        self.regs().gmii_address.set(cmd.0);
        self.wait_ready();
        self.regs().gmii_data.get() as u16
    }

    /// Write a PHY register over SMI
    pub fn write(&mut self, phy: u8, register: u8, value: u16) {
        self.wait_ready();
        self.regs().gmii_data.set(u32::from(value));
        let mut cmd = GmiiAddress(0);
        cmd.set_pa(phy);
        cmd.set_gr(register);
        cmd.set_cr(self.clock_range);
        cmd.set_gw(true);
        cmd.set_gb(true);
        self.regs().gmii_address.set(cmd.0);
        self.wait_ready();
    }
}

/// CSR clock range selection keeping MDC within 1.0 - 2.5 MHz
fn csr_clock_range(host_clock: HertzU32) -> u8 {
    match host_clock.to_Hz() / 1_000_000 {
        0..=34 => 2,    // divide by 16
        35..=59 => 3,   // divide by 26
        60..=99 => 0,   // divide by 42
        100..=149 => 1, // divide by 62
        150..=249 => 4, // divide by 102
        _ => 5,         // divide by 124
    }
}

/// Standard clause-22 registers and bits
#[allow(dead_code)]
mod mii {
    pub const BMCR: u8 = 0x00;
    pub const BMSR: u8 = 0x01;

    pub const BMCR_RESET: u16 = 1 << 15;
    pub const BMCR_ANENABLE: u16 = 1 << 12;
    pub const BMCR_ANRESTART: u16 = 1 << 9;

    pub const BMSR_ANEGCOMPLETE: u16 = 1 << 5;
    pub const BMSR_LSTATUS: u16 = 1 << 2;
}

/// Clause-22 view of an external PHY
///
/// Only the standardized basic registers are touched; vendor specific
/// bring-up stays with the board integration.
#[derive(Copy, Clone)]
pub struct Phy {
    address: u8,
}

impl Phy {
    /// Create a handle for the PHY at `address`
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    /// Trigger a software reset and wait for it to self-clear
    pub fn reset<Id: EthId>(&self, smi: &mut Smi<Id>) {
        smi.write(self.address, mii::BMCR, mii::BMCR_RESET);
        while smi.read(self.address, mii::BMCR) & mii::BMCR_RESET != 0 {}
    }

    /// Enable and restart auto-negotiation
    pub fn restart_autonegotiation<Id: EthId>(&self, smi: &mut Smi<Id>) {
        let bmcr = smi.read(self.address, mii::BMCR);
        smi.write(
            self.address,
            mii::BMCR,
            bmcr | mii::BMCR_ANENABLE | mii::BMCR_ANRESTART,
        );
    }

    /// `true` once auto-negotiation has completed
    pub fn autonegotiation_complete<Id: EthId>(&self, smi: &mut Smi<Id>) -> bool {
        smi.read(self.address, mii::BMSR) & mii::BMSR_ANEGCOMPLETE != 0
    }

    /// Current link status
    pub fn link_up<Id: EthId>(&self, smi: &mut Smi<Id>) -> bool {
        smi.read(self.address, mii::BMSR) & mii::BMSR_LSTATUS != 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fugit::RateExtU32 as _;

    #[test]
    fn clock_range_covers_the_spb_span() {
        assert_eq!(csr_clock_range(20.MHz()), 2);
        assert_eq!(csr_clock_range(50.MHz()), 3);
        assert_eq!(csr_clock_range(80.MHz()), 0);
        assert_eq!(csr_clock_range(100.MHz()), 1);
        assert_eq!(csr_clock_range(200.MHz()), 4);
        assert_eq!(csr_clock_range(300.MHz()), 5);
    }
}
