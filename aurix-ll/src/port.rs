//! Port (GPIO) register files and pins
//!
//! Pin modes live in the `IOCR` registers, eight bits per pin and four pins
//! per register; the mode encodings below are the raw field values. Output
//! changes go through the write-only `OMR` register whose upper half clears
//! and lower half sets, so pin updates never need a read-modify-write.

use aurix_ll_core::PortId;
use core::marker::PhantomData;
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};
use vcell::VolatileCell;
use void::Void;

/// Port register layout
#[repr(C)]
pub struct RegisterBlock {
    /// Output (0x00)
    pub out: VolatileCell<u32>,
    /// Output modification: set bits 0..15, clear bits 16..31 (0x04)
    pub omr: VolatileCell<u32>,
    /// Identification (0x08)
    pub id: VolatileCell<u32>,
    _reserved0: [u32; 1],
    /// Input/output control, four pins each (0x10)
    pub iocr: [VolatileCell<u32>; 4],
    _reserved1: [u32; 1],
    /// Input (0x24)
    pub input: VolatileCell<u32>,
    _reserved2: [u32; 6],
    /// Pad driver mode, eight pins each (0x40)
    pub pdr: [VolatileCell<u32>; 2],
}

/// Pin mode, the raw `IOCR` field encoding
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Input without pull device
    InputNoPullDevice = 0x00,
    /// Input with pull-down
    InputPullDown = 0x08,
    /// Input with pull-up
    InputPullUp = 0x10,
    /// Push-pull output driven by the output register
    OutputPushPullGeneral = 0x80,
    /// Push-pull output driven by alternate function 1
    OutputPushPullAlt1 = 0x88,
    /// Push-pull output driven by alternate function 2
    OutputPushPullAlt2 = 0x90,
    /// Push-pull output driven by alternate function 3
    OutputPushPullAlt3 = 0x98,
    /// Push-pull output driven by alternate function 4
    OutputPushPullAlt4 = 0xA0,
    /// Open-drain output driven by the output register
    OutputOpenDrainGeneral = 0xC0,
    /// Open-drain output driven by alternate function 1
    OutputOpenDrainAlt1 = 0xC8,
}

/// Pad driver strength and edge mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PadDriver {
    /// CMOS automotive, speed grade 1
    CmosAutomotiveSpeed1 = 0,
    /// CMOS automotive, speed grade 2
    CmosAutomotiveSpeed2 = 1,
    /// CMOS automotive, speed grade 3
    CmosAutomotiveSpeed3 = 2,
    /// CMOS automotive, speed grade 4
    CmosAutomotiveSpeed4 = 3,
}

/// Mode and pad driver for one pin, for table-driven init
#[derive(Copy, Clone)]
pub struct PinConfig {
    /// Pin index within the port
    pub pin: u8,
    /// Pin mode
    pub mode: Mode,
    /// Pad driver selection
    pub pad_driver: PadDriver,
}

/// `IOCR` register index and field shift for a pin
fn iocr_entry(pin: u8) -> (usize, u32) {
    (usize::from(pin / 4), u32::from(pin % 4) * 8)
}

/// `PDR` register index and field shift for a pin
fn pdr_entry(pin: u8) -> (usize, u32) {
    (usize::from(pin / 8), u32::from(pin % 8) * 4)
}

/// Handle to one port register file
pub struct Port<Id> {
    _marker: PhantomData<Id>,
}

impl<Id: PortId> Port<Id> {
    /// # Safety
    /// The caller must guarantee this is the only access path to the port;
    /// pins handed out by [`Self::pin`] write `OMR` concurrently, which is
    /// safe, but mode configuration must stay single-owner.
    pub unsafe fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `PortId::ADDRESS` points to a valid register file.
        unsafe { &*(Id::ADDRESS as *const RegisterBlock) }
    }

    /// Configure the mode of one pin
    pub fn set_pin_mode(&mut self, pin: u8, mode: Mode) {
        let (index, shift) = iocr_entry(pin);
        let iocr = self.regs().iocr[index].get() & !(0xFF << shift);
        self.regs().iocr[index].set(iocr | u32::from(mode as u8) << shift);
    }

    /// Configure the pad driver of one pin
    pub fn set_pad_driver(&mut self, pin: u8, pad_driver: PadDriver) {
        let (index, shift) = pdr_entry(pin);
        let pdr = self.regs().pdr[index].get() & !(0xF << shift);
        self.regs().pdr[index].set(pdr | u32::from(pad_driver as u8) << shift);
    }

    /// Apply a configuration table, one entry per pin
    pub fn configure(&mut self, table: &[PinConfig]) {
        for entry in table {
            self.set_pad_driver(entry.pin, entry.pad_driver);
            self.set_pin_mode(entry.pin, entry.mode);
        }
    }

    /// Drive one pin high
    pub fn set_pin_high(&mut self, pin: u8) {
        self.regs().omr.set(1 << pin);
    }

    /// Drive one pin low
    pub fn set_pin_low(&mut self, pin: u8) {
        self.regs().omr.set(1 << (pin + 16));
    }

    /// Toggle one pin; setting both halves of `OMR` toggles in hardware
    pub fn toggle_pin(&mut self, pin: u8) {
        self.regs().omr.set(1 << pin | 1 << (pin + 16));
    }

    /// Level of one pin as seen by the input stage
    pub fn pin_state(&self, pin: u8) -> bool {
        self.regs().input.get() & (1 << pin) != 0
    }

    /// Split off a single pin handle
    pub fn pin(&mut self, index: u8) -> Pin<Id> {
        Pin {
            index,
            _marker: PhantomData,
        }
    }
}

/// One pin of the port identified by `Id`
///
/// Output changes are single `OMR` writes, so independent pins of the same
/// port do not interfere with each other.
pub struct Pin<Id> {
    index: u8,
    _marker: PhantomData<Id>,
}

impl<Id: PortId> Pin<Id> {
    fn regs(&self) -> &RegisterBlock {
        // Safety: `PortId::ADDRESS` points to a valid register file.
        unsafe { &*(Id::ADDRESS as *const RegisterBlock) }
    }
}

impl<Id: PortId> OutputPin for Pin<Id> {
    type Error = Void;

    fn set_high(&mut self) -> Result<(), Void> {
        self.regs().omr.set(1 << self.index);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Void> {
        self.regs().omr.set(1 << (self.index + 16));
        Ok(())
    }
}

impl<Id: PortId> StatefulOutputPin for Pin<Id> {
    fn is_set_high(&self) -> Result<bool, Void> {
        Ok(self.regs().out.get() & (1 << self.index) != 0)
    }

    fn is_set_low(&self) -> Result<bool, Void> {
        self.is_set_high().map(|high| !high)
    }
}

impl<Id: PortId> ToggleableOutputPin for Pin<Id> {
    type Error = Void;

    fn toggle(&mut self) -> Result<(), Void> {
        self.regs()
            .omr
            .set(1 << self.index | 1 << (self.index + 16));
        Ok(())
    }
}

impl<Id: PortId> InputPin for Pin<Id> {
    type Error = Void;

    fn is_high(&self) -> Result<bool, Void> {
        Ok(self.regs().input.get() & (1 << self.index) != 0)
    }

    fn is_low(&self) -> Result<bool, Void> {
        self.is_high().map(|high| !high)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iocr_fields_pack_four_pins_per_register() {
        assert_eq!(iocr_entry(0), (0, 0));
        assert_eq!(iocr_entry(3), (0, 24));
        assert_eq!(iocr_entry(6), (1, 16));
        assert_eq!(iocr_entry(13), (3, 8));
    }

    #[test]
    fn pdr_fields_pack_eight_pins_per_register() {
        assert_eq!(pdr_entry(0), (0, 0));
        assert_eq!(pdr_entry(7), (0, 28));
        assert_eq!(pdr_entry(8), (1, 0));
        assert_eq!(pdr_entry(15), (1, 28));
    }
}
