//! CAN node bit timing
//!
//! The bit time is built from time quanta derived from the module clock:
//! one synchronization quantum, `TSEG1 + 1` quanta up to the sample point
//! and `TSEG2 + 1` quanta after it. [`BitTiming`] describes what the
//! application wants; [`NodeTiming`] is the register-level result of the
//! best-fit search.

use super::regs::Nbtr;
use fugit::HertzU32;

/// Upper bound on quanta per bit the search will accept
const MAX_TIME_QUANTA_PER_BIT: u32 = 20;
/// Prescaler range of the hardware, `BRP` field plus one
const PRESCALER_RANGE: core::ops::RangeInclusive<u32> = 1..=64;

/// Requested bit timing parameters
///
/// Sample point and synchronization jump width are expressed in 1/100 of a
/// percent of the bit time (8000 = 80%), matching the granularity the
/// best-fit search works at.
#[derive(Copy, Clone)]
pub struct BitTiming {
    /// Bitrate of the bus
    pub bitrate: HertzU32,
    /// Desired sample point location
    pub sample_point: u16,
    /// Desired synchronization jump width
    pub sjw: u16,
}

impl BitTiming {
    /// Create an instance
    ///
    /// The bitrate must be provided, sample point and jump width come
    /// pre-populated with default values.
    pub fn new(bitrate: HertzU32) -> Self {
        Self {
            bitrate,
            sample_point: 8000,
            sjw: 1000,
        }
    }

    /// Search the register parameters that best match this request
    ///
    /// Three passes: the prescaler minimizing the bitrate error (stopping
    /// early on an exact fit), then the longest `TSEG1` not sampling before
    /// the requested point, then the jump width. A bitrate the module clock
    /// cannot express within 20 quanta per bit is rejected.
    pub fn best_fit(&self, module_clock: HertzU32) -> Result<NodeTiming, BitTimingError> {
        let f_in = module_clock.to_Hz();
        let target = self.bitrate.to_Hz();

        let mut best: Option<(u32, u32, u32)> = None;
        for brp in PRESCALER_RANGE {
            let f_quanta = f_in / brp;
            let tbaud = f_quanta / target;
            if tbaud == 0 || tbaud > MAX_TIME_QUANTA_PER_BIT {
                continue;
            }
            let error = (f_quanta / tbaud).abs_diff(target);
            if best.map_or(true, |(e, _, _)| error < e) {
                best = Some((error, brp, tbaud));
                if error == 0 {
                    break;
                }
            }
        }
        let (_, brp, tbaud) = best.ok_or(BitTimingError::NoFit {
            module_clock,
            bitrate: self.bitrate,
        })?;

        let mut best_tseg1 = 1;
        let mut best_error = u32::MAX;
        for tseg1 in (3..=16).rev() {
            let sample_point = (tseg1 + 1) * 10_000 / tbaud;
            let error = sample_point.abs_diff(u32::from(self.sample_point));
            if error < best_error {
                best_tseg1 = tseg1;
                best_error = error;
            }
            if sample_point < u32::from(self.sample_point) {
                break;
            }
        }
        let tseg2 = tbaud
            .checked_sub(best_tseg1 + 1)
            .filter(|tseg2| (1..=8).contains(tseg2))
            .ok_or(BitTimingError::PhaseSeg2OutOfRange { tbaud, tseg1: best_tseg1 })?;

        let mut best_sjw = 1;
        let mut best_error = u32::MAX;
        for sjw in 1..=4 {
            let width = sjw * 10_000 / tbaud;
            let error = width.abs_diff(u32::from(self.sjw));
            if error < best_error {
                best_sjw = sjw;
                best_error = error;
            }
        }

        Ok(NodeTiming {
            brp: brp as u16,
            sjw: best_sjw as u8,
            tseg1: best_tseg1 as u8,
            tseg2: tseg2 as u8,
            div8: false,
        })
    }
}

/// Misconfigurations of [`BitTiming`]
#[derive(Debug, PartialEq, Eq)]
pub enum BitTimingError {
    /// No prescaler yields a bit time of at most 20 quanta for the requested
    /// bitrate
    NoFit {
        /// Provided module clock
        module_clock: HertzU32,
        /// Bitrate requested in [`BitTiming`]
        bitrate: HertzU32,
    },
    /// The requested sample point leaves no valid time after the sample
    /// point
    PhaseSeg2OutOfRange {
        /// Selected quanta per bit
        tbaud: u32,
        /// Selected segment before the sample point
        tseg1: u32,
    },
}

/// Register-level bit timing, real values (not the off-by-one encodings)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeTiming {
    /// Baud rate prescaler, quanta length in module clock cycles
    pub brp: u16,
    /// Synchronization jump width in quanta
    pub sjw: u8,
    /// Quanta before the sample point, without the synchronization quantum
    pub tseg1: u8,
    /// Quanta after the sample point
    pub tseg2: u8,
    /// Divide the prescaler input clock by 8
    pub div8: bool,
}

impl NodeTiming {
    /// Quanta per bit including the synchronization quantum
    pub fn time_quanta_per_bit(&self) -> u32 {
        1 + u32::from(self.tseg1) + u32::from(self.tseg2)
    }

    /// Encode into the `NBTR` register value
    pub(crate) fn to_register(self) -> u32 {
        let mut nbtr = Nbtr(0);
        nbtr.set_brp((self.brp - 1) as u8);
        nbtr.set_sjw(self.sjw - 1);
        nbtr.set_tseg1(self.tseg1 - 1);
        nbtr.set_tseg2(self.tseg2 - 1);
        nbtr.set_div8(self.div8);
        nbtr.0
    }

    /// Decode from an `NBTR` register value
    pub fn from_register(value: u32) -> Self {
        let nbtr = Nbtr(value);
        Self {
            brp: u16::from(nbtr.brp()) + 1,
            sjw: nbtr.sjw() + 1,
            tseg1: nbtr.tseg1() + 1,
            tseg2: nbtr.tseg2() + 1,
            div8: nbtr.div8(),
        }
    }

    /// Bitrate this timing produces at the given module clock
    pub fn bitrate(&self, module_clock: HertzU32) -> HertzU32 {
        let div8 = if self.div8 { 8 } else { 1 };
        HertzU32::from_raw(
            module_clock.to_Hz() / (div8 * u32::from(self.brp) * self.time_quanta_per_bit()),
        )
    }

    /// Sample point location in 1/100 of a percent of the bit time
    pub fn sample_point(&self) -> u16 {
        (u32::from(self.tseg1) * 10_000 / self.time_quanta_per_bit()) as u16
    }

    /// Synchronization jump width in 1/100 of a percent of the bit time
    pub fn sync_jump_width(&self) -> u16 {
        (u32::from(self.sjw) * 10_000 / self.time_quanta_per_bit()) as u16
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fugit::RateExtU32 as _;

    #[test]
    fn exact_fit_at_forty_megahertz() {
        let timing = BitTiming::new(500.kHz()).best_fit(40.MHz()).unwrap();
        // 40 MHz / 4 = 10 MHz quanta clock, 20 quanta per bit
        assert_eq!(timing.brp, 4);
        assert_eq!(timing.time_quanta_per_bit(), 20);
        // (15 + 1) quanta out of 20 puts the sample point at exactly 80%
        assert_eq!(timing.tseg1, 15);
        assert_eq!(timing.tseg2, 4);
        assert_eq!(timing.sjw, 2);
        assert_eq!(timing.bitrate(40.MHz()).to_Hz(), 500_000);
    }

    #[test]
    fn one_megabit_on_a_typical_module_clock() {
        let timing = BitTiming::new(1.MHz()).best_fit(80.MHz()).unwrap();
        assert_eq!(timing.bitrate(80.MHz()).to_Hz(), 1_000_000);
        assert!(timing.time_quanta_per_bit() <= 20);
        assert!((1..=8).contains(&timing.tseg2));
    }

    #[test]
    fn register_encoding_is_off_by_one() {
        let timing = NodeTiming {
            brp: 4,
            sjw: 2,
            tseg1: 15,
            tseg2: 4,
            div8: false,
        };
        let nbtr = Nbtr(timing.to_register());
        assert_eq!(nbtr.brp(), 3);
        assert_eq!(nbtr.sjw(), 1);
        assert_eq!(nbtr.tseg1(), 14);
        assert_eq!(nbtr.tseg2(), 3);
        assert_eq!(NodeTiming::from_register(timing.to_register()), timing);
    }

    #[test]
    fn unreachable_bitrate_is_rejected() {
        // 5 kbit/s would need more than 64 * 20 quanta at 40 MHz
        let error = BitTiming::new(5.kHz()).best_fit(40.MHz()).unwrap_err();
        assert!(matches!(error, BitTimingError::NoFit { .. }));
    }

    #[test]
    fn low_sample_points_cannot_overflow_tseg2() {
        // A sample point this early would need TSEG2 > 8; must error out
        // instead of wrapping into a bogus register value.
        let mut timing = BitTiming::new(500.kHz());
        timing.sample_point = 2000;
        let error = timing.best_fit(40.MHz()).unwrap_err();
        assert!(matches!(error, BitTimingError::PhaseSeg2OutOfRange { .. }));
    }
}
