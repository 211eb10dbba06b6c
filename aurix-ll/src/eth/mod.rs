//! Ethernet MAC driver with DMA descriptor rings
//!
//! The driver is constructed in configuration mode as [`EthConfigurable`],
//! which wires the descriptor rings into the shared memory; `finalize`
//! resets the MAC, applies the [`EthConfig`] and starts the receiver. The
//! transmitter is left stopped until the application observes a link, which
//! is how the hardware is meant to be brought up behind an external PHY.

pub mod config;
pub mod descriptor;
pub mod ram;
pub mod regs;
pub mod ring;
pub mod smi;

#[cfg(feature = "smoltcp")]
mod device;
#[cfg(feature = "smoltcp")]
pub use device::{EthRxToken, EthTxToken};

use aurix_ll_core::{Dependencies, EthId};
use config::{ChecksumMode, ConfigurationError, Duplex, EthConfig, LineSpeed};
use ram::{Capacities, DescriptorMemory};
use regs::{BusMode, Gpctl, MacConfiguration, OperationMode, Status};
use ring::{RxRing, TxRing};
use smi::Smi;

/// Iterations to wait for the DMA software reset before giving up
const RESET_TIMEOUT: u32 = 1000;

/// An Ethernet MAC in operational mode
///
/// The rings and the station management interface are public fields so the
/// driver can be destructured into independently owned pieces.
pub struct Eth<'a, Id, D, C: Capacities> {
    /// Transmit descriptor ring
    pub tx: TxRing<'a, Id, C>,
    /// Receive descriptor ring
    pub rx: RxRing<'a, Id, C>,
    /// MII station management (MDIO) interface
    pub smi: Smi<Id>,

    /// Implementation details. The field is public to allow destructuring.
    pub internals: Internals<Id, D>,
}

/// Implementation details.
pub struct Internals<Id, D> {
    regs: regs::Eth<Id>,
    dependencies: D,
    config: EthConfig,
}

/// An Ethernet MAC in configuration mode. Before frames can be sent and
/// received, it needs to be [`Self::finalize`]d.
pub struct EthConfigurable<'a, Id, D, C: Capacities>(Eth<'a, Id, D, C>);

impl<'a, Id: EthId, D: Dependencies<Id>, C: Capacities> EthConfigurable<'a, Id, D, C> {
    /// Create a new MAC driver in configuration mode
    ///
    /// Zeroes the shared memory and wires both descriptor rings. The
    /// hardware is not touched before [`Self::finalize`].
    pub fn new(
        mac_address: [u8; 6],
        dependencies: D,
        memory: &'a mut DescriptorMemory<C>,
    ) -> Self {
        // Safety: `dependencies` implies ownership of the register file
        // pointed to by `Id: EthId`, so `regs` has unique access to it.
        let regs = unsafe { regs::Eth::<Id>::new() };

        let memory = memory.init();
        Self(Eth {
            // Safety: the register subsets claimed by the rings are disjoint
            // and owned by exactly one ring each; nothing else in this crate
            // touches them.
            tx: unsafe { TxRing::new(&memory.tx_descriptors, &mut memory.tx_buffers) },
            rx: unsafe { RxRing::new(&memory.rx_descriptors, &memory.rx_buffers) },
            smi: unsafe { Smi::new(dependencies.host_clock()) },
            internals: Internals {
                regs,
                dependencies,
                config: EthConfig::new(mac_address),
            },
        })
    }

    /// Access the configuration applied by [`Self::finalize`]
    pub fn config(&mut self) -> &mut EthConfig {
        &mut self.0.internals.config
    }

    /// Reset the MAC, apply the configuration and enter operation
    ///
    /// Reproduces the canonical bring-up order: interface select, software
    /// reset with a bounded wait, bus mode, MAC configuration and address,
    /// frame filter, interrupt enables, descriptor list setup. The receiver
    /// is started; the transmitter stays stopped until
    /// [`Eth::start_transmitter`].
    pub fn finalize(self) -> Result<Eth<'a, Id, D, C>, ConfigurationError> {
        let mut eth = self.0;
        let config = eth.internals.config;
        {
            let regs = &eth.internals.regs;

            // Select RMII; latching the mode requires the module reset below
            let mut gpctl = Gpctl(regs.gpctl.get());
            gpctl.set_epr(true);
            regs.gpctl.set(gpctl.0);

            let mut bus_mode = BusMode(regs.bus_mode.get());
            bus_mode.set_swr(true);
            regs.bus_mode.set(bus_mode.0);
            let mut timeout = 0;
            while BusMode(regs.bus_mode.get()).swr() {
                timeout += 1;
                if timeout >= RESET_TIMEOUT {
                    return Err(ConfigurationError::ResetTimeout);
                }
            }

            let mut bus_mode = BusMode(regs.bus_mode.get());
            bus_mode.set_dsl(0);
            bus_mode.set_atds(false);
            bus_mode.set_da(false);
            regs.bus_mode.set(bus_mode.0);

            let mut mac = MacConfiguration(regs.mac_configuration.get());
            mac.set_prelen(0);
            mac.set_dc(false);
            mac.set_acs(true);
            mac.set_ipc(config.checksum != ChecksumMode::Bypass);
            mac.set_dm(config.duplex == Duplex::Full);
            mac.set_lm(config.loopback);
            mac.set_fes(config.speed == LineSpeed::Mbit100);
            mac.set_ps(true);
            mac.set_ifg(0);
            mac.set_je(false);
            mac.set_jd(false);
            mac.set_wd(false);
            mac.set_cst(true);
            mac.set_twokpe(false);
            regs.mac_configuration.set(mac.0);

            eth.apply_mac_address();

            let regs = &eth.internals.regs;
            regs.mmc_control.set(regs::MMC_COUNTER_FREEZE);

            regs.status.set(regs::STATUS_ALL_INTERRUPTS);
            regs.mac_frame_filter.set(if config.promiscuous {
                regs::FRAME_FILTER_PROMISCUOUS
            } else {
                regs::FRAME_FILTER_HASH_UNICAST
            });
            regs.interrupt_enable.set(regs::INTERRUPT_ENABLE_TX_RX);
        }

        if config.checksum != ChecksumMode::Bypass {
            let regs = &eth.internals.regs;
            let mut mode = OperationMode(regs.operation_mode.get());
            mode.set_tsf(true);
            // keep DT = 0, frames with checksum errors are dropped
            mode.set_dt(false);
            regs.operation_mode.set(mode.0);
            eth.tx.set_checksum_insertion(config.checksum);
        }

        {
            let regs = &eth.internals.regs;
            regs.receive_descriptor_list_address
                .set(eth.rx.base_address());
            regs.transmit_descriptor_list_address
                .set(eth.tx.base_address());
        }

        eth.stop_transmitter();
        eth.start_receiver();
        Ok(eth)
    }
}

impl<'a, Id: EthId, D: Dependencies<Id>, C: Capacities> Eth<'a, Id, D, C> {
    /// Stop rx and tx and go back to configuration mode
    pub fn configure(mut self) -> EthConfigurable<'a, Id, D, C> {
        self.stop_transmitter();
        self.stop_receiver();
        EthConfigurable(self)
    }

    /// Enable the MAC transmitter, start the transmit DMA and poll it
    pub fn start_transmitter(&mut self) {
        let regs = &self.internals.regs;
        let mut mac = MacConfiguration(regs.mac_configuration.get());
        mac.set_te(true);
        regs.mac_configuration.set(mac.0);

        let mut mode = OperationMode(regs.operation_mode.get());
        mode.set_st(true);
        regs.operation_mode.set(mode.0);
        regs.transmit_poll_demand.set(1);
    }

    /// Stop the transmit DMA and disable the MAC transmitter
    pub fn stop_transmitter(&mut self) {
        let regs = &self.internals.regs;
        regs.transmit_poll_demand.set(0);

        let mut mode = OperationMode(regs.operation_mode.get());
        mode.set_st(false);
        regs.operation_mode.set(mode.0);

        let mut mac = MacConfiguration(regs.mac_configuration.get());
        mac.set_te(false);
        regs.mac_configuration.set(mac.0);
    }

    /// Re-initialize the transmit ring and start the transmitter
    ///
    /// Used on a link-up transition: frames queued while the link was down
    /// are dropped and the engine restarts from the ring base.
    pub fn restart_transmitter(&mut self) {
        self.tx.reset();
        self.internals
            .regs
            .transmit_descriptor_list_address
            .set(self.tx.base_address());
        self.start_transmitter();
    }

    /// Enable the MAC receiver, start the receive DMA and poll it
    pub fn start_receiver(&mut self) {
        let regs = &self.internals.regs;
        let mut mode = OperationMode(regs.operation_mode.get());
        mode.set_sr(true);
        regs.operation_mode.set(mode.0);

        let mut mac = MacConfiguration(regs.mac_configuration.get());
        mac.set_re(true);
        regs.mac_configuration.set(mac.0);
        regs.receive_poll_demand.set(1);
    }

    /// Stop the receive DMA and disable the MAC receiver
    pub fn stop_receiver(&mut self) {
        let regs = &self.internals.regs;
        let mut mode = OperationMode(regs.operation_mode.get());
        mode.set_sr(false);
        regs.operation_mode.set(mode.0);

        let mut mac = MacConfiguration(regs.mac_configuration.get());
        mac.set_re(false);
        regs.mac_configuration.set(mac.0);
    }

    /// MAC-internal loopback state
    pub fn loopback(&self) -> bool {
        MacConfiguration(self.internals.regs.mac_configuration.get()).lm()
    }

    /// Enable or disable MAC-internal loopback
    pub fn set_loopback(&mut self, loopback: bool) {
        let regs = &self.internals.regs;
        let mut mac = MacConfiguration(regs.mac_configuration.get());
        mac.set_lm(loopback);
        regs.mac_configuration.set(mac.0);
    }

    fn apply_mac_address(&self) {
        let regs = &self.internals.regs;
        let mac = &self.internals.config.mac_address;
        // The address-enable bit lives in the high register; write it last
        // so the filter never sees a half-updated address.
        regs.mac_address_g00_low.set(
            u32::from(mac[0])
                | u32::from(mac[1]) << 8
                | u32::from(mac[2]) << 16
                | u32::from(mac[3]) << 24,
        );
        regs.mac_address_g00_high
            .set(u32::from(mac[4]) | u32::from(mac[5]) << 8 | 0x8000_0000);
    }

    /// Read back the station address from the filter registers
    pub fn mac_address(&self) -> [u8; 6] {
        let regs = &self.internals.regs;
        let low = regs.mac_address_g00_low.get();
        let high = regs.mac_address_g00_high.get();
        [
            low as u8,
            (low >> 8) as u8,
            (low >> 16) as u8,
            (low >> 24) as u8,
            high as u8,
            (high >> 8) as u8,
        ]
    }

    /// Snapshot of the DMA status register
    pub fn interrupt_status(&self) -> Status {
        Status(self.internals.regs.status.get())
    }

    /// `true` if a transmit interrupt is pending
    pub fn is_tx_interrupt(&self) -> bool {
        self.interrupt_status().ti()
    }

    /// `true` if a receive interrupt is pending
    pub fn is_rx_interrupt(&self) -> bool {
        self.interrupt_status().ri()
    }

    /// Acknowledge a pending transmit interrupt
    pub fn clear_tx_interrupt(&mut self) {
        let mut clear = Status(0);
        clear.set_nis(true);
        clear.set_ti(true);
        self.internals.regs.status.set(clear.0);
    }

    /// Acknowledge a pending receive interrupt
    pub fn clear_rx_interrupt(&mut self) {
        let mut clear = Status(0);
        clear.set_nis(true);
        clear.set_ri(true);
        self.internals.regs.status.set(clear.0);
    }

    /// Frames the engine dropped for lack of receive descriptors
    pub fn missed_frames(&self) -> u32 {
        self.internals.regs.missed_frame_counter.get() & 0xFFFF
    }

    /// Release the driver and hand back the dependencies
    pub fn release(self) -> D {
        self.internals.dependencies
    }
}
