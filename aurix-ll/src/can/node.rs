//! CAN nodes, the protocol machines driving one bus each

use super::config::{BitTiming, BitTimingError, NodeTiming};
use super::regs::{self, NodeControl, NodeErrorCounters, NodeRegisterBlock, NodeStatus};
use aurix_ll_core::CanId;
use core::fmt::{self, Debug};
use core::marker::PhantomData;
use fugit::HertzU32;

/// Node index inside the module
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeId {
    /// Node 0
    Node0 = 0,
    /// Node 1
    Node1 = 1,
    /// Node 2
    Node2 = 2,
    /// Node 3
    Node3 = 3,
}

/// Configuration of one node
#[derive(Copy, Clone)]
pub struct NodeConfig {
    /// Bit timing request
    pub timing: BitTiming,
    /// Receive input selection, the `NPCR.RXSEL` multiplexer value
    pub rx_select: u8,
    /// Route the node through the internal loopback bus
    pub loopback: bool,
}

impl NodeConfig {
    /// Create an instance
    ///
    /// The bitrate must be provided, all other settings come pre-populated
    /// with default values.
    pub fn new(bitrate: HertzU32) -> Self {
        Self {
            timing: BitTiming::new(bitrate),
            rx_select: 0,
            loopback: false,
        }
    }
}

/// Printable error counter snapshot
pub struct ErrorCounters(pub NodeErrorCounters);

impl Debug for ErrorCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ecnt = &self.0;
        f.debug_struct("ErrorCounters")
            .field("rec", &ecnt.rec())
            .field("tec", &ecnt.tec())
            .field("ewrnlvl", &ecnt.ewrnlvl())
            .finish()
    }
}

/// Progress of the bus-off recovery sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusOffRecovery {
    /// Bus-off confirmed, counters were reset and the node was taken
    /// offline; recovery has begun
    Initiated,
    /// The node is still counting recovery sequences
    InProgress,
    /// Bus-off is over, the node was put back online
    Completed,
}

/// Handle to one node of the peripheral identified by `Id`
///
/// Handles are created by [`Can::node`]; keeping two handles to the same
/// node aliases the protocol machine and is not supported.
///
/// [`Can::node`]: super::Can::node
pub struct Node<Id> {
    index: u8,
    _marker: PhantomData<Id>,
}

impl<Id: CanId> Node<Id> {
    pub(crate) fn new(index: NodeId) -> Self {
        Self {
            index: index as u8,
            _marker: PhantomData,
        }
    }

    fn regs(&self) -> &NodeRegisterBlock {
        // Safety: `CanId::ADDRESS` points to a valid register file; the node
        // index comes from `NodeId` and is in range.
        unsafe { &(*regs::register_block::<Id>()).nodes[usize::from(self.index)] }
    }

    /// Bring the node up with the given configuration
    ///
    /// The node stays offline (INIT set) until [`Self::activate`]; message
    /// objects are expected to be allocated in between.
    pub fn init(
        &mut self,
        config: &NodeConfig,
        module_clock: HertzU32,
    ) -> Result<NodeTiming, BitTimingError> {
        let mut cr = NodeControl(0);
        cr.set_init(true);
        cr.set_cce(true);
        self.regs().cr.set(cr.0);

        let timing = self.apply_timing(&config.timing, module_clock)?;

        let mut pcr = self.regs().pcr.get() & !0x7;
        pcr |= u32::from(config.rx_select & 0x7);
        if config.loopback {
            pcr |= 1 << 8; // LBM
        }
        self.regs().pcr.set(pcr);

        self.regs().sr.set(0);
        self.regs().fcr.set(0);
        Ok(timing)
    }

    /// Compute and program the bit timing; requires configuration access
    pub fn apply_timing(
        &mut self,
        timing: &BitTiming,
        module_clock: HertzU32,
    ) -> Result<NodeTiming, BitTimingError> {
        let best = timing.best_fit(module_clock)?;
        self.regs().btr.set(best.to_register());
        Ok(best)
    }

    /// Bit timing currently programmed into the node
    pub fn timing(&self) -> NodeTiming {
        NodeTiming::from_register(self.regs().btr.get())
    }

    /// Put the node on the bus
    pub fn activate(&mut self) {
        let mut cr = NodeControl(self.regs().cr.get());
        cr.set_init(false);
        cr.set_cce(false);
        self.regs().cr.set(cr.0);
    }

    /// Take the node off the bus
    pub fn deactivate(&mut self) {
        let mut cr = NodeControl(self.regs().cr.get());
        cr.set_init(true);
        self.regs().cr.set(cr.0);
    }

    /// Reset the node registers to their cleared state
    pub fn deinit(&mut self) {
        let mut cr = NodeControl(0);
        cr.set_init(true);
        self.regs().cr.set(cr.0);
        self.regs().sr.set(0);
        self.regs().ipr.set(0);
        self.regs().pcr.set(0);
        self.regs().btr.set(0);
        self.regs().ecnt.set(0x0060_0000);
        self.regs().fcr.set(0);
    }

    /// Status snapshot
    pub fn status(&self) -> NodeStatus {
        NodeStatus(self.regs().sr.get())
    }

    /// Error counter snapshot
    pub fn error_counters(&self) -> ErrorCounters {
        ErrorCounters(NodeErrorCounters(self.regs().ecnt.get()))
    }

    /// `true` while the node is in bus-off
    pub fn is_bus_off(&self) -> bool {
        self.status().boff()
    }

    /// Drive the bus-off recovery sequence
    ///
    /// Call repeatedly while [`Self::is_bus_off`]: on entry the error
    /// counters are reset and the node is taken offline, then the hardware
    /// counts the mandated 128 bus-idle sequences; once bus-off and the
    /// error warning have cleared the node is put back online.
    pub fn recover_bus_off(&mut self) -> BusOffRecovery {
        let status = self.status();
        let counters = NodeErrorCounters(self.regs().ecnt.get());

        if status.boff() && counters.tec() > 254 {
            let mut counters = counters;
            counters.set_tec(1);
            counters.set_rec(1);
            self.regs().ecnt.set(counters.0);

            let mut sr = status;
            sr.set_ewrn(false);
            sr.set_alert(false);
            self.regs().sr.set(sr.0);

            self.deactivate();
            BusOffRecovery::Initiated
        } else if status.boff() && status.ewrn() {
            BusOffRecovery::InProgress
        } else if !status.boff() && !status.ewrn() {
            self.activate();
            BusOffRecovery::Completed
        } else {
            BusOffRecovery::InProgress
        }
    }
}
