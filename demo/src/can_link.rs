//! CAN wiring of the reference board
//!
//! Node 0 runs at 500 kbit/s with a transmit FIFO at the bottom of the
//! message RAM and two dedicated receive objects for the identifiers
//! 0x200 and 0x201, each routed to its own service request group. The
//! original firmware reads the receive objects from two interrupt service
//! routines; [`CanLink::drain_pending`] is the body of those routines and
//! can equally be called from the background loop.

use aurix_ll::can::message::Message;
use aurix_ll::can::{
    AllocationError, BitTimingError, Can, MsgObj, MsgObjConfig, Node, NodeConfig, NodeId,
    Received,
};
use aurix_ll::core::{CanId, Dependencies};
use embedded_can::{Id, StandardId};
use fugit::HertzU32;

/// Bitrate of node 0
pub const NODE0_BITRATE_HZ: u32 = 500_000;
/// Transmit FIFO depth of node 0
pub const NODE0_TX_FIFO_SIZE: u8 = 8;

/// Receive input multiplexer value routing the board's RXD pin to node 0
const NODE0_RX_SELECT: u8 = 1;
/// Message object index of the transmit FIFO base
const TX_FIFO_BASE: u8 = 0;
/// Message object receiving identifier 0x201
const RX_OBJ_ID_0X201: u8 = 128;
/// Message object receiving identifier 0x200
const RX_OBJ_ID_0X200: u8 = 129;
/// Pending group the receive objects report into (objects 128..159)
const RX_PENDING_GROUP: usize = 4;

/// Errors raised while wiring the node
#[derive(Debug)]
pub enum SetupError {
    /// The bitrate is not reachable from the module clock
    BitTiming(BitTimingError),
    /// Message RAM allocation failed
    Allocation(AllocationError),
}

impl From<BitTimingError> for SetupError {
    fn from(error: BitTimingError) -> Self {
        Self::BitTiming(error)
    }
}

impl From<AllocationError> for SetupError {
    fn from(error: AllocationError) -> Self {
        Self::Allocation(error)
    }
}

/// A frame rejected before it reached the hardware
#[derive(Debug, PartialEq, Eq)]
pub enum SendError {
    /// Identifier outside 0x001..=0x7FF
    InvalidId,
    /// More than eight payload bytes
    InvalidLength,
}

/// The CAN application state
pub struct CanLink<Id> {
    node: Node<Id>,
    tx_fifo: MsgObj<Id>,
    rx_0x200: MsgObj<Id>,
    rx_0x201: MsgObj<Id>,
    last_received: Option<Received>,
}

impl<Id: CanId> CanLink<Id> {
    /// Bring up node 0 and its message objects and put the node on the bus
    pub fn new<D: Dependencies<Id>>(can: &mut Can<Id, D>) -> Result<Self, SetupError> {
        let mut node = can.node(NodeId::Node0);
        let mut node_config = NodeConfig::new(HertzU32::from_raw(NODE0_BITRATE_HZ));
        node_config.rx_select = NODE0_RX_SELECT;
        node.init(&node_config, can.module_frequency())?;

        let mut tx_config = MsgObjConfig::transmit();
        tx_config.fifo_slots = NODE0_TX_FIFO_SIZE;
        let tx_fifo = can.setup_msg_obj(TX_FIFO_BASE, NodeId::Node0, &tx_config)?;

        let rx_0x201 = can.setup_msg_obj(
            RX_OBJ_ID_0X201,
            NodeId::Node0,
            &receive_config(0x201, 1),
        )?;
        let rx_0x200 = can.setup_msg_obj(
            RX_OBJ_ID_0X200,
            NodeId::Node0,
            &receive_config(0x200, 0),
        )?;

        node.activate();
        Ok(Self {
            node,
            tx_fifo,
            rx_0x200,
            rx_0x201,
            last_received: None,
        })
    }

    /// Queue one standard-identifier frame on the transmit FIFO
    ///
    /// Identifier and length limits of the application protocol are
    /// enforced before the hardware sees the frame; a FIFO that has not
    /// drained yet reports [`nb::Error::WouldBlock`].
    pub fn send(&mut self, id: u16, data: &[u8]) -> nb::Result<(), SendError> {
        if !(1..=0x7FF).contains(&id) {
            return Err(nb::Error::Other(SendError::InvalidId));
        }
        if data.len() > 8 {
            return Err(nb::Error::Other(SendError::InvalidLength));
        }
        // Both limits were checked, construction cannot fail
        let message = match Message::standard(id, data) {
            Some(message) => message,
            None => return Err(nb::Error::Other(SendError::InvalidId)),
        };
        self.tx_fifo
            .send(&message)
            .map_err(|_| nb::Error::WouldBlock)
    }

    /// Periodic demo frame on identifier 0x100
    pub fn send_demo_frame(&mut self, data_high: u32, data_low: u32) -> nb::Result<(), SendError> {
        let mut data = [0; 8];
        data[..4].copy_from_slice(&data_low.to_le_bytes());
        data[4..].copy_from_slice(&data_high.to_le_bytes());
        self.send(0x100, &data)
    }

    /// Service pending receive objects, the interrupt routine body
    ///
    /// Reads every object flagged in the receive pending group and keeps
    /// the most recent frame.
    pub fn drain_pending<D: Dependencies<Id>>(&mut self, can: &Can<Id, D>) -> Option<Received> {
        let mut latest = None;
        while let Some(index) = can.pending_message(RX_PENDING_GROUP) {
            let object = match index {
                RX_OBJ_ID_0X200 => &mut self.rx_0x200,
                RX_OBJ_ID_0X201 => &mut self.rx_0x201,
                _ => continue,
            };
            if let Ok(received) = object.receive() {
                latest = Some(received);
            }
        }
        if latest.is_some() {
            self.last_received = latest;
        }
        latest
    }

    /// Most recent frame taken out of the receive objects
    pub fn last_received(&self) -> Option<&Received> {
        self.last_received.as_ref()
    }

    /// Node handle, for bus-off supervision
    pub fn node(&mut self) -> &mut Node<Id> {
        &mut self.node
    }
}

fn receive_config(id: u16, interrupt_node: u8) -> MsgObjConfig {
    let mut config = MsgObjConfig::receive(Id::Standard(
        StandardId::new(id).unwrap_or(StandardId::ZERO),
    ));
    // match the full identifier including the IDE bit
    config.acceptance_mask = 0x7FFF_FFFF;
    config.matching_id = true;
    config.rx_interrupt_node = Some(interrupt_node);
    config
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn application_limits_are_enforced_before_the_hardware() {
        // The checks mirror the original protocol wrapper: identifier 0 and
        // identifiers above 0x7FF never reach a message object.
        assert!(!(1..=0x7FF).contains(&0u16));
        assert!(!(1..=0x7FF).contains(&0x800u16));
        assert!((1..=0x7FF).contains(&0x100u16));
    }

    #[test]
    fn demo_frame_payload_matches_the_register_split() {
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&0xAABB_CCDDu32.to_le_bytes());
        data[4..].copy_from_slice(&0x1122_3344u32.to_le_bytes());
        let message = Message::standard(0x100, &data).unwrap();
        assert_eq!(message.data_low(), 0xAABB_CCDD);
        assert_eq!(message.data_high(), 0x1122_3344);
    }
}
