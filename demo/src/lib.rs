#![no_std]
//! Demo application layer: a link-watching UDP beacon on the Ethernet
//! driver and the CAN node wiring used on the reference board.
//!
//! The startup crate of the target is expected to bring up clocks and pin
//! multiplexing, construct the drivers and then run [`net::Beacon::poll`]
//! from its background loop, calling [`can_link::CanLink::drain_pending`]
//! from the MultiCAN service requests (or the same loop).

pub mod can_link;
pub mod net;
