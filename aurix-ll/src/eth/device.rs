//! smoltcp `Device` implementation over the descriptor rings

use super::ram::Capacities;
use super::ring::{RxRing, TxRing};
use super::Eth;
use aurix_ll_core::EthId;
use smoltcp::phy::{self, Device, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

impl<'r, Id: EthId, D, C: Capacities> Device for Eth<'r, Id, D, C> {
    type RxToken<'a>
        = EthRxToken<'a, 'r, Id, C>
    where
        Self: 'a;
    type TxToken<'a>
        = EthTxToken<'a, 'r, Id, C>
    where
        Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        self.rx.skip_errored();
        if self.rx.is_frame_available() && self.tx.is_available() {
            Some((EthRxToken(&mut self.rx), EthTxToken(&mut self.tx)))
        } else {
            None
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.tx.is_available() {
            Some(EthTxToken(&mut self.tx))
        } else {
            None
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        // frame type II sans FCS, 1500 byte IP MTU
        caps.max_transmission_unit = 1514;
        caps.max_burst_size = Some(self.tx.capacity().min(self.rx.capacity()));
        caps
    }
}

/// Receive token borrowing the ring; consuming it releases the descriptor
pub struct EthRxToken<'a, 'r, Id, C: Capacities>(&'a mut RxRing<'r, Id, C>);

impl<Id: EthId, C: Capacities> phy::RxToken for EthRxToken<'_, '_, Id, C> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        // Frame availability was checked when the token was issued; an empty
        // slice is handed out if the descriptor was reclaimed since.
        let result = f(self.0.frame());
        self.0.count_frame();
        self.0.release_current();
        self.0.wake_receiver();
        result
    }
}

/// Transmit token borrowing the ring; consuming it queues the frame
pub struct EthTxToken<'a, 'r, Id, C: Capacities>(&'a mut TxRing<'r, Id, C>);

impl<Id: EthId, C: Capacities> phy::TxToken for EthTxToken<'_, '_, Id, C> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let buffer = self.0.slot();
        let len = len.min(buffer.len());
        let result = f(&mut buffer[..len]);
        self.0.send(len).ok();
        result
    }
}
