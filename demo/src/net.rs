//! Link-watching UDP beacon
//!
//! The background loop of the reference application: watch the PHY link,
//! start or stop the transmitter on transitions, mirror the link and
//! negotiation state onto indicator LEDs and push a fixed-size UDP beacon
//! towards the configured peer whenever a transmit buffer is free.

use aurix_ll::core::{Dependencies, EthId, PortId};
use aurix_ll::eth::ram::Capacities;
use aurix_ll::eth::smi::Phy;
use aurix_ll::eth::Eth;
use aurix_ll::port::Pin;
use embedded_hal::digital::v2::OutputPin;
use smoltcp::iface::{Config, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::socket::udp;
use smoltcp::time::Instant;
use smoltcp::wire::{
    EthernetAddress, HardwareAddress, IpAddress, IpCidr, IpEndpoint, Ipv4Address,
};
use void::ResultVoidExt;

/// Size of the beacon payload in bytes
pub const BEACON_LEN: usize = 100;

/// Addressing of the beacon application
pub struct NetConfig {
    /// Station MAC address
    pub mac: [u8; 6],
    /// Local IPv4 address
    pub address: Ipv4Address,
    /// Prefix length of the local subnet
    pub prefix_len: u8,
    /// Default gateway
    pub gateway: Ipv4Address,
    /// Beacon destination address
    pub peer: Ipv4Address,
    /// Beacon destination port
    pub peer_port: u16,
    /// Local UDP port the socket binds to
    pub local_port: u16,
}

impl NetConfig {
    /// Addressing used on the reference board
    pub fn new(mac: [u8; 6]) -> Self {
        Self {
            mac,
            address: Ipv4Address::new(192, 168, 7, 123),
            prefix_len: 24,
            gateway: Ipv4Address::new(192, 168, 7, 6),
            peer: Ipv4Address::new(192, 168, 7, 6),
            peer_port: 5001,
            local_port: 5001,
        }
    }
}

/// Statically allocatable socket and packet buffer storage
pub struct NetStorage<'a> {
    sockets: [SocketStorage<'a>; 2],
    rx_metadata: [udp::PacketMetadata; 4],
    rx_payload: [u8; 1536],
    tx_metadata: [udp::PacketMetadata; 4],
    tx_payload: [u8; 1536],
}

impl NetStorage<'_> {
    /// Storage with empty buffers, usable as a `static` initializer
    pub const fn new() -> Self {
        Self {
            sockets: [SocketStorage::EMPTY; 2],
            rx_metadata: [udp::PacketMetadata::EMPTY; 4],
            rx_payload: [0; 1536],
            tx_metadata: [udp::PacketMetadata::EMPTY; 4],
            tx_payload: [0; 1536],
        }
    }
}

impl Default for NetStorage<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Indicator LEDs the loop mirrors its state onto, active low
pub struct IndicatorPins<P> {
    /// Lit while the PHY reports link
    pub link: Pin<P>,
    /// Lit while auto-negotiation has completed
    pub negotiation: Pin<P>,
    /// Lit while beacons leave the station
    pub activity: Pin<P>,
}

/// The beacon application state
pub struct Beacon<'a, Id, D, C: Capacities, P> {
    eth: Eth<'a, Id, D, C>,
    phy: Phy,
    pins: IndicatorPins<P>,
    iface: Interface,
    sockets: SocketSet<'a>,
    udp_handle: SocketHandle,
    peer: IpEndpoint,
    link_up: bool,
    sequence: u32,
}

impl<'a, Id: EthId, D: Dependencies<Id>, C: Capacities, P: PortId>
    Beacon<'a, Id, D, C, P>
{
    /// Wire the interface, bind the socket and park the indicators
    pub fn new(
        mut eth: Eth<'a, Id, D, C>,
        phy: Phy,
        mut pins: IndicatorPins<P>,
        config: &NetConfig,
        storage: &'a mut NetStorage<'a>,
        now_ms: i64,
    ) -> Self {
        let iface_config = Config::new(HardwareAddress::Ethernet(EthernetAddress(config.mac)));
        let mut iface = Interface::new(iface_config, &mut eth, Instant::from_millis(now_ms));
        iface.update_ip_addrs(|addrs| {
            addrs
                .push(IpCidr::new(IpAddress::Ipv4(config.address), config.prefix_len))
                .ok();
        });
        iface
            .routes_mut()
            .add_default_ipv4_route(config.gateway)
            .ok();

        let mut sockets = SocketSet::new(&mut storage.sockets[..]);
        let rx_buffer = udp::PacketBuffer::new(
            &mut storage.rx_metadata[..],
            &mut storage.rx_payload[..],
        );
        let tx_buffer = udp::PacketBuffer::new(
            &mut storage.tx_metadata[..],
            &mut storage.tx_payload[..],
        );
        let mut socket = udp::Socket::new(rx_buffer, tx_buffer);
        socket.bind(config.local_port).ok();
        let udp_handle = sockets.add(socket);

        pins.link.set_high().void_unwrap();
        pins.negotiation.set_high().void_unwrap();
        pins.activity.set_high().void_unwrap();

        Self {
            eth,
            phy,
            pins,
            iface,
            sockets,
            udp_handle,
            peer: IpEndpoint::new(IpAddress::Ipv4(config.peer), config.peer_port),
            link_up: false,
            sequence: 0,
        }
    }

    /// One iteration of the background loop
    pub fn poll(&mut self, now_ms: i64) {
        let link = self.phy.link_up(&mut self.eth.smi);
        if link != self.link_up {
            self.link_up = link;
            if link {
                self.pins.link.set_low().void_unwrap();
                self.eth.restart_transmitter();
            } else {
                self.pins.link.set_high().void_unwrap();
                self.eth.stop_transmitter();
            }
        }

        if self.phy.autonegotiation_complete(&mut self.eth.smi) {
            self.pins.negotiation.set_low().void_unwrap();
        } else {
            self.pins.negotiation.set_high().void_unwrap();
        }

        let _ = self
            .iface
            .poll(Instant::from_millis(now_ms), &mut self.eth, &mut self.sockets);

        if self.link_up && self.eth.tx.is_available() {
            let payload = beacon_payload(self.sequence);
            let socket = self.sockets.get_mut::<udp::Socket>(self.udp_handle);
            match socket.send_slice(&payload, self.peer) {
                Ok(()) => {
                    self.sequence = self.sequence.wrapping_add(1);
                    self.pins.activity.set_low().void_unwrap();
                }
                Err(_) => self.pins.activity.set_high().void_unwrap(),
            }
        } else {
            self.pins.activity.set_high().void_unwrap();
        }
    }

    /// Drain one received datagram into `buffer`, if any
    pub fn received(&mut self, buffer: &mut [u8]) -> Option<(usize, IpEndpoint)> {
        let socket = self.sockets.get_mut::<udp::Socket>(self.udp_handle);
        match socket.recv_slice(buffer) {
            Ok((len, metadata)) => Some((len, metadata.endpoint)),
            Err(_) => None,
        }
    }

    /// Number of beacons handed to the stack so far
    pub fn beacons_sent(&self) -> u32 {
        self.sequence
    }
}

/// Beacon payload: big-endian sequence number, zero filled
fn beacon_payload(sequence: u32) -> [u8; BEACON_LEN] {
    let mut payload = [0; BEACON_LEN];
    payload[..4].copy_from_slice(&sequence.to_be_bytes());
    payload
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn beacon_payload_carries_the_sequence() {
        let payload = beacon_payload(0x0102_0304);
        assert_eq!(payload.len(), BEACON_LEN);
        assert_eq!(&payload[..4], &[1, 2, 3, 4]);
        assert!(payload[4..].iter().all(|&b| b == 0));
    }
}
