//! Ethernet MAC configuration

pub use super::descriptor::ChecksumMode;

/// Configuration for the Ethernet MAC
///
/// Mutable between [`EthConfigurable::new`] and
/// [`EthConfigurable::finalize`]; the defaults reproduce a 100 Mbit/s full
/// duplex RMII setup with pad/CRC stripping and no checksum offload.
///
/// [`EthConfigurable::new`]: super::EthConfigurable::new
/// [`EthConfigurable::finalize`]: super::EthConfigurable::finalize
#[derive(Copy, Clone)]
pub struct EthConfig {
    /// Station MAC address, should be unique in the network
    pub mac_address: [u8; 6],
    /// Line speed of the 10/100 interface
    pub speed: LineSpeed,
    /// Duplex mode
    pub duplex: Duplex,
    /// Checksum insertion/checking offload
    pub checksum: ChecksumMode,
    /// MAC-internal loopback
    pub loopback: bool,
    /// Receive every frame instead of hash-filtered unicast
    pub promiscuous: bool,
}

impl EthConfig {
    /// Create an instance
    ///
    /// The MAC address must be provided, all other settings come
    /// pre-populated with default values.
    pub fn new(mac_address: [u8; 6]) -> Self {
        Self {
            mac_address,
            speed: LineSpeed::Mbit100,
            duplex: Duplex::Full,
            checksum: ChecksumMode::Bypass,
            loopback: false,
            promiscuous: false,
        }
    }
}

/// Line speed of the 10/100 Mbit/s interface
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LineSpeed {
    /// 10 Mbit/s
    Mbit10,
    /// 100 Mbit/s
    Mbit100,
}

/// Duplex mode
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Duplex {
    /// Half duplex
    Half,
    /// Full duplex
    Full,
}

/// Errors that may occur while bringing the MAC up
#[derive(Debug)]
pub enum ConfigurationError {
    /// The DMA software reset did not complete within the bounded wait
    ResetTimeout,
}
