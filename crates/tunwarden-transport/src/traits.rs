// ============================================
// File: crates/tunwarden-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The data plane is written against capabilities, not devices. Reading,
//! writing and deciding what to do with a packet are three separate traits so
//! tests can swap any one of them and so a device can be shared between the
//! loop and host calls through `Arc`.
//!
//! ## Main Functionality
//! - `PacketSource`: Non-blocking packet poll
//! - `PacketSink`: Packet write
//! - `PacketProcessor`: External network stack returning a `Verdict`
//! - `TunDevice`: Source + sink with link management
//! - `TunConfig`: Device creation parameters
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - `recv` returns `Ok(None)` when nothing is queued; it must not park
//!   waiting for traffic
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::fmt;

use async_trait::async_trait;

use tunwarden_common::types::{check_mtu, validate_name, InterfaceAddress, InterfaceParams, DEFAULT_MTU};

use crate::error::{Result, TransportError};
use crate::packet::Packet;

// ============================================
// PacketSource / PacketSink
// ============================================

/// Read side of a packet device.
#[async_trait]
pub trait PacketSource: Send + Sync {
    /// Polls for one packet.
    ///
    /// # Returns
    /// `Ok(Some(packet))` if one was queued, `Ok(None)` otherwise.
    ///
    /// # Errors
    /// Returns error if the device read fails.
    async fn recv(&self) -> Result<Option<Packet>>;
}

/// Write side of a packet device.
#[async_trait]
pub trait PacketSink: Send + Sync {
    /// Writes one raw IP packet.
    ///
    /// # Returns
    /// Number of bytes written
    ///
    /// # Errors
    /// Returns error if the device write fails.
    async fn send(&self, packet: &[u8]) -> Result<usize>;
}

// ============================================
// PacketProcessor
// ============================================

/// What the processor decided for a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Discard the packet.
    Drop,
    /// Forward without a proxy.
    Direct,
    /// Forward through the named upstream.
    Proxy {
        /// Upstream proxy or group name
        upstream: String,
    },
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Direct => f.write_str("direct"),
            Self::Proxy { upstream } => write!(f, "proxy({upstream})"),
        }
    }
}

/// Userspace network stack that consumes intercepted packets.
///
/// Forwarding is the processor's job; the data plane only accounts for the
/// verdict.
///
/// # Example
/// ```ignore
/// struct DnsOnly;
///
/// #[async_trait]
/// impl PacketProcessor for DnsOnly {
///     async fn process(&self, packet: &Packet) -> Result<Verdict> {
///         let is_dns = packet.meta().destination.and_then(|d| d.port) == Some(53);
///         Ok(if is_dns { Verdict::Direct } else { Verdict::Drop })
///     }
/// }
/// ```
#[async_trait]
pub trait PacketProcessor: Send + Sync {
    /// Handles one inbound packet.
    ///
    /// # Errors
    /// Any error is logged by the caller and the packet counted as dropped.
    async fn process(&self, packet: &Packet) -> Result<Verdict>;
}

// ============================================
// TunDevice Trait
// ============================================

/// A virtual interface that is both source and sink.
///
/// # Data Format
/// Data read from and written to the TUN device is raw IP packets
/// (no Ethernet headers).
#[async_trait]
pub trait TunDevice: PacketSource + PacketSink {
    /// Returns the device name.
    fn name(&self) -> &str;

    /// Returns the MTU (Maximum Transmission Unit).
    fn mtu(&self) -> u16;

    /// Returns the address assigned at creation, if any.
    fn address(&self) -> Option<InterfaceAddress>;

    /// Brings the device up (activates it).
    ///
    /// # Errors
    /// Returns error if activation fails
    async fn up(&self) -> Result<()>;

    /// Brings the device down (deactivates it).
    ///
    /// # Errors
    /// Returns error if deactivation fails
    async fn down(&self) -> Result<()>;

    /// Returns `true` if the device is up and active.
    fn is_up(&self) -> bool;
}

// ============================================
// TunConfig
// ============================================

/// Configuration for TUN device creation.
///
/// # Example
/// ```
/// use tunwarden_transport::traits::TunConfig;
///
/// let config = TunConfig::new("utun0")
///     .with_address("10.0.0.2/32".parse().unwrap())
///     .with_mtu(1400);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunConfig {
    /// Device name (e.g., "utun0").
    pub name: String,
    /// Address to assign to the device.
    pub address: Option<InterfaceAddress>,
    /// MTU size.
    pub mtu: u16,
}

impl TunConfig {
    /// Creates a new TUN configuration with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            mtu: DEFAULT_MTU,
        }
    }

    /// Builds a configuration from checked interface parameters.
    #[must_use]
    pub fn from_params(params: &InterfaceParams) -> Self {
        Self {
            name: params.name.clone(),
            address: params.address,
            mtu: params.mtu,
        }
    }

    /// Sets the address.
    #[must_use]
    pub const fn with_address(mut self, address: InterfaceAddress) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets the MTU.
    #[must_use]
    pub const fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an empty name, `Common` for an overlong
    /// name or an MTU outside 576..=9000.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TransportError::invalid_config(
                "name",
                "device name cannot be empty",
            ));
        }
        validate_name(&self.name)?;
        check_mtu(u32::from(self.mtu))?;
        Ok(())
    }
}

impl Default for TunConfig {
    fn default() -> Self {
        Self::new(tunwarden_common::types::DEFAULT_INTERFACE_NAME)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tun_config_defaults() {
        let config = TunConfig::new("tun0");

        assert_eq!(config.name, "tun0");
        assert!(config.address.is_none());
        assert_eq!(config.mtu, 1500);
    }

    #[test]
    fn test_tun_config_from_params() {
        let params = InterfaceParams::parse("utun0", "1400", "10.0.0.2/32").unwrap();
        let config = TunConfig::from_params(&params);

        assert_eq!(config.name, "utun0");
        assert_eq!(config.mtu, 1400);
        assert_eq!(config.address.unwrap().to_string(), "10.0.0.2/32");
    }

    #[test]
    fn test_tun_config_validation() {
        assert!(TunConfig::new("tun0").validate().is_ok());
        assert!(TunConfig::default().validate().is_ok());

        // Empty name
        assert!(TunConfig::new("").validate().is_err());

        // Name too long
        assert!(TunConfig::new("a".repeat(20)).validate().is_err());

        // MTU out of range
        assert!(TunConfig::new("tun0").with_mtu(100).validate().is_err());
        assert!(TunConfig::new("tun0").with_mtu(10000).validate().is_err());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Drop.to_string(), "drop");
        assert_eq!(
            Verdict::Proxy { upstream: "hk-01".into() }.to_string(),
            "proxy(hk-01)"
        );
    }
}
