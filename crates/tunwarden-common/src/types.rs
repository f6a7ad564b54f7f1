// ============================================
// File: crates/tunwarden-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Interface parameters arrive from the host as loose strings. They are
//! checked once here and carried as typed values afterwards.
//!
//! ## Main Functionality
//! - `Direction`: Packet flow direction for accounting
//! - `InterfaceAddress`: IP address with prefix length
//! - `InterfaceParams`: Name, MTU and address of the virtual interface
//!
//! ## ⚠️ Important Note for Next Developer
//! - Interface names are limited to 15 bytes (Linux `IFNAMSIZ - 1`)
//! - MTU bounds match what the TUN layer accepts
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

// ============================================
// Constants
// ============================================

/// Maximum interface name length in bytes.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Smallest MTU accepted for the interface.
pub const MIN_MTU: u16 = 576;

/// Largest MTU accepted for the interface.
pub const MAX_MTU: u16 = 9000;

/// MTU used when none is supplied.
pub const DEFAULT_MTU: u16 = 1500;

/// Interface name used when none is configured.
pub const DEFAULT_INTERFACE_NAME: &str = "utun0";

// ============================================
// Direction
// ============================================

/// Packet flow direction relative to the interface.
///
/// `In` is traffic read from the interface, `Out` is traffic written to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Packet read from the interface.
    In,
    /// Packet written to the interface.
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

// ============================================
// InterfaceAddress
// ============================================

/// IP address assigned to the interface, with its prefix length.
///
/// # Example
/// ```
/// use tunwarden_common::types::InterfaceAddress;
///
/// let addr: InterfaceAddress = "10.0.0.2/24".parse().unwrap();
/// assert_eq!(addr.prefix(), 24);
///
/// // A bare address is a host route.
/// let host: InterfaceAddress = "10.0.0.2".parse().unwrap();
/// assert_eq!(host.prefix(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceAddress {
    ip: IpAddr,
    prefix: u8,
}

impl InterfaceAddress {
    /// Creates an address, checking the prefix against the address family.
    ///
    /// # Errors
    /// Returns `OutOfRange` if the prefix is longer than the address.
    pub fn new(ip: IpAddr, prefix: u8) -> Result<Self> {
        let max = Self::max_prefix(ip);
        if prefix > max {
            return Err(CommonError::out_of_range("address.prefix", prefix, 0, max));
        }
        Ok(Self { ip, prefix })
    }

    /// Returns the IP address.
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    const fn max_prefix(ip: IpAddr) -> u8 {
        match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }
}

impl FromStr for InterfaceAddress {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (ip_part, prefix_part) = match s.split_once('/') {
            Some((ip, prefix)) => (ip, Some(prefix)),
            None => (s, None),
        };

        let ip: IpAddr = ip_part
            .parse()
            .map_err(|_| CommonError::invalid_input("address", format!("'{s}' is not an IP address")))?;

        let prefix = match prefix_part {
            Some(raw) => raw.parse::<u8>().map_err(|_| {
                CommonError::invalid_input("address", format!("invalid prefix length '{raw}'"))
            })?,
            None => Self::max_prefix(ip),
        };

        Self::new(ip, prefix)
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix)
    }
}

impl Serialize for InterfaceAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InterfaceAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// InterfaceParams
// ============================================

/// Identity and link parameters of the virtual interface.
///
/// An empty `name` means no interface identity has been established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceParams {
    /// Interface name (e.g. "utun0"); empty when not created.
    pub name: String,
    /// Link MTU.
    pub mtu: u16,
    /// Assigned address, if any.
    pub address: Option<InterfaceAddress>,
}

impl InterfaceParams {
    /// Creates parameters with the given name and defaults for the rest.
    ///
    /// # Errors
    /// Returns error if the name is longer than 15 bytes.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    /// Parses host-supplied strings.
    ///
    /// An empty `mtu` selects [`DEFAULT_MTU`]; an empty `address` clears the
    /// address.
    ///
    /// # Errors
    /// Returns `InvalidInput`/`OutOfRange` naming the offending parameter.
    pub fn parse(name: &str, mtu: &str, address: &str) -> Result<Self> {
        let name = name.trim();
        validate_name(name)?;

        let mtu = match mtu.trim() {
            "" => DEFAULT_MTU,
            raw => parse_mtu(raw)?,
        };

        let address = match address.trim() {
            "" => None,
            raw => Some(raw.parse()?),
        };

        Ok(Self {
            name: name.to_string(),
            mtu,
            address,
        })
    }

    /// Returns `true` if an interface identity is set.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

impl Default for InterfaceParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            mtu: DEFAULT_MTU,
            address: None,
        }
    }
}

/// Checks an interface name. Empty names are accepted here; callers decide
/// whether an identity is required.
///
/// # Errors
/// Returns `InvalidInput` for overlong names or names with whitespace, `/`
/// or NUL.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(CommonError::invalid_input(
            "name",
            format!("interface name cannot exceed {MAX_INTERFACE_NAME_LEN} bytes"),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\0') {
        return Err(CommonError::invalid_input(
            "name",
            "interface name cannot contain whitespace, '/' or NUL",
        ));
    }
    Ok(())
}

/// Parses and range-checks an MTU string.
///
/// # Errors
/// Returns `InvalidInput` if not numeric, `OutOfRange` outside 576..=9000.
pub fn parse_mtu(raw: &str) -> Result<u16> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| CommonError::invalid_input("mtu", format!("'{raw}' is not a number")))?;
    check_mtu(value)
}

/// Range-checks a numeric MTU.
///
/// # Errors
/// Returns `OutOfRange` outside 576..=9000.
pub fn check_mtu(value: u32) -> Result<u16> {
    match u16::try_from(value) {
        Ok(mtu) if (MIN_MTU..=MAX_MTU).contains(&mtu) => Ok(mtu),
        _ => Err(CommonError::out_of_range("mtu", value, MIN_MTU, MAX_MTU)),
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_address_parsing() {
        let addr: InterfaceAddress = "10.0.0.2/24".parse().unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(addr.prefix(), 24);
        assert_eq!(addr.to_string(), "10.0.0.2/24");

        let v6: InterfaceAddress = "fd00::2".parse().unwrap();
        assert_eq!(v6.ip(), IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 2)));
        assert_eq!(v6.prefix(), 128);

        assert!("10.0.0.2/33".parse::<InterfaceAddress>().is_err());
        assert!("fd00::2/129".parse::<InterfaceAddress>().is_err());
        assert!("10.0.0.300".parse::<InterfaceAddress>().is_err());
        assert!("10.0.0.2/x".parse::<InterfaceAddress>().is_err());
    }

    #[test]
    fn test_params_parse() {
        let params = InterfaceParams::parse("utun0", "1400", "10.0.0.2/32").unwrap();
        assert_eq!(params.name, "utun0");
        assert_eq!(params.mtu, 1400);
        assert_eq!(params.address.unwrap().prefix(), 32);

        let params = InterfaceParams::parse("utun0", "", "").unwrap();
        assert_eq!(params.mtu, DEFAULT_MTU);
        assert!(params.address.is_none());
    }

    #[test]
    fn test_params_rejects_bad_input() {
        assert!(InterfaceParams::parse("utun0", "abc", "").is_err());
        assert!(InterfaceParams::parse("utun0", "100", "").is_err());
        assert!(InterfaceParams::parse("utun0", "10000", "").is_err());
        assert!(InterfaceParams::parse(&"a".repeat(16), "1500", "").is_err());
        assert!(InterfaceParams::parse("bad name", "1500", "").is_err());
        assert!(InterfaceParams::parse("utun0", "1500", "nowhere").is_err());
    }

    #[test]
    fn test_mtu_bounds() {
        assert_eq!(check_mtu(576).unwrap(), 576);
        assert_eq!(check_mtu(9000).unwrap(), 9000);
        assert!(check_mtu(575).is_err());
        assert!(check_mtu(9001).is_err());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::In.to_string(), "in");
        assert_eq!(Direction::Out.to_string(), "out");
    }
}
