// ============================================
// File: crates/tunwarden-transport/src/packet.rs
// ============================================
//! # IP Packet
//!
//! ## Creation Reason
//! Packets read from a TUN device are raw IP datagrams. The host wants to see
//! who is talking to whom without decoding them itself, so the header is
//! parsed once when the packet is created.
//!
//! ## Main Functionality
//! - `Packet`: Raw payload plus parsed `PacketMeta`
//! - `PacketMeta`: Capture time, endpoints, protocol and size
//! - `Protocol` / `Endpoint`: Parsed header fields
//!
//! ## Header Layout
//! ```text
//! IPv4                                  IPv6
//! ┌─────┬─────┬──────┬───────┐          ┌─────┬──────┬──────┬──────┐
//! │ ver │ ihl │ ...  │ proto │          │ ver │ ...  │ next │ ...  │
//! │ [0]>>4   [0]&0xf │  [9]  │          │ [0]>>4     │  [6] │      │
//! ├─────┴─────┴──────┴───────┤          ├────────────┴──────┴──────┤
//! │ src [12..16] dst [16..20]│          │ src [8..24]  dst [24..40]│
//! ├──────────────────────────┤          ├──────────────────────────┤
//! │ L4 ports at [ihl..ihl+4] │          │ L4 ports at [40..44]     │
//! └──────────────────────────┘          └──────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Malformed packets are not errors; they parse as `Protocol::Unknown`
//! - IPv6 extension headers are not followed
//! - Non-first IPv4 fragments carry no ports
//!
//! ## Last Modified
//! v0.1.0 - Initial packet parsing

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use serde::{Serialize, Serializer};

use tunwarden_common::time::unix_timestamp_millis;

// ============================================
// Constants
// ============================================

const IPV4_MIN_HEADER: usize = 20;
const IPV6_HEADER: usize = 40;

const PROTO_ICMP: u8 = 1;
const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;
const PROTO_ICMPV6: u8 = 58;

// ============================================
// Protocol
// ============================================

/// Transport protocol carried by an IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP (6).
    Tcp,
    /// UDP (17).
    Udp,
    /// ICMP (1).
    Icmp,
    /// ICMPv6 (58).
    Icmpv6,
    /// Any other IP protocol number.
    Other(u8),
    /// Not a parseable IP packet.
    Unknown,
}

impl Protocol {
    /// Maps an IP protocol / next-header number.
    #[must_use]
    pub const fn from_number(n: u8) -> Self {
        match n {
            PROTO_TCP => Self::Tcp,
            PROTO_UDP => Self::Udp,
            PROTO_ICMP => Self::Icmp,
            PROTO_ICMPV6 => Self::Icmpv6,
            other => Self::Other(other),
        }
    }

    /// Returns `true` for protocols whose first four payload bytes are ports.
    #[must_use]
    pub const fn has_ports(&self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
            Self::Icmp => f.write_str("icmp"),
            Self::Icmpv6 => f.write_str("icmpv6"),
            Self::Other(n) => write!(f, "ip-{n}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================
// Endpoint
// ============================================

/// One side of a packet's flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// IP address.
    pub ip: IpAddr,
    /// Port, for TCP and UDP.
    pub port: Option<u16>,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port) {
            (IpAddr::V4(ip), Some(port)) => write!(f, "{ip}:{port}"),
            (IpAddr::V6(ip), Some(port)) => write!(f, "[{ip}]:{port}"),
            (ip, None) => write!(f, "{ip}"),
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================
// PacketMeta
// ============================================

/// Metadata parsed from a packet's IP header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketMeta {
    /// Capture time in unix milliseconds.
    pub timestamp: i64,
    /// Sender, if the header parsed.
    pub source: Option<Endpoint>,
    /// Receiver, if the header parsed.
    pub destination: Option<Endpoint>,
    /// Carried protocol.
    pub protocol: Protocol,
    /// Total packet size in bytes.
    pub size: usize,
}

impl PacketMeta {
    /// Parses the IP header of `data`.
    #[must_use]
    pub fn parse(data: &[u8]) -> Self {
        let (source, destination, protocol) = match data.first().map(|b| b >> 4) {
            Some(4) => parse_ipv4(data),
            Some(6) => parse_ipv6(data),
            _ => None,
        }
        .map_or((None, None, Protocol::Unknown), |(src, dst, proto)| {
            (Some(src), Some(dst), proto)
        });

        Self {
            timestamp: unix_timestamp_millis(),
            source,
            destination,
            protocol,
            size: data.len(),
        }
    }
}

fn parse_ipv4(data: &[u8]) -> Option<(Endpoint, Endpoint, Protocol)> {
    if data.len() < IPV4_MIN_HEADER {
        return None;
    }
    let ihl = usize::from(data[0] & 0x0f) * 4;
    if ihl < IPV4_MIN_HEADER || data.len() < ihl {
        return None;
    }

    let protocol = Protocol::from_number(data[9]);
    let src = IpAddr::V4(Ipv4Addr::new(data[12], data[13], data[14], data[15]));
    let dst = IpAddr::V4(Ipv4Addr::new(data[16], data[17], data[18], data[19]));

    let fragment_offset = u16::from_be_bytes([data[6] & 0x1f, data[7]]);
    let ports = if fragment_offset == 0 && protocol.has_ports() {
        read_ports(data, ihl)
    } else {
        None
    };

    Some(with_ports(src, dst, protocol, ports))
}

fn parse_ipv6(data: &[u8]) -> Option<(Endpoint, Endpoint, Protocol)> {
    if data.len() < IPV6_HEADER {
        return None;
    }

    let protocol = Protocol::from_number(data[6]);
    let src: [u8; 16] = data[8..24].try_into().ok()?;
    let dst: [u8; 16] = data[24..40].try_into().ok()?;

    let ports = if protocol.has_ports() {
        read_ports(data, IPV6_HEADER)
    } else {
        None
    };

    Some(with_ports(
        IpAddr::V6(Ipv6Addr::from(src)),
        IpAddr::V6(Ipv6Addr::from(dst)),
        protocol,
        ports,
    ))
}

fn read_ports(data: &[u8], offset: usize) -> Option<(u16, u16)> {
    let l4 = data.get(offset..offset + 4)?;
    Some((
        u16::from_be_bytes([l4[0], l4[1]]),
        u16::from_be_bytes([l4[2], l4[3]]),
    ))
}

fn with_ports(
    src: IpAddr,
    dst: IpAddr,
    protocol: Protocol,
    ports: Option<(u16, u16)>,
) -> (Endpoint, Endpoint, Protocol) {
    let (src_port, dst_port) = ports.map_or((None, None), |(s, d)| (Some(s), Some(d)));
    (
        Endpoint { ip: src, port: src_port },
        Endpoint { ip: dst, port: dst_port },
        protocol,
    )
}

// ============================================
// Packet
// ============================================

/// A raw IP packet with its parsed header metadata.
///
/// # Example
/// ```
/// use tunwarden_transport::packet::{Packet, Protocol};
///
/// let packet = Packet::new(vec![0u8; 8]);
/// assert_eq!(packet.len(), 8);
/// assert_eq!(packet.meta().protocol, Protocol::Unknown);
/// ```
#[derive(Debug, Clone)]
pub struct Packet {
    payload: Bytes,
    meta: PacketMeta,
}

impl Packet {
    /// Wraps a payload and parses its header.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let meta = PacketMeta::parse(&payload);
        Self { payload, meta }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the parsed metadata.
    #[must_use]
    pub const fn meta(&self) -> &PacketMeta {
        &self.meta
    }

    /// Returns the packet size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` for a zero-length packet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consumes the packet, returning its bytes.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_udp() -> Vec<u8> {
        let mut p = vec![0u8; 28];
        p[0] = 0x45;
        p[9] = PROTO_UDP;
        p[12..16].copy_from_slice(&[10, 0, 0, 2]);
        p[16..20].copy_from_slice(&[8, 8, 8, 8]);
        p[20..22].copy_from_slice(&12345u16.to_be_bytes());
        p[22..24].copy_from_slice(&53u16.to_be_bytes());
        p
    }

    #[test]
    fn test_parse_ipv4_udp() {
        let packet = Packet::new(ipv4_udp());
        let meta = packet.meta();
        assert_eq!(meta.protocol, Protocol::Udp);
        assert_eq!(meta.size, 28);
        assert_eq!(meta.source.unwrap().to_string(), "10.0.0.2:12345");
        assert_eq!(meta.destination.unwrap().to_string(), "8.8.8.8:53");
        assert!(meta.timestamp > 0);
    }

    #[test]
    fn test_parse_ipv4_fragment_has_no_ports() {
        let mut raw = ipv4_udp();
        raw[7] = 0x10;
        let meta = PacketMeta::parse(&raw);
        assert_eq!(meta.source.unwrap().port, None);
        assert_eq!(meta.destination.unwrap().to_string(), "8.8.8.8");
    }

    #[test]
    fn test_parse_ipv6_tcp() {
        let mut p = vec![0u8; 60];
        p[0] = 0x60;
        p[6] = PROTO_TCP;
        p[23] = 1; // ::1
        p[24] = 0xfd;
        p[39] = 2; // fd00::2
        p[40..42].copy_from_slice(&443u16.to_be_bytes());
        p[42..44].copy_from_slice(&50000u16.to_be_bytes());

        let meta = PacketMeta::parse(&p);
        assert_eq!(meta.protocol, Protocol::Tcp);
        assert_eq!(meta.source.unwrap().to_string(), "[::1]:443");
        assert_eq!(meta.destination.unwrap().to_string(), "[fd00::2]:50000");
    }

    #[test]
    fn test_parse_icmp_and_other() {
        let mut raw = ipv4_udp();
        raw[9] = PROTO_ICMP;
        let meta = PacketMeta::parse(&raw);
        assert_eq!(meta.protocol, Protocol::Icmp);
        assert_eq!(meta.source.unwrap().port, None);

        raw[9] = 47;
        assert_eq!(PacketMeta::parse(&raw).protocol.to_string(), "ip-47");
    }

    #[test]
    fn test_malformed_is_unknown() {
        for raw in [vec![], vec![0x45; 10], vec![0x4f; 20], vec![0x60; 39], vec![0x00; 100]] {
            let meta = PacketMeta::parse(&raw);
            assert_eq!(meta.protocol, Protocol::Unknown);
            assert!(meta.source.is_none());
            assert_eq!(meta.size, raw.len());
        }
    }

    #[test]
    fn test_meta_serializes_as_strings() {
        let meta = PacketMeta::parse(&ipv4_udp());
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["protocol"], "udp");
        assert_eq!(json["source"], "10.0.0.2:12345");
        assert_eq!(json["size"], 28);
    }
}
