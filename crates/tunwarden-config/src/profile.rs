// ============================================
// File: crates/tunwarden-config/src/profile.rs
// ============================================
//! # Proxy Profile Schema
//!
//! ## Creation Reason
//! The store keeps documents untyped. Callers that want guarantees about the
//! proxy sections (mode, servers, groups, DNS) get a typed view here plus a
//! strict validation pass that names the offending entry.
//!
//! ## Main Functionality
//! - `ProxyProfile`: Typed view of the well-known sections
//! - `ProxyMode`: Rule / Global / Direct
//! - `validate()`: Semantic checks returning the typed view
//!
//! ## Validation Rules
//! | Field                      | Rule                                   |
//! |----------------------------|----------------------------------------|
//! | `proxy.mode`               | empty, or Rule/Global/Direct (any case)|
//! | `proxy.servers[i].name`    | non-empty                              |
//! | `proxy.servers[i].type`    | non-empty                              |
//! | `proxy.servers[i].port`    | 1..=65535                              |
//! | `proxy.groups[i].name`     | non-empty                              |
//! | `proxy.groups[i].type`     | non-empty                              |
//! | `dns.nameserver`           | non-empty when `dns.enable`            |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Unknown keys are ignored, missing sections take defaults
//! - A key present with the wrong type fails the typed view
//!
//! ## Last Modified
//! v0.1.0 - Initial profile schema

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tunwarden_common::types::InterfaceParams;

use crate::error::{ConfigError, Result};
use crate::value::Document;

// ============================================
// ProxyMode
// ============================================

/// Traffic routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyMode {
    /// Route by rules.
    Rule,
    /// Send everything through the proxy.
    Global,
    /// Bypass the proxy.
    Direct,
}

impl FromStr for ProxyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Rule" => Ok(Self::Rule),
            "Global" => Ok(Self::Global),
            "Direct" => Ok(Self::Direct),
            _ => Err(ConfigError::validation(
                "proxy.mode",
                format!("unsupported proxy mode '{s}', expected Rule, Global or Direct"),
            )),
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => f.write_str("Rule"),
            Self::Global => f.write_str("Global"),
            Self::Direct => f.write_str("Direct"),
        }
    }
}

// ============================================
// Sections
// ============================================

/// Typed view of a configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyProfile {
    /// Document format version.
    pub version: String,
    /// Proxy section.
    pub proxy: ProxySection,
    /// DNS section.
    pub dns: DnsSection,
    /// Virtual interface section.
    pub tun: TunSection,
    /// Data-plane tuning.
    pub engine: EngineSection,
    /// Logging section.
    pub log: LogSection,
}

/// `[proxy]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxySection {
    /// Raw mode string; see [`ProxyProfile::mode`].
    pub mode: String,
    /// Accept connections from the LAN.
    pub allow_lan: bool,
    /// Listen address for local proxies.
    pub bind_address: String,
    /// Upstream servers.
    pub servers: Vec<ServerEntry>,
    /// Server groups.
    pub groups: Vec<GroupEntry>,
}

/// One entry of `proxy.servers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerEntry {
    /// Display name.
    pub name: String,
    /// Protocol type (e.g. "ss", "vmess").
    #[serde(rename = "type")]
    pub kind: String,
    /// Server host.
    pub server: String,
    /// Server port; kept wide so out-of-range values reach validation.
    pub port: i64,
}

/// One entry of `proxy.groups`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GroupEntry {
    /// Group name.
    pub name: String,
    /// Group type (e.g. "select", "url-test").
    #[serde(rename = "type")]
    pub kind: String,
    /// Member names.
    pub proxies: Vec<String>,
}

/// `[dns]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DnsSection {
    /// Enable the built-in resolver.
    pub enable: bool,
    /// Resolve AAAA records.
    pub ipv6: bool,
    /// Primary nameservers.
    pub nameserver: Vec<String>,
    /// Fallback nameservers.
    pub fallback: Vec<String>,
}

/// `[tun]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TunSection {
    /// Interface name.
    pub name: String,
    /// Interface MTU.
    pub mtu: i64,
    /// Interface address, `ip` or `ip/prefix`.
    pub address: String,
}

impl Default for TunSection {
    fn default() -> Self {
        Self {
            name: crate::defaults::DEFAULT_TUN_NAME.to_string(),
            mtu: i64::from(tunwarden_common::types::DEFAULT_MTU),
            address: crate::defaults::DEFAULT_TUN_ADDRESS.to_string(),
        }
    }
}

impl TunSection {
    /// Converts to checked interface parameters.
    ///
    /// # Errors
    /// Returns `Common` with the offending parameter on bad name, MTU or
    /// address.
    pub fn interface_params(&self) -> Result<InterfaceParams> {
        Ok(InterfaceParams::parse(
            &self.name,
            &self.mtu.to_string(),
            &self.address,
        )?)
    }
}

/// `[engine]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineSection {
    /// Data-plane tick in milliseconds.
    pub tick_interval_ms: i64,
    /// Packets drained per tick.
    pub burst: i64,
    /// Stop waits this long for the loop before aborting it.
    pub join_timeout_ms: i64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: crate::defaults::DEFAULT_TICK_INTERVAL_MS,
            burst: crate::defaults::DEFAULT_BURST,
            join_timeout_ms: crate::defaults::DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================
// ProxyProfile
// ============================================

impl ProxyProfile {
    /// Builds the typed view without semantic checks.
    ///
    /// # Errors
    /// Returns `Validation` if a known key has the wrong type.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let json = serde_json::to_value(doc).map_err(|e| ConfigError::serialize("document", e))?;
        serde_json::from_value(json).map_err(|e| ConfigError::validation("document", e.to_string()))
    }

    /// Returns the parsed mode, `None` when unset.
    ///
    /// # Errors
    /// Returns `Validation` for an unknown mode.
    pub fn mode(&self) -> Result<Option<ProxyMode>> {
        match self.proxy.mode.trim() {
            "" => Ok(None),
            raw => raw.parse().map(Some),
        }
    }

    /// Runs the semantic checks.
    ///
    /// # Errors
    /// Returns the first `Validation` error found.
    pub fn validate(&self) -> Result<()> {
        self.mode()?;

        for (i, server) in self.proxy.servers.iter().enumerate() {
            if server.name.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("proxy.servers[{i}].name"),
                    "server name is required",
                ));
            }
            if server.kind.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("proxy.servers[{i}].type"),
                    format!("server '{}' has no type", server.name),
                ));
            }
            if !(1..=65535).contains(&server.port) {
                return Err(ConfigError::validation(
                    format!("proxy.servers[{i}].port"),
                    format!("server '{}' port {} is not in [1, 65535]", server.name, server.port),
                ));
            }
        }

        for (i, group) in self.proxy.groups.iter().enumerate() {
            if group.name.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("proxy.groups[{i}].name"),
                    "group name is required",
                ));
            }
            if group.kind.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("proxy.groups[{i}].type"),
                    format!("group '{}' has no type", group.name),
                ));
            }
        }

        if self.dns.enable && self.dns.nameserver.is_empty() {
            return Err(ConfigError::validation(
                "dns.nameserver",
                "at least one nameserver is required when dns is enabled",
            ));
        }

        Ok(())
    }
}

/// Validates a document and returns its typed view.
///
/// # Errors
/// Returns `Validation` naming the first offending entry.
pub fn validate(doc: &Document) -> Result<ProxyProfile> {
    let profile = ProxyProfile::from_document(doc)?;
    profile.validate()?;
    Ok(profile)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn with_server(port: i64) -> Document {
        let server = Document::new()
            .with("name", "hk-01")
            .with("type", "ss")
            .with("server", "hk.example.com")
            .with("port", port);
        Document::new().with(
            "proxy",
            Document::new().with("mode", "Rule").with("servers", vec![Value::from(server)]),
        )
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_port_boundaries() {
        assert_eq!(field_of(validate(&with_server(0)).unwrap_err()), "proxy.servers[0].port");
        assert!(validate(&with_server(1)).is_ok());
        assert!(validate(&with_server(65535)).is_ok());
        assert_eq!(
            field_of(validate(&with_server(65536)).unwrap_err()),
            "proxy.servers[0].port"
        );
    }

    #[test]
    fn test_mode_matches_exact_case() {
        for mode in ["Rule", "Global", "Direct", ""] {
            let doc = Document::new().with("proxy", Document::new().with("mode", mode));
            assert!(validate(&doc).is_ok(), "mode {mode:?} should be accepted");
        }
        for mode in ["rule", "GLOBAL", "direct", "Smart"] {
            let doc = Document::new().with("proxy", Document::new().with("mode", mode));
            assert_eq!(field_of(validate(&doc).unwrap_err()), "proxy.mode", "mode {mode:?}");
        }
        assert_eq!("Global".parse::<ProxyMode>().unwrap(), ProxyMode::Global);
        assert!("global".parse::<ProxyMode>().is_err());
    }

    #[test]
    fn test_group_requires_name_and_type() {
        let group = Document::new().with("name", "").with("type", "select");
        let doc = Document::new().with(
            "proxy",
            Document::new().with("groups", vec![Value::from(group)]),
        );
        assert_eq!(field_of(validate(&doc).unwrap_err()), "proxy.groups[0].name");

        let group = Document::new().with("name", "auto");
        let doc = Document::new().with(
            "proxy",
            Document::new().with("groups", vec![Value::from(group)]),
        );
        assert_eq!(field_of(validate(&doc).unwrap_err()), "proxy.groups[0].type");
    }

    #[test]
    fn test_dns_requires_nameserver() {
        let doc = Document::new().with("dns", Document::new().with("enable", true));
        assert_eq!(field_of(validate(&doc).unwrap_err()), "dns.nameserver");

        let doc = Document::new().with(
            "dns",
            Document::new()
                .with("enable", true)
                .with("nameserver", vec![Value::from("1.1.1.1")]),
        );
        assert!(validate(&doc).is_ok());

        let doc = Document::new().with("dns", Document::new().with("enable", false));
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_wrong_type_is_validation_error() {
        let doc = Document::new().with("dns", Document::new().with("enable", "yes"));
        assert!(matches!(validate(&doc), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_tun_section_to_params() {
        let profile = ProxyProfile::from_document(&Document::new()).unwrap();
        let params = profile.tun.interface_params().unwrap();
        assert_eq!(params.name, "utun0");
        assert_eq!(params.mtu, 1500);

        let doc = Document::new().with("tun", Document::new().with("mtu", 100_i64));
        let profile = ProxyProfile::from_document(&doc).unwrap();
        assert!(profile.tun.interface_params().is_err());
    }
}
