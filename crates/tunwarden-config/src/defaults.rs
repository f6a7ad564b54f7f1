// ============================================
// File: crates/tunwarden-config/src/defaults.rs
// ============================================
//! # Default Document
//!
//! ## Creation Reason
//! Loading a path that does not exist provisions this document on disk so a
//! fresh install starts with a usable configuration.
//!
//! ## Main Functionality
//! - `DEFAULT_CONFIG_PATH`: Path used when the caller gives none
//! - `default_document()`: The provisioned document
//!
//! ## ⚠️ Important Note for Next Developer
//! - The values here are starting points; nothing depends on them
//! - The document must pass `profile::validate`
//! - Engine keys must match `profile::EngineSection`
//!
//! ## Last Modified
//! v0.1.0 - Initial default document

use tunwarden_common::time::Timestamp;

use crate::value::{Document, Value};

/// Path used when no configuration path is given.
pub const DEFAULT_CONFIG_PATH: &str = "tunwarden.toml";

/// Default interface name.
pub const DEFAULT_TUN_NAME: &str = tunwarden_common::types::DEFAULT_INTERFACE_NAME;

/// Default interface address.
pub const DEFAULT_TUN_ADDRESS: &str = "10.0.0.2/32";

/// Default data-plane tick in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: i64 = 1000;

/// Default maximum packets drained per tick.
pub const DEFAULT_BURST: i64 = 64;

/// Default time to wait for the loop to exit on stop, in milliseconds.
pub const DEFAULT_JOIN_TIMEOUT_MS: i64 = 5000;

/// Builds the document written when a configuration file is missing.
#[must_use]
pub fn default_document() -> Document {
    let proxy = Document::new()
        .with("mode", "Rule")
        .with("allow-lan", false)
        .with("bind-address", "127.0.0.1")
        .with("servers", Vec::<Value>::new())
        .with("groups", Vec::<Value>::new());

    let dns = Document::new()
        .with("enable", true)
        .with("ipv6", false)
        .with("nameserver", vec![Value::from("8.8.8.8"), Value::from("1.1.1.1")])
        .with("fallback", vec![Value::from("8.8.4.4")]);

    let rules = vec![
        Value::from(Document::new().with("type", "GEOIP").with("value", "CN,DIRECT")),
        Value::from(Document::new().with("type", "MATCH").with("value", "PROXY")),
    ];

    let tun = Document::new()
        .with("name", DEFAULT_TUN_NAME)
        .with("mtu", i64::from(tunwarden_common::types::DEFAULT_MTU))
        .with("address", DEFAULT_TUN_ADDRESS);

    let engine = Document::new()
        .with("tick-interval-ms", DEFAULT_TICK_INTERVAL_MS)
        .with("burst", DEFAULT_BURST)
        .with("join-timeout-ms", DEFAULT_JOIN_TIMEOUT_MS);

    let now = Timestamp::now().as_secs();
    let metadata = Document::new()
        .with("name", "Default")
        .with("description", "Generated on first load")
        .with("created", now)
        .with("modified", now);

    Document::new()
        .with("version", "1.0")
        .with("proxy", proxy)
        .with("dns", dns)
        .with("hosts", Document::new())
        .with("rules", rules)
        .with("tun", tun)
        .with("engine", engine)
        .with("log", Document::new().with("level", "info"))
        .with("metadata", metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_sections() {
        let doc = default_document();
        for key in ["version", "proxy", "dns", "hosts", "rules", "tun", "engine", "log", "metadata"] {
            assert!(doc.get(key).is_some(), "missing section {key}");
        }
        assert_eq!(doc.get_path("tun.name").and_then(Value::as_str), Some("utun0"));
        assert_eq!(doc.get_path("tun.mtu").and_then(Value::as_i64), Some(1500));
        assert_eq!(
            doc.get_path("engine.burst").and_then(Value::as_i64),
            Some(DEFAULT_BURST)
        );
    }

    #[test]
    fn test_default_document_is_valid() {
        assert!(crate::profile::validate(&default_document()).is_ok());
    }

    #[test]
    fn test_default_document_encodes() {
        let doc = default_document();
        let text = doc.to_toml().unwrap();
        assert_eq!(Document::from_toml(&text).unwrap(), doc);
    }
}
