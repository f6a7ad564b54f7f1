// ============================================
// File: crates/tunwarden-engine/src/bridge.rs
// ============================================
//! # Host Bridge
//!
//! ## Creation Reason
//! A host application (UI shell, mobile wrapper, FFI layer) drives the
//! engine through flat calls that take strings and return records. This
//! module is that surface: every call returns a serializable record with
//! `success`, an optional human readable `error` and an optional machine
//! readable `code`.
//!
//! ## Main Functionality
//! - Interface calls: create, start, stop, packet read/write, stats
//! - Configuration calls: load, save, get/set value, validate, hot
//!   reload, current, profiles, format conversion
//! - `encode()`: Record to camelCase JSON
//!
//! ## Wire Shape
//! ```text
//! {"success":true,"finalStats":{"interface":"utun0","packetsOut":5,...}}
//! {"success":false,"error":"Interface is not active","code":"NotActive"}
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Calls never return `Err`; failures are folded into the record
//! - Empty path strings mean "use the default"
//! - Packet payloads cross the boundary as standard base64
//!
//! ## Last Modified
//! v0.1.0 - Initial bridge

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use tracing::debug;

use tunwarden_common::error::ErrorCode;
use tunwarden_common::time::Timestamp;
use tunwarden_common::types::InterfaceAddress;
use tunwarden_config::{
    profile, ConfigStore, CurrentConfig, Document, FileReport, HotReload, ProfileEntry, Value,
};
use tunwarden_transport::{Packet, PacketMeta};

use crate::error::{EngineError, Result};
use crate::interface::{Interceptor, StopReport};
use crate::stats::StatsSnapshot;

// ============================================
// Records
// ============================================

/// Success flag with optional error, shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// `true` if the call succeeded.
    pub success: bool,
    /// Human readable failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine readable failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl Outcome {
    /// A successful outcome.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
            code: None,
        }
    }

    /// A failed outcome carrying `err`'s message and code.
    #[must_use]
    pub fn failed(err: &EngineError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }

    fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}

/// Record of `stop_interface`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Counters at the moment of stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_stats: Option<FinalStats>,
}

/// Final accounting of an active period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStats {
    /// Interface that was stopped.
    pub interface: String,
    /// Counters.
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// Length of the active period in seconds.
    pub elapsed_seconds: f64,
}

impl From<StopReport> for FinalStats {
    fn from(report: StopReport) -> Self {
        Self {
            interface: report.interface,
            stats: report.stats,
            elapsed_seconds: report.elapsed.as_secs_f64(),
        }
    }
}

/// Record of `read_packet`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// The packet; `null` when none was queued.
    pub packet: Option<PacketRecord>,
}

/// One packet at the boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    /// Base64 payload.
    pub payload: String,
    /// Parsed header fields.
    #[serde(flatten)]
    pub meta: PacketMeta,
}

impl From<&Packet> for PacketRecord {
    fn from(packet: &Packet) -> Self {
        Self {
            payload: BASE64.encode(packet.payload()),
            meta: packet.meta().clone(),
        }
    }
}

/// Record of `get_stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Interface name, empty when not created.
    pub interface: String,
    /// `true` while running.
    pub active: bool,
    /// Link MTU.
    pub mtu: u16,
    /// Assigned address.
    pub address: Option<InterfaceAddress>,
    /// Counters.
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

/// Record of `load_config` and `save_config`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFileResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Loaded document (load only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Document>,
    /// File read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// File mtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_timestamp: Option<Timestamp>,
    /// `true` if the file was missing and defaults were written.
    pub provisioned: bool,
}

impl ConfigFileResponse {
    fn failed(err: &EngineError) -> Self {
        Self {
            outcome: Outcome::failed(err),
            config: None,
            file_path: None,
            file_size: None,
            modified_timestamp: None,
            provisioned: false,
        }
    }

    fn written(config: Option<Document>, file: FileReport, provisioned: bool) -> Self {
        Self {
            outcome: Outcome::ok(),
            config,
            file_path: Some(file.path),
            file_size: Some(file.size),
            modified_timestamp: Some(file.modified),
            provisioned,
        }
    }
}

/// Record of `hot_reload_config`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotReloadResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// `true` if the document was replaced.
    pub reloaded: bool,
    /// The new document, when reloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Document>,
    /// Why nothing was reloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Record of `current_config`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConfigResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Store contents.
    #[serde(flatten)]
    pub current: CurrentConfig,
}

/// Record of `list_profiles`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Directory that was listed.
    pub directory: PathBuf,
    /// Profiles found.
    pub profiles: Vec<ProfileEntry>,
    /// Number of profiles.
    pub count: usize,
}

/// Record of the conversion calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Converted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ConvertResponse {
    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(output) => Self {
                outcome: Outcome::ok(),
                output: Some(output),
            },
            Err(e) => Self {
                outcome: Outcome::failed(&e),
                output: None,
            },
        }
    }
}

/// Encodes a record as JSON.
///
/// Records only hold strings, numbers and documents, so encoding does not
/// fail in practice; if it does, a failure record is returned instead.
pub fn encode<T: Serialize>(record: &T) -> String {
    serde_json::to_string(record).unwrap_or_else(|e| {
        let err = EngineError::internal(format!("failed to encode response: {e}"));
        format!(
            r#"{{"success":false,"error":{},"code":"{}"}}"#,
            serde_json::Value::String(err.to_string()),
            err.code()
        )
    })
}

// ============================================
// Bridge
// ============================================

/// Host-facing facade over the interceptor and the configuration store.
///
/// The two halves share no lock; a call on one never waits on the other.
pub struct Bridge {
    interceptor: Interceptor,
    store: ConfigStore,
}

impl Bridge {
    /// Creates a bridge.
    #[must_use]
    pub const fn new(interceptor: Interceptor, store: ConfigStore) -> Self {
        Self { interceptor, store }
    }

    /// Returns the interceptor.
    #[must_use]
    pub const fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Returns the configuration store.
    #[must_use]
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }

    // ========================================
    // Interface
    // ========================================

    /// Sets the interface name and resets counters.
    pub async fn create_interface(&self, name: &str) -> Outcome {
        Outcome::from_result(&self.interceptor.create(name).await)
    }

    /// Starts the data-plane loop.
    pub async fn start_interface(&self) -> Outcome {
        Outcome::from_result(&self.interceptor.start().await)
    }

    /// Stops the loop and returns the final counters.
    pub async fn stop_interface(&self) -> StopResponse {
        match self.interceptor.stop().await {
            Ok(report) => StopResponse {
                outcome: Outcome::ok(),
                final_stats: Some(report.into()),
            },
            Err(e) => StopResponse {
                outcome: Outcome::failed(&e),
                final_stats: None,
            },
        }
    }

    /// Polls for one packet.
    pub async fn read_packet(&self) -> PacketResponse {
        match self.interceptor.read_packet().await {
            Ok(packet) => PacketResponse {
                outcome: Outcome::ok(),
                packet: packet.as_ref().map(PacketRecord::from),
            },
            Err(e) => PacketResponse {
                outcome: Outcome::failed(&e),
                packet: None,
            },
        }
    }

    /// Writes one base64-encoded packet.
    pub async fn write_packet(&self, payload: &str) -> Outcome {
        let result = async {
            let bytes = BASE64
                .decode(payload.trim())
                .map_err(|e| EngineError::validation("payload", format!("invalid base64: {e}")))?;
            self.interceptor.write_packet(&bytes).await
        }
        .await;
        Outcome::from_result(&result)
    }

    /// Returns interface state and counters.
    pub fn get_stats(&self) -> StatsResponse {
        let status = self.interceptor.status();
        StatsResponse {
            outcome: Outcome::ok(),
            interface: status.name,
            active: status.active,
            mtu: status.mtu,
            address: status.address,
            stats: status.stats,
        }
    }

    /// Zeroes the counters.
    pub fn reset_stats(&self) -> Outcome {
        self.interceptor.reset_stats();
        Outcome::ok()
    }

    /// Replaces name, MTU and address.
    pub fn set_interface_params(&self, name: &str, mtu: &str, address: &str) -> Outcome {
        Outcome::from_result(&self.interceptor.set_interface(name, mtu, address))
    }

    // ========================================
    // Configuration
    // ========================================

    /// Loads (or provisions) a configuration file.
    pub async fn load_config(&self, path: &str) -> ConfigFileResponse {
        match self.store.load(optional_path(path)).await {
            Ok(report) => {
                ConfigFileResponse::written(Some(report.document), report.file, report.provisioned)
            }
            Err(e) => ConfigFileResponse::failed(&EngineError::from(e)),
        }
    }

    /// Saves a JSON document.
    pub async fn save_config(&self, config_json: &str, path: &str) -> ConfigFileResponse {
        let result = async {
            let document = Document::from_json(config_json)?;
            Ok::<_, EngineError>(self.store.save(document, optional_path(path)).await?)
        }
        .await;

        match result {
            Ok(file) => ConfigFileResponse::written(None, file, false),
            Err(e) => ConfigFileResponse::failed(&e),
        }
    }

    /// Returns the value at a dotted key as JSON, or an empty string.
    pub async fn get_config_value(&self, key: &str) -> String {
        let Some(value) = self.store.get(key).await else {
            return String::new();
        };
        value.to_json().unwrap_or_else(|e| {
            debug!(key, error = %e, "Value could not be encoded");
            String::new()
        })
    }

    /// Sets a dotted key to a JSON value.
    pub async fn set_config_value(&self, key: &str, value_json: &str) -> Outcome {
        let result = async {
            let value = Value::from_json(value_json)?;
            self.store.set(key, value).await?;
            Ok::<_, EngineError>(())
        }
        .await;
        Outcome::from_result(&result)
    }

    /// Checks a JSON document against the proxy profile rules.
    #[must_use]
    pub fn validate_config(&self, config_json: &str) -> Outcome {
        let result = Document::from_json(config_json)
            .and_then(|doc| profile::validate(&doc))
            .map_err(EngineError::from);
        Outcome::from_result(&result)
    }

    /// Reloads the configuration file if it changed on disk.
    pub async fn hot_reload_config(&self) -> HotReloadResponse {
        match self.store.hot_reload().await {
            Ok(HotReload::Unchanged) => HotReloadResponse {
                outcome: Outcome::ok(),
                reloaded: false,
                config: None,
                message: Some("configuration unchanged, reload skipped".to_string()),
            },
            Ok(HotReload::Reloaded(report)) => HotReloadResponse {
                outcome: Outcome::ok(),
                reloaded: true,
                config: Some(report.document),
                message: None,
            },
            Err(e) => HotReloadResponse {
                outcome: Outcome::failed(&EngineError::from(e)),
                reloaded: false,
                config: None,
                message: None,
            },
        }
    }

    /// Returns what the store currently holds.
    pub async fn current_config(&self) -> CurrentConfigResponse {
        CurrentConfigResponse {
            outcome: Outcome::ok(),
            current: self.store.current().await,
        }
    }

    /// Lists profile files in a directory.
    pub async fn list_profiles(&self, dir: &str) -> ProfilesResponse {
        let directory = optional_path(dir).map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        match ConfigStore::list_profiles(Some(&directory)).await {
            Ok(profiles) => ProfilesResponse {
                outcome: Outcome::ok(),
                count: profiles.len(),
                directory,
                profiles,
            },
            Err(e) => ProfilesResponse {
                outcome: Outcome::failed(&EngineError::from(e)),
                directory,
                profiles: Vec::new(),
                count: 0,
            },
        }
    }

    /// Converts YAML text to pretty JSON.
    #[must_use]
    pub fn config_to_json(&self, yaml_text: &str) -> ConvertResponse {
        ConvertResponse::from_result(
            Document::from_yaml(yaml_text)
                .and_then(|doc| doc.to_json())
                .map_err(EngineError::from),
        )
    }

    /// Converts JSON text to YAML.
    #[must_use]
    pub fn config_from_json(&self, json_text: &str) -> ConvertResponse {
        ConvertResponse::from_result(
            Document::from_json(json_text)
                .and_then(|doc| doc.to_yaml())
                .map_err(EngineError::from),
        )
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("interceptor", &self.interceptor)
            .field("store", &self.store)
            .finish()
    }
}

fn optional_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| Path::new(raw))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_shape() {
        let ok = serde_json::to_value(Outcome::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true}));

        let failed = serde_json::to_value(Outcome::failed(&EngineError::NotActive)).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["code"], "NotActive");
        assert!(failed["error"].as_str().unwrap().contains("not active"));
    }

    #[test]
    fn test_encode_flattens_records() {
        let response = ConvertResponse {
            outcome: Outcome::ok(),
            output: Some("{}".into()),
        };
        let json: serde_json::Value = serde_json::from_str(&encode(&response)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["output"], "{}");
    }

    #[test]
    fn test_packet_record_carries_meta() {
        let mut data = vec![0u8; 28];
        data[0] = 0x45;
        data[9] = 17;
        data[12..16].copy_from_slice(&[10, 0, 0, 2]);
        data[16..20].copy_from_slice(&[8, 8, 8, 8]);
        data[20..22].copy_from_slice(&5353u16.to_be_bytes());
        data[22..24].copy_from_slice(&53u16.to_be_bytes());

        let record = PacketRecord::from(&Packet::new(data.clone()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["payload"], BASE64.encode(&data));
        assert_eq!(json["protocol"], "udp");
        assert_eq!(json["source"], "10.0.0.2:5353");
        assert_eq!(json["destination"], "8.8.8.8:53");
        assert_eq!(json["size"], 28);
    }

    #[test]
    fn test_optional_path() {
        assert!(optional_path("").is_none());
        assert!(optional_path("  ").is_none());
        assert_eq!(optional_path("a.toml"), Some(Path::new("a.toml")));
    }
}
