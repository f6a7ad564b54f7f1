// ============================================
// File: crates/tunwarden-config/src/codec.rs
// ============================================
//! # Document Codecs
//!
//! ## Main Functionality
//! - `Format`: TOML, YAML or JSON, picked from a file extension
//! - Encode/decode helpers on `Document` and `Value`
//!
//! `.json` is JSON, `.yaml`/`.yml` is YAML, anything else is TOML. Single
//! values crossing the host boundary are always JSON.
//!
//! ## Last Modified
//! v0.1.0 - Initial codecs

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::value::{Document, Value};

/// On-disk document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML (default).
    Toml,
    /// YAML.
    Yaml,
    /// JSON.
    Json,
}

impl Format {
    /// Picks the format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(path).unwrap_or(Self::Toml)
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Returns `true` if files with this path are readable as a profile.
    #[must_use]
    pub fn is_profile_path(path: &Path) -> bool {
        Self::from_extension(path).is_some()
    }

    /// Lowercase name, used in error contexts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Encodes a document.
    ///
    /// # Errors
    /// Returns `Serialize` if the encoder rejects the document.
    pub fn encode(self, doc: &Document) -> Result<String> {
        match self {
            Self::Toml => doc.to_toml(),
            Self::Yaml => doc.to_yaml(),
            Self::Json => doc.to_json(),
        }
    }

    /// Decodes a document.
    ///
    /// # Errors
    /// Returns `Parse` on malformed input.
    pub fn decode(self, text: &str) -> Result<Document> {
        match self {
            Self::Toml => Document::from_toml(text),
            Self::Yaml => Document::from_yaml(text),
            Self::Json => Document::from_json(text),
        }
    }
}

impl Document {
    /// Encodes as pretty-printed TOML.
    ///
    /// # Errors
    /// Returns `Serialize` if the encoder rejects the document.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::serialize("toml document", e))
    }

    /// Decodes TOML text.
    ///
    /// # Errors
    /// Returns `Parse` on malformed input.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::parse("toml document", e))
    }

    /// Encodes as block-style YAML.
    ///
    /// # Errors
    /// Returns `Serialize` if the encoder rejects the document.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::serialize("yaml document", e))
    }

    /// Decodes YAML text; the root must be a mapping.
    ///
    /// # Errors
    /// Returns `Parse` on malformed input, `null`/`~` values or a non-mapping
    /// root.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::parse("yaml document", e))
    }

    /// Encodes as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `Serialize` (non-finite floats).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::serialize("json document", e))
    }

    /// Decodes JSON text; the root must be an object.
    ///
    /// # Errors
    /// Returns `Parse` on malformed input, `null` values or a non-object root.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::parse("json document", e))
    }
}

impl Value {
    /// Encodes a single value as compact JSON.
    ///
    /// # Errors
    /// Returns `Serialize` for non-finite floats.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ConfigError::serialize("json value", e))
    }

    /// Decodes a single JSON value.
    ///
    /// # Errors
    /// Returns `Parse` on malformed input or `null`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::parse("json value", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample() -> Document {
        Document::new()
            .with("version", "1.0")
            .with("tun", Document::new().with("name", "utun0").with("mtu", 1500_i64))
            .with(
                "proxy",
                Document::new().with(
                    "servers",
                    vec![Value::from(
                        Document::new().with("name", "a").with("port", 443_i64),
                    )],
                ),
            )
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(&PathBuf::from("a.json")), Format::Json);
        assert_eq!(Format::from_path(&PathBuf::from("a.JSON")), Format::Json);
        assert_eq!(Format::from_path(&PathBuf::from("a.toml")), Format::Toml);
        assert_eq!(Format::from_path(&PathBuf::from("missing.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(&PathBuf::from("clash.YML")), Format::Yaml);
        assert_eq!(Format::from_path(&PathBuf::from("noext")), Format::Toml);
        assert_eq!(Format::from_path(&PathBuf::from("notes.txt")), Format::Toml);
    }

    #[test]
    fn test_profile_extensions() {
        for name in ["a.toml", "b.yaml", "c.yml", "d.json"] {
            assert!(Format::is_profile_path(&PathBuf::from(name)), "{name}");
        }
        assert!(!Format::is_profile_path(&PathBuf::from("notes.txt")));
        assert!(!Format::is_profile_path(&PathBuf::from("noext")));
    }

    #[test]
    fn test_yaml_reads_handwritten_profile() {
        let text = "\
version: \"1.0\"
proxy:
  mode: Rule
  servers:
    - name: hk
      type: ss
      server: 1.2.3.4
      port: 8388
dns:
  enable: true
  nameserver:
    - 1.1.1.1
    - 8.8.8.8
";
        let doc = Document::from_yaml(text).unwrap();
        assert_eq!(doc.get_path("version").and_then(Value::as_str), Some("1.0"));
        assert_eq!(doc.get_path("proxy.mode").and_then(Value::as_str), Some("Rule"));
        assert_eq!(
            doc.get_path("proxy.servers")
                .and_then(Value::as_sequence)
                .map(<[Value]>::len),
            Some(1)
        );
        assert_eq!(
            doc.get_path("dns.nameserver"),
            Some(&Value::from(vec![Value::from("1.1.1.1"), Value::from("8.8.8.8")]))
        );
    }

    #[test]
    fn test_yaml_preserves_document() {
        let doc = sample();
        let text = doc.to_yaml().unwrap();
        assert!(text.contains("name: utun0"), "{text}");
        assert_eq!(Document::from_yaml(&text).unwrap(), doc);
    }

    #[test]
    fn test_mixed_toml_array_is_kept() {
        let doc = Document::new().with(
            "rules",
            vec![Value::from(1_i64), Value::from(Document::new().with("b", 2_i64))],
        );
        let text = doc.to_toml().unwrap();
        assert_eq!(Document::from_toml(&text).unwrap(), doc);
    }

    #[test]
    fn test_toml_preserves_document() {
        let doc = sample();
        let text = doc.to_toml().unwrap();
        assert_eq!(Document::from_toml(&text).unwrap(), doc);
    }

    #[test]
    fn test_json_preserves_document() {
        let doc = sample();
        let text = doc.to_json().unwrap();
        assert_eq!(Document::from_json(&text).unwrap(), doc);
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let doc = Document::from_toml("created = 1979-05-27T07:32:00Z\n").unwrap();
        assert_eq!(
            doc.get("created").and_then(Value::as_str),
            Some("1979-05-27T07:32:00Z")
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Document::from_toml("this is = = not toml"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Document::from_json("{\"a\": null}"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Document::from_yaml("proxy:\n  mode: ~\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Document::from_yaml("- just\n- a list\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(Value::from_json("null").is_err());
        assert_eq!(Value::from_json("1500").unwrap(), Value::from(1500_i64));
    }
}
