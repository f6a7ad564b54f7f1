// ============================================
// File: crates/tunwarden-config/src/store.rs
// ============================================
//! # Configuration Store
//!
//! ## Creation Reason
//! Owns the loaded document, the file it came from and that file's
//! modification time. Control-plane calls from several tasks read and edit it
//! concurrently, so everything sits behind one async read-write lock.
//!
//! ## Main Functionality
//! - `load`: Read (or provision) a file and replace the document
//! - `save`: Encode and atomically write a document
//! - `get` / `set`: Dotted-key access
//! - `hot_reload`: Reload only if the file's mtime changed
//! - `list_profiles`: Enumerate loadable files in a directory
//!
//! ## Lock Discipline
//! ```text
//! get / get_all / list_keys / current  ──► read lock
//! load / save / set / hot_reload       ──► write lock (held across file I/O)
//! ```
//! Holding the write lock across I/O keeps document, path and mtime
//! consistent with each other; a concurrent `get` sees either the old or
//! the new document, never a mix.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Writes go to `.{name}.tmp` in the same directory, then rename
//! - A failed operation leaves document, path and mtime untouched
//! - `hot_reload` never provisions; a deleted file is an I/O error
//!
//! ## Last Modified
//! v0.1.0 - Initial store

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tunwarden_common::time::Timestamp;

use crate::codec::Format;
use crate::defaults::{default_document, DEFAULT_CONFIG_PATH};
use crate::error::{ConfigError, Result};
use crate::profile::{self, ProxyProfile};
use crate::value::{Document, Value};

// ============================================
// Options and Reports
// ============================================

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Path used when `load`/`save` get no path and nothing was loaded.
    pub default_path: PathBuf,
    /// Run profile validation on every load and save.
    pub strict: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            strict: false,
        }
    }
}

impl StoreOptions {
    /// Sets the default path.
    #[must_use]
    pub fn default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Enables or disables strict validation.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Facts about a configuration file after a read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// File path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Modification time.
    pub modified: Timestamp,
}

/// Result of a successful load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// The document now held by the store.
    pub document: Document,
    /// File the document was read from.
    pub file: FileReport,
    /// `true` if the file was missing and the default was written.
    pub provisioned: bool,
}

/// Outcome of [`ConfigStore::hot_reload`].
#[derive(Debug, Clone)]
pub enum HotReload {
    /// File mtime matches the last load; nothing was read.
    Unchanged,
    /// File changed and was loaded again.
    Reloaded(LoadReport),
}

impl HotReload {
    /// Returns `true` if the document was replaced.
    #[must_use]
    pub const fn is_reloaded(&self) -> bool {
        matches!(self, Self::Reloaded(_))
    }
}

/// Snapshot of what the store currently holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConfig {
    /// `true` once a document was loaded, saved or edited.
    pub has_config: bool,
    /// Current document (empty if none).
    pub config: Document,
    /// Last loaded or saved path.
    pub file_path: Option<PathBuf>,
    /// mtime recorded at last load or save.
    pub modified: Option<Timestamp>,
    /// Count of in-memory changes.
    pub revision: u64,
}

/// One loadable file found by [`ConfigStore::list_profiles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    /// File name.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Modification time.
    pub modified: Timestamp,
}

// ============================================
// ConfigStore
// ============================================

#[derive(Debug, Default)]
struct StoreState {
    document: Option<Document>,
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
    revision: u64,
}

impl StoreState {
    fn replace(&mut self, document: Document, path: PathBuf, modified: Option<SystemTime>) {
        self.document = Some(document);
        self.path = Some(path);
        self.modified = modified;
        self.revision += 1;
    }
}

/// Concurrent owner of the configuration document.
///
/// # Example
/// ```no_run
/// use tunwarden_config::{ConfigStore, Value};
///
/// # async fn demo() -> tunwarden_config::Result<()> {
/// let store = ConfigStore::default();
/// let report = store.load(None).await?;
/// if report.provisioned {
///     println!("wrote defaults to {}", report.file.path.display());
/// }
///
/// store.set("tun.mtu", Value::from(1400_i64)).await?;
/// assert_eq!(store.get("tun.mtu").await, Some(Value::from(1400_i64)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigStore {
    state: RwLock<StoreState>,
    options: StoreOptions,
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(options: StoreOptions) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            options,
        }
    }

    /// Returns the store options.
    #[must_use]
    pub const fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ========================================
    // File Operations
    // ========================================

    /// Loads a document from `path`, or from the default path when `path`
    /// is `None` or empty.
    ///
    /// A missing file is provisioned with the default document first.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read or provisioned
    /// - `Parse` if the content cannot be decoded
    /// - `Validation` in strict mode
    pub async fn load(&self, path: Option<&Path>) -> Result<LoadReport> {
        let path = self.resolve_load_path(path);
        let mut state = self.state.write().await;
        self.load_locked(&mut state, path, true).await
    }

    /// Encodes and writes `document`, then makes it the current document.
    ///
    /// Path resolution: explicit `path`, else the last loaded/saved path,
    /// else the default path.
    ///
    /// # Errors
    /// - `Serialize` if the document cannot be encoded
    /// - `Io` if parent creation or the write fails
    /// - `Validation` in strict mode
    pub async fn save(&self, document: Document, path: Option<&Path>) -> Result<FileReport> {
        let mut state = self.state.write().await;
        let path = match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p.to_path_buf(),
            None => state
                .path
                .clone()
                .unwrap_or_else(|| self.options.default_path.clone()),
        };

        if self.options.strict {
            profile::validate(&document)?;
        }

        let text = Format::from_path(&path).encode(&document)?;
        write_atomic(&path, &text).await?;
        let (file, modified) = stat(&path).await?;

        info!(path = %path.display(), size = file.size, "Configuration saved");
        state.replace(document, path, modified);
        Ok(file)
    }

    /// Writes the current document back to its file.
    ///
    /// # Errors
    /// Returns `NotLoaded` if the store holds no document, otherwise as
    /// [`save`](Self::save).
    pub async fn save_current(&self) -> Result<FileReport> {
        let document = {
            let state = self.state.read().await;
            state.document.clone().ok_or(ConfigError::NotLoaded)?
        };
        self.save(document, None).await
    }

    /// Reloads the last loaded file if its mtime changed.
    ///
    /// # Errors
    /// - `NotLoaded` if no file was ever loaded or saved
    /// - `Io` if the file can no longer be read
    /// - `Parse`/`Validation` as [`load`](Self::load); the old document stays
    pub async fn hot_reload(&self) -> Result<HotReload> {
        let mut state = self.state.write().await;
        let path = state.path.clone().ok_or(ConfigError::NotLoaded)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| ConfigError::io(&path, e))?;
        let modified = metadata.modified().ok();

        if modified.is_some() && modified == state.modified {
            debug!(path = %path.display(), "Configuration unchanged");
            return Ok(HotReload::Unchanged);
        }

        let report = self.load_locked(&mut state, path, false).await?;
        info!(path = %report.file.path.display(), "Configuration hot-reloaded");
        Ok(HotReload::Reloaded(report))
    }

    // ========================================
    // Document Access
    // ========================================

    /// Returns the value at a dotted key, `None` if absent.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.read().await;
        state.document.as_ref()?.get_path(key).cloned()
    }

    /// Sets the value at a dotted key, returning the previous value.
    ///
    /// Only the in-memory document changes; call
    /// [`save_current`](Self::save_current) to persist.
    ///
    /// # Errors
    /// Returns `InvalidPath` for malformed keys or when an intermediate
    /// segment is not a document.
    pub async fn set(&self, key: &str, value: Value) -> Result<Option<Value>> {
        let mut state = self.state.write().await;
        let previous = match state.document.as_mut() {
            Some(doc) => doc.set_path(key, value)?,
            None => {
                let mut doc = Document::new();
                let previous = doc.set_path(key, value)?;
                state.document = Some(doc);
                previous
            }
        };
        state.revision += 1;
        debug!(key, revision = state.revision, "Configuration value set");
        Ok(previous)
    }

    /// Returns a copy of the whole document (empty if none).
    pub async fn get_all(&self) -> Document {
        let state = self.state.read().await;
        state.document.clone().unwrap_or_default()
    }

    /// Returns the top-level keys.
    pub async fn list_keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .document
            .as_ref()
            .map(|doc| doc.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Returns the typed, validated view of the current document.
    ///
    /// # Errors
    /// Returns `NotLoaded` if empty, `Validation` if invalid.
    pub async fn profile(&self) -> Result<ProxyProfile> {
        let state = self.state.read().await;
        let doc = state.document.as_ref().ok_or(ConfigError::NotLoaded)?;
        profile::validate(doc)
    }

    /// Returns a snapshot of the store's contents.
    pub async fn current(&self) -> CurrentConfig {
        let state = self.state.read().await;
        CurrentConfig {
            has_config: state.document.is_some(),
            config: state.document.clone().unwrap_or_default(),
            file_path: state.path.clone(),
            modified: state.modified.map(Timestamp::from_system_time),
            revision: state.revision,
        }
    }

    /// Returns the last loaded or saved path.
    pub async fn path(&self) -> Option<PathBuf> {
        self.state.read().await.path.clone()
    }

    // ========================================
    // Profiles
    // ========================================

    /// Lists `.toml`, `.yaml`, `.yml` and `.json` files in `dir` (current
    /// directory if `None` or empty), sorted by name.
    ///
    /// # Errors
    /// Returns `Io` if the directory cannot be read.
    pub async fn list_profiles(dir: Option<&Path>) -> Result<Vec<ProfileEntry>> {
        let dir = dir
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut entries = fs::read_dir(dir).await.map_err(|e| ConfigError::io(dir, e))?;
        let mut profiles = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| ConfigError::io(dir, e))? {
            let path = entry.path();
            if !Format::is_profile_path(&path) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable profile");
                    continue;
                }
            };
            profiles.push(ProfileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .map_or(Timestamp::from_secs(0), Timestamp::from_system_time),
            });
        }

        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    // ========================================
    // Internal
    // ========================================

    fn resolve_load_path(&self, path: Option<&Path>) -> PathBuf {
        match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p.to_path_buf(),
            None => self.options.default_path.clone(),
        }
    }

    async fn load_locked(
        &self,
        state: &mut StoreState,
        path: PathBuf,
        provision: bool,
    ) -> Result<LoadReport> {
        let mut provisioned = false;
        match fs::metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && provision => {
                warn!(path = %path.display(), "Configuration file missing, writing defaults");
                let text = Format::from_path(&path).encode(&default_document())?;
                write_atomic(&path, &text).await?;
                provisioned = true;
            }
            Err(e) => return Err(ConfigError::io(&path, e)),
        }

        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::io(&path, e))?;
        let document = Format::from_path(&path).decode(&text)?;

        if self.options.strict {
            profile::validate(&document)?;
        }

        let (file, modified) = stat(&path).await?;
        info!(
            path = %path.display(),
            size = file.size,
            keys = document.len(),
            provisioned,
            "Configuration loaded"
        );

        state.replace(document.clone(), path, modified);
        Ok(LoadReport {
            document,
            file,
            provisioned,
        })
    }
}

// ============================================
// File Helpers
// ============================================

async fn stat(path: &Path) -> Result<(FileReport, Option<SystemTime>)> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| ConfigError::io(path, e))?;
    let modified = metadata.modified().ok();
    let report = FileReport {
        path: path.to_path_buf(),
        size: metadata.len(),
        modified: modified.map_or(Timestamp::from_secs(0), Timestamp::from_system_time),
    };
    Ok((report, modified))
}

/// Writes `contents` to a sibling temp file and renames it over `path`.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::io(parent, e))?;
    }

    let Some(file_name) = path.file_name() else {
        return Err(ConfigError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        ));
    };
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    if let Err(e) = fs::write(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(ConfigError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(ConfigError::io(path, e));
    }
    Ok(())
}

// ============================================
// Tests
// ============================================
