//! The Hangarfile descriptor store.
//!
//! A `Hangarfile` is a JSON document in the working directory mapping each
//! declared instance name to its descriptor: source box, optional version
//! pin, provider, and default ssh user. The core only ever reads it; nothing
//! in the lifecycle path writes descriptors back.
//!
//! ```json
//! {
//!     "web1": { "box": "bento/ubuntu-22.04", "provider": "vmware", "user": "vagrant" },
//!     "db1":  { "box": "bento/debian-12", "provider": "virtualbox" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::instance::Provider;

/// File name of the descriptor store in the working directory.
pub const HANGARFILE: &str = "Hangarfile";

/// Directory under the working directory holding per-instance state.
pub const STATE_DIR: &str = ".hangar";

/// Persisted descriptor of one declared instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    /// Identifier of the source box image.
    #[serde(rename = "box")]
    pub box_name: String,

    /// Optional version pin of the box.
    #[serde(default)]
    pub box_version: Option<String>,

    /// Hypervisor backend this instance is declared for.
    pub provider: Provider,

    /// Default ssh user for this instance.
    #[serde(default)]
    pub user: Option<String>,
}

/// Read-only view over a working directory's Hangarfile.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    dir: PathBuf,
    entries: BTreeMap<String, Descriptor>,
}

impl DescriptorStore {
    /// Load the Hangarfile from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(HANGARFILE);
        if !path.is_file() {
            return Err(Error::DescriptorNotFound { path });
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| Error::descriptor("read", e.to_string()))?;
        let entries: BTreeMap<String, Descriptor> =
            serde_json::from_str(&raw).map_err(|e| Error::descriptor("parse", e.to_string()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Load the Hangarfile from the current working directory.
    pub fn load_cwd() -> Result<Self> {
        Self::load(&std::env::current_dir()?)
    }

    /// The directory this store was loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up one instance's descriptor.
    pub fn get(&self, name: &str) -> Result<&Descriptor> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::instance_not_found(name))
    }

    /// All declared instance names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// The state directory for one instance (`<dir>/.hangar/<name>`).
    pub fn instance_path(&self, name: &str) -> PathBuf {
        self.dir.join(STATE_DIR).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_hangarfile(dir: &Path, contents: &str) {
        std::fs::write(dir.join(HANGARFILE), contents).unwrap();
    }

    #[test]
    fn test_load_and_get() {
        let dir = tempfile::TempDir::new().unwrap();
        write_hangarfile(
            dir.path(),
            r#"{
                "web1": { "box": "bento/ubuntu-22.04", "provider": "vmware", "user": "vagrant" },
                "db1": { "box": "bento/debian-12", "box_version": "1.2.3", "provider": "virtualbox" }
            }"#,
        );

        let store = DescriptorStore::load(dir.path()).unwrap();
        assert_eq!(store.names(), vec!["db1", "web1"]);

        let web = store.get("web1").unwrap();
        assert_eq!(web.box_name, "bento/ubuntu-22.04");
        assert_eq!(web.provider, Provider::Vmware);
        assert_eq!(web.user.as_deref(), Some("vagrant"));
        assert!(web.box_version.is_none());

        let db = store.get("db1").unwrap();
        assert_eq!(db.provider, Provider::Virtualbox);
        assert_eq!(db.box_version.as_deref(), Some("1.2.3"));
        assert!(db.user.is_none());
    }

    #[test]
    fn test_missing_hangarfile() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = DescriptorStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DescriptorNotFound { .. }));
    }

    #[test]
    fn test_unknown_instance() {
        let dir = tempfile::TempDir::new().unwrap();
        write_hangarfile(dir.path(), "{}");
        let store = DescriptorStore::load(dir.path()).unwrap();
        let err = store.get("nope").unwrap_err();
        assert!(matches!(err, Error::InstanceNotFound { .. }));
    }

    #[test]
    fn test_broken_json_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        write_hangarfile(dir.path(), "{ not json");
        let err = DescriptorStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Descriptor { .. }));
    }

    #[test]
    fn test_instance_path_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        write_hangarfile(dir.path(), "{}");
        let store = DescriptorStore::load(dir.path()).unwrap();
        assert_eq!(
            store.instance_path("web1"),
            dir.path().join(".hangar").join("web1")
        );
    }
}
