//! In-memory instance model.
//!
//! An [`Instance`] combines the persisted descriptor with what can be
//! observed on disk: whether the machine has been created, and the
//! backend-specific locator used to address it (a `.vmx` path for VMware,
//! the registered name for VirtualBox). Orchestration mutates backend state
//! through a driver; it never writes the descriptor back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorStore;
use crate::error::Result;

/// Hypervisor backend an instance is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// VMware Workstation / Fusion, driven through `vmrun`.
    Vmware,
    /// VirtualBox, driven through `VBoxManage`.
    Virtualbox,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Vmware => write!(f, "vmware"),
            Provider::Virtualbox => write!(f, "virtualbox"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vmware" => Ok(Provider::Vmware),
            "virtualbox" | "vbox" => Ok(Provider::Virtualbox),
            _ => Err(format!("invalid provider: {}", s)),
        }
    }
}

/// One declared virtual machine, descriptor plus observed state.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Instance name, unique per working directory.
    pub name: String,
    /// Declared hypervisor backend.
    pub provider: Provider,
    /// Identifier of the source box image.
    pub box_name: String,
    /// Optional box version pin.
    pub box_version: Option<String>,
    /// Default ssh user, if declared.
    pub user: Option<String>,
    /// Directory holding this machine's on-disk state.
    pub path: PathBuf,
    /// Backend-specific locator; `None` until the machine exists.
    pub locator: Option<String>,
    /// Whether backend state exists on disk for this instance.
    pub created: bool,
    /// Skip shared-folder setup during the next start sequence.
    pub disable_shared_folders: bool,
}

impl Instance {
    /// Build an instance from its descriptor plus a filesystem probe.
    pub fn load(name: &str, store: &DescriptorStore) -> Result<Self> {
        let desc = store.get(name)?;
        let path = store.instance_path(name);

        let (created, locator) = match desc.provider {
            Provider::Vmware => match find_vmx(&path) {
                Some(vmx) => (true, Some(vmx.to_string_lossy().into_owned())),
                None => (false, None),
            },
            // VirtualBox machines are addressed by registered name; the
            // state directory existing is the creation marker.
            Provider::Virtualbox => (path.is_dir(), Some(name.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            provider: desc.provider,
            box_name: desc.box_name.clone(),
            box_version: desc.box_version.clone(),
            user: desc.user.clone(),
            path,
            locator,
            created,
            disable_shared_folders: false,
        })
    }

    /// The backend locator, available only when the machine is created.
    pub fn vm_ref(&self) -> Option<&str> {
        if self.created {
            self.locator.as_deref()
        } else {
            None
        }
    }
}

/// Find the machine's `.vmx` file under its state directory.
///
/// Box extraction may nest the vmx one directory down, so the immediate
/// children and one sublevel are searched. The lexically first match wins,
/// keeping the probe deterministic.
fn find_vmx(path: &Path) -> Option<PathBuf> {
    fn vmx_in(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "vmx"))
            .collect();
        found.sort();
        found
    }

    let direct = vmx_in(path);
    if let Some(vmx) = direct.first() {
        return Some(vmx.clone());
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    subdirs.iter().find_map(|d| vmx_in(d).into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorStore, HANGARFILE};

    fn store_with(dir: &Path, json: &str) -> DescriptorStore {
        std::fs::write(dir.join(HANGARFILE), json).unwrap();
        DescriptorStore::load(dir).unwrap()
    }

    #[test]
    fn test_provider_display_and_parse() {
        assert_eq!(Provider::Vmware.to_string(), "vmware");
        assert_eq!(Provider::Virtualbox.to_string(), "virtualbox");
        assert_eq!("vmware".parse::<Provider>().unwrap(), Provider::Vmware);
        assert_eq!("vbox".parse::<Provider>().unwrap(), Provider::Virtualbox);
        assert!("qemu".parse::<Provider>().is_err());
    }

    #[test]
    fn test_vmware_instance_not_created_without_vmx() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_with(
            dir.path(),
            r#"{ "web1": { "box": "b/u", "provider": "vmware" } }"#,
        );

        let inst = Instance::load("web1", &store).unwrap();
        assert!(!inst.created);
        assert!(inst.vm_ref().is_none());
    }

    #[test]
    fn test_vmware_instance_created_with_vmx() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_with(
            dir.path(),
            r#"{ "web1": { "box": "b/u", "provider": "vmware" } }"#,
        );
        let vm_dir = store.instance_path("web1");
        std::fs::create_dir_all(&vm_dir).unwrap();
        std::fs::write(vm_dir.join("web1.vmx"), "").unwrap();

        let inst = Instance::load("web1", &store).unwrap();
        assert!(inst.created);
        assert!(inst.vm_ref().unwrap().ends_with("web1.vmx"));
    }

    #[test]
    fn test_vmware_instance_finds_nested_vmx() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_with(
            dir.path(),
            r#"{ "web1": { "box": "b/u", "provider": "vmware" } }"#,
        );
        let nested = store.instance_path("web1").join("box-contents");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("machine.vmx"), "").unwrap();

        let inst = Instance::load("web1", &store).unwrap();
        assert!(inst.created);
        assert!(inst.vm_ref().unwrap().ends_with("machine.vmx"));
    }

    #[test]
    fn test_virtualbox_instance_locator_is_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_with(
            dir.path(),
            r#"{ "db1": { "box": "b/d", "provider": "virtualbox" } }"#,
        );

        let inst = Instance::load("db1", &store).unwrap();
        assert!(!inst.created);
        // Not created: the locator exists but vm_ref refuses to hand it out.
        assert!(inst.vm_ref().is_none());

        std::fs::create_dir_all(store.instance_path("db1")).unwrap();
        let inst = Instance::load("db1", &store).unwrap();
        assert!(inst.created);
        assert_eq!(inst.vm_ref(), Some("db1"));
    }
}
