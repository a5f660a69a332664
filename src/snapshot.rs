//! Snapshot management.
//!
//! Named snapshot operations map one-to-one onto the driver primitives, with
//! a confirmation gate in front of the destructive ones (delete, and save
//! over an existing name). On top of the same primitives sits the anonymous
//! LIFO stack: `push` takes a snapshot under an internally generated,
//! reserved name and records it on an ordered stack persisted next to the
//! machine state; `pop` restores the top entry and, unless asked to keep it,
//! deletes it afterward.
//!
//! The stack and the named set never interact: push/pop only ever touch
//! reserved `hangar-push-` names, so a save or restore in between cannot
//! consume or reorder pushed state.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::lifecycle::Confirmer;
use crate::outcome::Outcome;

/// Reserved name prefix for anonymous stack snapshots.
pub const PUSH_PREFIX: &str = "hangar-push-";

/// File holding the persisted push stack inside the instance directory.
const STACK_FILE: &str = "pushstack.json";

/// Outcome of one snapshot operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotReport {
    /// Named snapshot taken.
    Saved(String),
    /// Named snapshot deleted.
    Deleted(String),
    /// Machine reverted to a named snapshot.
    Restored(String),
    /// Anonymous snapshot pushed onto the stack.
    Pushed(String),
    /// Top stack entry restored (and deleted, unless kept).
    Popped(String),
    /// Raw snapshot listing from the backend.
    Listing(String),
    /// The user declined the confirmation prompt.
    Aborted,
    /// Snapshots are not offered by this backend.
    Unsupported,
    /// The backend ran and reported a failure.
    Failed(String),
}

impl std::fmt::Display for SnapshotReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotReport::Saved(name) => write!(f, "Snapshot {} taken", name),
            SnapshotReport::Deleted(name) => write!(f, "Snapshot {} deleted", name),
            SnapshotReport::Restored(name) => write!(f, "Snapshot {} restored", name),
            SnapshotReport::Pushed(name) => write!(f, "Snapshot pushed as {}", name),
            SnapshotReport::Popped(name) => write!(f, "Snapshot {} popped", name),
            SnapshotReport::Listing(text) => write!(f, "{}", text.trim_end()),
            SnapshotReport::Aborted => write!(f, "Aborted"),
            SnapshotReport::Unsupported => {
                write!(f, "snapshots are not supported on this backend")
            }
            SnapshotReport::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Persisted shape of the anonymous stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedStack {
    /// Pushed snapshot names, oldest first.
    entries: Vec<String>,
    /// Monotonic counter folded into generated names.
    seq: u64,
}

/// Named snapshot CRUD plus the anonymous push/pop stack for one instance.
pub struct SnapshotManager {
    stack_path: PathBuf,
    stack: PersistedStack,
}

impl SnapshotManager {
    /// Open the manager for an instance, loading any persisted stack.
    pub fn open(instance_path: &Path) -> Result<Self> {
        let stack_path = instance_path.join(STACK_FILE);
        let stack = if stack_path.is_file() {
            let raw = std::fs::read_to_string(&stack_path)
                .map_err(|e| Error::stack("load", e.to_string()))?;
            serde_json::from_str(&raw).map_err(|e| Error::stack("parse", e.to_string()))?
        } else {
            PersistedStack::default()
        };
        Ok(Self { stack_path, stack })
    }

    /// Current depth of the anonymous stack.
    pub fn depth(&self) -> usize {
        self.stack.entries.len()
    }

    /// Take a named snapshot, confirming before overwriting an existing name.
    pub fn save(
        &self,
        driver: &dyn Driver,
        vm: &str,
        name: &str,
        force: bool,
        confirmer: &dyn Confirmer,
    ) -> Result<SnapshotReport> {
        if let Outcome::Ok(listing) = driver.list_snapshots(vm)? {
            if listing_contains(&listing, name) {
                if !force {
                    let prompt = format!("Snapshot {} already exists. Overwrite", name);
                    if !confirmer.confirm(&prompt, false) {
                        return Ok(SnapshotReport::Aborted);
                    }
                }
                // Taking over an existing name duplicates it on some
                // backends; drop the old one first.
                if let Outcome::Failed(reason) = driver.delete_snapshot(vm, name)? {
                    return Ok(SnapshotReport::Failed(reason));
                }
            }
        }

        Ok(match driver.save_snapshot(vm, name)? {
            Outcome::Ok(()) => SnapshotReport::Saved(name.to_string()),
            Outcome::Failed(reason) => SnapshotReport::Failed(reason),
            Outcome::Unsupported => SnapshotReport::Unsupported,
        })
    }

    /// Delete a named snapshot, confirming unless forced.
    pub fn delete(
        &self,
        driver: &dyn Driver,
        vm: &str,
        name: &str,
        force: bool,
        confirmer: &dyn Confirmer,
    ) -> Result<SnapshotReport> {
        if !force {
            let prompt = format!("Are you sure you want to delete snapshot {}", name);
            if !confirmer.confirm(&prompt, false) {
                return Ok(SnapshotReport::Aborted);
            }
        }

        Ok(match driver.delete_snapshot(vm, name)? {
            Outcome::Ok(()) => SnapshotReport::Deleted(name.to_string()),
            Outcome::Failed(reason) => SnapshotReport::Failed(reason),
            Outcome::Unsupported => SnapshotReport::Unsupported,
        })
    }

    /// Revert to a named snapshot.
    pub fn restore(&self, driver: &dyn Driver, vm: &str, name: &str) -> Result<SnapshotReport> {
        Ok(match driver.restore_snapshot(vm, name)? {
            Outcome::Ok(()) => SnapshotReport::Restored(name.to_string()),
            Outcome::Failed(reason) => SnapshotReport::Failed(reason),
            Outcome::Unsupported => SnapshotReport::Unsupported,
        })
    }

    /// List the machine's snapshots.
    pub fn list(&self, driver: &dyn Driver, vm: &str) -> Result<SnapshotReport> {
        Ok(match driver.list_snapshots(vm)? {
            Outcome::Ok(text) => SnapshotReport::Listing(text),
            Outcome::Failed(reason) => SnapshotReport::Failed(reason),
            Outcome::Unsupported => SnapshotReport::Unsupported,
        })
    }

    /// Push the current machine state onto the anonymous stack.
    pub fn push(&mut self, driver: &dyn Driver, vm: &str) -> Result<SnapshotReport> {
        let name = self.generate_name();

        match driver.save_snapshot(vm, &name)? {
            Outcome::Ok(()) => {
                self.stack.entries.push(name.clone());
                self.stack.seq += 1;
                self.persist()?;
                Ok(SnapshotReport::Pushed(name))
            }
            Outcome::Failed(reason) => Ok(SnapshotReport::Failed(reason)),
            Outcome::Unsupported => Ok(SnapshotReport::Unsupported),
        }
    }

    /// Restore the top of the anonymous stack.
    ///
    /// Popping an empty stack is an input error reported before any backend
    /// call. With `keep` the snapshot survives the pop and stays on the
    /// stack for a later pop.
    pub fn pop(&mut self, driver: &dyn Driver, vm: &str, keep: bool) -> Result<SnapshotReport> {
        let Some(top) = self.stack.entries.last().cloned() else {
            return Err(Error::EmptyStack);
        };

        match driver.restore_snapshot(vm, &top)? {
            Outcome::Ok(()) => {}
            Outcome::Failed(reason) => return Ok(SnapshotReport::Failed(reason)),
            Outcome::Unsupported => return Ok(SnapshotReport::Unsupported),
        }

        if !keep {
            if let Outcome::Failed(reason) = driver.delete_snapshot(vm, &top)? {
                tracing::warn!(snapshot = %top, reason, "popped snapshot not deleted");
            }
            self.stack.entries.pop();
            self.persist()?;
        }

        Ok(SnapshotReport::Popped(top))
    }

    fn generate_name(&self) -> String {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut seq = self.stack.seq;
        loop {
            let name = format!("{}{}-{}", PUSH_PREFIX, seq, nonce);
            if !self.stack.entries.contains(&name) {
                return name;
            }
            seq += 1;
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.stack_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::stack("save", e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(&self.stack)
            .map_err(|e| Error::stack("serialize", e.to_string()))?;
        std::fs::write(&self.stack_path, raw).map_err(|e| Error::stack("save", e.to_string()))
    }
}

/// Whether a backend snapshot listing contains `name`.
///
/// vmrun lists bare names one per line; VBoxManage lists
/// `Name: <name> (UUID: ...)` lines. Both forms are matched exactly on the
/// name so `web` never matches `web-2`.
fn listing_contains(listing: &str, name: &str) -> bool {
    listing.lines().any(|line| {
        let line = line.trim();
        if line == name {
            return true;
        }
        line.strip_prefix("Name: ")
            .is_some_and(|rest| rest == name || rest.starts_with(&format!("{} (", name)))
    })
}
