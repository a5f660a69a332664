//! Snapshot commands.
//!
//! Named operations under `hangar snapshot save/delete/restore/list`, plus
//! the anonymous stack under `hangar snapshot push/pop`.

use clap::{Args, Subcommand};

use hangar::descriptor::DescriptorStore;
use hangar::driver::{driver_for, Driver};
use hangar::instance::Instance;
use hangar::snapshot::SnapshotManager;

use super::StdinConfirmer;

/// Manage instance snapshots
#[derive(Subcommand, Debug)]
pub enum SnapshotCmd {
    /// Take a named snapshot
    Save(SaveCmd),

    /// Delete a named snapshot
    #[command(alias = "rm")]
    Delete(DeleteCmd),

    /// Revert an instance to a named snapshot
    Restore(RestoreCmd),

    /// List an instance's snapshots
    #[command(alias = "ls")]
    List(ListCmd),

    /// Push the current state onto the snapshot stack
    Push(PushCmd),

    /// Restore and drop the most recently pushed state
    Pop(PopCmd),
}

impl SnapshotCmd {
    pub fn run(self) -> hangar::Result<()> {
        match self {
            SnapshotCmd::Save(cmd) => cmd.run(),
            SnapshotCmd::Delete(cmd) => cmd.run(),
            SnapshotCmd::Restore(cmd) => cmd.run(),
            SnapshotCmd::List(cmd) => cmd.run(),
            SnapshotCmd::Push(cmd) => cmd.run(),
            SnapshotCmd::Pop(cmd) => cmd.run(),
        }
    }
}

/// Load an instance and its driver, refusing when the machine was never
/// created. Snapshot operations have no meaningful not-created outcome
/// beyond the message itself.
fn created_target(name: &str) -> hangar::Result<Option<(Instance, Box<dyn Driver>)>> {
    let store = DescriptorStore::load_cwd()?;
    let instance = Instance::load(name, &store)?;
    if instance.vm_ref().is_none() {
        println!("{}: VM not created", name);
        return Ok(None);
    }
    let driver = driver_for(instance.provider)?;
    Ok(Some((instance, driver)))
}

/// Take a named snapshot of an instance
#[derive(Args, Debug)]
pub struct SaveCmd {
    /// Instance to snapshot
    pub instance: String,

    /// Snapshot name
    pub name: String,

    /// Overwrite an existing snapshot without asking
    #[arg(short, long)]
    pub force: bool,
}

impl SaveCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mgr = SnapshotManager::open(&instance.path)?;
        let report = mgr.save(driver.as_ref(), vm, &self.name, self.force, &StdinConfirmer)?;
        println!("{}: {}", instance.name, report);
        Ok(())
    }
}

/// Delete a named snapshot
#[derive(Args, Debug)]
pub struct DeleteCmd {
    /// Instance owning the snapshot
    pub instance: String,

    /// Snapshot name
    pub name: String,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

impl DeleteCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mgr = SnapshotManager::open(&instance.path)?;
        let report = mgr.delete(driver.as_ref(), vm, &self.name, self.force, &StdinConfirmer)?;
        println!("{}: {}", instance.name, report);
        Ok(())
    }
}

/// Revert an instance to a named snapshot
#[derive(Args, Debug)]
pub struct RestoreCmd {
    /// Instance to revert
    pub instance: String,

    /// Snapshot name
    pub name: String,
}

impl RestoreCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mgr = SnapshotManager::open(&instance.path)?;
        let report = mgr.restore(driver.as_ref(), vm, &self.name)?;
        println!("{}: {}", instance.name, report);
        Ok(())
    }
}

/// List an instance's snapshots
#[derive(Args, Debug)]
pub struct ListCmd {
    /// Instance to list
    pub instance: String,
}

impl ListCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mgr = SnapshotManager::open(&instance.path)?;
        println!("{}", mgr.list(driver.as_ref(), vm)?);
        Ok(())
    }
}

/// Push the current state onto the snapshot stack
#[derive(Args, Debug)]
pub struct PushCmd {
    /// Instance to snapshot
    pub instance: String,
}

impl PushCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mut mgr = SnapshotManager::open(&instance.path)?;
        let report = mgr.push(driver.as_ref(), vm)?;
        println!("{}: {}", instance.name, report);
        Ok(())
    }
}

/// Restore the most recently pushed state
#[derive(Args, Debug)]
pub struct PopCmd {
    /// Instance to restore
    pub instance: String,

    /// Keep the snapshot on the stack after restoring it
    #[arg(long, visible_alias = "no-delete")]
    pub keep: bool,
}

impl PopCmd {
    pub fn run(self) -> hangar::Result<()> {
        let Some((instance, driver)) = created_target(&self.instance)? else {
            return Ok(());
        };
        let vm = instance.vm_ref().unwrap_or_default();
        let mut mgr = SnapshotManager::open(&instance.path)?;
        let report = mgr.pop(driver.as_ref(), vm, self.keep)?;
        println!("{}: {}", instance.name, report);
        Ok(())
    }
}
