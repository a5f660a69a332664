//! Hypervisor backend drivers.
//!
//! The two control executables speak incompatible dialects: `vmrun` takes a
//! `.vmx` path and reports errors as an `Error:` line, `VBoxManage` takes a
//! registered machine name and reports errors on stderr. The [`Driver`] trait
//! hides both behind one capability contract; each method maps to one (or a
//! short fixed sequence of) process invocations and normalizes the literal
//! text output into [`Outcome`] values.
//!
//! A capability the backend does not offer returns [`Outcome::Unsupported`]
//! without spawning any process — callers can tell "this backend can't" apart
//! from "the backend tried and failed".

pub mod virtualbox;
pub mod vmware;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

use crate::error::Result;
use crate::instance::Provider;
use crate::outcome::{IpProbe, Outcome, ToolsState};

pub use virtualbox::VboxDriver;
pub use vmware::VmrunDriver;

/// How to stop a running machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Ask the guest OS to shut down (requires guest tools).
    Graceful,
    /// Power off without consulting the guest.
    Hard,
}

/// Capability contract implemented by both hypervisor backends.
///
/// All operations take the backend-specific machine locator: a `.vmx` file
/// path for the VMware driver, a registered machine name for the VirtualBox
/// driver. Methods return `Err` only for environment faults (the control
/// executable missing or unspawnable); everything the backend itself reports
/// is an [`Outcome`].
pub trait Driver: Send + Sync {
    /// Short backend name for logs and messages.
    fn name(&self) -> &'static str;

    /// Whether the control executable is present on this host.
    fn installed(&self) -> bool;

    /// Power on the machine.
    fn start(&self, vm: &str, gui: bool) -> Result<Outcome>;

    /// Stop the machine, gracefully or hard.
    fn stop(&self, vm: &str, mode: StopMode) -> Result<Outcome>;

    /// Pause the machine.
    fn pause(&self, vm: &str) -> Result<Outcome>;

    /// Resume a paused machine. Fails when nothing was paused.
    fn unpause(&self, vm: &str) -> Result<Outcome>;

    /// Suspend the machine to disk.
    fn suspend(&self, vm: &str) -> Result<Outcome>;

    /// Query the guest IP address once. `wait` forwards the backend's own
    /// blocking flag where one exists; polling policy belongs to the caller.
    fn guest_ip(&self, vm: &str, wait: bool) -> Result<IpProbe>;

    /// Probe the guest tools state.
    fn tools_state(&self, vm: &str) -> Result<Outcome<ToolsState>>;

    /// Enable the shared folder subsystem.
    fn enable_shared_folders(&self, vm: &str) -> Result<Outcome>;

    /// Map a host directory into the guest under `name`.
    fn add_shared_folder(&self, vm: &str, name: &str, host_path: &Path) -> Result<Outcome>;

    /// Raw multi-line listing of host networks. Callers own line parsing.
    fn list_host_networks(&self) -> Result<Outcome<String>>;

    /// Raw port-forwarding listing for one host network.
    fn list_port_forwardings(&self, network: &str) -> Result<Outcome<String>>;

    /// Take a named snapshot.
    fn save_snapshot(&self, vm: &str, name: &str) -> Result<Outcome>;

    /// Delete a named snapshot.
    fn delete_snapshot(&self, vm: &str, name: &str) -> Result<Outcome>;

    /// Revert to a named snapshot.
    fn restore_snapshot(&self, vm: &str, name: &str) -> Result<Outcome>;

    /// Raw listing of the machine's snapshots.
    fn list_snapshots(&self, vm: &str) -> Result<Outcome<String>>;

    /// Delete or unregister the machine from the backend.
    fn delete_vm(&self, vm: &str) -> Result<Outcome>;

    /// Raw listing of machines currently running under this backend.
    fn list_running(&self) -> Result<Outcome<String>>;

    /// Upgrade the machine's virtual hardware version.
    fn upgrade_hardware(&self, vm: &str) -> Result<Outcome>;
}

/// Construct the driver for an instance's declared provider.
pub fn driver_for(provider: Provider) -> Result<Box<dyn Driver>> {
    match provider {
        Provider::Vmware => Ok(Box::new(VmrunDriver::locate()?)),
        Provider::Virtualbox => Ok(Box::new(VboxDriver::locate()?)),
    }
}
