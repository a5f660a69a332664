//! VMware-family driver backed by the `vmrun` executable.
//!
//! `vmrun` addresses machines by their `.vmx` file path and carries the full
//! capability set: lifecycle, guest tools probing, shared folders, snapshot
//! primitives, host network and port-forwarding queries, and hardware
//! upgrades.
//!
//! Its failure signaling is quirky: some subcommands exit non-zero, others
//! exit zero and print an `Error: ...` line on stdout. Both forms normalize
//! to [`Outcome::Failed`] here.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::outcome::{IpProbe, Outcome, ToolsState};
use crate::process::{self, CommandOutput};

use super::{Driver, StopMode};

/// Name of the control executable.
pub const VMRUN: &str = "vmrun";

/// Host type argument passed to every invocation.
#[cfg(target_os = "macos")]
const HOST_TYPE: &str = "fusion";
#[cfg(not(target_os = "macos"))]
const HOST_TYPE: &str = "ws";

/// Driver for VMware Workstation / Fusion via `vmrun`.
#[derive(Debug, Clone)]
pub struct VmrunDriver {
    executable: PathBuf,
}

impl VmrunDriver {
    /// Locate `vmrun` on this host.
    pub fn locate() -> Result<Self> {
        let executable = process::find_executable(VMRUN)
            .ok_or_else(|| Error::ExecutableNotFound(VMRUN.to_string()))?;
        Ok(Self { executable })
    }

    /// Build a driver around a specific executable path.
    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }

    fn invoke(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec!["-T", HOST_TYPE];
        full.extend_from_slice(args);
        process::run(&self.executable, &full, None)
    }

    fn simple(&self, args: &[&str]) -> Result<Outcome> {
        Ok(interpret(&self.invoke(args)?))
    }

    fn text(&self, args: &[&str]) -> Result<Outcome<String>> {
        let out = self.invoke(args)?;
        Ok(interpret(&out).map(|()| out.stdout))
    }
}

/// Normalize a vmrun invocation into an outcome.
///
/// vmrun reports problems as a leading `Error:` line on stdout, not always
/// with a non-zero exit; both signals map to `Failed`.
fn interpret(out: &CommandOutput) -> Outcome {
    let trimmed = out.stdout.trim();
    if out.success() && !trimmed.starts_with("Error:") {
        return Outcome::done();
    }
    let reason = if !trimmed.is_empty() {
        trimmed.to_string()
    } else if !out.stderr.trim().is_empty() {
        out.stderr.trim().to_string()
    } else {
        format!("vmrun exited with status {}", out.status)
    };
    Outcome::Failed(reason)
}

/// Interpret `checkToolsState` output.
fn parse_tools_state(stdout: &str) -> ToolsState {
    match stdout.trim() {
        "running" => ToolsState::Running,
        "installed" => ToolsState::Installed,
        _ => ToolsState::Absent,
    }
}

/// Interpret `getGuestIPAddress` output.
///
/// An "unable to get the IP address" error means the guest has not reported
/// one yet, which is a [`IpProbe::NotReady`] rather than a failure.
fn parse_guest_ip(out: &CommandOutput) -> IpProbe {
    let trimmed = out.stdout.trim();
    if out.success() && !trimmed.starts_with("Error:") {
        if trimmed.is_empty() || trimmed == "unknown" {
            return IpProbe::NotReady;
        }
        return match trimmed.parse::<std::net::IpAddr>() {
            Ok(ip) => IpProbe::Addr(ip.to_string()),
            Err(_) => IpProbe::Failed(format!("unparseable address: {}", trimmed)),
        };
    }
    if trimmed.to_ascii_lowercase().contains("ip address") {
        IpProbe::NotReady
    } else if !trimmed.is_empty() {
        IpProbe::Failed(trimmed.to_string())
    } else {
        IpProbe::Failed(format!("vmrun exited with status {}", out.status))
    }
}

impl Driver for VmrunDriver {
    fn name(&self) -> &'static str {
        "vmware"
    }

    fn installed(&self) -> bool {
        self.executable.is_file()
    }

    fn start(&self, vm: &str, gui: bool) -> Result<Outcome> {
        let mode = if gui { "gui" } else { "nogui" };
        self.simple(&["start", vm, mode])
    }

    fn stop(&self, vm: &str, mode: StopMode) -> Result<Outcome> {
        let arg = match mode {
            StopMode::Graceful => "soft",
            StopMode::Hard => "hard",
        };
        self.simple(&["stop", vm, arg])
    }

    fn pause(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["pause", vm])
    }

    fn unpause(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["unpause", vm])
    }

    fn suspend(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["suspend", vm])
    }

    fn guest_ip(&self, vm: &str, wait: bool) -> Result<IpProbe> {
        let out = if wait {
            self.invoke(&["getGuestIPAddress", vm, "-wait"])?
        } else {
            self.invoke(&["getGuestIPAddress", vm])?
        };
        Ok(parse_guest_ip(&out))
    }

    fn tools_state(&self, vm: &str) -> Result<Outcome<ToolsState>> {
        let out = self.invoke(&["checkToolsState", vm])?;
        Ok(interpret(&out).map(|()| parse_tools_state(&out.stdout)))
    }

    fn enable_shared_folders(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["enableSharedFolders", vm])
    }

    fn add_shared_folder(&self, vm: &str, name: &str, host_path: &Path) -> Result<Outcome> {
        let host = host_path.to_string_lossy();
        self.simple(&["addSharedFolder", vm, name, &host])
    }

    fn list_host_networks(&self) -> Result<Outcome<String>> {
        self.text(&["listHostNetworks"])
    }

    fn list_port_forwardings(&self, network: &str) -> Result<Outcome<String>> {
        self.text(&["listPortForwardings", network])
    }

    fn save_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["snapshot", vm, name])
    }

    fn delete_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["deleteSnapshot", vm, name])
    }

    fn restore_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["revertToSnapshot", vm, name])
    }

    fn list_snapshots(&self, vm: &str) -> Result<Outcome<String>> {
        self.text(&["listSnapshots", vm])
    }

    fn delete_vm(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["deleteVM", vm])
    }

    fn list_running(&self) -> Result<Outcome<String>> {
        self.text(&["list"])
    }

    fn upgrade_hardware(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["upgradevm", vm])
    }
}
