//! VirtualBox-family driver backed by the `VBoxManage` executable.
//!
//! `VBoxManage` addresses machines by registered name. The capability set is
//! partial: no shared-folder management at runtime, no port-forward or host
//! network listing, no guest-tools probe, and no hardware upgrade. Those
//! return [`Outcome::Unsupported`] without spawning anything. Lifecycle and
//! snapshot primitives are fully supported.
//!
//! Failures come back the conventional way: non-zero exit with the message
//! on stderr (prefixed `VBoxManage: error: ...`).

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::outcome::{IpProbe, Outcome, ToolsState};
use crate::process::{self, CommandOutput};

use super::{Driver, StopMode};

/// Name of the control executable.
pub const VBOXMANAGE: &str = "VBoxManage";

/// Guest property holding the first NIC's IPv4 address.
const GUEST_IP_PROPERTY: &str = "/VirtualBox/GuestInfo/Net/0/V4/IP";

/// Driver for VirtualBox via `VBoxManage`.
#[derive(Debug, Clone)]
pub struct VboxDriver {
    executable: PathBuf,
}

impl VboxDriver {
    /// Locate `VBoxManage` on this host.
    pub fn locate() -> Result<Self> {
        let executable = process::find_executable(VBOXMANAGE)
            .ok_or_else(|| Error::ExecutableNotFound(VBOXMANAGE.to_string()))?;
        Ok(Self { executable })
    }

    /// Build a driver around a specific executable path.
    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }

    fn invoke(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec!["-q"];
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

/// Normalize a VBoxManage invocation into an outcome.
fn interpret(out: &CommandOutput) -> Outcome {
    if out.success() {
        return Outcome::done();
    }
    let stderr = out.stderr.trim();
    let reason = if !stderr.is_empty() {
        // First error line carries the message; the rest is usage noise.
        stderr
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or(stderr)
            .trim()
            .to_string()
    } else {
        format!("VBoxManage exited with status {}", out.status)
    };
    Outcome::Failed(reason)
}

/// Interpret `guestproperty get` output.
///
/// A property that the guest has not published yet reads `No value set!`,
/// which is the "no address yet" case, not a failure.
fn parse_guest_ip(out: &CommandOutput) -> IpProbe {
    if out.success() {
        let trimmed = out.stdout.trim();
        if trimmed == "No value set!" || trimmed.is_empty() {
            return IpProbe::NotReady;
        }
        if let Some(value) = trimmed.strip_prefix("Value:") {
            let value = value.trim();
            return match value.parse::<std::net::IpAddr>() {
                Ok(ip) => IpProbe::Addr(ip.to_string()),
                Err(_) => IpProbe::Failed(format!("unparseable address: {}", value)),
            };
        }
        return IpProbe::Failed(format!("unexpected guestproperty output: {}", trimmed));
    }
    let stderr = out.stderr.trim();
    if !stderr.is_empty() {
        IpProbe::Failed(stderr.lines().next().unwrap_or(stderr).to_string())
    } else {
        IpProbe::Failed(format!("VBoxManage exited with status {}", out.status))
    }
}

impl Driver for VboxDriver {
    fn name(&self) -> &'static str {
        "virtualbox"
    }

    fn installed(&self) -> bool {
        self.executable.is_file()
    }

    fn start(&self, vm: &str, gui: bool) -> Result<Outcome> {
        let ty = if gui { "gui" } else { "headless" };
        self.simple(&["startvm", vm, "--type", ty])
    }

    fn stop(&self, vm: &str, mode: StopMode) -> Result<Outcome> {
        let action = match mode {
            StopMode::Graceful => "acpipowerbutton",
            StopMode::Hard => "poweroff",
        };
        self.simple(&["controlvm", vm, action])
    }

    fn pause(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["controlvm", vm, "pause"])
    }

    fn unpause(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["controlvm", vm, "resume"])
    }

    fn suspend(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["controlvm", vm, "savestate"])
    }

    fn guest_ip(&self, vm: &str, _wait: bool) -> Result<IpProbe> {
        // guestproperty has no blocking flag; wait is the caller's loop.
        let out = self.invoke(&["guestproperty", "get", vm, GUEST_IP_PROPERTY])?;
        Ok(parse_guest_ip(&out))
    }

    fn tools_state(&self, _vm: &str) -> Result<Outcome<ToolsState>> {
        Ok(Outcome::Unsupported)
    }

    fn enable_shared_folders(&self, _vm: &str) -> Result<Outcome> {
        Ok(Outcome::Unsupported)
    }

    fn add_shared_folder(&self, _vm: &str, _name: &str, _host_path: &Path) -> Result<Outcome> {
        Ok(Outcome::Unsupported)
    }

    fn list_host_networks(&self) -> Result<Outcome<String>> {
        Ok(Outcome::Unsupported)
    }

    fn list_port_forwardings(&self, _network: &str) -> Result<Outcome<String>> {
        Ok(Outcome::Unsupported)
    }

    fn save_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["snapshot", vm, "take", name])
    }

    fn delete_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["snapshot", vm, "delete", name])
    }

    fn restore_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.simple(&["snapshot", vm, "restore", name])
    }

    fn list_snapshots(&self, vm: &str) -> Result<Outcome<String>> {
        self.text(&["snapshot", vm, "list"])
    }

    fn delete_vm(&self, vm: &str) -> Result<Outcome> {
        self.simple(&["unregistervm", vm, "--delete"])
    }

    fn list_running(&self) -> Result<Outcome<String>> {
        self.text(&["list", "runningvms"])
    }

    fn upgrade_hardware(&self, _vm: &str) -> Result<Outcome> {
        Ok(Outcome::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(status: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_interpret_success() {
        assert!(interpret(&out(0, "Waiting for VM to power on...\n", "")).is_ok());
    }

    #[test]
    fn test_interpret_failure_takes_first_stderr_line() {
        let o = interpret(&out(
            1,
            "",
            "VBoxManage: error: Machine 'web1' is not currently running\nUsage: ...\n",
        ));
        assert_eq!(
            o,
            Outcome::Failed(
                "VBoxManage: error: Machine 'web1' is not currently running".to_string()
            )
        );
    }

    #[test]
    fn test_interpret_failure_without_output() {
        let o = interpret(&out(2, "", ""));
        assert_eq!(
            o,
            Outcome::Failed("VBoxManage exited with status 2".to_string())
        );
    }

    #[test]
    fn test_parse_guest_ip_value() {
        let probe = parse_guest_ip(&out(0, "Value: 10.0.2.15\n", ""));
        assert_eq!(probe, IpProbe::Addr("10.0.2.15".to_string()));
    }

    #[test]
    fn test_parse_guest_ip_no_value_set() {
        let probe = parse_guest_ip(&out(0, "No value set!\n", ""));
        assert_eq!(probe, IpProbe::NotReady);
    }

    #[test]
    fn test_parse_guest_ip_error() {
        let probe = parse_guest_ip(&out(
            1,
            "",
            "VBoxManage: error: Could not find a registered machine named 'web1'\n",
        ));
        assert!(matches!(probe, IpProbe::Failed(_)));
    }

    #[test]
    fn test_unsupported_capabilities_do_not_spawn() {
        // A bogus executable path would make any spawn fail loudly; these
        // must answer Unsupported without touching it.
        let driver = VboxDriver::with_executable(PathBuf::from("/nonexistent/VBoxManage"));
        assert_eq!(driver.tools_state("web1").unwrap(), Outcome::Unsupported);
        assert_eq!(
            driver.enable_shared_folders("web1").unwrap(),
            Outcome::Unsupported
        );
        assert_eq!(
            driver
                .add_shared_folder("web1", "share", Path::new("/tmp"))
                .unwrap(),
            Outcome::Unsupported
        );
        assert_eq!(driver.list_host_networks().unwrap(), Outcome::Unsupported);
        assert_eq!(
            driver.list_port_forwardings("vmnet8").unwrap(),
            Outcome::Unsupported
        );
        assert_eq!(driver.upgrade_hardware("web1").unwrap(), Outcome::Unsupported);
    }
}
