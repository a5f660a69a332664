//! Scripted in-memory driver for orchestration tests.
//!
//! Records every capability invocation and answers from configured results,
//! so sequencing tests can assert both what was called and what was not.

use std::path::Path;
use std::sync::Mutex;

use crate::error::Result;
use crate::outcome::{IpProbe, Outcome, ToolsState};

use super::{Driver, StopMode};

/// Fake driver with scripted answers and a call log.
///
/// All fields are public so tests can script individual results with
/// struct-update syntax over `Default::default()`.
pub struct FakeDriver {
    /// Log of every capability invocation, in order.
    pub calls: Mutex<Vec<String>>,
    /// Named snapshots currently "taken" on the fake backend.
    pub snapshots: Mutex<Vec<String>>,
    pub start_result: Outcome,
    pub stop_result: Outcome,
    pub pause_result: Outcome,
    pub unpause_result: Outcome,
    pub suspend_result: Outcome,
    pub tools_result: Outcome<ToolsState>,
    pub ip_result: IpProbe,
    pub delete_result: Outcome,
    pub snapshot_result: Outcome,
    pub host_networks: Outcome<String>,
    pub port_forwardings: Outcome<String>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            snapshots: Mutex::new(Vec::new()),
            start_result: Outcome::done(),
            stop_result: Outcome::done(),
            pause_result: Outcome::done(),
            unpause_result: Outcome::done(),
            suspend_result: Outcome::done(),
            tools_result: Outcome::Ok(ToolsState::Running),
            ip_result: IpProbe::Addr("192.168.33.10".to_string()),
            delete_result: Outcome::done(),
            snapshot_result: Outcome::done(),
            host_networks: Outcome::Unsupported,
            port_forwardings: Outcome::Unsupported,
        }
    }
}

impl FakeDriver {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether no capability was ever invoked.
    pub fn untouched(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }
}

impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn installed(&self) -> bool {
        true
    }

    fn start(&self, vm: &str, gui: bool) -> Result<Outcome> {
        self.record(format!("start {} gui={}", vm, gui));
        Ok(self.start_result.clone())
    }

    fn stop(&self, vm: &str, mode: StopMode) -> Result<Outcome> {
        self.record(format!("stop {} {:?}", vm, mode));
        Ok(self.stop_result.clone())
    }

    fn pause(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("pause {}", vm));
        Ok(self.pause_result.clone())
    }

    fn unpause(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("unpause {}", vm));
        Ok(self.unpause_result.clone())
    }

    fn suspend(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("suspend {}", vm));
        Ok(self.suspend_result.clone())
    }

    fn guest_ip(&self, vm: &str, wait: bool) -> Result<IpProbe> {
        self.record(format!("guest_ip {} wait={}", vm, wait));
        Ok(self.ip_result.clone())
    }

    fn tools_state(&self, vm: &str) -> Result<Outcome<ToolsState>> {
        self.record(format!("tools_state {}", vm));
        Ok(self.tools_result.clone())
    }

    fn enable_shared_folders(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("enable_shared_folders {}", vm));
        Ok(Outcome::done())
    }

    fn add_shared_folder(&self, vm: &str, name: &str, host_path: &Path) -> Result<Outcome> {
        self.record(format!(
            "add_shared_folder {} {} {}",
            vm,
            name,
            host_path.display()
        ));
        Ok(Outcome::done())
    }

    fn list_host_networks(&self) -> Result<Outcome<String>> {
        self.record("list_host_networks");
        Ok(self.host_networks.clone())
    }

    fn list_port_forwardings(&self, network: &str) -> Result<Outcome<String>> {
        self.record(format!("list_port_forwardings {}", network));
        Ok(self.port_forwardings.clone())
    }

    fn save_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.record(format!("save_snapshot {} {}", vm, name));
        if self.snapshot_result.is_ok() {
            self.snapshots.lock().unwrap().push(name.to_string());
        }
        Ok(self.snapshot_result.clone())
    }

    fn delete_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.record(format!("delete_snapshot {} {}", vm, name));
        if self.snapshot_result.is_ok() {
            self.snapshots.lock().unwrap().retain(|s| s != name);
        }
        Ok(self.snapshot_result.clone())
    }

    fn restore_snapshot(&self, vm: &str, name: &str) -> Result<Outcome> {
        self.record(format!("restore_snapshot {} {}", vm, name));
        Ok(self.snapshot_result.clone())
    }

    fn list_snapshots(&self, vm: &str) -> Result<Outcome<String>> {
        self.record(format!("list_snapshots {}", vm));
        Ok(Outcome::Ok(self.snapshots.lock().unwrap().join("\n")))
    }

    fn delete_vm(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("delete_vm {}", vm));
        Ok(self.delete_result.clone())
    }

    fn list_running(&self) -> Result<Outcome<String>> {
        self.record("list_running");
        Ok(Outcome::Ok(String::new()))
    }

    fn upgrade_hardware(&self, vm: &str) -> Result<Outcome> {
        self.record(format!("upgrade_hardware {}", vm));
        Ok(Outcome::done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_update_construction_scripts_results() {
        // Tests build fakes with struct-update over Default, so every
        // field must stay visible here.
        let driver = FakeDriver {
            start_result: Outcome::Failed("boom".to_string()),
            ..Default::default()
        };

        assert!(driver.untouched());
        assert_eq!(
            driver.start("vm", false).unwrap(),
            Outcome::Failed("boom".to_string())
        );
        assert_eq!(driver.calls(), vec!["start vm gui=false"]);
    }
}
