//! Lifecycle orchestration.
//!
//! The orchestrator sequences the multi-step operations that a single driver
//! call cannot express: waiting for the guest to settle after power-on,
//! probing guest tools before deciding between graceful and hard stop,
//! polling for an IP address within a bounded budget, and the optimistic
//! unpause-then-start chain behind `resume`.
//!
//! All timing knobs live in [`Timings`] and are passed in explicitly, so
//! tests shrink them to zero and stay deterministic.

use std::time::{Duration, Instant};

use crate::driver::{Driver, StopMode};
use crate::error::Result;
use crate::instance::Instance;
use crate::outcome::{IpProbe, Outcome};

/// Name of the default shared folder mapping the working directory.
pub const DEFAULT_SHARE: &str = "hangar";

/// Yes/no decision source for destructive operations.
///
/// The prompt rendering lives with the CLI; the orchestrator only consumes
/// the boolean.
pub trait Confirmer {
    /// Ask the user to confirm `prompt`; `default_yes` is the answer for an
    /// empty response.
    fn confirm(&self, prompt: &str, default_yes: bool) -> bool;
}

/// Settle and polling intervals for guest readiness.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Pause between power-on and the first tools probe.
    pub settle: Duration,
    /// Total budget for IP resolution.
    pub ip_budget: Duration,
    /// Delay between IP probes.
    pub ip_poll: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            ip_budget: Duration::from_secs(45),
            ip_poll: Duration::from_secs(1),
        }
    }
}

impl Timings {
    /// All-zero timings for tests.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            ip_budget: Duration::ZERO,
            ip_poll: Duration::ZERO,
        }
    }
}

/// Final outcome of one lifecycle operation on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// The instance has no backend state on disk; nothing was attempted.
    NotCreated,
    /// Power-on sequence finished; the address is absent when guest tools
    /// were not detected.
    Started {
        /// Resolved guest address, if tools allowed probing for one.
        address: Option<String>,
    },
    /// Unpause succeeded.
    Resumed {
        /// Address from the optimistic single probe, if any.
        address: Option<String>,
    },
    /// The machine stopped.
    Stopped,
    /// The backend refused to stop the machine; non-fatal.
    NotStopped(String),
    /// The machine paused.
    Paused,
    /// The machine suspended to disk.
    Suspended,
    /// Backend teardown and directory removal finished.
    Destroyed,
    /// The user declined the confirmation prompt.
    Aborted,
    /// Virtual hardware upgraded.
    Upgraded,
    /// Port-forwarding listing for the instance's NAT network.
    Forwardings(String),
    /// The backend does not offer the capability this operation needs.
    Unsupported(&'static str),
    /// The backend ran and reported a failure.
    Failed(String),
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::NotCreated => write!(f, "VM not created"),
            Report::Started { address: Some(ip) } => write!(f, "VM started on {}", ip),
            Report::Started { address: None } => {
                write!(f, "VM started (guest tools not detected)")
            }
            Report::Resumed { address: Some(ip) } => write!(f, "VM resumed on {}", ip),
            Report::Resumed { address: None } => write!(f, "VM resumed"),
            Report::Stopped => write!(f, "Stopped"),
            Report::NotStopped(reason) => write!(f, "Not stopped: {}", reason),
            Report::Paused => write!(f, "Paused"),
            Report::Suspended => write!(f, "Suspended"),
            Report::Destroyed => write!(f, "Deleted"),
            Report::Aborted => write!(f, "Delete aborted"),
            Report::Upgraded => write!(f, "Upgraded"),
            Report::Forwardings(text) => write!(f, "{}", text.trim_end()),
            Report::Unsupported(capability) => {
                write!(f, "{} is not supported on this backend", capability)
            }
            Report::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Sequences lifecycle operations over one backend driver.
pub struct Orchestrator<'a> {
    driver: &'a dyn Driver,
    timings: Timings,
}

impl<'a> Orchestrator<'a> {
    /// Build an orchestrator over `driver` with explicit timings.
    pub fn new(driver: &'a dyn Driver, timings: Timings) -> Self {
        Self { driver, timings }
    }

    /// Start the instance and wait for guest readiness.
    ///
    /// If guest tools are not detected the start is still a terminal
    /// success, just without an address; readiness cannot be determined.
    pub fn up(&self, instance: &Instance, gui: bool) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };

        match self.driver.start(vm, gui)? {
            Outcome::Failed(reason) => {
                return Ok(Report::Failed(format!("not started: {}", reason)))
            }
            Outcome::Unsupported => return Ok(Report::Unsupported("start")),
            Outcome::Ok(()) => {}
        }

        std::thread::sleep(self.timings.settle);

        if !self.tools_present(vm)? {
            tracing::debug!(instance = %instance.name, "guest tools not detected");
            return Ok(Report::Started { address: None });
        }

        let address = self.resolve_ip(vm)?.addr();

        if !instance.disable_shared_folders {
            self.share_working_directory(vm)?;
        }

        Ok(Report::Started { address })
    }

    /// Stop the instance, gracefully when guest tools allow it.
    pub fn down(&self, instance: &Instance, force: bool) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };

        let mode = if !force && self.tools_present(vm)? {
            StopMode::Graceful
        } else {
            StopMode::Hard
        };

        Ok(match self.driver.stop(vm, mode)? {
            Outcome::Ok(()) => Report::Stopped,
            Outcome::Failed(reason) => Report::NotStopped(reason),
            Outcome::Unsupported => Report::Unsupported("stop"),
        })
    }

    /// Pause the instance.
    pub fn pause(&self, instance: &Instance) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };
        Ok(match self.driver.pause(vm)? {
            Outcome::Ok(()) => Report::Paused,
            Outcome::Failed(reason) => Report::Failed(format!("not paused: {}", reason)),
            Outcome::Unsupported => Report::Unsupported("pause"),
        })
    }

    /// Suspend the instance to disk.
    pub fn suspend(&self, instance: &Instance) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };
        Ok(match self.driver.suspend(vm)? {
            Outcome::Ok(()) => Report::Suspended,
            Outcome::Failed(reason) => Report::Failed(format!("not suspended: {}", reason)),
            Outcome::Unsupported => Report::Unsupported("suspend"),
        })
    }

    /// Resume a paused or suspended instance.
    ///
    /// The backend cannot tell "paused" from "never started" up front, so
    /// unpause is probed first (cheap, no side effects when nothing was
    /// paused) and a refusal falls through to the full start sequence,
    /// exactly once.
    pub fn resume(&self, instance: &Instance) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };

        match self.driver.unpause(vm)? {
            Outcome::Ok(()) => {
                std::thread::sleep(self.timings.settle);
                let address = if self.tools_present(vm)? {
                    // Optimistic single probe; a resumed guest either still
                    // holds its lease or will re-report shortly.
                    self.driver.guest_ip(vm, false)?.addr()
                } else {
                    None
                };
                Ok(Report::Resumed { address })
            }
            Outcome::Failed(_) | Outcome::Unsupported => {
                tracing::debug!(instance = %instance.name, "nothing to unpause, starting");
                self.up(instance, false)
            }
        }
    }

    /// Stop, unregister, and remove all traces of the instance.
    ///
    /// Every step is best-effort: stop failures are ignored outright, and
    /// directory removal is attempted even when backend teardown failed so
    /// a leftover directory never blocks re-initialization.
    pub fn destroy(
        &self,
        instance: &Instance,
        force: bool,
        confirmer: &dyn Confirmer,
    ) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };

        if !force {
            let prompt = format!(
                "Are you sure you want to delete {} at {}",
                instance.name,
                instance.path.display()
            );
            if !confirmer.confirm(&prompt, false) {
                return Ok(Report::Aborted);
            }
        }

        // Unconditional teardown: a stop refusal must not stop us.
        let _ = self.driver.stop(vm, StopMode::Hard)?;

        if let Outcome::Failed(reason) = self.driver.delete_vm(vm)? {
            tracing::warn!(instance = %instance.name, reason, "backend teardown failed");
        }

        if instance.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&instance.path) {
                return Ok(Report::Failed(format!(
                    "directory removal failed: {}: {}",
                    instance.path.display(),
                    e
                )));
            }
        }

        Ok(Report::Destroyed)
    }

    /// Upgrade the instance's virtual hardware.
    ///
    /// Refused while the guest tools report running; the machine must be
    /// stopped first.
    pub fn upgrade(&self, instance: &Instance) -> Result<Report> {
        let Some(vm) = instance.vm_ref() else {
            return Ok(Report::NotCreated);
        };

        if let Outcome::Ok(state) = self.driver.tools_state(vm)? {
            if state == crate::outcome::ToolsState::Running {
                return Ok(Report::Failed(
                    "VM must be stopped before upgrading".to_string(),
                ));
            }
        }

        Ok(match self.driver.upgrade_hardware(vm)? {
            Outcome::Ok(()) => Report::Upgraded,
            Outcome::Failed(reason) => Report::Failed(format!("not upgraded: {}", reason)),
            Outcome::Unsupported => Report::Unsupported("hardware upgrade"),
        })
    }

    /// List the port forwardings of the instance's NAT network.
    ///
    /// The driver hands back raw listings; the nat-network discovery and
    /// line parsing is orchestration policy, not backend detail.
    pub fn port_forwardings(&self, instance: &Instance) -> Result<Report> {
        if instance.vm_ref().is_none() {
            return Ok(Report::NotCreated);
        }

        let networks = match self.driver.list_host_networks()? {
            Outcome::Ok(text) => text,
            Outcome::Failed(reason) => return Ok(Report::Failed(reason)),
            Outcome::Unsupported => return Ok(Report::Unsupported("port forwarding listing")),
        };

        for line in networks.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() > 2 && fields[2] == "nat" {
                return Ok(match self.driver.list_port_forwardings(fields[1])? {
                    Outcome::Ok(text) => Report::Forwardings(text),
                    Outcome::Failed(reason) => Report::Failed(reason),
                    Outcome::Unsupported => Report::Unsupported("port forwarding listing"),
                });
            }
        }

        Ok(Report::Failed("cannot find a nat network".to_string()))
    }

    /// Resolve the guest IP, polling within the configured budget.
    ///
    /// Returns `NotReady` once the budget is exhausted; callers treat that
    /// as a transient "unknown", never a failure.
    pub fn resolve_ip(&self, vm: &str) -> Result<IpProbe> {
        let deadline = Instant::now() + self.timings.ip_budget;
        loop {
            match self.driver.guest_ip(vm, true)? {
                IpProbe::NotReady => {
                    if Instant::now() >= deadline {
                        return Ok(IpProbe::NotReady);
                    }
                    std::thread::sleep(self.timings.ip_poll);
                }
                probe => return Ok(probe),
            }
        }
    }

    /// Single best-effort IP probe without blocking.
    pub fn quiet_ip(&self, vm: &str) -> Result<IpProbe> {
        self.driver.guest_ip(vm, false)
    }

    fn tools_present(&self, vm: &str) -> Result<bool> {
        Ok(matches!(
            self.driver.tools_state(vm)?,
            Outcome::Ok(state) if state.present()
        ))
    }

    fn share_working_directory(&self, vm: &str) -> Result<()> {
        match self.driver.enable_shared_folders(vm)? {
            Outcome::Unsupported => {
                tracing::debug!(backend = self.driver.name(), "shared folders unsupported");
                return Ok(());
            }
            Outcome::Failed(reason) => {
                tracing::warn!(reason, "enabling shared folders failed");
                return Ok(());
            }
            Outcome::Ok(()) => {}
        }

        let cwd = std::env::current_dir()?;
        if let Outcome::Failed(reason) = self.driver.add_shared_folder(vm, DEFAULT_SHARE, &cwd)? {
            tracing::warn!(reason, "adding default shared folder failed");
        }
        Ok(())
    }
}

/// Run one lifecycle operation over a set of instances sequentially.
///
/// Failures on one instance are folded into its report and processing
/// continues; a single bad instance never aborts the batch.
pub fn run_batch<F>(instances: Vec<Instance>, mut op: F) -> Vec<(String, Report)>
where
    F: FnMut(&Instance) -> Result<Report>,
{
    let mut reports = Vec::with_capacity(instances.len());
    for instance in &instances {
        let report = match op(instance) {
            Ok(report) => report,
            Err(e) => Report::Failed(e.to_string()),
        };
        reports.push((instance.name.clone(), report));
    }
    reports
}
