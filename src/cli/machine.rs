//! Machine lifecycle commands.
//!
//! Every lifecycle command targets either one named instance or, with no
//! name given, every instance declared in the Hangarfile. Batches run
//! sequentially and one instance's failure never aborts the rest.

use clap::Args;

use hangar::descriptor::DescriptorStore;
use hangar::driver::driver_for;
use hangar::instance::Provider;
use hangar::lifecycle::{run_batch, Orchestrator, Timings};
use hangar::outcome::{IpProbe, Outcome};

use super::{print_reports, targets, StdinConfirmer};
use super::{ADDRESS_WIDTH, BOX_WIDTH, NAME_WIDTH, PROVIDER_WIDTH};

/// Start instances and wait for guest readiness
#[derive(Args, Debug)]
pub struct UpCmd {
    /// Instance to start (default: all)
    pub instance: Option<String>,

    /// Show the hypervisor GUI instead of starting headless
    #[arg(long)]
    pub gui: bool,

    /// Skip shared-folder setup for this start
    #[arg(long)]
    pub disable_shared_folders: bool,
}

impl UpCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let mut instances = targets(&store, self.instance.as_deref())?;
        for inst in &mut instances {
            inst.disable_shared_folders = self.disable_shared_folders;
        }

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).up(inst, self.gui)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Stop instances, gracefully when guest tools allow it
#[derive(Args, Debug)]
pub struct DownCmd {
    /// Instance to stop (default: all)
    pub instance: Option<String>,

    /// Power off without asking the guest OS
    #[arg(short, long)]
    pub force: bool,
}

impl DownCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).down(inst, self.force)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Pause running instances
#[derive(Args, Debug)]
pub struct PauseCmd {
    /// Instance to pause (default: all)
    pub instance: Option<String>,
}

impl PauseCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).pause(inst)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Resume paused or suspended instances, starting them if needed
#[derive(Args, Debug)]
pub struct ResumeCmd {
    /// Instance to resume (default: all)
    pub instance: Option<String>,

    /// Skip shared-folder setup if the resume falls through to a start
    #[arg(long)]
    pub disable_shared_folders: bool,
}

impl ResumeCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let mut instances = targets(&store, self.instance.as_deref())?;
        for inst in &mut instances {
            inst.disable_shared_folders = self.disable_shared_folders;
        }

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).resume(inst)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Suspend instances to disk
#[derive(Args, Debug)]
pub struct SuspendCmd {
    /// Instance to suspend (default: all)
    pub instance: Option<String>,
}

impl SuspendCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).suspend(inst)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Stop instances and remove all their local state
#[derive(Args, Debug)]
pub struct DestroyCmd {
    /// Instance to destroy (default: all)
    pub instance: Option<String>,

    /// Destroy without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

impl DestroyCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;
        let confirmer = StdinConfirmer;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).destroy(
                inst,
                self.force,
                &confirmer,
            )
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Show the guest IP address of instances
#[derive(Args, Debug)]
pub struct IpCmd {
    /// Instance to query (default: all)
    pub instance: Option<String>,
}

impl IpCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        for inst in &instances {
            let Some(vm) = inst.vm_ref() else {
                println!("{}: VM not created", inst.name);
                continue;
            };
            let driver = driver_for(inst.provider)?;
            let orch = Orchestrator::new(driver.as_ref(), Timings::default());
            match orch.quiet_ip(vm)? {
                IpProbe::Addr(addr) => println!("{}: {}", inst.name, addr),
                IpProbe::NotReady => println!("{}: not ready", inst.name),
                IpProbe::Failed(reason) => println!("{}: {}", inst.name, reason),
            }
        }
        Ok(())
    }
}

/// List declared instances
#[derive(Args, Debug)]
pub struct LsCmd {}

impl LsCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, None)?;

        println!(
            "{:<name$} {:<addr$} {:<boxw$} {:<10} {:<prov$}",
            "NAME",
            "ADDRESS",
            "BOX",
            "VERSION",
            "PROVIDER",
            name = NAME_WIDTH,
            addr = ADDRESS_WIDTH,
            boxw = BOX_WIDTH,
            prov = PROVIDER_WIDTH,
        );
        for inst in &instances {
            println!(
                "{:<name$} {:<addr$} {:<boxw$} {:<10} {:<prov$}",
                super::truncate(&inst.name, NAME_WIDTH),
                address_cell(inst)?,
                super::truncate(&inst.box_name, BOX_WIDTH),
                inst.box_version.as_deref().unwrap_or("-"),
                inst.provider.to_string(),
                name = NAME_WIDTH,
                addr = ADDRESS_WIDTH,
                boxw = BOX_WIDTH,
                prov = PROVIDER_WIDTH,
            );
        }
        Ok(())
    }
}

/// Address column for one `ls` row.
///
/// State placeholders stand in when no address is resolvable: the machine
/// was never created, the probe says the guest has not reported yet, or the
/// backend refused the query outright (powered off).
fn address_cell(inst: &hangar::instance::Instance) -> hangar::Result<String> {
    let Some(vm) = inst.vm_ref() else {
        return Ok("notcreated".to_string());
    };
    let driver = match driver_for(inst.provider) {
        Ok(driver) => driver,
        Err(_) => return Ok("unknown".to_string()),
    };
    let orch = Orchestrator::new(driver.as_ref(), Timings::default());
    Ok(match orch.quiet_ip(vm)? {
        IpProbe::Addr(addr) => addr,
        IpProbe::NotReady => "running".to_string(),
        IpProbe::Failed(_) => "poweroff".to_string(),
    })
}

/// Show port forwardings of the instances' NAT network
#[derive(Args, Debug)]
pub struct PortCmd {
    /// Instance to query (default: all)
    pub instance: Option<String>,
}

impl PortCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).port_forwardings(inst)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Upgrade the virtual hardware of stopped instances
#[derive(Args, Debug)]
pub struct UpgradeCmd {
    /// Instance to upgrade (default: all)
    pub instance: Option<String>,
}

impl UpgradeCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instances = targets(&store, self.instance.as_deref())?;

        let reports = run_batch(instances, |inst| {
            let driver = driver_for(inst.provider)?;
            Orchestrator::new(driver.as_ref(), Timings::default()).upgrade(inst)
        });
        print_reports(&reports);
        Ok(())
    }
}

/// Show machines currently running under each installed backend
#[derive(Args, Debug)]
pub struct GlobalStatusCmd {}

impl GlobalStatusCmd {
    pub fn run(self) -> hangar::Result<()> {
        for provider in [Provider::Vmware, Provider::Virtualbox] {
            let driver = match driver_for(provider) {
                Ok(driver) => driver,
                Err(_) => {
                    println!("{}: not installed", provider);
                    continue;
                }
            };
            match driver.list_running()? {
                Outcome::Ok(listing) => {
                    let listing = listing.trim();
                    if listing.is_empty() {
                        println!("{}: no running machines", provider);
                    } else {
                        println!("{}:", provider);
                        for line in listing.lines() {
                            println!("  {}", line);
                        }
                    }
                }
                Outcome::Failed(reason) => println!("{}: {}", provider, reason),
                Outcome::Unsupported => {
                    println!("{}: listing not supported", provider)
                }
            }
        }
        Ok(())
    }
}
