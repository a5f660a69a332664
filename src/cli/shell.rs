//! Shell access and file transfer commands.
//!
//! Both commands resolve the guest address through the driver first, then
//! hand off to the system `ssh`/`scp` with inherited stdio so interactive
//! sessions and progress output behave exactly as the user expects.

use std::path::Path;

use clap::Args;

use hangar::descriptor::DescriptorStore;
use hangar::driver::driver_for;
use hangar::instance::Instance;
use hangar::lifecycle::{Orchestrator, Timings};
use hangar::process::run_interactive;
use hangar::transfer::{auth_user, resolve, scp_args, ssh_args};

use super::guest_address;

/// Open a shell or run a command on an instance
#[derive(Args, Debug)]
pub struct SshCmd {
    /// Instance to connect to
    pub instance: String,

    /// Command to run instead of an interactive shell
    #[arg(short, long)]
    pub command: Option<String>,

    /// User to connect as (overrides the instance's declared user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Leave authentication to the local ssh configuration
    #[arg(long)]
    pub plain: bool,

    /// Extra arguments passed to ssh verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

impl SshCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instance = Instance::load(&self.instance, &store)?;
        let Some(vm) = instance.vm_ref() else {
            println!("{}: VM not created", instance.name);
            return Ok(());
        };

        let driver = driver_for(instance.provider)?;
        let orch = Orchestrator::new(driver.as_ref(), Timings::default());
        let address = guest_address(&orch, &instance.name, vm)?;

        let user = auth_user(self.user.as_deref(), instance.user.as_deref(), self.plain);
        let args = ssh_args(&address, user, &self.extra, self.command.as_deref());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let code = run_interactive(Path::new("ssh"), &refs)?;
        if code != 0 {
            std::process::exit(code);
        }
        Ok(())
    }
}

/// Copy files between the host and an instance
#[derive(Args, Debug)]
pub struct ScpCmd {
    /// Source (`instance:path` or a host path)
    pub src: String,

    /// Destination (`instance:path` or a host path)
    pub dst: String,

    /// User to connect as (overrides the instance's declared user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Leave authentication to the local ssh configuration
    #[arg(long)]
    pub plain: bool,

    /// Extra arguments passed to scp verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

impl ScpCmd {
    pub fn run(self) -> hangar::Result<()> {
        let spec = resolve(&self.src, &self.dst)?;

        let store = DescriptorStore::load_cwd()?;
        let instance = Instance::load(&spec.instance, &store)?;
        let Some(vm) = instance.vm_ref() else {
            println!("{}: VM not created", instance.name);
            return Ok(());
        };

        let driver = driver_for(instance.provider)?;
        let orch = Orchestrator::new(driver.as_ref(), Timings::default());
        let address = guest_address(&orch, &instance.name, vm)?;

        let user = auth_user(self.user.as_deref(), instance.user.as_deref(), self.plain);
        let args = scp_args(&spec, &address, user, &self.extra);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let code = run_interactive(Path::new("scp"), &refs)?;
        if code != 0 {
            std::process::exit(code);
        }
        Ok(())
    }
}

/// List the processes running inside an instance
#[derive(Args, Debug)]
pub struct PsCmd {
    /// Instance to inspect
    pub instance: String,

    /// User to connect as (overrides the instance's declared user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Leave authentication to the local ssh configuration
    #[arg(long)]
    pub plain: bool,
}

impl PsCmd {
    pub fn run(self) -> hangar::Result<()> {
        let store = DescriptorStore::load_cwd()?;
        let instance = Instance::load(&self.instance, &store)?;
        let Some(vm) = instance.vm_ref() else {
            println!("{}: VM not created", instance.name);
            return Ok(());
        };

        let driver = driver_for(instance.provider)?;
        let orch = Orchestrator::new(driver.as_ref(), Timings::default());
        let address = guest_address(&orch, &instance.name, vm)?;

        let user = auth_user(self.user.as_deref(), instance.user.as_deref(), self.plain);
        let args = ssh_args(&address, user, &[], Some("ps -ef"));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let code = run_interactive(Path::new("ssh"), &refs)?;
        if code != 0 {
            std::process::exit(code);
        }
        Ok(())
    }
}
