//! hangar CLI entry point.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

/// hangar - local VM lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "hangar")]
#[command(about = "Drive VMware and VirtualBox machines from a Hangarfile")]
#[command(
    long_about = "hangar manages the virtual machines declared in the working \
directory's Hangarfile.\n\n\
It speaks to VMware through vmrun and to VirtualBox through VBoxManage, \
behind one uniform set of lifecycle, snapshot, and transfer commands.\n\n\
Quick start:\n  \
hangar up\n  \
hangar ssh web1\n  \
hangar down"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start instances and wait for guest readiness
    #[command(visible_alias = "start")]
    Up(cli::machine::UpCmd),

    /// Stop instances, gracefully when guest tools allow it
    #[command(visible_alias = "stop", alias = "halt")]
    Down(cli::machine::DownCmd),

    /// Pause running instances
    Pause(cli::machine::PauseCmd),

    /// Resume paused or suspended instances, starting them if needed
    #[command(visible_alias = "unpause")]
    Resume(cli::machine::ResumeCmd),

    /// Suspend instances to disk
    Suspend(cli::machine::SuspendCmd),

    /// Stop instances and remove all their local state
    Destroy(cli::machine::DestroyCmd),

    /// Show the guest IP address of instances
    Ip(cli::machine::IpCmd),

    /// List declared instances
    #[command(visible_alias = "list")]
    Ls(cli::machine::LsCmd),

    /// Show port forwardings of the instances' NAT network
    Port(cli::machine::PortCmd),

    /// Upgrade the virtual hardware of stopped instances
    Upgrade(cli::machine::UpgradeCmd),

    /// Show machines currently running under each installed backend
    #[command(name = "global-status", visible_alias = "gs")]
    GlobalStatus(cli::machine::GlobalStatusCmd),

    /// List the processes running inside an instance
    Ps(cli::shell::PsCmd),

    /// Manage instance snapshots
    #[command(subcommand)]
    Snapshot(cli::snapshot::SnapshotCmd),

    /// Open a shell or run a command on an instance
    Ssh(cli::shell::SshCmd),

    /// Copy files between the host and an instance
    Scp(cli::shell::ScpCmd),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to warn
    init_logging();

    tracing::debug!(version = hangar::VERSION, "starting hangar");

    // Execute command
    let result = match cli.command {
        Commands::Up(cmd) => cmd.run(),
        Commands::Down(cmd) => cmd.run(),
        Commands::Pause(cmd) => cmd.run(),
        Commands::Resume(cmd) => cmd.run(),
        Commands::Suspend(cmd) => cmd.run(),
        Commands::Destroy(cmd) => cmd.run(),
        Commands::Ip(cmd) => cmd.run(),
        Commands::Ls(cmd) => cmd.run(),
        Commands::Port(cmd) => cmd.run(),
        Commands::Upgrade(cmd) => cmd.run(),
        Commands::GlobalStatus(cmd) => cmd.run(),
        Commands::Ps(cmd) => cmd.run(),
        Commands::Snapshot(cmd) => cmd.run(),
        Commands::Ssh(cmd) => cmd.run(),
        Commands::Scp(cmd) => cmd.run(),
    };

    // Handle errors
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hangar=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
