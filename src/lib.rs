//! hangar - local VM lifecycle manager
//!
//! hangar drives virtual machines declared in a working-directory
//! `Hangarfile` through two hypervisor backends: VMware (via `vmrun`) and
//! VirtualBox (via `VBoxManage`). Both sit behind one capability contract,
//! so the lifecycle, snapshot, and transfer layers never know which control
//! executable they are talking to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  hangar CLI                                     │
//! ├─────────────────────────────────────────────────┤
//! │  Orchestration (lifecycle, snapshot, transfer)  │
//! ├─────────────────────────────────────────────────┤
//! │  Driver contract (VmrunDriver, VboxDriver)      │
//! ├─────────────────────────────────────────────────┤
//! │  vmrun / VBoxManage child processes             │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hangar::descriptor::DescriptorStore;
//! use hangar::driver::driver_for;
//! use hangar::instance::Instance;
//! use hangar::lifecycle::{Orchestrator, Timings};
//!
//! let store = DescriptorStore::load_cwd().unwrap();
//! let instance = Instance::load("web1", &store).unwrap();
//!
//! let driver = driver_for(instance.provider).unwrap();
//! let orch = Orchestrator::new(driver.as_ref(), Timings::default());
//!
//! let report = orch.up(&instance, false).unwrap();
//! println!("{}", report);
//! ```
//!
//! # Features
//!
//! - Start, stop, pause, resume, suspend, destroy
//! - Guest IP resolution with bounded polling
//! - Named snapshots plus an anonymous push/pop stack
//! - NAT port-forwarding listings
//! - ssh and scp into guests with declared or overridden users

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod driver;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod outcome;
pub mod process;
pub mod snapshot;
pub mod transfer;

// Re-export main types for convenience
pub use descriptor::{Descriptor, DescriptorStore};
pub use driver::{driver_for, Driver, StopMode, VboxDriver, VmrunDriver};
pub use error::{Error, Result};
pub use instance::{Instance, Provider};
pub use lifecycle::{Orchestrator, Report, Timings};
pub use outcome::{IpProbe, Outcome, ToolsState};
pub use snapshot::{SnapshotManager, SnapshotReport};
pub use transfer::TransferSpec;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
