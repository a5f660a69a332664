//! CLI command implementations.

pub mod machine;
pub mod shell;
pub mod snapshot;

use std::io::Write;

use hangar::descriptor::DescriptorStore;
use hangar::instance::Instance;
use hangar::lifecycle::{Confirmer, Orchestrator, Report};
use hangar::outcome::IpProbe;
use hangar::{Error, Result};

// ============================================================================
// Display Constants
// ============================================================================

/// Display width for instance names.
pub const NAME_WIDTH: usize = 16;

/// Display width for guest addresses and state placeholders.
pub const ADDRESS_WIDTH: usize = 16;

/// Display width for provider names.
pub const PROVIDER_WIDTH: usize = 12;

/// Display width for box identifiers.
pub const BOX_WIDTH: usize = 28;

// ============================================================================
// Shared Helpers
// ============================================================================

/// Truncate a string to max length, adding "..." if needed.
///
/// Length is measured in chars, not bytes, so multi-byte names never cut
/// inside a character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

/// Resolve the instances a command targets: the named one, or all declared
/// instances in Hangarfile order when no name was given.
pub fn targets(store: &DescriptorStore, name: Option<&str>) -> Result<Vec<Instance>> {
    match name {
        Some(name) => Ok(vec![Instance::load(name, store)?]),
        None => store
            .names()
            .into_iter()
            .map(|n| Instance::load(n, store))
            .collect(),
    }
}

/// Print one line per instance report.
pub fn print_reports(reports: &[(String, Report)]) {
    for (name, report) in reports {
        println!("{}: {}", name, report);
    }
}

/// Resolve the guest address for an instance, waiting within the default
/// budget. Errors when the guest never reports one; ssh and scp cannot
/// proceed without it.
pub fn guest_address(orch: &Orchestrator<'_>, instance: &str, vm: &str) -> Result<String> {
    match orch.resolve_ip(vm)? {
        IpProbe::Addr(addr) => Ok(addr),
        IpProbe::NotReady => Err(Error::guest_unreachable(
            instance,
            "guest has not reported an address yet",
        )),
        IpProbe::Failed(reason) => Err(Error::guest_unreachable(instance, reason)),
    }
}

/// Interactive yes/no prompt on stdin.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str, default_yes: bool) -> bool {
        let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
        print!("{} {} ", prompt, hint);
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        match line.trim().to_lowercase().as_str() {
            "" => default_yes,
            "y" | "yes" => true,
            _ => false,
        }
    }
}
