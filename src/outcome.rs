//! Normalized backend operation outcomes.
//!
//! The control executables signal failure in inconsistent ways: vmrun prints
//! an `Error:` line (sometimes with exit 0), VBoxManage exits non-zero with
//! the message on stderr, and both simply lack some capabilities. Drivers
//! translate all of that into the explicit tri-state [`Outcome`] so callers
//! never have to guess what an absent value means.

/// Result of one backend capability invocation.
///
/// `Unsupported` is produced without spawning any external process; it means
/// the selected backend does not offer the capability at all, which callers
/// must be able to distinguish from a real failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The backend performed the operation.
    Ok(T),
    /// The backend ran but reported a failure condition.
    Failed(String),
    /// The capability is not offered by this backend.
    Unsupported,
}

impl<T> Outcome<T> {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// The success value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Map the success value, preserving failure and unsupported states.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Failed(reason) => Outcome::Failed(reason),
            Outcome::Unsupported => Outcome::Unsupported,
        }
    }
}

impl Outcome<()> {
    /// Unit success, for boolean-style operations.
    pub fn done() -> Self {
        Outcome::Ok(())
    }
}

/// Result of a single guest IP address query.
///
/// `NotReady` means the query ran but the guest has not yet reported an
/// address; it is not a failure, and callers with a polling budget retry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpProbe {
    /// The guest reported this address.
    Addr(String),
    /// The guest has no observable address yet.
    NotReady,
    /// The query itself errored.
    Failed(String),
}

impl IpProbe {
    /// The resolved address, if any.
    pub fn addr(self) -> Option<String> {
        match self {
            IpProbe::Addr(ip) => Some(ip),
            _ => None,
        }
    }
}

/// Guest tools state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolsState {
    /// Tools are installed and the in-guest agent is running.
    Running,
    /// Tools are installed but not currently running.
    Installed,
    /// No tools detected in the guest.
    Absent,
}

impl ToolsState {
    /// Whether guest readiness can be probed through the tools.
    ///
    /// Graceful stop and IP resolution both key off this.
    pub fn present(self) -> bool {
        matches!(self, ToolsState::Running | ToolsState::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_ok_and_map() {
        let o: Outcome<String> = Outcome::Ok("10.0.0.5".to_string());
        assert!(o.is_ok());
        let len = o.map(|s| s.len());
        assert_eq!(len, Outcome::Ok(8));
    }

    #[test]
    fn test_outcome_failed_is_not_ok() {
        let o: Outcome = Outcome::Failed("the vm is not powered on".to_string());
        assert!(!o.is_ok());
        assert!(o.ok().is_none());
    }

    #[test]
    fn test_unsupported_survives_map() {
        let o: Outcome<String> = Outcome::Unsupported;
        assert_eq!(o.map(|s| s.len()), Outcome::Unsupported);
    }

    #[test]
    fn test_ip_probe_addr() {
        assert_eq!(
            IpProbe::Addr("192.168.1.2".into()).addr(),
            Some("192.168.1.2".to_string())
        );
        assert_eq!(IpProbe::NotReady.addr(), None);
    }

    #[test]
    fn test_tools_state_present() {
        assert!(ToolsState::Running.present());
        assert!(ToolsState::Installed.present());
        assert!(!ToolsState::Absent.present());
    }
}
