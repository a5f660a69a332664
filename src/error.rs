//! Error types for hangar.
//!
//! # Error Message Style Guide
//!
//! All error messages follow a consistent format for clarity and actionability:
//!
//! - **Format**: `"<operation> failed: <reason>"` or `"<entity> not found: <identifier>"`
//! - **Case**: All lowercase (Rust convention for error messages)
//! - **Context**: Include relevant identifiers (instance name, executable, path) when available
//!
//! Backend failures are deliberately *not* errors. A control executable that
//! ran and reported a problem is a normal, recoverable outcome and travels
//! through [`crate::outcome::Outcome`] instead. The variants here cover the
//! cases where the requested operation could not even be attempted: the
//! executable is missing, the descriptor file is broken, or the input is
//! ambiguous.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using hangar's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hangar operations.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Environment Faults
    // ========================================================================
    /// A backend control executable could not be located or spawned.
    #[error("spawn failed: {program}: {reason}")]
    Spawn {
        /// The executable that could not be started.
        program: String,
        /// The reason for the failure.
        reason: String,
    },

    /// A backend control executable is not installed on this host.
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    // ========================================================================
    // Descriptor Errors
    // ========================================================================
    /// The Hangarfile could not be read or parsed.
    #[error("hangarfile operation failed: {operation}: {reason}")]
    Descriptor {
        /// The operation that failed (e.g., "read", "parse").
        operation: String,
        /// The reason for the failure.
        reason: String,
    },

    /// No Hangarfile exists in the working directory.
    #[error("hangarfile not found: {}", path.display())]
    DescriptorNotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// An instance name is not declared in the Hangarfile.
    #[error("instance not found: {name}")]
    InstanceNotFound {
        /// Name of the instance that was not found.
        name: String,
    },

    // ========================================================================
    // Input Ambiguity
    // ========================================================================
    /// A copy operation's arguments could not be disambiguated.
    #[error("transfer resolution failed: {0}")]
    Transfer(String),

    /// Pop was requested on an empty anonymous snapshot stack.
    #[error("snapshot stack is empty: nothing to pop")]
    EmptyStack,

    // ========================================================================
    // Guest Reachability
    // ========================================================================
    /// No guest address could be resolved for an ssh/scp session.
    #[error("guest unreachable: {name}: {reason}")]
    GuestUnreachable {
        /// Name of the instance that could not be reached.
        name: String,
        /// Why no address was available.
        reason: String,
    },

    // ========================================================================
    // Snapshot Stack Persistence
    // ========================================================================
    /// The persisted push stack could not be read or written.
    #[error("snapshot stack operation failed: {operation}: {reason}")]
    Stack {
        /// The operation that failed (e.g., "load", "save").
        operation: String,
        /// The reason for the failure.
        reason: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error wrapper.
    #[error("io operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn error for an executable that could not be started.
    pub fn spawn(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a descriptor operation error.
    pub fn descriptor(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Descriptor {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an instance not found error.
    pub fn instance_not_found(name: impl Into<String>) -> Self {
        Self::InstanceNotFound { name: name.into() }
    }

    /// Create a transfer resolution error.
    pub fn transfer(reason: impl Into<String>) -> Self {
        Self::Transfer(reason.into())
    }

    /// Create a snapshot stack persistence error.
    pub fn stack(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stack {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a guest unreachable error.
    pub fn guest_unreachable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GuestUnreachable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_includes_program_and_reason() {
        let err = Error::spawn("vmrun", "no such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("vmrun"), "error should include the program");
        assert!(msg.contains("no such file"), "error should include reason");
    }

    #[test]
    fn test_instance_not_found_includes_name() {
        let err = Error::instance_not_found("web1");
        let msg = err.to_string();
        assert!(msg.contains("web1"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_guest_unreachable_includes_instance_and_reason() {
        let err = Error::guest_unreachable("web1", "guest has not reported an address yet");
        let msg = err.to_string();
        assert!(msg.contains("unreachable"));
        assert!(msg.contains("web1"));
        assert!(msg.contains("not reported"));
    }

    #[test]
    fn test_descriptor_includes_operation_and_reason() {
        let err = Error::descriptor("parse", "expected value at line 3");
        let msg = err.to_string();
        assert!(msg.contains("parse"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("failed"));
    }

    #[test]
    fn test_all_errors_are_lowercase() {
        let errors: Vec<Error> = vec![
            Error::spawn("vmrun", "reason"),
            Error::ExecutableNotFound("VBoxManage".to_string()),
            Error::descriptor("read", "reason"),
            Error::instance_not_found("name"),
            Error::transfer("reason"),
            Error::EmptyStack,
            Error::stack("load", "reason"),
            Error::guest_unreachable("web1", "reason"),
        ];

        for err in errors {
            let msg = err.to_string();
            let first_char = msg.chars().next().unwrap();
            assert!(
                first_char.is_lowercase(),
                "error message should start lowercase: {}",
                msg
            );
        }
    }
}
