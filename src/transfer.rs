//! Guest/host file transfer and shell access.
//!
//! Endpoints are disambiguated by the colon separator alone: exactly one of
//! the two transfer arguments must be `instance:path`. No filesystem probing
//! is done to guess direction, so the resolution is a pure function of the
//! argument strings and fails loudly instead of guessing wrong.
//!
//! The module only resolves endpoints and builds `ssh`/`scp` argument
//! vectors; spawning with inherited stdio is the process layer's job.

use crate::error::{Error, Result};

/// A resolved file transfer between the host and one guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    /// Name of the instance on the guest side.
    pub instance: String,
    /// Path inside the guest.
    pub guest_path: String,
    /// Path on the host.
    pub host_path: String,
    /// True when copying host to guest.
    pub upload: bool,
}

/// Resolve a `src dst` argument pair into a [`TransferSpec`].
pub fn resolve(src: &str, dst: &str) -> Result<TransferSpec> {
    let src_remote = split_endpoint(src)?;
    let dst_remote = split_endpoint(dst)?;

    match (src_remote, dst_remote) {
        (None, None) => Err(Error::transfer(format!(
            "could not determine the instance: neither {:?} nor {:?} names one",
            src, dst
        ))),
        (Some(_), Some(_)) => Err(Error::transfer(format!(
            "cannot copy between two instances: {:?} and {:?}",
            src, dst
        ))),
        (Some((instance, guest_path)), None) => Ok(TransferSpec {
            instance,
            guest_path,
            host_path: dst.to_string(),
            upload: false,
        }),
        (None, Some((instance, guest_path))) => Ok(TransferSpec {
            instance,
            guest_path,
            host_path: src.to_string(),
            upload: true,
        }),
    }
}

/// Split an endpoint at the first colon into `(instance, path)`.
///
/// Endpoints without a colon are host paths and yield `None`. A colon with
/// nothing before it is an error rather than a silent host path.
fn split_endpoint(arg: &str) -> Result<Option<(String, String)>> {
    match arg.split_once(':') {
        None => Ok(None),
        Some(("", _)) => Err(Error::transfer(format!(
            "empty instance name in {:?}",
            arg
        ))),
        Some((instance, path)) => Ok(Some((instance.to_string(), path.to_string()))),
    }
}

/// Pick the user for the `user@address` prefix.
///
/// An explicit override always wins; otherwise the instance's declared user
/// applies, except in plain mode where the local ssh configuration is left
/// to decide.
pub fn auth_user<'a>(
    override_user: Option<&'a str>,
    instance_user: Option<&'a str>,
    plain: bool,
) -> Option<&'a str> {
    match override_user {
        Some(user) => Some(user),
        None if plain => None,
        None => instance_user,
    }
}

/// Format an ssh/scp destination, with the user prefix when one applies.
fn destination(user: Option<&str>, address: &str) -> String {
    match user {
        Some(user) => format!("{}@{}", user, address),
        None => address.to_string(),
    }
}

/// Options shared by every ssh and scp invocation.
///
/// Host keys churn every time a box is re-created, so strict checking is
/// disabled and known hosts go to the bit bucket.
fn common_options() -> Vec<String> {
    vec![
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
    ]
}

/// Build the argument vector for an `scp` transfer to `address`.
///
/// `extra` is passed through verbatim before the paths.
pub fn scp_args(
    spec: &TransferSpec,
    address: &str,
    user: Option<&str>,
    extra: &[String],
) -> Vec<String> {
    let remote = format!("{}:{}", destination(user, address), spec.guest_path);
    let mut args = common_options();
    args.extend(extra.iter().cloned());
    if spec.upload {
        args.push(spec.host_path.clone());
        args.push(remote);
    } else {
        args.push(remote);
        args.push(spec.host_path.clone());
    }
    args
}

/// Build the argument vector for an `ssh` session or remote command.
///
/// `extra` is passed through verbatim before the destination; a command, if
/// given, runs instead of an interactive shell.
pub fn ssh_args(
    address: &str,
    user: Option<&str>,
    extra: &[String],
    command: Option<&str>,
) -> Vec<String> {
    let mut args = common_options();
    args.extend(extra.iter().cloned());
    args.push(destination(user, address));
    if let Some(command) = command {
        args.push("--".to_string());
        args.push(command.to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_upload() {
        let spec = resolve("hosts", "foo:/tmp/hosts").unwrap();
        assert_eq!(
            spec,
            TransferSpec {
                instance: "foo".to_string(),
                guest_path: "/tmp/hosts".to_string(),
                host_path: "hosts".to_string(),
                upload: true,
            }
        );
    }

    #[test]
    fn test_resolve_download() {
        let spec = resolve("foo:/etc/hosts", "hosts").unwrap();
        assert_eq!(
            spec,
            TransferSpec {
                instance: "foo".to_string(),
                guest_path: "/etc/hosts".to_string(),
                host_path: "hosts".to_string(),
                upload: false,
            }
        );
    }

    #[test]
    fn test_resolve_neither_side_remote() {
        let err = resolve("hosts", "hosts.bak").unwrap_err();
        assert!(matches!(err, Error::Transfer(_)));
        assert!(err.to_string().contains("could not determine"));
    }

    #[test]
    fn test_resolve_both_sides_remote() {
        let err = resolve("foo:/a", "bar:/b").unwrap_err();
        assert!(matches!(err, Error::Transfer(_)));
        assert!(err.to_string().contains("between two instances"));
    }

    #[test]
    fn test_resolve_empty_instance_name() {
        let err = resolve(":/etc/hosts", "hosts").unwrap_err();
        assert!(matches!(err, Error::Transfer(_)));
        assert!(err.to_string().contains("empty instance name"));
    }

    #[test]
    fn test_only_first_colon_splits() {
        let spec = resolve("foo:/tmp/a:b", "out").unwrap();
        assert_eq!(spec.guest_path, "/tmp/a:b");
    }

    #[test]
    fn test_auth_user_precedence() {
        assert_eq!(auth_user(Some("root"), Some("vagrant"), false), Some("root"));
        assert_eq!(auth_user(None, Some("vagrant"), false), Some("vagrant"));
        assert_eq!(auth_user(None, Some("vagrant"), true), None);
        // Override beats plain mode: the user asked for it explicitly.
        assert_eq!(auth_user(Some("root"), None, true), Some("root"));
        assert_eq!(auth_user(None, None, false), None);
    }

    #[test]
    fn test_scp_args_upload_order() {
        let spec = resolve("hosts", "foo:/tmp/hosts").unwrap();
        let args = scp_args(&spec, "192.168.33.10", Some("vagrant"), &[]);
        let tail: Vec<_> = args.iter().rev().take(2).rev().collect();
        assert_eq!(tail, vec!["hosts", "vagrant@192.168.33.10:/tmp/hosts"]);
    }

    #[test]
    fn test_scp_args_download_order() {
        let spec = resolve("foo:/etc/hosts", "hosts").unwrap();
        let args = scp_args(&spec, "192.168.33.10", None, &[]);
        let tail: Vec<_> = args.iter().rev().take(2).rev().collect();
        assert_eq!(tail, vec!["192.168.33.10:/etc/hosts", "hosts"]);
    }

    #[test]
    fn test_scp_args_extra_before_paths() {
        let spec = resolve("foo:/etc/hosts", "hosts").unwrap();
        let extra = vec!["-r".to_string()];
        let args = scp_args(&spec, "192.168.33.10", None, &extra);
        let flag = args.iter().position(|a| a == "-r").unwrap();
        let remote = args
            .iter()
            .position(|a| a == "192.168.33.10:/etc/hosts")
            .unwrap();
        assert!(flag < remote);
    }

    #[test]
    fn test_ssh_args_with_command() {
        let args = ssh_args("10.0.0.5", Some("vagrant"), &[], Some("uname -a"));
        assert!(args.contains(&"vagrant@10.0.0.5".to_string()));
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], "uname -a");
    }

    #[test]
    fn test_ssh_args_extra_before_destination() {
        let extra = vec!["-L".to_string(), "8080:localhost:80".to_string()];
        let args = ssh_args("10.0.0.5", None, &extra, None);
        let dest = args.iter().position(|a| a == "10.0.0.5").unwrap();
        let flag = args.iter().position(|a| a == "-L").unwrap();
        assert!(flag < dest);
        assert_eq!(args.last().unwrap(), "10.0.0.5");
    }
}
