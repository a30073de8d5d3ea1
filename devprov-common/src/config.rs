//! Filesystem layout for the trust store and connection shortcuts.
//!
//! Defaults target the system-wide OpenSSH locations; every path can be
//! overridden through a `DEVPROV_*` environment variable (useful for
//! image builds that stage into a chroot) or replaced wholesale for tests.

use serde::Serialize;
use std::path::PathBuf;

/// System-wide trust store recording accepted host identity keys.
pub const DEFAULT_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

/// Directory scanned by the primary ssh client configuration for includes.
pub const DEFAULT_SSH_CONFIG_DIR: &str = "/etc/ssh/ssh_config.d";

/// Include file that receives connection-shortcut blocks. Kept separate
/// from the primary configuration file, which is never mutated.
pub const DEFAULT_SHORTCUT_FILE: &str = "50-devprov.conf";

/// Resolved filesystem targets for one provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct Paths {
    /// Trust-store file, one record per recognized host.
    pub known_hosts: PathBuf,
    /// Configuration-include directory (created if absent).
    pub ssh_config_dir: PathBuf,
    /// Dedicated shortcut include file inside `ssh_config_dir`.
    pub shortcut_file: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        let ssh_config_dir = PathBuf::from(DEFAULT_SSH_CONFIG_DIR);
        Self {
            known_hosts: PathBuf::from(DEFAULT_KNOWN_HOSTS),
            shortcut_file: ssh_config_dir.join(DEFAULT_SHORTCUT_FILE),
            ssh_config_dir,
        }
    }
}

impl Paths {
    /// System defaults with `DEVPROV_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Paths::from_env`] but reading through an arbitrary lookup
    /// function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut paths = Self::default();
        if let Some(v) = lookup("DEVPROV_KNOWN_HOSTS") {
            paths.known_hosts = PathBuf::from(v);
        }
        if let Some(v) = lookup("DEVPROV_SSH_CONFIG_DIR") {
            paths.ssh_config_dir = PathBuf::from(v);
            paths.shortcut_file = paths.ssh_config_dir.join(DEFAULT_SHORTCUT_FILE);
        }
        if let Some(v) = lookup("DEVPROV_SHORTCUT_FILE") {
            paths.shortcut_file = PathBuf::from(v);
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = Paths::default();
        assert_eq!(paths.known_hosts, PathBuf::from("/etc/ssh/ssh_known_hosts"));
        assert_eq!(
            paths.shortcut_file,
            PathBuf::from("/etc/ssh/ssh_config.d/50-devprov.conf")
        );
    }

    #[test]
    fn test_config_dir_override_moves_shortcut_file() {
        let paths = Paths::from_lookup(|name| {
            (name == "DEVPROV_SSH_CONFIG_DIR").then(|| "/tmp/stage/ssh_config.d".to_string())
        });
        assert_eq!(
            paths.shortcut_file,
            PathBuf::from("/tmp/stage/ssh_config.d/50-devprov.conf")
        );
        // Untouched paths keep their defaults.
        assert_eq!(paths.known_hosts, PathBuf::from(DEFAULT_KNOWN_HOSTS));
    }

    #[test]
    fn test_explicit_shortcut_file_wins() {
        let paths = Paths::from_lookup(|name| match name {
            "DEVPROV_SSH_CONFIG_DIR" => Some("/tmp/stage/ssh_config.d".to_string()),
            "DEVPROV_SHORTCUT_FILE" => Some("/tmp/elsewhere/hosts.conf".to_string()),
            _ => None,
        });
        assert_eq!(paths.shortcut_file, PathBuf::from("/tmp/elsewhere/hosts.conf"));
    }
}
