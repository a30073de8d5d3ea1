//! Common types used across devprov components.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Port assumed (and stripped) when a host specification carries none.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Scope of a version-control configuration read.
///
/// Writes always target the repository-local scope; the global scope is
/// read-only for this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigScope {
    Local,
    Global,
}

/// Transport kind derived from a remote URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Authenticated via a key pair (`git@...` or `ssh://...`).
    KeyBased,
    /// Token/HTTPS-style addressing that needs interactive credentials.
    TokenBased,
}

impl TransportKind {
    /// Classify a remote URL by its addressing scheme.
    pub fn of(url: &str) -> Self {
        if url.starts_with("git@") || url.starts_with("ssh://") {
            Self::KeyBased
        } else {
            Self::TokenBased
        }
    }
}

/// A target host for trust-store provisioning, parsed from
/// `domain|address[:port]` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    /// Hostname or address without any port suffix.
    pub host: String,
    /// Explicit non-default port, if one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Errors from parsing a host specification string.
#[derive(Debug, Error)]
pub enum HostSpecError {
    #[error("empty host specification")]
    Empty,

    #[error("host specification '{spec}' has no hostname before the port")]
    MissingHost { spec: String },

    #[error("invalid port '{port}' in host specification '{spec}'")]
    InvalidPort { spec: String, port: String },
}

impl HostSpec {
    /// Parse `domain|address[:port]`. A literal default-port suffix is
    /// stripped so `host:22` and `host` produce the same spec.
    pub fn parse(raw: &str) -> Result<Self, HostSpecError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(HostSpecError::Empty);
        }

        let Some((host, port)) = raw.rsplit_once(':') else {
            return Ok(Self {
                host: raw.to_string(),
                port: None,
            });
        };

        if host.is_empty() {
            return Err(HostSpecError::MissingHost {
                spec: raw.to_string(),
            });
        }

        let port: u16 = port.parse().map_err(|_| HostSpecError::InvalidPort {
            spec: raw.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self {
            host: host.to_string(),
            port: (port != DEFAULT_SSH_PORT).then_some(port),
        })
    }

    /// Environment-variable prefix for this host: the hostname uppercased
    /// with all periods removed, independent of any port suffix.
    pub fn env_prefix(&self) -> String {
        self.host.to_uppercase().replace('.', "")
    }

    /// Host token used in trust-store records: `[host]:port` when an
    /// explicit port was supplied, the bare hostname otherwise.
    pub fn host_token(&self) -> String {
        match self.port {
            Some(port) => format!("[{}]:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl std::fmt::Display for HostSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Host-key algorithms the provisioner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
    Ecdsa,
    Rsa,
}

impl KeyAlgorithm {
    /// Resolution order: elliptic-curve first, RSA second.
    pub const PREFERENCE: [KeyAlgorithm; 2] = [KeyAlgorithm::Ecdsa, KeyAlgorithm::Rsa];

    /// Suffix of the environment variable carrying this algorithm's key.
    pub fn var_suffix(&self) -> &'static str {
        match self {
            Self::Ecdsa => "ECDSA",
            Self::Rsa => "RSA",
        }
    }

    /// Full environment-variable name for a normalized host prefix.
    pub fn var_name(&self, prefix: &str) -> String {
        format!("{}_SSH_HOST_KEY_{}", prefix, self.var_suffix())
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ecdsa => write!(f, "ecdsa"),
            Self::Rsa => write!(f, "rsa"),
        }
    }
}

/// Key material resolved from the environment for one host, keyed by
/// algorithm. Built once so preference resolution operates on a typed
/// mapping instead of repeated variable-name construction.
#[derive(Debug, Clone, Default)]
pub struct HostKeyMap {
    entries: BTreeMap<KeyAlgorithm, String>,
}

impl HostKeyMap {
    /// Build the map from the process environment.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Build the map from an arbitrary lookup function. Unset and
    /// empty-valued variables contribute nothing.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut entries = BTreeMap::new();
        for algorithm in KeyAlgorithm::PREFERENCE {
            if let Some(material) = lookup(&algorithm.var_name(prefix)) {
                let material = material.trim().to_string();
                if !material.is_empty() {
                    entries.insert(algorithm, material);
                }
            }
        }
        Self { entries }
    }

    /// First populated algorithm in preference order; remaining candidates
    /// are ignored for this host.
    pub fn preferred(&self) -> Option<(KeyAlgorithm, &str)> {
        KeyAlgorithm::PREFERENCE
            .iter()
            .find_map(|a| self.entries.get(a).map(|m| (*a, m.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Severity of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Worth fixing but does not fail the run.
    Warning,
    /// Fails the enclosing check.
    Error,
}

/// An actionable finding from a validation or provisioning step.
#[derive(Debug, Clone, Serialize)]
pub struct CheckIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Which check found the issue.
    pub check: String,
    /// Human-readable message.
    pub message: String,
    /// Exact command that fixes the issue, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl CheckIssue {
    pub fn error(check: &str, message: impl Into<String>, remediation: Option<String>) -> Self {
        Self {
            severity: Severity::Error,
            check: check.to_string(),
            message: message.into(),
            remediation,
        }
    }

    pub fn warning(check: &str, message: impl Into<String>, remediation: Option<String>) -> Self {
        Self {
            severity: Severity::Warning,
            check: check.to_string(),
            message: message.into(),
            remediation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_spec_bare_domain() {
        let spec = HostSpec::parse("github.com").unwrap();
        assert_eq!(spec.host, "github.com");
        assert_eq!(spec.port, None);
        assert_eq!(spec.host_token(), "github.com");
    }

    #[test]
    fn test_host_spec_default_port_stripped() {
        let spec = HostSpec::parse("github.com:22").unwrap();
        assert_eq!(spec.port, None);
        assert_eq!(spec.host_token(), "github.com");
        assert_eq!(spec.to_string(), "github.com");
    }

    #[test]
    fn test_host_spec_explicit_port_bracketed() {
        let spec = HostSpec::parse("example.com:2222").unwrap();
        assert_eq!(spec.port, Some(2222));
        assert_eq!(spec.host_token(), "[example.com]:2222");
    }

    #[test]
    fn test_host_spec_address() {
        let spec = HostSpec::parse("10.0.4.17:2200").unwrap();
        assert_eq!(spec.host, "10.0.4.17");
        assert_eq!(spec.host_token(), "[10.0.4.17]:2200");
    }

    #[test]
    fn test_host_spec_rejects_garbage() {
        assert!(HostSpec::parse("").is_err());
        assert!(HostSpec::parse("  ").is_err());
        assert!(HostSpec::parse(":2222").is_err());
        assert!(HostSpec::parse("host:notaport").is_err());
        assert!(HostSpec::parse("host:99999").is_err());
    }

    #[test]
    fn test_env_prefix_uppercases_and_strips_periods() {
        for (raw, expected) in [
            ("github.com", "GITHUBCOM"),
            ("github.com:22", "GITHUBCOM"),
            ("example.com:2222", "EXAMPLECOM"),
            ("code.internal.corp.net", "CODEINTERNALCORPNET"),
            ("10.0.4.17", "100417"),
        ] {
            let spec = HostSpec::parse(raw).unwrap();
            assert_eq!(spec.env_prefix(), expected, "prefix for {raw}");
        }
    }

    #[test]
    fn test_transport_kind_classification() {
        assert_eq!(
            TransportKind::of("git@github.com:org/repo.git"),
            TransportKind::KeyBased
        );
        assert_eq!(
            TransportKind::of("ssh://git@github.com/org/repo.git"),
            TransportKind::KeyBased
        );
        assert_eq!(
            TransportKind::of("https://github.com/org/repo.git"),
            TransportKind::TokenBased
        );
        assert_eq!(
            TransportKind::of("https://token@github.com/org/repo.git"),
            TransportKind::TokenBased
        );
    }

    #[test]
    fn test_key_map_prefers_ecdsa() {
        let map = HostKeyMap::from_lookup("GITHUBCOM", |name| match name {
            "GITHUBCOM_SSH_HOST_KEY_ECDSA" => Some("ecdsa-sha2-nistp256 AAAAe...".into()),
            "GITHUBCOM_SSH_HOST_KEY_RSA" => Some("ssh-rsa AAAAr...".into()),
            _ => None,
        });
        assert_eq!(map.len(), 2);
        let (algorithm, material) = map.preferred().unwrap();
        assert_eq!(algorithm, KeyAlgorithm::Ecdsa);
        assert!(material.starts_with("ecdsa-sha2-nistp256"));
    }

    #[test]
    fn test_key_map_falls_back_to_rsa() {
        let map = HostKeyMap::from_lookup("EXAMPLECOM", |name| {
            (name == "EXAMPLECOM_SSH_HOST_KEY_RSA").then(|| "ssh-rsa AAAA...".to_string())
        });
        let (algorithm, _) = map.preferred().unwrap();
        assert_eq!(algorithm, KeyAlgorithm::Rsa);
    }

    #[test]
    fn test_key_map_empty_value_is_unset() {
        let map = HostKeyMap::from_lookup("EXAMPLECOM", |name| {
            (name == "EXAMPLECOM_SSH_HOST_KEY_ECDSA").then(|| "   ".to_string())
        });
        assert!(map.is_empty());
        assert!(map.preferred().is_none());
    }

    #[test]
    fn test_key_map_var_names() {
        assert_eq!(
            KeyAlgorithm::Ecdsa.var_name("GITHUBCOM"),
            "GITHUBCOM_SSH_HOST_KEY_ECDSA"
        );
        assert_eq!(
            KeyAlgorithm::Rsa.var_name("EXAMPLECOM"),
            "EXAMPLECOM_SSH_HOST_KEY_RSA"
        );
    }
}
