//! Secure-shell authentication probing.
//!
//! Success is detected by matching a marker substring in the client's
//! diagnostic output. The probe's exit code is deliberately ignored:
//! hosting providers close the no-shell session with a nonzero status
//! even when the key was accepted.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Marker the hosting provider prints when key authentication succeeds.
pub const AUTH_SUCCESS_MARKER: &str = "successfully authenticated";

/// Diagnostics that indicate the transport could not be established.
const UNREACHABLE_MARKERS: &[&str] = &[
    "Could not resolve hostname",
    "Connection timed out",
    "Connection refused",
    "No route to host",
    "Network is unreachable",
];

/// Typed outcome of an authentication probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The remote accepted our key.
    Authenticated,
    /// The transport could not be established at all.
    Unreachable,
    /// The output matched no known pattern (commonly a rejected key).
    Unknown,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify raw probe diagnostics into a typed outcome.
pub fn classify_probe_output(output: &str) -> ProbeOutcome {
    if output.contains(AUTH_SUCCESS_MARKER) {
        return ProbeOutcome::Authenticated;
    }
    if UNREACHABLE_MARKERS.iter().any(|m| output.contains(m)) {
        return ProbeOutcome::Unreachable;
    }
    ProbeOutcome::Unknown
}

/// Errors from launching the probe client.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Interactive secure-shell client consumed for authentication probing.
#[allow(async_fn_in_trait)]
pub trait AuthProbe {
    /// Attempt key authentication against `target` (e.g. `git@github.com`)
    /// and return the combined diagnostic output.
    async fn authenticate(&self, target: &str) -> Result<String, ProbeError>;
}

/// `ssh` CLI probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshCli;

impl AuthProbe for SshCli {
    async fn authenticate(&self, target: &str) -> Result<String, ProbeError> {
        let rendered = format!("ssh -T {}", target);
        debug!(command = %rendered, "probing key authentication");

        let output = Command::new("ssh")
            .arg("-T")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ConnectTimeout=10")
            .arg(target)
            .output()
            .await
            .map_err(|source| ProbeError::Launch {
                command: rendered,
                source,
            })?;

        // The banner lands on stderr; keep both streams for classification.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authenticated() {
        let banner =
            "Hi ada! You've successfully authenticated, but GitHub does not provide shell access.";
        assert_eq!(classify_probe_output(banner), ProbeOutcome::Authenticated);
    }

    #[test]
    fn test_classify_unreachable_variants() {
        for text in [
            "ssh: Could not resolve hostname github.com: Name or service not known",
            "ssh: connect to host github.com port 22: Connection timed out",
            "ssh: connect to host github.com port 22: Connection refused",
            "ssh: connect to host 10.0.4.17 port 22: No route to host",
            "ssh: connect to host github.com port 22: Network is unreachable",
        ] {
            assert_eq!(classify_probe_output(text), ProbeOutcome::Unreachable, "{text}");
        }
    }

    #[test]
    fn test_classify_rejected_key_is_unknown() {
        assert_eq!(
            classify_probe_output("git@github.com: Permission denied (publickey)."),
            ProbeOutcome::Unknown
        );
        assert_eq!(classify_probe_output(""), ProbeOutcome::Unknown);
    }
}
