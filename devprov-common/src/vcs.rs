//! Version-control command interface.
//!
//! The validator consumes git exclusively through this seam: read a
//! configuration key, write a repository-local key, fetch from a named
//! remote. Exit codes are the only failure signal observed; no structured
//! error payload is assumed.

use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::types::ConfigScope;

/// Errors from the version-control command interface.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The command could not be launched at all.
    #[error("failed to run `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited with an unexpected status.
    #[error("`{command}` exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Version-control configuration store and remote access.
#[allow(async_fn_in_trait)]
pub trait VcsConfig {
    /// Read a configuration key; `None` when the key is unset.
    async fn read(&self, scope: ConfigScope, key: &str) -> Result<Option<String>, VcsError>;

    /// Write a repository-local configuration key.
    async fn write_local(&self, key: &str, value: &str) -> Result<(), VcsError>;

    /// Fetch from a named remote; `Ok(false)` on a nonzero exit.
    async fn fetch(&self, remote: &str) -> Result<bool, VcsError>;
}

/// `git` CLI client.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    /// Repository to operate on; the process working directory when `None`.
    repo_dir: Option<PathBuf>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: Some(dir.into()),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(std::process::Output, String), VcsError> {
        let rendered = format!("git {}", args.join(" "));
        debug!(command = %rendered, "running vcs command");

        let mut cmd = Command::new("git");
        if let Some(dir) = &self.repo_dir {
            cmd.current_dir(dir);
        }
        cmd.args(args);

        let output = cmd.output().await.map_err(|source| VcsError::Launch {
            command: rendered.clone(),
            source,
        })?;
        Ok((output, rendered))
    }
}

impl VcsConfig for GitCli {
    async fn read(&self, scope: ConfigScope, key: &str) -> Result<Option<String>, VcsError> {
        let scope_flag = match scope {
            ConfigScope::Local => "--local",
            ConfigScope::Global => "--global",
        };
        let (output, rendered) = self.run(&["config", scope_flag, "--get", key]).await?;

        if output.status.success() {
            let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Ok((!value.is_empty()).then_some(value));
        }

        // `git config --get` exits 1 for an unset key; anything else is a
        // real failure (e.g. not a repository).
        if output.status.code() == Some(1) {
            return Ok(None);
        }

        Err(VcsError::Command {
            command: rendered,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    async fn write_local(&self, key: &str, value: &str) -> Result<(), VcsError> {
        let (output, rendered) = self.run(&["config", "--local", key, value]).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(VcsError::Command {
            command: rendered,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    async fn fetch(&self, remote: &str) -> Result<bool, VcsError> {
        let (output, _) = self.run(&["fetch", "--quiet", remote]).await?;
        Ok(output.status.success())
    }
}
