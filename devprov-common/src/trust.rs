//! Trust-store provisioning: host-key installation, connection shortcuts,
//! and store finalization.
//!
//! Runs once per environment lifecycle, at image-build or first-boot time,
//! so that outbound connections succeed without prompting for host-key
//! acceptance. The store is treated as append-mostly: a failure while
//! hashing or locking it down never rolls back keys that already landed.

use serde::Serialize;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Paths;
use crate::types::{CheckIssue, HostKeyMap, HostSpec, KeyAlgorithm, Severity};

const CHECK_HOST_KEY: &str = "host_key";
const CHECK_SHORTCUT: &str = "shortcut";
const CHECK_FINALIZE: &str = "store_finalize";

/// Mode for the shortcut include file, applied at creation before any
/// content lands.
const SHORTCUT_FILE_MODE: u32 = 0o600;

/// Mode for the trust store after finalization: read-only for all
/// principals.
const STORE_FINAL_MODE: u32 = 0o444;

/// Errors from the key-hashing utility.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to run `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Key-hashing utility: rewrite a trust-store file in place with hashed
/// host entries, leaving a backup copy alongside. The caller deletes the
/// backup and fixes the resulting permissions.
#[allow(async_fn_in_trait)]
pub trait StoreHasher {
    async fn hash_in_place(&self, store: &Path) -> Result<(), HashError>;
}

/// `ssh-keygen -H` wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshKeygen;

impl StoreHasher for SshKeygen {
    async fn hash_in_place(&self, store: &Path) -> Result<(), HashError> {
        let rendered = format!("ssh-keygen -H -f {}", store.display());
        debug!(command = %rendered, "hashing trust store");

        let output = Command::new("ssh-keygen")
            .arg("-H")
            .arg("-f")
            .arg(store)
            .output()
            .await
            .map_err(|source| HashError::Launch {
                command: rendered.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }
        Err(HashError::Command {
            command: rendered,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Record installed into the trust store for one host.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledKey {
    /// Algorithm whose material was used (first match in preference order).
    pub algorithm: KeyAlgorithm,
    /// Host token the record was written under.
    pub host_token: String,
}

/// What one provisioning run did.
#[derive(Debug, Clone, Serialize)]
pub struct TrustReport {
    /// Normalized target domain.
    pub domain: String,
    /// Environment-variable prefix derived from the domain.
    pub env_prefix: String,
    /// Key record installed, if any material was found. `None` with no
    /// issues means there was nothing to provision, which is a valid state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<InstalledKey>,
    /// Shortcut block appended to the include file.
    pub shortcut_written: bool,
    /// Store deduplicated, hashed, and locked down.
    pub store_finalized: bool,
    /// No mutations were performed.
    pub dry_run: bool,
    /// Findings from all steps.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<CheckIssue>,
}

impl TrustReport {
    fn new(spec: &HostSpec, dry_run: bool) -> Self {
        Self {
            domain: spec.host.clone(),
            env_prefix: spec.env_prefix(),
            installed: None,
            shortcut_written: false,
            store_finalized: false,
            dry_run,
            issues: Vec::new(),
        }
    }

    /// Overall result: success unless an error-severity finding was
    /// recorded. Finalization trouble is a warning, partial success with
    /// keys installed beats no keys at all.
    pub fn succeeded(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

/// Provision the trust store for one host: resolve key material from the
/// typed mapping, append the record, emit the connection shortcut, then
/// finalize the store.
///
/// Key installation happens strictly before hashing. A record appended
/// after the hashing pass would stay in plaintext and defeat it.
pub async fn provision_host<H: StoreHasher>(
    spec: &HostSpec,
    keys: &HostKeyMap,
    hasher: &H,
    paths: &Paths,
    dry_run: bool,
) -> TrustReport {
    let mut report = TrustReport::new(spec, dry_run);
    let token = spec.host_token();

    let resolved = keys.preferred();
    match resolved {
        Some((algorithm, _)) => {
            info!(host = %spec.host, %algorithm, token = %token, "host key material resolved");
        }
        None => {
            // Absence is a valid "nothing to provision" state, not an error.
            info!(
                host = %spec.host,
                prefix = %report.env_prefix,
                "no host key material in environment; nothing to install"
            );
        }
    }

    if dry_run {
        report.installed = resolved.map(|(algorithm, _)| InstalledKey {
            algorithm,
            host_token: token,
        });
        return report;
    }

    if let Some((algorithm, material)) = resolved {
        match append_known_host(&paths.known_hosts, &token, material) {
            Ok(()) => {
                info!(store = %paths.known_hosts.display(), token = %token, "trust-store record installed");
                report.installed = Some(InstalledKey {
                    algorithm,
                    host_token: token,
                });
            }
            Err(e) => {
                report.issues.push(CheckIssue::error(
                    CHECK_HOST_KEY,
                    format!(
                        "could not append record to {}: {e}",
                        paths.known_hosts.display()
                    ),
                    None,
                ));
            }
        }
    }

    match write_shortcut(paths, &spec.host) {
        Ok(()) => {
            info!(file = %paths.shortcut_file.display(), host = %spec.host, "connection shortcut appended");
            report.shortcut_written = true;
        }
        Err(e) => {
            report.issues.push(CheckIssue::error(
                CHECK_SHORTCUT,
                format!(
                    "could not write connection shortcut to {}: {e}",
                    paths.shortcut_file.display()
                ),
                None,
            ));
        }
    }

    if paths.known_hosts.exists() {
        report.store_finalized =
            finalize_store(hasher, &paths.known_hosts, &mut report.issues).await;
    }

    report
}

/// Append one `token material` record, creating the store (and its parent
/// directory) on first use. A store locked read-only by an earlier
/// finalization pass is made owner-writable first.
fn append_known_host(store: &Path, token: &str, material: &str) -> std::io::Result<()> {
    if let Some(parent) = store.parent() {
        fs::create_dir_all(parent)?;
    }
    if store.exists() {
        ensure_owner_writable(store)?;
    }

    let mut file = fs::OpenOptions::new().create(true).append(true).open(store)?;
    writeln!(file, "{token} {material}")?;
    Ok(())
}

/// Append the connection-shortcut block for the bare domain, pinning
/// host-key verification against the trust store and disabling the
/// reverse-IP host-name check. The include file gets restrictive
/// permissions at creation, before any content is written; the primary
/// configuration file is never touched.
fn write_shortcut(paths: &Paths, domain: &str) -> std::io::Result<()> {
    fs::create_dir_all(&paths.ssh_config_dir)?;

    let block = format!(
        "Host {domain}\n    HostName {domain}\n    CheckHostIP no\n    StrictHostKeyChecking yes\n    GlobalKnownHostsFile {}\n",
        paths.known_hosts.display()
    );

    let mut options = fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SHORTCUT_FILE_MODE);
    }
    let mut file = options.open(&paths.shortcut_file)?;
    file.write_all(block.as_bytes())?;
    Ok(())
}

/// Deduplicate and hash the store in place, drop the backup the hashing
/// utility leaves behind, and set the store read-only. Each step may fail
/// independently; none rolls back already-installed records.
async fn finalize_store<H: StoreHasher>(
    hasher: &H,
    store: &Path,
    issues: &mut Vec<CheckIssue>,
) -> bool {
    let mut ok = true;

    // A store locked down by an earlier run must open writable again for
    // the dedupe/hash rewrite.
    if let Err(e) = ensure_owner_writable(store) {
        warn!(store = %store.display(), error = %e, "could not reopen trust store for rewrite");
        issues.push(CheckIssue::warning(
            CHECK_FINALIZE,
            format!("could not reopen {} for rewrite: {e}", store.display()),
            None,
        ));
        ok = false;
    }

    if let Err(e) = dedupe_lines(store) {
        warn!(store = %store.display(), error = %e, "could not deduplicate trust store");
        issues.push(CheckIssue::warning(
            CHECK_FINALIZE,
            format!("could not deduplicate {}: {e}", store.display()),
            None,
        ));
        ok = false;
    }

    match hasher.hash_in_place(store).await {
        Ok(()) => {
            let backup = backup_path(store);
            if backup.exists()
                && let Err(e) = fs::remove_file(&backup)
            {
                warn!(backup = %backup.display(), error = %e, "could not remove hashing backup");
                issues.push(CheckIssue::warning(
                    CHECK_FINALIZE,
                    format!("could not remove hashing backup {}: {e}", backup.display()),
                    None,
                ));
                ok = false;
            }
        }
        Err(e) => {
            warn!(store = %store.display(), error = %e, "could not hash trust store");
            issues.push(CheckIssue::warning(
                CHECK_FINALIZE,
                format!("could not hash {}: {e}", store.display()),
                None,
            ));
            ok = false;
        }
    }

    if let Err(e) = set_mode(store, STORE_FINAL_MODE) {
        warn!(store = %store.display(), error = %e, "could not lock down trust store");
        issues.push(CheckIssue::warning(
            CHECK_FINALIZE,
            format!("could not set {} read-only: {e}", store.display()),
            None,
        ));
        ok = false;
    }

    if ok {
        info!(store = %store.display(), "trust store finalized");
    }
    ok
}

/// Backup file the hashing utility produces alongside the store.
fn backup_path(store: &Path) -> PathBuf {
    let mut name = store.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

/// Drop duplicate records, keeping first occurrences in order. Rewrites
/// the file only when something was actually dropped.
fn dedupe_lines(store: &Path) -> std::io::Result<()> {
    let content = fs::read_to_string(store)?;
    let mut seen = std::collections::HashSet::new();
    let mut kept = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() || seen.insert(line.to_string()) {
            kept.push(line);
        }
    }

    let deduped = {
        let mut s = kept.join("\n");
        if !s.is_empty() {
            s.push('\n');
        }
        s
    };
    if deduped != content {
        ensure_owner_writable(store)?;
        fs::write(store, deduped)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)
}

fn ensure_owner_writable(path: &Path) -> std::io::Result<()> {
    let perms = fs::metadata(path)?.permissions();
    if perms.readonly() {
        set_mode(path, 0o644)?;
    }
    Ok(())
}
