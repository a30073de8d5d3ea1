//! In-memory doubles for the external command seams.
//!
//! Kept in-src rather than behind `cfg(test)` so integration tests can
//! drive the provisioning components without git, ssh, or ssh-keygen
//! present on the machine.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::probe::{AuthProbe, ProbeError};
use crate::trust::{HashError, StoreHasher};
use crate::types::ConfigScope;
use crate::vcs::{VcsConfig, VcsError};

/// What happens to writes once the configured budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Writes land normally.
    Normal,
    /// Writes return an error.
    Fail,
    /// Writes report success but the value is silently dropped.
    Swallow,
}

#[derive(Debug)]
struct MockVcsState {
    local: HashMap<String, String>,
    global: HashMap<String, String>,
    /// Every attempted local write, in order.
    writes: Vec<(String, String)>,
    fetches: Vec<String>,
    fetch_ok: bool,
    write_budget: Option<usize>,
    exhausted_mode: WriteMode,
}

/// In-memory version-control configuration store with a write journal.
///
/// The journal records every attempted write, which is what the
/// idempotence property asserts against.
#[derive(Debug)]
pub struct MockVcs {
    inner: Mutex<MockVcsState>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVcs {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockVcsState {
                local: HashMap::new(),
                global: HashMap::new(),
                writes: Vec::new(),
                fetches: Vec::new(),
                fetch_ok: true,
                write_budget: None,
                exhausted_mode: WriteMode::Normal,
            }),
        }
    }

    pub fn set_local(&self, key: &str, value: &str) {
        let mut state = self.inner.lock().unwrap();
        state.local.insert(key.to_string(), value.to_string());
    }

    pub fn set_global(&self, key: &str, value: &str) {
        let mut state = self.inner.lock().unwrap();
        state.global.insert(key.to_string(), value.to_string());
    }

    /// Make subsequent fetches succeed or fail.
    pub fn set_fetch_ok(&self, ok: bool) {
        self.inner.lock().unwrap().fetch_ok = ok;
    }

    /// Allow `n` writes, then error out.
    pub fn fail_writes_after(&self, n: usize) {
        let mut state = self.inner.lock().unwrap();
        state.write_budget = Some(n);
        state.exhausted_mode = WriteMode::Fail;
    }

    /// Allow `n` writes, then silently drop values while reporting success.
    pub fn swallow_writes_after(&self, n: usize) {
        let mut state = self.inner.lock().unwrap();
        state.write_budget = Some(n);
        state.exhausted_mode = WriteMode::Swallow;
    }

    /// All attempted local writes, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetches.len()
    }

    pub fn local_value(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().local.get(key).cloned()
    }
}

impl VcsConfig for MockVcs {
    async fn read(&self, scope: ConfigScope, key: &str) -> Result<Option<String>, VcsError> {
        let state = self.inner.lock().unwrap();
        let map = match scope {
            ConfigScope::Local => &state.local,
            ConfigScope::Global => &state.global,
        };
        Ok(map.get(key).cloned())
    }

    async fn write_local(&self, key: &str, value: &str) -> Result<(), VcsError> {
        let mut state = self.inner.lock().unwrap();
        state.writes.push((key.to_string(), value.to_string()));

        let mode = match state.write_budget {
            Some(budget) if state.writes.len() > budget => state.exhausted_mode,
            _ => WriteMode::Normal,
        };
        match mode {
            WriteMode::Normal => {
                state.local.insert(key.to_string(), value.to_string());
                Ok(())
            }
            WriteMode::Swallow => Ok(()),
            WriteMode::Fail => Err(VcsError::Command {
                command: format!("git config --local {key} {value}"),
                status: 1,
                stderr: "mock write rejected".to_string(),
            }),
        }
    }

    async fn fetch(&self, remote: &str) -> Result<bool, VcsError> {
        let mut state = self.inner.lock().unwrap();
        state.fetches.push(remote.to_string());
        Ok(state.fetch_ok)
    }
}

/// Probe returning a canned diagnostic text.
#[derive(Debug, Clone)]
pub struct MockProbe {
    output: String,
}

impl MockProbe {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl AuthProbe for MockProbe {
    async fn authenticate(&self, _target: &str) -> Result<String, ProbeError> {
        Ok(self.output.clone())
    }
}

#[derive(Debug, Default)]
struct MockHasherState {
    /// Store content captured at each invocation, pre-hashing.
    calls: Vec<String>,
    fail: bool,
}

/// Stand-in for the key-hashing utility.
///
/// Mimics the real tool's observable contract: rewrites plaintext host
/// tokens into an opaque `|1|...` form and leaves a `.old` backup
/// alongside, which the provisioner is responsible for deleting.
#[derive(Debug, Default)]
pub struct MockHasher {
    inner: Mutex<MockHasherState>,
}

impl MockHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            inner: Mutex::new(MockHasherState {
                calls: Vec::new(),
                fail: true,
            }),
        }
    }

    /// Store content as seen at each call, before any rewrite.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }
}

impl StoreHasher for MockHasher {
    async fn hash_in_place(&self, store: &Path) -> Result<(), HashError> {
        let rendered = format!("mock-hash -H -f {}", store.display());
        let content = fs::read_to_string(store).map_err(|source| HashError::Launch {
            command: rendered.clone(),
            source,
        })?;

        {
            let mut state = self.inner.lock().unwrap();
            state.calls.push(content.clone());
            if state.fail {
                return Err(HashError::Command {
                    command: rendered,
                    status: 1,
                    stderr: "mock hashing failure".to_string(),
                });
            }
        }

        let io_err = |source| HashError::Launch {
            command: rendered.clone(),
            source,
        };

        let backup = format!("{}.old", store.display());
        fs::write(&backup, &content).map_err(io_err)?;

        let mut hashed = content
            .lines()
            .map(|line| {
                if line.trim().is_empty() || line.starts_with("|1|") {
                    line.to_string()
                } else if let Some((_, material)) = line.split_once(' ') {
                    format!("|1|c2FsdA=|aGFzaA= {material}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        if !hashed.is_empty() {
            hashed.push('\n');
        }
        fs::write(store, hashed).map_err(|source| HashError::Launch {
            command: rendered.clone(),
            source,
        })?;
        Ok(())
    }
}
