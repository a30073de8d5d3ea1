//! Shared provisioning logic for devprov.
//!
//! Two components cooperate to make a container workspace usable:
//!
//! - [`validate`] inspects and repairs local version-control settings on
//!   every environment attach (idempotent, safe to repeat).
//! - [`trust`] provisions the system-wide SSH trust store at image-build
//!   or first-boot time so outbound connections succeed non-interactively.
//!
//! Every external system is consumed through a seam ([`vcs::VcsConfig`],
//! [`probe::AuthProbe`], [`trust::StoreHasher`]) with a process-spawning
//! implementation and an in-memory double in [`mock_clients`].

pub mod config;
pub mod mock_clients;
pub mod probe;
pub mod trust;
pub mod types;
pub mod validate;
pub mod vcs;

pub use config::Paths;
pub use probe::{AuthProbe, ProbeError, ProbeOutcome, SshCli, classify_probe_output};
pub use trust::{HashError, InstalledKey, SshKeygen, StoreHasher, TrustReport, provision_host};
pub use types::{
    CheckIssue, ConfigScope, HostKeyMap, HostSpec, HostSpecError, KeyAlgorithm, Severity,
    TransportKind,
};
pub use validate::{
    RepoValidation, ValidateError, ValidateOptions, derive_key_based_url, validate_repository,
};
pub use vcs::{GitCli, VcsConfig, VcsError};
