// ── Core error types ──
//
// Rejections happen before any side effect and need no compensation.
// Provisioning failures happen after side effects and carry the rollback
// summary. Deletion failures leave the affected resource domain active so
// the command can simply be re-run.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ResourceDomain, SiteProfile};
use crate::plan::{Phase, Step};

// ── Rejection ────────────────────────────────────────────────────────

/// A request refused by validation. Nothing has been touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("invalid domain name '{input}'")]
    InvalidDomain { input: String },

    #[error("invalid option combination: {reason}")]
    InvalidCombination { reason: String },

    #[error("cannot update {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The request restates the current configuration. Callers treat this
    /// as a successful no-op.
    #[error("site {domain} already has the requested configuration")]
    AmbiguousIntent { domain: String },

    #[error("site {domain} already exists")]
    SiteExists { domain: String },

    #[error("web server configuration for {domain} already exists")]
    NetworkConfigExists { domain: String },

    #[error("site {domain} does not exist")]
    SiteNotFound { domain: String },

    #[error("site {domain} is partially deleted ({remaining} still present)")]
    PendingDeletion { domain: String, remaining: String },
}

impl Rejection {
    pub(crate) fn combination(reason: impl Into<String>) -> Self {
        Self::InvalidCombination {
            reason: reason.into(),
        }
    }

    pub(crate) fn transition(from: &SiteProfile, to: &SiteProfile) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// ── HostError ────────────────────────────────────────────────────────

/// A collaborator call (filesystem, database, web server) failed.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// The resource to remove was never there.
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{0}")]
    Failed(String),
}

impl HostError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Provisioning ─────────────────────────────────────────────────────

/// Outcome of a compensation pass. Compensation never raises; failures are
/// counted here and logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackSummary {
    pub attempted: usize,
    pub failed: Vec<String>,
}

impl RollbackSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A side-effecting step failed and the orchestrator rolled back.
#[derive(Debug, Error)]
#[error("{step} failed while {phase} for {domain}: {source}")]
pub struct ProvisionFailure {
    pub domain: String,
    pub step: Step,
    pub phase: Phase,
    #[source]
    pub source: HostError,
    pub rollback: RollbackSummary,
}

impl ProvisionFailure {
    /// Reload failures come after the record write and are reported with
    /// their own message by the CLI.
    pub fn is_reload(&self) -> bool {
        matches!(self.step, Step::Reload)
    }
}

// ── Deletion ─────────────────────────────────────────────────────────

/// What a failed removal was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalTarget {
    Resource(ResourceDomain),
    /// Finalization: available artifact and enabled marker.
    NetworkConfig,
}

impl std::fmt::Display for RemovalTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource(domain) => write!(f, "{domain}"),
            Self::NetworkConfig => f.write_str("web server configuration"),
        }
    }
}

/// A removal call failed. The resource domain keeps its active status.
#[derive(Debug, Error)]
#[error("could not delete {target} of {domain}: {source}")]
pub struct DeletionError {
    pub domain: String,
    pub target: RemovalTarget,
    #[source]
    pub source: HostError,
}

// ── Store ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("site store I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("site store at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ── CoreError ────────────────────────────────────────────────────────

/// Unified error type surfaced by the [`Controller`](crate::Controller).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Provisioning(#[from] ProvisionFailure),

    #[error(transparent)]
    Deletion(#[from] DeletionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("web server configuration for {domain} does not exist")]
    NetworkConfigMissing { domain: String },

    #[error("web server reload failed: {source}")]
    ReloadFailed {
        #[source]
        source: HostError,
    },

    /// A hand edit failed the configuration test and was reverted.
    #[error("edited {} failed the web server configuration test", .path.display())]
    EditRejected {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl CoreError {
    /// The domain-level rejection, if this error is one.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
