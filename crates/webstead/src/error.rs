//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use webstead_config::ConfigError;
use webstead_core::{CoreError, Rejection, RemovalTarget};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const PROVISIONING: i32 = 10;
    pub const DELETION: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid domain name '{input}'")]
    #[diagnostic(
        code(webstead::invalid_domain),
        help("Pass a bare domain such as example.com; scheme and www. are stripped.")
    )]
    InvalidDomain { input: String },

    #[error("Invalid option combination: {reason}")]
    #[diagnostic(
        code(webstead::invalid_combination),
        help("Run: webstead help create")
    )]
    InvalidCombination { reason: String },

    #[error("Cannot update {from} to {to}")]
    #[diagnostic(
        code(webstead::invalid_transition),
        help(
            "Sites only move up: html -> php -> mysql -> wp -> wpsubdir/wpsubdomain.\n\
             Downgrades and wpsubdir <-> wpsubdomain are not possible."
        )
    )]
    InvalidTransition { from: String, to: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(webstead::validation))]
    Validation { field: String, reason: String },

    // ── Sites ────────────────────────────────────────────────────────
    #[error("Site '{domain}' not found")]
    #[diagnostic(
        code(webstead::not_found),
        help("Run: webstead list to see known sites")
    )]
    SiteNotFound { domain: String },

    #[error("Site '{domain}' already exists")]
    #[diagnostic(
        code(webstead::conflict),
        help("Use: webstead update {domain} to change it")
    )]
    SiteExists { domain: String },

    #[error("nginx configuration for '{domain}' already exists")]
    #[diagnostic(
        code(webstead::conflict),
        help("The server block was not created by webstead. Move it away first.")
    )]
    NetworkConfigExists { domain: String },

    #[error("nginx configuration for '{domain}' is missing")]
    #[diagnostic(
        code(webstead::network_config_missing),
        help("Recreate the site, or restore the server block under sites-available.")
    )]
    NetworkConfigMissing { domain: String },

    #[error("Site '{domain}' is partially deleted")]
    #[diagnostic(
        code(webstead::pending_deletion),
        help("Its {remaining} is still present. Finish with: webstead delete {domain}")
    )]
    PendingDeletion { domain: String, remaining: String },

    // ── Side effects ─────────────────────────────────────────────────
    #[error("Provisioning {domain} failed during {step}")]
    #[diagnostic(
        code(webstead::provisioning_failed),
        help("{rollback}\nRun with -v for details; the log file has the full trace.")
    )]
    Provisioning {
        domain: String,
        step: String,
        rollback: String,
        #[source]
        source: webstead_core::HostError,
    },

    #[error("nginx reload failed")]
    #[diagnostic(
        code(webstead::reload_failed),
        help("Check the configuration with: nginx -t")
    )]
    ReloadFailed {
        #[source]
        source: webstead_core::HostError,
    },

    #[error("Edited {path} did not pass the nginx configuration test")]
    #[diagnostic(
        code(webstead::edit_rejected),
        help("The previous contents were restored and nothing was reloaded.")
    )]
    EditRejected {
        path: String,
        #[source]
        source: webstead_core::HostError,
    },

    #[error("Could not delete {target} of {domain}")]
    #[diagnostic(
        code(webstead::deletion_failed),
        help("Nothing was marked deleted for this part. Fix the cause and re-run the delete.")
    )]
    Deletion {
        domain: String,
        target: String,
        #[source]
        source: webstead_core::HostError,
    },

    #[error("{failed} of {total} sites failed to update")]
    #[diagnostic(code(webstead::batch_failed), help("See the table above for each site's error."))]
    BatchFailed { failed: usize, total: usize },

    #[error(transparent)]
    #[diagnostic(code(webstead::host))]
    Host(webstead_core::HostError),

    #[error(transparent)]
    #[diagnostic(
        code(webstead::state),
        help("The site state file is configured under [paths].state_file.")
    )]
    Store(webstead_core::StoreError),

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(webstead::config),
        help("Check the file printed by: webstead config path")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(webstead::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {reason}")]
    #[diagnostic(
        code(webstead::prompt),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    Prompt { reason: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(webstead::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidDomain { .. }
            | Self::InvalidCombination { .. }
            | Self::InvalidTransition { .. }
            | Self::Validation { .. }
            | Self::Prompt { .. } => exit_code::USAGE,
            Self::SiteNotFound { .. } | Self::NetworkConfigMissing { .. } => exit_code::NOT_FOUND,
            Self::SiteExists { .. }
            | Self::NetworkConfigExists { .. }
            | Self::PendingDeletion { .. }
            | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Provisioning { .. }
            | Self::ReloadFailed { .. }
            | Self::EditRejected { .. }
            | Self::BatchFailed { .. } => exit_code::PROVISIONING,
            Self::Deletion { .. } => exit_code::DELETION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<Rejection> for CliError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidDomain { input } => Self::InvalidDomain { input },
            Rejection::InvalidCombination { reason } => Self::InvalidCombination { reason },
            Rejection::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            // Callers turn this into a no-op before it gets here.
            Rejection::AmbiguousIntent { domain } => Self::InvalidCombination {
                reason: format!("{domain} already has the requested configuration"),
            },
            Rejection::SiteExists { domain } => Self::SiteExists { domain },
            Rejection::NetworkConfigExists { domain } => Self::NetworkConfigExists { domain },
            Rejection::SiteNotFound { domain } => Self::SiteNotFound { domain },
            Rejection::PendingDeletion { domain, remaining } => {
                Self::PendingDeletion { domain, remaining }
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Rejected(rejection) => rejection.into(),

            CoreError::Provisioning(failure) => {
                let rollback = if failure.rollback.is_clean() {
                    format!(
                        "All {} completed step(s) were rolled back.",
                        failure.rollback.attempted
                    )
                } else {
                    format!(
                        "Rollback was incomplete; clean up by hand:\n  {}",
                        failure.rollback.failed.join("\n  ")
                    )
                };
                Self::Provisioning {
                    domain: failure.domain,
                    step: failure.step.to_string(),
                    rollback,
                    source: failure.source,
                }
            }

            CoreError::Deletion(e) => Self::Deletion {
                domain: e.domain,
                target: match e.target {
                    RemovalTarget::Resource(which) => which.to_string(),
                    RemovalTarget::NetworkConfig => "nginx configuration".into(),
                },
                source: e.source,
            },

            CoreError::Store(e) => Self::Store(e),

            CoreError::NetworkConfigMissing { domain } => Self::NetworkConfigMissing { domain },

            CoreError::ReloadFailed { source } => Self::ReloadFailed { source },

            CoreError::EditRejected { path, source } => Self::EditRejected {
                path: path.display().to_string(),
                source,
            },

            CoreError::Host(e) => Self::Host(e),
        }
    }
}
