// ── Command API ──
//
// Every state-changing operation flows through the `Command` enum.
// Reads (list, info, show) go straight to the controller instead.

use secrecy::SecretString;

use crate::batch::BatchReport;
use crate::deletion::{DeleteScope, DeletionReport};
use crate::error::CoreError;
use crate::model::{Domain, SiteIntent, SiteRecord};
use crate::provision::{ProvisionOutcome, ProvisionReport};

/// All write operations against the managed host.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Provisioning ─────────────────────────────────────────────────
    CreateSite(SiteIntent),
    UpdateSite(SiteIntent),
    /// Apply one update to every known site.
    UpdateAllSites(SiteIntent),
    ResetCmsPassword {
        domain: Domain,
        user: String,
        password: SecretString,
    },

    // ── Serving ──────────────────────────────────────────────────────
    EnableSite {
        domain: Domain,
    },
    DisableSite {
        domain: Domain,
    },

    // ── Removal ──────────────────────────────────────────────────────
    /// Delete without prompting; interactive deletes use
    /// [`Controller::delete`](crate::Controller::delete).
    DeleteSite {
        domain: Domain,
        scope: DeleteScope,
    },
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Provisioned(Box<ProvisionReport>),
    Unchanged(Box<SiteRecord>),
    Batch(BatchReport<ProvisionOutcome, CoreError>),
    Enabled(Box<SiteRecord>),
    AlreadyEnabled(Box<SiteRecord>),
    Disabled(Box<SiteRecord>),
    AlreadyDisabled(Box<SiteRecord>),
    Deleted(Box<DeletionReport>),
}

impl From<ProvisionOutcome> for CommandResult {
    fn from(outcome: ProvisionOutcome) -> Self {
        match outcome {
            ProvisionOutcome::Applied(report) => Self::Provisioned(report),
            ProvisionOutcome::Unchanged(record) => Self::Unchanged(Box::new(record)),
        }
    }
}
