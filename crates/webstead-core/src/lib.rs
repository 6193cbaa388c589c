// webstead-core: site transition validation, saga-style provisioning with
// rollback, two-domain deletion and batch updates for a single web host.

pub mod batch;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod controller;
pub mod deletion;
pub mod error;
pub mod host;
pub mod model;
pub mod plan;
pub mod provision;
pub mod store;
pub mod transition;

// ── Primary re-exports ──────────────────────────────────────────────
pub use batch::{BatchEntry, BatchReport, BatchRunner};
pub use cleanup::CleanupCoordinator;
pub use command::{Command, CommandResult};
pub use config::{DatabaseSettings, HostConfig, HostLayout, ServiceCommands};
pub use controller::{Controller, EditReport, SiteFilter, SiteInfo};
pub use deletion::{DeleteScope, DeletionCoordinator, DeletionReport, DomainResult};
pub use error::{
    CoreError, DeletionError, HostError, ProvisionFailure, Rejection, RemovalTarget,
    RollbackSummary, StoreError,
};
pub use host::{Backup, CmsAdmin, Host, LocalHost, LogPaths};
pub use plan::{ChangeKind, Compensation, Phase, Step, TargetConfiguration};
pub use provision::{ProvisionOutcome, ProvisionReport, Provisioner};
pub use store::{JsonFileStore, MemoryStore, SiteStore};
pub use transition::compute_target;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Addon, CacheType, CmsCredentials, DatabaseCredentials, Domain, ProxyTarget, Resource,
    ResourceDomain, Scope, SiteIntent, SiteKind, SiteProfile, SiteRecord, SiteType, WpLayout,
};
