// ── Provisioning orchestrator ──
//
// Executes a validated target configuration step by step. Every
// successful step registers its undo on a LIFO journal; the first failure
// hands the journal to the cleanup coordinator and surfaces one
// `ProvisionFailure`. The site record is written as the second-to-last
// step and the web-server reload is part of the same transaction.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cleanup::CleanupCoordinator;
use crate::error::{CoreError, HostError, ProvisionFailure, Rejection};
use crate::host::{Backup, CmsAdmin, Host};
use crate::model::{
    CmsCredentials, DatabaseCredentials, Domain, Resource, SiteIntent, SiteKind, SiteRecord,
};
use crate::plan::{Compensation, Phase, Step, TargetConfiguration};
use crate::store::SiteStore;
use crate::transition::compute_target;

// ── Outcomes ─────────────────────────────────────────────────────────

/// A fully applied create or update.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub record: SiteRecord,
    pub completed: Vec<Step>,
    /// Undo actions registered along the way and dropped on success.
    pub discarded: Vec<Compensation>,
    /// Admin account used by a fresh CMS install.
    pub admin: Option<CmsAdmin>,
}

/// Result of an update request.
#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    Applied(Box<ProvisionReport>),
    /// The request restated the current configuration; nothing ran.
    Unchanged(SiteRecord),
}

impl ProvisionOutcome {
    pub fn record(&self) -> &SiteRecord {
        match self {
            Self::Applied(report) => &report.record,
            Self::Unchanged(record) => record,
        }
    }
}

// ── Provisioner ──────────────────────────────────────────────────────

pub struct Provisioner<'a, H, S> {
    host: &'a H,
    store: &'a S,
}

impl<'a, H: Host, S: SiteStore> Provisioner<'a, H, S> {
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Self { host, store }
    }

    /// Create a new site.
    pub fn create(&self, intent: &SiteIntent) -> Result<ProvisionReport, CoreError> {
        let domain = required_domain(intent)?;
        if self.store.load(domain)?.is_some() {
            return Err(Rejection::SiteExists {
                domain: domain.to_string(),
            }
            .into());
        }
        if self.host.network_config_exists(domain) {
            return Err(Rejection::NetworkConfigExists {
                domain: domain.to_string(),
            }
            .into());
        }

        let target = compute_target(intent, None)?;
        Ok(self.execute(domain, None, &target, &intent.credentials)?)
    }

    /// Update an existing site. Restating the current configuration is a
    /// successful no-op.
    pub fn update(&self, intent: &SiteIntent) -> Result<ProvisionOutcome, CoreError> {
        let domain = required_domain(intent)?;
        let record = self
            .store
            .load(domain)?
            .ok_or_else(|| Rejection::SiteNotFound {
                domain: domain.to_string(),
            })?;

        let target = match compute_target(intent, Some(&record)) {
            Ok(target) => target,
            Err(Rejection::AmbiguousIntent { .. }) => {
                info!(%domain, "requested configuration already in place");
                return Ok(ProvisionOutcome::Unchanged(record));
            }
            Err(rejection) => return Err(rejection.into()),
        };

        let report = self.execute(domain, Some(&record), &target, &intent.credentials)?;
        Ok(ProvisionOutcome::Applied(Box::new(report)))
    }

    /// Run `target` against `domain`. `current` is the stored record for
    /// updates and `None` for creation.
    pub fn execute(
        &self,
        domain: &Domain,
        current: Option<&SiteRecord>,
        target: &TargetConfiguration,
        credentials: &CmsCredentials,
    ) -> Result<ProvisionReport, ProvisionFailure> {
        let mut run = Execution {
            host: self.host,
            store: self.store,
            domain,
            current,
            target,
            credentials,
            webroot: current.and_then(SiteRecord::webroot_path).cloned(),
            backup: None,
            database: current.and_then(SiteRecord::database_credentials).cloned(),
            admin: None,
            record: None,
            journal: Vec::new(),
            completed: Vec::new(),
        };

        let mut phase = Phase::PreflightCheck;
        info!(%domain, target = %target.profile, ?phase, "provisioning started");

        for &step in &target.steps {
            if step.phase() > phase {
                phase = step.phase();
                info!(%domain, ?phase, "phase started");
            }
            debug!(%domain, %step, "running step");

            match run.step(step) {
                Ok(undo) => {
                    run.completed.push(step);
                    if let Some(undo) = undo {
                        run.journal.push(undo);
                    }
                }
                Err(source) => {
                    warn!(%domain, %step, error = %source, "step failed, rolling back");
                    let rollback = CleanupCoordinator::new(self.host, self.store)
                        .compensate(domain, std::mem::take(&mut run.journal));
                    if !rollback.is_clean() {
                        warn!(%domain, failed = rollback.failed.len(), "rollback incomplete");
                    }
                    return Err(ProvisionFailure {
                        domain: domain.to_string(),
                        step,
                        phase,
                        source,
                        rollback,
                    });
                }
            }
        }

        let record = run.record.take().ok_or_else(|| ProvisionFailure {
            domain: domain.to_string(),
            step: Step::PersistRecord,
            phase: Phase::ReloadingService,
            source: HostError::Failed("plan finished without writing a record".into()),
            rollback: CleanupCoordinator::new(self.host, self.store)
                .compensate(domain, std::mem::take(&mut run.journal)),
        })?;

        info!(%domain, phase = ?Phase::Committed, site = %record.profile(), "site committed");

        let verb = if target.is_creation() { "create" } else { "update" };
        if let Err(e) = self
            .host
            .commit_config_change(&format!("webstead: {verb} site {domain}"))
        {
            warn!(%domain, error = %e, "version-control commit failed");
        }

        Ok(ProvisionReport {
            record,
            completed: run.completed,
            discarded: run.journal,
            admin: run.admin,
        })
    }
}

fn required_domain(intent: &SiteIntent) -> Result<&Domain, Rejection> {
    intent.domain.as_ref().ok_or_else(|| Rejection::InvalidDomain {
        input: String::new(),
    })
}

// ── Step execution ───────────────────────────────────────────────────

/// Mutable state of one provisioning run.
struct Execution<'r, H, S> {
    host: &'r H,
    store: &'r S,
    domain: &'r Domain,
    current: Option<&'r SiteRecord>,
    target: &'r TargetConfiguration,
    credentials: &'r CmsCredentials,
    webroot: Option<PathBuf>,
    /// Pre-update copy taken by `BackupSite`.
    backup: Option<Backup>,
    database: Option<DatabaseCredentials>,
    admin: Option<CmsAdmin>,
    record: Option<SiteRecord>,
    journal: Vec<Compensation>,
    completed: Vec<Step>,
}

impl<H: Host, S: SiteStore> Execution<'_, H, S> {
    fn webroot(&self) -> Result<&Path, HostError> {
        self.webroot
            .as_deref()
            .ok_or_else(|| HostError::Failed(format!("{} has no webroot", self.domain)))
    }

    fn database(&self) -> Result<&DatabaseCredentials, HostError> {
        self.database
            .as_ref()
            .ok_or_else(|| HostError::Failed(format!("{} has no database", self.domain)))
    }

    /// Run one step; returns the undo to register, if any.
    fn step(&mut self, step: Step) -> Result<Option<Compensation>, HostError> {
        let host = self.host;
        let domain = self.domain;

        let undo = match step {
            Step::Preflight => {
                host.check_config()?;
                None
            }
            Step::BackupSite => {
                let current = self
                    .current
                    .ok_or_else(|| HostError::Failed("nothing to back up".into()))?;
                let backup = host.backup_site(current)?;
                self.backup = Some(backup.clone());
                Some(Compensation::RestoreBackup(backup))
            }
            Step::MaterializeWebroot => {
                let path = host.materialize_webroot(domain)?;
                self.webroot = Some(path.clone());
                Some(Compensation::RemoveWebroot(path))
            }
            Step::WriteNetworkConfig => {
                host.write_network_config(domain, &self.target.profile, self.webroot.as_deref())?;
                // Updates restore the previous artifact from the backup.
                self.current.is_none().then_some(Compensation::RemoveNetworkConfig)
            }
            Step::ProvisionDatabase => {
                let db =
                    host.provision_database(domain, self.target.profile.site_type, self.webroot()?)?;
                self.database = Some(db.clone());
                Some(Compensation::DropDatabase(db))
            }
            Step::InstallCms(layout) => {
                let webroot = self.webroot()?;
                let admin =
                    host.install_cms(domain, webroot, self.database()?, layout, self.credentials)?;
                // Updates put the backed-up document root back.
                let undo = Compensation::UninstallCms {
                    webroot: webroot.to_path_buf(),
                    prior: self.backup.clone(),
                };
                self.admin = Some(admin);
                Some(undo)
            }
            Step::EnableMultisite(layout) => {
                host.enable_multisite(domain, self.webroot()?, layout)?;
                None
            }
            Step::RemoveCachePlugin(cache) => {
                let webroot = self.webroot()?;
                if let Some(plugin) = cache.plugin() {
                    host.remove_plugin(webroot, plugin)?;
                }
                Some(Compensation::ReinstallCachePlugin {
                    webroot: webroot.to_path_buf(),
                    cache,
                })
            }
            Step::InstallCachePlugin(cache) => {
                let webroot = self.webroot()?;
                if let Some(plugin) = cache.plugin() {
                    host.install_plugin(webroot, plugin)?;
                }
                Some(Compensation::RemoveCachePlugin {
                    webroot: webroot.to_path_buf(),
                    cache,
                })
            }
            Step::ConfigureAddon { addon, enabled } => {
                host.configure_addon(domain, addon, enabled)?;
                Some(Compensation::RevertAddon {
                    addon,
                    enabled: !enabled,
                })
            }
            Step::SetPermissions => {
                host.set_permissions(self.webroot()?)?;
                None
            }
            Step::PersistRecord => {
                let record = self.build_record()?;
                self.store
                    .save(&record)
                    .map_err(|e| HostError::Failed(e.to_string()))?;
                self.record = Some(record);
                Some(match self.current {
                    Some(prior) => Compensation::RestoreRecord(Box::new(prior.clone())),
                    None => Compensation::DeleteRecord,
                })
            }
            Step::Reload => {
                host.reload_web_server()?;
                None
            }
        };
        Ok(undo)
    }

    /// The record for exactly the validated target.
    fn build_record(&self) -> Result<SiteRecord, HostError> {
        let profile = &self.target.profile;
        let kind = SiteKind::assemble(
            profile,
            self.webroot.clone().map(Resource::Active),
            self.database.clone().map(Resource::Active),
        )
        .ok_or_else(|| {
            HostError::Failed(format!(
                "provisioned resources do not cover a {profile} site"
            ))
        })?;

        Ok(match self.current {
            Some(prior) => SiteRecord {
                kind,
                updated_at: Utc::now(),
                ..prior.clone()
            },
            None => SiteRecord::new(self.domain.clone(), kind),
        })
    }
}
