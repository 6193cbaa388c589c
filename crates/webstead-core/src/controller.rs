// ── Controller ──
//
// Single entry point for consumers. Owns the host collaborator and the
// site store, routes `Command`s to the provisioning, deletion and batch
// machinery, and answers read-only queries directly.

use std::path::{Path, PathBuf};

use chrono::Utc;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::batch::{BatchReport, BatchRunner};
use crate::command::{Command, CommandResult};
use crate::deletion::{DeleteScope, DeletionCoordinator, DeletionReport};
use crate::error::{CoreError, HostError, Rejection};
use crate::host::{Host, LogPaths};
use crate::model::{Addon, Domain, Resource, ResourceDomain, SiteIntent, SiteRecord, SiteType};
use crate::provision::{ProvisionOutcome, ProvisionReport, Provisioner};
use crate::store::SiteStore;

// ── Read models ──────────────────────────────────────────────────────

/// `list` filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SiteFilter {
    Enabled,
    Disabled,
    #[default]
    All,
}

impl SiteFilter {
    pub fn matches(self, record: &SiteRecord) -> bool {
        match self {
            Self::Enabled => record.enabled,
            Self::Disabled => !record.enabled,
            Self::All => true,
        }
    }
}

/// A record plus everything derived from it on the host.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub record: SiteRecord,
    pub webroot: Option<PathBuf>,
    pub logs: LogPaths,
    /// Enabled marker present on disk.
    pub serving: bool,
    pub network_config_present: bool,
}

/// Result of a hand edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    pub path: PathBuf,
    /// The file differs from before; it was tested, reloaded and committed.
    pub changed: bool,
}

// ── Controller ───────────────────────────────────────────────────────

pub struct Controller<H, S> {
    host: H,
    store: S,
}

impl<H: Host, S: SiteStore> Controller<H, S> {
    pub fn new(host: H, store: S) -> Self {
        Self { host, store }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Normalize user input into a domain.
    pub fn resolve_domain(&self, input: &str) -> Result<Domain, CoreError> {
        Ok(self.host.validate_domain(input)?)
    }

    /// Execute a write command.
    pub fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(command = ?cmd, "executing command");
        match cmd {
            Command::CreateSite(intent) => {
                Ok(CommandResult::Provisioned(Box::new(self.create(&intent)?)))
            }
            Command::UpdateSite(intent) => Ok(self.update(&intent)?.into()),
            Command::UpdateAllSites(intent) => {
                Ok(CommandResult::Batch(self.update_all(&intent, |_, _| {})?))
            }
            Command::ResetCmsPassword {
                domain,
                user,
                password,
            } => {
                self.reset_cms_password(&domain, &user, &password)?;
                Ok(CommandResult::Ok)
            }
            Command::EnableSite { domain } => self.enable(&domain),
            Command::DisableSite { domain } => self.disable(&domain),
            Command::DeleteSite { domain, scope } => Ok(CommandResult::Deleted(Box::new(
                self.delete(&domain, scope, |_, _| true)?,
            ))),
        }
    }

    // ── Provisioning ─────────────────────────────────────────────────

    pub fn create(&self, intent: &SiteIntent) -> Result<ProvisionReport, CoreError> {
        Provisioner::new(&self.host, &self.store).create(intent)
    }

    pub fn update(&self, intent: &SiteIntent) -> Result<ProvisionOutcome, CoreError> {
        Provisioner::new(&self.host, &self.store).update(intent)
    }

    /// Apply `intent` to every known site in domain order, continuing past
    /// per-site failures. `progress` sees each site's result as it lands.
    pub fn update_all(
        &self,
        intent: &SiteIntent,
        mut progress: impl FnMut(&Domain, &Result<ProvisionOutcome, CoreError>),
    ) -> Result<BatchReport<ProvisionOutcome, CoreError>, CoreError> {
        if intent.domain.is_some() {
            return Err(Rejection::combination("--all can not be used with a site name").into());
        }
        if intent.site_types.contains(&SiteType::Html) {
            return Err(Rejection::combination("no site can be updated to html").into());
        }
        if intent.is_empty() {
            return Err(Rejection::combination("no update options given").into());
        }

        let domains = self.store.list()?.into_iter().map(|r| r.domain);
        let provisioner = Provisioner::new(&self.host, &self.store);
        let report = BatchRunner.run(domains, |domain| {
            let result = provisioner.update(&intent.retarget(domain.clone()));
            progress(domain, &result);
            result
        });
        info!(
            sites = report.len(),
            failed = report.failed().count(),
            "batch update finished"
        );
        Ok(report)
    }

    pub fn reset_cms_password(
        &self,
        domain: &Domain,
        user: &str,
        password: &SecretString,
    ) -> Result<(), CoreError> {
        let record = self.site(domain)?;
        if !record.site_type().is_wordpress() {
            return Err(Rejection::combination(format!(
                "{domain} is a {} site; password reset needs WordPress",
                record.site_type()
            ))
            .into());
        }
        let webroot = record
            .webroot_path()
            .ok_or_else(|| Rejection::PendingDeletion {
                domain: domain.to_string(),
                remaining: ResourceDomain::Database.to_string(),
            })?;
        self.host.reset_cms_password(webroot, user, password)?;
        info!(%domain, %user, "CMS password reset");
        Ok(())
    }

    // ── Serving ──────────────────────────────────────────────────────

    pub fn enable(&self, domain: &Domain) -> Result<CommandResult, CoreError> {
        let mut record = self.site(domain)?;
        if !self.host.network_config_exists(domain) {
            return Err(CoreError::NetworkConfigMissing {
                domain: domain.to_string(),
            });
        }
        if record.enabled && self.host.is_enabled(domain) {
            return Ok(CommandResult::AlreadyEnabled(Box::new(record)));
        }

        self.host.enable_site(domain)?;
        record.enabled = true;
        record.updated_at = Utc::now();
        self.store.save(&record)?;
        self.reload_and_commit(&format!("webstead: enable site {domain}"))?;
        info!(%domain, "site enabled");
        Ok(CommandResult::Enabled(Box::new(record)))
    }

    pub fn disable(&self, domain: &Domain) -> Result<CommandResult, CoreError> {
        let mut record = self.site(domain)?;
        let was_serving = match self.host.disable_site(domain) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };

        if !was_serving && !record.enabled {
            return Ok(CommandResult::AlreadyDisabled(Box::new(record)));
        }
        record.enabled = false;
        record.updated_at = Utc::now();
        self.store.save(&record)?;
        if !was_serving {
            return Ok(CommandResult::AlreadyDisabled(Box::new(record)));
        }

        self.reload_and_commit(&format!("webstead: disable site {domain}"))?;
        info!(%domain, "site disabled");
        Ok(CommandResult::Disabled(Box::new(record)))
    }

    fn reload_and_commit(&self, message: &str) -> Result<(), CoreError> {
        self.host
            .reload_web_server()
            .map_err(|source| CoreError::ReloadFailed { source })?;
        if let Err(e) = self.host.commit_config_change(message) {
            warn!(error = %e, "version-control commit failed");
        }
        Ok(())
    }

    // ── Hand editing ─────────────────────────────────────────────────

    /// Let `editor` change the site's server block, or `addon`'s snippet.
    /// A changed file must pass the configuration test, otherwise the old
    /// contents are written back; a passing change is reloaded and
    /// committed.
    pub fn edit(
        &self,
        domain: &Domain,
        addon: Option<Addon>,
        editor: impl FnOnce(&Path) -> Result<(), HostError>,
    ) -> Result<EditReport, CoreError> {
        let record = self.site(domain)?;
        if let Some(addon) = addon {
            if !record.profile().addon(addon) {
                return Err(
                    Rejection::combination(format!("{addon} is not enabled for {domain}")).into(),
                );
            }
        }

        let path = self.host.config_file(domain, addon);
        let before = self.host.read_config_file(&path).map_err(|e| {
            if e.is_not_found() && addon.is_none() {
                CoreError::NetworkConfigMissing {
                    domain: domain.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        editor(&path)?;
        let after = self.host.read_config_file(&path)?;
        if after == before {
            debug!(%domain, path = %path.display(), "configuration left unchanged");
            return Ok(EditReport {
                path,
                changed: false,
            });
        }

        if let Err(source) = self.host.check_config() {
            warn!(%domain, error = %source, "edited configuration rejected, reverting");
            if let Err(e) = self.host.write_config_file(&path, &before) {
                warn!(%domain, path = %path.display(), error = %e, "could not revert edit");
            }
            return Err(CoreError::EditRejected { path, source });
        }
        self.reload_and_commit(&format!("webstead: edit site {domain}"))?;
        info!(%domain, path = %path.display(), "configuration edited");
        Ok(EditReport {
            path,
            changed: true,
        })
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Delete `scope` of `domain`, asking `confirm` before each resource.
    pub fn delete(
        &self,
        domain: &Domain,
        scope: DeleteScope,
        confirm: impl FnMut(&SiteRecord, ResourceDomain) -> bool,
    ) -> Result<DeletionReport, CoreError> {
        DeletionCoordinator::new(&self.host, &self.store).delete(domain, scope, confirm)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn site(&self, domain: &Domain) -> Result<SiteRecord, CoreError> {
        self.store.load(domain)?.ok_or_else(|| {
            Rejection::SiteNotFound {
                domain: domain.to_string(),
            }
            .into()
        })
    }

    pub fn list(&self, filter: SiteFilter) -> Result<Vec<SiteRecord>, CoreError> {
        let mut records: Vec<SiteRecord> = self
            .store
            .list()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(records)
    }

    pub fn info(&self, domain: &Domain) -> Result<SiteInfo, CoreError> {
        let record = self.site(domain)?;
        Ok(SiteInfo {
            webroot: record.webroot_path().cloned(),
            logs: self.host.log_paths(&record),
            serving: self.host.is_enabled(domain),
            network_config_present: self.host.network_config_exists(domain),
            record,
        })
    }

    pub fn logs(&self, domain: &Domain) -> Result<LogPaths, CoreError> {
        Ok(self.host.log_paths(&self.site(domain)?))
    }

    /// The site's webroot, if it has one and it was not deleted.
    pub fn webroot(&self, domain: &Domain) -> Result<PathBuf, CoreError> {
        let record = self.site(domain)?;
        if let Some(path) = record.webroot_path() {
            return Ok(path.clone());
        }
        let reason = if matches!(record.kind.webroot(), Some(Resource::Deleted)) {
            format!("the webroot of {domain} was deleted")
        } else {
            format!("{domain} is a {} site without a webroot", record.site_type())
        };
        Err(Rejection::combination(reason).into())
    }

    /// Text of the site's web-server configuration.
    pub fn show(&self, domain: &Domain) -> Result<String, CoreError> {
        self.site(domain)?;
        self.host.read_network_config(domain).map_err(|e| {
            if e.is_not_found() {
                CoreError::NetworkConfigMissing {
                    domain: domain.to_string(),
                }
            } else {
                e.into()
            }
        })
    }
}
