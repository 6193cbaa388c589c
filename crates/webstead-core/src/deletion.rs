// ── Two-domain deletion ──
//
// A site's database and files are deleted independently. Each successful
// removal is persisted right away as a `Deleted` status, so an
// interrupted delete resumes where it stopped. The record and the
// web-server configuration go away only once both domains are deleted.

use tracing::{debug, info, warn};

use crate::error::{CoreError, DeletionError, Rejection, RemovalTarget};
use crate::host::Host;
use crate::model::{Domain, Resource, ResourceDomain, SiteRecord};
use crate::store::SiteStore;

/// Which resource domains a delete request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DeleteScope {
    #[strum(to_string = "db", serialize = "database")]
    Database,
    Files,
    #[default]
    All,
}

impl DeleteScope {
    pub fn includes(self, domain: ResourceDomain) -> bool {
        matches!(
            (self, domain),
            (Self::All, _)
                | (Self::Database, ResourceDomain::Database)
                | (Self::Files, ResourceDomain::Files)
        )
    }
}

/// Outcome for one resource domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DomainResult {
    /// Already marked deleted, or the type never had this resource.
    AlreadyDeleted,
    Deleted,
    /// Not confirmed, or outside the requested scope.
    Skipped,
}

/// Outcome of a delete request.
#[derive(Debug, Clone)]
pub struct DeletionReport {
    pub domain: Domain,
    pub database: DomainResult,
    pub files: DomainResult,
    /// Record and web-server configuration are gone.
    pub finalized: bool,
    /// State after the request (as last persisted).
    pub record: SiteRecord,
}

pub struct DeletionCoordinator<'a, H, S> {
    host: &'a H,
    store: &'a S,
}

impl<'a, H: Host, S: SiteStore> DeletionCoordinator<'a, H, S> {
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Self { host, store }
    }

    /// Delete one resource domain of `record`, marking it `Deleted` on
    /// success. Idempotent: an already-deleted or absent resource returns
    /// `AlreadyDeleted` without calling the host.
    pub fn delete_domain(
        &self,
        record: &mut SiteRecord,
        which: ResourceDomain,
        confirmed: bool,
    ) -> Result<DomainResult, DeletionError> {
        if !has_active(record, which) {
            return Ok(DomainResult::AlreadyDeleted);
        }
        if !confirmed {
            return Ok(DomainResult::Skipped);
        }

        let removal = match (which, record.kind.webroot(), record.kind.database()) {
            (ResourceDomain::Files, Some(Resource::Active(path)), _) => {
                self.host.remove_webroot(&record.domain, path)
            }
            (ResourceDomain::Database, _, Some(Resource::Active(db))) => {
                self.host.remove_database(db)
            }
            _ => Ok(()),
        };

        match removal {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(domain = %record.domain, resource = %which, "resource already absent");
            }
            Err(source) => {
                return Err(DeletionError {
                    domain: record.domain.to_string(),
                    target: RemovalTarget::Resource(which),
                    source,
                });
            }
        }

        match which {
            ResourceDomain::Files => record.kind.mark_webroot_deleted(),
            ResourceDomain::Database => record.kind.mark_database_deleted(),
        }
        info!(domain = %record.domain, resource = %which, "deleted");
        Ok(DomainResult::Deleted)
    }

    /// Delete `scope` of `domain`, asking `confirm` before each active
    /// resource. Domains outside the scope are only checked for
    /// finalization.
    pub fn delete(
        &self,
        domain: &Domain,
        scope: DeleteScope,
        mut confirm: impl FnMut(&SiteRecord, ResourceDomain) -> bool,
    ) -> Result<DeletionReport, CoreError> {
        let mut record = self
            .store
            .load(domain)?
            .ok_or_else(|| Rejection::SiteNotFound {
                domain: domain.to_string(),
            })?;

        let mut results = [DomainResult::Skipped; 2];
        for (slot, which) in results
            .iter_mut()
            .zip([ResourceDomain::Database, ResourceDomain::Files])
        {
            *slot = if scope.includes(which) {
                let confirmed = has_active(&record, which) && confirm(&record, which);
                let result = self.delete_domain(&mut record, which, confirmed)?;
                if result == DomainResult::Deleted {
                    self.store.save(&record)?;
                }
                result
            } else if has_active(&record, which) {
                DomainResult::Skipped
            } else {
                DomainResult::AlreadyDeleted
            };
        }
        let [database, files] = results;

        let finalized = record.ready_for_removal();
        if finalized {
            self.finalize(&record)?;
        }

        Ok(DeletionReport {
            domain: domain.clone(),
            database,
            files,
            finalized,
            record,
        })
    }

    /// Remove web-server configuration, then the record itself.
    fn finalize(&self, record: &SiteRecord) -> Result<(), CoreError> {
        let domain = &record.domain;
        match self.host.remove_network_config(domain) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(%domain, "web server configuration already absent");
            }
            Err(source) => {
                warn!(%domain, error = %source, "record kept for retry");
                return Err(DeletionError {
                    domain: domain.to_string(),
                    target: RemovalTarget::NetworkConfig,
                    source,
                }
                .into());
            }
        }
        self.store.delete(domain)?;

        if let Err(e) = self.host.reload_web_server() {
            warn!(%domain, error = %e, "web server reload after delete failed");
        }
        if let Err(e) = self
            .host
            .commit_config_change(&format!("webstead: delete site {domain}"))
        {
            warn!(%domain, error = %e, "version-control commit failed");
        }
        info!(%domain, "site removed");
        Ok(())
    }
}

fn has_active(record: &SiteRecord, which: ResourceDomain) -> bool {
    match which {
        ResourceDomain::Files => record.webroot_path().is_some(),
        ResourceDomain::Database => record.database_credentials().is_some(),
    }
}

