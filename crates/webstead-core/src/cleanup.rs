// ── Compensation ──
//
// Runs during failure handling. Never raises: every undo is attempted on
// its own, "never existed" counts as done, and anything else is logged
// and counted so the original error stays the one the caller sees.

use tracing::{debug, warn};

use crate::error::{HostError, RollbackSummary};
use crate::host::Host;
use crate::model::Domain;
use crate::plan::Compensation;
use crate::store::SiteStore;

pub struct CleanupCoordinator<'a, H, S> {
    host: &'a H,
    store: &'a S,
}

impl<'a, H: Host, S: SiteStore> CleanupCoordinator<'a, H, S> {
    pub fn new(host: &'a H, store: &'a S) -> Self {
        Self { host, store }
    }

    /// Undo `journal` in reverse registration order.
    pub fn compensate(&self, domain: &Domain, journal: Vec<Compensation>) -> RollbackSummary {
        let mut summary = RollbackSummary::default();
        for action in journal.into_iter().rev() {
            summary.attempted += 1;
            match self.undo(domain, &action) {
                Ok(()) => debug!(%domain, %action, "compensated"),
                Err(e) if e.is_not_found() => {
                    debug!(%domain, %action, "nothing to compensate");
                }
                Err(e) => {
                    warn!(%domain, %action, error = %e, "compensation failed");
                    summary.failed.push(format!("{action}: {e}"));
                }
            }
        }
        summary
    }

    fn undo(&self, domain: &Domain, action: &Compensation) -> Result<(), HostError> {
        let host = self.host;
        match action {
            Compensation::RestoreBackup(backup) => host.restore_backup(domain, backup),
            Compensation::RemoveWebroot(path) => host.remove_webroot(domain, path),
            Compensation::RemoveNetworkConfig => host.remove_network_config(domain),
            Compensation::DropDatabase(db) => host.remove_database(db),
            Compensation::UninstallCms { webroot, prior } => {
                host.uninstall_cms(domain, webroot, prior.as_ref())
            }
            Compensation::ReinstallCachePlugin { webroot, cache } => match cache.plugin() {
                Some(plugin) => host.install_plugin(webroot, plugin),
                None => Ok(()),
            },
            Compensation::RemoveCachePlugin { webroot, cache } => match cache.plugin() {
                Some(plugin) => host.remove_plugin(webroot, plugin),
                None => Ok(()),
            },
            Compensation::RevertAddon { addon, enabled } => {
                host.configure_addon(domain, *addon, *enabled)
            }
            Compensation::DeleteRecord => self
                .store
                .delete(domain)
                .map(|_| ())
                .map_err(|e| HostError::Failed(e.to_string())),
            Compensation::RestoreRecord(prior) => self
                .store
                .save(prior)
                .map_err(|e| HostError::Failed(e.to_string())),
        }
    }
}
