// ── Host collaborators ──
//
// Every side effect the core performs goes through `Host`. The core
// treats each call as an opaque blocking operation that succeeds or
// fails; it never inspects how a collaborator does its work.

mod local;

use std::path::{Path, PathBuf};

use secrecy::SecretString;

pub use local::LocalHost;

use crate::error::{HostError, Rejection};
use crate::model::{
    Addon, CmsCredentials, DatabaseCredentials, Domain, SiteProfile, SiteRecord, SiteType,
    WpLayout,
};

/// Handle to a pre-update copy of a site's generated configuration and,
/// for sites without a CMS, its document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub location: PathBuf,
}

/// CMS administrator account used by an install.
#[derive(Debug, Clone)]
pub struct CmsAdmin {
    pub user: String,
    pub email: String,
    pub password: SecretString,
}

/// Log file locations for a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub access: PathBuf,
    pub error: PathBuf,
}

/// The side-effecting operations consumed by the orchestrator, the
/// cleanup and deletion coordinators, and the enable/disable commands.
///
/// Removal operations return [`HostError::NotFound`] when the resource
/// was never there; compensation treats that as success.
pub trait Host {
    /// Normalize a user-supplied domain.
    fn validate_domain(&self, input: &str) -> Result<Domain, Rejection> {
        Domain::parse(input)
    }

    // ── Inspection ──

    fn network_config_exists(&self, domain: &Domain) -> bool;

    fn is_enabled(&self, domain: &Domain) -> bool;

    fn read_network_config(&self, domain: &Domain) -> Result<String, HostError>;

    fn log_paths(&self, record: &SiteRecord) -> LogPaths;

    // ── Provisioning ──

    /// Web-server configuration test.
    fn check_config(&self) -> Result<(), HostError>;

    fn backup_site(&self, record: &SiteRecord) -> Result<Backup, HostError>;

    fn restore_backup(&self, domain: &Domain, backup: &Backup) -> Result<(), HostError>;

    fn materialize_webroot(&self, domain: &Domain) -> Result<PathBuf, HostError>;

    /// Write the available artifact and the enabled marker.
    fn write_network_config(
        &self,
        domain: &Domain,
        profile: &SiteProfile,
        webroot: Option<&Path>,
    ) -> Result<(), HostError>;

    /// Create the database and user; mysql sites also get a db config file
    /// in the webroot.
    fn provision_database(
        &self,
        domain: &Domain,
        site_type: SiteType,
        webroot: &Path,
    ) -> Result<DatabaseCredentials, HostError>;

    fn install_cms(
        &self,
        domain: &Domain,
        webroot: &Path,
        database: &DatabaseCredentials,
        layout: WpLayout,
        credentials: &CmsCredentials,
    ) -> Result<CmsAdmin, HostError>;

    /// Return the document root to how it was before the install: the
    /// copy held by `prior` when there is one, otherwise empty.
    fn uninstall_cms(
        &self,
        domain: &Domain,
        webroot: &Path,
        prior: Option<&Backup>,
    ) -> Result<(), HostError>;

    fn enable_multisite(
        &self,
        domain: &Domain,
        webroot: &Path,
        layout: WpLayout,
    ) -> Result<(), HostError>;

    fn install_plugin(&self, webroot: &Path, plugin: &str) -> Result<(), HostError>;

    fn remove_plugin(&self, webroot: &Path, plugin: &str) -> Result<(), HostError>;

    fn configure_addon(
        &self,
        domain: &Domain,
        addon: Addon,
        enabled: bool,
    ) -> Result<(), HostError>;

    fn set_permissions(&self, webroot: &Path) -> Result<(), HostError>;

    fn reload_web_server(&self) -> Result<(), HostError>;

    /// Record the configuration change in version control.
    fn commit_config_change(&self, message: &str) -> Result<(), HostError>;

    // ── Enable / disable ──

    fn enable_site(&self, domain: &Domain) -> Result<(), HostError>;

    /// Remove the enabled marker; `NotFound` when already absent.
    fn disable_site(&self, domain: &Domain) -> Result<(), HostError>;

    // ── Removal ──

    fn remove_webroot(&self, domain: &Domain, webroot: &Path) -> Result<(), HostError>;

    fn remove_database(&self, database: &DatabaseCredentials) -> Result<(), HostError>;

    /// Remove the available artifact and enabled marker.
    fn remove_network_config(&self, domain: &Domain) -> Result<(), HostError>;

    // ── Hand editing ──

    /// The file a hand edit opens: the server block, or `addon`'s snippet.
    fn config_file(&self, domain: &Domain, addon: Option<Addon>) -> PathBuf;

    fn read_config_file(&self, path: &Path) -> Result<String, HostError>;

    fn write_config_file(&self, path: &Path, contents: &str) -> Result<(), HostError>;

    // ── CMS maintenance ──

    fn reset_cms_password(
        &self,
        webroot: &Path,
        user: &str,
        password: &SecretString,
    ) -> Result<(), HostError>;
}
