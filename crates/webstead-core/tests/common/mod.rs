//! Recording fake host shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use webstead_core::model::StaticSite;
use webstead_core::{
    Addon, Backup, CmsAdmin, CmsCredentials, Controller, DatabaseCredentials, Domain, Host,
    HostError, LogPaths, MemoryStore, Resource, SiteIntent, SiteKind, SiteProfile, SiteRecord,
    SiteType, WpLayout,
};

pub const WEBROOT_BASE: &str = "/srv/www";

/// In-memory host that records every call as a short label and can be
/// told to fail any of them.
#[derive(Debug, Default)]
pub struct FakeHost {
    calls: RefCell<Vec<String>>,
    fail_on: RefCell<BTreeSet<String>>,
    pub network_configs: RefCell<BTreeSet<String>>,
    pub enabled: RefCell<BTreeSet<String>>,
    pub webroots: RefCell<BTreeSet<PathBuf>>,
    pub databases: RefCell<BTreeSet<String>>,
    pub plugins: RefCell<BTreeSet<String>>,
    pub addons: RefCell<BTreeSet<String>>,
    /// Hand-editable files by path.
    pub files: RefCell<BTreeMap<PathBuf, String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call whose label equals `label` fail.
    pub fn fail_on(&self, label: &str) {
        self.fail_on.borrow_mut().insert(label.to_owned());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn called(&self, label: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == label)
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == label).count()
    }

    /// Record `label` and fail if told to.
    fn call(&self, label: impl Into<String>) -> Result<(), HostError> {
        let label = label.into();
        self.calls.borrow_mut().push(label.clone());
        if self.fail_on.borrow().contains(&label) {
            return Err(HostError::Failed(format!("injected failure: {label}")));
        }
        Ok(())
    }

    pub fn add_site_config(&self, domain: &str) {
        self.network_configs.borrow_mut().insert(domain.to_owned());
        self.enabled.borrow_mut().insert(domain.to_owned());
        self.files.borrow_mut().insert(
            server_block_path(domain),
            format!("server {{ server_name {domain}; }}"),
        );
    }

    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl Host for FakeHost {
    fn network_config_exists(&self, domain: &Domain) -> bool {
        self.network_configs.borrow().contains(domain.as_str())
    }

    fn is_enabled(&self, domain: &Domain) -> bool {
        self.enabled.borrow().contains(domain.as_str())
    }

    fn read_network_config(&self, domain: &Domain) -> Result<String, HostError> {
        if self.network_config_exists(domain) {
            Ok(format!("server {{ server_name {domain}; }}"))
        } else {
            Err(HostError::not_found(domain.to_string()))
        }
    }

    fn log_paths(&self, record: &SiteRecord) -> LogPaths {
        let logs = Path::new(WEBROOT_BASE)
            .join(record.domain.as_str())
            .join("logs");
        LogPaths {
            access: logs.join("access.log"),
            error: logs.join("error.log"),
        }
    }

    fn check_config(&self) -> Result<(), HostError> {
        self.call("check_config")
    }

    fn backup_site(&self, record: &SiteRecord) -> Result<Backup, HostError> {
        self.call("backup_site")?;
        Ok(Backup {
            location: PathBuf::from("/backup").join(record.domain.as_str()),
        })
    }

    fn restore_backup(&self, _domain: &Domain, _backup: &Backup) -> Result<(), HostError> {
        self.call("restore_backup")
    }

    fn materialize_webroot(&self, domain: &Domain) -> Result<PathBuf, HostError> {
        self.call("materialize_webroot")?;
        let path = Path::new(WEBROOT_BASE).join(domain.as_str());
        self.webroots.borrow_mut().insert(path.clone());
        Ok(path)
    }

    fn write_network_config(
        &self,
        domain: &Domain,
        _profile: &SiteProfile,
        _webroot: Option<&Path>,
    ) -> Result<(), HostError> {
        self.call("write_network_config")?;
        self.add_site_config(domain.as_str());
        Ok(())
    }

    fn provision_database(
        &self,
        domain: &Domain,
        _site_type: SiteType,
        _webroot: &Path,
    ) -> Result<DatabaseCredentials, HostError> {
        self.call("provision_database")?;
        let name = domain.as_str().replace('.', "_");
        self.databases.borrow_mut().insert(name.clone());
        Ok(DatabaseCredentials {
            user: name.clone(),
            name,
            password: SecretString::from("db-secret".to_owned()),
            host: "localhost".into(),
        })
    }

    fn install_cms(
        &self,
        _domain: &Domain,
        _webroot: &Path,
        _database: &DatabaseCredentials,
        layout: WpLayout,
        credentials: &CmsCredentials,
    ) -> Result<CmsAdmin, HostError> {
        self.call(format!("install_cms:{layout}"))?;
        Ok(CmsAdmin {
            user: credentials.user.clone().unwrap_or_else(|| "admin".into()),
            email: "admin@example.com".into(),
            password: SecretString::from("cms-secret".to_owned()),
        })
    }

    fn uninstall_cms(
        &self,
        _domain: &Domain,
        _webroot: &Path,
        _prior: Option<&Backup>,
    ) -> Result<(), HostError> {
        self.call("uninstall_cms")
    }

    fn enable_multisite(
        &self,
        _domain: &Domain,
        _webroot: &Path,
        layout: WpLayout,
    ) -> Result<(), HostError> {
        self.call(format!("enable_multisite:{layout}"))
    }

    fn install_plugin(&self, _webroot: &Path, plugin: &str) -> Result<(), HostError> {
        self.call(format!("install_plugin:{plugin}"))?;
        self.plugins.borrow_mut().insert(plugin.to_owned());
        Ok(())
    }

    fn remove_plugin(&self, _webroot: &Path, plugin: &str) -> Result<(), HostError> {
        self.call(format!("remove_plugin:{plugin}"))?;
        self.plugins.borrow_mut().remove(plugin);
        Ok(())
    }

    fn configure_addon(
        &self,
        domain: &Domain,
        addon: Addon,
        enabled: bool,
    ) -> Result<(), HostError> {
        self.call(format!("configure_addon:{addon}:{enabled}"))?;
        let snippet = self.config_file(domain, Some(addon));
        if enabled {
            self.addons.borrow_mut().insert(addon.to_string());
            self.files
                .borrow_mut()
                .insert(snippet, format!("# {addon}\n"));
        } else {
            self.addons.borrow_mut().remove(&addon.to_string());
            self.files.borrow_mut().remove(&snippet);
        }
        Ok(())
    }

    fn set_permissions(&self, _webroot: &Path) -> Result<(), HostError> {
        self.call("set_permissions")
    }

    fn reload_web_server(&self) -> Result<(), HostError> {
        self.call("reload_web_server")
    }

    fn commit_config_change(&self, _message: &str) -> Result<(), HostError> {
        self.call("commit_config_change")
    }

    fn enable_site(&self, domain: &Domain) -> Result<(), HostError> {
        self.call("enable_site")?;
        self.enabled.borrow_mut().insert(domain.to_string());
        Ok(())
    }

    fn disable_site(&self, domain: &Domain) -> Result<(), HostError> {
        self.call("disable_site")?;
        if self.enabled.borrow_mut().remove(domain.as_str()) {
            Ok(())
        } else {
            Err(HostError::not_found(format!("enabled marker for {domain}")))
        }
    }

    fn remove_webroot(&self, _domain: &Domain, webroot: &Path) -> Result<(), HostError> {
        self.call("remove_webroot")?;
        if self.webroots.borrow_mut().remove(webroot) {
            Ok(())
        } else {
            Err(HostError::not_found(webroot.display().to_string()))
        }
    }

    fn remove_database(&self, database: &DatabaseCredentials) -> Result<(), HostError> {
        self.call("remove_database")?;
        if self.databases.borrow_mut().remove(&database.name) {
            Ok(())
        } else {
            Err(HostError::not_found(database.name.clone()))
        }
    }

    fn remove_network_config(&self, domain: &Domain) -> Result<(), HostError> {
        self.call("remove_network_config")?;
        self.enabled.borrow_mut().remove(domain.as_str());
        self.files
            .borrow_mut()
            .remove(&server_block_path(domain.as_str()));
        if self.network_configs.borrow_mut().remove(domain.as_str()) {
            Ok(())
        } else {
            Err(HostError::not_found(domain.to_string()))
        }
    }

    fn config_file(&self, domain: &Domain, addon: Option<Addon>) -> PathBuf {
        match addon {
            Some(addon) => Path::new(WEBROOT_BASE)
                .join(domain.as_str())
                .join(format!("conf/nginx/{addon}.conf")),
            None => server_block_path(domain.as_str()),
        }
    }

    fn read_config_file(&self, path: &Path) -> Result<String, HostError> {
        self.call("read_config_file")?;
        self.file(path)
            .ok_or_else(|| HostError::not_found(path.display().to_string()))
    }

    fn write_config_file(&self, path: &Path, contents: &str) -> Result<(), HostError> {
        self.call("write_config_file")?;
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_owned());
        Ok(())
    }

    fn reset_cms_password(
        &self,
        _webroot: &Path,
        user: &str,
        _password: &SecretString,
    ) -> Result<(), HostError> {
        self.call(format!("reset_cms_password:{user}"))
    }
}

// ── Fixtures ──

pub fn server_block_path(domain: &str) -> PathBuf {
    Path::new("/etc/nginx/sites-available").join(domain)
}

pub type TestController = Controller<FakeHost, MemoryStore>;

pub fn controller() -> TestController {
    Controller::new(FakeHost::new(), MemoryStore::new())
}

pub fn domain(name: &str) -> Domain {
    Domain::parse(name).unwrap()
}

pub fn intent(name: &str) -> SiteIntent {
    SiteIntent::for_domain(domain(name))
}

/// Create a site through the controller and forget the calls it made.
pub fn seeded(ctrl: &TestController, intent: &SiteIntent) -> SiteRecord {
    let report = ctrl.create(intent).unwrap();
    ctrl.host().clear_calls();
    report.record
}

/// An html record whose webroot was already removed.
pub fn html_with_deleted_webroot(name: &str) -> SiteRecord {
    SiteRecord::new(
        domain(name),
        SiteKind::Html(StaticSite {
            webroot: Resource::Deleted,
            pagespeed: false,
        }),
    )
}
