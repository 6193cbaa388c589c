// ── Local host ──
//
// `Host` on the machine we run on: directories under the webroot base,
// nginx server blocks under sites-available, symlinks under
// sites-enabled, and external programs run from configured argv prefixes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Backup, CmsAdmin, Host, LogPaths};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::model::{
    Addon, CacheType, CmsCredentials, DatabaseCredentials, Domain, SiteProfile, SiteRecord,
    SiteType, WpLayout,
};

/// Database config written next to `htdocs/` for mysql sites.
const DB_CONFIG_FILE: &str = "webstead-config.php";
const CMS_CONFIG_FILE: &str = "wp-config.php";
const BACKUP_SERVER_BLOCK: &str = "server-block.conf";
const BACKUP_DOCROOT: &str = "htdocs";
const DB_NAME_MAX: usize = 32;
const DB_USER_MAX: usize = 16;

pub struct LocalHost {
    config: HostConfig,
}

impl LocalHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    // ── Paths ──

    fn site_root(&self, domain: &Domain) -> PathBuf {
        self.config.layout.webroot_base.join(domain.as_str())
    }

    fn available_path(&self, domain: &Domain) -> PathBuf {
        self.config.layout.sites_available.join(domain.as_str())
    }

    fn enabled_path(&self, domain: &Domain) -> PathBuf {
        self.config.layout.sites_enabled.join(domain.as_str())
    }

    fn addon_snippet(&self, domain: &Domain, addon: Addon) -> PathBuf {
        self.site_root(domain)
            .join("conf/nginx")
            .join(format!("{addon}.conf"))
    }

    // ── Process execution ──

    fn run(
        &self,
        argv: &[String],
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<String, HostError> {
        let (program, prefix) = argv
            .split_first()
            .ok_or_else(|| HostError::Failed("empty command configured".into()))?;

        // Arguments can carry passwords; only the subcommand is shown.
        let shown = argv
            .iter()
            .map(String::as_str)
            .chain(args.first().copied())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %shown, "running external command");

        let output = Command::new(program)
            .args(prefix)
            .args(args)
            .envs(env.iter().copied())
            .output()
            .map_err(|e| HostError::io("spawn", program, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(HostError::Command {
                command: shown,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }

    fn run_sql(&self, sql: &str) -> Result<String, HostError> {
        let db = &self.config.database;
        let user = format!("--user={}", db.admin_user);
        let host = format!("--host={}", db.host);
        let args = [
            user.as_str(),
            host.as_str(),
            "--batch",
            "--skip-column-names",
            "-e",
            sql,
        ];
        match &db.admin_password {
            Some(pw) => self.run(
                &self.config.services.mysql,
                &args,
                &[("MYSQL_PWD", pw.expose_secret())],
            ),
            None => self.run(&self.config.services.mysql, &args, &[]),
        }
    }

    fn wp(&self, webroot: &Path, args: &[&str]) -> Result<String, HostError> {
        let path = format!("--path={}", webroot.join("htdocs").display());
        let mut full = args.to_vec();
        full.push(path.as_str());
        self.run(&self.config.services.wp_cli, &full, &[])
    }

    fn database_exists(&self, name: &str) -> Result<bool, HostError> {
        let out = self.run_sql(&format!("SHOW DATABASES LIKE '{name}'"))?;
        Ok(!out.trim().is_empty())
    }

    fn grant_host(&self) -> &str {
        if self.config.database.host == "localhost" {
            "localhost"
        } else {
            "%"
        }
    }

    /// Best-effort drop of a half-provisioned database and its user.
    fn discard_database(&self, name: &str, user: &str) {
        let sql = format!(
            "DROP DATABASE IF EXISTS `{name}`; DROP USER IF EXISTS '{user}'@'{}'; FLUSH PRIVILEGES;",
            self.grant_host()
        );
        if let Err(e) = self.run_sql(&sql) {
            warn!(database = name, user, error = %e, "could not drop partially provisioned database");
        }
    }

    fn write_db_config(&self, webroot: &Path, db: &DatabaseCredentials) -> Result<(), HostError> {
        let path = webroot.join(DB_CONFIG_FILE);
        let body = format!(
            "<?php\ndefine('DB_NAME', '{}');\ndefine('DB_USER', '{}');\ndefine('DB_PASSWORD', '{}');\ndefine('DB_HOST', '{}');\n",
            db.name,
            db.user,
            db.password.expose_secret(),
            db.host
        );
        fs::write(&path, body).map_err(|e| HostError::io("write db config", &path, e))
    }
}

// ── Filesystem helpers ──

/// Map "already absent" onto `HostError::NotFound`.
fn remove_with(
    path: &Path,
    operation: &'static str,
    remove: impl FnOnce(&Path) -> std::io::Result<()>,
) -> Result<(), HostError> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(HostError::not_found(path.display().to_string()))
        }
        Err(e) => Err(HostError::io(operation, path, e)),
    }
}

fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn create_dirs(path: &Path) -> Result<(), HostError> {
    fs::create_dir_all(path).map_err(|e| HostError::io("create directory", path, e))
}

fn copy_if_present(from: &Path, to: &Path) -> Result<(), HostError> {
    if from.exists() {
        fs::copy(from, to).map_err(|e| HostError::io("copy", from, e))?;
    }
    Ok(())
}

/// Recursive copy; symlinks are recreated, not followed.
fn copy_tree(from: &Path, to: &Path) -> Result<(), HostError> {
    create_dirs(to)?;
    let entries = fs::read_dir(from).map_err(|e| HostError::io("read directory", from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HostError::io("read directory", from, e))?;
        let source = entry.path();
        let dest = to.join(entry.file_name());
        let kind = entry
            .file_type()
            .map_err(|e| HostError::io("stat", &source, e))?;
        if kind.is_dir() {
            copy_tree(&source, &dest)?;
        } else if kind.is_symlink() {
            let target = fs::read_link(&source).map_err(|e| HostError::io("read link", &source, e))?;
            link(&target, &dest).map_err(|e| HostError::io("link", &dest, e))?;
        } else {
            fs::copy(&source, &dest).map_err(|e| HostError::io("copy", &source, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn link(target: &Path, marker: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, marker)
}

#[cfg(not(unix))]
fn link(target: &Path, marker: &Path) -> std::io::Result<()> {
    fs::copy(target, marker).map(|_| ())
}

fn sanitize_identifier(domain: &Domain) -> String {
    domain
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn generated_secret() -> SecretString {
    SecretString::from(Uuid::new_v4().simple().to_string())
}

// ── Server block rendering ──

fn render_server_block(
    domain: &Domain,
    profile: &SiteProfile,
    root: &Path,
    server_log_dir: &Path,
) -> String {
    let names = format!("{domain} {}", domain.www());

    if let (SiteType::Proxy, Some(target)) = (profile.site_type, &profile.proxy) {
        let logs = server_log_dir.join(domain.as_str());
        return format!(
            "# Managed by webstead: proxy site\nserver {{\n    listen 80;\n    server_name {names};\n\n    access_log {logs}.access.log;\n    error_log {logs}.error.log;\n\n    location / {{\n        proxy_pass http://{target};\n        proxy_set_header Host $host;\n        proxy_set_header X-Real-IP $remote_addr;\n        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n    }}\n}}\n",
            logs = logs.display(),
        );
    }

    let upstream = if profile.hhvm { "hhvm" } else { "php" };
    let body = match profile.site_type {
        SiteType::Html => "    location / {\n        try_files $uri $uri/ =404;\n    }\n".to_owned(),
        SiteType::Php | SiteType::Mysql => format!(
            "    location / {{\n        try_files $uri $uri/ /index.php?$args;\n    }}\n    location ~ \\.php$ {{\n        include fastcgi_params;\n        fastcgi_pass {upstream};\n    }}\n"
        ),
        SiteType::Wp | SiteType::WpSubdir | SiteType::WpSubdomain => {
            let cache = profile.cache.unwrap_or(CacheType::Basic);
            let multisite = match profile.site_type.wp_layout() {
                Some(WpLayout::Subdirectory) => "    include common/wpsubdir.conf;\n",
                _ => "",
            };
            format!(
                "    include common/wp-{cache}-{upstream}.conf;\n{multisite}    include common/wpcommon.conf;\n"
            )
        }
        SiteType::Proxy => String::new(),
    };

    format!(
        "# Managed by webstead: {profile} site\nserver {{\n    listen 80;\n    server_name {names};\n\n    access_log {root}/logs/access.log;\n    error_log {root}/logs/error.log;\n\n    root {root}/htdocs;\n    index index.php index.html index.htm;\n\n{body}    include {root}/conf/nginx/*.conf;\n}}\n",
        root = root.display(),
    )
}

fn addon_snippet_body(addon: Addon) -> &'static str {
    match addon {
        Addon::Hhvm => "# hhvm upstream selected in the server block\nset $webstead_hhvm on;\n",
        Addon::PageSpeed => {
            "pagespeed on;\npagespeed FileCachePath /var/ngx_pagespeed_cache;\n"
        }
    }
}

// ── Host implementation ──

impl Host for LocalHost {
    fn network_config_exists(&self, domain: &Domain) -> bool {
        self.available_path(domain).exists()
    }

    fn is_enabled(&self, domain: &Domain) -> bool {
        exists_no_follow(&self.enabled_path(domain))
    }

    fn read_network_config(&self, domain: &Domain) -> Result<String, HostError> {
        self.read_config_file(&self.available_path(domain))
    }

    fn log_paths(&self, record: &SiteRecord) -> LogPaths {
        if record.site_type() == SiteType::Proxy {
            let dir = &self.config.layout.server_log_dir;
            return LogPaths {
                access: dir.join(format!("{}.access.log", record.domain)),
                error: dir.join(format!("{}.error.log", record.domain)),
            };
        }
        let logs = self.site_root(&record.domain).join("logs");
        LogPaths {
            access: logs.join("access.log"),
            error: logs.join("error.log"),
        }
    }

    fn check_config(&self) -> Result<(), HostError> {
        self.run(&self.config.services.config_test, &[], &[]).map(|_| ())
    }

    fn backup_site(&self, record: &SiteRecord) -> Result<Backup, HostError> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        let location = self
            .config
            .layout
            .backup_dir
            .join(record.domain.as_str())
            .join(stamp);
        create_dirs(&location)?;

        copy_if_present(
            &self.available_path(&record.domain),
            &location.join(BACKUP_SERVER_BLOCK),
        )?;
        if let Some(webroot) = record.webroot_path() {
            copy_if_present(&webroot.join(DB_CONFIG_FILE), &location.join(DB_CONFIG_FILE))?;
            copy_if_present(
                &webroot.join("htdocs").join(CMS_CONFIG_FILE),
                &location.join(CMS_CONFIG_FILE),
            )?;
            // A CMS install lands in the existing document root; the copy
            // lets a failed upgrade put the old content back.
            let htdocs = webroot.join("htdocs");
            if !record.site_type().is_wordpress() && htdocs.is_dir() {
                copy_tree(&htdocs, &location.join(BACKUP_DOCROOT))?;
            }
        }
        debug!(domain = %record.domain, location = %location.display(), "site configuration backed up");
        Ok(Backup { location })
    }

    fn restore_backup(&self, domain: &Domain, backup: &Backup) -> Result<(), HostError> {
        if !backup.location.is_dir() {
            return Err(HostError::not_found(backup.location.display().to_string()));
        }
        let root = self.site_root(domain);
        copy_if_present(
            &backup.location.join(BACKUP_SERVER_BLOCK),
            &self.available_path(domain),
        )?;
        if root.is_dir() {
            copy_if_present(&backup.location.join(DB_CONFIG_FILE), &root.join(DB_CONFIG_FILE))?;
            copy_if_present(
                &backup.location.join(CMS_CONFIG_FILE),
                &root.join("htdocs").join(CMS_CONFIG_FILE),
            )?;
        }
        Ok(())
    }

    fn materialize_webroot(&self, domain: &Domain) -> Result<PathBuf, HostError> {
        let root = self.site_root(domain);
        for sub in ["htdocs", "logs", "conf/nginx"] {
            create_dirs(&root.join(sub))?;
        }
        Ok(root)
    }

    fn write_network_config(
        &self,
        domain: &Domain,
        profile: &SiteProfile,
        webroot: Option<&Path>,
    ) -> Result<(), HostError> {
        let layout = &self.config.layout;
        create_dirs(&layout.sites_available)?;

        let available = self.available_path(domain);
        let existed = available.exists();
        let root = webroot.map_or_else(|| self.site_root(domain), Path::to_path_buf);
        let block = render_server_block(domain, profile, &root, &layout.server_log_dir);
        fs::write(&available, block).map_err(|e| HostError::io("write", &available, e))?;

        let marker = self.enabled_path(domain);
        let linked = if exists_no_follow(&marker) {
            Ok(())
        } else {
            create_dirs(&layout.sites_enabled).and_then(|()| {
                link(&available, &marker).map_err(|e| HostError::io("link", &marker, e))
            })
        };
        if let Err(err) = linked {
            // A fresh artifact must not outlive the failed step; an older
            // one is put back from the backup.
            if !existed {
                if let Err(e) = fs::remove_file(&available) {
                    warn!(path = %available.display(), error = %e, "could not remove server block");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn provision_database(
        &self,
        domain: &Domain,
        site_type: SiteType,
        webroot: &Path,
    ) -> Result<DatabaseCredentials, HostError> {
        let base = sanitize_identifier(domain);
        let mut name: String = base.chars().take(DB_NAME_MAX).collect();
        if self.database_exists(&name)? {
            let suffix: String = Uuid::new_v4().simple().to_string().chars().take(4).collect();
            name = format!("{}_{suffix}", base.chars().take(DB_NAME_MAX - 5).collect::<String>());
        }
        let user: String = name.chars().take(DB_USER_MAX).collect();
        let password = generated_secret();
        let grant_host = self.grant_host();

        let sql = format!(
            "CREATE DATABASE `{name}`; CREATE USER '{user}'@'{grant_host}' IDENTIFIED BY '{pw}'; GRANT ALL PRIVILEGES ON `{name}`.* TO '{user}'@'{grant_host}'; FLUSH PRIVILEGES;",
            pw = password.expose_secret(),
        );
        if let Err(err) = self.run_sql(&sql) {
            // Statements stop at the first error; some may have run.
            self.discard_database(&name, &user);
            return Err(err);
        }

        let credentials = DatabaseCredentials {
            name,
            user,
            password,
            host: self.config.database.host.clone(),
        };
        if site_type == SiteType::Mysql {
            if let Err(err) = self.write_db_config(webroot, &credentials) {
                self.discard_database(&credentials.name, &credentials.user);
                return Err(err);
            }
        }
        Ok(credentials)
    }

    fn install_cms(
        &self,
        domain: &Domain,
        webroot: &Path,
        database: &DatabaseCredentials,
        layout: WpLayout,
        credentials: &CmsCredentials,
    ) -> Result<CmsAdmin, HostError> {
        let services = &self.config.services;
        let user = credentials
            .user
            .clone()
            .unwrap_or_else(|| services.cms_admin_user.clone());
        let email = credentials
            .email
            .clone()
            .or_else(|| services.cms_admin_email.clone())
            .unwrap_or_else(|| format!("{user}@{domain}"));
        let password = credentials
            .password
            .clone()
            .unwrap_or_else(generated_secret);

        self.wp(webroot, &["core", "download"])?;

        let dbname = format!("--dbname={}", database.name);
        let dbuser = format!("--dbuser={}", database.user);
        let dbpass = format!("--dbpass={}", database.password.expose_secret());
        let dbhost = format!("--dbhost={}", database.host);
        self.wp(
            webroot,
            &[
                "config",
                "create",
                dbname.as_str(),
                dbuser.as_str(),
                dbpass.as_str(),
                dbhost.as_str(),
            ],
        )?;

        let url = format!("--url={domain}");
        let title = format!("--title={domain}");
        let admin_user = format!("--admin_user={user}");
        let admin_password = format!("--admin_password={}", password.expose_secret());
        let admin_email = format!("--admin_email={email}");
        let mut args = vec![
            "core",
            if layout == WpLayout::Single {
                "install"
            } else {
                "multisite-install"
            },
            url.as_str(),
            title.as_str(),
            admin_user.as_str(),
            admin_password.as_str(),
            admin_email.as_str(),
            "--skip-email",
        ];
        if layout == WpLayout::Subdomain {
            args.push("--subdomains");
        }
        self.wp(webroot, &args)?;

        Ok(CmsAdmin {
            user,
            email,
            password,
        })
    }

    fn uninstall_cms(
        &self,
        _domain: &Domain,
        webroot: &Path,
        prior: Option<&Backup>,
    ) -> Result<(), HostError> {
        let htdocs = webroot.join("htdocs");
        match remove_with(&htdocs, "remove CMS files", |p| fs::remove_dir_all(p)) {
            Err(e) if !e.is_not_found() => return Err(e),
            _ => {}
        }
        let snapshot = prior
            .map(|backup| backup.location.join(BACKUP_DOCROOT))
            .filter(|path| path.is_dir());
        match snapshot {
            Some(snapshot) => copy_tree(&snapshot, &htdocs),
            None => create_dirs(&htdocs),
        }
    }

    fn enable_multisite(
        &self,
        _domain: &Domain,
        webroot: &Path,
        layout: WpLayout,
    ) -> Result<(), HostError> {
        let mut args = vec!["core", "multisite-convert"];
        if layout == WpLayout::Subdomain {
            args.push("--subdomains");
        }
        self.wp(webroot, &args).map(|_| ())
    }

    fn install_plugin(&self, webroot: &Path, plugin: &str) -> Result<(), HostError> {
        self.wp(webroot, &["plugin", "install", plugin, "--activate"])
            .map(|_| ())
    }

    fn remove_plugin(&self, webroot: &Path, plugin: &str) -> Result<(), HostError> {
        self.wp(webroot, &["plugin", "uninstall", plugin, "--deactivate"])
            .map(|_| ())
    }

    fn configure_addon(
        &self,
        domain: &Domain,
        addon: Addon,
        enabled: bool,
    ) -> Result<(), HostError> {
        let path = self.addon_snippet(domain, addon);
        if enabled {
            if let Some(parent) = path.parent() {
                create_dirs(parent)?;
            }
            return fs::write(&path, addon_snippet_body(addon))
                .map_err(|e| HostError::io("write", &path, e));
        }
        match remove_with(&path, "remove", |p| fs::remove_file(p)) {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    fn set_permissions(&self, webroot: &Path) -> Result<(), HostError> {
        let services = &self.config.services;
        let owner = format!("{0}:{0}", services.web_user);
        let target = webroot.display().to_string();
        self.run(&services.chown, &[owner.as_str(), target.as_str()], &[])
            .map(|_| ())
    }

    fn reload_web_server(&self) -> Result<(), HostError> {
        self.run(&self.config.services.reload, &[], &[]).map(|_| ())
    }

    fn commit_config_change(&self, message: &str) -> Result<(), HostError> {
        let Some(git) = &self.config.services.git else {
            return Ok(());
        };
        self.run(git, &["add", "-A"], &[])?;
        self.run(git, &["commit", "-q", "-m", message], &[]).map(|_| ())
    }

    fn enable_site(&self, domain: &Domain) -> Result<(), HostError> {
        let available = self.available_path(domain);
        if !available.exists() {
            return Err(HostError::not_found(available.display().to_string()));
        }
        let marker = self.enabled_path(domain);
        if exists_no_follow(&marker) {
            return Ok(());
        }
        create_dirs(&self.config.layout.sites_enabled)?;
        link(&available, &marker).map_err(|e| HostError::io("link", &marker, e))
    }

    fn disable_site(&self, domain: &Domain) -> Result<(), HostError> {
        remove_with(&self.enabled_path(domain), "unlink", |p| fs::remove_file(p))
    }

    fn remove_webroot(&self, _domain: &Domain, webroot: &Path) -> Result<(), HostError> {
        remove_with(webroot, "remove webroot", |p| fs::remove_dir_all(p))
    }

    fn remove_database(&self, database: &DatabaseCredentials) -> Result<(), HostError> {
        let existed = self.database_exists(&database.name)?;
        let sql = format!(
            "DROP DATABASE IF EXISTS `{}`; DROP USER IF EXISTS '{}'@'{}'; FLUSH PRIVILEGES;",
            database.name,
            database.user,
            self.grant_host()
        );
        self.run_sql(&sql)?;
        if existed {
            Ok(())
        } else {
            Err(HostError::not_found(format!("database {}", database.name)))
        }
    }

    fn remove_network_config(&self, domain: &Domain) -> Result<(), HostError> {
        match remove_with(&self.enabled_path(domain), "unlink", |p| fs::remove_file(p)) {
            Err(e) if !e.is_not_found() => return Err(e),
            _ => {}
        }
        remove_with(&self.available_path(domain), "remove", |p| fs::remove_file(p))
    }

    fn config_file(&self, domain: &Domain, addon: Option<Addon>) -> PathBuf {
        match addon {
            Some(addon) => self.addon_snippet(domain, addon),
            None => self.available_path(domain),
        }
    }

    fn read_config_file(&self, path: &Path) -> Result<String, HostError> {
        fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                HostError::not_found(path.display().to_string())
            } else {
                HostError::io("read", path, e)
            }
        })
    }

    fn write_config_file(&self, path: &Path, contents: &str) -> Result<(), HostError> {
        fs::write(path, contents).map_err(|e| HostError::io("write", path, e))
    }

    fn reset_cms_password(
        &self,
        webroot: &Path,
        user: &str,
        password: &SecretString,
    ) -> Result<(), HostError> {
        self.wp(webroot, &["user", "get", user, "--field=ID"])
            .map_err(|_| HostError::not_found(format!("CMS user {user}")))?;
        let pass = format!("--user_pass={}", password.expose_secret());
        self.wp(webroot, &["user", "update", user, pass.as_str()])
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HostLayout;
    use crate::error::CoreError;
    use crate::model::{ProxyTarget, SiteIntent};
    use crate::provision::Provisioner;
    use crate::store::{MemoryStore, SiteStore};
    use tempfile::TempDir;

    fn host(dir: &TempDir) -> LocalHost {
        let root = dir.path();
        let mut config = HostConfig {
            layout: HostLayout {
                webroot_base: root.join("www"),
                sites_available: root.join("available"),
                sites_enabled: root.join("enabled"),
                server_log_dir: root.join("log"),
                backup_dir: root.join("backup"),
            },
            ..HostConfig::default()
        };
        config.services.git = None;
        LocalHost::new(config)
    }

    fn html_profile() -> SiteProfile {
        SiteProfile {
            site_type: SiteType::Html,
            cache: Some(CacheType::Basic),
            hhvm: false,
            pagespeed: false,
            proxy: None,
        }
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    #[test]
    fn webroot_layout_is_created() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let root = host.materialize_webroot(&domain()).unwrap();
        assert_eq!(root, dir.path().join("www/example.com"));
        for sub in ["htdocs", "logs", "conf/nginx"] {
            assert!(root.join(sub).is_dir(), "{sub} missing");
        }
    }

    #[test]
    fn network_config_write_enable_disable_remove() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let d = domain();
        let root = host.materialize_webroot(&d).unwrap();

        host.write_network_config(&d, &html_profile(), Some(&root)).unwrap();
        assert!(host.network_config_exists(&d));
        assert!(host.is_enabled(&d));
        let text = host.read_network_config(&d).unwrap();
        assert!(text.contains("server_name example.com www.example.com;"));

        host.disable_site(&d).unwrap();
        assert!(!host.is_enabled(&d));
        assert!(host.disable_site(&d).unwrap_err().is_not_found());

        host.enable_site(&d).unwrap();
        assert!(host.is_enabled(&d));

        host.remove_network_config(&d).unwrap();
        assert!(!host.network_config_exists(&d));
        assert!(host.remove_network_config(&d).unwrap_err().is_not_found());
    }

    #[test]
    fn removing_absent_webroot_is_not_found() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let err = host
            .remove_webroot(&domain(), &dir.path().join("www/missing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn addon_snippets_toggle() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let d = domain();
        host.materialize_webroot(&d).unwrap();
        host.configure_addon(&d, Addon::PageSpeed, true).unwrap();
        let snippet = host.addon_snippet(&d, Addon::PageSpeed);
        assert!(snippet.exists());
        host.configure_addon(&d, Addon::PageSpeed, false).unwrap();
        assert!(!snippet.exists());
        // disabling twice is fine
        host.configure_addon(&d, Addon::PageSpeed, false).unwrap();
    }

    #[test]
    fn backup_and_restore_server_block() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let d = domain();
        let root = host.materialize_webroot(&d).unwrap();
        host.write_network_config(&d, &html_profile(), Some(&root)).unwrap();
        let before = host.read_network_config(&d).unwrap();

        let record = SiteRecord::new(
            d.clone(),
            crate::model::SiteKind::Html(crate::model::StaticSite {
                webroot: crate::model::Resource::Active(root.clone()),
                pagespeed: false,
            }),
        );
        let backup = host.backup_site(&record).unwrap();

        let mut php = html_profile();
        php.site_type = SiteType::Php;
        host.write_network_config(&d, &php, Some(&root)).unwrap();
        assert_ne!(host.read_network_config(&d).unwrap(), before);

        host.restore_backup(&d, &backup).unwrap();
        assert_eq!(host.read_network_config(&d).unwrap(), before);
    }

    #[test]
    fn proxy_logs_live_in_server_log_dir() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let record = SiteRecord::new(
            domain(),
            crate::model::SiteKind::Proxy(ProxyTarget {
                host: "127.0.0.1".into(),
                port: 8080,
            }),
        );
        let paths = host.log_paths(&record);
        assert_eq!(paths.access, dir.path().join("log/example.com.access.log"));
        assert_eq!(paths.error, dir.path().join("log/example.com.error.log"));
    }

    #[test]
    fn proxy_server_block_points_at_target() {
        let profile = SiteProfile {
            site_type: SiteType::Proxy,
            cache: None,
            hhvm: false,
            pagespeed: false,
            proxy: Some(ProxyTarget {
                host: "10.1.1.1".into(),
                port: 3000,
            }),
        };
        let block = render_server_block(
            &domain(),
            &profile,
            Path::new("/var/www/example.com"),
            Path::new("/var/log/nginx"),
        );
        assert!(block.contains("proxy_pass http://10.1.1.1:3000;"));
        assert!(block.contains("/var/log/nginx/example.com.access.log"));
    }

    /// Every external command succeeds without doing anything.
    fn scripted(dir: &TempDir) -> LocalHost {
        let mut host = host(dir);
        let ok = vec!["true".to_owned()];
        let services = &mut host.config.services;
        services.config_test.clone_from(&ok);
        services.reload.clone_from(&ok);
        services.chown.clone_from(&ok);
        services.mysql.clone_from(&ok);
        services.wp_cli = ok;
        host
    }

    /// mysql stand-in appending each invocation to `log`; fails any
    /// statement batch containing `fail_on`.
    #[cfg(unix)]
    fn recording_mysql(host: &mut LocalHost, log: &Path, fail_on: &str) {
        host.config.services.mysql = vec![
            "sh".into(),
            "-c".into(),
            format!(
                "printf '%s\\n' \"$*\" >> '{}'; case \"$*\" in *'{fail_on}'*) exit 1 ;; esac",
                log.display()
            ),
            "mysql".into(),
        ];
    }

    #[cfg(unix)]
    #[test]
    fn db_config_failure_drops_database_and_user() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        let log = dir.path().join("sql.log");
        recording_mysql(&mut host, &log, "never-matches");
        let root = host.materialize_webroot(&domain()).unwrap();
        // A directory where the db config file goes makes the write fail.
        fs::create_dir(root.join(DB_CONFIG_FILE)).unwrap();

        let err = host
            .provision_database(&domain(), SiteType::Mysql, &root)
            .unwrap_err();
        assert!(matches!(err, HostError::Io { .. }));

        let sql = fs::read_to_string(&log).unwrap();
        assert!(sql.contains("CREATE DATABASE `example_com`"));
        assert!(sql.contains("DROP DATABASE IF EXISTS `example_com`"));
        assert!(sql.contains("DROP USER IF EXISTS 'example_com'@'localhost'"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_create_statement_drops_user_too() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        let log = dir.path().join("sql.log");
        recording_mysql(&mut host, &log, "CREATE DATABASE");
        let root = host.materialize_webroot(&domain()).unwrap();

        let err = host
            .provision_database(&domain(), SiteType::Wp, &root)
            .unwrap_err();
        assert!(matches!(err, HostError::Command { .. }));

        let sql = fs::read_to_string(&log).unwrap();
        assert!(sql.contains("DROP DATABASE IF EXISTS `example_com`"));
        assert!(sql.contains("DROP USER IF EXISTS 'example_com'@'localhost'"));
    }

    #[test]
    fn failed_enable_link_removes_fresh_server_block() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        host.config.layout.sites_enabled = blocker.join("enabled");
        let d = domain();

        let err = host
            .write_network_config(&d, &html_profile(), None)
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(!host.network_config_exists(&d));
        assert!(!host.is_enabled(&d));
    }

    #[test]
    fn failed_wordpress_upgrade_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let d = domain();
        let host = scripted(&dir);
        Provisioner::new(&host, &store)
            .create(&SiteIntent::for_domain(d.clone()))
            .unwrap();
        let page = dir.path().join("www/example.com/htdocs/index.html");
        fs::write(&page, "<h1>hello</h1>").unwrap();

        let mut failing = scripted(&dir);
        failing.config.services.reload = vec!["false".into()];
        let err = Provisioner::new(&failing, &store)
            .update(
                &SiteIntent::for_domain(d.clone())
                    .with_type(SiteType::Wp)
                    .with_cache(CacheType::W3tc),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Provisioning(_)));

        assert_eq!(fs::read_to_string(&page).unwrap(), "<h1>hello</h1>");
        assert_eq!(store.load(&d).unwrap().unwrap().site_type(), SiteType::Html);
        assert!(
            host.read_network_config(&d)
                .unwrap()
                .contains("try_files $uri $uri/ =404;")
        );
    }

    #[test]
    fn edit_targets_server_block_or_addon_snippet() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let d = domain();
        assert_eq!(
            host.config_file(&d, None),
            dir.path().join("available/example.com")
        );
        assert_eq!(
            host.config_file(&d, Some(Addon::PageSpeed)),
            dir.path().join("www/example.com/conf/nginx/pagespeed.conf")
        );

        let missing = host.config_file(&d, None);
        assert!(host.read_config_file(&missing).unwrap_err().is_not_found());
    }

    #[test]
    fn failing_command_reports_status() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        host.config.services.config_test = vec!["false".into()];
        let err = host.check_config().unwrap_err();
        assert!(matches!(err, HostError::Command { .. }));
    }
}
