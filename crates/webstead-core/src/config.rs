// ── Runtime host configuration ──
//
// These types describe *where* sites live and *which* programs provision
// them. They never touch disk; the CLI builds a `HostConfig` from the
// TOML file and hands it in.

use std::path::PathBuf;

use secrecy::SecretString;

/// Filesystem layout of the managed host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    /// Parent of every site webroot (`<webroot_base>/<domain>`).
    pub webroot_base: PathBuf,
    /// Directory holding the "available" web-server configuration artifacts.
    pub sites_available: PathBuf,
    /// Directory holding the "enabled" markers.
    pub sites_enabled: PathBuf,
    /// Web-server log directory, used for proxy sites.
    pub server_log_dir: PathBuf,
    /// Pre-update configuration backups.
    pub backup_dir: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            webroot_base: "/var/www".into(),
            sites_available: "/etc/nginx/sites-available".into(),
            sites_enabled: "/etc/nginx/sites-enabled".into(),
            server_log_dir: "/var/log/nginx".into(),
            backup_dir: "/var/lib/webstead/backup".into(),
        }
    }
}

/// Database server access used to create and drop site databases.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Host recorded in site credentials and passed to the client.
    pub host: String,
    pub admin_user: String,
    pub admin_password: Option<SecretString>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            admin_user: "root".into(),
            admin_password: None,
        }
    }
}

/// External programs, each an argv prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommands {
    pub config_test: Vec<String>,
    pub reload: Vec<String>,
    pub mysql: Vec<String>,
    pub wp_cli: Vec<String>,
    pub chown: Vec<String>,
    /// `None` disables version-control commits.
    pub git: Option<Vec<String>>,
    /// Owner of site files.
    pub web_user: String,
    /// Default CMS admin account when the caller gives none.
    pub cms_admin_user: String,
    pub cms_admin_email: Option<String>,
}

impl Default for ServiceCommands {
    fn default() -> Self {
        let argv = |parts: &[&str]| parts.iter().map(|p| (*p).to_owned()).collect::<Vec<_>>();
        Self {
            config_test: argv(&["nginx", "-t"]),
            reload: argv(&["systemctl", "reload", "nginx"]),
            mysql: argv(&["mysql"]),
            wp_cli: argv(&["wp", "--allow-root"]),
            chown: argv(&["chown", "-R"]),
            git: Some(argv(&["git", "-C", "/etc/nginx"])),
            web_user: "www-data".into(),
            cms_admin_user: "admin".into(),
            cms_admin_email: None,
        }
    }
}

/// Everything a [`LocalHost`](crate::LocalHost) needs.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub layout: HostLayout,
    pub database: DatabaseSettings,
    pub services: ServiceCommands,
}
