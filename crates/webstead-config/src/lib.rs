//! Configuration for webstead.
//!
//! One TOML file layered under `WEBSTEAD_*` environment variables, the
//! admin-password resolution chain, and translation to
//! `webstead_core::HostConfig`. The core never sees these types.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use webstead_core::{DatabaseSettings, HostConfig, HostLayout, ServiceCommands};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "WEBSTEAD_CONFIG";

const ENV_PREFIX: &str = "WEBSTEAD_";

const MASK: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Output and color defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    /// Where sites, web-server configuration, state and logs live.
    #[serde(default)]
    pub paths: Paths,

    /// Database server administration access.
    #[serde(default)]
    pub database: Database,

    /// External programs used to provision sites.
    #[serde(default)]
    pub services: Services,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Paths {
    pub webroot_base: PathBuf,
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub server_log_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// JSON document holding every site record.
    pub state_file: PathBuf,
    pub log_file: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        let layout = HostLayout::default();
        Self {
            webroot_base: layout.webroot_base,
            sites_available: layout.sites_available,
            sites_enabled: layout.sites_enabled,
            server_log_dir: layout.server_log_dir,
            backup_dir: layout.backup_dir,
            state_file: "/var/lib/webstead/sites.json".into(),
            log_file: "/var/log/webstead/webstead.log".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Database {
    pub host: String,
    pub admin_user: String,

    /// Admin password (plaintext -- prefer `admin_password_env`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,

    /// Environment variable name containing the admin password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password_env: Option<String>,
}

impl Default for Database {
    fn default() -> Self {
        let settings = DatabaseSettings::default();
        Self {
            host: settings.host,
            admin_user: settings.admin_user,
            admin_password: None,
            admin_password_env: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Services {
    pub config_test: Vec<String>,
    pub reload: Vec<String>,
    pub mysql: Vec<String>,
    pub wp_cli: Vec<String>,
    pub chown: Vec<String>,

    /// Git invocation for the web-server config repository. An empty list
    /// skips commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<Vec<String>>,

    pub web_user: String,
    pub cms_admin_user: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_admin_email: Option<String>,
}

impl Default for Services {
    fn default() -> Self {
        let commands = ServiceCommands::default();
        Self {
            config_test: commands.config_test,
            reload: commands.reload,
            mysql: commands.mysql,
            wp_cli: commands.wp_cli,
            chown: commands.chown,
            git: commands.git,
            web_user: commands.web_user,
            cms_admin_user: commands.cms_admin_user,
            cms_admin_email: commands.cms_admin_email,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: explicit override, then
/// `WEBSTEAD_CONFIG`, then the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "webstead", "webstead").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("webstead");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, the file at `path` (if present)
/// and the environment.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render(cfg)?)?;
    Ok(())
}

/// TOML text for `cfg`, with a short header.
pub fn render(cfg: &Config) -> Result<String, ConfigError> {
    let body = toml::to_string_pretty(cfg)?;
    Ok(format!(
        "# webstead configuration\n\
         #\n\
         # Every key can be overridden from the environment, e.g.\n\
         # WEBSTEAD_PATHS__WEBROOT_BASE=/srv/www or\n\
         # WEBSTEAD_DATABASE__ADMIN_PASSWORD_ENV=MYSQL_ROOT_PASSWORD.\n\
         # Set [services].git = [] to stop committing web-server changes.\n\n\
         {body}"
    ))
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    /// Reject values the host can not work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let services = &self.services;
        let commands = [
            ("services.config_test", &services.config_test),
            ("services.reload", &services.reload),
            ("services.mysql", &services.mysql),
            ("services.wp_cli", &services.wp_cli),
            ("services.chown", &services.chown),
        ];
        for (field, argv) in commands {
            if argv.is_empty() {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "command must not be empty".into(),
                });
            }
        }
        if !matches!(self.defaults.output.as_str(), "table" | "json" | "yaml" | "plain") {
            return Err(ConfigError::Validation {
                field: "defaults.output".into(),
                reason: format!(
                    "expected 'table', 'json', 'yaml', or 'plain', got '{}'",
                    self.defaults.output
                ),
            });
        }
        Ok(())
    }

    /// A copy safe to print: secrets replaced by a mask.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if copy.database.admin_password.is_some() {
            copy.database.admin_password = Some(MASK.into());
        }
        copy
    }

    /// Build the core host configuration.
    pub fn to_host_config(&self) -> Result<HostConfig, ConfigError> {
        self.validate()?;
        let paths = &self.paths;
        let services = &self.services;
        Ok(HostConfig {
            layout: HostLayout {
                webroot_base: paths.webroot_base.clone(),
                sites_available: paths.sites_available.clone(),
                sites_enabled: paths.sites_enabled.clone(),
                server_log_dir: paths.server_log_dir.clone(),
                backup_dir: paths.backup_dir.clone(),
            },
            database: DatabaseSettings {
                host: self.database.host.clone(),
                admin_user: self.database.admin_user.clone(),
                admin_password: resolve_admin_password(&self.database),
            },
            services: ServiceCommands {
                config_test: services.config_test.clone(),
                reload: services.reload.clone(),
                mysql: services.mysql.clone(),
                wp_cli: services.wp_cli.clone(),
                chown: services.chown.clone(),
                git: services.git.clone().filter(|argv| !argv.is_empty()),
                web_user: services.web_user.clone(),
                cms_admin_user: services.cms_admin_user.clone(),
                cms_admin_email: services.cms_admin_email.clone(),
            },
        })
    }
}

/// Resolve the database admin password.
///
/// Order: the variable named by `admin_password_env`, then the plaintext
/// value. `None` lets the client fall back to its own option files.
pub fn resolve_admin_password(db: &Database) -> Option<SecretString> {
    // 1. Env var named in config
    if let Some(ref env_name) = db.admin_password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. Plaintext in config
    db.admin_password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.paths, Paths::default());
        assert_eq!(cfg.services, Services::default());
        assert_eq!(cfg.defaults.output, "table");
    }

    #[test]
    fn file_overrides_only_the_keys_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
[paths]
webroot_base = "/srv/sites"

[database]
admin_user = "provisioner"
admin_password = "hunter2"

[services]
reload = ["nginx", "-s", "reload"]
"#,
        );

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.paths.webroot_base, PathBuf::from("/srv/sites"));
        assert_eq!(cfg.paths.sites_available, Paths::default().sites_available);
        assert_eq!(cfg.database.admin_user, "provisioner");
        assert_eq!(cfg.database.host, "localhost");
        assert_eq!(cfg.services.reload, ["nginx", "-s", "reload"]);
        assert_eq!(cfg.services.mysql, ["mysql"]);
    }

    #[test]
    fn rendered_defaults_load_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save_config(&Config::default(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# webstead configuration"));
        assert_eq!(load_config(&path).unwrap(), Config::default());
    }

    #[test]
    fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[services]\nreload = []\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "services.reload"));
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        let mut cfg = Config::default();
        cfg.defaults.output = "xml".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[paths\nwebroot_base = 1");
        assert!(matches!(
            load_config(&path).unwrap_err(),
            ConfigError::Figment(_)
        ));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/tmp/custom.toml");
        assert_eq!(config_path(Some(explicit)), explicit);
    }

    #[test]
    fn host_config_carries_layout_and_secret() {
        let mut cfg = Config::default();
        cfg.paths.webroot_base = "/srv/www".into();
        cfg.database.admin_password = Some("s3cret".into());
        cfg.services.git = Some(Vec::new());

        let host = cfg.to_host_config().unwrap();
        assert_eq!(host.layout.webroot_base, PathBuf::from("/srv/www"));
        assert_eq!(host.services.git, None);
        assert_eq!(
            host.database.admin_password.unwrap().expose_secret(),
            "s3cret"
        );
    }

    #[test]
    fn unset_password_env_falls_back_to_plaintext() {
        let db = Database {
            admin_password: Some("plain".into()),
            admin_password_env: Some("WEBSTEAD_TEST_SURELY_UNSET_PASSWORD".into()),
            ..Database::default()
        };
        assert_eq!(
            resolve_admin_password(&db).unwrap().expose_secret(),
            "plain"
        );
        assert!(resolve_admin_password(&Database::default()).is_none());
    }

    #[test]
    fn masked_hides_plaintext_password() {
        let mut cfg = Config::default();
        cfg.database.admin_password = Some("s3cret".into());
        let masked = cfg.masked();
        assert_eq!(masked.database.admin_password.as_deref(), Some(MASK));
        assert_eq!(masked.paths, cfg.paths);
    }
}
