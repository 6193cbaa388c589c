// ── Site domain types ──

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::domain::Domain;
use super::resource::{DatabaseCredentials, Resource};
use crate::error::Rejection;

// ── Enumerations ─────────────────────────────────────────────────────

/// The primary content-serving mode of a site.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SiteType {
    Html,
    Php,
    Mysql,
    Wp,
    WpSubdir,
    WpSubdomain,
    Proxy,
}

impl SiteType {
    pub fn has_database(self) -> bool {
        matches!(self, Self::Mysql | Self::Wp | Self::WpSubdir | Self::WpSubdomain)
    }

    pub fn has_webroot(self) -> bool {
        self != Self::Proxy
    }

    pub fn is_wordpress(self) -> bool {
        self.wp_layout().is_some()
    }

    pub fn wp_layout(self) -> Option<WpLayout> {
        match self {
            Self::Wp => Some(WpLayout::Single),
            Self::WpSubdir => Some(WpLayout::Subdirectory),
            Self::WpSubdomain => Some(WpLayout::Subdomain),
            _ => None,
        }
    }

    pub fn supports(self, addon: Addon) -> bool {
        match addon {
            Addon::Hhvm => !matches!(self, Self::Html | Self::Proxy),
            Addon::PageSpeed => self != Self::Proxy,
        }
    }
}

/// Caching layer applied on top of a site type. Meaningless for proxies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheType {
    Basic,
    W3tc,
    Wpfc,
    Wpsc,
}

impl CacheType {
    /// CMS plugin slug backing this cache, if any.
    pub fn plugin(self) -> Option<&'static str> {
        match self {
            Self::Basic => None,
            Self::W3tc => Some("w3-total-cache"),
            Self::Wpfc => Some("nginx-helper"),
            Self::Wpsc => Some("wp-super-cache"),
        }
    }
}

/// Single site or one of the two multisite layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WpLayout {
    Single,
    Subdirectory,
    Subdomain,
}

/// Orthogonal toggles layered on a site type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Addon {
    Hhvm,
    PageSpeed,
}

// ── Proxy target ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTarget {
    pub host: String,
    pub port: u16,
}

impl ProxyTarget {
    pub const DEFAULT_PORT: u16 = 80;

    /// Parse `HOST[:PORT]` or `[IPV6][:PORT]`; the port defaults to 80.
    /// The host must be a hostname or an IP address.
    pub fn parse(input: &str) -> Result<Self, Rejection> {
        let input = input.trim();
        let invalid_host = || Rejection::combination(format!("invalid proxy host in '{input}'"));
        let parse_port = |port: &str| {
            port.trim().parse::<u16>().map_err(|_| {
                Rejection::combination(format!("invalid proxy port in '{input}'"))
            })
        };

        if let Some(rest) = input.strip_prefix('[') {
            let (addr, tail) = rest.split_once(']').ok_or_else(invalid_host)?;
            addr.parse::<Ipv6Addr>().map_err(|_| invalid_host())?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None if tail.is_empty() => Self::DEFAULT_PORT,
                None => return Err(invalid_host()),
            };
            return Ok(Self {
                host: format!("[{addr}]"),
                port,
            });
        }

        let (host, port) = match input.rsplit_once(':') {
            Some((host, port)) => (host.trim(), parse_port(port)?),
            None => (input, Self::DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(Rejection::combination(
                "proxy server host information is required",
            ));
        }
        if host.parse::<Ipv4Addr>().is_err() && !is_host_name(host) {
            return Err(invalid_host());
        }
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }
}

fn is_host_name(host: &str) -> bool {
    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Site profile ─────────────────────────────────────────────────────

/// The configuration-relevant shape of a site: type, cache, addons and
/// proxy target. Both the stored record and a validated target expose one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub site_type: SiteType,
    pub cache: Option<CacheType>,
    pub hhvm: bool,
    pub pagespeed: bool,
    pub proxy: Option<ProxyTarget>,
}

impl SiteProfile {
    pub fn addon(&self, addon: Addon) -> bool {
        match addon {
            Addon::Hhvm => self.hhvm,
            Addon::PageSpeed => self.pagespeed,
        }
    }
}

impl fmt::Display for SiteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cache {
            Some(cache) => write!(f, "{} {cache}", self.site_type),
            None => write!(f, "{}", self.site_type),
        }
    }
}

// ── Per-type payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSite {
    pub webroot: Resource<PathBuf>,
    #[serde(default)]
    pub pagespeed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpSite {
    pub webroot: Resource<PathBuf>,
    #[serde(default)]
    pub hhvm: bool,
    #[serde(default)]
    pub pagespeed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysqlSite {
    pub webroot: Resource<PathBuf>,
    #[serde(default)]
    pub hhvm: bool,
    #[serde(default)]
    pub pagespeed: bool,
    pub database: Resource<DatabaseCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPressSite {
    pub webroot: Resource<PathBuf>,
    #[serde(default)]
    pub hhvm: bool,
    #[serde(default)]
    pub pagespeed: bool,
    pub database: Resource<DatabaseCredentials>,
    pub cache: CacheType,
}

/// One variant per site type, each carrying only the fields that type has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "site_type", rename_all = "lowercase")]
pub enum SiteKind {
    Html(StaticSite),
    Php(PhpSite),
    Mysql(MysqlSite),
    Wp(WordPressSite),
    WpSubdir(WordPressSite),
    WpSubdomain(WordPressSite),
    Proxy(ProxyTarget),
}

impl SiteKind {
    /// Build the variant matching `profile` from the resources provisioned
    /// for it. Returns `None` if a resource the type requires is missing.
    pub fn assemble(
        profile: &SiteProfile,
        webroot: Option<Resource<PathBuf>>,
        database: Option<Resource<DatabaseCredentials>>,
    ) -> Option<Self> {
        let SiteProfile {
            site_type,
            cache,
            hhvm,
            pagespeed,
            proxy,
        } = profile.clone();

        if site_type == SiteType::Proxy {
            return proxy.map(Self::Proxy);
        }
        let webroot = webroot?;
        let kind = match site_type {
            SiteType::Html => Self::Html(StaticSite { webroot, pagespeed }),
            SiteType::Php => Self::Php(PhpSite {
                webroot,
                hhvm,
                pagespeed,
            }),
            SiteType::Mysql => Self::Mysql(MysqlSite {
                webroot,
                hhvm,
                pagespeed,
                database: database?,
            }),
            SiteType::Wp | SiteType::WpSubdir | SiteType::WpSubdomain => {
                let site = WordPressSite {
                    webroot,
                    hhvm,
                    pagespeed,
                    database: database?,
                    cache: cache.unwrap_or(CacheType::Basic),
                };
                match site_type {
                    SiteType::WpSubdir => Self::WpSubdir(site),
                    SiteType::WpSubdomain => Self::WpSubdomain(site),
                    _ => Self::Wp(site),
                }
            }
            SiteType::Proxy => return None,
        };
        Some(kind)
    }

    pub fn site_type(&self) -> SiteType {
        match self {
            Self::Html(_) => SiteType::Html,
            Self::Php(_) => SiteType::Php,
            Self::Mysql(_) => SiteType::Mysql,
            Self::Wp(_) => SiteType::Wp,
            Self::WpSubdir(_) => SiteType::WpSubdir,
            Self::WpSubdomain(_) => SiteType::WpSubdomain,
            Self::Proxy(_) => SiteType::Proxy,
        }
    }

    pub fn cache_type(&self) -> Option<CacheType> {
        match self {
            Self::Html(_) | Self::Php(_) | Self::Mysql(_) => Some(CacheType::Basic),
            Self::Wp(wp) | Self::WpSubdir(wp) | Self::WpSubdomain(wp) => Some(wp.cache),
            Self::Proxy(_) => None,
        }
    }

    pub fn hhvm(&self) -> bool {
        match self {
            Self::Php(s) => s.hhvm,
            Self::Mysql(s) => s.hhvm,
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => s.hhvm,
            Self::Html(_) | Self::Proxy(_) => false,
        }
    }

    pub fn pagespeed(&self) -> bool {
        match self {
            Self::Html(s) => s.pagespeed,
            Self::Php(s) => s.pagespeed,
            Self::Mysql(s) => s.pagespeed,
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => s.pagespeed,
            Self::Proxy(_) => false,
        }
    }

    pub fn webroot(&self) -> Option<&Resource<PathBuf>> {
        match self {
            Self::Html(s) => Some(&s.webroot),
            Self::Php(s) => Some(&s.webroot),
            Self::Mysql(s) => Some(&s.webroot),
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => Some(&s.webroot),
            Self::Proxy(_) => None,
        }
    }

    pub fn database(&self) -> Option<&Resource<DatabaseCredentials>> {
        match self {
            Self::Mysql(s) => Some(&s.database),
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => Some(&s.database),
            Self::Html(_) | Self::Php(_) | Self::Proxy(_) => None,
        }
    }

    pub fn proxy(&self) -> Option<&ProxyTarget> {
        match self {
            Self::Proxy(target) => Some(target),
            _ => None,
        }
    }

    /// Mark the webroot as removed. No-op for types without one.
    pub fn mark_webroot_deleted(&mut self) {
        let webroot = match self {
            Self::Html(s) => &mut s.webroot,
            Self::Php(s) => &mut s.webroot,
            Self::Mysql(s) => &mut s.webroot,
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => &mut s.webroot,
            Self::Proxy(_) => return,
        };
        *webroot = Resource::Deleted;
    }

    /// Mark the database as removed. No-op for types without one.
    pub fn mark_database_deleted(&mut self) {
        let database = match self {
            Self::Mysql(s) => &mut s.database,
            Self::Wp(s) | Self::WpSubdir(s) | Self::WpSubdomain(s) => &mut s.database,
            Self::Html(_) | Self::Php(_) | Self::Proxy(_) => return,
        };
        *database = Resource::Deleted;
    }
}

// ── SiteRecord ───────────────────────────────────────────────────────

/// Persisted metadata for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub domain: Domain,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub kind: SiteKind,
}

impl SiteRecord {
    pub fn new(domain: Domain, kind: SiteKind) -> Self {
        let now = Utc::now();
        Self {
            domain,
            enabled: true,
            created_at: now,
            updated_at: now,
            kind,
        }
    }

    pub fn www_domain(&self) -> String {
        self.domain.www()
    }

    pub fn site_type(&self) -> SiteType {
        self.kind.site_type()
    }

    pub fn cache_type(&self) -> Option<CacheType> {
        self.kind.cache_type()
    }

    pub fn hhvm(&self) -> bool {
        self.kind.hhvm()
    }

    pub fn pagespeed(&self) -> bool {
        self.kind.pagespeed()
    }

    pub fn profile(&self) -> SiteProfile {
        SiteProfile {
            site_type: self.site_type(),
            cache: self.cache_type(),
            hhvm: self.hhvm(),
            pagespeed: self.pagespeed(),
            proxy: self.kind.proxy().cloned(),
        }
    }

    /// Active webroot path, if the type has one and it is not deleted.
    pub fn webroot_path(&self) -> Option<&PathBuf> {
        self.kind.webroot().and_then(Resource::active)
    }

    /// Active database credentials, if any.
    pub fn database_credentials(&self) -> Option<&DatabaseCredentials> {
        self.kind.database().and_then(Resource::active)
    }

    /// Whether the webroot domain counts as deleted. Types without a
    /// webroot are trivially deleted.
    pub fn files_deleted(&self) -> bool {
        self.kind.webroot().is_none_or(Resource::is_deleted)
    }

    /// Whether the database domain counts as deleted. Types without a
    /// database are trivially deleted.
    pub fn database_deleted(&self) -> bool {
        self.kind.database().is_none_or(Resource::is_deleted)
    }

    /// Eligible for permanent removal: both resource domains are gone.
    pub fn ready_for_removal(&self) -> bool {
        self.files_deleted() && self.database_deleted()
    }

    /// Some resource domain was deleted but the record still exists.
    pub fn partially_deleted(&self) -> bool {
        let webroot_gone = self.kind.webroot().is_some_and(Resource::is_deleted);
        let database_gone = self.kind.database().is_some_and(Resource::is_deleted);
        webroot_gone || database_gone
    }
}
