// ── Domain model ──

pub mod domain;
pub mod intent;
pub mod resource;
pub mod site;

pub use domain::Domain;
pub use intent::{CmsCredentials, Scope, SiteIntent};
pub use resource::{DatabaseCredentials, Resource, ResourceDomain};
pub use site::{
    Addon, CacheType, MysqlSite, PhpSite, ProxyTarget, SiteKind, SiteProfile, SiteRecord,
    SiteType, StaticSite, WordPressSite, WpLayout,
};
