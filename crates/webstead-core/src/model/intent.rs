// ── Caller intent ──
//
// Built once from caller input and handed by value to the validator and
// the orchestrator. Never mutated afterwards.

use std::collections::BTreeSet;

use secrecy::SecretString;

use super::domain::Domain;
use super::site::{Addon, CacheType, ProxyTarget, SiteType};

/// Single site or every known site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    Single,
    All,
}

/// CMS administrator credentials handed to the installer.
///
/// Unset fields are filled in by the host (user from configuration,
/// generated password).
#[derive(Debug, Clone, Default)]
pub struct CmsCredentials {
    pub user: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// A requested create/update, exactly as the caller expressed it.
///
/// Type and cache flags are sets so that "two type flags at once" is
/// representable and can be rejected by validation.
#[derive(Debug, Clone, Default)]
pub struct SiteIntent {
    pub domain: Option<Domain>,
    pub site_types: BTreeSet<SiteType>,
    pub caches: BTreeSet<CacheType>,
    /// `None` = unset (inherit on update), `Some(b)` = explicit on/off.
    pub hhvm: Option<bool>,
    pub pagespeed: Option<bool>,
    pub proxy: Option<ProxyTarget>,
    pub credentials: CmsCredentials,
    pub scope: Scope,
}

impl SiteIntent {
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain: Some(domain),
            ..Self::default()
        }
    }

    /// Intent applied to every site by a batch update.
    pub fn for_all() -> Self {
        Self {
            scope: Scope::All,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_type(mut self, site_type: SiteType) -> Self {
        self.site_types.insert(site_type);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheType) -> Self {
        self.caches.insert(cache);
        self
    }

    #[must_use]
    pub fn with_addon(mut self, addon: Addon, enabled: bool) -> Self {
        match addon {
            Addon::Hhvm => self.hhvm = Some(enabled),
            Addon::PageSpeed => self.pagespeed = Some(enabled),
        }
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, target: ProxyTarget) -> Self {
        self.proxy = Some(target);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: CmsCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// The same intent retargeted at another domain (batch updates).
    #[must_use]
    pub fn retarget(&self, domain: Domain) -> Self {
        Self {
            domain: Some(domain),
            scope: Scope::Single,
            ..self.clone()
        }
    }

    pub fn addon(&self, addon: Addon) -> Option<bool> {
        match addon {
            Addon::Hhvm => self.hhvm,
            Addon::PageSpeed => self.pagespeed,
        }
    }

    pub fn has_addon_flags(&self) -> bool {
        self.hhvm.is_some() || self.pagespeed.is_some()
    }

    /// True when no type, cache, proxy or addon flag was given.
    pub fn is_empty(&self) -> bool {
        self.site_types.is_empty()
            && self.caches.is_empty()
            && self.proxy.is_none()
            && !self.has_addon_flags()
    }
}
