// ── Transition validation ──
//
// Pure: turns a caller intent plus the stored record (absent on creation)
// into a validated target configuration, or rejects before anything is
// touched. Upgrades follow html → php → mysql → wp → {wpsubdir,
// wpsubdomain}; lateral moves and downgrades are refused.

use tracing::debug;

use crate::error::Rejection;
use crate::model::{
    Addon, CacheType, ProxyTarget, ResourceDomain, SiteIntent, SiteProfile, SiteRecord, SiteType,
};
use crate::plan::{ChangeKind, TargetConfiguration};

/// Compute the target configuration for `intent`.
///
/// `current` is `None` for creation. An update that restates the current
/// configuration is rejected with [`Rejection::AmbiguousIntent`], which
/// callers treat as a successful no-op.
pub fn compute_target(
    intent: &SiteIntent,
    current: Option<&SiteRecord>,
) -> Result<TargetConfiguration, Rejection> {
    let requested = RequestedShape::resolve(intent)?;
    let target = match current {
        None => creation_target(intent, &requested)?,
        Some(record) => update_target(intent, &requested, record)?,
    };
    debug!(
        domain = intent.domain.as_ref().map(|d| d.as_str()),
        target = %target.profile,
        change = ?target.change,
        steps = target.steps.len(),
        "computed target configuration"
    );
    Ok(target)
}

// ── Flag resolution ──────────────────────────────────────────────────

/// Type/cache/proxy flags reduced to at most one of each.
struct RequestedShape {
    site_type: Option<SiteType>,
    cache: Option<CacheType>,
    proxy: Option<ProxyTarget>,
}

impl RequestedShape {
    fn resolve(intent: &SiteIntent) -> Result<Self, Rejection> {
        let proxy_flag = intent.site_types.contains(&SiteType::Proxy);
        let mut types = intent
            .site_types
            .iter()
            .copied()
            .filter(|t| *t != SiteType::Proxy);

        let site_type = match (types.next(), types.next(), types.next()) {
            (None, _, _) => None,
            (Some(only), None, _) => Some(only),
            (Some(a), Some(b), None) => Some(merge_multisite(a, b)?),
            _ => return Err(Rejection::combination("only one site type may be given")),
        };

        let mut caches = intent.caches.iter().copied();
        let cache = match (caches.next(), caches.next()) {
            (first, None) => first,
            _ => return Err(Rejection::combination("only one cache type may be given")),
        };

        if proxy_flag && intent.proxy.is_none() {
            return Err(Rejection::combination(
                "proxy server host information is required",
            ));
        }
        if intent.proxy.is_some() {
            if site_type.is_some() || cache.is_some() {
                return Err(Rejection::combination(
                    "--proxy can not be used with other site types",
                ));
            }
            if intent.hhvm == Some(true) || intent.pagespeed == Some(true) {
                return Err(Rejection::combination(
                    "proxy site can not run on pagespeed or hhvm",
                ));
            }
        }

        if let (Some(site_type), Some(cache)) = (site_type, cache) {
            if !site_type.is_wordpress() && cache != CacheType::Basic {
                return Err(Rejection::combination(format!(
                    "{cache} cache is only available for WordPress sites"
                )));
            }
        }

        Ok(Self {
            site_type,
            cache,
            proxy: intent.proxy.clone(),
        })
    }
}

/// `wp` plus one multisite flag resolves to the multisite type.
fn merge_multisite(a: SiteType, b: SiteType) -> Result<SiteType, Rejection> {
    match (a, b) {
        (SiteType::Wp, other @ (SiteType::WpSubdir | SiteType::WpSubdomain))
        | (other @ (SiteType::WpSubdir | SiteType::WpSubdomain), SiteType::Wp) => Ok(other),
        _ => Err(Rejection::combination(format!(
            "--{a} and --{b} can not be combined"
        ))),
    }
}

/// Addon combination rules that apply to every target, including
/// addon-only updates.
fn check_addons(profile: &SiteProfile) -> Result<(), Rejection> {
    for addon in [Addon::Hhvm, Addon::PageSpeed] {
        if profile.addon(addon) && !profile.site_type.supports(addon) {
            return Err(Rejection::combination(format!(
                "{} site can not run on {addon}",
                profile.site_type
            )));
        }
    }
    Ok(())
}

// ── Creation ─────────────────────────────────────────────────────────

fn creation_target(
    intent: &SiteIntent,
    requested: &RequestedShape,
) -> Result<TargetConfiguration, Rejection> {
    let profile = if let Some(proxy) = &requested.proxy {
        SiteProfile {
            site_type: SiteType::Proxy,
            cache: None,
            hhvm: false,
            pagespeed: false,
            proxy: Some(proxy.clone()),
        }
    } else {
        let site_type = requested.site_type.unwrap_or(if requested.cache.is_some() {
            SiteType::Wp
        } else {
            SiteType::Html
        });
        SiteProfile {
            site_type,
            cache: Some(requested.cache.unwrap_or(CacheType::Basic)),
            hhvm: intent.hhvm.unwrap_or(false),
            pagespeed: intent.pagespeed.unwrap_or(false),
            proxy: None,
        }
    };
    check_addons(&profile)?;
    Ok(TargetConfiguration::creation(profile))
}

// ── Update ───────────────────────────────────────────────────────────

fn update_target(
    intent: &SiteIntent,
    requested: &RequestedShape,
    record: &SiteRecord,
) -> Result<TargetConfiguration, Rejection> {
    let domain = record.domain.to_string();

    if record.partially_deleted() {
        let remaining = if record.files_deleted() {
            ResourceDomain::Database
        } else {
            ResourceDomain::Files
        };
        return Err(Rejection::PendingDeletion {
            domain,
            remaining: remaining.to_string(),
        });
    }
    if intent.is_empty() {
        return Err(Rejection::combination("no update options given"));
    }

    let current = record.profile();

    if let Some(proxy) = &requested.proxy {
        let target = SiteProfile {
            site_type: SiteType::Proxy,
            cache: None,
            hhvm: false,
            pagespeed: false,
            proxy: Some(proxy.clone()),
        };
        return if target == current {
            Err(Rejection::AmbiguousIntent { domain })
        } else {
            Err(Rejection::transition(&current, &target))
        };
    }

    let explicit_shape = requested.site_type.is_some() || requested.cache.is_some();
    let (site_type, cache) = if explicit_shape {
        let site_type = requested.site_type.unwrap_or(if current.site_type.is_wordpress() {
            current.site_type
        } else {
            SiteType::Wp
        });
        (site_type, Some(requested.cache.unwrap_or(CacheType::Basic)))
    } else {
        (current.site_type, current.cache)
    };

    let target = SiteProfile {
        site_type,
        cache,
        hhvm: intent.hhvm.unwrap_or(current.hhvm),
        pagespeed: intent.pagespeed.unwrap_or(current.pagespeed),
        proxy: current.proxy.clone().filter(|_| site_type == SiteType::Proxy),
    };
    check_addons(&target)?;

    let same_shape = target.site_type == current.site_type && target.cache == current.cache;
    if same_shape {
        if target == current {
            return Err(Rejection::AmbiguousIntent { domain });
        }
        return Ok(TargetConfiguration::update(
            &current,
            target,
            ChangeKind::AddonOnly,
        ));
    }

    if !transition_allowed(current.site_type, target.site_type) {
        return Err(Rejection::transition(&current, &target));
    }
    Ok(TargetConfiguration::update(
        &current,
        target,
        ChangeKind::Upgrade,
    ))
}

/// Upgrade-only transition matrix between distinct (type, cache) shapes.
pub fn transition_allowed(from: SiteType, to: SiteType) -> bool {
    use SiteType::{Html, Mysql, Php, Proxy, Wp, WpSubdir, WpSubdomain};

    match to {
        Html | Proxy => false,
        Php => matches!(from, Html | Proxy),
        Mysql => matches!(from, Html | Php | Proxy),
        Wp => matches!(from, Html | Php | Mysql | Proxy | Wp),
        WpSubdir => from != WpSubdomain,
        WpSubdomain => from != WpSubdir,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{
        DatabaseCredentials, Domain, PhpSite, Resource, SiteKind, StaticSite, WordPressSite,
    };
    use crate::plan::Step;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use strum::IntoEnumIterator;

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    fn creds() -> Resource<DatabaseCredentials> {
        Resource::Active(DatabaseCredentials {
            name: "example_com".into(),
            user: "example_com".into(),
            password: SecretString::from("pw".to_owned()),
            host: "localhost".into(),
        })
    }

    fn record_of(site_type: SiteType, cache: CacheType) -> SiteRecord {
        let webroot = Resource::Active("/var/www/example.com".into());
        let wp = || WordPressSite {
            webroot: webroot.clone(),
            hhvm: false,
            pagespeed: false,
            database: creds(),
            cache,
        };
        let kind = match site_type {
            SiteType::Html => SiteKind::Html(StaticSite {
                webroot: webroot.clone(),
                pagespeed: false,
            }),
            SiteType::Php => SiteKind::Php(PhpSite {
                webroot: webroot.clone(),
                hhvm: false,
                pagespeed: false,
            }),
            SiteType::Mysql => SiteKind::Mysql(crate::model::MysqlSite {
                webroot: webroot.clone(),
                hhvm: false,
                pagespeed: false,
                database: creds(),
            }),
            SiteType::Wp => SiteKind::Wp(wp()),
            SiteType::WpSubdir => SiteKind::WpSubdir(wp()),
            SiteType::WpSubdomain => SiteKind::WpSubdomain(wp()),
            SiteType::Proxy => SiteKind::Proxy(ProxyTarget {
                host: "10.0.0.1".into(),
                port: 80,
            }),
        };
        SiteRecord::new(domain(), kind)
    }

    fn intent() -> SiteIntent {
        SiteIntent::for_domain(domain())
    }

    fn rejection(result: Result<TargetConfiguration, Rejection>) -> Rejection {
        result.expect_err("expected a rejection")
    }

    // ── creation ──

    #[test]
    fn creation_defaults_to_html_basic() {
        let target = compute_target(&intent(), None).unwrap();
        assert_eq!(target.profile.site_type, SiteType::Html);
        assert_eq!(target.profile.cache, Some(CacheType::Basic));
        assert!(!target.profile.hhvm && !target.profile.pagespeed);
        assert!(target.is_creation());
    }

    #[test]
    fn creation_cache_without_type_means_wp() {
        let target = compute_target(&intent().with_cache(CacheType::Wpsc), None).unwrap();
        assert_eq!(target.profile.site_type, SiteType::Wp);
        assert_eq!(target.profile.cache, Some(CacheType::Wpsc));
    }

    #[test]
    fn wp_plus_multisite_resolves_to_multisite() {
        let target = compute_target(
            &intent().with_type(SiteType::Wp).with_type(SiteType::WpSubdomain),
            None,
        )
        .unwrap();
        assert_eq!(target.profile.site_type, SiteType::WpSubdomain);
    }

    #[test]
    fn conflicting_type_flags_are_rejected() {
        for (a, b) in [
            (SiteType::WpSubdir, SiteType::WpSubdomain),
            (SiteType::Html, SiteType::Php),
            (SiteType::Mysql, SiteType::Wp),
        ] {
            let err = rejection(compute_target(&intent().with_type(a).with_type(b), None));
            assert!(matches!(err, Rejection::InvalidCombination { .. }), "{a}+{b}");
        }
    }

    #[test]
    fn two_caches_are_rejected() {
        let err = rejection(compute_target(
            &intent().with_cache(CacheType::W3tc).with_cache(CacheType::Wpfc),
            None,
        ));
        assert!(matches!(err, Rejection::InvalidCombination { .. }));
    }

    #[test]
    fn non_basic_cache_needs_wordpress() {
        let err = rejection(compute_target(
            &intent().with_type(SiteType::Php).with_cache(CacheType::W3tc),
            None,
        ));
        assert!(matches!(err, Rejection::InvalidCombination { .. }));
    }

    #[test]
    fn html_with_hhvm_is_rejected() {
        let err = rejection(compute_target(
            &intent().with_type(SiteType::Html).with_addon(Addon::Hhvm, true),
            None,
        ));
        assert!(matches!(err, Rejection::InvalidCombination { .. }));
    }

    #[test]
    fn proxy_with_other_type_is_rejected() {
        let target = ProxyTarget::parse("127.0.0.1:8080").unwrap();
        let err = rejection(compute_target(
            &intent().with_proxy(target).with_type(SiteType::Php),
            None,
        ));
        assert!(matches!(err, Rejection::InvalidCombination { .. }));
    }

    #[test]
    fn proxy_with_addons_is_always_rejected() {
        let target = ProxyTarget::parse("127.0.0.1:8080").unwrap();
        let proxy_record = record_of(SiteType::Proxy, CacheType::Basic);
        for addon in [Addon::Hhvm, Addon::PageSpeed] {
            let req = intent().with_proxy(target.clone()).with_addon(addon, true);
            for current in [None, Some(&proxy_record)] {
                let err = rejection(compute_target(&req, current));
                assert!(matches!(err, Rejection::InvalidCombination { .. }));
            }
            // addon-only on an existing proxy
            let req = intent().with_addon(addon, true);
            let err = rejection(compute_target(&req, Some(&proxy_record)));
            assert!(matches!(err, Rejection::InvalidCombination { .. }));
        }
    }

    #[test]
    fn proxy_creation_carries_target() {
        let target = ProxyTarget::parse("backend:9000").unwrap();
        let config = compute_target(&intent().with_proxy(target.clone()), None).unwrap();
        assert_eq!(config.profile.site_type, SiteType::Proxy);
        assert_eq!(config.profile.cache, None);
        assert_eq!(config.profile.proxy, Some(target));
    }

    // ── update matrix ──

    #[test]
    fn matrix_rejects_everything_outside_the_upgrade_set() {
        let allowed: &[(SiteType, SiteType)] = &[
            (SiteType::Html, SiteType::Php),
            (SiteType::Proxy, SiteType::Php),
            (SiteType::Html, SiteType::Mysql),
            (SiteType::Php, SiteType::Mysql),
            (SiteType::Proxy, SiteType::Mysql),
            (SiteType::Html, SiteType::Wp),
            (SiteType::Php, SiteType::Wp),
            (SiteType::Mysql, SiteType::Wp),
            (SiteType::Proxy, SiteType::Wp),
            (SiteType::Wp, SiteType::Wp),
        ];
        for from in SiteType::iter() {
            for to in SiteType::iter() {
                let expected = allowed.contains(&(from, to))
                    || (to == SiteType::WpSubdir && from != SiteType::WpSubdomain)
                    || (to == SiteType::WpSubdomain && from != SiteType::WpSubdir);
                assert_eq!(transition_allowed(from, to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn valid_upgrades_take_the_requested_cache() {
        for (from, to) in [
            (SiteType::Html, SiteType::Wp),
            (SiteType::Mysql, SiteType::WpSubdir),
            (SiteType::Wp, SiteType::WpSubdomain),
        ] {
            for cache in CacheType::iter() {
                let record = record_of(from, CacheType::Basic);
                let target =
                    compute_target(&intent().with_type(to).with_cache(cache), Some(&record))
                        .unwrap();
                assert_eq!(target.profile.site_type, to);
                assert_eq!(target.profile.cache, Some(cache));
            }
        }
    }

    #[test]
    fn lateral_multisite_move_is_rejected() {
        let record = record_of(SiteType::WpSubdomain, CacheType::Basic);
        let err = rejection(compute_target(
            &intent().with_type(SiteType::WpSubdir),
            Some(&record),
        ));
        assert!(matches!(err, Rejection::InvalidTransition { .. }));
    }

    #[test]
    fn downgrade_is_rejected() {
        let record = record_of(SiteType::Mysql, CacheType::Basic);
        let err = rejection(compute_target(&intent().with_type(SiteType::Php), Some(&record)));
        assert_eq!(
            err,
            Rejection::InvalidTransition {
                from: "mysql basic".into(),
                to: "php basic".into(),
            }
        );
    }

    #[test]
    fn non_proxy_cannot_become_proxy() {
        let record = record_of(SiteType::Html, CacheType::Basic);
        let err = rejection(compute_target(
            &intent().with_proxy(ProxyTarget::parse("10.0.0.2").unwrap()),
            Some(&record),
        ));
        assert!(matches!(err, Rejection::InvalidTransition { .. }));
    }

    #[test]
    fn proxy_retarget_is_rejected_and_restatement_is_noop() {
        let record = record_of(SiteType::Proxy, CacheType::Basic);
        let same = ProxyTarget::parse("10.0.0.1").unwrap();
        let err = rejection(compute_target(&intent().with_proxy(same), Some(&record)));
        assert!(matches!(err, Rejection::AmbiguousIntent { .. }));

        let other = ProxyTarget::parse("10.0.0.1:8080").unwrap();
        let err = rejection(compute_target(&intent().with_proxy(other), Some(&record)));
        assert!(matches!(err, Rejection::InvalidTransition { .. }));
    }

    #[test]
    fn cache_only_update_keeps_multisite_type() {
        let record = record_of(SiteType::WpSubdir, CacheType::W3tc);
        let target =
            compute_target(&intent().with_cache(CacheType::Wpfc), Some(&record)).unwrap();
        assert_eq!(target.profile.site_type, SiteType::WpSubdir);
        assert_eq!(target.profile.cache, Some(CacheType::Wpfc));
        assert_eq!(target.change, ChangeKind::Upgrade);
    }

    #[test]
    fn cache_only_update_on_non_wordpress_means_wp() {
        let record = record_of(SiteType::Php, CacheType::Basic);
        let target =
            compute_target(&intent().with_cache(CacheType::W3tc), Some(&record)).unwrap();
        assert_eq!(target.profile.site_type, SiteType::Wp);
        assert!(target.steps.contains(&Step::InstallCms(crate::model::WpLayout::Single)));
    }

    #[test]
    fn identical_shape_is_ambiguous() {
        let record = record_of(SiteType::Wp, CacheType::W3tc);
        let req = intent().with_type(SiteType::Wp).with_cache(CacheType::W3tc);
        let err = rejection(compute_target(&req, Some(&record)));
        assert!(matches!(err, Rejection::AmbiguousIntent { .. }));

        // pagespeed restating the current value changes nothing either
        let req = req.with_addon(Addon::PageSpeed, false);
        let err = rejection(compute_target(&req, Some(&record)));
        assert!(matches!(err, Rejection::AmbiguousIntent { .. }));
    }

    #[test]
    fn empty_update_is_rejected() {
        let record = record_of(SiteType::Php, CacheType::Basic);
        let err = rejection(compute_target(&intent(), Some(&record)));
        assert!(matches!(err, Rejection::InvalidCombination { .. }));
    }

    #[test]
    fn addon_only_update_inherits_shape() {
        let record = record_of(SiteType::Mysql, CacheType::Basic);
        let target = compute_target(&intent().with_addon(Addon::PageSpeed, true), Some(&record))
            .unwrap();
        assert_eq!(target.change, ChangeKind::AddonOnly);
        assert_eq!(target.profile.site_type, SiteType::Mysql);
        assert_eq!(target.profile.cache, Some(CacheType::Basic));
        assert!(target.profile.pagespeed);
        assert!(!target.profile.hhvm);
    }

    #[test]
    fn partially_deleted_site_cannot_be_updated() {
        let mut record = record_of(SiteType::Wp, CacheType::Basic);
        record.kind.mark_database_deleted();
        let err = rejection(compute_target(&intent().with_type(SiteType::WpSubdir), Some(&record)));
        assert_eq!(
            err,
            Rejection::PendingDeletion {
                domain: "example.com".into(),
                remaining: "webroot".into(),
            }
        );
    }
}
