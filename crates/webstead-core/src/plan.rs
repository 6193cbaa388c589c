// ── Provisioning plan ──
//
// A validated target configuration carries the ordered step list the
// orchestrator executes. Each step belongs to one phase of the
// provisioning state machine; phases only ever move forward.

use std::fmt;
use std::path::PathBuf;

use crate::host::Backup;
use crate::model::{Addon, CacheType, DatabaseCredentials, SiteProfile, SiteRecord, WpLayout};

// ── Phase ────────────────────────────────────────────────────────────

/// Provisioning state machine phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    PreflightCheck,
    MaterializingWebroot,
    ProvisioningDatabase,
    InstallingCms,
    ConfiguringAddons,
    ReloadingService,
    Committed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PreflightCheck => "running preflight checks",
            Self::MaterializingWebroot => "materializing webroot",
            Self::ProvisioningDatabase => "provisioning database",
            Self::InstallingCms => "installing CMS",
            Self::ConfiguringAddons => "configuring addons",
            Self::ReloadingService => "reloading service",
            Self::Committed => "committing",
        })
    }
}

// ── Step ─────────────────────────────────────────────────────────────

/// One side-effecting unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Web-server configuration test.
    Preflight,
    /// Copy network config and db config aside (updates only).
    BackupSite,
    MaterializeWebroot,
    /// Available artifact plus enabled marker.
    WriteNetworkConfig,
    ProvisionDatabase,
    InstallCms(WpLayout),
    EnableMultisite(WpLayout),
    RemoveCachePlugin(CacheType),
    InstallCachePlugin(CacheType),
    ConfigureAddon { addon: Addon, enabled: bool },
    SetPermissions,
    PersistRecord,
    Reload,
}

impl Step {
    pub fn phase(self) -> Phase {
        match self {
            Self::Preflight => Phase::PreflightCheck,
            Self::BackupSite | Self::MaterializeWebroot | Self::WriteNetworkConfig => {
                Phase::MaterializingWebroot
            }
            Self::ProvisionDatabase => Phase::ProvisioningDatabase,
            Self::InstallCms(_)
            | Self::EnableMultisite(_)
            | Self::RemoveCachePlugin(_)
            | Self::InstallCachePlugin(_) => Phase::InstallingCms,
            Self::ConfigureAddon { .. } | Self::SetPermissions => Phase::ConfiguringAddons,
            Self::PersistRecord | Self::Reload => Phase::ReloadingService,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preflight => f.write_str("preflight"),
            Self::BackupSite => f.write_str("backup"),
            Self::MaterializeWebroot => f.write_str("webroot setup"),
            Self::WriteNetworkConfig => f.write_str("web server configuration"),
            Self::ProvisionDatabase => f.write_str("database setup"),
            Self::InstallCms(layout) => write!(f, "CMS install ({layout})"),
            Self::EnableMultisite(layout) => write!(f, "multisite setup ({layout})"),
            Self::RemoveCachePlugin(cache) => write!(f, "{cache} plugin removal"),
            Self::InstallCachePlugin(cache) => write!(f, "{cache} plugin install"),
            Self::ConfigureAddon { addon, enabled } => {
                let verb = if *enabled { "enable" } else { "disable" };
                write!(f, "{addon} {verb}")
            }
            Self::SetPermissions => f.write_str("permissions"),
            Self::PersistRecord => f.write_str("record write"),
            Self::Reload => f.write_str("web server reload"),
        }
    }
}

// ── Compensation ─────────────────────────────────────────────────────

/// An undo action registered by a successful step. Executed in reverse
/// registration order when a later step fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    RestoreBackup(Backup),
    RemoveWebroot(PathBuf),
    RemoveNetworkConfig,
    DropDatabase(DatabaseCredentials),
    /// Empty the document root, or put back the copy in `prior`.
    UninstallCms {
        webroot: PathBuf,
        prior: Option<Backup>,
    },
    ReinstallCachePlugin { webroot: PathBuf, cache: CacheType },
    RemoveCachePlugin { webroot: PathBuf, cache: CacheType },
    /// Put the addon back to `enabled`.
    RevertAddon { addon: Addon, enabled: bool },
    DeleteRecord,
    RestoreRecord(Box<SiteRecord>),
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestoreBackup(backup) => write!(f, "restore backup {}", backup.location.display()),
            Self::RemoveWebroot(path) => write!(f, "remove webroot {}", path.display()),
            Self::RemoveNetworkConfig => f.write_str("remove web server configuration"),
            Self::DropDatabase(db) => write!(f, "drop database {}", db.name),
            Self::UninstallCms { .. } => f.write_str("uninstall CMS"),
            Self::ReinstallCachePlugin { cache, .. } => write!(f, "reinstall {cache} plugin"),
            Self::RemoveCachePlugin { cache, .. } => write!(f, "remove {cache} plugin"),
            Self::RevertAddon { addon, enabled } => write!(f, "revert {addon} to {enabled}"),
            Self::DeleteRecord => f.write_str("delete site record"),
            Self::RestoreRecord(_) => f.write_str("restore site record"),
        }
    }
}

// ── Target configuration ─────────────────────────────────────────────

/// What kind of change a target configuration represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    /// Type and/or cache change, validated against the transition matrix.
    Upgrade,
    /// Only hhvm/pagespeed change; type and cache are kept.
    AddonOnly,
}

/// Validated target of a create or update, with its execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfiguration {
    pub profile: SiteProfile,
    pub change: ChangeKind,
    pub steps: Vec<Step>,
}

impl TargetConfiguration {
    pub(crate) fn creation(profile: SiteProfile) -> Self {
        let steps = plan_creation(&profile);
        Self {
            profile,
            change: ChangeKind::Create,
            steps,
        }
    }

    pub(crate) fn update(current: &SiteProfile, profile: SiteProfile, change: ChangeKind) -> Self {
        let steps = match change {
            ChangeKind::AddonOnly => plan_addon_update(current, &profile),
            ChangeKind::Create | ChangeKind::Upgrade => plan_upgrade(current, &profile),
        };
        Self {
            profile,
            change,
            steps,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.change == ChangeKind::Create
    }
}

// ── Planners ─────────────────────────────────────────────────────────

fn plan_creation(target: &SiteProfile) -> Vec<Step> {
    let site_type = target.site_type;
    let mut steps = vec![Step::Preflight];

    if site_type.has_webroot() {
        steps.push(Step::MaterializeWebroot);
    }
    steps.push(Step::WriteNetworkConfig);
    if site_type.has_database() {
        steps.push(Step::ProvisionDatabase);
    }
    if let Some(layout) = site_type.wp_layout() {
        steps.push(Step::InstallCms(layout));
        if let Some(cache) = target.cache.filter(|c| c.plugin().is_some()) {
            steps.push(Step::InstallCachePlugin(cache));
        }
    }
    for addon in [Addon::Hhvm, Addon::PageSpeed] {
        if target.addon(addon) {
            steps.push(Step::ConfigureAddon {
                addon,
                enabled: true,
            });
        }
    }
    if site_type.has_webroot() {
        steps.push(Step::SetPermissions);
    }
    steps.extend([Step::PersistRecord, Step::Reload]);
    steps
}

fn plan_upgrade(current: &SiteProfile, target: &SiteProfile) -> Vec<Step> {
    let from = current.site_type;
    let to = target.site_type;
    let mut steps = vec![Step::Preflight, Step::BackupSite];

    if to.has_webroot() && !from.has_webroot() {
        steps.push(Step::MaterializeWebroot);
    }
    steps.push(Step::WriteNetworkConfig);
    if to.has_database() && !from.has_database() {
        steps.push(Step::ProvisionDatabase);
    }

    if let Some(layout) = to.wp_layout() {
        if !from.is_wordpress() {
            steps.push(Step::InstallCms(layout));
        } else if from.wp_layout() == Some(WpLayout::Single) && layout != WpLayout::Single {
            steps.push(Step::EnableMultisite(layout));
        }
    }

    let old_cache = current.cache.filter(|_| from.is_wordpress());
    let new_cache = target.cache.filter(|_| to.is_wordpress());
    if old_cache != new_cache {
        if let Some(old) = old_cache.filter(|c| c.plugin().is_some()) {
            steps.push(Step::RemoveCachePlugin(old));
        }
        if let Some(new) = new_cache.filter(|c| c.plugin().is_some()) {
            steps.push(Step::InstallCachePlugin(new));
        }
    }

    push_addon_changes(&mut steps, current, target);
    if to.has_webroot() {
        steps.push(Step::SetPermissions);
    }
    steps.extend([Step::PersistRecord, Step::Reload]);
    steps
}

fn plan_addon_update(current: &SiteProfile, target: &SiteProfile) -> Vec<Step> {
    let mut steps = vec![Step::Preflight, Step::BackupSite, Step::WriteNetworkConfig];
    push_addon_changes(&mut steps, current, target);
    steps.extend([Step::PersistRecord, Step::Reload]);
    steps
}

fn push_addon_changes(steps: &mut Vec<Step>, current: &SiteProfile, target: &SiteProfile) {
    for addon in [Addon::Hhvm, Addon::PageSpeed] {
        let enabled = target.addon(addon);
        if enabled != current.addon(addon) {
            steps.push(Step::ConfigureAddon { addon, enabled });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SiteType;
    use pretty_assertions::assert_eq;

    fn profile(site_type: SiteType, cache: Option<CacheType>) -> SiteProfile {
        SiteProfile {
            site_type,
            cache,
            hhvm: false,
            pagespeed: false,
            proxy: None,
        }
    }

    #[test]
    fn html_creation_skips_database_and_cms() {
        let target = TargetConfiguration::creation(profile(SiteType::Html, Some(CacheType::Basic)));
        assert_eq!(
            target.steps,
            vec![
                Step::Preflight,
                Step::MaterializeWebroot,
                Step::WriteNetworkConfig,
                Step::SetPermissions,
                Step::PersistRecord,
                Step::Reload,
            ]
        );
    }

    #[test]
    fn proxy_creation_has_no_webroot() {
        let mut proxy = profile(SiteType::Proxy, None);
        proxy.proxy = Some(crate::model::ProxyTarget {
            host: "127.0.0.1".into(),
            port: 8080,
        });
        let target = TargetConfiguration::creation(proxy);
        assert_eq!(
            target.steps,
            vec![
                Step::Preflight,
                Step::WriteNetworkConfig,
                Step::PersistRecord,
                Step::Reload
            ]
        );
    }

    #[test]
    fn wordpress_creation_installs_cms_then_cache_plugin() {
        let mut wp = profile(SiteType::WpSubdir, Some(CacheType::Wpfc));
        wp.hhvm = true;
        let target = TargetConfiguration::creation(wp);
        assert_eq!(
            target.steps,
            vec![
                Step::Preflight,
                Step::MaterializeWebroot,
                Step::WriteNetworkConfig,
                Step::ProvisionDatabase,
                Step::InstallCms(WpLayout::Subdirectory),
                Step::InstallCachePlugin(CacheType::Wpfc),
                Step::ConfigureAddon {
                    addon: Addon::Hhvm,
                    enabled: true
                },
                Step::SetPermissions,
                Step::PersistRecord,
                Step::Reload,
            ]
        );
    }

    #[test]
    fn wp_to_multisite_swaps_cache_plugin() {
        let current = profile(SiteType::Wp, Some(CacheType::W3tc));
        let target = profile(SiteType::WpSubdomain, Some(CacheType::Wpsc));
        let steps = TargetConfiguration::update(&current, target, ChangeKind::Upgrade).steps;
        assert_eq!(
            steps,
            vec![
                Step::Preflight,
                Step::BackupSite,
                Step::WriteNetworkConfig,
                Step::EnableMultisite(WpLayout::Subdomain),
                Step::RemoveCachePlugin(CacheType::W3tc),
                Step::InstallCachePlugin(CacheType::Wpsc),
                Step::SetPermissions,
                Step::PersistRecord,
                Step::Reload,
            ]
        );
    }

    #[test]
    fn php_to_mysql_adds_database_only() {
        let current = profile(SiteType::Php, Some(CacheType::Basic));
        let target = profile(SiteType::Mysql, Some(CacheType::Basic));
        let steps = TargetConfiguration::update(&current, target, ChangeKind::Upgrade).steps;
        assert!(steps.contains(&Step::ProvisionDatabase));
        assert!(!steps.contains(&Step::MaterializeWebroot));
        assert!(!steps.iter().any(|s| matches!(s, Step::InstallCms(_))));
    }

    #[test]
    fn addon_update_only_touches_changed_addons() {
        let current = profile(SiteType::Wp, Some(CacheType::Basic));
        let mut target = current.clone();
        target.pagespeed = true;
        let steps = TargetConfiguration::update(&current, target, ChangeKind::AddonOnly).steps;
        assert_eq!(
            steps,
            vec![
                Step::Preflight,
                Step::BackupSite,
                Step::WriteNetworkConfig,
                Step::ConfigureAddon {
                    addon: Addon::PageSpeed,
                    enabled: true
                },
                Step::PersistRecord,
                Step::Reload,
            ]
        );
    }

    #[test]
    fn phases_never_move_backwards() {
        let target = TargetConfiguration::creation(profile(SiteType::Wp, Some(CacheType::W3tc)));
        let phases: Vec<Phase> = target.steps.iter().map(|s| s.phase()).collect();
        assert!(phases.windows(2).all(|w| w[0] <= w[1]));
    }
}
