//! Site command handlers.

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::ExposeSecret;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use webstead_core::{
    Addon, CacheType, CmsAdmin, CommandResult, CoreError, DeleteScope, DeletionReport, Domain,
    DomainResult, ProvisionOutcome, ResourceDomain, SiteFilter, SiteInfo, SiteIntent, SiteRecord,
    SiteType,
};

use crate::cli::{CreateArgs, DeleteArgs, DomainArg, EditArgs, ListArgs, SiteFlags, UpdateArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, SiteController, util};

// ── Views ───────────────────────────────────────────────────────────

/// Printable site state. Never carries the database password.
#[derive(Debug, Serialize)]
struct SiteView {
    domain: String,
    site_type: SiteType,
    cache: Option<CacheType>,
    hhvm: bool,
    pagespeed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<String>,
    enabled: bool,
    webroot: Option<String>,
    files_deleted: bool,
    database: Option<DatabaseView>,
    database_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    name: String,
    user: String,
    host: String,
}

impl From<&SiteRecord> for SiteView {
    fn from(r: &SiteRecord) -> Self {
        Self {
            domain: r.domain.to_string(),
            site_type: r.site_type(),
            cache: r.cache_type(),
            hhvm: r.hhvm(),
            pagespeed: r.pagespeed(),
            proxy: r.kind.proxy().map(ToString::to_string),
            enabled: r.enabled,
            webroot: r.webroot_path().map(|p| p.display().to_string()),
            files_deleted: r.files_deleted(),
            database: r.database_credentials().map(|db| DatabaseView {
                name: db.name.clone(),
                user: db.user.clone(),
                host: db.host.clone(),
            }),
            database_deleted: r.database_deleted(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoView {
    #[serde(flatten)]
    site: SiteView,
    serving: bool,
    network_config_present: bool,
    access_log: String,
    error_log: String,
}

impl From<&SiteInfo> for InfoView {
    fn from(info: &SiteInfo) -> Self {
        Self {
            site: SiteView::from(&info.record),
            serving: info.serving,
            network_config_present: info.network_config_present,
            access_log: info.logs.access.display().to_string(),
            error_log: info.logs.error.display().to_string(),
        }
    }
}

/// Result of `create`: the new site plus the CMS admin it was installed with.
#[derive(Debug, Serialize)]
struct CreatedView {
    #[serde(flatten)]
    site: SiteView,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<AdminView>,
}

#[derive(Debug, Serialize)]
struct AdminView {
    user: String,
    email: String,
    password: String,
}

impl From<&CmsAdmin> for AdminView {
    fn from(a: &CmsAdmin) -> Self {
        Self {
            user: a.user.clone(),
            email: a.email.clone(),
            password: a.password.expose_secret().to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeletionView {
    domain: String,
    database: String,
    files: String,
    finalized: bool,
}

impl From<&DeletionReport> for DeletionView {
    fn from(r: &DeletionReport) -> Self {
        Self {
            domain: r.domain.to_string(),
            database: r.database.to_string(),
            files: r.files.to_string(),
            finalized: r.finalized,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchView {
    domain: String,
    status: &'static str,
    detail: String,
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Type")]
    site_type: String,
    #[tabled(rename = "Cache")]
    cache: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&SiteView> for SiteRow {
    fn from(v: &SiteView) -> Self {
        Self {
            domain: v.domain.clone(),
            site_type: v.site_type.to_string(),
            cache: v.cache.map_or_else(|| "-".into(), |c| c.to_string()),
            enabled: if v.enabled { "yes" } else { "no" }.into(),
            created: v.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Result")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

// ── Detail text ─────────────────────────────────────────────────────

fn detail(v: &SiteView) -> String {
    let mut lines = vec![
        format!("Domain:    {}", v.domain),
        format!("Type:      {}", v.site_type),
        format!(
            "Cache:     {}",
            v.cache.map_or_else(|| "-".into(), |c| c.to_string())
        ),
        format!("HHVM:      {}", on_off(v.hhvm)),
        format!("PageSpeed: {}", on_off(v.pagespeed)),
        format!("Enabled:   {}", if v.enabled { "yes" } else { "no" }),
    ];
    if let Some(proxy) = &v.proxy {
        lines.push(format!("Proxy:     {proxy}"));
    }
    match (&v.webroot, v.files_deleted) {
        (Some(path), _) => lines.push(format!("Webroot:   {path}")),
        (None, true) => lines.push("Webroot:   (deleted)".into()),
        (None, false) => {}
    }
    match (&v.database, v.database_deleted) {
        (Some(db), _) => {
            lines.push(format!("DB name:   {}", db.name));
            lines.push(format!("DB user:   {}", db.user));
            lines.push(format!("DB host:   {}", db.host));
        }
        (None, true) => lines.push("Database:  (deleted)".into()),
        (None, false) => {}
    }
    lines.push(format!(
        "Created:   {}",
        v.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!(
        "Updated:   {}",
        v.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}

fn info_detail(v: &InfoView) -> String {
    [
        detail(&v.site),
        format!("Serving:   {}", if v.serving { "yes" } else { "no" }),
        format!(
            "nginx:     {}",
            if v.network_config_present {
                "present"
            } else {
                "missing"
            }
        ),
        format!("Access:    {}", v.access_log),
        format!("Errors:    {}", v.error_log),
    ]
    .join("\n")
}

fn created_detail(v: &CreatedView) -> String {
    let site = detail(&v.site);
    match &v.admin {
        Some(admin) => format!(
            "{site}\n\nAdmin user:     {}\nAdmin email:    {}\nAdmin password: {}",
            admin.user, admin.email, admin.password
        ),
        None => site,
    }
}

fn deletion_detail(v: &DeletionView) -> String {
    [
        format!("Domain:    {}", v.domain),
        format!("Database:  {}", v.database),
        format!("Webroot:   {}", v.files),
        format!("Removed:   {}", if v.finalized { "yes" } else { "no" }),
    ]
    .join("\n")
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn create(
    controller: &SiteController,
    args: CreateArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let intent = util::apply_flags(SiteIntent::for_domain(domain), &args.site)?;
    let credentials = util::cms_credentials(args.user, args.email, args.pass)?;
    let report = controller.create(&intent.with_credentials(credentials))?;

    ctx.status.success(&format!(
        "Created {} site {}",
        report.record.profile(),
        report.record.domain
    ));
    let view = CreatedView {
        site: SiteView::from(&report.record),
        admin: report.admin.as_ref().map(AdminView::from),
    };
    let out = output::render_single(ctx.format, &view, created_detail, |v| {
        v.site.domain.clone()
    })?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub fn update(
    controller: &SiteController,
    args: &UpdateArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    if args.all {
        return update_all(controller, &args.site, ctx);
    }
    let Some(raw) = args.domain.as_deref() else {
        return Err(CliError::InvalidCombination {
            reason: "a site name or --all is required".into(),
        });
    };
    let domain = util::resolve_domain(controller, raw)?;
    let intent = util::apply_flags(SiteIntent::for_domain(domain.clone()), &args.site)?;

    if args.password {
        if !intent.is_empty() {
            return Err(CliError::InvalidCombination {
                reason: "--password can not be combined with site options".into(),
            });
        }
        return reset_password(controller, &domain, ctx);
    }

    let outcome = controller.update(&intent)?;
    match &outcome {
        ProvisionOutcome::Applied(report) => ctx.status.success(&format!(
            "Updated {domain} to {}",
            report.record.profile()
        )),
        ProvisionOutcome::Unchanged(_) => ctx
            .status
            .note(&format!("{domain} already has that configuration; nothing to do")),
    }
    let view = SiteView::from(outcome.record());
    let out = output::render_single(ctx.format, &view, detail, |v| v.domain.clone())?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

fn update_all(
    controller: &SiteController,
    flags: &SiteFlags,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let intent = util::apply_flags(SiteIntent::for_all(), flags)?;
    let total = controller.list(SiteFilter::All)?.len();

    let bar = if ctx.global.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX))
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }

    let report = controller.update_all(&intent, |domain, result| {
        bar.inc(1);
        bar.set_message(domain.to_string());
        if let Err(e) = result {
            debug!(%domain, error = %e, "site update failed");
        }
    })?;
    bar.finish_and_clear();

    let views: Vec<BatchView> = report
        .entries
        .iter()
        .map(|entry| batch_view(&entry.domain, &entry.result))
        .collect();
    let out = output::render_list(
        ctx.format,
        &views,
        |v| BatchRow {
            domain: v.domain.clone(),
            status: v.status.into(),
            detail: v.detail.clone(),
        },
        |v| format!("{} {}", v.domain, v.status),
    )?;
    output::print_output(&out, ctx.global.quiet);

    let failed = report.failed().count();
    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: report.len(),
        });
    }
    ctx.status
        .success(&format!("Updated {} site(s)", report.succeeded().count()));
    Ok(())
}

fn batch_view(domain: &Domain, result: &Result<ProvisionOutcome, CoreError>) -> BatchView {
    let (status, detail) = match result {
        Ok(ProvisionOutcome::Applied(report)) => ("updated", report.record.profile().to_string()),
        Ok(ProvisionOutcome::Unchanged(record)) => ("unchanged", record.profile().to_string()),
        Err(e) => ("failed", e.to_string()),
    };
    BatchView {
        domain: domain.to_string(),
        status,
        detail,
    }
}

fn reset_password(
    controller: &SiteController,
    domain: &Domain,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    // Fail before prompting when the site can't take a reset.
    controller.site(domain)?;

    let user: String = dialoguer::Input::new()
        .with_prompt("CMS admin user")
        .default(ctx.config.services.cms_admin_user.clone())
        .interact_text()
        .map_err(util::prompt_err)?;
    let password = util::prompt_new_password("New password")?;

    controller.reset_cms_password(domain, &user, &password)?;
    ctx.status
        .success(&format!("Password for {user} on {domain} changed"));
    Ok(())
}

pub fn delete(
    controller: &SiteController,
    args: &DeleteArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let scope = match (args.db, args.files) {
        (true, false) => DeleteScope::Database,
        (false, true) => DeleteScope::Files,
        _ => DeleteScope::All,
    };
    let ask = !(args.no_prompt || ctx.global.yes);

    let mut prompt_failure = None;
    let result = controller.delete(&domain, scope, |record, which| {
        if !ask {
            return true;
        }
        if prompt_failure.is_some() {
            return false;
        }
        match util::confirm(&confirm_message(record, which), false) {
            Ok(answer) => answer,
            Err(e) => {
                prompt_failure = Some(e);
                false
            }
        }
    });
    if let Some(e) = prompt_failure {
        return Err(e);
    }
    let report = result?;

    let status = ctx.status;
    for (which, result) in [
        (ResourceDomain::Database, report.database),
        (ResourceDomain::Files, report.files),
    ] {
        let text = result.to_string();
        status.note(&format!(
            "{which}: {}",
            status.outcome(result != DomainResult::Skipped, &text)
        ));
    }
    if report.finalized {
        status.success(&format!("Deleted {domain}"));
    } else {
        status.warn(&format!(
            "{domain} is kept until its database and webroot are both deleted"
        ));
    }

    let view = DeletionView::from(&report);
    let out = output::render_single(ctx.format, &view, deletion_detail, |v| v.domain.clone())?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

fn confirm_message(record: &SiteRecord, which: ResourceDomain) -> String {
    match which {
        ResourceDomain::Database => match record.database_credentials() {
            Some(db) => format!("Delete database {} of {}?", db.name, record.domain),
            None => format!("Delete the database of {}?", record.domain),
        },
        ResourceDomain::Files => match record.webroot_path() {
            Some(path) => format!("Delete webroot {} of {}?", path.display(), record.domain),
            None => format!("Delete the webroot of {}?", record.domain),
        },
    }
}

pub fn enable(
    controller: &SiteController,
    args: &DomainArg,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    report_serving(&domain, &controller.enable(&domain)?, ctx);
    Ok(())
}

pub fn disable(
    controller: &SiteController,
    args: &DomainArg,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    report_serving(&domain, &controller.disable(&domain)?, ctx);
    Ok(())
}

fn report_serving(domain: &Domain, result: &CommandResult, ctx: &Context<'_>) {
    match result {
        CommandResult::Enabled(_) => ctx.status.success(&format!("Enabled {domain}")),
        CommandResult::Disabled(_) => ctx.status.success(&format!("Disabled {domain}")),
        CommandResult::AlreadyEnabled(_) => {
            ctx.status.note(&format!("{domain} is already enabled"));
        }
        CommandResult::AlreadyDisabled(_) => {
            ctx.status.note(&format!("{domain} is already disabled"));
        }
        other => debug!(?other, "unexpected serving result"),
    }
}

pub fn info(
    controller: &SiteController,
    args: &DomainArg,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let info = controller.info(&domain)?;
    let view = InfoView::from(&info);
    let out = output::render_single(ctx.format, &view, info_detail, |v| v.site.domain.clone())?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub fn show(
    controller: &SiteController,
    args: &DomainArg,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let text = controller.show(&domain)?;
    output::print_output(text.trim_end(), ctx.global.quiet);
    Ok(())
}

pub fn list(
    controller: &SiteController,
    args: &ListArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let filter = if args.enabled {
        SiteFilter::Enabled
    } else if args.disabled {
        SiteFilter::Disabled
    } else {
        SiteFilter::All
    };
    let views: Vec<SiteView> = controller
        .list(filter)?
        .iter()
        .map(SiteView::from)
        .collect();
    let out = output::render_list(
        ctx.format,
        &views,
        |v| SiteRow::from(v),
        |v| v.domain.clone(),
    )?;
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub fn edit(
    controller: &SiteController,
    args: &EditArgs,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let addon = args.pagespeed.then_some(Addon::PageSpeed);
    let report = controller.edit(&domain, addon, util::open_in_editor)?;
    if report.changed {
        ctx.status.success(&format!(
            "Updated {} and reloaded nginx",
            report.path.display()
        ));
    } else {
        ctx.status
            .note(&format!("{} unchanged; nothing to reload", report.path.display()));
    }
    Ok(())
}

pub fn cd(
    controller: &SiteController,
    args: &DomainArg,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    let domain = util::resolve_domain(controller, &args.domain)?;
    let webroot = controller.webroot(&domain)?;
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".into());
    ctx.status.note(&format!(
        "Starting {shell} in {}; exit to return",
        webroot.display()
    ));
    let status = std::process::Command::new(&shell)
        .current_dir(&webroot)
        .status()?;
    debug!(%shell, %status, "shell exited");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use webstead_core::Resource;
    use webstead_core::SiteKind;
    use webstead_core::model::StaticSite;

    fn html_record() -> SiteRecord {
        SiteRecord::new(
            Domain::parse("example.com").unwrap(),
            SiteKind::Html(StaticSite {
                webroot: Resource::Active("/srv/www/example.com".into()),
                pagespeed: false,
            }),
        )
    }

    #[test]
    fn site_view_never_serializes_a_password() {
        let view = SiteView::from(&html_record());
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(r#""site_type":"html""#));
        assert!(!json.contains("password"));
        assert!(detail(&view).contains("Webroot:   /srv/www/example.com"));
    }

    #[test]
    fn deleted_webroot_is_shown_as_deleted() {
        let mut record = html_record();
        record.kind.mark_webroot_deleted();
        let view = SiteView::from(&record);
        assert!(view.webroot.is_none());
        assert!(detail(&view).contains("Webroot:   (deleted)"));
    }

    #[test]
    fn batch_failures_carry_the_error_text() {
        let domain = Domain::parse("a.com").unwrap();
        let err: CoreError = webstead_core::Rejection::InvalidCombination {
            reason: "nope".into(),
        }
        .into();
        let view = batch_view(&domain, &Err(err));
        assert_eq!(view.status, "failed");
        assert!(view.detail.contains("nope"));
    }
}
