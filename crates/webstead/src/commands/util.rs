//! Shared helpers for command handlers.

use std::path::Path;
use std::process::Command;

use secrecy::SecretString;
use tracing::debug;
use webstead_core::{
    Addon, CacheType, CmsCredentials, Domain, HostError, ProxyTarget, SiteIntent, SiteType,
};

use crate::cli::SiteFlags;
use crate::error::CliError;

use super::SiteController;

/// Normalize a domain argument.
pub fn resolve_domain(controller: &SiteController, input: &str) -> Result<Domain, CliError> {
    Ok(controller.resolve_domain(input)?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt {
        reason: e.to_string(),
    }
}

/// Read a password twice from the terminal without echo.
pub fn prompt_new_password(label: &str) -> Result<SecretString, CliError> {
    let first = rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?;
    if first.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password can not be empty".into(),
        });
    }
    let second = rpassword::prompt_password(format!("Repeat {}: ", label.to_lowercase()))
        .map_err(prompt_err)?;
    if first != second {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    Ok(SecretString::from(first))
}

/// `$VISUAL`, then `$EDITOR`, then `vi`; split on whitespace so values
/// like `code --wait` work.
pub fn editor_command() -> Vec<String> {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| {
            value
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .find(|argv| !argv.is_empty())
        .unwrap_or_else(|| vec!["vi".to_owned()])
}

/// Open `path` in the user's editor and wait for it to exit.
pub fn open_in_editor(path: &Path) -> Result<(), HostError> {
    let argv = editor_command();
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| HostError::Failed("no editor configured".into()))?;
    debug!(editor = %program, path = %path.display(), "opening editor");
    let status = Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|e| HostError::io("spawn", program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(HostError::Command {
            command: argv.join(" "),
            status: status.to_string(),
            stderr: String::new(),
        })
    }
}

/// Translate type, cache, proxy and addon flags into an intent.
pub fn apply_flags(mut intent: SiteIntent, flags: &SiteFlags) -> Result<SiteIntent, CliError> {
    let types = [
        (flags.html, SiteType::Html),
        (flags.php, SiteType::Php),
        (flags.mysql, SiteType::Mysql),
        (flags.wp, SiteType::Wp),
        (flags.wpsubdir, SiteType::WpSubdir),
        (flags.wpsubdomain, SiteType::WpSubdomain),
    ];
    for (_, site_type) in types.into_iter().filter(|(set, _)| *set) {
        intent = intent.with_type(site_type);
    }

    let caches = [
        (flags.w3tc, CacheType::W3tc),
        (flags.wpfc, CacheType::Wpfc),
        (flags.wpsc, CacheType::Wpsc),
    ];
    for (_, cache) in caches.into_iter().filter(|(set, _)| *set) {
        intent = intent.with_cache(cache);
    }

    if let Some(raw) = flags.proxy.as_deref() {
        intent = intent.with_proxy(ProxyTarget::parse(raw)?);
    }
    if let Some(toggle) = flags.hhvm {
        intent = intent.with_addon(Addon::Hhvm, toggle.enabled());
    }
    if let Some(toggle) = flags.pagespeed {
        intent = intent.with_addon(Addon::PageSpeed, toggle.enabled());
    }
    Ok(intent)
}

/// CMS admin overrides for `create`; unset fields fall back to the host.
pub fn cms_credentials(
    user: Option<String>,
    email: Option<String>,
    prompt_pass: bool,
) -> Result<CmsCredentials, CliError> {
    let password = if prompt_pass {
        Some(prompt_new_password("CMS admin password")?)
    } else {
        None
    };
    Ok(CmsCredentials {
        user,
        email,
        password,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Toggle;

    fn flags() -> SiteFlags {
        SiteFlags {
            html: false,
            php: false,
            mysql: false,
            wp: false,
            wpsubdir: false,
            wpsubdomain: false,
            proxy: None,
            w3tc: false,
            wpfc: false,
            wpsc: false,
            hhvm: None,
            pagespeed: None,
        }
    }

    #[test]
    fn no_flags_is_an_empty_intent() {
        let intent = apply_flags(SiteIntent::for_all(), &flags()).unwrap();
        assert!(intent.is_empty());
    }

    #[test]
    fn every_type_flag_is_kept_for_validation() {
        let mut f = flags();
        f.wpsubdir = true;
        f.wpsubdomain = true;
        f.w3tc = true;
        let intent = apply_flags(SiteIntent::for_all(), &f).unwrap();
        assert_eq!(intent.site_types.len(), 2);
        assert!(intent.caches.contains(&CacheType::W3tc));
    }

    #[test]
    fn toggles_are_explicit() {
        let mut f = flags();
        f.hhvm = Some(Toggle::Off);
        f.pagespeed = Some(Toggle::On);
        let intent = apply_flags(SiteIntent::for_all(), &f).unwrap();
        assert_eq!(intent.hhvm, Some(false));
        assert_eq!(intent.pagespeed, Some(true));
    }

    #[test]
    fn proxy_defaults_to_port_80() {
        let mut f = flags();
        f.proxy = Some("10.0.0.5".into());
        let intent = apply_flags(SiteIntent::for_all(), &f).unwrap();
        let proxy = intent.proxy.unwrap();
        assert_eq!((proxy.host.as_str(), proxy.port), ("10.0.0.5", 80));
    }

    #[test]
    fn bad_proxy_port_is_a_usage_error() {
        let mut f = flags();
        f.proxy = Some("10.0.0.5:http".into());
        let err = apply_flags(SiteIntent::for_all(), &f).unwrap_err();
        assert!(matches!(err, CliError::InvalidCombination { .. }));
    }
}
