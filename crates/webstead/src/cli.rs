//! Clap derive structures for the `webstead` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// webstead -- create, upgrade and remove sites on an nginx host
#[derive(Debug, Parser)]
#[command(
    name = "webstead",
    version,
    about = "Create, upgrade and remove sites on an nginx web host",
    long_about = "Provision static, PHP, MySQL, WordPress (single and multisite) and\n\
        reverse-proxy sites on the local machine.\n\n\
        Every change runs as one transaction: if a step fails, everything done\n\
        before it is undone and the site is left as it was.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file to use
    #[arg(long, env = "WEBSTEAD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "WEBSTEAD_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// `--hhvm` / `--hhvm=off` style switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new site
    #[command(alias = "new")]
    Create(CreateArgs),

    /// Change a site's type, cache or addons
    #[command(alias = "up")]
    Update(UpdateArgs),

    /// Delete a site's database, files, or both
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Start serving a site
    Enable(DomainArg),

    /// Stop serving a site, keeping all its data
    Disable(DomainArg),

    /// Show a site's configuration and paths
    Info(DomainArg),

    /// Print a site's nginx configuration
    Show(DomainArg),

    /// List sites
    #[command(alias = "ls")]
    List(ListArgs),

    /// Edit a site's nginx configuration in $EDITOR, then reload
    Edit(EditArgs),

    /// Print the tail of a site's access and error logs
    Log(LogArgs),

    /// Open a shell in a site's webroot
    Cd(DomainArg),

    /// Manage webstead configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Site shape flags ─────────────────────────────────────────────────

/// Type, cache, addon and proxy flags shared by `create` and `update`.
#[derive(Debug, Args)]
pub struct SiteFlags {
    /// Static html site
    #[arg(long, help_heading = "Site type")]
    pub html: bool,

    /// PHP site
    #[arg(long, help_heading = "Site type")]
    pub php: bool,

    /// PHP site with a MySQL database
    #[arg(long, help_heading = "Site type")]
    pub mysql: bool,

    /// WordPress site
    #[arg(long, help_heading = "Site type")]
    pub wp: bool,

    /// WordPress multisite with subdirectories
    #[arg(long, help_heading = "Site type")]
    pub wpsubdir: bool,

    /// WordPress multisite with subdomains
    #[arg(long, help_heading = "Site type")]
    pub wpsubdomain: bool,

    /// Reverse proxy to HOST[:PORT]
    #[arg(long, value_name = "HOST[:PORT]", help_heading = "Site type")]
    pub proxy: Option<String>,

    /// W3 Total Cache
    #[arg(long, help_heading = "Cache")]
    pub w3tc: bool,

    /// nginx fastcgi cache
    #[arg(long, help_heading = "Cache")]
    pub wpfc: bool,

    /// WP Super Cache
    #[arg(long, help_heading = "Cache")]
    pub wpsc: bool,

    /// Run PHP on HHVM
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on",
        help_heading = "Addons"
    )]
    pub hhvm: Option<Toggle>,

    /// Enable the PageSpeed module
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on",
        help_heading = "Addons"
    )]
    pub pagespeed: Option<Toggle>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DomainArg {
    /// Site domain (scheme and www. are stripped)
    pub domain: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Site domain (scheme and www. are stripped)
    pub domain: String,

    #[command(flatten)]
    pub site: SiteFlags,

    /// CMS admin user name
    #[arg(long, help_heading = "CMS admin")]
    pub user: Option<String>,

    /// CMS admin email
    #[arg(long, help_heading = "CMS admin")]
    pub email: Option<String>,

    /// Prompt for the CMS admin password instead of generating one
    #[arg(long, help_heading = "CMS admin")]
    pub pass: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Site domain (omit with --all)
    #[arg(required_unless_present = "all")]
    pub domain: Option<String>,

    /// Apply the update to every site
    #[arg(long)]
    pub all: bool,

    /// Reset the CMS admin password instead of changing the site
    #[arg(long, conflicts_with = "all")]
    pub password: bool,

    #[command(flatten)]
    pub site: SiteFlags,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Site domain (scheme and www. are stripped)
    pub domain: String,

    /// Delete only the database
    #[arg(long)]
    pub db: bool,

    /// Delete only the webroot
    #[arg(long)]
    pub files: bool,

    /// Delete database and webroot (default)
    #[arg(long, conflicts_with_all = ["db", "files"])]
    pub all: bool,

    /// Do not ask before deleting
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only sites being served
    #[arg(long, conflicts_with = "disabled")]
    pub enabled: bool,

    /// Only sites not being served
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Site domain (scheme and www. are stripped)
    pub domain: String,

    /// Edit the PageSpeed snippet instead of the server block
    #[arg(long)]
    pub pagespeed: bool,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Site domain (scheme and www. are stripped)
    pub domain: String,

    /// Number of trailing lines to print from each log
    #[arg(long, short = 'n', default_value_t = 20)]
    pub lines: usize,

    /// Keep printing lines as they are appended
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Only the access log
    #[arg(long, conflicts_with = "error")]
    pub access: bool,

    /// Only the error log
    #[arg(long)]
    pub error: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path in use
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
