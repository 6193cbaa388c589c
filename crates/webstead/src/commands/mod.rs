//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod logs;
pub mod site;
pub mod util;

use webstead_core::{Controller, JsonFileStore, LocalHost};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Status};

/// The controller the binary runs against.
pub type SiteController = Controller<LocalHost, JsonFileStore>;

/// Per-invocation settings every handler needs.
pub struct Context<'a> {
    pub global: &'a GlobalOpts,
    pub config: &'a Config,
    pub format: OutputFormat,
    pub status: Status,
}

impl<'a> Context<'a> {
    pub fn new(global: &'a GlobalOpts, config: &'a Config) -> Self {
        Self {
            global,
            config,
            format: config::output_format(global, config),
            status: Status {
                color: output::should_color(config::color_mode(global, config)),
                quiet: global.quiet,
            },
        }
    }
}

/// Dispatch a site command to the appropriate handler.
pub fn dispatch(
    cmd: Command,
    controller: &SiteController,
    ctx: &Context<'_>,
) -> Result<(), CliError> {
    match cmd {
        Command::Create(args) => site::create(controller, args, ctx),
        Command::Update(args) => site::update(controller, &args, ctx),
        Command::Delete(args) => site::delete(controller, &args, ctx),
        Command::Enable(args) => site::enable(controller, &args, ctx),
        Command::Disable(args) => site::disable(controller, &args, ctx),
        Command::Info(args) => site::info(controller, &args, ctx),
        Command::Show(args) => site::show(controller, &args, ctx),
        Command::List(args) => site::list(controller, &args, ctx),
        Command::Edit(args) => site::edit(controller, &args, ctx),
        Command::Log(args) => logs::handle(controller, &args, ctx),
        Command::Cd(args) => site::cd(controller, &args, ctx),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
