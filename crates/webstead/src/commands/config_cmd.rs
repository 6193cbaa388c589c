//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    loaded: Result<Config, CliError>,
) -> Result<(), CliError> {
    let path = config::config_path(global);
    match args.command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            webstead_config::save_config(&Config::default(), &path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            if !global.quiet {
                eprintln!("✓ Wrote {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = loaded?;
            let rendered = webstead_config::render(&cfg.masked())?;
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
