mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webstead_core::{Controller, JsonFileStore, LocalHost};

use crate::cli::{Cli, Command};
use crate::error::CliError;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // A broken config file is reported by `run`; stderr logging still starts.
    let loaded = config::load(&cli.global);
    let log_file = loaded.as_ref().ok().map(|cfg| cfg.paths.log_file.clone());
    let guard = init_tracing(cli.global.verbose, log_file.as_deref());

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli, loaded) {
        let code = err.exit_code();
        tracing::debug!(error = %err, code, "command failed");
        eprintln!("{:?}", miette::Report::new(err));
        // Flush the log file; `exit` skips destructors.
        drop(guard);
        std::process::exit(code);
    }
}

/// Stderr gets the verbosity-selected level; the log file records
/// everything at debug and above.
fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file = log_file.and_then(open_log_file).map(|(writer, guard)| {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new("webstead=debug,webstead_core=debug"));
        (layer, guard)
    });
    let (file_layer, guard) = file.unzip();

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn open_log_file(
    path: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path.parent()?;
    let name = path.file_name()?;
    // Unprivileged runs usually can't write /var/log; skip the file then.
    std::fs::create_dir_all(dir).ok()?;
    let probe = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path);
    if probe.is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(dir, name);
    Some(tracing_appender::non_blocking(appender))
}

fn run(cli: Cli, loaded: Result<config::Config, CliError>) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without a usable host configuration
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, loaded),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "webstead", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = loaded?;
            let host = LocalHost::new(cfg.to_host_config()?);
            let store = JsonFileStore::new(cfg.paths.state_file.clone());
            let controller = Controller::new(host, store);
            let ctx = commands::Context::new(&cli.global, &cfg);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &controller, &ctx)
        }
    }
}
