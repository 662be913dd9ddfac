mod cli;
mod commands;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use remote_exec::{Host, LocalHost, RemoteSession};
use shortcut_manager::config::{load_config_or_default, AppConfig};
use shortcut_manager::logging::init_tracing;
use shortcut_manager::steam::SteamLocator;

use crate::cli::{Args, OutputFormat};
use crate::commands::Context;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.verbose, args.log_dir.as_deref())?;

    match (run(&args), args.output) {
        (Ok(()), _) => Ok(ExitCode::SUCCESS),
        (Err(err), OutputFormat::Json) => {
            println!("{}", error_payload(&err));
            Ok(ExitCode::FAILURE)
        }
        (Err(err), OutputFormat::Term) => Err(err),
    }
}

fn error_payload(err: &anyhow::Error) -> serde_json::Value {
    serde_json::json!({ "error": format!("{err:#}") })
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = load_config_or_default(args.config.as_deref())?;
    match config.remote_config(&args.remote_overrides())? {
        Some(remote) => {
            let mut session = RemoteSession::new(remote);
            session
                .connect()
                .with_context(|| format!("failed to connect to {}", session.describe()))?;
            tracing::info!(host = %session.describe(), "connected");
            let result = execute(args, &config, &session);
            session.close();
            result
        }
        None => execute(args, &config, &LocalHost),
    }
}

fn execute(args: &Args, config: &AppConfig, host: &dyn Host) -> anyhow::Result<()> {
    let ctx = Context {
        host,
        locator: SteamLocator::new(host).with_base_dir(config.steam_dir(args.steam_dir.as_deref())),
        config,
        output: args.output,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(&args.command, &ctx, &mut out)?;
    out.flush()?;
    Ok(())
}
