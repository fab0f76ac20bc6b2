//! Binary entry point: parse, merge config, validate, then run one session.
use std::ffi::OsString;
use std::path::Path;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::debug;

use crate::app::run_local;
use crate::args::{DEFAULT_CONFIG_FILES, TesterArgs};
use crate::config::{RunConfig, apply_config, load_config};
use crate::error::AppResult;
use crate::logger::init_logging;
use crate::shutdown::shutdown_channel;
use crate::shutdown_handlers::setup_signal_shutdown_handler;
use crate::system::{banner, selection_line};

/// Runs the CLI with the process arguments.
///
/// # Errors
///
/// Returns configuration errors raised before the session starts, and
/// failures to build the runtime, start the session, or write the export.
pub fn run() -> AppResult<()> {
    let Some((mut args, matches)) = parse_args()? else {
        return Ok(());
    };

    init_logging(args.verbose);

    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, &matches, &config)?;
    }
    let config = RunConfig::from_args(&args)?;

    if !config.no_banner {
        banner::print_cli_banner();
    }
    eprintln!("{}", selection_line(&config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_async(&config))
}

fn parse_args() -> AppResult<Option<(TesterArgs, ArgMatches)>> {
    let mut cmd = TesterArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = TesterArgs::from_arg_matches(&matches)?;
    Ok(Some((args, matches)))
}

/// No arguments and no default config file: print help instead of failing on
/// the missing URL.
fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    treat_as_empty && !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn run_async(config: &RunConfig) -> AppResult<()> {
    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let result = run_local(config, &shutdown_tx).await;

    drop(shutdown_tx.send(()));
    if let Err(err) = signal_handle.await {
        debug!("Signal handler ended abnormally: {}", err);
    }
    let outcome = result?;
    debug!("Session ended {}", outcome.terminal);
    Ok(())
}
