#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod error_fmt;
mod run;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};

use cli::{Cli, Commands, FILE_GUARD};
use packpilot_config::{Config, Logging, load_toml};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = try_main(cli) {
        eprintln!("{}", error_fmt::humanize(&err));
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn try_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = load_config(&cli.config)?;
    init_logging(&cli, &cfg.logging)?;
    cfg.validate().wrap_err("invalid configuration")?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run {
            port,
            sim,
            auto,
            setpoint,
            log_dir,
            run_for,
        } => run::run_monitor(
            &cfg,
            run::RunOpts {
                port,
                sim,
                auto,
                setpoint,
                log_dir,
                run_for,
            },
        ),
        Commands::SelfCheck => run::self_check(),
    }
}

/// A missing config file is not an error: defaults match the bench setup.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}

fn init_logging(cli: &Cli, logging: &Logging) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, fmt};

    // RUST_LOG wins, then the config file, then --log-level.
    let level = std::env::var("RUST_LOG").ok().unwrap_or_else(|| {
        logging
            .level
            .clone()
            .unwrap_or_else(|| cli.log_level.clone())
    });
    let filter = EnvFilter::try_new(&level)
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if cli.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().compact().boxed()
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("open log file {path}"))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(())
}
