//! blockdiff — entry point.
//!
//! ```text
//! blockdiff encode <block_size> [fps]   Stream frames as deltas to stdout
//! blockdiff decode <block_size>         Rebuild frames from stdin
//! blockdiff --config <path>             Load a custom config TOML
//! blockdiff --gen-config                Write default config to stdout
//! ```

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use blockdiff::cli::{Cli, Mode};
use blockdiff::config::{BlockdiffConfig, ConfigOrigin};
use blockdiff::service::{self, Role};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        return match BlockdiffConfig::default_toml() {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render default config: {e}");
                ExitCode::from(service::EXIT_CONFIG)
            }
        };
    }

    let Some(mode) = &cli.mode else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    let (mut config, origin) = BlockdiffConfig::load(&cli.config);
    cli.apply(&mut config);

    // stdout carries frames; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("blockdiff v{}", env!("CARGO_PKG_VERSION"));
    match origin {
        ConfigOrigin::File => info!("loaded config from {}", cli.config.display()),
        ConfigOrigin::Missing => info!("no config at {}, using defaults", cli.config.display()),
        ConfigOrigin::Invalid(e) => {
            warn!("invalid config {}: {e}, using defaults", cli.config.display())
        }
    }

    let (role, result) = match mode {
        Mode::Encode(args) => (Role::Encode, service::run_encode(&config, args.block_size)),
        Mode::Decode(args) => (Role::Decode, service::run_decode(&config, args.block_size)),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(service::exit_code(role, &e))
        }
    }
}
