use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use assetkit_daemon::{
    Config,
    cli::{Cli, Commands, ConfigCommands},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Log to stderr; the add-on captures the child's stderr into its own log.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Fold command-line overrides into the loaded config.
///
/// Precedence, highest first: flag, environment variable, config file,
/// built-in default. The env lookups live in the config accessors, so
/// resolving them here leaves plain fields for the rest of the daemon.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let port = cli.port.unwrap_or_else(|| config.daemon.port());
    config.daemon.port = port;

    let server = cli.server.clone().unwrap_or_else(|| config.remote.server());
    config.remote.server = server;

    if let Some(host) = &cli.host {
        config.daemon.host.clone_from(host);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, &cli);

    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                println!("{}", config.show()?);
            }
            ConfigCommands::Path => {
                let path = Config::config_path()?;
                println!("{}", path.display());
            }
        },

        None => {
            assetkit_daemon::api::serve(&config).await?;
        }
    }

    Ok(())
}
