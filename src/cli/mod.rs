//! CLI parsing for the daemon binary.
//!
//! Flags mirror the config file keys; anything given on the command line
//! wins over environment and file values. With no subcommand the daemon
//! starts serving.

use clap::{Parser, Subcommand};

use crate::build_info;

/// `AssetKit` daemon - local bridge between the add-on and the marketplace.
#[derive(Parser)]
#[command(name = "assetkitd")]
#[command(about = "Background helper daemon for the AssetKit add-on")]
#[command(version = build_info::version_string())]
#[command(propagate_version = true)]
pub struct Cli {
    /// Host to bind to (overrides config).
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Marketplace base URL (overrides config).
    #[arg(short, long)]
    pub server: Option<String>,

    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show the configuration file path.
    Path,
}
