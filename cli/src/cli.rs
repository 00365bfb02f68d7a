//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use cconnector_core::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_TOKEN_BYTES};
use clap::{Parser, Subcommand};

use crate::commands;
use crate::output::OutputContext;

/// Host agent for cconnector: provision credentials and run the daemon
#[derive(Parser)]
#[command(
    name = "cconnector",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Credential record location
    #[arg(long, global = true, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print only errors and requested values
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty credential record, overwriting any existing one
    #[command(name = "config:initiate")]
    ConfigInitiate,

    /// Generate a new host token, keeping the manager token
    #[command(name = "token:generate")]
    TokenGenerate {
        /// Number of random bytes (the token is twice as many hex characters)
        #[arg(long, default_value_t = DEFAULT_TOKEN_BYTES)]
        length: usize,
    },

    /// Set the manager token directly
    #[command(name = "token:manager")]
    TokenManager {
        /// Manager token to store
        token: String,

        /// Replace an existing manager token
        #[arg(long)]
        force: bool,
    },

    /// Release the manager and rotate the host token
    #[command(name = "token:reset")]
    TokenReset,

    /// Show whether a manager has claimed this host
    #[command(name = "token:status")]
    TokenStatus,

    /// Start the HTTP daemon in the foreground
    #[command(name = "daemon:start")]
    DaemonStart,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            config,
            quiet,
            no_color,
            command,
        } = self;
        let ctx = OutputContext::new(no_color, quiet);
        match command {
            Command::ConfigInitiate => commands::config::initiate(&ctx, &config),
            Command::TokenGenerate { length } => commands::token::generate(&ctx, &config, length),
            Command::TokenManager { token, force } => {
                commands::token::manager(&ctx, &config, &token, force)
            }
            Command::TokenReset => commands::token::reset(&ctx, &config),
            Command::TokenStatus => commands::token::status(&ctx, &config),
            Command::DaemonStart => commands::daemon::start(&ctx, config).await,
        }
    }
}
