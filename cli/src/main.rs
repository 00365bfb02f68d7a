//! cconnector CLI - credential provisioning and daemon control

use clap::Parser;

use cconnector_cli::cli::Cli;
use cconnector_cli::output::OutputContext;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ctx = OutputContext::new(cli.no_color, cli.quiet);
    if let Err(e) = cli.run().await {
        ctx.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
