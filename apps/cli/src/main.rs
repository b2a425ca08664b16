//! extpack CLI: build a browser extension's static assets into an output tree.
//!
//! Minifies HTML and CSS locally, compiles JavaScript through a remote
//! compiler service, and copies icons, locales and the manifest verbatim.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
