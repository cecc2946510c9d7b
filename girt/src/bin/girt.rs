//! CLI entry point for girt.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// girt — generate TypeScript GTK4 bindings from GObject-Introspection data.
#[derive(Parser, Debug)]
#[command(name = "girt", version, about)]
struct Cli {
    /// Path to the girt.toml configuration file.
    #[arg(default_value = "girt.toml")]
    config: PathBuf,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("girt=info")),
        )
        .init();

    let cli = Cli::parse();
    girt::run(&cli.config, cli.output.as_deref())?;
    Ok(())
}
