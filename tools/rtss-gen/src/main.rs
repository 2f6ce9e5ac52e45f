//! rtss-gen - Generate shader variants for a material
//!
//! # Commands
//!
//! - `rtss-gen generate <material.toml>` - Write the vertex/fragment sources
//! - `rtss-gen list` - Print the available feature type names
//!
//! # Usage
//!
//! ```bash
//! # Cg sources to stdout
//! rtss-gen generate terrain.toml
//!
//! # GLSL sources into out/
//! rtss-gen generate terrain.toml --language glsl --output out
//!
//! # Settings from a config file, verbose logging
//! rtss-gen -v generate terrain.toml --config rtss.toml
//! ```

mod generate;
mod material;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// rtss-gen - Generate shader variants for a material
#[derive(Parser)]
#[command(name = "rtss-gen")]
#[command(about = "Generate shader variants for a material description")]
#[command(version)]
struct Cli {
    /// Log every pipeline step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate vertex and fragment programs for a material
    Generate(generate::GenerateArgs),

    /// List the available feature type names
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => generate::execute(args),
        Commands::List => {
            for type_name in nether_rtss::srs::sub_render_state_types() {
                println!("{}", type_name);
            }
            Ok(())
        }
    }
}
