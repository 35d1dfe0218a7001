//! Pile CLI - tile server and offline helpers.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::inspect::{FormatArg, KeyArgs};
use commands::serve::ServeArgs;

#[derive(Parser)]
#[command(name = "pile")]
#[command(version, about = "Map tile cache and render orchestration server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP tile server
    Serve {
        /// Configuration file (default: ~/.pile/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen port, overrides [server] port
        #[arg(long)]
        port: Option<u16>,

        /// Render workers, overrides [render] workers (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Write a default configuration file
    Init {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the projected envelope of a tile
    Envelope { z: u8, x: u32, y: u32 },

    /// Print the cache key of a tile
    Key {
        /// Layer id, or cube id when --dataset is given
        owner: String,

        /// Dataset id within the cube
        #[arg(long)]
        dataset: Option<String>,

        /// Style text the tile is rendered with
        #[arg(long)]
        style: String,

        /// Layer style version (default: 2.0.1)
        #[arg(long)]
        style_version: Option<String>,

        /// Cube output quality
        #[arg(long)]
        quality: Option<String>,

        #[arg(long, value_enum, default_value = "png")]
        format: FormatArg,

        z: u8,
        x: u32,
        y: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            config,
            port,
            workers,
        } => commands::serve::run(ServeArgs {
            config,
            port,
            workers,
        }),
        Commands::Init { config, force } => commands::init::run(config, force),
        Commands::Envelope { z, x, y } => commands::inspect::envelope(z, x, y),
        Commands::Key {
            owner,
            dataset,
            style,
            style_version,
            quality,
            format,
            z,
            x,
            y,
        } => commands::inspect::key(KeyArgs {
            owner,
            dataset,
            style,
            style_version,
            quality,
            z,
            x,
            y,
            format,
        }),
    };

    if let Err(e) = result {
        e.exit();
    }
}
