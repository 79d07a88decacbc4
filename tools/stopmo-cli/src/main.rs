//! Stopmo CLI: command-line front end for stop-motion sequences.
//!
//! Usage:
//!   stopmo export <IMAGES>... -o <FILE>   Encode a sequence to GIF/WebM/MP4
//!   stopmo preview <IMAGES>...            Play the sequence at 2 fps
//!   stopmo info <IMAGES>...               Show decoded frames and the carousel
//!   stopmo check                          Check encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stopmo_common::config::AppConfig;

mod commands;

use commands::export::MoveSpec;

#[derive(Parser)]
#[command(
    name = "stopmo",
    about = "Assemble still images into onion-skinned stop-motion clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a sequence of images as an animated clip
    Export {
        /// Frame images, in animation order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output file path (defaults to the configured exports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: gif|webm|mp4|raw (defaults to the output extension)
        #[arg(long)]
        format: Option<String>,

        /// Move a frame before export, as FROM:TO[:after]
        #[arg(long = "move", value_name = "FROM:TO[:after]")]
        moves: Vec<MoveSpec>,

        /// Surface width
        #[arg(long)]
        width: Option<u32>,

        /// Surface height
        #[arg(long)]
        height: Option<u32>,

        /// Write the project summary here instead of next to the clip
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Play the sequence back and print each visited frame
    Preview {
        /// Frame images, in animation order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Frame index to start from
        #[arg(long, default_value = "0")]
        from: usize,
    },

    /// Show decoded frame information
    Info {
        /// Frame images, in animation order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Frame to centre the carousel on
        #[arg(long, default_value = "0")]
        at: usize,

        /// Print the session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check encoder availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    stopmo_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Export {
            images,
            output,
            format,
            moves,
            width,
            height,
            summary,
        } => {
            commands::export::run(
                &config, images, output, format, moves, width, height, summary,
            )
            .await
        }
        Commands::Preview { images, from } => commands::preview::run(&config, images, from).await,
        Commands::Info { images, at, json } => commands::info::run(&config, images, at, json).await,
        Commands::Check => commands::check::run(&config),
    }
}
