//! Burner CLI: burn subtitles and transcode a directory of videos.
//!
//! Usage:
//!   burner burn [OPTIONS]    Encode every file in the input directory
//!   burner prepare           Create the `in` and `out` directories
//!   burner check             Check that ffmpeg and ffprobe are available

use std::path::PathBuf;

use burner_common::{config_file_path, BurnerConfig};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "burner",
    about = "Two-pass ffmpeg encodes with burned-in subtitles",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging and print every ffmpeg invocation
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/burner/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode all files in the input directory into the output directory
    Burn(commands::burn::BurnArgs),

    /// Create the input and output directories in the current directory
    Prepare,

    /// Check that the external tools are available
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let config = BurnerConfig::load_from(&config_path);

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    burner_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Burn(args) => commands::burn::run(args, config, &config_path, cli.verbose),
        Commands::Prepare => commands::prepare::run(&PathBuf::from(".")),
        Commands::Check { json } => commands::check::run(json),
    }
}
