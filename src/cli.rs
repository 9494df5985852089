use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the configured composition to a video file
    Render {
        /// Output video file (overrides the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Narration audio URL (overrides the configured URL)
        #[arg(long)]
        audio_url: Option<String>,

        /// Composition identifier to render
        #[arg(long)]
        composition: Option<String>,

        /// Abort the render step after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "reelsmith.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Export the configured subtitles as an SRT file
    Subtitles {
        /// Output SRT file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the subtitle cue active at a point in time
    Cue {
        /// Time in seconds
        #[arg(long)]
        at: f64,
    },

    /// Check that the renderer can be launched
    Doctor,
}
