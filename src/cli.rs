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

    /// Seed for grid order, font sizes and jitter (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a looping video for one word
    Generate {
        /// Word to draw on the image
        #[arg(short, long)]
        word: String,

        /// Source image
        #[arg(short, long)]
        image: PathBuf,

        /// Pronunciation audio clip
        #[arg(short, long)]
        audio: PathBuf,

        /// Output video file (defaults to {word}.mp4 next to the image)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base directory for intermediate files
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Remove intermediate files once the video is written
        #[arg(long)]
        no_keep: bool,
    },

    /// Generate videos for every {word}.png + {word}.mp3 pair in a directory
    Batch {
        /// Input directory containing word images and clips
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for generated videos
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show the shuffled anchor cells for an image size
    Plan {
        /// Image width in pixels
        #[arg(long)]
        width: u32,

        /// Image height in pixels
        #[arg(long)]
        height: u32,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Measure a pronunciation clip and the frame count it implies
    Probe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print a random word from the word list
    Roll,

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "wordloop.toml")]
        output: PathBuf,
    },
}
