//! Wordloop - Looping Vocabulary Videos
//!
//! Command line entry point: generates looping word videos from an image and
//! a pronunciation clip using resvg for text and ffmpeg for audio and muxing.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use wordloop::cli::{Args, Commands};
use wordloop::config::Config;
use wordloop::grid::GridPlan;
use wordloop::random::RandomSource;
use wordloop::word;
use wordloop::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting Wordloop");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load wordloop.toml from current directory first
            if std::path::Path::new("wordloop.toml").exists() {
                info!("Found wordloop.toml in current directory, loading...");
                Config::from_file("wordloop.toml")?
            } else {
                Config::default()
            }
        }
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    // Execute command
    match args.command {
        Commands::Generate { word, image, audio, output, work_dir, no_keep } => {
            if let Some(work_dir) = work_dir {
                config.storage.work_dir = work_dir;
            }
            if no_keep {
                config.storage.keep_intermediates = false;
            }

            let workflow = Workflow::new(config)?;
            let report = workflow.generate(&word, &image, &audio, output.as_deref()).await?;

            println!("Video: {}", report.output.display());
            println!("Adjusted clip: {:.3}s", report.adjusted_duration);
            println!("Frames: {} at {:.4} fps", report.frame_count, report.framerate);
            if workflow.config().storage.keep_intermediates {
                println!("Intermediates: {}", report.workspace.display());
            }
        }
        Commands::Batch { input_dir, output_dir } => {
            let workflow = Workflow::new(config)?;
            let summary = workflow.generate_batch(&input_dir, output_dir.as_deref()).await?;

            println!("Generated {} videos", summary.succeeded.len());
            for path in &summary.succeeded {
                println!("  {}", path.display());
            }
            if !summary.failed.is_empty() {
                println!("Failed {}:", summary.failed.len());
                for (word, error) in &summary.failed {
                    println!("  {:<20} {}", word, error);
                }
            }
        }
        Commands::Plan { width, height, json } => {
            let mut rng = RandomSource::new(config.seed);
            let plan = GridPlan::new(width, height, &mut rng)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }

            println!("Cell size: {}x{}", plan.cell_width, plan.cell_height);
            println!("{:<6} {:<10} {:<12}", "Frame", "Cell", "Anchor");
            println!("{}", "-".repeat(30));
            for (index, cell) in plan.cursor().enumerate() {
                let (x, y) = plan.anchor(cell);
                println!("{:<6} {:<10} {:<12}", index, format!("({}, {})", cell.x, cell.y), format!("({}, {})", x, y));
            }
        }
        Commands::Probe { input } => {
            let workflow = Workflow::new(config)?;
            let report = workflow.probe(&input).await?;

            println!("Duration: {:.3}s", report.duration);
            println!(
                "Adjusted ({}x): {:.3}s",
                workflow.config().video.tempo,
                report.adjusted_duration
            );
            match report.frame_count {
                Some(count) => println!("Frames: {}", count),
                None => println!("Frames: clip too long or too short for a video"),
            }
        }
        Commands::Roll => {
            let mut rng = RandomSource::new(config.seed);
            let picked = word::roll_from_list(config.storage.word_list.as_deref(), &mut rng)?;
            println!("{}", picked);
        }
        Commands::InitConfig { output } => {
            config.save_to_file(&output)?;
            println!("Configuration written to {}", output.display());
        }
    }

    info!("Wordloop completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".wordloop").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "wordloop.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // No ANSI colors in file
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("wordloop.log").display());

    Ok(())
}
