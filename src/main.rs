//! Reelsmith - Subtitled Video Render Orchestration
//!
//! Entry point for the `reelsmith` command-line tool.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelsmith::cli::{Args, Commands};
use reelsmith::config::Config;
use reelsmith::orchestrator::RenderOrchestrator;
use reelsmith::renderer::RendererFactory;

const DEFAULT_CONFIG_FILE: &str = "reelsmith.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Setup logging to both console and file
    let guard = match setup_logging(args.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {:#}", e);
            None
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error during rendering: {:#}", e);
            if guard.is_none() {
                eprintln!("Error during rendering: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting Reelsmith");

    match args.command {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Render {
            output,
            audio_url,
            composition,
            timeout,
        } => {
            let mut config = load_config(args.config.as_deref())?;
            if let Some(output) = output {
                config.output.path = Some(output);
            }
            if let Some(url) = audio_url {
                config.audio.url = url;
            }
            if let Some(id) = composition {
                config.composition.id = id;
            }
            if timeout.is_some() {
                config.render.timeout_secs = timeout;
            }
            config.validate()?;

            let orchestrator = RenderOrchestrator::from_config(config)?;
            let output = orchestrator.run_render_job().await?;
            println!("{}", output.display());
        }
        Commands::Subtitles { output } => {
            let config = load_config(args.config.as_deref())?;
            let track = config.subtitle_track();
            track.log_warnings();
            track.write_srt(&output).await?;
            println!("Wrote {} cues to {}", track.len(), output.display());
        }
        Commands::Cue { at } => {
            let config = load_config(args.config.as_deref())?;
            let track = config.subtitle_track();
            match track.cue_at(at) {
                Some(cue) => println!("[{:.2}s - {:.2}s] {}", cue.start, cue.end, cue.text),
                None => println!("No cue at {:.2}s", at),
            }
        }
        Commands::Doctor => {
            let config = load_config(args.config.as_deref())?;
            let renderer = RendererFactory::create(config.render.clone());
            let version = renderer
                .check_availability()
                .await
                .context("Renderer check failed")?;
            println!("Renderer: {} {} ({})", config.render.binary, config.render.package, version);
        }
    }

    Ok(())
}

/// Load configuration: explicit path, then ./reelsmith.toml, then defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".reelsmith").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reelsmith.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Diagnostics go to stderr so stdout only carries results
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

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

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("reelsmith.log").display()
    );

    Ok(guard)
}
