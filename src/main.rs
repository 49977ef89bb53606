//! muxkit - Lossless media tool orchestration
//!
//! Command-line front end that converts, splits, merges and inspects video
//! files by driving ffmpeg, ffprobe, mkvmerge and mkvpropedit.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use muxkit::cli::{Args, Commands};
use muxkit::config::{Config, LoggingConfig};
use muxkit::console::ConsoleListener;
use muxkit::media::properties::MkvPropertyInfo;
use muxkit::media::TrackRemovalSpec;
use muxkit::progress::Reporter;
use muxkit::workflow::Workflow;

const LOG_FILE_NAME: &str = "muxkit.log";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration before logging, which it configures
    let config = Config::load(args.config.as_deref())?;

    let guard = setup_logging(args.verbose, &config.logging)?;
    info!("Starting muxkit");

    if let Commands::InitConfig { output, force } = &args.command {
        if output.exists() && !*force {
            anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
        }
        Config::default().save_to_file(output)?;
        println!("Wrote default configuration to {}", output.display());
        return Ok(());
    }

    let workflow = Workflow::new(&config);
    let reporter = Reporter::new(Arc::new(ConsoleListener::new(args.verbose)));

    let succeeded = run(&workflow, args.command, &reporter).await;

    workflow.shutdown().await;

    if !succeeded {
        // Flush the file log; exit skips destructors
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Dispatch one subcommand; the reporter has already shown the outcome.
async fn run(workflow: &Workflow, command: Commands, reporter: &Reporter) -> bool {
    match command {
        Commands::Convert { input, format } => {
            match workflow.convert(&input, format, reporter).await {
                Ok(output) => {
                    println!("Output: {}", output.display());
                    true
                }
                Err(_) => false,
            }
        }
        Commands::Split { input, segment_time } => {
            match workflow.split(&input, &segment_time, reporter).await {
                Ok(pattern) => {
                    println!("Segments: {}", pattern.display());
                    true
                }
                Err(_) => false,
            }
        }
        Commands::Merge { output, clips } => workflow.merge(&clips, &output, reporter).await.is_ok(),
        Commands::ExtractAudio { input, format } => {
            match workflow.extract_audio(&input, format, reporter).await {
                Ok(tracks) => {
                    for track in tracks {
                        println!("  stream {} -> {}", track.stream_index, track.output.display());
                    }
                    true
                }
                Err(_) => false,
            }
        }
        Commands::ExtractSubtitles { input } => {
            match workflow.extract_subtitles(&input, reporter).await {
                Ok(tracks) => {
                    for track in tracks {
                        println!("  stream {} -> {}", track.stream_index, track.output.display());
                    }
                    true
                }
                Err(_) => false,
            }
        }
        Commands::Props { input, json } => match workflow.read_properties(&input, reporter).await {
            Ok(info) => {
                if json {
                    match serde_json::to_string_pretty(&info) {
                        Ok(text) => println!("{}", text),
                        Err(e) => warn!("Failed to serialize properties: {}", e),
                    }
                } else {
                    print_properties(&info);
                }
                true
            }
            Err(_) => false,
        },
        Commands::EditProps { input, title, tracks } => {
            workflow.edit_properties(&input, &title, &tracks, reporter).await.is_ok()
        }
        Commands::RemoveTracks { input, output, video, audio, subtitles } => {
            let removal = TrackRemovalSpec::new(input, output, video, audio, subtitles);
            workflow.remove_tracks(&removal, reporter).await.is_ok()
        }
        Commands::Check => {
            let checks = workflow.check_tools(reporter).await;
            println!("{:<14} {:<10} {:<40} {}", "Tool", "Status", "Invocable", "Detail");
            println!("{}", "-".repeat(90));
            for check in &checks {
                let status = if check.available { "OK" } else { "Missing" };
                println!("{:<14} {:<10} {:<40} {}", check.tool.executable_name(), status, check.program, check.detail);
            }
            checks.iter().all(|c| c.available)
        }
        Commands::InitConfig { .. } => {
            debug!("init-config is handled before the workflow starts");
            true
        }
    }
}

fn print_properties(info: &MkvPropertyInfo) {
    println!("\nTitle: {}", info.title);
    println!("{:<5} {:<9} {:<11} {:<24} {:<6} {:<8} {:<8} {}", "Id", "Selector", "Type", "Codec", "Lang", "Default", "Enabled", "Name");
    println!("{}", "-".repeat(96));
    for track in &info.tracks {
        println!(
            "{:<5} {:<9} {:<11} {:<24} {:<6} {:<8} {:<8} {}",
            track.id,
            track.selector,
            track.track_type.display_name(),
            track.codec,
            track.language,
            track.default_track,
            track.enabled_track,
            track.name
        );
    }
}

fn setup_logging(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer; stdout belongs to command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    // Set up file appender with daily rotation
    let (file_layer, guard) = if logging.file {
        std::fs::create_dir_all(&logging.directory)?;
        let file_appender = rolling::daily(&logging.directory, LOG_FILE_NAME);
        let (non_blocking_file, guard) = non_blocking(file_appender);

        let layer = fmt::layer()
            .with_writer(non_blocking_file)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false); // No ANSI colors in file
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match &guard {
        Some(_) => info!(
            "Logging initialized - console: {}, file: {}",
            log_level,
            logging.directory.join(LOG_FILE_NAME).display()
        ),
        None => info!("Logging initialized - console: {}", log_level),
    }
    Ok(guard)
}
