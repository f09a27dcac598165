//! visionlabel CLI
//!
//! Classifies picked image files, or a live frame feed replayed from a
//! directory or generated synthetically, and prints what the result screen
//! would show.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use visionlabel::acquisition::{collect_images, interval_for_fps};
use visionlabel::backend::{backend_name, default_device, DefaultBackend};
use visionlabel::inference::{run_benchmark, BatchPredictionStats, BenchmarkConfig};
use visionlabel::utils::logging::{init_logging, LogConfig};
use visionlabel::utils::{format_millis, format_number};
use visionlabel::{
    AppConfig, BurnClassifier, DirectoryFrameSource, Labels, ModelVariant, ScreenController,
    ScreenVariant, SessionState, SyntheticFrameSource,
};

/// Still-photo and live-frame image classification
#[derive(Parser, Debug)]
#[command(name = "visionlabel")]
#[command(version)]
#[command(about = "Classify images and live frames with a Burn CNN", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (defaults to ./visionlabel.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct ModelArgs {
    /// Trained weights (random initialisation when omitted)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Label file, one label per line
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Model variant: inception-v3, mobile-net, mobile-net050-160
    #[arg(long)]
    variant: Option<String>,

    /// Screen layout: basic, live-camera, optimized
    #[arg(long)]
    screen: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an image file or every image in a directory
    Classify {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Classify a live frame feed
    Live {
        /// Directory of frames to replay as the feed
        #[arg(long, conflicts_with = "synthetic")]
        frames: Option<PathBuf>,

        /// Generate random frames instead of replaying a directory
        #[arg(long, default_value = "false")]
        synthetic: bool,

        /// Frame rate of the feed
        #[arg(long)]
        fps: Option<f64>,

        /// Stop after this many frames
        #[arg(long)]
        frames_limit: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Replay the frame directory forever
        #[arg(long = "loop", default_value = "false")]
        looping: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Benchmark classification latency
    Benchmark {
        /// Number of timed iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,

        /// Number of warmup iterations
        #[arg(long, default_value = "10")]
        warmup: usize,

        /// Side of the random input image before resizing
        #[arg(long, default_value = "480")]
        image_size: u32,

        /// Output JSON file for benchmark results
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Write the effective configuration to a file
    Config {
        /// Destination path
        #[arg(short, long, default_value = "visionlabel.json")]
        write: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::from_level_name(&app_config.log_level)
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Classify { input, model } => {
            let config = apply_model_args(app_config, &model)?;
            cmd_classify(&input, &config)?;
        }

        Commands::Live {
            frames,
            synthetic,
            fps,
            frames_limit,
            duration,
            looping,
            model,
        } => {
            let mut config = apply_model_args(app_config, &model)?;
            if let Some(fps) = fps {
                config.live_fps = fps;
            }
            let options = LiveOptions {
                frames,
                synthetic,
                frames_limit,
                duration: duration.map(Duration::from_secs),
                looping,
            };
            cmd_live(&config, &options)?;
        }

        Commands::Benchmark {
            iterations,
            warmup,
            image_size,
            output,
            model,
        } => {
            let config = apply_model_args(app_config, &model)?;
            let bench = BenchmarkConfig {
                warmup_iterations: warmup,
                iterations,
                image_size,
                verbose: cli.verbose,
                output_path: output,
            };
            cmd_benchmark(&config, bench)?;
        }

        Commands::Config { write } => {
            app_config.save(&write)?;
            println!("{} Wrote configuration to {}", "✓".green().bold(), write.display());
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════╗
 ║   visionlabel                                        ║
 ║   Still and live image classification with Burn      ║
 ╚══════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

/// Fold command-line model flags into the loaded configuration
fn apply_model_args(mut config: AppConfig, args: &ModelArgs) -> Result<AppConfig> {
    if let Some(model) = &args.model {
        config.weights = Some(model.clone());
    }
    if let Some(labels) = &args.labels {
        config.labels = Some(labels.clone());
    }
    if let Some(variant) = &args.variant {
        config.model.variant = ModelVariant::parse(variant)?;
    }
    if let Some(screen) = &args.screen {
        config.variant = ScreenVariant::parse(screen)?;
    }
    config.validate()?;
    Ok(config)
}

/// Load the label table and the network once
fn load_classifier(config: &AppConfig) -> Result<BurnClassifier<DefaultBackend>> {
    let mut model_config = config.model.clone();

    let labels = match &config.labels {
        Some(path) => {
            let labels = Labels::load(path)?;
            if config.weights.is_none() {
                model_config.num_classes = labels.len();
            }
            labels
        }
        None => Labels::generic(model_config.num_classes),
    };

    println!("{}", "Model Configuration:".cyan().bold());
    println!("  Variant:  {}", model_config.variant);
    println!("  Input:    {0}x{0}", model_config.input_size());
    println!("  Classes:  {}", model_config.num_classes);
    println!("  Backend:  {}", backend_name());
    match &config.weights {
        Some(path) => println!("  Weights:  {}", path.display()),
        None => println!("  Weights:  {}", "random (no checkpoint specified)".yellow()),
    }
    println!();

    let device = default_device();
    let classifier = BurnClassifier::<DefaultBackend>::load(
        &model_config,
        config.weights.as_deref(),
        labels,
        &device,
    )?;
    Ok(classifier)
}

fn cmd_classify(input: &Path, config: &AppConfig) -> Result<()> {
    let files = if input.is_dir() {
        collect_images(input, false)?
    } else {
        vec![input.to_path_buf()]
    };
    if files.is_empty() {
        bail!("No images found in {}", input.display());
    }
    info!("Classifying {} image(s)", files.len());

    let classifier = load_classifier(config)?;
    let mut screen = ScreenController::from_config(classifier, config)?;

    println!("{}", "Running inference...".cyan());
    println!();

    let mut results = Vec::new();
    for path in &files {
        if let Err(err) = screen.pick_image(path) {
            println!("{} {}", "Error:".red(), err);
            continue;
        }

        let failures = screen.failures();
        let deadline = Instant::now() + Duration::from_secs(60);
        while screen.view().is_analyzing()
            && screen.failures() == failures
            && Instant::now() < deadline
        {
            screen.wait_for_update(Duration::from_millis(200))?;
        }

        if let Some(err) = screen.take_last_error() {
            println!("{} {}: {}", "Error:".red(), path.display(), err);
            continue;
        }

        print_screen(&screen, &path.display().to_string());
        if let Some(result) = screen.view().result() {
            results.push(result.clone());
        }
    }

    if results.len() > 1 {
        println!("{}", BatchPredictionStats::from_results(&results, 0.5));
    }

    Ok(())
}

struct LiveOptions {
    frames: Option<PathBuf>,
    synthetic: bool,
    frames_limit: Option<u64>,
    duration: Option<Duration>,
    looping: bool,
}

fn cmd_live(config: &AppConfig, options: &LiveOptions) -> Result<()> {
    let interval = interval_for_fps(config.live_fps);
    let classifier = load_classifier(config)?;
    let mut screen = ScreenController::from_config(classifier, config)?;

    match (&options.frames, options.synthetic) {
        (Some(dir), _) => {
            let source = DirectoryFrameSource::new(dir, interval, options.looping)?;
            println!("Replaying {} frames from {}", source.len(), dir.display());
            screen.start_live(source)?;
        }
        (None, true) => {
            let mut source = SyntheticFrameSource::new(640, 480, interval);
            if let Some(limit) = options.frames_limit {
                source = source.with_limit(limit);
            }
            screen.start_live(source)?;
        }
        (None, false) => bail!("Pass --frames <dir> or --synthetic"),
    }

    println!("{}", "Live feed running...".green().bold());
    let started = Instant::now();
    loop {
        if screen.wait_for_update(Duration::from_millis(100))? > 0 {
            if let Some(source) = screen.view().source() {
                print_live_line(&screen, &source.to_string());
            }
        }

        if screen.live_finished() {
            info!("Frame source exhausted");
            break;
        }
        if let Some(limit) = options.frames_limit {
            if screen.live_stats().delivered >= limit {
                break;
            }
        }
        if let Some(duration) = options.duration {
            if started.elapsed() >= duration {
                break;
            }
        }
    }

    let stats = if screen.session_state() == SessionState::Running {
        screen.stop_live()?
    } else {
        screen.live_stats()
    };

    // The last accepted frame may still be in flight
    if screen.wait_for_update(Duration::from_secs(2))? > 0 {
        if let Some(source) = screen.view().source() {
            print_live_line(&screen, &source.to_string());
        }
    }

    println!();
    println!("{}", "Live Feed Summary:".cyan().bold());
    println!("  Frames delivered:  {}", format_number(stats.delivered));
    println!("  Frames classified: {}", format_number(stats.accepted));
    println!("  Frames dropped:    {}", format_number(stats.dropped));
    if stats.source_errors > 0 {
        warn!("{} frames could not be read", stats.source_errors);
    }
    println!("  Elapsed:           {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}

fn cmd_benchmark(config: &AppConfig, bench: BenchmarkConfig) -> Result<()> {
    let classifier = load_classifier(config)?;
    run_benchmark(&classifier, bench, backend_name())?;
    Ok(())
}

fn print_screen(screen: &ScreenController, title: &str) {
    let view = screen.view();
    println!("{}", title.bold());
    println!("  {}", view.headline().green().bold());
    if let Some(fps) = view.fps_text() {
        println!("  {}", fps.yellow());
    }
    for row in view.rows() {
        println!("    {}", row);
    }
    if let Some(result) = view.result() {
        println!("  Inference time: {}", format_millis(result.inference_time_ms).dimmed());
    }
    println!();
}

fn print_live_line(screen: &ScreenController, source: &str) {
    let view = screen.view();
    let fps = view.fps_text().unwrap_or_default();
    println!(
        "  [{}] {} {}",
        source.dimmed(),
        view.headline().green(),
        fps.yellow()
    );
}
