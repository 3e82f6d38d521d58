use std::{
    path::PathBuf,
    process,
    sync::Arc,
    thread,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesplit::{
    BatchDriver, BatchReport, CancellationToken, FfmpegBackend, FfmpegLogLevel, FileBackend,
    Ledger, OperationType, ProgressCallback, ProgressInfo, SplitConfig, VideoOutcome,
    config::{
        DEFAULT_FRAME_DIR, DEFAULT_INPUT_DIR, DEFAULT_SEGMENT_DIR, DEFAULT_SEGMENT_SECONDS,
        MAX_SEGMENT_SECONDS, MIN_SEGMENT_SECONDS,
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};

/// A second Ctrl-C in watch mode is a requested stop, not a failure.
const INTERRUPT_EXIT_STATUS: i32 = 0;

const CLI_AFTER_HELP: &str = "Examples:\n  framesplit\n  framesplit -i incoming -o segments -f frames -d 8\n  framesplit --watch --interval 30 --progress\n  framesplit --json\n  framesplit completions zsh > _framesplit";

#[derive(Debug, Parser)]
#[command(
    name = "framesplit",
    version,
    about = "Cut videos into fixed-length segments and sample one frame per second",
    after_help = CLI_AFTER_HELP,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(flatten)]
    run: RunOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while segments and frames are written.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, default_value = "error")]
    ffmpeg_log_level: FfmpegLogLevel,
}

#[derive(Debug, Parser, Clone)]
struct RunOptions {
    /// Directory containing the source videos.
    #[arg(short = 'i', long, default_value = DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Directory that receives the segments.
    #[arg(short = 'o', long, default_value = DEFAULT_SEGMENT_DIR)]
    output_dir: PathBuf,

    /// Directory that receives the sampled frames.
    #[arg(short = 'f', long, default_value = DEFAULT_FRAME_DIR)]
    frame_dir: PathBuf,

    /// Segment length in seconds (5 to 10).
    #[arg(
        short = 'd',
        long,
        default_value_t = DEFAULT_SEGMENT_SECONDS,
        value_parser = clap::value_parser!(u64).range(MIN_SEGMENT_SECONDS as i64..=MAX_SEGMENT_SECONDS as i64)
    )]
    duration: u64,

    /// Keep running and rescan the input directory every interval.
    #[arg(short = 'w', long)]
    watch: bool,

    /// Seconds between scans in watch mode.
    #[arg(
        short = 't',
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,

    /// Print each pass summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

fn build_config(options: &RunOptions) -> SplitConfig {
    SplitConfig::new()
        .with_input_dir(&options.input_dir)
        .with_segment_dir(&options.output_dir)
        .with_frame_dir(&options.frame_dir)
        .with_segment_duration(options.duration)
        .with_watch_interval(Duration::from_secs(options.interval))
}

/// One bar, reused for every segment and frame batch.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {prefix:>10.bold} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let prefix = match info.operation {
            OperationType::Segmenting => "segmenting",
            OperationType::Sampling => "sampling",
            _ => "working",
        };
        self.bar.set_prefix(prefix);
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        let name = info
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
    }
}

fn report_json(report: &BatchReport) -> Value {
    let videos: Vec<Value> = report
        .videos
        .iter()
        .map(|video| match &video.outcome {
            VideoOutcome::Processed {
                segments,
                frames,
                sampling_failures,
            } => json!({
                "path": video.path.display().to_string(),
                "status": "processed",
                "segments": segments
                    .iter()
                    .map(|segment| segment.path.display().to_string())
                    .collect::<Vec<_>>(),
                "frames": frames,
                "sampling_failures": sampling_failures,
            }),
            VideoOutcome::Skipped => json!({
                "path": video.path.display().to_string(),
                "status": "skipped",
            }),
            VideoOutcome::Failed { kind, reason } => json!({
                "path": video.path.display().to_string(),
                "status": "failed",
                "kind": kind.to_string(),
                "reason": reason,
            }),
        })
        .collect();

    json!({
        "processed": report.processed(),
        "skipped": report.skipped(),
        "failed": report.failed(),
        "frames": report.frames(),
        "videos": videos,
    })
}

fn print_report(report: &BatchReport) {
    if report.is_empty() {
        println!("{} {}", "info:".cyan().bold(), "no videos found");
        return;
    }

    for video in &report.videos {
        let path = video.path.display();
        match &video.outcome {
            VideoOutcome::Processed {
                segments,
                frames,
                sampling_failures,
            } => {
                println!(
                    "{} {path}: {} segment(s), {frames} frame(s)",
                    "processed".green().bold(),
                    segments.len(),
                );
                if *sampling_failures > 0 {
                    println!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("{sampling_failures} segment(s) of {path} could not be sampled")
                            .yellow()
                    );
                }
            }
            VideoOutcome::Skipped => {
                println!("{} {path}", "skipped".dimmed());
            }
            VideoOutcome::Failed { kind, reason } => {
                println!("{} {path} ({kind}): {}", "failed".red().bold(), reason.red());
            }
        }
    }

    println!(
        "{} {}",
        "summary:".bold(),
        format!(
            "{} processed, {} skipped, {} failed",
            report.processed(),
            report.skipped(),
            report.failed()
        )
    );
}

/// Cancel `token` on the first Ctrl-C. A second one skips the rest of the
/// current pass and exits cleanly; the unfinished video is not marked, so the
/// next run redoes it.
fn install_interrupt_handler(token: CancellationToken) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                log::warn!("Cannot listen for Ctrl-C: {error}");
                return;
            }
        };

        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                "stopping after the current pass (Ctrl-C again to stop now)".yellow()
            );
            token.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Watch mode stopped.");
                process::exit(INTERRUPT_EXIT_STATUS);
            }
        });
    });
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "framesplit", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.global.verbose);
    framesplit::set_ffmpeg_log_level(cli.global.ffmpeg_log_level);

    let config = build_config(&cli.run);
    config.validate()?;

    let backend = FfmpegBackend::new(config.encode_options().clone());
    let mut ledger = Ledger::new(FileBackend::new(config.ledger_path()));
    let interval = config.watch_interval();

    let mut driver = BatchDriver::new(config, backend);
    let progress = if cli.global.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        driver = driver.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let json_output = cli.run.json;
    let show = |report: &BatchReport| {
        let print = || {
            if json_output {
                println!("{}", report_json(report));
            } else {
                print_report(report);
            }
        };
        match &progress {
            Some(progress) => progress.bar.suspend(print),
            None => print(),
        }
    };

    if !cli.run.watch {
        let report = driver.run_once(&mut ledger)?;
        if let Some(progress) = &progress {
            progress.bar.finish_and_clear();
        }
        show(&report);
        return Ok(());
    }

    let token = CancellationToken::new();
    install_interrupt_handler(token.clone());

    println!(
        "{} {} every {}s (Ctrl-C to stop)",
        "watching".cyan().bold(),
        driver.config().input_dir().display(),
        interval.as_secs()
    );

    framesplit::watch(&driver, &mut ledger, interval, &token, |cycle, result| {
        match result {
            Ok(report) => show(report),
            Err(error) => eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("pass {cycle} failed: {error}").yellow()
            ),
        }
    })?;

    println!("{}", "Watch mode stopped.".cyan());
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        process::exit(1);
    }
}
