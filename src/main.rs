use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vidshrink::batch::Batch;
use vidshrink::config::{self, Overrides, ProfileConfig, Settings};
use vidshrink::ledger::{Ledger, ledger_path};
use vidshrink::scan;
use vidshrink::transcode::{FfmpegTranscoder, resolve_tool};
use vidshrink::types::Preset;

#[derive(Parser, Debug)]
#[command(author, version, about = "Re-encode the videos in a folder, skipping ones already done")]
struct Cli {
    /// YAML config (default: <FOLDER>/vidshrink.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the per-profile ledger lives (default: system temp dir)
    #[arg(long, global = true)]
    ledger_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    #[arg(long, global = true)]
    ffprobe: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which files would be processed, without touching anything
    Plan(FolderArgs),
    /// Compress every file not yet handled under the current profile
    Run(FolderArgs),
}

#[derive(Args, Debug)]
struct FolderArgs {
    folder: PathBuf,

    #[command(flatten)]
    profile: ProfileArgs,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// Output width in pixels (even)
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    max_fps: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    crf: Option<u8>,

    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Audio bitrate in kbps
    #[arg(long)]
    audio_bitrate: Option<u32>,
}

impl From<ProfileArgs> for ProfileConfig {
    fn from(a: ProfileArgs) -> Self {
        ProfileConfig {
            width: a.width,
            max_fps: a.max_fps,
            crf: a.crf,
            preset: a.preset,
            audio_bitrate_kbps: a.audio_bitrate,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("vidshrink=debug")
        } else {
            EnvFilter::new("vidshrink=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn settings(cli_globals: Overrides, config_path: Option<&Path>, args: FolderArgs) -> Result<Settings> {
    let folder = &args.folder;
    if !folder.is_dir() {
        bail!("Path doesn't exist or is not a directory: {}", folder.display());
    }
    let folder = std::fs::canonicalize(folder)
        .with_context(|| format!("canonicalize {}", folder.display()))?;

    let yaml = config::discover(config_path, &folder)?;
    let overrides = Overrides {
        profile: args.profile.into(),
        ..cli_globals
    };
    config::resolve(folder, yaml, overrides)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let globals = Overrides {
        profile: ProfileConfig::default(),
        ledger_dir: cli.ledger_dir,
        ffmpeg: cli.ffmpeg,
        ffprobe: cli.ffprobe,
    };

    let (dry_run, args) = match cli.cmd {
        Commands::Plan(args) => (true, args),
        Commands::Run(args) => (false, args),
    };
    let cfg = settings(globals, cli.config.as_deref(), args)?;

    let key = cfg.profile.key();
    let ledger_file = ledger_path(&cfg.ledger_dir, &key);

    println!("SelectedPath: {}", cfg.folder.display());
    println!("Profile: {} (key {})", cfg.profile, key);
    debug!(ledger = %ledger_file.display(), "ledger location");

    let files = scan::list_videos(&cfg.folder, &cfg.extensions)?;
    if files.is_empty() {
        println!("No {} files found.", cfg.extensions.join("/"));
        return Ok(());
    }
    println!("Found {} video(s).", files.len());

    let ledger = Ledger::load_or_empty(&ledger_file);
    info!(entries = ledger.len(), "ledger loaded");

    if dry_run {
        let batch = Batch::new(cfg.profile.clone(), ledger, FfmpegTranscoder::new(&cfg.ffmpeg));
        let plan = batch.plan(&files);
        let pending = plan.iter().filter(|p| !p.handled).count();
        for item in &plan {
            let mark = if item.handled { "skip" } else { "todo" };
            println!(
                "  [{mark}] {} (size={}, mtime={})",
                item.file.path.display(),
                item.file.signature.size,
                item.file.signature.mtime_secs
            );
        }
        println!("{pending} file(s) to process, {} already handled.", plan.len() - pending);
        return Ok(());
    }

    let ffmpeg = resolve_tool(&cfg.ffmpeg)?;
    let ffprobe = resolve_tool(&cfg.ffprobe)
        .map_err(|e| warn!("{:#}; durations will not be shown", e))
        .ok();

    let mut batch = Batch::new(cfg.profile.clone(), ledger, FfmpegTranscoder::new(ffmpeg))
        .with_ffprobe(ffprobe);
    let summary = batch.run(&files)?;
    summary.print();

    if summary.failed > 0 {
        bail!("{} file(s) failed; they will be retried on the next run", summary.failed);
    }
    Ok(())
}
