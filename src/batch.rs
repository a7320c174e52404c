use crate::fmt::{human_duration, human_size};
use crate::ledger::Ledger;
use crate::transcode::Transcoder;
use crate::types::{Profile, VideoFile};
use crate::{probe, scan};
use anyhow::{Context, Result};
use filetime::FileTime;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// ledger already has this exact signature
    Skipped,
    Improved { saved: u64 },
    /// output was not smaller; original kept, still recorded
    NoGain { output_size: u64 },
    /// not recorded, retried next run
    Failed { reason: String },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub improved: usize,
    pub no_gain: usize,
    pub failed: usize,
    pub skipped: usize,
    pub saved_bytes: u64,
}

impl RunSummary {
    fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Improved { saved } => {
                self.improved += 1;
                self.saved_bytes += saved;
            }
            Outcome::NoGain { .. } => self.no_gain += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn print(&self) {
        println!("All videos processed.");
        println!(
            "improved={}, no_gain={}, failed={}, skipped={}",
            self.improved, self.no_gain, self.failed, self.skipped
        );
        println!("Total saved: {}", human_size(self.saved_bytes));
    }
}

#[derive(Debug, Clone)]
pub struct PlanItem {
    pub file: VideoFile,
    pub handled: bool,
}

fn started_at() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    now.format(&format).unwrap_or_default()
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| p.display().to_string())
}

/// Sequential skip-or-compress loop over one folder under one profile.
pub struct Batch<T> {
    profile: Profile,
    ledger: Ledger,
    transcoder: T,
    ffprobe: Option<PathBuf>,
}

impl<T: Transcoder> Batch<T> {
    pub fn new(profile: Profile, ledger: Ledger, transcoder: T) -> Self {
        Self {
            profile,
            ledger,
            transcoder,
            ffprobe: None,
        }
    }

    /// Enables duration/bitrate in the per-file status line.
    pub fn with_ffprobe(mut self, ffprobe: Option<PathBuf>) -> Self {
        self.ffprobe = ffprobe;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// Read-only: which candidates would be skipped. Never touches the ledger file.
    pub fn plan(&self, files: &[VideoFile]) -> Vec<PlanItem> {
        files
            .iter()
            .map(|f| PlanItem {
                file: f.clone(),
                handled: self.ledger.is_handled(&f.path, &f.signature),
            })
            .collect()
    }

    pub fn run(&mut self, files: &[VideoFile]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let total = files.len();

        println!("Starting processing at {}...", started_at());

        for (i, scanned) in files.iter().enumerate() {
            let i = i + 1;

            // signature may have moved since the folder was scanned
            let file = match scan::stat_video(&scanned.path) {
                Ok(f) => f,
                Err(e) => {
                    warn!("{:#}", e);
                    println!("[{i}/{total}] - {} - FAILED! (unreadable)", file_name(&scanned.path));
                    summary.add(&Outcome::Failed {
                        reason: format!("{:#}", e),
                    });
                    continue;
                }
            };

            if self.ledger.is_handled(&file.path, &file.signature) {
                debug!(path = %file.path.display(), "already handled");
                println!("[{i}/{total}] - {} - already handled, skipped", file_name(&file.path));
                summary.add(&Outcome::Skipped);
                continue;
            }

            println!();
            println!("{}", "=".repeat(60));
            println!("[{i}/{total}] - {}", self.describe(&file));

            let outcome = self.process(&file)?;
            match &outcome {
                Outcome::Improved { saved } => {
                    println!("Compression OK.");
                    println!("Saved {}", human_size(*saved));
                }
                Outcome::NoGain { output_size } => {
                    println!(
                        "Compressed file not smaller ({} >= {}); discarded.",
                        output_size, file.signature.size
                    );
                }
                Outcome::Failed { reason } => {
                    println!("FAILED! {reason}");
                }
                Outcome::Skipped => {}
            }
            summary.add(&outcome);
        }

        info!(
            improved = summary.improved,
            no_gain = summary.no_gain,
            failed = summary.failed,
            skipped = summary.skipped,
            saved_bytes = summary.saved_bytes,
            "run finished"
        );
        Ok(summary)
    }

    fn describe(&self, file: &VideoFile) -> String {
        let name = file_name(&file.path);
        let size = human_size(file.signature.size);

        let duration = self.ffprobe.as_deref().and_then(|ffprobe| {
            probe::duration_secs(ffprobe, &file.path)
                .map_err(|e| warn!("{:#}", e))
                .ok()
        });

        match duration {
            Some(d) => format!(
                "{name} - duration: {} - current bitrate: {} kbps - current size: {size}",
                human_duration(d),
                probe::avg_bitrate_kbps(file.signature.size, d)
            ),
            None => format!("{name} - duration: unknown - current size: {size}"),
        }
    }

    /// Transcode one file and record the outcome unless it failed.
    ///
    /// The ledger gets the pre-run signature in both recorded cases.
    pub fn process(&mut self, file: &VideoFile) -> Result<Outcome> {
        let temp = scan::temp_output_path(&file.path);

        // a leftover temp must never be mistaken for this attempt's output
        match fs::remove_file(&temp) {
            Ok(()) => debug!(path = %temp.display(), "removed stale temp output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!("could not remove stale {}: {}", temp.display(), e);
                return Ok(Outcome::Failed {
                    reason: format!("stale temp output {} in the way: {e}", temp.display()),
                });
            }
        }

        let outcome = self.attempt(file, &temp);

        if temp.exists() {
            if let Err(e) = fs::remove_file(&temp) {
                warn!("could not remove {}: {}", temp.display(), e);
            }
        }

        let outcome = outcome?;
        if matches!(outcome, Outcome::Improved { .. } | Outcome::NoGain { .. }) {
            self.ledger.record(&file.path, file.signature)?;
        }
        Ok(outcome)
    }

    fn attempt(&self, file: &VideoFile, temp: &Path) -> Result<Outcome> {
        if let Err(e) = self.transcoder.transcode(&file.path, temp, &self.profile) {
            warn!(path = %file.path.display(), "{e}");
            return Ok(Outcome::Failed {
                reason: e.to_string(),
            });
        }

        let output_size = match fs::metadata(temp) {
            Ok(m) if m.is_file() => m.len(),
            _ => {
                return Ok(Outcome::Failed {
                    reason: "transcoder produced no output".to_string(),
                });
            }
        };

        if output_size >= file.signature.size {
            return Ok(Outcome::NoGain { output_size });
        }

        fs::rename(temp, &file.path).with_context(|| {
            format!("replace {} with {}", file.path.display(), temp.display())
        })?;
        let mtime = FileTime::from_system_time(file.modified);
        filetime::set_file_times(&file.path, mtime, mtime)
            .with_context(|| format!("restore mtime of {}", file.path.display()))?;

        let new_size = fs::metadata(&file.path)
            .with_context(|| format!("metadata {}", file.path.display()))?
            .len();
        Ok(Outcome::Improved {
            saved: file.signature.size.saturating_sub(new_size),
        })
    }
}
