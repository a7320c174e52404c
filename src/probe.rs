use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;

/// Container duration in whole seconds, as reported by ffprobe.
pub fn duration_secs(ffprobe: &Path, input: &Path) -> Result<u64> {
    let out = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .with_context(|| format!("run {}", ffprobe.display()))?;

    if !out.status.success() {
        return Err(anyhow!(
            "ffprobe exited with {} for {}: {}",
            out.status,
            input.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }

    parse_duration(&String::from_utf8_lossy(&out.stdout))
}

fn parse_duration(s: &str) -> Result<u64> {
    let secs: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("unexpected ffprobe duration {:?}", s.trim()))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(anyhow!("unexpected ffprobe duration {secs}"));
    }
    Ok(secs as u64)
}

/// Average bitrate over the whole file; 0 when the duration is unknown.
pub fn avg_bitrate_kbps(size_bytes: u64, duration_secs: u64) -> u64 {
    if duration_secs == 0 {
        return 0;
    }
    size_bytes.saturating_mul(8) / duration_secs / 1000
}
