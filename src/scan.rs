use crate::types::{FileSignature, VideoFile};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// Stem suffix of in-flight outputs written next to their input.
const TEMP_SUFFIX: &str = "_temp";

/// Leftover output of an earlier run (`clip_temp.mp4`)
fn is_temp_output(p: &Path) -> bool {
    p.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

fn has_extension(p: &Path, extensions: &[String]) -> bool {
    let ext = p
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

/// mtime unix, truncated to whole seconds
fn mtime_unix_secs(modified: SystemTime) -> i64 {
    match modified.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs_f64().ceil() as i64),
    }
}

fn signature_of(meta: &fs::Metadata) -> Result<(FileSignature, SystemTime)> {
    let modified = meta.modified()?;
    let sig = FileSignature {
        size: meta.len(),
        mtime_secs: mtime_unix_secs(modified),
    };
    Ok((sig, modified))
}

pub fn signature(p: &Path) -> Result<FileSignature> {
    let meta = fs::metadata(p).with_context(|| format!("metadata {}", p.display()))?;
    Ok(signature_of(&meta)?.0)
}

pub fn stat_video(p: &Path) -> Result<VideoFile> {
    let meta = fs::metadata(p).with_context(|| format!("metadata {}", p.display()))?;
    let (signature, modified) = signature_of(&meta)?;
    Ok(VideoFile {
        path: p.to_path_buf(),
        signature,
        modified,
    })
}

/// `<dir>/<stem>_temp.<ext>`
pub fn temp_output_path(p: &Path) -> PathBuf {
    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match p.extension() {
        Some(ext) => format!("{stem}{TEMP_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{TEMP_SUFFIX}"),
    };
    p.with_file_name(name)
}

/// Top-level videos in `folder`, oldest mtime first.
pub fn list_videos(folder: &Path, extensions: &[String]) -> Result<Vec<VideoFile>> {
    let mut out = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("read_dir {}", folder.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let p = entry.path();
        if is_temp_output(p) || !has_extension(p, extensions) {
            continue;
        }

        out.push(stat_video(p)?);
    }

    out.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}
