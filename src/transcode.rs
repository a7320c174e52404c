use crate::error::TranscodeError;
use crate::types::Profile;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Produces a re-encoded copy of `input` at `output`, blocking until done.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path, profile: &Profile)
        -> Result<(), TranscodeError>;
}

impl<T: Transcoder + ?Sized> Transcoder for &T {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &Profile,
    ) -> Result<(), TranscodeError> {
        (**self).transcode(input, output, profile)
    }
}

/// Locate an executable by name or path.
pub fn resolve_tool(name: &Path) -> Result<PathBuf> {
    which::which(name).with_context(|| format!("{} not found", name.display()))
}

/// H.264/AAC re-encode through the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(input: &Path, output: &Path, profile: &Profile) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
        args.push(input.into());
        for a in [
            "-vf".to_string(),
            format!("scale={}:-2,fps={}", profile.width, profile.max_fps),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            profile.preset.to_string(),
            "-crf".to_string(),
            profile.crf.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", profile.audio_bitrate_kbps),
        ] {
            args.push(a.into());
        }
        args.push(output.into());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &Profile,
    ) -> Result<(), TranscodeError> {
        let args = Self::args(input, output, profile);
        debug!(program = %self.program.display(), ?args, "spawning transcoder");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Exit { status })
        }
    }
}
