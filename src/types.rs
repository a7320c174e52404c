use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// x264 speed preset. Slower presets trade encode time for smaller output.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding parameters for one batch run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Output width in pixels; height follows the aspect ratio.
    pub width: u32,
    pub max_fps: u32,
    /// x264 constant rate factor (0..=51, lower is better quality).
    pub crf: u8,
    pub preset: Preset,
    pub audio_bitrate_kbps: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            width: 720,
            max_fps: 30,
            crf: 27,
            preset: Preset::Fast,
            audio_bitrate_kbps: 96,
        }
    }
}

impl Profile {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.width % 2 != 0 {
            bail!("width must be a positive even number (got {})", self.width);
        }
        if self.max_fps == 0 {
            bail!("max fps must be positive");
        }
        if self.crf > 51 {
            bail!("crf must be within 0..=51 (got {})", self.crf);
        }
        if self.audio_bitrate_kbps == 0 {
            bail!("audio bitrate must be positive");
        }
        Ok(())
    }

    /// Stable textual form of every parameter that affects the output.
    fn canonical(&self) -> String {
        format!(
            "width={};max_fps={};crf={};preset={};audio_kbps={}",
            self.width, self.max_fps, self.crf, self.preset, self.audio_bitrate_kbps
        )
    }

    pub fn key(&self) -> ProfileKey {
        let hash = blake3::hash(self.canonical().as_bytes());
        ProfileKey(hash.to_hex()[..16].to_string())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={} fps<={} crf={} preset={} audio={}k",
            self.width, self.max_fps, self.crf, self.preset, self.audio_bitrate_kbps
        )
    }
}

/// Opaque identifier of a [`Profile`]; equal profiles share a key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProfileKey(String);

impl ProfileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cheap "unchanged since last time" proxy: size plus mtime in whole seconds.
///
/// Stored on disk as `[size, mtime_secs]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u64, i64)", into = "(u64, i64)")]
pub struct FileSignature {
    pub size: u64,
    pub mtime_secs: i64,
}

impl From<(u64, i64)> for FileSignature {
    fn from((size, mtime_secs): (u64, i64)) -> Self {
        Self { size, mtime_secs }
    }
}

impl From<FileSignature> for (u64, i64) {
    fn from(sig: FileSignature) -> Self {
        (sig.size, sig.mtime_secs)
    }
}

/// A candidate input as observed at scan time.
#[derive(Clone, Debug)]
pub struct VideoFile {
    pub path: PathBuf,
    pub signature: FileSignature,

    /// full-precision mtime, restored after in-place replacement
    pub modified: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_profiles_share_a_key() {
        assert_eq!(Profile::default().key(), Profile::default().key());
        assert_eq!(Profile::default().key().as_str().len(), 16);
    }

    #[test]
    fn any_parameter_change_changes_the_key() {
        let base = Profile::default();
        let variants = [
            Profile { width: 1280, ..base.clone() },
            Profile { max_fps: 24, ..base.clone() },
            Profile { crf: 28, ..base.clone() },
            Profile { preset: Preset::Slow, ..base.clone() },
            Profile { audio_bitrate_kbps: 128, ..base.clone() },
        ];
        for v in &variants {
            assert_ne!(v.key(), base.key(), "{v}");
        }
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert!(Profile::default().validate().is_ok());
        assert!(Profile { width: 721, ..Profile::default() }.validate().is_err());
        assert!(Profile { width: 0, ..Profile::default() }.validate().is_err());
        assert!(Profile { crf: 52, ..Profile::default() }.validate().is_err());
        assert!(Profile { max_fps: 0, ..Profile::default() }.validate().is_err());
    }

    #[test]
    fn signature_serializes_as_pair() {
        let sig = FileSignature { size: 10_485_760, mtime_secs: 1_700_000_000 };
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "[10485760,1700000000]");
        let back: FileSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }

    #[test]
    fn preset_parses_lowercase() {
        let p: Preset = serde_yaml::from_str("veryslow").unwrap();
        assert_eq!(p, Preset::Veryslow);
        assert_eq!(Preset::Fast.to_string(), "fast");
    }
}
