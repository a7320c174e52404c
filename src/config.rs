use crate::types::{Preset, Profile};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Name looked up inside the target folder when no `--config` is given.
pub const FOLDER_CONFIG: &str = "vidshrink.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    pub profile: Option<ProfileConfig>,
    pub extensions: Option<Vec<String>>,
    pub ledger_dir: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

/// Partial profile; unset fields keep the lower layer's value.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub width: Option<u32>,
    pub max_fps: Option<u32>,
    pub crf: Option<u8>,
    pub preset: Option<Preset>,
    pub audio_bitrate_kbps: Option<u32>,
}

impl ProfileConfig {
    pub fn apply(&self, base: Profile) -> Profile {
        Profile {
            width: self.width.unwrap_or(base.width),
            max_fps: self.max_fps.unwrap_or(base.max_fps),
            crf: self.crf.unwrap_or(base.crf),
            preset: self.preset.unwrap_or(base.preset),
            audio_bitrate_kbps: self.audio_bitrate_kbps.unwrap_or(base.audio_bitrate_kbps),
        }
    }
}

pub fn load_yaml(path: &Path) -> Result<YamlConfig> {
    let file = File::open(path).with_context(|| format!("open config {}", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("parse config {}", path.display()))
}

/// Explicit path must exist; otherwise fall back to `<folder>/vidshrink.yaml` if present.
pub fn discover(explicit: Option<&Path>, folder: &Path) -> Result<Option<YamlConfig>> {
    if let Some(p) = explicit {
        return load_yaml(p).map(Some);
    }
    let p = folder.join(FOLDER_CONFIG);
    if !p.exists() {
        return Ok(None);
    }
    load_yaml(&p).map(Some)
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub folder: PathBuf,
    pub profile: Profile,
    pub extensions: Vec<String>,
    pub ledger_dir: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub profile: ProfileConfig,
    pub ledger_dir: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

/// defaults <- yaml <- cli
pub fn resolve(folder: PathBuf, yaml: Option<YamlConfig>, cli: Overrides) -> Result<Settings> {
    let yaml = yaml.unwrap_or_default();

    let mut profile = Profile::default();
    if let Some(p) = &yaml.profile {
        profile = p.apply(profile);
    }
    profile = cli.profile.apply(profile);
    profile.validate()?;

    let extensions = yaml
        .extensions
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| vec!["mp4".to_string()]);

    Ok(Settings {
        folder,
        profile,
        extensions,
        ledger_dir: cli
            .ledger_dir
            .or(yaml.ledger_dir)
            .unwrap_or_else(std::env::temp_dir),
        ffmpeg: cli.ffmpeg.or(yaml.ffmpeg).unwrap_or_else(|| "ffmpeg".into()),
        ffprobe: cli.ffprobe.or(yaml.ffprobe).unwrap_or_else(|| "ffprobe".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_any_config() {
        let s = resolve("/v".into(), None, Overrides::default()).unwrap();
        assert_eq!(s.profile, Profile::default());
        assert_eq!(s.extensions, ["mp4"]);
        assert_eq!(s.ledger_dir, std::env::temp_dir());
        assert_eq!(s.ffmpeg, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn cli_beats_yaml_beats_defaults() {
        let yaml: YamlConfig = serde_yaml::from_str(
            "profile:\n  crf: 30\n  width: 1280\n  preset: slow\nextensions: [mp4, mov]\nledger_dir: /state\n",
        )
        .unwrap();
        let cli = Overrides {
            profile: ProfileConfig {
                crf: Some(24),
                ..Default::default()
            },
            ..Default::default()
        };

        let s = resolve("/v".into(), Some(yaml), cli).unwrap();
        assert_eq!(s.profile.crf, 24);
        assert_eq!(s.profile.width, 1280);
        assert_eq!(s.profile.preset, Preset::Slow);
        assert_eq!(s.profile.max_fps, 30);
        assert_eq!(s.extensions, ["mp4", "mov"]);
        assert_eq!(s.ledger_dir, PathBuf::from("/state"));
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let cli = Overrides {
            profile: ProfileConfig {
                width: Some(715),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(resolve("/v".into(), None, cli).is_err());
    }

    #[test]
    fn folder_config_is_optional_but_must_parse() {
        let dir = TempDir::new().unwrap();
        assert!(discover(None, dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(FOLDER_CONFIG), "profile:\n  crf: 20\n").unwrap();
        let cfg = discover(None, dir.path()).unwrap().unwrap();
        assert_eq!(cfg.profile.unwrap().crf, Some(20));

        std::fs::write(dir.path().join(FOLDER_CONFIG), "profile: [oops\n").unwrap();
        assert!(discover(None, dir.path()).is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(discover(Some(&dir.path().join("missing.yaml")), dir.path()).is_err());
    }
}
