use crate::error::LoadError;
use crate::types::{FileSignature, ProfileKey};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// ledger file path: <dir>/vidshrink-ledger-<profile key>.json
pub fn ledger_path(dir: &Path, key: &ProfileKey) -> PathBuf {
    dir.join(format!("vidshrink-ledger-{key}.json"))
}

/// Files already handled under one profile.
///
/// key = absolute path string (lossy), value = signature observed when the
/// file was last compressed or found not worth compressing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, FileSignature>,
}

fn entry_key(file: &Path) -> String {
    file.to_string_lossy().to_string()
}

impl Ledger {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> std::result::Result<Self, LoadError> {
        let s = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let entries = serde_json::from_str(&s).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Missing or unreadable state means nothing has been handled yet.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(ledger) => {
                debug!(path = %path.display(), entries = ledger.len(), "loaded ledger");
                ledger
            }
            Err(e @ LoadError::Missing(_)) => {
                debug!("{e}; starting empty");
                Self::empty(path)
            }
            Err(e) => {
                warn!("{e}; starting empty");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, file: &Path) -> Option<FileSignature> {
        self.entries.get(&entry_key(file)).copied()
    }

    /// Exact match on both size and mtime; anything else forces reprocessing.
    pub fn is_handled(&self, file: &Path, current: &FileSignature) -> bool {
        self.get(file).is_some_and(|stored| stored == *current)
    }

    /// Upsert the entry for `file` and write the whole ledger out.
    pub fn record(&mut self, file: &Path, signature: FileSignature) -> Result<()> {
        self.entries.insert(entry_key(file), signature);
        self.persist()
    }

    /// Rewrite the ledger file in full via a sibling temp file + rename.
    pub fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let s = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(s.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}
