use std::path::PathBuf;
use std::process::ExitStatus;

/// Why a persisted ledger could not be used.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("ledger not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("read ledger {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse ledger {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A transcode attempt that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to launch transcoder: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("transcoder exited with {status}")]
    Exit { status: ExitStatus },
}
