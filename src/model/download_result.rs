//! Terminal outcomes of a document download
use std::fmt;
use std::path::{Path, PathBuf};

/// Broad cause of a failed download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection failure, timeout or non-2xx status
    Network,
    /// Creating, writing or renaming the local file failed
    Filesystem,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one document reference
///
/// An existing file is never overwritten: a name collision always yields
/// `Skipped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// A new file was written
    Saved {
        url: String,
        path: PathBuf,
        bytes: u64,
    },

    /// A file with the resolved name was already present
    Skipped { url: String, path: PathBuf },

    /// Nothing was written
    Failed {
        url: String,
        kind: FailureKind,
        cause: String,
    },
}

impl DownloadResult {
    pub fn url(&self) -> &str {
        match self {
            Self::Saved { url, .. } | Self::Skipped { url, .. } | Self::Failed { url, .. } => url,
        }
    }

    /// Local path of the file, when one exists
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved { path, .. } | Self::Skipped { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "saved",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { path, bytes, .. } => {
                write!(f, "saved to {} ({} bytes)", path.display(), bytes)
            }
            Self::Skipped { path, .. } => {
                write!(f, "skipped (already exists at {})", path.display())
            }
            Self::Failed { kind, cause, .. } => write!(f, "failed ({}): {}", kind, cause),
        }
    }
}
