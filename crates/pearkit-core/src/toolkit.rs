//! Toolkit-wide settings shared by every component folder.

use std::path::{Path, PathBuf};

/// Where the toolkit's bundled templates live.
///
/// Built once at startup and handed to each [`ComponentFolder`] it opens.
///
/// [`ComponentFolder`]: crate::ComponentFolder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolkit {
    data_dir: PathBuf,
}

impl Toolkit {
    /// Create a toolkit reading templates from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root of the template directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Template directory for one component kind.
    #[must_use]
    pub fn templates_for(&self, template_dir: &str) -> PathBuf {
        self.data_dir.join(template_dir)
    }
}
