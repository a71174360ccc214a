//! Component kinds and their upgrade tables.

use crate::folder::{ComponentFolder, FolderError};
use std::fmt;

/// One edge of a kind's upgrade chain: moves a folder from `from` to
/// `from + 1`.
///
/// `apply` only changes folder content. Recording the new version in
/// `build.properties` is done by the caller once `apply` has succeeded.
/// Steps must tolerate being run again from the same starting version.
#[derive(Clone, Copy)]
pub struct UpgradeStep {
    /// Version the step starts from.
    pub from: u32,

    /// One-line description for logs and `--help` style listings.
    pub summary: &'static str,

    /// Perform the step's folder mutations.
    pub apply: fn(&ComponentFolder<'_>) -> Result<(), FolderError>,
}

impl UpgradeStep {
    /// Version the step leaves the folder at.
    #[must_use]
    pub fn to(&self) -> u32 {
        self.from + 1
    }
}

impl fmt::Debug for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeStep")
            .field("from", &self.from)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// A kind of component the toolkit knows how to lay out and upgrade.
pub trait ComponentKind: fmt::Debug + Send + Sync {
    /// Value that `component.type` must hold for folders of this kind.
    fn type_name(&self) -> &str;

    /// Newest folder schema version.
    fn latest_version(&self) -> u32;

    /// Directory, relative to the toolkit data directory, holding this
    /// kind's templates.
    fn template_dir(&self) -> &str;

    /// Upgrade steps, one per version from 0 up to `latest_version() - 1`.
    fn upgrade_steps(&self) -> &[UpgradeStep];

    /// The step that upgrades from `version`, if there is one.
    fn step_from(&self, version: u32) -> Option<&UpgradeStep> {
        self.upgrade_steps().iter().find(|step| step.from == version)
    }
}
