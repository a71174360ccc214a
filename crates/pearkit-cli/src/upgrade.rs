//! `pearkit upgrade`: move a component folder to a newer version.

use crate::config::ensure_data_dir;
use anyhow::{bail, Context, Result};
use pearkit_core::{ComponentFolder, ComponentKind, FolderState, Toolkit, PHP_LIBRARY};
use std::path::Path;

/// Options for `pearkit upgrade`.
#[derive(Debug, Clone, Default)]
pub struct UpgradeOptions {
    /// Version to stop at (defaults to the latest).
    pub to: Option<u32>,

    /// Version to start from instead of the recorded one.
    pub from: Option<u32>,
}

/// What an upgrade run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    AlreadyUpToDate(u32),
    Upgraded { from: u32, to: u32 },
}

/// Upgrade the component in `folder`.
pub fn upgrade_component(
    folder: &Path,
    toolkit: &Toolkit,
    options: &UpgradeOptions,
) -> Result<UpgradeOutcome> {
    let mut component = ComponentFolder::open(folder, &PHP_LIBRARY, toolkit);
    let root = component.root().display().to_string();
    let latest = PHP_LIBRARY.latest_version();

    match component.state() {
        FolderState::Empty => {
            bail!("No component in `{root}`; run `pearkit init` first")
        }
        FolderState::Unknown | FolderState::Incompatible => bail!(
            "`{root}` is not a {} component this version can upgrade ({})",
            PHP_LIBRARY.type_name(),
            component.state_as_text()
        ),
        FolderState::UpToDate if options.from.is_none() && options.to.is_none() => {
            println!("`{root}` is already up to date (version {latest})");
            return Ok(UpgradeOutcome::AlreadyUpToDate(latest));
        }
        FolderState::UpToDate | FolderState::NeedsUpgrade => {}
    }

    let target = options.to.unwrap_or(latest);
    if target > latest {
        bail!("Version {target} does not exist; the latest is {latest}");
    }

    ensure_data_dir(toolkit.data_dir())?;

    let from = options.from.unwrap_or(component.component_version());
    component
        .upgrade_component(target, options.from)
        .with_context(|| format!("Failed to upgrade `{root}`"))?;

    println!("Upgraded `{root}` from version {from} to version {target}");
    Ok(UpgradeOutcome::Upgraded { from, to: target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUNDLED_DATA_DIR;
    use std::fs;
    use tempfile::TempDir;

    fn component_at(version: u32) -> (TempDir, Toolkit) {
        let tmp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(BUNDLED_DATA_DIR);
        ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit)
            .upgrade_component(version, None)
            .unwrap();
        (tmp, toolkit)
    }

    #[test]
    fn test_upgrade_to_latest() {
        let (tmp, toolkit) = component_at(2);
        let outcome =
            upgrade_component(tmp.path(), &toolkit, &UpgradeOptions::default()).unwrap();
        assert_eq!(outcome, UpgradeOutcome::Upgraded { from: 2, to: 4 });
    }

    #[test]
    fn test_upgrade_to_specific_version() {
        let (tmp, toolkit) = component_at(1);
        let options = UpgradeOptions {
            to: Some(3),
            from: None,
        };
        let outcome = upgrade_component(tmp.path(), &toolkit, &options).unwrap();
        assert_eq!(outcome, UpgradeOutcome::Upgraded { from: 1, to: 3 });

        let folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
        assert_eq!(folder.component_version(), 3);
    }

    #[test]
    fn test_up_to_date_folder_is_left_alone() {
        let (tmp, toolkit) = component_at(4);
        let before = fs::read(tmp.path().join("build.properties")).unwrap();

        let outcome =
            upgrade_component(tmp.path(), &toolkit, &UpgradeOptions::default()).unwrap();
        assert_eq!(outcome, UpgradeOutcome::AlreadyUpToDate(4));
        assert_eq!(fs::read(tmp.path().join("build.properties")).unwrap(), before);
    }

    #[test]
    fn test_from_override_reruns_steps() {
        let (tmp, toolkit) = component_at(4);
        let options = UpgradeOptions {
            to: None,
            from: Some(3),
        };
        let outcome = upgrade_component(tmp.path(), &toolkit, &options).unwrap();
        assert_eq!(outcome, UpgradeOutcome::Upgraded { from: 3, to: 4 });
    }

    #[test]
    fn test_rejects_empty_and_future_versions() {
        let tmp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(BUNDLED_DATA_DIR);
        assert!(upgrade_component(tmp.path(), &toolkit, &UpgradeOptions::default()).is_err());

        let (tmp, toolkit) = component_at(1);
        let options = UpgradeOptions {
            to: Some(9),
            from: None,
        };
        assert!(upgrade_component(tmp.path(), &toolkit, &options).is_err());
    }
}
