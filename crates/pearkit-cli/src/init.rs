//! Component initialization for `pearkit init`.

use crate::config::ensure_data_dir;
use anyhow::{bail, Context, Result};
use pearkit_core::{ComponentFolder, ComponentKind, FolderState, Toolkit, PHP_LIBRARY};
use std::path::Path;

/// Lay out a new component in the empty folder `folder`.
///
/// A folder left at version 0 by an interrupted `init` is finished off.
/// Returns the version the folder ends up at.
pub fn init_component(folder: &Path, toolkit: &Toolkit) -> Result<u32> {
    ensure_data_dir(toolkit.data_dir())?;

    let mut component = ComponentFolder::open(folder, &PHP_LIBRARY, toolkit);
    let resumable =
        component.state() == FolderState::NeedsUpgrade && component.component_version() == 0;
    if component.state() != FolderState::Empty && !resumable {
        bail!(
            "Cannot initialize: `{}` already contains a component ({})",
            component.root().display(),
            component.state_as_text()
        );
    }

    let version = component
        .upgrade_to_latest()
        .with_context(|| format!("Failed to initialize `{}`", component.root().display()))?;

    println!(
        "Created {} component in `{}` (version {version})",
        PHP_LIBRARY.type_name(),
        component.root().display()
    );
    Ok(version)
}
