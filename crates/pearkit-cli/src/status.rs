//! `pearkit status`: report what state a component folder is in.

use anyhow::Result;
use pearkit_core::{ComponentFolder, FolderState, Toolkit, PHP_LIBRARY};
use std::path::Path;

/// Print the state of the component in `folder`.
pub fn show_status(folder: &Path, toolkit: &Toolkit) -> Result<()> {
    let component = ComponentFolder::open(folder, &PHP_LIBRARY, toolkit);
    println!("{}", describe(&component));
    Ok(())
}

/// One-line summary of a folder's state.
pub fn describe(component: &ComponentFolder<'_>) -> String {
    let root = component.root().display();
    let kind = component.kind();

    match component.state() {
        FolderState::UpToDate | FolderState::NeedsUpgrade => format!(
            "{root}: {} ({} version {} of {})",
            component.state_as_text(),
            kind.type_name(),
            component.component_version(),
            kind.latest_version()
        ),
        FolderState::Empty | FolderState::Incompatible | FolderState::Unknown => {
            format!("{root}: {}", component.state_as_text())
        }
    }
}
