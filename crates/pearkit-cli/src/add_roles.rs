//! `pearkit add-roles`: create the source directories for PEAR file roles.

use anyhow::{Context, Result};
use pearkit_core::{FileTask, Role, TaskQueue};
use std::path::{Path, PathBuf};

/// Create `src/<dir>` for each role, returning the role directories.
pub fn add_roles(folder: &Path, roles: &[Role]) -> Result<Vec<PathBuf>> {
    let mut queue = TaskQueue::new(folder);
    queue.enqueue(FileTask::make_directory("src")?);

    let mut created = Vec::new();
    for role in roles {
        let mut path = PathBuf::from("src");
        for part in role.source_dir().split('/') {
            path.push(part);
            queue.enqueue(FileTask::make_directory(path.clone())?);
        }
        created.push(path);
    }

    queue
        .execute_all()
        .with_context(|| format!("Failed to add roles to `{}`", folder.display()))?;

    for (role, path) in roles.iter().zip(&created) {
        println!("Added role `{role}` ({})", path.display());
    }
    Ok(created)
}
