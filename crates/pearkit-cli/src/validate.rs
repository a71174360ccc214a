//! Checks on command-line arguments shared by several commands.

use anyhow::{bail, Context, Result};
use pearkit_core::Role;
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Resolve the component folder argument, defaulting to the current
/// directory, and make sure it is a writable directory.
pub fn component_folder(folder: Option<PathBuf>) -> Result<PathBuf> {
    let folder = match folder {
        Some(folder) => folder,
        None => env::current_dir().context("Failed to get current directory")?,
    };

    if !folder.is_dir() {
        bail!("Folder `{}` not found", folder.display());
    }
    ensure_writable(&folder)?;

    Ok(folder)
}

/// Fail unless this process can write to `path`.
///
/// A directory is tested by creating an anonymous temporary file in it, a
/// file by opening it for appending.
pub fn ensure_writable(path: &Path) -> Result<()> {
    let access = if path.is_dir() {
        tempfile::tempfile_in(path).map(drop)
    } else {
        OpenOptions::new().append(true).open(path).map(drop)
    };
    access.with_context(|| format!("Cannot write to `{}`", path.display()))
}

/// Parse a comma-separated list of PEAR file roles.
///
/// Every entry is checked and all bad ones are reported together.
pub fn roles(list: &str) -> Result<Vec<Role>> {
    let mut roles = Vec::new();
    let mut errors = Vec::new();

    for entry in list.split(',') {
        match entry.parse::<Role>() {
            Ok(role) if !roles.contains(&role) => roles.push(role),
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        }
    }

    if !errors.is_empty() {
        bail!("{}", errors.join("\n"));
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_component_folder_accepts_directory() {
        let tmp = TempDir::new().unwrap();
        let folder = component_folder(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(folder, tmp.path());
    }

    #[test]
    fn test_component_folder_rejects_missing_and_files() {
        let tmp = TempDir::new().unwrap();
        assert!(component_folder(Some(tmp.path().join("missing"))).is_err());

        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(component_folder(Some(file)).is_err());
    }

    #[test]
    fn test_component_folder_defaults_to_cwd() {
        let folder = component_folder(None).unwrap();
        assert_eq!(folder, env::current_dir().unwrap());
    }

    #[test]
    fn test_ensure_writable_opens_the_target() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("package.xml");
        fs::write(&file, "<package/>").unwrap();

        assert!(ensure_writable(tmp.path()).is_ok());
        assert!(ensure_writable(&file).is_ok());
        assert_eq!(fs::read_to_string(&file).unwrap(), "<package/>");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);

        let err = ensure_writable(&tmp.path().join("missing.xml")).unwrap_err();
        assert!(err.to_string().contains("Cannot write to"));
    }

    #[test]
    fn test_roles_parse_list() {
        assert_eq!(
            roles("php,test, www").unwrap(),
            vec![Role::Php, Role::Test, Role::Www]
        );
        assert_eq!(roles("php,php").unwrap(), vec![Role::Php]);
    }

    #[test]
    fn test_roles_report_every_bad_entry() {
        let err = roles("php,binary,src").unwrap_err().to_string();
        assert!(err.contains("'binary'"));
        assert!(err.contains("'src'"));
    }
}
