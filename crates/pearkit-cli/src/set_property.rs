//! `pearkit set-property`: edit a component's `build.properties`.

use anyhow::{bail, Result};
use pearkit_core::{ComponentFolder, PropertyEdit, Toolkit, PHP_LIBRARY};
use std::path::Path;

/// Set `name` to `value`, placing a new entry after `after` when given.
pub fn set_property(
    folder: &Path,
    toolkit: &Toolkit,
    name: &str,
    value: &str,
    after: Option<&str>,
) -> Result<PropertyEdit> {
    let component = ComponentFolder::open(folder, &PHP_LIBRARY, toolkit);
    let edit = component.add_property(name, value, after)?;

    let action = match edit {
        PropertyEdit::MissingFile => bail!(
            "No build.properties in `{}`; run `pearkit init` first",
            component.root().display()
        ),
        PropertyEdit::Replaced => "Updated",
        PropertyEdit::Appended | PropertyEdit::Inserted => "Added",
    };
    println!("{action} {name}={value}");

    Ok(edit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUNDLED_DATA_DIR;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_set_new_and_existing_property() {
        let tmp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(BUNDLED_DATA_DIR);
        fs::write(tmp.path().join("build.properties"), "a=1\nb=2\n").unwrap();

        let edit = set_property(tmp.path(), &toolkit, "c", "3", Some("a")).unwrap();
        assert_eq!(edit, PropertyEdit::Inserted);
        let edit = set_property(tmp.path(), &toolkit, "b", "4", None).unwrap();
        assert_eq!(edit, PropertyEdit::Replaced);

        assert_eq!(
            fs::read_to_string(tmp.path().join("build.properties")).unwrap(),
            "a=1\nc=3\nb=4\n"
        );
    }

    #[test]
    fn test_missing_properties_file() {
        let tmp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(BUNDLED_DATA_DIR);
        assert!(set_property(tmp.path(), &toolkit, "a", "1", None).is_err());
        assert!(!tmp.path().join("build.properties").exists());
    }

    #[test]
    fn test_invalid_name() {
        let tmp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(BUNDLED_DATA_DIR);
        fs::write(tmp.path().join("build.properties"), "a=1\n").unwrap();
        assert!(set_property(tmp.path(), &toolkit, "bad=name", "1", None).is_err());
    }
}
