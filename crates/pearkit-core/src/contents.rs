//! The `<contents>` file list of `package.xml`.
//!
//! Source files live under role directories of the component's `src/`
//! folder:
//! ```text
//! src/
//! ├── bin/                    # role="script"
//! ├── data/                   # role="data"
//! ├── doc/                    # role="doc"
//! ├── php/                    # role="php"
//! ├── tests/unit-tests/php/   # role="test"
//! └── www/                    # role="www"
//! ```
//!
//! Every regular file found becomes one `<file>` entry carrying its MD5
//! checksum and, for code roles, the `<tasks:replace>` directives PEAR
//! applies at install time.

use crate::expand::ExpandError;
use md5::{Digest, Md5};
use quick_xml::escape::escape;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use walkdir::WalkDir;

/// A PEAR file role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Script,
    Php,
    Test,
    Data,
    Doc,
    Www,
}

/// Role directories under `src/`, in the order they are listed.
pub const ROLE_DIRECTORIES: [(&str, Role); 6] = [
    ("bin", Role::Script),
    ("data", Role::Data),
    ("doc", Role::Doc),
    ("php", Role::Php),
    ("tests/unit-tests/php", Role::Test),
    ("www", Role::Www),
];

/// Raised when a string names no PEAR role.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a PEAR file role (expected one of: script, php, test, data, doc, www)")]
pub struct UnknownRole(pub String);

impl Role {
    /// Name used in `role="..."`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Php => "php",
            Self::Test => "test",
            Self::Data => "data",
            Self::Doc => "doc",
            Self::Www => "www",
        }
    }

    /// Directory under `src/` holding files of this role.
    #[must_use]
    pub fn source_dir(&self) -> &'static str {
        ROLE_DIRECTORIES
            .iter()
            .find(|(_, role)| role == self)
            .map_or("", |(dir, _)| dir)
    }

    /// Install-time substitutions for files of this role.
    #[must_use]
    pub fn replacements(&self) -> &'static [ReplaceTask] {
        match self {
            Self::Php | Self::Test => &CODE_REPLACEMENTS,
            Self::Script => &SCRIPT_REPLACEMENTS,
            Self::Data | Self::Doc | Self::Www => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "script" => Ok(Self::Script),
            "php" => Ok(Self::Php),
            "test" => Ok(Self::Test),
            "data" => Ok(Self::Data),
            "doc" => Ok(Self::Doc),
            "www" => Ok(Self::Www),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Where the replacement value of a `<tasks:replace>` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceKind {
    PackageInfo,
    PearConfig,
}

impl ReplaceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageInfo => "package-info",
            Self::PearConfig => "pear-config",
        }
    }
}

/// One `<tasks:replace from=".." to=".." type=".."/>` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceTask {
    pub from: &'static str,
    pub to: &'static str,
    pub kind: ReplaceKind,
}

impl ReplaceTask {
    const fn new(from: &'static str, to: &'static str, kind: ReplaceKind) -> Self {
        Self { from, to, kind }
    }
}

const CODE_REPLACEMENTS: [ReplaceTask; 3] = [
    ReplaceTask::new("@@PACKAGE_VERSION@@", "version", ReplaceKind::PackageInfo),
    ReplaceTask::new("@@PHP_DIR@@", "php_dir", ReplaceKind::PearConfig),
    ReplaceTask::new("@@DATA_DIR@@", "data_dir", ReplaceKind::PearConfig),
];

const SCRIPT_REPLACEMENTS: [ReplaceTask; 5] = [
    ReplaceTask::new("@@PACKAGE_VERSION@@", "version", ReplaceKind::PackageInfo),
    ReplaceTask::new("/usr/bin/env php", "php_bin", ReplaceKind::PearConfig),
    ReplaceTask::new("@@PHP_BIN@@", "php_bin", ReplaceKind::PearConfig),
    ReplaceTask::new("@@BIN_DIR@@", "bin_dir", ReplaceKind::PearConfig),
    ReplaceTask::new("@@PHP_DIR@@", "php_dir", ReplaceKind::PearConfig),
];

/// One file of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    pub role: Role,

    /// Path relative to the role directory, `/`-separated.
    pub path: String,

    /// Lowercase hex MD5 of the file content.
    pub md5sum: String,

    pub replacements: &'static [ReplaceTask],
}

impl ContentsEntry {
    /// Render the entry as a `<file>` element, indented for `<dir>`.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let name = format!("/{}", self.path);
        let mut xml = format!(
            "      <file baseinstalldir=\"/\" md5sum=\"{}\" name=\"{}\" role=\"{}\"",
            self.md5sum,
            escape(name.as_str()),
            self.role
        );

        if self.replacements.is_empty() {
            xml.push_str("/>\n");
            return xml;
        }

        xml.push_str(">\n");
        for task in self.replacements {
            xml.push_str(&format!(
                "        <tasks:replace from=\"{}\" to=\"{}\" type=\"{}\" />\n",
                escape(task.from),
                task.to,
                task.kind.as_str()
            ));
        }
        xml.push_str("      </file>\n");
        xml
    }
}

/// Builds the file list for a component's `src/` folder.
#[derive(Debug, Clone)]
pub struct ContentsBuilder {
    src_dir: PathBuf,
}

impl ContentsBuilder {
    pub fn new(src_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
        }
    }

    #[must_use]
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Walk every role directory that exists and describe its files.
    ///
    /// Role directories come in [`ROLE_DIRECTORIES`] order; within one,
    /// entries are sorted by relative path so the output does not depend on
    /// the filesystem's listing order.
    pub fn collect(&self) -> Result<Vec<ContentsEntry>, ExpandError> {
        let mut entries = Vec::new();

        for (dir, role) in ROLE_DIRECTORIES {
            let search = self.src_dir.join(dir);
            if !search.is_dir() {
                continue;
            }

            let mut found = Vec::new();
            for entry in WalkDir::new(&search) {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    continue;
                }

                let Ok(relative) = entry.path().strip_prefix(&search) else {
                    continue;
                };
                let content = fs::read(entry.path()).map_err(|source| ExpandError::Io {
                    path: entry.path().to_path_buf(),
                    source,
                })?;

                found.push(ContentsEntry {
                    role,
                    path: slash_path(relative),
                    md5sum: hex::encode(Md5::digest(&content)),
                    replacements: role.replacements(),
                });
            }

            found.sort_by(|a, b| a.path.cmp(&b.path));
            entries.extend(found);
        }

        Ok(entries)
    }

    /// The rendered `<file>` elements for every entry.
    pub fn render(&self) -> Result<String, ExpandError> {
        Ok(self
            .collect()?
            .iter()
            .map(ContentsEntry::to_xml)
            .collect())
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn md5_hex(content: &str) -> String {
        hex::encode(Md5::digest(content.as_bytes()))
    }

    #[test]
    fn php_and_script_entries() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "php/Foo.php", "<?php class Foo {}\n");
        write(&src, "bin/run.sh", "#!/usr/bin/env php\n");

        let entries = ContentsBuilder::new(&src).collect().unwrap();
        assert_eq!(entries.len(), 2);

        let script = &entries[0];
        assert_eq!(script.role, Role::Script);
        assert_eq!(script.path, "run.sh");
        assert_eq!(script.md5sum, md5_hex("#!/usr/bin/env php\n"));
        assert_eq!(script.replacements.len(), 5);

        let php = &entries[1];
        assert_eq!(php.role, Role::Php);
        assert_eq!(php.path, "Foo.php");
        assert_eq!(php.md5sum, md5_hex("<?php class Foo {}\n"));
        assert_eq!(php.replacements.len(), 3);
    }

    #[test]
    fn nested_files_sorted_and_directories_skipped() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "php/Vendor/Zeta.php", "z");
        write(&src, "php/Vendor/Alpha.php", "a");
        write(&src, "php/Vendor.php", "v");
        fs::create_dir_all(src.join("php/Empty")).unwrap();

        let paths: Vec<_> = ContentsBuilder::new(&src)
            .collect()
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec!["Vendor.php", "Vendor/Alpha.php", "Vendor/Zeta.php"]
        );
    }

    #[test]
    fn test_role_and_plain_roles() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "tests/unit-tests/php/FooTest.php", "t");
        write(&src, "www/index.html", "w");
        write(&src, "doc/README.md", "d");

        let entries = ContentsBuilder::new(&src).collect().unwrap();
        let roles: Vec<_> = entries.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::Doc, Role::Test, Role::Www]);
        assert_eq!(entries[1].replacements.len(), 3);
        assert!(entries[0].replacements.is_empty());
        assert!(entries[2].replacements.is_empty());
    }

    #[test]
    fn missing_src_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(ContentsBuilder::new(tmp.path().join("src"))
            .collect()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn entry_xml_layout() {
        let doc = ContentsEntry {
            role: Role::Doc,
            path: "a&b.txt".to_string(),
            md5sum: "abc".to_string(),
            replacements: Role::Doc.replacements(),
        };
        assert_eq!(
            doc.to_xml(),
            "      <file baseinstalldir=\"/\" md5sum=\"abc\" name=\"/a&amp;b.txt\" role=\"doc\"/>\n"
        );

        let php = ContentsEntry {
            role: Role::Php,
            path: "Foo.php".to_string(),
            md5sum: "abc".to_string(),
            replacements: Role::Php.replacements(),
        };
        let xml = php.to_xml();
        assert!(xml.starts_with(
            "      <file baseinstalldir=\"/\" md5sum=\"abc\" name=\"/Foo.php\" role=\"php\">\n"
        ));
        assert!(xml.contains(
            "        <tasks:replace from=\"@@PHP_DIR@@\" to=\"php_dir\" type=\"pear-config\" />\n"
        ));
        assert_eq!(xml.matches("<tasks:replace").count(), 3);
        assert!(xml.ends_with("      </file>\n"));
    }

    #[test]
    fn roles_parse_and_map_to_directories() {
        assert_eq!("script".parse::<Role>().unwrap(), Role::Script);
        assert_eq!(" test ".parse::<Role>().unwrap(), Role::Test);
        assert!("binary".parse::<Role>().is_err());
        assert_eq!(Role::Test.source_dir(), "tests/unit-tests/php");
        assert_eq!(Role::Script.source_dir(), "bin");
    }
}
