//! The on-disk component folder and its upgrade engine.
//!
//! A folder is classified from its `build.properties` every time it is
//! opened:
//!
//! ```text
//! no build.properties                          -> Empty
//! unreadable build.properties                  -> Unknown
//! component.type / component.version missing   -> Incompatible
//! component.type is not this kind's type       -> Incompatible
//! component.version not an integer, or newer   -> Incompatible
//! component.version == latest                  -> UpToDate
//! component.version <  latest                  -> NeedsUpgrade
//! ```
//!
//! Upgrades walk the kind's step table one version at a time. The new
//! version is written to `build.properties` only after a step's mutations
//! have succeeded, so the recorded version never runs ahead of the folder's
//! content and a failed upgrade can be resumed.

use crate::kind::{ComponentKind, UpgradeStep};
use crate::manifest::{ManifestXmlError, PackageManifest};
use crate::properties::{
    append_property, has_property, insert_property_after, parse_properties, render_value,
    replace_property, validate_name, PropertiesError, PropertyValue, COMPONENT_TYPE,
    COMPONENT_VERSION,
};
use crate::tasks::{FileTask, TaskError, TaskQueue};
use crate::toolkit::Toolkit;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The properties filename inside a component folder.
pub const BUILD_PROPERTIES_FILE: &str = "build.properties";

/// The package manifest filename inside a component folder.
pub const PACKAGE_XML_FILE: &str = "package.xml";

/// Errors that can occur when working with a component folder.
#[derive(Error, Debug)]
pub enum FolderError {
    #[error(
        "cannot upgrade {} from version {from} to version {to}: the target must be newer",
        .folder.display()
    )]
    NonsensicalUpgrade { folder: PathBuf, from: u32, to: u32 },

    #[error("{kind} components have no upgrade step from version {from}")]
    MissingUpgradeStep { kind: String, from: u32 },

    #[error("no build.properties in {}", .0.display())]
    MissingBuildProperties(PathBuf),

    #[error("no package.xml in {}", .0.display())]
    MissingPackageManifest(PathBuf),

    #[error(transparent)]
    Properties(#[from] PropertiesError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Manifest(#[from] ManifestXmlError),
}

/// Lifecycle state of a component folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    /// The properties file exists but could not be read.
    Unknown,
    /// Not a component yet.
    Empty,
    /// At the newest schema version.
    UpToDate,
    /// A component of the right kind at an older schema version.
    NeedsUpgrade,
    /// Something this kind cannot manage.
    Incompatible,
}

impl FolderState {
    /// Label used in diagnostics.
    #[must_use]
    pub fn as_text(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Empty => "empty",
            Self::UpToDate => "up to date",
            Self::NeedsUpgrade => "needs upgrade",
            Self::Incompatible => "incompatible",
        }
    }
}

impl fmt::Display for FolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// Outcome of a property edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PropertyEdit {
    /// An existing assignment was rewritten in place.
    Replaced,
    /// A new assignment was added at the end of the file.
    Appended,
    /// A new assignment was added below the requested anchor key.
    Inserted,
    /// Nothing was written: the folder has no `build.properties`.
    MissingFile,
}

impl PropertyEdit {
    /// True unless the edit was skipped for lack of a properties file.
    pub fn is_applied(self) -> bool {
        !matches!(self, Self::MissingFile)
    }
}

/// One component folder of a given kind.
#[derive(Debug)]
pub struct ComponentFolder<'k> {
    root: PathBuf,
    build_properties_path: PathBuf,
    package_xml_path: PathBuf,
    templates_dir: PathBuf,
    kind: &'k dyn ComponentKind,
    state: FolderState,
    component_version: u32,
}

impl<'k> ComponentFolder<'k> {
    /// Open the folder at `root` and classify it as `kind`.
    ///
    /// A relative `root` is resolved against the current directory.
    pub fn open(root: impl AsRef<Path>, kind: &'k dyn ComponentKind, toolkit: &Toolkit) -> Self {
        let root = absolute(root.as_ref());
        let mut folder = Self {
            build_properties_path: root.join(BUILD_PROPERTIES_FILE),
            package_xml_path: root.join(PACKAGE_XML_FILE),
            templates_dir: toolkit.templates_for(kind.template_dir()),
            root,
            kind,
            state: FolderState::Unknown,
            component_version: 0,
        };
        folder.load_folder_state();
        folder
    }

    /// Re-read `build.properties` and classify the folder again.
    pub fn load_folder_state(&mut self) -> FolderState {
        let (state, version) = self.classify();
        self.state = state;
        self.component_version = version;
        state
    }

    fn classify(&self) -> (FolderState, u32) {
        let text = match fs::read_to_string(&self.build_properties_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return (FolderState::Empty, 0),
            Err(e) => {
                warn!(
                    path = %self.build_properties_path.display(),
                    error = %e,
                    "cannot read build properties"
                );
                return (FolderState::Unknown, 0);
            }
        };

        let properties = parse_properties(&text);
        let (Some(component_type), Some(version)) = (
            properties.get(COMPONENT_TYPE),
            properties.get(COMPONENT_VERSION),
        ) else {
            return (FolderState::Incompatible, 0);
        };

        let Ok(version) = version.parse::<u32>() else {
            return (FolderState::Incompatible, 0);
        };

        let latest = self.kind.latest_version();
        let state = if component_type != self.kind.type_name() || version > latest {
            FolderState::Incompatible
        } else if version == latest {
            FolderState::UpToDate
        } else {
            FolderState::NeedsUpgrade
        };

        (state, version)
    }

    /// Root directory of the component.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn build_properties_path(&self) -> &Path {
        &self.build_properties_path
    }

    #[must_use]
    pub fn package_xml_path(&self) -> &Path {
        &self.package_xml_path
    }

    /// This kind's template directory inside the toolkit data directory.
    #[must_use]
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    #[must_use]
    pub fn kind(&self) -> &'k dyn ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> FolderState {
        self.state
    }

    #[must_use]
    pub fn state_as_text(&self) -> &'static str {
        self.state.as_text()
    }

    /// Schema version recorded in `build.properties`, or 0.
    #[must_use]
    pub fn component_version(&self) -> u32 {
        self.component_version
    }

    #[must_use]
    pub fn test_has_build_properties(&self) -> bool {
        self.build_properties_path.is_file()
    }

    #[must_use]
    pub fn test_has_package_manifest(&self) -> bool {
        self.package_xml_path.is_file()
    }

    // Build properties

    fn read_build_properties(&self) -> Result<Option<String>, FolderError> {
        match fs::read_to_string(&self.build_properties_path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PropertiesError::Io {
                path: self.build_properties_path.clone(),
                source,
            }
            .into()),
        }
    }

    fn write_build_properties(&self, text: &str) -> Result<(), FolderError> {
        fs::write(&self.build_properties_path, text).map_err(|source| {
            FolderError::from(PropertiesError::Io {
                path: self.build_properties_path.clone(),
                source,
            })
        })
    }

    /// Parsed contents of `build.properties`, or `None` if it is missing.
    pub fn read_properties(&self) -> Result<Option<BTreeMap<String, String>>, FolderError> {
        Ok(self
            .read_build_properties()?
            .map(|text| parse_properties(&text)))
    }

    /// Whether `build.properties` has a line starting with `name=`.
    pub fn has_property(&self, name: &str) -> Result<bool, FolderError> {
        Ok(self
            .read_build_properties()?
            .is_some_and(|text| has_property(name, &text)))
    }

    /// Set `name` to `value`, rewriting its line or appending a new one.
    pub fn set_property(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<PropertyEdit, FolderError> {
        self.add_property(name, value, None)
    }

    /// Set `name` to `value`, placing a new line right after `after`'s.
    ///
    /// If `name` is already assigned its line is rewritten in place and
    /// `after` is ignored. If `after` is `None` or not assigned, the new
    /// line goes at the end of the file.
    pub fn add_property(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
        after: Option<&str>,
    ) -> Result<PropertyEdit, FolderError> {
        validate_name(name)?;
        if let Some(after) = after {
            validate_name(after)?;
        }
        let value = render_value(name, &value.into())?;

        let Some(text) = self.read_build_properties()? else {
            return Ok(PropertyEdit::MissingFile);
        };

        let (updated, edit) = if has_property(name, &text) {
            (replace_property(&text, name, &value), PropertyEdit::Replaced)
        } else if let Some(updated) =
            after.and_then(|after| insert_property_after(&text, after, name, &value))
        {
            (updated, PropertyEdit::Inserted)
        } else {
            (append_property(&text, name, &value), PropertyEdit::Appended)
        };

        if updated != text {
            self.write_build_properties(&updated)?;
        }
        debug!(property = name, value = %value, ?edit, "edited build properties");

        Ok(edit)
    }

    // Package manifest

    /// Read `package.xml`; `None` if the folder has none.
    pub fn load_package_manifest(&self) -> Result<Option<PackageManifest>, FolderError> {
        Ok(PackageManifest::load(&self.package_xml_path)?)
    }

    /// Write `manifest` to the folder's `package.xml`.
    pub fn save_package_manifest(&self, manifest: &PackageManifest) -> Result<(), FolderError> {
        manifest.save(&self.package_xml_path)?;
        Ok(())
    }

    // Template helpers. These only queue tasks; nothing touches the disk
    // until the queue is executed.

    /// An empty task queue rooted at this folder.
    #[must_use]
    pub fn task_queue(&self) -> TaskQueue {
        TaskQueue::new(&self.root)
    }

    /// Path of a file inside this kind's template directory.
    #[must_use]
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.templates_dir.join(relative)
    }

    /// Queue copies of template `files` into `dest` (relative to the root).
    pub fn copy_files_from_data(
        &self,
        queue: &mut TaskQueue,
        files: &[&str],
        dest: &str,
    ) -> Result<(), FolderError> {
        for file in files {
            queue.enqueue(FileTask::copy(
                self.data_path(file),
                Path::new(dest).join(file),
            )?);
        }
        Ok(())
    }

    /// Queue a copy of template `file` to `dest` under a new name.
    pub fn copy_file_from_data_with_new_name(
        &self,
        queue: &mut TaskQueue,
        file: &str,
        dest: &str,
    ) -> Result<(), FolderError> {
        queue.enqueue(FileTask::copy(self.data_path(file), dest)?);
        Ok(())
    }

    /// Queue replacing the folder `dest` with the template folder `src`.
    pub fn replace_folder_contents_from_data(
        &self,
        queue: &mut TaskQueue,
        src: &str,
        dest: &str,
    ) -> Result<(), FolderError> {
        queue
            .enqueue(FileTask::remove(dest)?)
            .enqueue(FileTask::make_directory(dest)?);
        self.copy_folders_from_data(queue, src, dest)
    }

    /// Queue a recursive copy of the template folder `src` into `dest`.
    ///
    /// An empty `dest` means the component root.
    pub fn copy_folders_from_data(
        &self,
        queue: &mut TaskQueue,
        src: &str,
        dest: &str,
    ) -> Result<(), FolderError> {
        let dest = if dest.is_empty() { "." } else { dest };
        queue.enqueue(FileTask::copy(self.data_path(src), dest)?);
        Ok(())
    }

    /// Queue marking `file` (relative to the root, or absolute) executable.
    pub fn enable_execution_of(&self, queue: &mut TaskQueue, file: &str) -> Result<(), FolderError> {
        queue.enqueue(FileTask::chmod(file)?);
        Ok(())
    }

    // Upgrades

    /// Upgrade the folder to its kind's latest version.
    pub fn upgrade_to_latest(&mut self) -> Result<u32, FolderError> {
        let latest = self.kind.latest_version();
        self.upgrade_component(latest, None)
    }

    /// Walk the folder from its current version (or `from_override`) up to
    /// `target_version`, one step at a time.
    ///
    /// Fails without touching the disk if the start version is not older
    /// than the target, or if the kind lacks a step on the way. If a step
    /// fails, `component.version` holds the last version fully reached and
    /// calling this again resumes from there.
    pub fn upgrade_component(
        &mut self,
        target_version: u32,
        from_override: Option<u32>,
    ) -> Result<u32, FolderError> {
        let start = from_override.unwrap_or(self.component_version);
        if start >= target_version {
            return Err(FolderError::NonsensicalUpgrade {
                folder: self.root.clone(),
                from: start,
                to: target_version,
            });
        }

        let steps = (start..target_version)
            .map(|version| {
                self.kind
                    .step_from(version)
                    .copied()
                    .ok_or_else(|| FolderError::MissingUpgradeStep {
                        kind: self.kind.type_name().to_string(),
                        from: version,
                    })
            })
            .collect::<Result<Vec<UpgradeStep>, _>>()?;

        for step in steps {
            if let Err(e) = self.apply_step(&step) {
                self.load_folder_state();
                return Err(e);
            }
        }

        self.load_folder_state();
        Ok(target_version)
    }

    fn apply_step(&mut self, step: &UpgradeStep) -> Result<(), FolderError> {
        info!(
            folder = %self.root.display(),
            from = step.from,
            to = step.to(),
            "{}",
            step.summary
        );
        (step.apply)(self)?;

        if !self.set_property(COMPONENT_VERSION, step.to())?.is_applied() {
            return Err(FolderError::MissingBuildProperties(self.root.clone()));
        }
        self.component_version = step.to();
        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}
