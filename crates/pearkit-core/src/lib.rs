//! Scaffolding, upgrades and packaging for PEAR-style components.
//!
//! This crate provides:
//! - Classification of a component folder from its `build.properties`
//! - Sequential, resumable upgrades of a folder through its schema versions
//! - An ordered, fail-fast queue of filesystem tasks that upgrades run on
//! - Line-preserving edits of `build.properties`
//! - Generation of the `package.xml` file list and token expansion
//! - Reading and writing `package.xml` as a small element tree

mod contents;
mod expand;
mod folder;
mod kind;
mod manifest;
mod php_library;
mod properties;
mod tasks;
mod toolkit;

pub use contents::{
    ContentsBuilder, ContentsEntry, ReplaceKind, ReplaceTask, Role, UnknownRole,
    ROLE_DIRECTORIES,
};
pub use expand::{
    build_tokens, expand_package_xml, expand_package_xml_at, expand_tokens, find_tokens,
    ExpandError, ExpandReport,
};
pub use folder::{
    ComponentFolder, FolderError, FolderState, PropertyEdit, BUILD_PROPERTIES_FILE,
    PACKAGE_XML_FILE,
};
pub use kind::{ComponentKind, UpgradeStep};
pub use manifest::{ManifestXmlError, PackageManifest, XmlElement, XmlNode};
pub use php_library::{PhpLibrary, PHP_LIBRARY};
pub use properties::{
    has_property, parse_properties, PropertiesError, PropertyValue, COMPONENT_TYPE,
    COMPONENT_VERSION,
};
pub use tasks::{FileTask, TaskError, TaskQueue};
pub use toolkit::Toolkit;

/// Toolkit version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
