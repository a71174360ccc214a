//! `pearkit expand-package-xml`: regenerate `package.xml` from its template.

use crate::validate::ensure_writable;
use anyhow::{bail, Context, Result};
use pearkit_core::{expand_package_xml, ExpandReport};
use std::path::PathBuf;

/// Options for `pearkit expand-package-xml`.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub build_properties: PathBuf,
    pub package_xml: PathBuf,
    pub src: PathBuf,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            build_properties: PathBuf::from("build.properties"),
            package_xml: PathBuf::from("package.xml"),
            src: PathBuf::from("src"),
        }
    }
}

/// Expand the manifest template in place.
pub fn expand(options: &ExpandOptions) -> Result<ExpandReport> {
    if !options.build_properties.is_file() {
        bail!(
            "Build properties file `{}` not found",
            options.build_properties.display()
        );
    }
    if !options.package_xml.is_file() {
        bail!("Package manifest `{}` not found", options.package_xml.display());
    }
    ensure_writable(&options.package_xml)?;
    if !options.src.is_dir() {
        bail!("Source folder `{}` not found", options.src.display());
    }

    let report = expand_package_xml(
        &options.build_properties,
        &options.package_xml,
        &options.src,
    )
    .with_context(|| format!("Failed to expand `{}`", options.package_xml.display()))?;

    println!(
        "Expanded `{}` ({} files)",
        report.package_xml.display(),
        report.files
    );
    if !report.unresolved.is_empty() {
        eprintln!(
            "warning: tokens left unexpanded: {}",
            report.unresolved.join(", ")
        );
    }
    Ok(report)
}
