//! The `php-library` component kind.

use crate::contents::ROLE_DIRECTORIES;
use crate::folder::{ComponentFolder, FolderError};
use crate::kind::{ComponentKind, UpgradeStep};
use crate::properties::COMPONENT_VERSION;
use crate::tasks::FileTask;

/// A PEAR-installable PHP library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpLibrary;

/// The shared `php-library` kind.
pub static PHP_LIBRARY: PhpLibrary = PhpLibrary;

/// Minimum PHP version required by packages at version 4 and later.
const MIN_PHP_VERSION: &str = "5.3.0";

/// Minimum PEAR installer version required by packages at version 4 and later.
const MIN_PEAR_INSTALLER_VERSION: &str = "1.9.4";

const UNIT_TESTS_DIR: &str = "src/tests/unit-tests";

static STEPS: [UpgradeStep; 4] = [
    UpgradeStep {
        from: 0,
        summary: "create the component skeleton",
        apply: create_skeleton,
    },
    UpgradeStep {
        from: 1,
        summary: "add PHPUnit configuration",
        apply: add_phpunit,
    },
    UpgradeStep {
        from: 2,
        summary: "replace the build tooling",
        apply: replace_build_tools,
    },
    UpgradeStep {
        from: 3,
        summary: "raise minimum PHP and PEAR installer versions",
        apply: raise_minimum_versions,
    },
];

impl ComponentKind for PhpLibrary {
    fn type_name(&self) -> &str {
        "php-library"
    }

    fn latest_version(&self) -> u32 {
        4
    }

    fn template_dir(&self) -> &str {
        "php-library"
    }

    fn upgrade_steps(&self) -> &[UpgradeStep] {
        &STEPS
    }
}

fn create_skeleton(folder: &ComponentFolder<'_>) -> Result<(), FolderError> {
    let mut queue = folder.task_queue();
    queue.enqueue(FileTask::make_directory("src")?);
    for (dir, _) in ROLE_DIRECTORIES {
        let mut path = String::from("src");
        for part in dir.split('/') {
            path.push('/');
            path.push_str(part);
            queue.enqueue(FileTask::make_directory(path.as_str())?);
        }
    }
    folder.copy_folders_from_data(&mut queue, "skeleton", "")?;
    queue.execute_all()?;
    Ok(())
}

fn add_phpunit(folder: &ComponentFolder<'_>) -> Result<(), FolderError> {
    let mut queue = folder.task_queue();
    queue
        .enqueue(FileTask::make_directory("src/tests")?)
        .enqueue(FileTask::make_directory(UNIT_TESTS_DIR)?);
    folder.copy_file_from_data_with_new_name(
        &mut queue,
        "phpunit/phpunit.xml.dist",
        "phpunit.xml.dist",
    )?;
    folder.copy_file_from_data_with_new_name(
        &mut queue,
        "phpunit/bootstrap.php",
        &format!("{UNIT_TESTS_DIR}/bootstrap.php"),
    )?;
    queue.execute_all()?;

    let edit = folder.add_property(
        "phpunit.bootstrap",
        format!("{UNIT_TESTS_DIR}/bootstrap.php"),
        Some(COMPONENT_VERSION),
    )?;
    if !edit.is_applied() {
        return Err(FolderError::MissingBuildProperties(
            folder.root().to_path_buf(),
        ));
    }
    Ok(())
}

fn replace_build_tools(folder: &ComponentFolder<'_>) -> Result<(), FolderError> {
    let mut queue = folder.task_queue();
    folder.replace_folder_contents_from_data(&mut queue, "build-tools", ".build")?;
    folder.enable_execution_of(&mut queue, ".build/run-tests.sh")?;
    queue.enqueue(FileTask::regex_replace(
        "build.xml",
        r#"<import\s+file="[^"]*"\s*/>"#,
        r#"<import file=".build/targets.xml"/>"#,
    )?);
    queue.execute_all()?;
    Ok(())
}

fn raise_minimum_versions(folder: &ComponentFolder<'_>) -> Result<(), FolderError> {
    let missing = || FolderError::MissingPackageManifest(folder.root().to_path_buf());

    let mut manifest = folder.load_package_manifest()?.ok_or_else(missing)?;
    let root = manifest.root_mut().ok_or_else(missing)?;
    root.set_text_at(&["dependencies", "required", "php", "min"], MIN_PHP_VERSION);
    root.set_text_at(
        &["dependencies", "required", "pearinstaller", "min"],
        MIN_PEAR_INSTALLER_VERSION,
    );
    folder.save_package_manifest(&manifest)
}
