//! Integration tests for component folders built from the bundled templates

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pearkit_core::{
    expand_package_xml, ComponentFolder, ComponentKind, FileTask, FolderError, FolderState,
    PackageManifest, PropertyEdit, TaskError, TaskQueue, Toolkit, PHP_LIBRARY,
};
use tempfile::TempDir;
use walkdir::WalkDir;

fn toolkit() -> Toolkit {
    Toolkit::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../data"))
}

/// Every file under `root`, keyed by its relative path.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            (relative, fs::read(entry.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_fresh_folder_upgrades_to_latest() {
    let tmp = TempDir::new().unwrap();
    let toolkit = toolkit();
    let mut folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);

    assert_eq!(folder.state(), FolderState::Empty);
    assert_eq!(folder.state_as_text(), "empty");

    folder.upgrade_to_latest().unwrap();

    let reopened = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
    assert_eq!(reopened.state(), FolderState::UpToDate);
    assert_eq!(reopened.component_version(), PHP_LIBRARY.latest_version());
    assert!(reopened.test_has_build_properties());
    assert!(reopened.test_has_package_manifest());
}

#[test]
fn test_two_steps_at_once_match_two_single_steps() {
    let toolkit = toolkit();

    let together = TempDir::new().unwrap();
    let mut folder = ComponentFolder::open(together.path(), &PHP_LIBRARY, &toolkit);
    folder.upgrade_component(1, None).unwrap();
    folder.upgrade_component(3, None).unwrap();

    let apart = TempDir::new().unwrap();
    let mut folder = ComponentFolder::open(apart.path(), &PHP_LIBRARY, &toolkit);
    folder.upgrade_component(1, None).unwrap();
    folder.upgrade_component(2, None).unwrap();
    folder.upgrade_component(3, None).unwrap();

    assert_eq!(snapshot(together.path()), snapshot(apart.path()));
}

#[test]
fn test_each_step_can_be_rerun_from_its_start_version() {
    let toolkit = toolkit();

    for from in 0..PHP_LIBRARY.latest_version() {
        let tmp = TempDir::new().unwrap();
        let mut folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
        folder.upgrade_component(from + 1, None).unwrap();
        let first = snapshot(tmp.path());

        folder.upgrade_component(from + 1, Some(from)).unwrap();

        assert_eq!(snapshot(tmp.path()), first, "rerun of step {from}");
        assert_eq!(folder.component_version(), from + 1);
    }
}

#[test]
fn test_upgrade_to_current_version_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    let toolkit = toolkit();
    let mut folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
    folder.upgrade_component(2, None).unwrap();
    let before = snapshot(tmp.path());

    let err = folder.upgrade_component(2, None).unwrap_err();
    assert!(matches!(
        err,
        FolderError::NonsensicalUpgrade { from: 2, to: 2, .. }
    ));
    let err = folder.upgrade_component(1, None).unwrap_err();
    assert!(matches!(err, FolderError::NonsensicalUpgrade { .. }));

    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn test_state_classification() {
    let tmp = TempDir::new().unwrap();
    let toolkit = toolkit();
    let props = tmp.path().join("build.properties");

    let cases = [
        ("component.version=4\n", FolderState::Incompatible),
        ("component.type=php-library\n", FolderState::Incompatible),
        (
            "component.type=web-app\ncomponent.version=4\n",
            FolderState::Incompatible,
        ),
        (
            "component.type=php-library\ncomponent.version=4\n",
            FolderState::UpToDate,
        ),
        (
            "component.type=php-library\ncomponent.version=2\n",
            FolderState::NeedsUpgrade,
        ),
        (
            "component.type=php-library\ncomponent.version=9\n",
            FolderState::Incompatible,
        ),
    ];

    for (text, expected) in cases {
        fs::write(&props, text).unwrap();
        let folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
        assert_eq!(folder.state(), expected, "{text:?}");
    }
}

#[test]
fn test_set_property_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let toolkit = toolkit();
    let mut folder = ComponentFolder::open(tmp.path(), &PHP_LIBRARY, &toolkit);
    folder.upgrade_component(1, None).unwrap();

    let edit = folder.set_property("project.name", "Widgets").unwrap();
    assert_eq!(edit, PropertyEdit::Replaced);
    let first = fs::read(folder.build_properties_path()).unwrap();

    folder.set_property("project.name", "Widgets").unwrap();
    let second = fs::read(folder.build_properties_path()).unwrap();
    assert_eq!(first, second);

    let properties = folder.read_properties().unwrap().unwrap();
    assert_eq!(properties["project.name"], "Widgets");
    assert_eq!(
        String::from_utf8(second)
            .unwrap()
            .matches("project.name=")
            .count(),
        1
    );
}

#[test]
fn test_initialized_component_expands_its_manifest() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let toolkit = toolkit();
    let mut folder = ComponentFolder::open(root, &PHP_LIBRARY, &toolkit);
    folder.upgrade_to_latest().unwrap();
    folder.set_property("project.name", "Widgets").unwrap();

    fs::write(root.join("src/php/Widget.php"), "<?php class Widget {}\n").unwrap();
    fs::write(root.join("src/bin/widgets"), "#!/usr/bin/env php\n<?php\n").unwrap();

    let report = expand_package_xml(
        folder.build_properties_path(),
        folder.package_xml_path(),
        &root.join("src"),
    )
    .unwrap();
    assert_eq!(report.files, 2);
    assert!(report.unresolved.is_empty(), "{:?}", report.unresolved);

    let manifest = PackageManifest::load(folder.package_xml_path())
        .unwrap()
        .unwrap();
    let package = manifest.root().unwrap();
    assert_eq!(package.child("name").unwrap().text(), "Widgets");
    assert_eq!(
        package
            .path(&["dependencies", "required", "php", "min"])
            .unwrap()
            .text(),
        "5.3.0"
    );

    let files: Vec<_> = package
        .path(&["contents", "dir"])
        .unwrap()
        .elements()
        .map(|file| {
            (
                file.attribute("name").unwrap().to_string(),
                file.attribute("role").unwrap().to_string(),
                file.elements().count(),
            )
        })
        .collect();
    assert_eq!(
        files,
        vec![
            ("/widgets".to_string(), "script".to_string(), 5),
            ("/Widget.php".to_string(), "php".to_string(), 3),
        ]
    );
}

#[test]
fn test_task_queue_abort_keeps_earlier_effects() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.txt"), "a").unwrap();

    let mut queue = TaskQueue::new(root);
    queue
        .enqueue(FileTask::copy("a.txt", "b.txt").unwrap())
        .enqueue(FileTask::copy("missing.txt", "c.txt").unwrap());

    let err = queue.execute_all().unwrap_err();
    assert!(matches!(err, TaskError::Io { .. }));
    assert!(root.join("b.txt").is_file());
    assert!(!root.join("c.txt").exists());

    fs::write(root.join("missing.txt"), "now here").unwrap();
    let mut retry = TaskQueue::new(root);
    retry.enqueue(FileTask::copy("missing.txt", "c.txt").unwrap());
    assert_eq!(retry.execute_all().unwrap(), 1);
    assert_eq!(fs::read_to_string(root.join("c.txt")).unwrap(), "now here");
}
