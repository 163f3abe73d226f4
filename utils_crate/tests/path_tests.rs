use std::fs::File;
use tempfile::tempdir;
use utils_crate::error::UtilsError;
use utils_crate::path::{ensure_dir_exists, sanitize_path_component};

#[test]
fn test_ensure_dir_exists_creates_new_pt() -> Result<(), Box<dyn std::error::Error>> {
    let base_dir = tempdir()?;
    let new_dir = base_dir.path().join("runs").join("nested_pt");
    assert!(!new_dir.exists());
    ensure_dir_exists(&new_dir)?;
    assert!(new_dir.exists() && new_dir.is_dir());
    Ok(())
}

#[test]
fn test_ensure_dir_exists_existing_pt() -> Result<(), Box<dyn std::error::Error>> {
    let existing_dir_guard = tempdir()?;
    let existing_dir_path = existing_dir_guard.path();
    ensure_dir_exists(existing_dir_path)?;
    assert!(existing_dir_path.exists() && existing_dir_path.is_dir());
    Ok(())
}

#[test]
fn test_ensure_dir_exists_file_conflict_pt() {
    let base_dir = tempdir().unwrap();
    let file_path = base_dir.path().join("conflict_file_pt");
    File::create(&file_path).unwrap();
    let result = ensure_dir_exists(&file_path);
    match result.unwrap_err() {
        UtilsError::InvalidParameter(msg) => {
            assert!(msg.contains("exists but is not a directory"));
        }
        other => panic!("Unexpected error type for file conflict: {other:?}"),
    }
}

#[test]
fn test_sanitize_path_component_valid_pt() {
    assert_eq!(
        sanitize_path_component("20261019-stage_tiny_lin_p4-224"),
        "20261019-stage_tiny_lin_p4-224"
    );
}

#[test]
fn test_sanitize_path_component_replaces_invalid_pt() {
    assert_eq!(sanitize_path_component("invalid*name?"), "invalid_name_");
    assert_eq!(sanitize_path_component("path/to/run"), "path_to_run");
    assert_eq!(sanitize_path_component("a b"), "a_b");
}

#[test]
fn test_sanitize_path_component_empty_and_all_invalid_pt() {
    assert_eq!(sanitize_path_component(""), "");
    assert_eq!(sanitize_path_component("!@#$%^"), "______");
}
