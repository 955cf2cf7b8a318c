//! Tests for ConfigStore loading and saving

use enforcer_fs::{ConfigStore, Error};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    service_name: String,
    max_attempts: u32,
}

fn sample() -> Sample {
    Sample {
        service_name: "CloudflareWARP".into(),
        max_attempts: 20,
    }
}

#[rstest]
#[case("enforcer.toml")]
#[case("enforcer.json")]
#[case("ENFORCER.TOML")]
fn save_then_load_preserves_values(#[case] file_name: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(file_name);
    let store = ConfigStore::new();

    store.save(&path, &sample()).unwrap();
    let loaded: Sample = store.load(&path).unwrap();

    assert_eq!(loaded, sample());
}

#[test]
fn load_toml_written_by_hand() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("enforcer.toml");
    std::fs::write(&path, "service_name = \"Other\"\nmax_attempts = 3\n").unwrap();

    let loaded: Sample = ConfigStore::new().load(&path).unwrap();

    assert_eq!(loaded.service_name, "Other");
    assert_eq!(loaded.max_attempts, 3);
}

#[test]
fn load_unsupported_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("enforcer.yaml");
    std::fs::write(&path, "service_name: x").unwrap();

    let result: Result<Sample, _> = ConfigStore::new().load(&path);

    assert!(matches!(
        result,
        Err(Error::UnsupportedFormat { ref extension }) if extension == "yaml"
    ));
}

#[test]
fn load_malformed_json_reports_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("enforcer.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result: Result<Sample, _> = ConfigStore::new().load(&path);

    match result {
        Err(Error::ConfigParse { format, .. }) => assert_eq!(format, "JSON"),
        other => panic!("expected ConfigParse, got {:?}", other),
    }
}

#[test]
fn load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing.toml");

    let result: Result<Sample, _> = ConfigStore::new().load(&path);

    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn save_creates_parent_directories_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("enforcer.toml");

    ConfigStore::new().save(&path, &sample()).unwrap();

    assert!(path.is_file());
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}
