use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use csv_sqlite_loader::config::{expand_glob, LoaderConfig, TableMapping};
use csv_sqlite_loader::ErrorKind;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("csv-sqlite-loader-config-{nanos}.{ext}"))
}

#[test]
fn glob_maps_each_file_to_its_stem() {
    let mappings = expand_glob("tests/fixtures/*.csv").unwrap();
    let tables: Vec<&str> = mappings.iter().map(|m| m.table.as_str()).collect();
    assert_eq!(tables, vec!["a", "case_clash", "empty", "people", "ragged", "rowid"]);
    assert_eq!(mappings[0].path, PathBuf::from("tests/fixtures/a.csv"));
}

#[test]
fn glob_without_matches_is_empty() {
    assert!(expand_glob("tests/fixtures/*.nothing").unwrap().is_empty());
}

#[test]
fn config_file_round_trips_through_json() {
    let path = tmp_file("json");
    let config = LoaderConfig::new(
        "warehouse.db",
        vec![
            TableMapping::new("customers", "data/customers.csv"),
            TableMapping::new("orders", "data/orders.csv"),
        ],
    );
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = LoaderConfig::from_json_path(&path).unwrap();
    assert_eq!(loaded, config);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unreadable_config_file_is_a_config_error() {
    let err = LoaderConfig::from_json_path("tests/fixtures/no_such_config.json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
