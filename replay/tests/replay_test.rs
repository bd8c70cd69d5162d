//! Integration tests for the replay tool.
//!
//! Each test writes its inputs into a temporary directory.

use bough_engine::{LocalRow, MemoryStore, RemoteRecord, StoreSnapshot, SUPER_ROOT_ID};
use bough_replay::{run, AppError, Config};
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> Config {
    Config {
        store_path: dir.join("store.json"),
        records_path: dir.join("records.json"),
        output_path: dir.join("out.json"),
        log_personal_info: false,
    }
}

fn write_records(path: &Path, records: &[RemoteRecord]) {
    std::fs::write(path, serde_json::to_string(records).unwrap()).unwrap();
}

fn read_store(path: &Path) -> MemoryStore {
    let json = std::fs::read_to_string(path).unwrap();
    MemoryStore::from_snapshot(StoreSnapshot::from_json(&json).unwrap()).unwrap()
}

#[tokio::test]
async fn replay_into_empty_store() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    write_records(
        &config.records_path,
        &[
            RemoteRecord::bookmark("X", "F1").with_title("Rust"),
            RemoteRecord::folder("F1", "menu", ["X", "Y"]),
            RemoteRecord::bookmark("sep", "F1").with_type("separator"),
        ],
    );

    let summary = run(&config).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.finalized, 1);
    assert_eq!(summary.pending_orphans, 0);

    let store = read_store(&config.output_path);
    let f1 = store.row("F1").unwrap();
    assert_eq!(store.child_guids(f1.id), vec!["X"]);
    assert!(!config.store_path.exists());
}

#[tokio::test]
async fn replay_keeps_local_additions() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let existing = MemoryStore::new();
    let menu = existing.insert_row(LocalRow::folder("menu", SUPER_ROOT_ID, 0));
    existing.insert_row(LocalRow::bookmark("local-only", menu, 0).with_title("Mine"));
    std::fs::write(
        &config.store_path,
        existing.export_snapshot().to_json().unwrap(),
    )
    .unwrap();

    write_records(
        &config.records_path,
        &[
            RemoteRecord::folder("menu", "places", ["a"]).modified_at(5_000),
            RemoteRecord::bookmark("a", "menu"),
        ],
    );

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.failed, 0);

    let store = read_store(&config.output_path);
    let menu = store.row("menu").unwrap();
    assert_eq!(menu.id, 1);
    assert_eq!(store.child_guids(menu.id), vec!["a", "local-only"]);
}

#[tokio::test]
async fn orphans_are_reported() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    write_records(&config.records_path, &[RemoteRecord::bookmark("x", "never")]);

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.pending_orphans, 1);

    let store = read_store(&config.output_path);
    let unfiled = store.row("unfiled").unwrap();
    assert_eq!(store.row("x").unwrap().parent_id, unfiled.id);
}

#[tokio::test]
async fn malformed_feed_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    std::fs::write(&config.records_path, "{not json").unwrap();

    let result = run(&config).await;
    assert!(matches!(result, Err(AppError::Records { .. })));
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn corrupt_snapshot_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    std::fs::write(&config.store_path, r#"{"formatVersion": 1}"#).unwrap();
    write_records(&config.records_path, &[]);

    let result = run(&config).await;
    assert!(matches!(result, Err(AppError::Engine(_))));
}

#[tokio::test]
async fn missing_feed_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let result = run(&config).await;
    assert!(matches!(result, Err(AppError::Io { .. })));
}
