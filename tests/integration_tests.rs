//! Integration tests with a DuckDB file source and a local destination
//!
//! Tests the full end-to-end flow: seeded table → pages → JSON batches → files

use batch_export::cli::{Cli, ExitCode, Runner};
use batch_export::config::{ConnectionDef, ExportSettings, SourceEngine};
use batch_export::pipeline::{BatchExportPipeline, ExportConfig, RunOutcome};
use batch_export::serialize::JsonSerializer;
use batch_export::sink::{ObjectStoreSink, Sink, StagingMode};
use batch_export::source::{DuckDbSource, TableSchema};
use batch_export::ScheduleMode;
use clap::Parser;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use test_case::test_case;

/// DuckDB file with `rows` seeded dummy users
fn seeded_database(dir: &TempDir, rows: usize) -> DuckDbSource {
    let connection = ConnectionDef {
        connection_string: Some(dir.path().join("export.duckdb").display().to_string()),
        ..ConnectionDef::default()
    };
    let source = DuckDbSource::new(SourceEngine::Duckdb, &connection).unwrap();
    source
        .ensure_table_exists(&TableSchema::dummy_users("dummy_users"))
        .unwrap();
    source.seed_dummy_rows("dummy_users", rows, 40).unwrap();
    source
}

fn read_batch(dir: &Path, name: &str) -> Vec<serde_json::Value> {
    let content = std::fs::read(dir.join("bq_exports").join(name)).unwrap();
    serde_json::from_slice::<serde_json::Value>(&content)
        .unwrap()
        .as_array()
        .unwrap()
        .clone()
}

fn batch_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("bq_exports"))
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ============================================================================
// Pipeline Integration Tests
// ============================================================================

#[test_case(ScheduleMode::Sequential ; "sequential")]
#[test_case(ScheduleMode::Parallel ; "parallel")]
#[tokio::test]
async fn test_export_seeded_table_to_local_directory(mode: ScheduleMode) {
    let db_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let source = seeded_database(&db_dir, 120);

    let sink = ObjectStoreSink::parse(out_dir.path().to_str().unwrap()).unwrap();
    sink.ensure_container_exists().await.unwrap();

    let pipeline = BatchExportPipeline::new(Arc::new(sink), Arc::new(JsonSerializer::new()))
        .with_config(ExportConfig::new().with_page_size(50).with_mode(mode));
    let summary = pipeline
        .run(&source, "SELECT * FROM dummy_users")
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.records_exported, 120);
    assert_eq!(
        batch_files(out_dir.path()),
        vec!["batch_0.json", "batch_1.json", "batch_2.json"]
    );

    let sizes: Vec<usize> = ["batch_0.json", "batch_1.json", "batch_2.json"]
        .iter()
        .map(|name| read_batch(out_dir.path(), name).len())
        .collect();
    assert_eq!(sizes, vec![50, 50, 20]);
}

#[tokio::test]
async fn test_exported_rows_keep_column_order_and_types() {
    let db_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let source = seeded_database(&db_dir, 10);

    let sink = ObjectStoreSink::parse(out_dir.path().to_str().unwrap()).unwrap();
    let pipeline = BatchExportPipeline::new(Arc::new(sink), Arc::new(JsonSerializer::new()))
        .with_config(ExportConfig::new().with_page_size(10));
    pipeline
        .run(&source, "SELECT * FROM dummy_users")
        .await
        .unwrap();

    let content = std::fs::read_to_string(out_dir.path().join("bq_exports/batch_0.json")).unwrap();
    let id_at = content.find("\"id\"").unwrap();
    let name_at = content.find("\"name\"").unwrap();
    let created_at = content.find("\"created_at\"").unwrap();
    assert!(id_at < name_at && name_at < created_at);

    for row in read_batch(out_dir.path(), "batch_0.json") {
        let id = row["id"].as_i64().unwrap();
        assert!((1000..=999_999).contains(&id));

        let age = row["age"].as_i64().unwrap();
        assert!((18..=65).contains(&age));

        assert!(row["salary"].is_f64());
        assert!(row["email"].as_str().unwrap().contains('@'));

        let created = row["created_at"].as_str().unwrap();
        assert!(
            chrono::DateTime::parse_from_rfc3339(created).is_ok(),
            "not an RFC 3339 timestamp: {created}"
        );
    }
}

#[tokio::test]
async fn test_empty_table_exports_nothing() {
    let db_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let source = seeded_database(&db_dir, 0);

    let sink = ObjectStoreSink::parse(out_dir.path().to_str().unwrap()).unwrap();
    let summary = BatchExportPipeline::new(Arc::new(sink), Arc::new(JsonSerializer::new()))
        .run(&source, "SELECT * FROM dummy_users")
        .await
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.attempted, 0);
    assert!(batch_files(out_dir.path()).is_empty());
}

#[tokio::test]
async fn test_disk_staging_is_cleaned_up() {
    let db_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let staging_dir = tempfile::tempdir().unwrap();
    let source = seeded_database(&db_dir, 75);

    let sink = ObjectStoreSink::parse(out_dir.path().to_str().unwrap()).unwrap();
    let config = ExportConfig::new()
        .with_page_size(25)
        .parallel(2)
        .with_staging(StagingMode::Disk {
            dir: Some(staging_dir.path().to_path_buf()),
        });
    let summary = BatchExportPipeline::new(Arc::new(sink), Arc::new(JsonSerializer::new()))
        .with_config(config)
        .run(&source, "SELECT * FROM dummy_users")
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(batch_files(out_dir.path()).len(), 3);
    assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_query_is_a_source_error() {
    let db_dir = tempfile::tempdir().unwrap();
    let source = seeded_database(&db_dir, 5);

    let err = BatchExportPipeline::new(
        Arc::new(ObjectStoreSink::in_memory()),
        Arc::new(JsonSerializer::new()),
    )
    .run(&source, "SELECT * FROM missing_table")
    .await
    .unwrap_err();

    assert!(matches!(err, batch_export::Error::Source { .. }));
}

// ============================================================================
// CLI Integration Tests
// ============================================================================

fn write_config(dir: &TempDir, database: &Path, destination: &Path) -> std::path::PathBuf {
    let path = dir.path().join("export.yaml");
    let yaml = format!(
        r"
source:
  engine: duckdb
  connection:
    connection_string: {}
  table: dummy_users
destination:
  url: {}
run:
  page_size: 30
  concurrency: 3
",
        database.display(),
        destination.display()
    );
    std::fs::write(&path, yaml).unwrap();

    // Fail early if the file does not round-trip
    ExportSettings::from_file(&path).unwrap();
    path
}

#[tokio::test]
async fn test_cli_seed_then_export() {
    let work_dir = tempfile::tempdir().unwrap();
    let out_dir = work_dir.path().join("out");
    let database = work_dir.path().join("cli.duckdb");
    let config = write_config(&work_dir, &database, &out_dir);
    let config = config.to_str().unwrap();

    let seed = Cli::try_parse_from(["batch-export", "-C", config, "seed", "--rows", "70"]).unwrap();
    assert_eq!(Runner::new(seed).run().await, ExitCode::Success);

    let export = Cli::try_parse_from(["batch-export", "-C", config, "export"]).unwrap();
    assert_eq!(Runner::new(export).run().await, ExitCode::Success);

    assert_eq!(
        batch_files(&out_dir),
        vec!["batch_0.json", "batch_1.json", "batch_2.json"]
    );
    assert_eq!(read_batch(&out_dir, "batch_2.json").len(), 10);
}

#[tokio::test]
async fn test_cli_check_reports_success() {
    let work_dir = tempfile::tempdir().unwrap();
    let database = work_dir.path().join("check.duckdb");
    let config = write_config(&work_dir, &database, &work_dir.path().join("out"));

    let cli = Cli::try_parse_from(["batch-export", "-C", config.to_str().unwrap(), "check"]).unwrap();
    assert_eq!(Runner::new(cli).run().await, ExitCode::Success);
}

#[tokio::test]
async fn test_cli_without_config_fails() {
    let cli = Cli::try_parse_from(["batch-export", "export"]).unwrap();
    assert_eq!(Runner::new(cli).run().await, ExitCode::GeneralError);
}
