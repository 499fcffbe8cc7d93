//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, ModeArg, OutputFormat};
use crate::cli::shutdown::{ExitCode, ShutdownCoordinator};
use crate::config::{ExportSettings, SourceEngine, SourceSettings};
use crate::error::{Error, Result};
use crate::pipeline::BatchExportPipeline;
use crate::serialize::{JsonSerializer, PageSerializer};
use crate::sink::{ObjectStoreSink, Sink, StagingMode};
use crate::source::{DuckDbSource, TableSchema};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Flag overrides for the export command
#[derive(Debug, Default)]
struct ExportOverrides {
    destination: Option<String>,
    query: Option<String>,
    prefix: Option<String>,
    page_size: Option<usize>,
    concurrency: Option<usize>,
    mode: Option<ModeArg>,
    deadline_secs: Option<u64>,
    staging_dir: Option<PathBuf>,
}

impl ExportOverrides {
    fn apply(self, settings: &mut ExportSettings) {
        if let Some(url) = self.destination {
            settings.destination.url = url;
        }
        if let Some(query) = self.query {
            settings.source.query = Some(query);
        }
        if let Some(prefix) = self.prefix {
            settings.destination.prefix = prefix;
        }
        if let Some(page_size) = self.page_size {
            settings.run.page_size = page_size;
        }
        if let Some(concurrency) = self.concurrency {
            settings.run.concurrency = concurrency;
        }
        if let Some(mode) = self.mode {
            settings.run.mode = mode.into();
        }
        if let Some(secs) = self.deadline_secs {
            settings.run.deadline_secs = Some(secs);
        }
        if let Some(dir) = self.staging_dir {
            settings.run.staging = StagingMode::Disk { dir: Some(dir) };
        }
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
    shutdown: ShutdownCoordinator,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            shutdown: ShutdownCoordinator::new(CancellationToken::new()),
        }
    }

    /// Run the CLI command and map the outcome to an exit code
    pub async fn run(&self) -> ExitCode {
        match self.execute().await {
            Ok(code) => code,
            Err(e) => {
                error!("{e}");
                eprintln!("Error: {e}");
                ExitCode::GeneralError
            }
        }
    }

    async fn execute(&self) -> Result<ExitCode> {
        match &self.cli.command {
            Commands::Export {
                destination,
                query,
                prefix,
                page_size,
                concurrency,
                mode,
                deadline_secs,
                staging_dir,
            } => {
                let overrides = ExportOverrides {
                    destination: destination.clone(),
                    query: query.clone(),
                    prefix: prefix.clone(),
                    page_size: *page_size,
                    concurrency: *concurrency,
                    mode: *mode,
                    deadline_secs: *deadline_secs,
                    staging_dir: staging_dir.clone(),
                };
                self.export(overrides).await
            }
            Commands::Seed {
                table,
                rows,
                batch_size,
            } => self.seed(table, *rows, *batch_size),
            Commands::Check => self.check().await,
        }
    }

    /// Load settings from the config file
    fn load_settings(&self) -> Result<ExportSettings> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Configuration file not specified (use -C flag)"))?;
        ExportSettings::from_file(path)
    }

    /// Export the configured query
    async fn export(&self, overrides: ExportOverrides) -> Result<ExitCode> {
        let mut settings = self.load_settings()?;
        overrides.apply(&mut settings);

        self.shutdown.register_handlers();
        let config = settings.export_config(self.shutdown.cancel_token())?;

        let source = DuckDbSource::new(settings.source.engine, &settings.source.connection)?;
        let query = resolve_query(&settings.source, &source)?;

        let serializer = JsonSerializer::new();
        let sink = ObjectStoreSink::parse(&settings.destination.url)?
            .with_content_type(serializer.content_type());
        sink.ensure_container_exists().await?;

        info!(
            "Exporting to {}",
            sink.describe(&settings.destination.prefix)
        );

        let pipeline = BatchExportPipeline::new(Arc::new(sink), Arc::new(serializer))
            .with_config(config);
        let summary = pipeline.run(&source, &query).await?;

        self.output_message(&serde_json::to_value(&summary)?);

        if self.shutdown.is_shutdown_requested() {
            return Ok(ExitCode::ShutdownRequested);
        }
        Ok(ExitCode::from(summary.status()))
    }

    /// Create the dummy table and seed it
    fn seed(&self, table: &str, rows: usize, batch_size: usize) -> Result<ExitCode> {
        let settings = self.load_settings()?;
        let source = DuckDbSource::new(settings.source.engine, &settings.source.connection)?;

        let created = source.ensure_table_exists(&TableSchema::dummy_users(table))?;
        let inserted = source.seed_dummy_rows(table, rows, batch_size)?;
        let total = source.count(&format!("SELECT * FROM {table}"))?;

        self.output_message(&json!({
            "type": "SEED",
            "seed": {
                "table": table,
                "created": created,
                "inserted": inserted,
                "total": total
            }
        }));

        Ok(ExitCode::Success)
    }

    /// Check the source and the destination
    async fn check(&self) -> Result<ExitCode> {
        let settings = self.load_settings()?;
        settings.validate()?;

        let source_status = DuckDbSource::new(settings.source.engine, &settings.source.connection)
            .and_then(|source| {
                source.check_connection()?;
                Ok(source.connection_info())
            });

        let destination_status = match ObjectStoreSink::parse(&settings.destination.url) {
            Ok(sink) => sink
                .ensure_container_exists()
                .await
                .map(|()| sink.describe(&settings.destination.prefix)),
            Err(e) => Err(e),
        };

        let succeeded = source_status.is_ok() && destination_status.is_ok();
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if succeeded { "SUCCEEDED" } else { "FAILED" },
                "source": status_message(&settings.source.engine.to_string(), source_status),
                "destination": status_message("destination", destination_status),
            }
        }));

        Ok(if succeeded {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        })
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// The query to export; bare tables of attached databases are qualified
fn resolve_query(settings: &SourceSettings, source: &DuckDbSource) -> Result<String> {
    match (&settings.query, &settings.table) {
        (None, Some(table)) if settings.engine != SourceEngine::Duckdb => {
            Ok(format!("SELECT * FROM {}", source.qualify_table(table)))
        }
        _ => settings.query(),
    }
}

fn status_message(what: &str, status: Result<String>) -> Value {
    match status {
        Ok(location) => json!({
            "status": "SUCCEEDED",
            "message": format!("Connected to {location}")
        }),
        Err(e) => json!({
            "status": "FAILED",
            "message": format!("{what} check failed: {e}")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ExportSettings {
        ExportSettings::from_yaml_str(
            r"
source:
  table: users
destination:
  url: memory://
",
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_settings() {
        let mut settings = settings();
        ExportOverrides {
            destination: Some("gs://bucket".to_string()),
            page_size: Some(10),
            mode: Some(ModeArg::Sequential),
            staging_dir: Some(PathBuf::from("/tmp/staging")),
            ..ExportOverrides::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.destination.url, "gs://bucket");
        assert_eq!(settings.destination.prefix, "bq_exports/");
        assert_eq!(settings.run.page_size, 10);
        assert_eq!(settings.run.concurrency, 10);
        assert_eq!(settings.run.mode, crate::types::ScheduleMode::Sequential);
        assert_eq!(
            settings.run.staging,
            StagingMode::Disk {
                dir: Some(PathBuf::from("/tmp/staging"))
            }
        );
    }

    #[test]
    fn test_resolve_query_for_native_table() {
        let source = DuckDbSource::in_memory().unwrap();
        let query = resolve_query(&settings().source, &source).unwrap();
        assert_eq!(query, "SELECT * FROM users");
    }

    #[test]
    fn test_resolve_query_prefers_custom_query() {
        let mut settings = settings();
        settings.source.query = Some("SELECT id FROM users WHERE id > 10".to_string());
        let source = DuckDbSource::in_memory().unwrap();
        let query = resolve_query(&settings.source, &source).unwrap();
        assert_eq!(query, "SELECT id FROM users WHERE id > 10");
    }
}
