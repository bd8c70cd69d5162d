//! One full sync session driven from files on disk.

use crate::config::Config;
use crate::error::{AppError, Result};
use bough_engine::{
    FinishReport, MemoryStore, ProcessOutcome, RemoteRecord, Session, SessionConfig, StoreSnapshot,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Counts of what a replay did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub processed: usize,
    pub stored: usize,
    pub deleted: usize,
    pub skipped: usize,
    /// Folders whose child order was finalized
    pub finalized: usize,
    /// Folders whose finalization failed
    pub failed: usize,
    /// Records still parked in the fallback folder
    pub pending_orphans: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.processed += 1;
        match outcome {
            ProcessOutcome::Stored { .. } => self.stored += 1,
            ProcessOutcome::Deleted { .. } => self.deleted += 1,
            ProcessOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    fn finish(&mut self, report: &FinishReport) {
        self.finalized = report.finalized.len();
        self.failed = report.failures.len();
        self.pending_orphans = report.pending_orphans;
    }
}

/// Load the store, replay the feed, and write the resulting snapshot.
pub async fn run(config: &Config) -> Result<ReplaySummary> {
    let store = Arc::new(load_store(&config.store_path).await?);
    let records = load_records(&config.records_path).await?;
    tracing::info!(
        rows = store.len(),
        records = records.len(),
        "Loaded store and record feed"
    );

    let session_config =
        SessionConfig::default().with_personal_info_logging(config.log_personal_info);
    let summary = replay(store.clone(), records, session_config).await?;

    save_store(&store, &config.output_path).await?;
    tracing::info!(path = %config.output_path.display(), "Wrote store snapshot");
    Ok(summary)
}

/// Run one session over `records` against `store`.
pub async fn replay(
    store: Arc<MemoryStore>,
    records: Vec<RemoteRecord>,
    config: SessionConfig,
) -> Result<ReplaySummary> {
    let mut session = Session::new(store, config);
    session.begin()?;

    let mut summary = ReplaySummary::default();
    for record in records {
        let outcome = session.process(record)?;
        summary.record(&outcome);
    }

    let report = session.store_done()?.wait().await?;
    for failure in &report.failures {
        tracing::warn!(folder = %failure.guid, error = %failure.error, "Folder not finalized");
    }
    summary.finish(&report);
    Ok(summary)
}

/// Read a store snapshot. A missing file is an empty store.
pub async fn load_store(path: &Path) -> Result<MemoryStore> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => Ok(MemoryStore::from_snapshot(StoreSnapshot::from_json(&json)?)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No snapshot; starting from an empty store");
            Ok(MemoryStore::new())
        }
        Err(e) => Err(AppError::io(path, e)),
    }
}

/// Read a JSON array of records.
pub async fn load_records(path: &Path) -> Result<Vec<RemoteRecord>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&json).map_err(|source| AppError::Records {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a store snapshot as pretty JSON.
pub async fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = store.export_snapshot().to_json_pretty()?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| AppError::io(path, e))
}
