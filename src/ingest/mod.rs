// src/ingest/mod.rs
mod client;
mod error;
mod fda;
mod models;
mod usda;

pub use client::{FeedClient, RetryPolicy};
pub use error::IngestError;

use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::db::ingest_runs::{end_ingest_run, start_ingest_run};
use crate::db::recalls::upsert_recall;
use crate::domain::recall::{RecallSnapshot, RecallSource};
use chrono::{Duration, Utc};

/// Feed locations and window for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub fsis_url: String,
    pub openfda_url: String,
    pub openfda_lookback_days: i64,
}

impl From<&AppConfig> for IngestSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            fsis_url: cfg.fsis_url.clone(),
            openfda_url: cfg.openfda_url.clone(),
            openfda_lookback_days: cfg.openfda_lookback_days,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub seen: usize,
    pub stored: usize,
}

/// Upsert a batch of snapshots in one transaction. Returns how many were written.
pub fn store_snapshots(db: &Database, snapshots: &[RecallSnapshot]) -> Result<usize, IngestError> {
    let now = Utc::now();
    db.with_conn(|conn| {
        let tx = conn.transaction().map_err(crate::errors::ServerError::from)?;
        for snapshot in snapshots {
            upsert_recall(&tx, snapshot, now)?;
        }
        tx.commit().map_err(crate::errors::ServerError::from)?;
        Ok::<_, IngestError>(snapshots.len())
    })
}

/// Fetch one feed and store everything it returns.
pub fn run_ingest(
    db: &Database,
    client: &FeedClient,
    settings: &IngestSettings,
    source: RecallSource,
) -> Result<IngestStats, IngestError> {
    match source {
        RecallSource::Usda => {
            let recalls = usda::fetch_usda_recalls(client, &settings.fsis_url)?;
            let snapshots: Vec<RecallSnapshot> =
                recalls.into_iter().map(RecallSnapshot::Usda).collect();
            let stored = store_snapshots(db, &snapshots)?;
            Ok(IngestStats {
                seen: snapshots.len(),
                stored,
            })
        }
        RecallSource::Fda => {
            let to = Utc::now().date_naive();
            let from = to - Duration::days(settings.openfda_lookback_days);
            let mut stored = 0;
            let seen = fda::fetch_fda_recalls(client, &settings.openfda_url, from, to, |page| {
                let snapshots: Vec<RecallSnapshot> =
                    page.into_iter().map(RecallSnapshot::Fda).collect();
                stored += store_snapshots(db, &snapshots)?;
                Ok(())
            })?;
            Ok(IngestStats { seen, stored })
        }
        RecallSource::TempFda => Err(IngestError::UnexpectedShape(
            "TEMP_FDA recalls are entered manually, not ingested".into(),
        )),
    }
}

/// Run an ingestion on its own thread, recording it in `ingest_runs`.
pub fn spawn_ingest(db: &Database, settings: IngestSettings, source: RecallSource) {
    let db = db.clone();

    std::thread::spawn(move || {
        let run_id = match db.with_conn(|conn| start_ingest_run(conn, source, Utc::now().timestamp())) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(%source, error = %e, "could not record ingest start");
                return;
            }
        };

        tracing::info!(%source, run_id, "ingest started");

        let result = FeedClient::new(RetryPolicy::default())
            .and_then(|client| run_ingest(&db, &client, &settings, source));

        let (stats, error) = match result {
            Ok(stats) => {
                tracing::info!(%source, run_id, seen = stats.seen, stored = stats.stored, "ingest complete");
                (stats, None)
            }
            Err(e) => {
                tracing::error!(%source, run_id, error = %e, "ingest failed");
                (IngestStats::default(), Some(e.to_string()))
            }
        };

        let recorded = db.with_conn(|conn| {
            end_ingest_run(
                conn,
                run_id,
                Utc::now().timestamp(),
                stats.seen,
                stats.stored,
                error,
            )
        });
        if let Err(e) = recorded {
            tracing::warn!(run_id, error = %e, "could not record ingest result");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::recalls::{get_recall, list_recalls, RecallFilter};

    #[test]
    fn stored_snapshots_are_listed_by_state() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ingest.sqlite").to_string_lossy().to_string());
        crate::db::init_db(&db, "sql/schema.sql").unwrap();

        let records: Vec<models::FsisRecord> = serde_json::from_str(
            r#"[
                {"field_recall_number": "010-2024", "field_title": "Chicken", "field_states": "Georgia, FL", "langcode": "English"},
                {"field_recall_number": "011-2024", "field_title": "Beef", "field_states": "Nationwide", "langcode": "English"}
            ]"#,
        )
        .unwrap();
        let snapshots: Vec<RecallSnapshot> = usda::normalize_fsis(records)
            .into_iter()
            .map(RecallSnapshot::Usda)
            .collect();

        assert_eq!(store_snapshots(&db, &snapshots).unwrap(), 2);

        let florida = db
            .with_conn(|conn| {
                list_recalls(
                    conn,
                    &RecallFilter {
                        state: Some("Florida".into()),
                        ..Default::default()
                    },
                )
            })
            .unwrap();
        assert_eq!(florida.len(), 2);

        let stored = db
            .with_conn(|conn| get_recall(conn, RecallSource::Usda, "010-2024"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.affected_states, vec!["Florida", "Georgia"]);
    }

    #[test]
    fn temp_fda_is_not_a_feed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ingest.sqlite").to_string_lossy().to_string());
        let client = FeedClient::new(RetryPolicy::default()).unwrap();
        let settings = IngestSettings::from(&AppConfig::default());

        let res = run_ingest(&db, &client, &settings, RecallSource::TempFda);
        assert!(matches!(res, Err(IngestError::UnexpectedShape(_))));
    }
}
