//! Record sync: fetch, classify, merge and persist.
//!
//! Persistence sits behind [`RecordRepository`]. A sync run fetches records
//! of one type (incrementally from the last successful run unless a full
//! sync is requested), merges each record's custom fields with what was
//! stored before and writes the result back.
//!
//! The sync point only advances after a run that stored records and skipped
//! none, so records that failed to fetch are picked up again next time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::error::NetSuiteResult;
use crate::fetch::{incremental_filter, FetchOptions, RecordFetchFailure, TwoStepFetcher};
use crate::fields::{ClassifiedRecord, CustomFieldMap, FieldClassifier, KnownFieldSet};
use crate::types::Record;

/// Outcome of the last successful sync of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMetadata {
    pub last_sync_at: DateTime<Utc>,
    pub records_synced: usize,
}

/// Storage for classified records.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Stored custom-field envelopes for a record; empty if none.
    async fn load_custom_fields(
        &self,
        record_type: &str,
        record_id: &str,
    ) -> NetSuiteResult<CustomFieldMap>;

    /// Insert or replace a record.
    async fn upsert(&self, record_type: &str, record: StoredRecord) -> NetSuiteResult<()>;

    async fn last_sync(&self, record_type: &str) -> NetSuiteResult<Option<SyncMetadata>>;

    async fn record_sync(&self, record_type: &str, metadata: SyncMetadata) -> NetSuiteResult<()>;
}

/// A classified record keyed by its NetSuite id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub known_fields: Map<String, Value>,
    pub custom_fields: CustomFieldMap,
    pub raw: Record,
    pub synced_at: DateTime<Utc>,
}

/// In-memory repository.
#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: Mutex<HashMap<(String, String), StoredRecord>>,
    syncs: Mutex<HashMap<String, SyncMetadata>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_type: &str, record_id: &str) -> Option<StoredRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(record_type.to_string(), record_id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn load_custom_fields(
        &self,
        record_type: &str,
        record_id: &str,
    ) -> NetSuiteResult<CustomFieldMap> {
        Ok(self
            .get(record_type, record_id)
            .map(|record| record.custom_fields)
            .unwrap_or_default())
    }

    async fn upsert(&self, record_type: &str, record: StoredRecord) -> NetSuiteResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((record_type.to_string(), record.id.clone()), record);
        Ok(())
    }

    async fn last_sync(&self, record_type: &str) -> NetSuiteResult<Option<SyncMetadata>> {
        Ok(self
            .syncs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(record_type)
            .cloned())
    }

    async fn record_sync(&self, record_type: &str, metadata: SyncMetadata) -> NetSuiteResult<()> {
        self.syncs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record_type.to_string(), metadata);
        Ok(())
    }
}

/// Options for a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Ignore the last sync and fetch everything.
    pub full: bool,
    /// Fetch and classify without writing.
    pub dry_run: bool,
    /// Overrides the built-in known field set for the record type.
    pub known_fields: Option<KnownFieldSet>,
    pub fetch: FetchOptions,
}

/// Outcome of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub record_type: String,
    pub incremental_since: Option<NaiveDate>,
    pub fetched: usize,
    pub stored: usize,
    /// Records that failed to fetch.
    pub failures: Vec<RecordFetchFailure>,
    /// Fetched records without an id.
    pub missing_id: usize,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.failures.len() + self.missing_id
    }
}

/// Drives fetch, classification and persistence for one record type at a time.
pub struct SyncEngine {
    fetcher: TwoStepFetcher,
    repository: Arc<dyn RecordRepository>,
}

impl SyncEngine {
    pub fn new(fetcher: TwoStepFetcher, repository: Arc<dyn RecordRepository>) -> Self {
        Self {
            fetcher,
            repository,
        }
    }

    pub async fn sync(
        &self,
        record_type: &str,
        options: &SyncOptions,
    ) -> NetSuiteResult<SyncReport> {
        let started_at = Utc::now();
        let mut fetch_options = options.fetch.clone();

        let incremental_since = if options.full {
            None
        } else {
            self.repository
                .last_sync(record_type)
                .await?
                .map(|meta| meta.last_sync_at.date_naive())
        };

        if let Some(since) = incremental_since {
            let since_filter = incremental_filter(since);
            fetch_options.filter = Some(match fetch_options.filter.take() {
                Some(existing) => format!("{} AND {}", existing, since_filter),
                None => since_filter,
            });
            tracing::info!(record_type = record_type, since = %since, "Incremental sync");
        } else {
            tracing::info!(record_type = record_type, "Full sync");
        }

        let fetched = self.fetcher.fetch_all(record_type, &fetch_options).await?;

        let classifier = match &options.known_fields {
            Some(known) => FieldClassifier::new(known.clone()),
            None => FieldClassifier::for_record_type(record_type),
        };

        let mut report = SyncReport {
            record_type: record_type.to_string(),
            incremental_since,
            fetched: fetched.records.len(),
            failures: fetched.failures,
            dry_run: options.dry_run,
            ..SyncReport::default()
        };

        for record in fetched.records {
            let Some(record_id) = crate::fields::record_id(&record) else {
                tracing::warn!(record_type = record_type, "Fetched record has no id; skipping");
                report.missing_id += 1;
                continue;
            };

            let existing = self
                .repository
                .load_custom_fields(record_type, &record_id)
                .await?;
            let ClassifiedRecord {
                known_fields,
                custom_fields,
                raw,
                ..
            } = classifier.classify(record, &existing, started_at);

            if options.dry_run {
                continue;
            }

            self.repository
                .upsert(
                    record_type,
                    StoredRecord {
                        id: record_id,
                        known_fields,
                        custom_fields,
                        raw,
                        synced_at: started_at,
                    },
                )
                .await?;
            report.stored += 1;
        }

        if report.skipped() > 0 {
            tracing::warn!(
                record_type = record_type,
                skipped = report.skipped(),
                "Records were skipped; keeping the previous sync point"
            );
        } else if report.stored > 0 {
            self.repository
                .record_sync(
                    record_type,
                    SyncMetadata {
                        last_sync_at: started_at,
                        records_synced: report.stored,
                    },
                )
                .await?;
        }

        tracing::info!(
            record_type = record_type,
            fetched = report.fetched,
            stored = report.stored,
            skipped = report.skipped(),
            dry_run = report.dry_run,
            "Sync complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::CustomFieldEnvelope;
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_repository() {
        let repo = InMemoryRecordRepository::new();
        assert!(repo.is_empty());
        assert!(repo.load_custom_fields("vendor", "1").await.unwrap().is_empty());

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut custom = CustomFieldMap::new();
        custom.insert("custentity_a".into(), CustomFieldEnvelope::new(json!(1), now));

        repo.upsert(
            "vendor",
            StoredRecord {
                id: "1".into(),
                known_fields: Map::new(),
                custom_fields: custom.clone(),
                raw: Map::new(),
                synced_at: now,
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.load_custom_fields("vendor", "1").await.unwrap(), custom);
        assert!(repo.get("vendorbill", "1").is_none());

        assert!(repo.last_sync("vendor").await.unwrap().is_none());
        let meta = SyncMetadata {
            last_sync_at: now,
            records_synced: 1,
        };
        repo.record_sync("vendor", meta.clone()).await.unwrap();
        assert_eq!(repo.last_sync("vendor").await.unwrap(), Some(meta));
    }
}
