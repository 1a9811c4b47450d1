//! Two-step record fetch.
//!
//! NetSuite list endpoints return id stubs only. A complete export therefore
//! pages through the list to collect every id, then fetches each record by
//! id. For `N` records at page size `P` this costs `ceil(N / P)` list calls
//! plus `N` record calls, so a full export scales linearly with `N`.
//! Narrow it with [`incremental_filter`] or raise the concurrency.
//!
//! Failures while listing are fatal. A failure fetching one record is
//! reported in [`FetchReport::failures`] and the batch continues.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::client::NetSuiteClient;
use crate::config::{NetSuiteConfig, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE};
use crate::error::{NetSuiteError, NetSuiteResult};
use crate::types::{ListQuery, Record};

/// Options for a fetch run.
///
/// Page size and concurrency left unset fall back to the client's
/// [`NetSuiteConfig`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub page_size: Option<u32>,
    /// Per-record fetches in flight.
    pub concurrency: Option<usize>,
    /// Stop collecting ids after this many.
    pub max_records: Option<usize>,
    /// NetSuite `q` filter applied to list calls.
    pub filter: Option<String>,
    /// Restrict the fields returned for each record.
    pub fields: Option<Vec<String>>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Only records modified on or after `since`.
    pub fn modified_since(self, since: NaiveDate) -> Self {
        self.filter(incremental_filter(since))
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Fill unset page size and concurrency from `config`.
    pub fn with_defaults_from(mut self, config: &NetSuiteConfig) -> Self {
        self.page_size.get_or_insert(config.page_size);
        self.concurrency.get_or_insert(config.concurrency);
        self
    }

    fn effective_page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }
}

impl From<&NetSuiteConfig> for FetchOptions {
    fn from(config: &NetSuiteConfig) -> Self {
        Self::default().with_defaults_from(config)
    }
}

/// `lastModifiedDate ON_OR_AFTER "MM/DD/YYYY"`.
///
/// ```
/// use chrono::NaiveDate;
/// use integrations_netsuite::fetch::incremental_filter;
///
/// let since = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// assert_eq!(incremental_filter(since), r#"lastModifiedDate ON_OR_AFTER "01/05/2024""#);
/// ```
pub fn incremental_filter(since: NaiveDate) -> String {
    format!(
        "lastModifiedDate ON_OR_AFTER \"{}\"",
        since.format("%m/%d/%Y")
    )
}

/// A record that could not be fetched.
#[derive(Debug)]
pub struct RecordFetchFailure {
    pub record_id: String,
    pub error: NetSuiteError,
}

/// Outcome of a fetch run.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub record_type: String,
    /// Complete records, in id order.
    pub records: Vec<Record>,
    pub failures: Vec<RecordFetchFailure>,
    pub ids_collected: usize,
    pub list_calls: usize,
}

impl FetchReport {
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ids collected from the list phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedIds {
    pub ids: Vec<String>,
    pub list_calls: usize,
}

/// Runs the list-then-get fetch.
pub struct TwoStepFetcher {
    client: Arc<NetSuiteClient>,
}

impl TwoStepFetcher {
    pub fn new(client: Arc<NetSuiteClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<NetSuiteClient> {
        &self.client
    }

    /// Page through the list endpoint and collect every id.
    ///
    /// Ids are kept in order of first appearance without duplicates.
    pub async fn collect_ids(
        &self,
        record_type: &str,
        options: &FetchOptions,
    ) -> NetSuiteResult<CollectedIds> {
        let options = options.clone().with_defaults_from(self.client.config());
        let page_size = options.effective_page_size();
        let mut seen = HashSet::new();
        let mut collected = CollectedIds::default();
        let mut offset: u64 = 0;

        loop {
            let mut query = ListQuery::new(page_size, offset);
            if let Some(filter) = &options.filter {
                query = query.with_filter(filter.clone());
            }

            let page = self.client.query_records(record_type, &query).await?;
            collected.list_calls += 1;

            let page_len = page.items.len();
            for item in page.items {
                if seen.insert(item.id.clone()) {
                    collected.ids.push(item.id);
                }
            }

            tracing::debug!(
                record_type = record_type,
                offset = offset,
                page_items = page_len,
                total_ids = collected.ids.len(),
                has_more = page.has_more,
                "Listed page"
            );

            if let Some(max) = options.max_records {
                if collected.ids.len() >= max {
                    collected.ids.truncate(max);
                    tracing::info!(
                        record_type = record_type,
                        max_records = max,
                        "Reached record limit"
                    );
                    break;
                }
            }

            if !page.has_more {
                break;
            }

            if page_len == 0 {
                tracing::warn!(
                    record_type = record_type,
                    offset = offset,
                    "Empty page reported more results; stopping"
                );
                break;
            }

            offset += u64::from(page_size);
        }

        Ok(collected)
    }

    /// Collect all ids, then fetch each complete record.
    pub async fn fetch_all(
        &self,
        record_type: &str,
        options: &FetchOptions,
    ) -> NetSuiteResult<FetchReport> {
        tracing::info!(record_type = record_type, "Collecting record ids");
        let options = options.clone().with_defaults_from(self.client.config());
        let collected = self.collect_ids(record_type, &options).await?;

        tracing::info!(
            record_type = record_type,
            ids = collected.ids.len(),
            list_calls = collected.list_calls,
            "Fetching complete records"
        );

        let fields: Option<Vec<&str>> = options
            .fields
            .as_ref()
            .map(|f| f.iter().map(String::as_str).collect());

        let results: Vec<(String, NetSuiteResult<Record>)> = stream::iter(collected.ids.iter())
            .map(|id| {
                let fields = fields.as_deref();
                async move {
                    let result = self.client.get_record(record_type, id, fields).await;
                    (id.clone(), result)
                }
            })
            .buffered(options.effective_concurrency())
            .collect()
            .await;

        let mut report = FetchReport {
            record_type: record_type.to_string(),
            ids_collected: collected.ids.len(),
            list_calls: collected.list_calls,
            ..FetchReport::default()
        };

        for (record_id, result) in results {
            match result {
                Ok(record) => report.records.push(record),
                Err(error) => {
                    tracing::warn!(
                        record_type = record_type,
                        record_id = %record_id,
                        error = %error,
                        "Skipping record that failed to fetch"
                    );
                    report.failures.push(RecordFetchFailure { record_id, error });
                }
            }
        }

        let metrics = self.client.metrics();
        metrics.record_records_fetched(report.records.len() as u64);
        metrics.record_records_skipped(report.failures.len() as u64);

        tracing::info!(
            record_type = record_type,
            fetched = report.records.len(),
            skipped = report.skipped(),
            "Fetch complete"
        );

        Ok(report)
    }
}
