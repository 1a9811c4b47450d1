//! Integration tests for record sync.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{fast_retry, list_page, tba_client};
use integrations_netsuite::fetch::incremental_filter;
use integrations_netsuite::sync::SyncMetadata;
use integrations_netsuite::{
    InMemoryRecordRepository, KnownFieldSet, RecordRepository, SyncEngine, SyncOptions,
    TwoStepFetcher,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine(server: &MockServer, repository: Arc<InMemoryRecordRepository>) -> SyncEngine {
    SyncEngine::new(
        TwoStepFetcher::new(tba_client(server, fast_retry(1))),
        repository,
    )
}

fn options() -> SyncOptions {
    SyncOptions {
        known_fields: Some(KnownFieldSet::from_fields(["id", "name"])),
        ..SyncOptions::default()
    }
}

#[tokio::test]
async fn test_full_sync_stores_records_and_metadata() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1"], 0, false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1",
            "name": "Acme",
            "custentity_region": "West"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let engine = engine(&server, repository.clone());

    // Act
    let report = engine.sync("vendor", &options()).await.unwrap();

    // Assert
    assert_eq!(report.fetched, 1);
    assert_eq!(report.stored, 1);
    assert_eq!(report.incremental_since, None);

    let stored = repository.get("vendor", "1").unwrap();
    assert_eq!(stored.known_fields["name"], "Acme");
    assert_eq!(stored.custom_fields["custentity_region"].value, json!("West"));

    let meta = repository.last_sync("vendor").await.unwrap().unwrap();
    assert_eq!(meta.records_synced, 1);
}

#[tokio::test]
async fn test_incremental_sync_filters_and_merges() {
    // Arrange: a previous sync stored custentity_old for record 1.
    let server = MockServer::start().await;
    let last_sync = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
    let expected_filter = incremental_filter(last_sync.date_naive());

    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .and(query_param("q", expected_filter.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1"], 0, false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1",
            "name": "Acme",
            "custentity_new": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let mut previous = integrations_netsuite::CustomFieldMap::new();
    previous.insert(
        "custentity_old".into(),
        integrations_netsuite::CustomFieldEnvelope::new(json!("legacy"), last_sync),
    );
    repository
        .upsert(
            "vendor",
            integrations_netsuite::sync::StoredRecord {
                id: "1".into(),
                known_fields: Default::default(),
                custom_fields: previous,
                raw: Default::default(),
                synced_at: last_sync,
            },
        )
        .await
        .unwrap();
    repository
        .record_sync(
            "vendor",
            SyncMetadata {
                last_sync_at: last_sync,
                records_synced: 1,
            },
        )
        .await
        .unwrap();

    // Act
    let report = engine(&server, repository.clone())
        .sync("vendor", &options())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.incremental_since, Some(last_sync.date_naive()));
    let stored = repository.get("vendor", "1").unwrap();
    let old = &stored.custom_fields["custentity_old"];
    assert!(old.deprecated);
    assert_eq!(old.value, json!("legacy"));
    assert!(!stored.custom_fields["custentity_new"].deprecated);

    let meta = repository.last_sync("vendor").await.unwrap().unwrap();
    assert!(meta.last_sync_at > last_sync);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1"], 0, false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let report = engine(&server, repository.clone())
        .sync(
            "vendor",
            &SyncOptions {
                dry_run: true,
                ..options()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.stored, 0);
    assert!(repository.is_empty());
    assert!(repository.last_sync("vendor").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_sync_keeps_previous_high_water_mark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&[], 0, false)))
        .expect(1)
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let previous = SyncMetadata {
        last_sync_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        records_synced: 10,
    };
    repository
        .record_sync("vendor", previous.clone())
        .await
        .unwrap();

    let report = engine(&server, repository.clone())
        .sync("vendor", &options())
        .await
        .unwrap();

    assert_eq!(report.stored, 0);
    assert_eq!(
        repository.last_sync("vendor").await.unwrap(),
        Some(previous)
    );
}

#[tokio::test]
async fn test_failed_record_keeps_previous_high_water_mark() {
    // Arrange: record 2 fails, record 1 is stored.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1", "2"], 0, false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1", "name": "Acme"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"title": "Record not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let previous = SyncMetadata {
        last_sync_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        records_synced: 10,
    };
    repository
        .record_sync("vendor", previous.clone())
        .await
        .unwrap();

    // Act
    let report = engine(&server, repository.clone())
        .sync("vendor", &SyncOptions { full: true, ..options() })
        .await
        .unwrap();

    // Assert
    assert_eq!(report.stored, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, "2");
    assert!(repository.get("vendor", "1").is_some());
    assert_eq!(
        repository.last_sync("vendor").await.unwrap(),
        Some(previous)
    );
}

#[tokio::test]
async fn test_failed_first_sync_records_no_high_water_mark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1", "2"], 0, false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor/2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let repository = Arc::new(InMemoryRecordRepository::new());
    let report = engine(&server, repository.clone())
        .sync("vendor", &options())
        .await
        .unwrap();

    assert_eq!(report.skipped(), 1);
    assert!(repository.last_sync("vendor").await.unwrap().is_none());
}
