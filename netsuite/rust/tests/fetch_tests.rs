//! Integration tests for the two-step fetch against a mock NetSuite.

mod common;

use std::sync::Arc;

use common::{fast_retry, list_page, tba_client, tba_config, ValidTbaSignature};
use integrations_netsuite::fields::CustomFieldMap;
use integrations_netsuite::{
    FetchOptions, FieldClassifier, KnownFieldSet, NetSuiteClient, NetSuiteError, RetryConfig,
    TwoStepFetcher,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_list_page(server: &MockServer, offset: u64, ids: &[&str], has_more: bool) {
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .and(query_param("offset", offset.to_string()))
        .and(ValidTbaSignature::new(server))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(ids, offset, has_more)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_record(server: &MockServer, id: &str, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "links": [{"rel": "self", "href": format!("https://x/vendor/{}", id)}],
            "id": id,
            "name": format!("Vendor {}", id),
            "custentity_region": "West"
        }))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({"title": "Record not found"}))
    };

    Mock::given(method("GET"))
        .and(path(format!("/record/v1/vendor/{}", id)))
        .and(ValidTbaSignature::new(server))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_collect_ids_follows_pagination() {
    // Arrange: two pages report more results, the third is last.
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2"], true).await;
    mount_list_page(&server, 2, &["2", "3"], true).await;
    mount_list_page(&server, 4, &["4"], false).await;

    let fetcher = TwoStepFetcher::new(tba_client(&server, fast_retry(1)));

    // Act
    let collected = fetcher
        .collect_ids("vendor", &FetchOptions::new().page_size(2))
        .await
        .unwrap();

    // Assert
    assert_eq!(collected.ids, vec!["1", "2", "3", "4"]);
    assert_eq!(collected.list_calls, 3);
}

#[tokio::test]
async fn test_configured_page_size_is_used_by_default() {
    // Arrange: page size comes from the client config, not the options.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "0"))
        .and(ValidTbaSignature::new(&server))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["1", "2", "3", "4", "5"], 0, true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "5"))
        .and(ValidTbaSignature::new(&server))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&["6"], 5, false)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = tba_config(&server, fast_retry(1));
    config.page_size = 5;
    let fetcher = TwoStepFetcher::new(Arc::new(NetSuiteClient::new(config).unwrap()));

    // Act
    let collected = fetcher
        .collect_ids("vendor", &FetchOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(collected.ids, vec!["1", "2", "3", "4", "5", "6"]);
    assert_eq!(collected.list_calls, 2);
}

#[tokio::test]
async fn test_max_records_stops_listing() {
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2"], true).await;
    mount_list_page(&server, 2, &["3", "4"], true).await;

    let fetcher = TwoStepFetcher::new(tba_client(&server, fast_retry(1)));
    let collected = fetcher
        .collect_ids("vendor", &FetchOptions::new().page_size(2).max_records(3))
        .await
        .unwrap();

    assert_eq!(collected.ids, vec!["1", "2", "3"]);
    assert_eq!(collected.list_calls, 2);
}

#[tokio::test]
async fn test_call_count_with_failed_record() {
    // K = 5 records at page size 2: 3 list calls and 5 record calls,
    // regardless of one record failing.
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2"], true).await;
    mount_list_page(&server, 2, &["3", "4"], true).await;
    mount_list_page(&server, 4, &["5"], false).await;
    for id in ["1", "2", "4", "5"] {
        mount_record(&server, id, 200).await;
    }
    mount_record(&server, "3", 404).await;

    let fetcher = TwoStepFetcher::new(tba_client(&server, RetryConfig::no_retry()));

    let report = fetcher
        .fetch_all("vendor", &FetchOptions::new().page_size(2))
        .await
        .unwrap();

    assert_eq!(report.list_calls, 3);
    assert_eq!(report.ids_collected, 5);
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.skipped(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3 + 5);
}

#[tokio::test]
async fn test_failed_record_is_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2", "3"], false).await;
    mount_record(&server, "1", 200).await;
    mount_record(&server, "2", 404).await;
    mount_record(&server, "3", 200).await;

    let client = tba_client(&server, RetryConfig::no_retry());
    let fetcher = TwoStepFetcher::new(client.clone());

    let report = fetcher
        .fetch_all("vendor", &FetchOptions::new().page_size(10))
        .await
        .unwrap();

    let ids: Vec<&str> = report
        .records
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, "2");
    assert!(matches!(
        report.failures[0].error,
        NetSuiteError::Api { status: 404, .. }
    ));

    let metrics = client.metrics().snapshot();
    assert_eq!(metrics.records_fetched, 2);
    assert_eq!(metrics.records_skipped, 1);
}

#[tokio::test]
async fn test_list_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/record/v1/vendor"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"title": "Forbidden"})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = TwoStepFetcher::new(tba_client(&server, fast_retry(3)));
    let err = fetcher
        .fetch_all("vendor", &FetchOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, NetSuiteError::Authentication { status: 403, .. }));
}

#[tokio::test]
async fn test_concurrent_fetch_keeps_id_order() {
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2", "3", "4", "5", "6"], false).await;
    for id in ["1", "2", "3", "4", "5", "6"] {
        mount_record(&server, id, 200).await;
    }

    let fetcher = TwoStepFetcher::new(tba_client(&server, fast_retry(1)));
    let report = fetcher
        .fetch_all("vendor", &FetchOptions::new().concurrency(3))
        .await
        .unwrap();

    let ids: Vec<&str> = report
        .records
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
}

#[tokio::test]
async fn test_end_to_end_fetch_and_classify() {
    // Arrange: ids 1, 2, 3 over two pages of size 2.
    let server = MockServer::start().await;
    mount_list_page(&server, 0, &["1", "2"], true).await;
    mount_list_page(&server, 2, &["3"], false).await;
    for id in ["1", "2", "3"] {
        mount_record(&server, id, 200).await;
    }

    let fetcher = TwoStepFetcher::new(tba_client(&server, fast_retry(1)));
    let classifier = FieldClassifier::new(KnownFieldSet::from_fields(["id", "name"]));
    let now = chrono::Utc::now();

    // Act
    let report = fetcher
        .fetch_all("vendor", &FetchOptions::new().page_size(2))
        .await
        .unwrap();
    let classified: Vec<_> = report
        .records
        .into_iter()
        .map(|record| classifier.classify(record, &CustomFieldMap::new(), now))
        .collect();

    // Assert
    assert_eq!(classified.len(), 3);
    for (record, id) in classified.iter().zip(["1", "2", "3"]) {
        assert_eq!(
            serde_json::Value::Object(record.known_fields.clone()),
            json!({"id": id, "name": format!("Vendor {}", id)})
        );
        assert_eq!(record.custom_fields.len(), 1);

        let region = &record.custom_fields["custentity_region"];
        assert_eq!(region.value, json!("West"));
        assert_eq!(region.first_seen, now);
        assert_eq!(region.last_seen, now);
        assert!(!region.deprecated);
    }
}
