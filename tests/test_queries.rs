use ocilogs::query::framer::TIME_FIELD;
use ocilogs::{FieldValues, OciLogsError, ResultSet, ValueType};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::*;

fn table(result: ResultSet) -> ocilogs::Table {
    match result {
        ResultSet::Table(t) => t,
        other => panic!("expected a table, got {:?}", other),
    }
}

fn data_frame(result: ResultSet) -> ocilogs::DataFrame {
    match result {
        ResultSet::Frame(f) => f,
        other => panic!("expected a frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_compartment_pagination_stops_at_cap() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("opc-next-page", "more")
                .set_body_json(json!([compartment("dev", "ACTIVE")])),
        )
        .expect(20)
        .mount(&server)
        .await;

    let result = datasource
        .query(&request("compartments", json!({})), &CancellationToken::new())
        .await
        .unwrap();
    let rows = table(result).rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "root compartment");
}

#[tokio::test]
async fn test_compartments_across_pages_keep_only_active() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .and(query_param("compartmentIdInSubtree", "true"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("opc-next-page", "page-2")
                .set_body_json(json!([
                    compartment("dev", "ACTIVE"),
                    compartment("old", "DELETED"),
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .and(query_param("page", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            compartment("prod", "ACTIVE"),
            compartment("stage", "ACTIVE"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let result = datasource
        .query(&request("compartments", json!({})), &CancellationToken::new())
        .await
        .unwrap();
    let t = table(result);
    assert_eq!(t.columns, vec!["name", "id"]);
    let names: Vec<&str> = t.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, vec!["root compartment", "dev", "prod", "stage"]);
    assert_eq!(t.rows[0][1], tenancy_ocid(0));
}

#[tokio::test]
async fn test_compartments_are_cached() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([compartment(
            "dev", "ACTIVE"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    for _ in 0..3 {
        let rows = table(
            datasource
                .query(&request("compartments", json!({})), &CancellationToken::new())
                .await
                .unwrap(),
        )
        .rows;
        assert_eq!(rows.len(), 2);
    }
}

#[tokio::test]
async fn test_failed_listing_is_not_cached() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("InternalError"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let first = datasource
        .query(&request("compartments", json!({})), &CancellationToken::new())
        .await;
    assert!(matches!(first, Err(OciLogsError::RemoteCall { .. })));

    let second = datasource
        .query(&request("compartments", json!({})), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(table(second).rows.len(), 1);
}

#[tokio::test]
async fn test_regions_listing() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/20160918/tenancies/{}/regionSubscriptions",
            tenancy_ocid(0)
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"regionName": "us-ashburn-1", "regionKey": "IAD", "status": "READY", "isHomeRegion": true},
            {"regionName": "eu-frankfurt-1", "regionKey": "FRA", "status": "READY", "isHomeRegion": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let t = table(
            datasource
                .query(&request("regions", json!({})), &CancellationToken::new())
                .await
                .unwrap(),
        );
        assert_eq!(t.columns, vec!["name"]);
        assert_eq!(
            t.rows,
            vec![vec!["us-ashburn-1".to_string()], vec!["eu-frankfurt-1".to_string()]]
        );
    }
}

#[tokio::test]
async fn test_tenancies_listing_needs_no_remote_call() {
    let server = MockServer::start().await;
    mount_tenancy_self_report(&server).await;
    let datasource = ocilogs::Datasource::new(
        &local_settings(&["DEFAULT", "EU"], "multitenancy"),
        ocilogs::DatasourceConfig::with_endpoint(&server.uri()),
    )
    .await
    .unwrap();
    let before = server.received_requests().await.unwrap().len();

    let t = table(
        datasource
            .query(&request("tenancies", json!({})), &CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(t.rows.len(), 2);
    assert_eq!(t.rows[1][0], format!("EU/{}", tenancy_ocid(1)));
    assert_eq!(server.received_requests().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_search_logs_frames_into_buckets() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    mount_search(
        &server,
        vec![
            json!({"datetime": 0, "logContent": {"data": {"status": 200}}}),
            json!({"datetime": 60_000, "logContent": {"data": {"status": 201}}}),
            json!({"datetime": 130_000, "logContent": {"data": {"status": 404}}}),
            json!({"datetime": 370_000, "logContent": {"data": {"status": 500}}}),
            json!({"datetime": 599_999, "logContent": {"data": {"status": 503}}}),
            json!({"datetime": 600_000, "logContent": {"data": {"status": 504}}}),
        ],
    )
    .await;

    let req = request(
        "searchLogs",
        json!({"searchQuery": "search \"ocid1.compartment\"", "maxDataPoints": 5}),
    );
    let frame = data_frame(
        datasource
            .query(&req, &CancellationToken::new())
            .await
            .unwrap(),
    );

    assert_eq!(frame.name, "A");
    assert_eq!(frame.bucket_count(), 5);
    assert_eq!(frame.fields[0].name, TIME_FIELD);

    let status = frame.field("logContent.data.status").unwrap();
    assert_eq!(status.value_type, ValueType::Int);
    assert_eq!(
        status.values,
        FieldValues::Int(vec![Some(201), Some(404), None, Some(500), Some(504)])
    );

    let requests = server.received_requests().await.unwrap();
    let search = requests
        .iter()
        .find(|r| r.url.path() == "/20190909/search")
        .unwrap();
    assert_eq!(search.url.query(), Some("limit=500"));
    let body: serde_json::Value = serde_json::from_slice(&search.body).unwrap();
    assert_eq!(body["timeStart"], "1970-01-01T00:00:00.000Z");
    assert_eq!(body["timeEnd"], "1970-01-01T00:10:00.000Z");
    assert_eq!(body["isReturnFieldInfo"], false);
    assert!(search.headers.contains_key("x-content-sha256"));
}

#[tokio::test]
async fn test_unknown_query_type_searches() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;
    mount_search(&server, vec![]).await;

    let result = datasource
        .query(&request("logGroups", json!({})), &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(result, ResultSet::Frame(_)));
}

#[tokio::test]
async fn test_search_reads_only_one_page() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("POST"))
        .and(path("/20190909/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("opc-next-page", "more")
                .set_body_json(json!({"results": [{"data": {"datetime": 5, "msg": "hi"}}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let frame = data_frame(
        datasource
            .query(&request("searchLogs", json!({})), &CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(frame.field("msg").unwrap().values.populated(), 1);
}

#[tokio::test]
async fn test_connectivity_query() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20200531/logGroups"))
        .and(query_param("limit", "1"))
        .and(query_param("compartmentId", tenancy_ocid(0).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let t = table(
        datasource
            .query(&request("test", json!({})), &CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(t.rows[0][0], "OK");
    assert!(datasource
        .check_health(&CancellationToken::new())
        .await
        .is_healthy());
}

#[tokio::test]
async fn test_connectivity_failure_reports_status_and_body() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20200531/logGroups"))
        .respond_with(ResponseTemplate::new(404).set_body_string("NotAuthorizedOrNotFound"))
        .mount(&server)
        .await;

    let err = datasource
        .query(&request("test", json!({})), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        OciLogsError::Connectivity { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "NotAuthorizedOrNotFound");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let health = datasource.check_health(&CancellationToken::new()).await;
    assert!(!health.is_healthy());
    assert!(health.message.contains("404"));
}

#[tokio::test]
async fn test_cancelled_request_never_reports_success() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("opc-next-page", "more")
                .set_body_json(json!([compartment("dev", "ACTIVE")]))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let err = datasource
        .query(&request("compartments", json!({})), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, OciLogsError::Cancelled(ref op) if op == "ListCompartments"));

    // The partial listing was not cached.
    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(1)
        .mount(&server)
        .await;
    let rows = table(
        datasource
            .query(&request("compartments", json!({})), &CancellationToken::new())
            .await
            .unwrap(),
    )
    .rows;
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_batch_isolates_failures_and_keeps_order() {
    let server = MockServer::start().await;
    let datasource = Arc::new(single_tenancy_datasource(&server).await);
    mount_search(&server, vec![json!({"datetime": 1, "msg": "ok"})]).await;
    Mock::given(method("GET"))
        .and(path("/20200531/logGroups"))
        .respond_with(ResponseTemplate::new(401).set_body_string("NotAuthenticated"))
        .mount(&server)
        .await;

    let mut first = request("searchLogs", json!({}));
    first.ref_id = "A".to_string();
    let mut second = request("test", json!({}));
    second.ref_id = "B".to_string();
    let mut third = request("searchLogs", json!({}));
    third.ref_id = "C".to_string();

    let outcomes = datasource
        .query_batch(vec![first, second, third], &CancellationToken::new())
        .await;
    let ids: Vec<&str> = outcomes.iter().map(|o| o.ref_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        outcomes[1].result,
        Err(OciLogsError::Connectivity { status: 401, .. })
    ));
    assert!(outcomes[2].result.is_ok());
}

#[tokio::test]
async fn test_multitenancy_request_addresses_named_tenancy() {
    let server = MockServer::start().await;
    mount_tenancy_self_report(&server).await;
    let datasource = ocilogs::Datasource::new(
        &local_settings(&["DEFAULT", "EU"], "multitenancy"),
        ocilogs::DatasourceConfig::with_endpoint(&server.uri()),
    )
    .await
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/20160918/compartments"))
        .and(query_param("compartmentId", tenancy_ocid(1).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([compartment(
            "eu-only", "ACTIVE"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let req = request(
        "compartments",
        json!({"tenancy": format!("EU/{}", tenancy_ocid(1))}),
    );
    let t = table(
        datasource
            .query(&req, &CancellationToken::new())
            .await
            .unwrap(),
    );
    assert_eq!(t.rows[1][0], "eu-only");

    let missing = datasource
        .query(&request("compartments", json!({})), &CancellationToken::new())
        .await;
    assert!(matches!(missing, Err(OciLogsError::TenancyNotFound(_))));
}

#[tokio::test]
async fn test_search_rejects_unrepresentable_window() {
    let server = MockServer::start().await;
    let datasource = single_tenancy_datasource(&server).await;
    Mock::given(method("POST"))
        .and(path("/20190909/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(
        "searchLogs",
        json!({"timeRange": {"fromEpochMs": -5_000_000_000_000_000_000i64, "toEpochMs": 5_000_000_000_000_000_000i64}}),
    );
    let err = datasource
        .query(&req, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OciLogsError::InvalidTimeRange(_)));
    assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
}
