//! HTTP behaviour of the store directory and live queue client.

use tablecall_core::{FeedError, QueueFeed, StoreDirectory, StoreId, StoreStatus, SushiroClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STORE_LIST: &str = r#"[
    {"id": 12, "name": "Mong Kok", "storeStatus": "CLOSED"},
    {"id": 7, "name": "Tsuen Wan", "storeStatus": "OPEN"},
    {"id": 3, "name": "Central"}
]"#;

async fn mount_queue(server: &MockServer, store_id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/remote/storequeue"))
        .and(query_param("storeid", store_id))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_store_list(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/info/storelist"))
        .and(query_param("numresults", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STORE_LIST))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> SushiroClient {
    SushiroClient::new(&server.uri()).unwrap()
}

#[tokio::test]
async fn test_tickets_mean_open_without_directory_read() {
    let server = MockServer::start().await;
    mount_queue(&server, "12", r#"["301-A","302-B"]"#).await;
    mount_store_list(&server, 0).await;

    let snapshot = client(&server).fetch(&StoreId::from("12")).await.unwrap();

    assert_eq!(snapshot.active_tickets, vec![301, 302]);
    assert_eq!(snapshot.status, StoreStatus::Open);
}

#[tokio::test]
async fn test_empty_queue_reads_closed_status() {
    let server = MockServer::start().await;
    mount_queue(&server, "12", "[]").await;
    mount_store_list(&server, 1).await;

    let snapshot = client(&server).fetch(&StoreId::from("12")).await.unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.status, StoreStatus::Closed);
    assert!(snapshot.is_closed());
}

#[tokio::test]
async fn test_empty_queue_reads_open_status() {
    let server = MockServer::start().await;
    mount_queue(&server, "7", "null").await;
    mount_store_list(&server, 1).await;

    let snapshot = client(&server).fetch(&StoreId::from("7")).await.unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.status, StoreStatus::Open);
}

#[tokio::test]
async fn test_empty_queue_without_status_is_unknown() {
    let server = MockServer::start().await;
    mount_queue(&server, "3", "[]").await;
    mount_queue(&server, "404", "[]").await;
    mount_store_list(&server, 2).await;
    let client = client(&server);

    let snapshot = client.fetch(&StoreId::from("3")).await.unwrap();
    assert_eq!(snapshot.status, StoreStatus::Unknown);

    // not listed in the directory at all
    let snapshot = client.fetch(&StoreId::from("404")).await.unwrap();
    assert_eq!(snapshot.status, StoreStatus::Unknown);
}

#[tokio::test]
async fn test_directory_failure_leaves_status_unknown() {
    let server = MockServer::start().await;
    mount_queue(&server, "12", "[]").await;
    Mock::given(method("GET"))
        .and(path("/info/storelist"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let snapshot = client(&server).fetch(&StoreId::from("12")).await.unwrap();

    assert_eq!(snapshot.status, StoreStatus::Unknown);
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote/storequeue"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client(&server).fetch(&StoreId::from("12")).await;

    assert!(matches!(result, Err(FeedError::Unreachable(_))));
}

#[tokio::test]
async fn test_garbage_body_is_malformed() {
    let server = MockServer::start().await;
    mount_queue(&server, "12", "<html>maintenance</html>").await;

    let result = client(&server).fetch(&StoreId::from("12")).await;

    assert!(matches!(result, Err(FeedError::Malformed(_))));
}

#[tokio::test]
async fn test_directory_is_cached() {
    let server = MockServer::start().await;
    mount_store_list(&server, 1).await;
    let client = client(&server);

    let stores = client.stores().await.unwrap();
    let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Central", "Mong Kok", "Tsuen Wan"]);

    let store = client.store(&StoreId::from("7")).await.unwrap();
    assert_eq!(store.name, "Tsuen Wan");
}
