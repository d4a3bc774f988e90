//! `HttpCatalogClient` against a throwaway local HTTP server.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::init_test_logging;
use serde_json::{Value, json};
use storefront_refs::core::RefsError;
use storefront_refs::models::{LookupRequest, ResolveOptions};
use storefront_refs::resolver::{CatalogLookup, HttpCatalogClient, ReferenceCache, ResolutionState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A captured HTTP request: the head (request line and headers) and body.
struct Captured {
    head: String,
    body: String,
}

/// Serve exactly one request with `status` and `body`, returning the request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/store/catalog/lookup", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        captured
    });

    (url, handle)
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Captured {
        head,
        body: String::from_utf8_lossy(&buf[head_end..]).to_string(),
    }
}

fn request(products: &[&str], variants: &[&str]) -> LookupRequest {
    LookupRequest {
        product_ids: products.iter().map(|s| s.to_string()).collect(),
        variant_ids: variants.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_lookup_posts_batch_and_decodes_response() {
    init_test_logging(None);
    let (url, server) = serve_once(
        "200 OK",
        r#"{"products":[{"id":"p1","name":"Mug"}],"variants":[{"id":"v1","sku":"MUG-RED","name":null}]}"#,
    )
    .await;

    let headers = BTreeMap::from([("x-publishable-api-key".to_string(), "pk_test".to_string())]);
    let client = HttpCatalogClient::with_headers(&url, Duration::from_secs(5), &headers).unwrap();
    let response = client.lookup(&request(&["p1", "p2"], &["v1"])).await.unwrap();

    assert_eq!(response.products.len(), 1);
    assert_eq!(response.products[0].name.as_deref(), Some("Mug"));
    assert_eq!(response.variants[0].sku.as_deref(), Some("MUG-RED"));
    assert_eq!(response.variants[0].name, None);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /store/catalog/lookup "));
    assert!(captured.head.to_ascii_lowercase().contains("x-publishable-api-key: pk_test"));
    let body: Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body, json!({ "productIds": ["p1", "p2"], "variantIds": ["v1"] }));
}

#[tokio::test]
async fn test_request_omits_empty_lists() {
    let (url, server) = serve_once("200 OK", r#"{"products":[]}"#).await;

    let client = HttpCatalogClient::new(&url, Duration::from_secs(5)).unwrap();
    let response = client.lookup(&request(&[], &["v1"])).await.unwrap();
    assert!(response.products.is_empty());
    assert!(response.variants.is_empty());

    let body: Value = serde_json::from_str(&server.await.unwrap().body).unwrap();
    assert_eq!(body, json!({ "variantIds": ["v1"] }));
}

#[tokio::test]
async fn test_non_success_status_is_lookup_status_error() {
    let (url, _server) = serve_once("503 Service Unavailable", "{}").await;

    let client = HttpCatalogClient::new(&url, Duration::from_secs(5)).unwrap();
    let err = client.lookup(&request(&["p1"], &[])).await.unwrap_err();

    assert!(matches!(err, RefsError::LookupStatus { status: 503, .. }));
    assert!(err.is_lookup_failure());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let (url, _server) = serve_once("200 OK", "<html>not json</html>").await;

    let client = HttpCatalogClient::new(&url, Duration::from_secs(5)).unwrap();
    let err = client.lookup(&request(&["p1"], &[])).await.unwrap_err();

    assert!(matches!(err, RefsError::LookupDecode { .. }));
}

#[tokio::test]
async fn test_unresponsive_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/lookup", listener.local_addr().unwrap());
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let client = HttpCatalogClient::new(&url, Duration::from_millis(200)).unwrap();
    let err = client.lookup(&request(&["p1"], &[])).await.unwrap_err();

    assert!(matches!(err, RefsError::LookupTimeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/lookup", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpCatalogClient::new(&url, Duration::from_secs(5)).unwrap();
    let err = client.lookup(&request(&["p1"], &[])).await.unwrap_err();

    assert!(matches!(err, RefsError::LookupTransport { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_cache_over_http_records_omitted_ids_as_negative() {
    let (url, _server) = serve_once("200 OK", r#"{"products":[{"id":"p1","name":"Mug"}]}"#).await;

    let cache = ReferenceCache::new(HttpCatalogClient::new(&url, Duration::from_secs(5)).unwrap());
    let resolved = cache.resolve(["p1", "p2"], ["v1"], ResolveOptions::default()).await;

    assert_eq!(resolved.product_name("p1"), Some("Mug"));
    assert_eq!(resolved.product_name("p2"), None);
    assert_eq!(cache.product_state("p2"), ResolutionState::Negative);
    assert_eq!(cache.variant_state("v1"), ResolutionState::Negative);
}
