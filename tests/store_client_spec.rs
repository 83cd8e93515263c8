//! Store client behavior against a mocked Paperless API.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taglift::services::{DocumentPatch, PaperlessClient, StoreError};

fn client(server: &MockServer) -> PaperlessClient {
    PaperlessClient::new(&server.uri(), "test-token").expect("client should build")
}

#[tokio::test]
async fn paginated_query_follows_next_links_in_page_order() {
    let server = MockServer::start().await;
    let page_two = format!(
        "{}/api/documents/?page=2&is_tagged=true&tags__id__all=7&fields=id",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(query_param("is_tagged", "true"))
        .and(query_param("tags__id__all", "7"))
        .and(query_param("fields", "id"))
        .and(query_param_is_missing("page"))
        .and(header("authorization", "Token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": 1 }, { "id": 2 }],
            "next": page_two,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": 3 }],
            "next": null,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids = client(&server)
        .find_documents_with_tag(7)
        .await
        .expect("query should succeed");
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn not_found_yields_empty_result_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ids = client(&server)
        .find_documents_with_tag(7)
        .await
        .expect("404 is not a failure");
    assert!(ids.is_empty());
}

#[tokio::test]
async fn server_error_fails_the_query_with_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .find_documents_with_tag(7)
        .await
        .expect_err("500 must fail");
    assert!(matches!(err, StoreError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn patch_sends_only_named_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/42/"))
        .and(header("authorization", "Token test-token"))
        .and(body_json(json!({ "content": "Hello", "tags": [3, 9] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let patch = DocumentPatch {
        content: Some("Hello".to_string()),
        tags: Some(vec![3, 9]),
        ..Default::default()
    };
    client(&server)
        .patch_document(42, &patch)
        .await
        .expect("patch should succeed");
}

#[tokio::test]
async fn rejected_patch_reports_the_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/42/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let patch = DocumentPatch {
        title: Some("Invoice".to_string()),
        ..Default::default()
    };
    let err = client(&server)
        .patch_document(42, &patch)
        .await
        .expect_err("403 must fail");
    assert!(matches!(err, StoreError::HttpStatus { status: 403, .. }));
}

#[tokio::test]
async fn document_detail_and_download_round_through_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "title": "scan_0042.pdf",
            "content": "",
            "tags": [3, 7],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents/42/download/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 fake".to_vec()))
        .mount(&server)
        .await;

    let store = client(&server);
    let document = store.fetch_document(42).await.expect("detail");
    assert_eq!(document.id, 42);
    assert_eq!(document.tags, vec![3, 7]);

    let download = store.download_document(42).await.expect("download");
    assert_eq!(download.as_ref(), b"%PDF-1.4 fake");
}
