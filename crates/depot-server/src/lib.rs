//! HTTP server for Depot.
//!
//! Exposes owner-scoped packages and versions over a JSON REST API, with
//! multipart uploads and streamed downloads of version content. The owner id
//! is taken from the request path.

pub mod config;
pub mod dto;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{DepotConfig, ServerConfig, StorageBackend, StorageConfig};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use router::build_router;
pub use server::DepotServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "depot-test-boundary";

    fn app() -> Router {
        build_router(AppState::in_memory())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn multipart_body(version: Option<Value>, file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(version) = version {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"version\"\r\n\
                     Content-Type: application/json\r\n\r\n{version}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(
        app: &Router,
        uri: &str,
        version: Option<Value>,
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(version, file)))
            .unwrap();
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn with_package(app: &Router, owner: &str, reference: &str) {
        let (status, _) = post_json(
            app,
            &format!("/owners/{owner}/packages"),
            json!({ "reference": reference, "name": "Package" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // -----------------------------------------------------------------------
    // Service endpoints
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = get(&app(), "/v1/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, body) = get(&app(), "/v1/info").await;
        assert_eq!(status, 200);
        assert_eq!(body["name"], "depot-server");
        assert_eq!(body["default_page_size"], 20);
    }

    // -----------------------------------------------------------------------
    // Packages
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_and_get_package() {
        let app = app();
        let (status, created) = post_json(
            &app,
            "/owners/o1/packages",
            json!({ "reference": " fw ", "name": "Firmware", "description": "d" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created, json!({ "reference": "fw", "name": "Firmware", "description": "d" }));

        let (status, found) = get(&app, "/owners/o1/packages/fw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn duplicate_package_is_conflict() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let (status, body) = post_json(
            &app,
            "/owners/o1/packages",
            json!({ "reference": "fw", "name": "Again" }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn packages_are_owner_scoped() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let (status, body) = get(&app, "/owners/o2/packages/fw").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        with_package(&app, "o2", "fw").await;
        let (status, _) = get(&app, "/owners/o2/packages/fw").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_package_lists_violations() {
        let (status, body) = post_json(
            &app(),
            "/owners/o1/packages",
            json!({ "reference": "caf\u{e9}", "name": "  " }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        let fields: Vec<&str> = body["violations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"reference"));
        assert!(fields.contains(&"name"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/owners/o1/packages")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, _) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn package_listing_pages() {
        let app = app();
        for r in ["a", "b", "c"] {
            with_package(&app, "o1", r).await;
        }
        with_package(&app, "o2", "z").await;

        let (status, body) = get(&app, "/owners/o1/packages?page=0&size=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["page"],
            json!({ "number": 0, "size": 2, "total_elements": 3, "total_pages": 2 })
        );

        let (_, body) = get(&app, "/owners/o1/packages?page=1&size=2").await;
        assert_eq!(body["items"][0]["reference"], "c");
    }

    #[tokio::test]
    async fn non_numeric_paging_is_bad_request() {
        let (status, body) = get(&app(), "/owners/o1/packages?page=first").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upload_then_fetch_version_and_content() {
        let app = app();
        with_package(&app, "o1", "fw").await;

        let (status, created) = upload(
            &app,
            "/owners/o1/packages/fw/versions",
            Some(json!({ "id": "1.0", "name": "First", "metadata": { "arch": "arm" } })),
            Some(("abc.txt", &b"abc"[..])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "1.0");
        assert_eq!(created["packageRef"], "fw");
        assert_eq!(created["filename"], "abc.txt");
        assert_eq!(created["length"], 3);
        assert_eq!(created["checksum"], "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(created["metadata"]["arch"], "arm");
        assert!(created.get("ownerId").is_none());

        let (status, found) = get(&app, "/owners/o1/packages/fw/versions/1.0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, created);

        let request = Request::builder()
            .uri("/owners/o1/packages/fw/versions/1.0/file")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_LENGTH], "3");
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body, b"abc");
    }

    #[tokio::test]
    async fn version_for_missing_package_is_creation_failure() {
        let (status, body) = upload(
            &app(),
            "/owners/o1/packages/ghost/versions",
            Some(json!({ "id": "1.0", "name": "n" })),
            Some(("f.bin", &b"x"[..])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "creation_failed");
    }

    #[tokio::test]
    async fn duplicate_version_is_conflict() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let uri = "/owners/o1/packages/fw/versions";
        let part = json!({ "id": "1.0", "name": "n" });

        let (status, _) = upload(&app, uri, Some(part.clone()), Some(("a", &b"one"[..]))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = upload(&app, uri, Some(part), Some(("b", &b"two"[..]))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let request = Request::builder()
            .uri("/owners/o1/packages/fw/versions/1.0/file")
            .body(Body::empty())
            .unwrap();
        let (_, _, content) = send(&app, request).await;
        assert_eq!(content, b"one");
    }

    #[tokio::test]
    async fn upload_missing_parts_is_bad_request() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let uri = "/owners/o1/packages/fw/versions";

        let (status, _) = upload(&app, uri, Some(json!({ "id": "1", "name": "n" })), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = upload(&app, uri, None, Some(("f", &b"x"[..]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let mut state = AppState::in_memory();
        state.max_upload_size = 1024;
        let app = build_router(state);
        with_package(&app, "o1", "fw").await;

        let content = vec![0u8; 64 * 1024];
        let (status, body) = upload(
            &app,
            "/owners/o1/packages/fw/versions",
            Some(json!({ "id": "1.0", "name": "n" })),
            Some(("big.bin", content.as_slice())),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");

        let (status, _) = get(&app, "/owners/o1/packages/fw/versions/1.0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_version_part_is_rejected() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let (status, body) = upload(
            &app,
            "/owners/o1/packages/fw/versions",
            Some(json!({ "id": "", "name": "n" })),
            Some(("f", &b"x"[..])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn unknown_version_and_file_are_not_found() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        let (status, _) = get(&app, "/owners/o1/packages/fw/versions/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(&app, "/owners/o1/packages/fw/versions/9/file").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn version_listing_pages() {
        let app = app();
        with_package(&app, "o1", "fw").await;
        for i in 0..3 {
            let (status, _) = upload(
                &app,
                "/owners/o1/packages/fw/versions",
                Some(json!({ "id": format!("1.{i}"), "name": "n" })),
                Some(("f", &b"data"[..])),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = get(&app, "/owners/o1/packages/fw/versions?size=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["page"]["total_elements"], 3);
        assert_eq!(body["items"][0]["id"], "1.0");
    }

    #[tokio::test]
    async fn filesystem_backend_serves_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DepotConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        let app = build_router(AppState::from_config(&config).unwrap());

        with_package(&app, "o1", "fw").await;
        let (status, _) = upload(
            &app,
            "/owners/o1/packages/fw/versions",
            Some(json!({ "id": "1.0", "name": "n" })),
            Some(("abc.txt", &b"abc"[..])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let request = Request::builder()
            .uri("/owners/o1/packages/fw/versions/1.0/file")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"abc");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("abc.txt"));
    }

    #[tokio::test]
    async fn version_metadata_is_served_without_its_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DepotConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        let app = build_router(AppState::from_config(&config).unwrap());

        with_package(&app, "o1", "fw").await;
        let (status, _) = upload(
            &app,
            "/owners/o1/packages/fw/versions",
            Some(json!({ "id": "1.0", "name": "n" })),
            Some(("abc.txt", &b"abc"[..])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        for entry in std::fs::read_dir(dir.path().join("blobs")).unwrap() {
            std::fs::remove_file(entry.unwrap().path()).unwrap();
        }

        let (status, body) = get(&app, "/owners/o1/packages/fw/versions/1.0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["length"], 3);
        let (status, _) = get(&app, "/owners/o1/packages/fw/versions/1.0/file").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
