use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{arduino_data, healthz, readyz};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/arduino-data", post(arduino_data))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DataSink, MemorySink, SinkError};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tower::ServiceExt;

    #[derive(Default)]
    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl DataSink for FailingSink {
        async fn push(&self, _value: Value) -> Result<String, SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Unavailable("permission denied".to_string()))
        }
    }

    fn memory_app() -> (Router, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        (build_router(AppState::new(sink.clone())), sink)
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/arduino-data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .expect("request")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn stores_payload_and_returns_key() {
        let (app, sink) = memory_app();
        let response = app
            .oneshot(post_json(r#"{"temp":22.5}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        let id = body["id"].as_str().expect("id string");
        assert!(!id.is_empty());
        assert_eq!(sink.get(id), Some(json!({"temp": 22.5})));
    }

    #[tokio::test]
    async fn identical_submissions_get_distinct_ids() {
        let (app, _sink) = memory_app();
        let mut ids = HashSet::new();
        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json(r#"{"temp":1}"#))
                .await
                .expect("response");
            let body = json_body(response).await;
            ids.insert(body["id"].as_str().expect("id").to_string());
        }
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn store_failure_maps_to_fixed_500() {
        let sink = Arc::new(FailingSink::default());
        let app = build_router(AppState::new(sink.clone()));
        let response = app
            .oneshot(post_json(r#"{"temp":22.5}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Failed to write to Firebase"})
        );
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_json_never_reaches_the_store() {
        let sink = Arc::new(FailingSink::default());
        let app = build_router(AppState::new(sink.clone()));
        let response = app
            .oneshot(post_json(r#"{"temp": "#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let (app, _sink) = memory_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/arduino-data")
            .body(Body::from(r#"{"temp":1}"#))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn top_level_scalars_are_stored() {
        let (app, sink) = memory_app();
        let response = app.oneshot(post_json("22.5")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let id = body["id"].as_str().expect("id");
        assert_eq!(sink.get(id), Some(json!(22.5)));
    }

    #[tokio::test]
    async fn any_origin_is_allowed() {
        let (app, _sink) = memory_app();
        let mut request = post_json(r#"{"temp":1}"#);
        request.headers_mut().insert(
            header::ORIGIN,
            "https://dashboard.example.org".parse().expect("origin"),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/arduino-data")
            .header(header::ORIGIN, "http://192.168.1.40")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(preflight).await.expect("response");
        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn concurrent_submissions_keep_their_own_keys() {
        let (app, sink) = memory_app();
        let mut handles = Vec::new();
        for reading in 0..32 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let payload = json!({ "reading": reading });
                let response = app
                    .oneshot(post_json(payload.to_string()))
                    .await
                    .expect("response");
                let body = json_body(response).await;
                (body["id"].as_str().expect("id").to_string(), payload)
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            let (id, payload) = handle.await.expect("join");
            assert_eq!(sink.get(&id), Some(payload));
            ids.insert(id);
        }
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn large_bodies_are_not_limited() {
        let (app, sink) = memory_app();
        let payload = json!({ "blob": "x".repeat(3 * 1024 * 1024) });
        let response = app
            .oneshot(post_json(payload.to_string()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let id = body["id"].as_str().expect("id");
        assert_eq!(sink.get(id), Some(payload));
    }

    #[tokio::test]
    async fn health_probes_answer_ok() {
        let (app, _sink) = memory_app();
        for path in ["/healthz", "/readyz"] {
            let request = Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request");
            let response = app.clone().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
