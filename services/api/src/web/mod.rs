pub mod extract;
pub mod middleware;
pub mod proxy;
pub mod rest;
pub mod state;
pub mod tasks;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use middleware::{cors, CorsPolicy};
use state::AppState;

/// Builds the complete HTTP surface: the chat proxy, the session-scoped
/// persistence routes, the task scaffold and text extraction.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let proxy_routes = Router::new()
        .route(
            "/",
            post(proxy::chat_completions_handler).fallback(proxy::method_not_allowed),
        )
        .route(
            "/v1/chat/completions",
            post(proxy::chat_completions_handler).fallback(proxy::method_not_allowed),
        )
        .layer(axum_middleware::from_fn_with_state(CorsPolicy::PROXY, cors));

    let persistence_routes = Router::new()
        .route("/upload-document", post(rest::upload_document_handler))
        .route("/document/{id}", get(rest::get_document_handler))
        .route("/analyze", post(rest::save_analysis_handler))
        .route("/analysis/{id}", get(rest::get_analysis_handler))
        .route("/chat", post(rest::append_chat_handler))
        .route("/chat/{id}", get(rest::chat_history_handler))
        .route("/favorite", post(rest::save_favorite_handler))
        .route("/favorites", get(rest::list_favorites_handler))
        .route("/health", get(rest::health_handler))
        .route("/extract", post(extract::extract_handler))
        .route(
            "/tasks",
            get(tasks::list_tasks_handler).post(tasks::create_task_handler),
        )
        .route(
            "/tasks/{slug}",
            get(tasks::get_task_handler).delete(tasks::delete_task_handler),
        )
        .route("/api-docs/openapi.json", get(rest::openapi_handler))
        .layer(axum_middleware::from_fn_with_state(
            CorsPolicy::PERSISTENCE,
            cors,
        ));

    Router::new()
        .merge(proxy_routes)
        .merge(persistence_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::db::tests::memory_adapter;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, HeaderMap, Method, Request, StatusCode},
    };
    use legal_analyzer_core::{
        completion::{CompletionRequest, CompletionResponse},
        ports::{ChatCompletionService, PortError, PortResult},
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use uuid::Uuid;

    //=====================================================================================
    // Test Doubles
    //=====================================================================================

    enum Behaviour {
        Reply(&'static str),
        VendorFailure(u16, &'static str),
        MissingKey,
    }

    struct StubLlm {
        behaviour: Behaviour,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl ChatCompletionService for StubLlm {
        async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
            self.seen.lock().unwrap().push(request.clone());
            match self.behaviour {
                Behaviour::Reply(text) => Ok(CompletionResponse::assistant(text, None, None)),
                Behaviour::VendorFailure(status, details) => Err(PortError::Vendor {
                    vendor: "Bedrock".to_string(),
                    status,
                    details: details.to_string(),
                }),
                Behaviour::MissingKey => Err(PortError::Configuration(
                    "Missing AWS Bedrock API key".to_string(),
                )),
            }
        }
    }

    async fn app_with(behaviour: Behaviour) -> (Router, Arc<StubLlm>) {
        let llm = Arc::new(StubLlm {
            behaviour,
            seen: Mutex::new(Vec::new()),
        });
        let config = Config::from_lookup(|_| None).unwrap();
        let state = Arc::new(AppState {
            db: Arc::new(memory_adapter().await),
            llm: llm.clone(),
            config: Arc::new(config),
        });
        (build_router(state), llm)
    }

    async fn app() -> Router {
        app_with(Behaviour::Reply("ok")).await.0
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, headers, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_method(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn upload(app: &Router, session: Uuid, text: &str) -> Uuid {
        let (status, _, body) = send(
            app,
            post_json(
                &format!("/upload-document?session_id={}", session),
                json!({"text": text, "file_name": "lease.txt", "file_type": "text/plain"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ok"], true);
        body["document_id"].as_str().unwrap().parse().unwrap()
    }

    //=====================================================================================
    // Proxy
    //=====================================================================================

    #[tokio::test]
    async fn proxy_returns_openai_shape_on_both_paths() {
        let (app, llm) = app_with(Behaviour::Reply("Clause 4 is about rent.")).await;
        for path in ["/", "/v1/chat/completions"] {
            let (status, headers, body) = send(
                &app,
                post_json(path, json!({"messages": [{"role": "user", "content": "Hi"}]})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["choices"][0]["message"]["role"], "assistant");
            assert_eq!(body["choices"][0]["message"]["content"], "Clause 4 is about rent.");
            assert_eq!(body["choices"][0]["finish_reason"], "stop");
            assert_eq!(body["usage"], json!({}));
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        }
        assert_eq!(llm.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn proxy_preflight_is_empty_204() {
        let app = app().await;
        let (status, headers, body) = send(&app, with_method(Method::OPTIONS, "/")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[tokio::test]
    async fn proxy_rejects_other_methods() {
        let app = app().await;
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (status, headers, body) =
                send(&app, with_method(method, "/v1/chat/completions")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({"error": "Method Not Allowed"}));
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn proxy_requires_messages_array() {
        let (app, llm) = app_with(Behaviour::Reply("unused")).await;
        let (status, _, body) = send(&app, post_json("/", json!({"prompt": "hi"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(llm.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vendor_failure_keeps_status_and_raw_details() {
        let (app, _) = app_with(Behaviour::VendorFailure(429, "{\"message\":\"throttled\"}")).await;
        let (status, _, body) = send(
            &app,
            post_json("/", json!({"messages": [{"role": "user", "content": "Hi"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Bedrock API error");
        assert_eq!(body["status"], 429);
        assert_eq!(body["details"], "{\"message\":\"throttled\"}");
    }

    #[tokio::test]
    async fn missing_secret_is_a_configuration_error() {
        let (app, _) = app_with(Behaviour::MissingKey).await;
        let (status, _, body) = send(
            &app,
            post_json("/", json!({"messages": [{"role": "user", "content": "Hi"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Server configuration error - "));
    }

    //=====================================================================================
    // Persistence
    //=====================================================================================

    #[tokio::test]
    async fn session_id_is_required_and_must_be_a_uuid() {
        let app = app().await;
        let (status, _, body) = send(&app, get("/favorites")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (status, _, _) = send(&app, get("/favorites?session_id=not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn uploaded_document_reads_back_within_its_session_only() {
        let app = app().await;
        let session = Uuid::new_v4();
        let id = upload(&app, session, "The tenant shall pay rent.").await;

        let (status, headers, body) =
            send(&app, get(&format!("/document/{}?session_id={}", id, session))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "The tenant shall pay rent.");
        assert_eq!(body["file_name"], "lease.txt");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, DELETE, OPTIONS"
        );

        let stranger = Uuid::new_v4();
        let (status, _, body) =
            send(&app, get(&format!("/document/{}?session_id={}", id, stranger))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn latest_analysis_is_returned_verbatim() {
        let app = app().await;
        let session = Uuid::new_v4();
        let id = upload(&app, session, "text").await;

        let (status, _, _) = send(&app, get(&format!("/analysis/{}?session_id={}", id, session))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for summary in ["first", "second"] {
            let (status, _, body) = send(
                &app,
                post_json(
                    &format!("/analyze?session_id={}", session),
                    json!({"document_id": id, "analysis": {"summary": summary, "extra": [1, 2]}}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert!(body["analysis_id"].is_string());
        }

        let (status, _, body) =
            send(&app, get(&format!("/analysis/{}?session_id={}", id, session))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document_id"], id.to_string());
        assert_eq!(body["json_"], json!({"summary": "second", "extra": [1, 2]}));
    }

    #[tokio::test]
    async fn chat_turns_come_back_in_insertion_order() {
        let app = app().await;
        let session = Uuid::new_v4();
        let id = upload(&app, session, "text").await;
        let uri = format!("/chat?session_id={}", session);

        let turns = [("user", "Q1"), ("assistant", "A1"), ("user", "Q2")];
        for (role, content) in turns {
            let (status, _, body) = send(
                &app,
                post_json(&uri, json!({"document_id": id, "role": role, "content": content})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert!(body["message_id"].is_string());
        }

        let (status, _, body) = send(&app, get(&format!("/chat/{}?session_id={}", id, session))).await;
        assert_eq!(status, StatusCode::OK);
        let got: Vec<(String, String)> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|m| {
                (
                    m["role"].as_str().unwrap().to_string(),
                    m["content"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        let expected: Vec<(String, String)> = turns
            .iter()
            .map(|(r, c)| (r.to_string(), c.to_string()))
            .collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn chat_rejects_unknown_roles() {
        let app = app().await;
        let session = Uuid::new_v4();
        let id = upload(&app, session, "text").await;
        let (status, _, body) = send(
            &app,
            post_json(
                &format!("/chat?session_id={}", session),
                json!({"document_id": id, "role": "system", "content": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn favorites_are_newest_first_and_reject_empty_queries() {
        let app = app().await;
        let session = Uuid::new_v4();
        let uri = format!("/favorite?session_id={}", session);

        let (status, _, _) = send(&app, post_json(&uri, json!({"query": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for query in ["termination clause", "governing law"] {
            let (status, _, _) = send(&app, post_json(&uri, json!({"query": query}))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, _, body) = send(&app, get(&format!("/favorites?session_id={}", session))).await;
        assert_eq!(body[0]["query"], "governing law");
        assert_eq!(body[1]["query"], "termination clause");
    }

    #[tokio::test]
    async fn persistence_preflight_lists_all_methods() {
        let app = app().await;
        let (status, headers, _) =
            send(&app, with_method(Method::OPTIONS, "/upload-document")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, DELETE, OPTIONS"
        );
    }

    //=====================================================================================
    // Tasks and Extraction
    //=====================================================================================

    #[tokio::test]
    async fn task_lifecycle() {
        let app = app().await;
        let task = json!({"name": "Review", "slug": "review", "completed": false});

        let (status, _, body) = send(&app, post_json("/tasks", task.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["task"]["slug"], "review");

        let (status, _, _) = send(&app, post_json("/tasks", task)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, _, body) = send(&app, get("/tasks?page=0&isCompleted=false")).await;
        assert_eq!(body["result"]["tasks"].as_array().unwrap().len(), 1);

        let (status, _, _) = send(&app, with_method(Method::DELETE, "/tasks/review")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app, get("/tasks/review")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    fn multipart(file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let boundary = "XLEGALBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n",
                b = boundary,
                f = file_name,
                c = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri("/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn extract_reads_text_files() {
        let app = app().await;
        let (status, _, body) = send(
            &app,
            multipart("terms.txt", "text/plain", b"Payment is due monthly."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "Payment is due monthly.");
        assert_eq!(body["file_name"], "terms.txt");
        assert_eq!(body["file_type"], "text/plain");
    }

    #[tokio::test]
    async fn extract_rejects_unsupported_and_corrupt_files() {
        let app = app().await;
        let (status, _, _) = send(
            &app,
            multipart("scan.docx", "application/octet-stream", b"PK"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(
            &app,
            multipart("broken.pdf", "application/pdf", b"%PDF-1.4 nonsense"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to extract text from PDF."));
    }
}
