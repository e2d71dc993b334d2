//! services/api/src/web/middleware.rs
//!
//! Permissive CORS handling for the proxy and persistence routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The CORS headers one route group advertises.
#[derive(Clone, Copy, Debug)]
pub struct CorsPolicy {
    pub allow_methods: &'static str,
}

impl CorsPolicy {
    pub const PROXY: CorsPolicy = CorsPolicy {
        allow_methods: "POST, OPTIONS",
    };

    pub const PERSISTENCE: CorsPolicy = CorsPolicy {
        allow_methods: "GET, POST, DELETE, OPTIONS",
    };

    fn apply(&self, response: &mut Response) {
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(self.allow_methods),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
    }
}

/// Middleware that answers preflight requests with an empty 204 and stamps
/// the CORS headers onto every other response.
pub async fn cors(State(policy): State<CorsPolicy>, req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    policy.apply(&mut response);
    response
}
