//! crates/legal_analyzer_client/src/http.rs
//!
//! reqwest implementations of the client-side ports: `HttpBackend` talks to
//! the persistence routes with `?session_id=` on every call, and
//! `HttpCompletionClient` posts chat requests to the proxy.

use async_trait::async_trait;
use legal_analyzer_core::{
    completion::{CompletionRequest, CompletionResponse},
    domain::{ChatMessage, ChatTurn, Document, Favorite, NewDocument, SessionId},
    ports::{AnalyzerBackend, ChatCompletionService, PortError, PortResult},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// Builds the shared reqwest client. Analysis calls can be slow, hence the
/// generous timeout.
pub fn build_client() -> Result<Client, ClientError> {
    Ok(Client::builder().timeout(Duration::from_secs(120)).build()?)
}

fn transport(what: &str, e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("{} failed: {}", what, e))
}

/// Turns a non-success status into a `PortError`, keeping the body text.
async fn check(what: &str, response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => PortError::NotFound(format!("{}: {}", what, body)),
        StatusCode::BAD_REQUEST => PortError::InvalidInput(format!("{}: {}", what, body)),
        _ => PortError::Unexpected(format!("{} → {}: {}", what, status, body)),
    })
}

async fn decode<T: DeserializeOwned>(what: &str, response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("decoding {}: {}", what, e)))
}

//=========================================================================================
// Persistence Backend
//=========================================================================================

/// The persistence API bound to one session.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: SessionId,
}

impl HttpBackend {
    pub fn new(client: Client, base_url: impl Into<String>, session: SessionId) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn scoped(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("session_id", self.session.to_string())])
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> PortResult<Response> {
        debug!("{}", what);
        let response = self
            .scoped(request)
            .send()
            .await
            .map_err(|e| transport(what, e))?;
        check(what, response).await
    }
}

#[async_trait]
impl AnalyzerBackend for HttpBackend {
    async fn upload_document(&self, document: &NewDocument) -> PortResult<Uuid> {
        let what = "POST /upload-document";
        let response = self
            .send(what, self.client.post(self.url("/upload-document")).json(document))
            .await?;
        let body: Value = decode(what, response).await?;
        body.get("document_id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| PortError::Unexpected("upload response has no document_id".to_string()))
    }

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document> {
        let what = "GET /document";
        let url = self.url(&format!("/document/{}", document_id));
        let response = self.send(what, self.client.get(url)).await?;
        decode(what, response).await
    }

    async fn save_analysis(&self, document_id: Uuid, analysis: &Value) -> PortResult<()> {
        let body = json!({ "document_id": document_id, "analysis": analysis });
        self.send("POST /analyze", self.client.post(self.url("/analyze")).json(&body))
            .await?;
        Ok(())
    }

    async fn get_analysis(&self, document_id: Uuid) -> PortResult<Option<Value>> {
        let what = "GET /analysis";
        let url = self.url(&format!("/analysis/{}", document_id));
        let response = match self.send(what, self.client.get(url)).await {
            Ok(response) => response,
            Err(PortError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut body: Value = decode(what, response).await?;
        Ok(body.get_mut("json_").map(Value::take))
    }

    async fn append_chat(&self, document_id: Uuid, turn: &ChatTurn) -> PortResult<()> {
        let body = json!({
            "document_id": document_id,
            "role": turn.role,
            "content": turn.content,
        });
        self.send("POST /chat", self.client.post(self.url("/chat")).json(&body))
            .await?;
        Ok(())
    }

    async fn chat_history(&self, document_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let what = "GET /chat";
        let url = self.url(&format!("/chat/{}", document_id));
        let response = self.send(what, self.client.get(url)).await?;
        decode(what, response).await
    }

    async fn save_favorite(&self, query: &str) -> PortResult<()> {
        let body = json!({ "query": query });
        self.send("POST /favorite", self.client.post(self.url("/favorite")).json(&body))
            .await?;
        Ok(())
    }

    async fn favorites(&self) -> PortResult<Vec<Favorite>> {
        let what = "GET /favorites";
        let response = self.send(what, self.client.get(self.url("/favorites"))).await?;
        decode(what, response).await
    }
}

//=========================================================================================
// Chat Proxy Client
//=========================================================================================

#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    url: String,
}

impl HttpCompletionClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChatCompletionService for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport("chat proxy request", e))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PortError::Vendor {
                vendor: "Chat proxy".to_string(),
                status: status.as_u16(),
                details,
            });
        }
        decode("chat proxy response", response).await
    }
}
