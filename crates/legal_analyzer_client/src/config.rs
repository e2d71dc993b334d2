//! crates/legal_analyzer_client/src/config.rs
//!
//! Where the client finds the backend, the chat proxy and its session file.

use std::path::PathBuf;

use crate::error::ClientError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8787";
pub const DEFAULT_STATE_PATH: &str = ".legal_session.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub proxy_url: String,
    pub state_path: PathBuf,
}

impl ClientConfig {
    /// Loads `LEGAL_BACKEND_URL`, `LEGAL_PROXY_URL` and `LEGAL_STATE_PATH`,
    /// reading a `.env` file first outside of tests.
    pub fn from_env() -> Result<Self, ClientError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = backend_url(
            "LEGAL_BACKEND_URL",
            &lookup("LEGAL_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        )?;
        let proxy_url = lookup("LEGAL_PROXY_URL")
            .unwrap_or_else(|| format!("{}/v1/chat/completions", backend_url));
        let state_path = lookup("LEGAL_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        Ok(Self {
            backend_url,
            proxy_url,
            state_path,
        })
    }

    /// Applies command-line overrides. A new backend URL is checked like the
    /// environment value and, without an explicit proxy URL, moves the proxy
    /// along with it.
    pub fn with_overrides(
        mut self,
        backend: Option<&str>,
        proxy: Option<&str>,
        state_path: Option<PathBuf>,
    ) -> Result<Self, ClientError> {
        if let Some(raw) = backend {
            self.backend_url = backend_url("--backend-url", raw)?;
            if proxy.is_none() {
                self.proxy_url = format!("{}/v1/chat/completions", self.backend_url);
            }
        }
        if let Some(url) = proxy {
            self.proxy_url = url.to_string();
        }
        if let Some(path) = state_path {
            self.state_path = path;
        }
        Ok(self)
    }
}

fn backend_url(source: &str, raw: &str) -> Result<String, ClientError> {
    let url = raw.trim().trim_end_matches('/').to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ClientError::Config(
            source.to_string(),
            format!("'{}' is not an http(s) URL", url),
        ));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_defaults_to_backend_completions_path() {
        let config = ClientConfig::from_lookup(|key| {
            (key == "LEGAL_BACKEND_URL").then(|| "https://legal.example/".to_string())
        })
        .unwrap();
        assert_eq!(config.backend_url, "https://legal.example");
        assert_eq!(config.proxy_url, "https://legal.example/v1/chat/completions");
        assert_eq!(config.state_path, PathBuf::from(".legal_session.json"));
    }

    #[test]
    fn backend_must_be_http() {
        let err = ClientConfig::from_lookup(|key| {
            (key == "LEGAL_BACKEND_URL").then(|| "ftp://nope".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(ref var, _) if var == "LEGAL_BACKEND_URL"));
    }

    #[test]
    fn command_line_backend_is_checked_too() {
        let base = ClientConfig::from_lookup(|_| None).unwrap();
        let err = base.clone().with_overrides(Some("ftp://nope"), None, None).unwrap_err();
        assert!(matches!(err, ClientError::Config(ref source, _) if source == "--backend-url"));

        let moved = base
            .with_overrides(Some("https://other.example/"), None, Some(PathBuf::from("s.json")))
            .unwrap();
        assert_eq!(moved.backend_url, "https://other.example");
        assert_eq!(moved.proxy_url, "https://other.example/v1/chat/completions");
        assert_eq!(moved.state_path, PathBuf::from("s.json"));
    }

    #[test]
    fn explicit_proxy_wins_over_moved_backend() {
        let config = ClientConfig::from_lookup(|_| None)
            .unwrap()
            .with_overrides(Some("http://a.example"), Some("http://proxy.example/chat"), None)
            .unwrap();
        assert_eq!(config.backend_url, "http://a.example");
        assert_eq!(config.proxy_url, "http://proxy.example/chat");
    }
}
