//! crates/legal_analyzer_client/src/lib.rs
//!
//! Client-side implementations of the analyzer ports: reqwest adapters for
//! the persistence API and the chat proxy, and a JSON file holding the
//! session id between runs.

pub mod config;
pub mod error;
pub mod http;
pub mod session_store;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{HttpBackend, HttpCompletionClient};
pub use session_store::FileSessionStore;
