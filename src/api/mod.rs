//! HTTP API for the video Q&A service
//!
//! Serves the browser page and the JSON endpoints it uses.

use anyhow::Result;
use tracing::info;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{router, AppState};

/// API Server for handling REST requests
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            host: host.into(),
            port,
        }
    }

    /// Run the API server until it fails
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on {}:{}", self.host, self.port);
        server::start_http_server(self.state, &self.host, self.port).await
    }
}
