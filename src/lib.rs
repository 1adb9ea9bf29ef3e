//! # Screenshot Server
//!
//! A small HTTP microservice that captures web page screenshots with headless
//! Chrome. Requests name a URL plus optional selector/viewport/format
//! parameters and receive the image back as an inline base64 payload or a
//! saved file.
//!
//! A single Chrome process serves the whole server: it launches lazily on the
//! first capture, is reused across requests (each request gets its own tab),
//! is replaced when the DevTools connection dies, and shuts down with the
//! process.
//!
//! ## HTTP Surface
//!
//! | Endpoint          | Description                                         |
//! |-------------------|-----------------------------------------------------|
//! | `POST /screenshot`| Capture a page; JSON body, JSON response            |
//! | `GET /health`     | Liveness plus browser connection state              |
//! | `GET /metrics`    | Prometheus exposition (only when enabled)           |
//!
//! ```bash
//! curl -X POST http://localhost:3030/screenshot \
//!   -H 'Content-Type: application/json' \
//!   -d '{"url": "https://example.com", "fullPage": true}'
//! ```
//!
//! ## Library Usage
//!
//! The capture pipeline is usable without the HTTP layer:
//!
//! ```rust,no_run
//! use screenshot_server::{Config, ScreenshotRequest, ScreenshotService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ScreenshotService::new(Config::default());
//!
//!     let request = ScreenshotRequest {
//!         url: Some("https://example.com".to_string()),
//!         ..Default::default()
//!     };
//!     let response = service.take_screenshot(request).await?;
//!     println!("Captured {} bytes", response.size);
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Configuration and settings for the screenshot server
pub mod config;

/// Error types and HTTP status mapping
pub mod error;

/// Shared browser instance lifecycle
pub mod browser;

/// Screenshot capture pipeline
pub mod screenshot_service;

/// HTTP routing and request handlers
pub mod server;

/// Command-line interface for the server binary
pub mod cli;

/// Performance metrics collection and Prometheus export
pub mod metrics;

/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod tests;

pub use browser::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use screenshot_service::*;
pub use server::*;
pub use utils::*;
