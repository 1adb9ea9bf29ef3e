//! Configuration management with serde serialization/deserialization
//!
//! This module provides all configuration structures and utilities for the
//! screenshot server, including HTTP settings, browser launch options, and
//! output formats.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScreenshotError;

/// Main configuration structure for the screenshot server
///
/// Controls the HTTP surface, the shared browser instance, capture defaults
/// and rate limiting.
///
/// # Examples
///
/// ```rust
/// use screenshot_server::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     port: 8080,
///     metrics_enabled: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to (default: "0.0.0.0")
    pub bind: String,

    /// Port the HTTP server listens on (default: 3030)
    pub port: u16,

    /// Timeout for individual screenshot operations (default: 30 seconds)
    ///
    /// Requests that take longer than this fail with an error response.
    /// Individual requests may shorten or extend it via the `timeout` field.
    pub screenshot_timeout: Duration,

    /// Wait for network activity to settle before capturing (default: true)
    ///
    /// Increases accuracy on script-heavy pages at the cost of latency.
    pub wait_for_network_idle: bool,

    /// Default browser viewport for captures
    pub viewport: Viewport,

    /// Output image format when a request does not specify one (default: PNG)
    pub output_format: OutputFormat,

    /// Directory where file-mode screenshots are written (default: "screenshots")
    pub output_dir: PathBuf,

    /// Request rate limiting applied before any browser work
    pub rate_limit: RateLimitSettings,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    ///
    /// If None, chromiumoxide detects the local Chrome installation.
    pub chrome_path: Option<String>,

    /// Custom User-Agent string for page loads (default: Chrome default)
    pub user_agent: Option<String>,

    /// Expose Prometheus metrics on GET /metrics (default: false)
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3030,
            screenshot_timeout: Duration::from_secs(30),
            wait_for_network_idle: true,
            viewport: Viewport::default(),
            output_format: OutputFormat::Png,
            output_dir: PathBuf::from("screenshots"),
            rate_limit: RateLimitSettings::default(),
            chrome_path: None,
            user_agent: None,
            metrics_enabled: false,
        }
    }
}

/// Browser viewport configuration for captures
///
/// Controls the emulated window size and display characteristics used when
/// rendering pages.
///
/// # Examples
///
/// ```rust
/// use screenshot_server::Viewport;
///
/// // Desktop viewport (default)
/// let desktop = Viewport::default();
///
/// // Mobile viewport preset
/// let mobile = Viewport::mobile();
/// assert_eq!(mobile.width, 375);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,

    /// Device pixel ratio for high-DPI displays (default: 1.0)
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

impl Viewport {
    /// Mobile emulation preset used when a request sets `mobile: true`
    /// without explicit dimensions.
    pub fn mobile() -> Self {
        Self {
            width: 375,
            height: 667,
            device_scale_factor: 2.0,
            mobile: true,
        }
    }
}

/// Fixed-window rate limiting settings
///
/// Requests beyond `max_requests` within `window` are rejected before any
/// browser work starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Maximum requests accepted per window (default: 60)
    pub max_requests: usize,

    /// Window length (default: 60 seconds)
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Supported output image formats
///
/// Each format has different characteristics:
/// - PNG: lossless compression, larger files, best quality
/// - JPEG: lossy compression, smaller files, honors the `quality` setting
/// - WebP: modern format with a good balance of size and quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG format - lossless compression, best quality
    Png,
    /// JPEG format - lossy compression, smaller files
    #[serde(alias = "jpg")]
    Jpeg,
    /// WebP format - modern compression, good balance of size and quality
    Webp,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }
}

/// Generate Chrome command-line arguments based on configuration
///
/// Creates a set of Chrome command-line arguments suited to headless
/// screenshot operation.
///
/// # Examples
///
/// ```rust
/// use screenshot_server::{Config, get_chrome_args};
///
/// let config = Config::default();
/// let args = get_chrome_args(&config);
/// assert!(args.iter().any(|a| a == "--headless"));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    // Unique user data dir so a restarted server never trips over a stale
    // Chrome singleton lock.
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
        format!("--user-data-dir=/tmp/chromium-screenshot-{}", unique_id),
    ];

    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

/// Build the chromiumoxide launch configuration from server settings.
pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, ScreenshotError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(ScreenshotError::ConfigurationError)
}

/// Reject configurations that cannot produce a working server.
pub fn validate_config(config: &Config) -> Result<(), ScreenshotError> {
    if config.port == 0 {
        return Err(ScreenshotError::ConfigurationError(
            "port must be greater than 0".to_string(),
        ));
    }

    if config.screenshot_timeout.is_zero() {
        return Err(ScreenshotError::ConfigurationError(
            "screenshot timeout must be greater than 0".to_string(),
        ));
    }

    if config.viewport.width == 0 || config.viewport.height == 0 {
        return Err(ScreenshotError::ConfigurationError(
            "viewport dimensions must be greater than 0".to_string(),
        ));
    }

    if config.rate_limit.max_requests == 0 {
        return Err(ScreenshotError::ConfigurationError(
            "rate limit must allow at least one request per window".to_string(),
        ));
    }

    if config.rate_limit.window.is_zero() {
        return Err(ScreenshotError::ConfigurationError(
            "rate limit window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
