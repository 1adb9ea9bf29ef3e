//! Screenshot capture pipeline
//!
//! This module provides the primary `ScreenshotService` that turns an HTTP
//! screenshot request into an encoded image: request validation, browser
//! acquisition, page navigation, capture and format conversion.

use crate::browser::BrowserHandle;
use crate::config::{Config, OutputFormat, Viewport};
use crate::error::{ErrorSeverity, ScreenshotError};
use crate::metrics::Metrics;
use crate::utils::{format_bytes, format_duration, png_dimensions, sanitize_filename, validate_url};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Default JPEG quality when a request asks for JPEG without a quality value.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Upper bound for per-request `waitFor` delays, in milliseconds.
pub const MAX_WAIT_FOR_MS: u64 = 30_000;

/// Upper bound for per-request `timeout` overrides, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 120_000;

/// Largest accepted viewport dimension, per axis.
pub const MAX_VIEWPORT_DIM: u32 = 7_680;

/// Incoming screenshot request body.
///
/// Only `url` is required; everything else falls back to server defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreenshotRequest {
    pub url: Option<String>,
    /// CSS selector; when present only that element is captured
    pub selector: Option<String>,
    pub full_page: bool,
    /// Target filename for file-mode responses
    pub filename: Option<String>,
    pub format: Option<OutputFormat>,
    /// JPEG quality, 1-100
    pub quality: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Extra delay after page load, in milliseconds
    pub wait_for: Option<u64>,
    /// Per-request capture timeout override, in milliseconds
    pub timeout: Option<u64>,
    /// Inline the image as base64 (default) instead of writing a file
    pub return_base64: Option<bool>,
    pub mobile: bool,
}

/// Successful screenshot response body.
///
/// Exactly one of `image` and `file` is set, depending on the requested
/// response mode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub mime_type: String,
    pub size: usize,
    pub dimensions: Dimensions,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A fully validated request with every default applied.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub id: String,
    pub url: String,
    pub selector: Option<String>,
    pub full_page: bool,
    pub filename: String,
    pub format: OutputFormat,
    pub quality: u8,
    pub viewport: Viewport,
    pub wait_for: Duration,
    pub timeout: Duration,
    pub return_base64: bool,
}

/// Captured image data before response shaping.
pub struct CaptureResult {
    pub data: Vec<u8>,
    pub dimensions: Dimensions,
    pub final_url: String,
}

/// Screenshot service backed by the shared browser instance
///
/// Coordinates the whole capture pipeline for one request at a time while
/// reusing a single Chrome process across requests.
///
/// # Examples
///
/// ```rust,no_run
/// use screenshot_server::{Config, ScreenshotRequest, ScreenshotService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = ScreenshotService::new(Config::default());
///
///     let request = ScreenshotRequest {
///         url: Some("https://example.com".to_string()),
///         ..Default::default()
///     };
///     let response = service.take_screenshot(request).await?;
///     println!("Captured {} bytes", response.size);
///
///     service.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ScreenshotService {
    browser: Arc<BrowserHandle>,
    config: Config,
    metrics: Metrics,
}

impl ScreenshotService {
    pub fn new(config: Config) -> Self {
        Self {
            browser: Arc::new(BrowserHandle::new(config.clone())),
            config,
            metrics: Metrics::new(),
        }
    }

    /// Runs the full pipeline for one request: validate, capture, encode,
    /// shape the response.
    pub async fn take_screenshot(
        &self,
        request: ScreenshotRequest,
    ) -> Result<ScreenshotResponse, ScreenshotError> {
        let resolved = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.metrics.record_error("validation");
                warn!("Rejected screenshot request: {}", e);
                return Err(e);
            }
        };

        debug!(
            "Screenshot request {} for {} ({}x{}, format {:?})",
            resolved.id,
            resolved.url,
            resolved.viewport.width,
            resolved.viewport.height,
            resolved.format
        );

        let start = Instant::now();
        let result = self.capture(&resolved).await;
        let elapsed = start.elapsed();

        match result {
            Ok(capture) => {
                self.metrics.record_screenshot(elapsed, true);
                let response = self.build_response(&resolved, capture).await?;
                info!(
                    "Captured {} as {} ({} in {})",
                    resolved.url,
                    resolved.format.mime_type(),
                    format_bytes(response.size),
                    format_duration(elapsed)
                );
                Ok(response)
            }
            Err(e) => {
                self.metrics.record_screenshot(elapsed, false);
                self.metrics.record_error(error_kind(&e));
                match e.severity() {
                    ErrorSeverity::Low => {
                        warn!("Screenshot request {} failed: {}", resolved.id, e)
                    }
                    _ => error!("Screenshot request {} failed: {}", resolved.id, e),
                }
                Err(e)
            }
        }
    }

    /// Validates a wire request and applies server defaults.
    pub fn resolve(&self, request: ScreenshotRequest) -> Result<ResolvedRequest, ScreenshotError> {
        let url = match request.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Err(ScreenshotError::MissingUrl),
        };
        validate_url(&url)?;

        let format = request.format.unwrap_or(self.config.output_format);

        let quality = request.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
        if quality == 0 || quality > 100 {
            return Err(ScreenshotError::InvalidParameter(
                "quality must be between 1 and 100".to_string(),
            ));
        }

        let mut viewport = if request.mobile {
            Viewport::mobile()
        } else {
            self.config.viewport
        };
        if let Some(width) = request.width {
            if width == 0 || width > MAX_VIEWPORT_DIM {
                return Err(ScreenshotError::InvalidParameter(format!(
                    "width must be between 1 and {MAX_VIEWPORT_DIM}"
                )));
            }
            viewport.width = width;
        }
        if let Some(height) = request.height {
            if height == 0 || height > MAX_VIEWPORT_DIM {
                return Err(ScreenshotError::InvalidParameter(format!(
                    "height must be between 1 and {MAX_VIEWPORT_DIM}"
                )));
            }
            viewport.height = height;
        }

        let wait_for_ms = request.wait_for.unwrap_or(0);
        if wait_for_ms > MAX_WAIT_FOR_MS {
            return Err(ScreenshotError::InvalidParameter(format!(
                "waitFor must not exceed {MAX_WAIT_FOR_MS}ms"
            )));
        }

        let timeout = match request.timeout {
            Some(ms) => {
                if ms == 0 || ms > MAX_TIMEOUT_MS {
                    return Err(ScreenshotError::InvalidParameter(format!(
                        "timeout must be between 1 and {MAX_TIMEOUT_MS}ms"
                    )));
                }
                Duration::from_millis(ms)
            }
            None => self.config.screenshot_timeout,
        };

        let filename = match request.filename.as_deref() {
            Some(name) => {
                let sanitized = sanitize_filename(name);
                if sanitized.is_empty() {
                    default_filename(format)
                } else {
                    sanitized
                }
            }
            None => default_filename(format),
        };

        Ok(ResolvedRequest {
            id: uuid::Uuid::new_v4().to_string(),
            url,
            selector: request.selector.filter(|s| !s.trim().is_empty()),
            full_page: request.full_page,
            filename,
            format,
            quality,
            viewport,
            wait_for: Duration::from_millis(wait_for_ms),
            timeout,
            return_base64: request.return_base64.unwrap_or(true),
        })
    }

    async fn capture(&self, resolved: &ResolvedRequest) -> Result<CaptureResult, ScreenshotError> {
        let browser = self.browser.get_or_launch().await?;

        let page = {
            let browser = browser.lock().await;
            browser
                .new_page(resolved.url.as_str())
                .await
                .map_err(|e| ScreenshotError::UrlLoadFailed(e.to_string()))?
        };

        let result = match timeout(resolved.timeout, self.capture_on_page(&page, resolved)).await {
            Ok(result) => result,
            Err(_) => Err(ScreenshotError::Timeout(resolved.timeout)),
        };

        // Close the page in both paths so a failed capture cannot leak tabs
        let _ = page.close().await;

        result
    }

    async fn capture_on_page(
        &self,
        page: &Page,
        resolved: &ResolvedRequest,
    ) -> Result<CaptureResult, ScreenshotError> {
        let viewport = &resolved.viewport;

        let emulation_params =
            chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
                .width(viewport.width)
                .height(viewport.height)
                .device_scale_factor(viewport.device_scale_factor)
                .mobile(viewport.mobile)
                .build()
                .map_err(|e| ScreenshotError::PageError(e.to_string()))?;

        page.execute(emulation_params)
            .await
            .map_err(|e| ScreenshotError::PageError(e.to_string()))?;

        if self.config.wait_for_network_idle {
            page.wait_for_navigation()
                .await
                .map_err(|e| ScreenshotError::PageError(e.to_string()))?;
        }

        if !resolved.wait_for.is_zero() {
            sleep(resolved.wait_for).await;
        }

        let png_data = if let Some(selector) = &resolved.selector {
            self.capture_element(page, selector).await?
        } else if resolved.full_page {
            self.capture_full_page(page).await?
        } else {
            self.capture_viewport(page).await?
        };

        // Dimensions come from the PNG header before any format conversion
        let dimensions = png_dimensions(&png_data)
            .map(|(width, height)| Dimensions { width, height })
            .unwrap_or(Dimensions {
                width: viewport.width,
                height: viewport.height,
            });

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| resolved.url.clone());

        let data = convert_image(png_data, resolved.format, resolved.quality)?;

        Ok(CaptureResult {
            data,
            dimensions,
            final_url,
        })
    }

    async fn capture_viewport(&self, page: &Page) -> Result<Vec<u8>, ScreenshotError> {
        let screenshot_params = ScreenshotParams::builder()
            .format(chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat::Png)
            .build();

        page.screenshot(screenshot_params)
            .await
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))
    }

    async fn capture_full_page(&self, page: &Page) -> Result<Vec<u8>, ScreenshotError> {
        let screenshot_params = ScreenshotParams::builder()
            .format(chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.screenshot(screenshot_params)
            .await
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))
    }

    async fn capture_element(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<Vec<u8>, ScreenshotError> {
        let element = page.find_element(selector).await.map_err(|e| {
            debug!("Element lookup failed for '{}': {}", selector, e);
            ScreenshotError::ElementNotFound(selector.to_string())
        })?;

        element
            .screenshot(chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))
    }

    async fn build_response(
        &self,
        resolved: &ResolvedRequest,
        capture: CaptureResult,
    ) -> Result<ScreenshotResponse, ScreenshotError> {
        let size = capture.data.len();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let (image, file) = if resolved.return_base64 {
            (Some(BASE64.encode(&capture.data)), None)
        } else {
            tokio::fs::create_dir_all(&self.config.output_dir).await?;
            let path = self.config.output_dir.join(&resolved.filename);
            tokio::fs::write(&path, &capture.data).await?;
            debug!("Wrote {} to {}", format_bytes(size), path.display());
            (None, Some(path.to_string_lossy().into_owned()))
        };

        Ok(ScreenshotResponse {
            success: true,
            image,
            file,
            mime_type: resolved.format.mime_type().to_string(),
            size,
            dimensions: capture.dimensions,
            url: capture.final_url,
            timestamp,
        })
    }

    /// Whether the shared browser instance is currently live. Never triggers
    /// a launch.
    pub async fn browser_connected(&self) -> bool {
        self.browser.is_connected().await
    }

    pub async fn shutdown(&self) {
        info!("Shutting down screenshot service...");
        self.browser.shutdown().await;
        info!("Screenshot service shutdown complete");
    }
}

/// Re-encode a captured PNG into the requested output format.
///
/// PNG passes through untouched. JPEG honors the quality setting; WebP uses
/// the encoder's lossless mode, so quality does not apply.
pub fn convert_image(
    png_data: Vec<u8>,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, ScreenshotError> {
    match format {
        OutputFormat::Png => Ok(png_data),
        OutputFormat::Jpeg => {
            let img = image::load_from_memory(&png_data)
                .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?;

            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            let mut jpeg_data = Vec::new();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_data, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?;

            Ok(jpeg_data)
        }
        OutputFormat::Webp => {
            let img = image::load_from_memory(&png_data)
                .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?;

            let mut webp_data = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut webp_data),
                image::ImageFormat::WebP,
            )
            .map_err(|e| ScreenshotError::CaptureFailed(e.to_string()))?;

            Ok(webp_data)
        }
    }
}

fn default_filename(format: OutputFormat) -> String {
    format!("screenshot.{}", format.extension())
}

fn error_kind(error: &ScreenshotError) -> &'static str {
    match error {
        ScreenshotError::Timeout(_) => "timeout",
        ScreenshotError::ElementNotFound(_) => "element",
        ScreenshotError::BrowserUnavailable
        | ScreenshotError::BrowserLaunchFailed(_)
        | ScreenshotError::BrowserProcessDied(_) => "browser",
        ScreenshotError::UrlLoadFailed(_) | ScreenshotError::PageError(_) => "page",
        _ => "other",
    }
}
