//! Service metrics
//!
//! Counters and histograms are registered through the `metrics` crate and
//! exported in Prometheus text format when the recorder is installed. With no
//! recorder installed every handle is a no-op.

use crate::error::ScreenshotError;
use metrics::{register_counter, register_histogram, Counter, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub struct Metrics {
    screenshots_taken: Counter,
    screenshots_failed: Counter,
    screenshot_duration: Histogram,
    rate_limited: Counter,
    error_count: Counter,
    timeout_errors: Counter,
    browser_errors: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            screenshots_taken: register_counter!("screenshots_taken_total"),
            screenshots_failed: register_counter!("screenshots_failed_total"),
            screenshot_duration: register_histogram!("screenshot_duration_seconds"),
            rate_limited: register_counter!("requests_rate_limited_total"),
            error_count: register_counter!("errors_total"),
            timeout_errors: register_counter!("timeout_errors_total"),
            browser_errors: register_counter!("browser_errors_total"),
        }
    }

    pub fn record_screenshot(&self, duration: Duration, success: bool) {
        if success {
            self.screenshots_taken.increment(1);
        } else {
            self.screenshots_failed.increment(1);
        }

        self.screenshot_duration.record(duration.as_secs_f64());
    }

    pub fn record_error(&self, error_type: &str) {
        self.error_count.increment(1);

        match error_type {
            "timeout" => self.timeout_errors.increment(1),
            "browser" => self.browser_errors.increment(1),
            _ => {}
        }
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the Prometheus recorder and return the handle that renders the
/// text exposition for `GET /metrics`.
///
/// Must run before any [`Metrics`] is created; handles registered without a
/// recorder stay no-ops for the life of the process.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, ScreenshotError> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::set_boxed_recorder(Box::new(recorder))
        .map_err(|e| ScreenshotError::ConfigurationError(format!("metrics recorder: {e}")))?;

    Ok(handle)
}
