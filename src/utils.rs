use std::time::Duration;
use url::Url;

use crate::error::ScreenshotError;

/// Fixed-window request counter.
///
/// Counts acquisitions inside the current window and rejects once the limit
/// is reached. Entries older than the window are discarded on each call.
pub struct RateLimiter {
    max_requests: usize,
    window_size: Duration,
    request_times: tokio::sync::Mutex<Vec<std::time::Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_size: Duration) -> Self {
        Self {
            max_requests,
            window_size,
            request_times: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn acquire(&self) -> bool {
        let now = std::time::Instant::now();
        let mut times = self.request_times.lock().await;

        // Remove old requests outside the window
        times.retain(|&time| now.duration_since(time) < self.window_size);

        if times.len() < self.max_requests {
            times.push(now);
            true
        } else {
            false
        }
    }

    pub async fn get_current_rate(&self) -> usize {
        let now = std::time::Instant::now();
        let times = self.request_times.lock().await;

        times
            .iter()
            .filter(|&&time| now.duration_since(time) < self.window_size)
            .count()
    }
}

pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

pub fn validate_url(url: &str) -> Result<Url, ScreenshotError> {
    let parsed =
        Url::parse(url).map_err(|e| ScreenshotError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ScreenshotError::InvalidUrl(format!(
            "unsupported URL scheme '{scheme}', only http/https allowed"
        ))),
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Read image dimensions from a PNG header without decoding the image.
///
/// Width and height live in the IHDR chunk at bytes 16..24, big-endian.
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || data[..8] != PNG_SIGNATURE {
        return None;
    }

    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}
