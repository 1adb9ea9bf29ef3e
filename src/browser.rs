//! Shared browser lifecycle management
//!
//! One Chrome instance serves the whole process. It is launched lazily on the
//! first capture, reused across requests, replaced when its DevTools
//! connection dies, and torn down on shutdown.

use crate::config::{create_browser_config, Config};
use crate::error::ScreenshotError;
use crate::utils::format_duration;
use chromiumoxide::browser::Browser;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// A live Chrome instance together with its event handler task.
struct BrowserSlot {
    browser: Arc<Mutex<Browser>>,
    /// Background task polling Chrome DevTools Protocol events
    handler_task: tokio::task::JoinHandle<()>,
    /// Cleared by the handler task when the event stream ends
    alive: Arc<AtomicBool>,
    launched_at: Instant,
    pages_served: usize,
}

impl BrowserSlot {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed) && !self.handler_task.is_finished()
    }

    fn mark_used(&mut self) {
        self.pages_served += 1;
    }

    async fn teardown(self) {
        self.alive.store(false, Ordering::Relaxed);

        {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            // Give Chrome a moment to exit before force-killing it
            sleep(Duration::from_millis(500)).await;
            let _ = browser.kill().await;
        }

        self.handler_task.abort();
    }
}

/// Process-wide handle to the shared browser instance.
///
/// All captures go through this handle. A dead instance is detected here and
/// replaced before the next capture, so a Chrome crash costs one failed
/// request at most.
pub struct BrowserHandle {
    slot: Mutex<Option<BrowserSlot>>,
    config: Config,
}

impl BrowserHandle {
    /// Creates an empty handle. Chrome is not launched until the first
    /// capture asks for it.
    pub fn new(config: Config) -> Self {
        Self {
            slot: Mutex::new(None),
            config,
        }
    }

    /// Returns the browser for the next capture, launching or replacing the
    /// underlying Chrome instance as needed.
    pub async fn get_or_launch(&self) -> Result<Arc<Mutex<Browser>>, ScreenshotError> {
        let mut slot = self.slot.lock().await;

        if let Some(instance) = slot.as_mut() {
            if instance.is_alive() {
                instance.mark_used();
                debug!(
                    "Reusing browser instance (pages served: {})",
                    instance.pages_served
                );
                return Ok(instance.browser.clone());
            }

            warn!("Browser connection lost, replacing instance");
            if let Some(dead) = slot.take() {
                dead.teardown().await;
            }
        }

        let mut instance = self.launch().await?;
        instance.mark_used();
        let browser = instance.browser.clone();
        *slot = Some(instance);
        Ok(browser)
    }

    async fn launch(&self) -> Result<BrowserSlot, ScreenshotError> {
        let browser_config = create_browser_config(&self.config)?;

        info!("Launching Chrome instance");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScreenshotError::BrowserLaunchFailed(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive.clone();

        // The handler drives DevTools Protocol communication and must be
        // polled for the connection to stay up.
        let handler_task = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Browser handler error: {}", e);
                        break;
                    }
                    None => {
                        info!("Browser handler stream ended");
                        break;
                    }
                }
            }
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        info!("Chrome instance ready");
        Ok(BrowserSlot {
            browser: Arc::new(Mutex::new(browser)),
            handler_task,
            alive,
            launched_at: Instant::now(),
            pages_served: 0,
        })
    }

    /// Whether a live browser instance currently exists. Reported by the
    /// health endpoint; never triggers a launch.
    pub async fn is_connected(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.as_ref().map(|s| s.is_alive()).unwrap_or(false)
    }

    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(instance) = slot.take() {
            info!(
                "Shutting down browser (age: {}, pages served: {})",
                format_duration(instance.launched_at.elapsed()),
                instance.pages_served
            );
            instance.teardown().await;
            info!("Browser shutdown complete");
        }
    }
}
