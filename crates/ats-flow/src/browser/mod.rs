//! Page capability consumed by the ATS workflows.
//!
//! The workflows never drive a browser engine directly. They talk to a
//! [`Page`] and its [`Element`] handles, and every call is fallible so each
//! call site can decide whether a failure is local (one probe, one selector)
//! or fatal for the attempt.

mod html;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub use html::{HtmlBrowser, HtmlPage, PageSource, StaticPageSource};

/// Failure reported by the page capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page is closed")]
    Closed,
    #[error("element detached from the document")]
    Detached,
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("browser backend failed: {0}")]
    Backend(String),
}

impl PageError {
    /// True when the page itself is gone and no further probe can succeed.
    pub fn is_page_gone(&self) -> bool {
        matches!(self, PageError::Closed)
    }
}

/// Handle to a single DOM element.
pub trait Element {
    fn fill(&self, value: &str) -> Result<(), PageError>;
    fn set_input_files(&self, path: &Path) -> Result<(), PageError>;
    fn click(&self) -> Result<(), PageError>;
    fn is_visible(&self) -> Result<bool, PageError>;
    fn input_value(&self) -> Result<String, PageError>;
}

/// A loaded document that can be probed and edited.
pub trait Page: Send {
    fn url(&self) -> String;
    fn goto(&self, url: &str) -> Result<(), PageError>;
    fn content(&self) -> Result<String, PageError>;
    fn query_selector(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, PageError>;
    fn query_selector_all(&self, selector: &str)
        -> Result<Vec<Box<dyn Element + '_>>, PageError>;
    fn wait(&self, duration: Duration) -> Result<(), PageError>;
}

/// Shared browser context (cookies, viewport, user agent) for one batch run.
pub trait BrowserContext: Send + Sync {
    fn new_page(&self) -> Result<Box<dyn Page>, PageError>;
    fn close(&self) -> Result<(), PageError>;
}

/// Opens browser contexts for batch runs.
pub trait BrowserLauncher {
    fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn BrowserContext>, PageError>;
}

/// Context settings applied once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub headless: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            viewport: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            headless: false,
        }
    }
}

/// Owns a browser context for the duration of a run and closes it on drop,
/// however the run ends.
pub struct BrowserSession {
    context: Arc<dyn BrowserContext>,
}

impl BrowserSession {
    pub fn open(
        launcher: &dyn BrowserLauncher,
        options: &BrowserOptions,
    ) -> Result<Self, PageError> {
        let context = launcher.launch(options)?;
        debug!(viewport = ?options.viewport, "browser context opened");
        Ok(Self { context })
    }

    pub fn context(&self) -> &Arc<dyn BrowserContext> {
        &self.context
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        match self.context.close() {
            Ok(()) => debug!("browser context closed"),
            Err(err) => warn!(error = %err, "failed to close browser context"),
        }
    }
}

/// Runs a page call and converts any failure into `fallback`, logging it.
pub(crate) fn probe_or<T>(
    what: &str,
    fallback: T,
    call: impl FnOnce() -> Result<T, PageError>,
) -> T {
    match call() {
        Ok(value) => value,
        Err(err) => {
            debug!(probe = what, error = %err, "page probe failed");
            fallback
        }
    }
}
