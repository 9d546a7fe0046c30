use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use ats_flow::browser::{BrowserOptions, PageError, PageSource};
use ats_flow::config::PathsConfig;
use ats_flow::workflows::jobs::JobStore;
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::blocking::Client;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Where the HTTP handlers find the active profile's data.
#[derive(Clone)]
pub(crate) struct ProfileData {
    pub(crate) profile: String,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) snapshot_dir: PathBuf,
}

impl ProfileData {
    pub(crate) fn new(paths: &PathsConfig, store: Arc<dyn JobStore>) -> Self {
        Self {
            profile: paths.profile.clone(),
            store,
            snapshot_dir: paths.snapshot_dir(),
        }
    }
}

/// Fetches page markup over plain HTTP with the browser's user agent.
pub(crate) struct HttpPageSource {
    client: Client,
    timeout: Duration,
}

impl HttpPageSource {
    pub(crate) fn new(options: &BrowserOptions, timeout: Duration) -> Result<Self, PageError> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(timeout)
            .build()
            .map_err(|err| PageError::Backend(err.to_string()))?;
        Ok(Self { client, timeout })
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, url: &str) -> Result<String, PageError> {
        let failed = |err: reqwest::Error| {
            if err.is_timeout() {
                PageError::Timeout(self.timeout)
            } else {
                PageError::Navigation {
                    url: url.to_string(),
                    reason: err.to_string(),
                }
            }
        };

        self.client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_a_navigation_error() {
        let source = HttpPageSource::new(&BrowserOptions::default(), Duration::from_secs(2))
            .expect("client builds");
        match source.fetch("http://127.0.0.1:1/careers") {
            Err(PageError::Navigation { url, .. }) => assert_eq!(url, "http://127.0.0.1:1/careers"),
            other => panic!("expected navigation error, got {other:?}"),
        }
    }
}
