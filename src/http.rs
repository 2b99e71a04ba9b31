//! HTTP capability used by the type resolver and the tarball installer.
use std::io::Read;
use std::time::Duration;

use anyhow::{Context as _, Result};

const USER_AGENT: &str = concat!("rsm/", env!("CARGO_PKG_VERSION"));

/// Probe and stream remote resources.
pub trait HttpClient: Send + Sync {
    /// Issue a `HEAD` request (following redirects) and return the
    /// `Content-Type` header, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success status.
    fn content_type(&self, url: &str) -> Result<Option<String>>;

    /// Issue a `GET` request and return the response body as a stream.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success status.
    fn open(&self, url: &str) -> Result<Box<dyn Read>>;
}

/// [`HttpClient`] backed by `ureq`.
///
/// The probe agent bounds the whole request by the configured timeout.  The
/// download agent bounds connecting and waiting for response headers only, so
/// large archives are not cut off mid-stream.
#[derive(Debug)]
pub struct UreqClient {
    probe: ureq::Agent,
    download: ureq::Agent,
}

impl UreqClient {
    /// Create a client whose network waits are bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let probe = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let download = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .build();
        Self {
            probe: ureq::Agent::new_with_config(probe),
            download: ureq::Agent::new_with_config(download),
        }
    }
}

impl HttpClient for UreqClient {
    fn content_type(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .probe
            .head(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(describe_error)
            .with_context(|| format!("HEAD {url}"))?;
        Ok(response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }

    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        let response = self
            .download
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(describe_error)
            .with_context(|| format!("GET {url}"))?;
        Ok(Box::new(response.into_body().into_reader()))
    }
}

fn describe_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(code) => anyhow::anyhow!("HTTP {code}"),
        ureq::Error::Timeout(_) => anyhow::anyhow!("timed out"),
        other => anyhow::Error::new(other),
    }
}

/// Media type of a `Content-Type` value, lowercased and without parameters.
#[must_use]
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
