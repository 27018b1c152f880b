//! HTTP transport to the certificate authority.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nodecert_core::{CaTransport, CertError, Certificate, Result, SigningRequest};
use reqwest::{Client as HttpClient, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::TransportConfig;

/// Marker the CA puts in a 400 body when a CSR is already pending
const PENDING_REQUEST_MARKER: &str = "already has a requested certificate";

/// Name under which the CA publishes its own certificate and CRL
const CA_NAME: &str = "ca";

/// CA transport over HTTPS
#[derive(Clone)]
pub struct HttpCaTransport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    config: TransportConfig,
    base_url: Url,
    user_agent: String,
}

impl HttpCaTransport {
    /// Create a transport with default settings for the given configuration
    pub fn new(config: TransportConfig) -> Result<Self> {
        HttpCaTransportBuilder::new(config).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(config: TransportConfig) -> HttpCaTransportBuilder {
        HttpCaTransportBuilder::new(config)
    }

    /// Base URL requests are made against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// GET a PEM document; `None` on 404
    async fn get_pem(&self, segments: &[&str], bootstrap: bool) -> Result<Option<String>> {
        let url = self.build_url(segments)?;
        debug!(url = %url, "GET request");

        let response = self
            .http(bootstrap)?
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| self.send_error(&Method::GET, &url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url = %url, "not found");
            return Ok(None);
        }

        let body = read_body(response).await?;
        if status.is_success() {
            Ok(Some(body))
        } else {
            Err(status_error(&Method::GET, &url, status, body))
        }
    }

    /// Build a URL from path segments, percent-encoding each one
    fn build_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CertError::Configuration(format!("invalid CA URL: {}", self.inner.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build the HTTP client for one request.
    ///
    /// Rebuilt per request so that a CA bundle written earlier in the same
    /// run is picked up for server verification.
    fn http(&self, bootstrap: bool) -> Result<HttpClient> {
        let config = &self.inner.config;
        let mut builder = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(&self.inner.user_agent)
            .gzip(true);

        match config.ca_bundle.as_deref().filter(|p| p.exists()) {
            Some(path) => {
                let pem = read_file(path)?;
                let roots = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                    CertError::Crypto(format!("invalid CA bundle {}: {e}", path.display()))
                })?;
                builder = builder.tls_built_in_root_certs(false);
                for root in roots {
                    builder = builder.add_root_certificate(root);
                }
            }
            None if bootstrap => {
                warn!(
                    ca_server = %config.ca_server,
                    "no local CA bundle yet; fetching it without verifying the CA's TLS certificate"
                );
                builder = builder.danger_accept_invalid_certs(true);
            }
            None => {}
        }

        with_client_identity(builder, config)?
            .build()
            .map_err(|e| CertError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })
    }

    fn send_error(&self, method: &Method, url: &Url, e: reqwest::Error) -> CertError {
        let message = if e.is_timeout() {
            format!(
                "{method} {url} timed out after {} seconds",
                self.inner.config.timeout.as_secs()
            )
        } else {
            format!("{method} {url} failed: {e}")
        };
        CertError::Transport {
            message,
            status: None,
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl CaTransport for HttpCaTransport {
    async fn fetch_certificate(&self, certname: &str) -> Result<Option<Certificate>> {
        self.get_pem(&["certificate", certname], false)
            .await?
            .map(|pem| Certificate::from_pem(&pem))
            .transpose()
    }

    async fn submit(&self, csr: &SigningRequest) -> Result<()> {
        let url = self.build_url(&["certificate_request", &csr.certname])?;
        debug!(url = %url, certname = %csr.certname, "PUT request");

        let response = self
            .http(false)?
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(csr.pem().to_string())
            .send()
            .await
            .map_err(|e| self.send_error(&Method::PUT, &url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = read_body(response).await?;
        if status == StatusCode::BAD_REQUEST && body.contains(PENDING_REQUEST_MARKER) {
            return Err(CertError::AlreadySubmitted {
                certname: csr.certname.clone(),
            });
        }
        Err(status_error(&Method::PUT, &url, status, body))
    }

    async fn fetch_ca_bundle(&self) -> Result<String> {
        self.get_pem(&["certificate", CA_NAME], true)
            .await?
            .ok_or_else(|| CertError::Transport {
                message: "the CA did not return its certificate".into(),
                status: Some(StatusCode::NOT_FOUND.as_u16()),
                source: None,
            })
    }

    async fn fetch_crl(&self) -> Result<Option<String>> {
        self.get_pem(&["certificate_revocation_list", CA_NAME], false)
            .await
    }
}

/// Builder for configuring a [`HttpCaTransport`]
pub struct HttpCaTransportBuilder {
    config: TransportConfig,
    base_url: Option<String>,
    user_agent: String,
}

impl HttpCaTransportBuilder {
    /// Create a new builder with the given configuration
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            base_url: None,
            user_agent: format!("nodecert/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Override the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<HttpCaTransport> {
        let raw = self.base_url.unwrap_or_else(|| self.config.base_url());
        let base_url = Url::parse(&raw)
            .map_err(|e| CertError::Configuration(format!("invalid CA URL '{raw}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CertError::Configuration(format!("invalid CA URL '{raw}'")));
        }

        Ok(HttpCaTransport {
            inner: Arc::new(TransportInner {
                config: self.config,
                base_url,
                user_agent: self.user_agent,
            }),
        })
    }
}

async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    response.text().await.map_err(|e| CertError::Transport {
        message: format!("failed to read response body: {e}"),
        status: Some(status.as_u16()),
        source: Some(Box::new(e)),
    })
}

fn status_error(method: &Method, url: &Url, status: StatusCode, body: String) -> CertError {
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("{method} {url} returned {status}")
    } else {
        format!("{method} {url} returned {status}: {detail}")
    };
    CertError::Transport {
        message,
        status: Some(status.as_u16()),
        source: None,
    }
}

/// Present the host certificate once both it and its key are on disk
#[cfg(feature = "rustls")]
fn with_client_identity(
    builder: reqwest::ClientBuilder,
    config: &TransportConfig,
) -> Result<reqwest::ClientBuilder> {
    match &config.client_identity {
        Some((cert, key)) if cert.exists() && key.exists() => {
            let mut pem = read_file(key)?;
            pem.extend(read_file(cert)?);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| CertError::Crypto(format!("invalid client identity: {e}")))?;
            Ok(builder.identity(identity))
        }
        _ => Ok(builder),
    }
}

#[cfg(not(feature = "rustls"))]
fn with_client_identity(
    builder: reqwest::ClientBuilder,
    _config: &TransportConfig,
) -> Result<reqwest::ClientBuilder> {
    Ok(builder)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| CertError::io(path, e))
}
