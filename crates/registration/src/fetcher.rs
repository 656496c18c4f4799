use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use url::{Host, Url};

use tabrelay_core::config::FetchConfig;
use tabrelay_core::AutomationError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("refusing private or loopback host '{0}'")]
    PrivateHost(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },
}

impl FetchError {
    /// Errors raised by URL validation, before any request is sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidUrl(_) | FetchError::UnsupportedScheme(_) | FetchError::PrivateHost(_)
        )
    }
}

impl From<FetchError> for AutomationError {
    fn from(e: FetchError) -> Self {
        let status = match &e {
            FetchError::Status(code) => Some(*code),
            _ => None,
        };
        AutomationError::Fetch { status, message: e.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub final_url: Url,
    pub status: u16,
    pub html: String,
    pub response_time_ms: u64,
}

/// Anything that can hand back the HTML behind a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Parse and vet an outbound target. Only http/https leave the process.
pub fn validate_target(raw: &str, allow_private_hosts: bool) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
    check_url(&url, allow_private_hosts)?;
    Ok(url)
}

pub(crate) fn check_url(url: &Url, allow_private_hosts: bool) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(FetchError::UnsupportedScheme(other.to_string())),
    }

    let host = url
        .host()
        .ok_or_else(|| FetchError::InvalidUrl(format!("{}: missing host", url)))?;

    if !allow_private_hosts && is_private_host(&host) {
        return Err(FetchError::PrivateHost(host.to_string()));
    }

    Ok(())
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".internal")
        }
        Host::Ipv4(ip) => is_private_v4(ip),
        Host::Ipv6(ip) => {
            if let Some(v4) = ip.to_ipv4_mapped() {
                return is_private_v4(&v4);
            }
            is_private_v6(ip)
        }
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// reqwest-backed page fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
    allow_private_hosts: bool,
    max_body_size: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, AutomationError> {
        let allow_private = config.allow_private_hosts;
        let max_hops = config.max_redirect_hops;

        // HTTP-level redirects are re-vetted hop by hop so a public page cannot
        // bounce the request into the internal network.
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_hops {
                return attempt.error("too many redirects");
            }
            match check_url(attempt.url(), allow_private) {
                Ok(()) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(policy)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AutomationError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            allow_private_hosts: allow_private,
            max_body_size: config.max_body_size,
        })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        check_url(url, self.allow_private_hosts)?;

        let start = Instant::now();
        debug!(url = %url, "fetching page");

        let resp = self.client.get(url.as_str()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "page fetch failed");
            FetchError::Network(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let final_url = Url::parse(resp.url().as_str()).unwrap_or_else(|_| url.clone());

        if !resp.status().is_success() {
            return Err(FetchError::Status(status));
        }

        if let Some(len) = resp.content_length() {
            if len as usize > self.max_body_size {
                return Err(FetchError::BodyTooLarge { size: len as usize, max: self.max_body_size });
            }
        }

        let body = resp.bytes().await.map_err(|e| FetchError::Network(e.to_string()))?;
        if body.len() > self.max_body_size {
            return Err(FetchError::BodyTooLarge { size: body.len(), max: self.max_body_size });
        }

        let elapsed = start.elapsed();
        debug!(url = %url, bytes = body.len(), ms = elapsed.as_millis() as u64, "page fetched");

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status,
            html: String::from_utf8_lossy(&body).into_owned(),
            response_time_ms: elapsed.as_millis() as u64,
        })
    }
}
