use std::time::Duration;

use rand::rngs::OsRng;
use rand::Rng;
use tracing::{debug, warn};
use url::Url;

use tabrelay_core::config::MailboxConfig;
use tabrelay_core::AutomationError;

const LOCAL_PART_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Throwaway mailbox provisioning. One attempt at the public generator, then a
/// locally synthesized address.
pub struct DisposableMailbox {
    client: reqwest::Client,
    endpoint: Option<Url>,
    fallback_domain: String,
}

impl DisposableMailbox {
    pub fn from_config(config: &MailboxConfig) -> Result<Self, AutomationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AutomationError::Config(format!("mailbox client: {}", e)))?;

        let endpoint = match config.endpoint.trim() {
            "" => None,
            raw => Some(
                Url::parse(raw).map_err(|e| AutomationError::Config(format!("mailbox endpoint: {}", e)))?,
            ),
        };

        Ok(Self {
            client,
            endpoint,
            fallback_domain: config.fallback_domain.clone(),
        })
    }

    /// Never calls out; every address is synthesized locally.
    pub fn offline(fallback_domain: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: None,
            fallback_domain: fallback_domain.into(),
        }
    }

    pub async fn provision(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            match self.request_mailbox(endpoint).await {
                Some(address) => {
                    debug!(address = %address, "provisioned disposable mailbox");
                    return address;
                }
                None => warn!(endpoint = %endpoint, "mailbox generator unavailable, using local address"),
            }
        }
        self.fallback_address()
    }

    async fn request_mailbox(&self, endpoint: &Url) -> Option<String> {
        let resp = self.client.get(endpoint.as_str()).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: serde_json::Value = resp.json().await.ok()?;

        body.as_array()?
            .first()?
            .as_str()
            .map(str::trim)
            .filter(|addr| is_plausible_address(addr))
            .map(str::to_string)
    }

    pub fn fallback_address(&self) -> String {
        let mut rng = OsRng;
        let local: String = (0..10)
            .map(|_| LOCAL_PART_CHARSET[rng.gen_range(0..LOCAL_PART_CHARSET.len())] as char)
            .collect();
        format!("user_{}@{}", local, self.fallback_domain)
    }
}

fn is_plausible_address(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !addr.contains(char::is_whitespace),
        None => false,
    }
}
