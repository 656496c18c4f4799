use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use tabrelay_core::config::FetchConfig;
use tabrelay_core::AutomationError;

use crate::analyzer::FormFields;
use crate::fetcher::{check_url, FetchError};
use crate::identity::Identity;

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("submit target rejected: {0}")]
    Target(#[from] FetchError),

    #[error("submission request failed: {0}")]
    Network(String),
}

impl From<SubmissionError> for AutomationError {
    fn from(e: SubmissionError) -> Self {
        AutomationError::Submission { status: None, message: e.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub status: u16,
    pub success: bool,
}

impl SubmissionOutcome {
    pub fn from_status(status: u16) -> Self {
        Self { status, success: status == 200 || status == 302 }
    }
}

/// Where to POST: the detected endpoint resolved against the page, or the page
/// itself when there is no usable endpoint.
pub fn resolve_submit_target(fields: Option<&FormFields>, page_url: &Url, allow_private_hosts: bool) -> Url {
    let Some(endpoint) = fields.and_then(|f| f.endpoint.as_deref()) else {
        return page_url.clone();
    };

    match page_url.join(endpoint) {
        Ok(target) => match check_url(&target, allow_private_hosts) {
            Ok(()) => target,
            Err(e) => {
                warn!(endpoint, error = %e, "detected endpoint rejected, posting to page url");
                page_url.clone()
            }
        },
        Err(e) => {
            debug!(endpoint, error = %e, "unparseable endpoint, posting to page url");
            page_url.clone()
        }
    }
}

pub struct FormSubmitter {
    client: reqwest::Client,
    allow_private_hosts: bool,
}

impl FormSubmitter {
    pub fn new(config: &FetchConfig) -> Result<Self, AutomationError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AutomationError::Config(format!("submit client: {}", e)))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// POST the identity as a urlencoded form. Redirects are reported, not followed.
    pub async fn submit(&self, target: &Url, identity: &Identity) -> Result<SubmissionOutcome, SubmissionError> {
        check_url(target, self.allow_private_hosts)?;

        let form = [
            ("email", identity.email.as_str()),
            ("password", identity.password.as_str()),
            ("birthdate", identity.birthdate.as_str()),
        ];

        let resp = self
            .client
            .post(target.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let outcome = SubmissionOutcome::from_status(resp.status().as_u16());
        info!(target = %target, status = outcome.status, success = outcome.success, "form submitted");
        Ok(outcome)
    }
}
