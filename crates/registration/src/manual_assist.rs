use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use tabrelay_core::AutomationError;

use crate::analyzer::{AnalyzeError, DetectionTier, FormAnalyzer};
use crate::credentials::{CredentialFlags, CredentialStore};
use crate::identity::IdentityGenerator;

const MANUAL_URL: &str = "manual-input";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAnalysis {
    pub has_form: bool,
    pub email_field: Option<String>,
    pub password_field: Option<String>,
    pub submit_button: Option<String>,
    pub form_action: Option<String>,
    pub confidence: u8,
    pub tier: Option<DetectionTier>,
}

/// Plaintext is handed out here once and never again without an explicit reveal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeCredentials {
    pub email: String,
    pub password: String,
    pub credential_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssistOutcome {
    pub success: bool,
    pub analysis: ManualAnalysis,
    pub credentials: OneTimeCredentials,
}

/// Analyze user-pasted HTML and hand back an identity to register with by hand.
pub struct ManualAssist {
    analyzer: Arc<FormAnalyzer>,
    identities: Arc<IdentityGenerator>,
    credentials: CredentialStore,
}

impl ManualAssist {
    pub fn new(analyzer: Arc<FormAnalyzer>, identities: Arc<IdentityGenerator>, credentials: CredentialStore) -> Self {
        Self {
            analyzer,
            identities,
            credentials,
        }
    }

    pub async fn analyze(
        &self,
        user_id: &str,
        html: &str,
        url: Option<&str>,
    ) -> Result<ManualAssistOutcome, AutomationError> {
        if html.trim().is_empty() {
            return Err(AutomationError::InvalidInput("htmlCode is required".to_string()));
        }

        let analysis = match self.analyzer.analyze(html).await {
            Ok(found) => {
                let fields = found.fields.unwrap_or_default();
                ManualAnalysis {
                    has_form: true,
                    email_field: fields.email_selector,
                    password_field: fields.password_selector,
                    submit_button: fields.submit_selector,
                    form_action: fields.endpoint,
                    confidence: found.confidence,
                    tier: Some(found.tier),
                }
            }
            Err(AnalyzeError::NoForm { ai_confidence }) => ManualAnalysis {
                has_form: false,
                email_field: None,
                password_field: None,
                submit_button: None,
                form_action: None,
                confidence: ai_confidence.unwrap_or(0),
                tier: None,
            },
            Err(AnalyzeError::Failed(e)) => return Err(e.into()),
        };

        let identity = self.identities.generate().await;
        let url = url.map(str::trim).filter(|u| !u.is_empty()).unwrap_or(MANUAL_URL);
        let saved = self
            .credentials
            .save(user_id, url, &identity, CredentialFlags::MANUAL)
            .await?;

        info!(user_id, credential_id = %saved.id, has_form = analysis.has_form, "manual form analyzed");

        Ok(ManualAssistOutcome {
            success: true,
            analysis,
            credentials: OneTimeCredentials {
                email: identity.email,
                password: identity.password,
                credential_id: saved.id,
            },
        })
    }
}
