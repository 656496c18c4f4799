use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Per-user quota ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub user_id: String,
    pub usage_count: u32,
    pub has_paid: bool,
    pub billing_customer_id: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl UsageRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            usage_count: 0,
            has_paid: false,
            billing_customer_id: None,
            last_used_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SessionStatus::Pending),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt of the pipeline against one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSession {
    pub id: Uuid,
    pub user_id: String,
    pub url: String,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Stage tags written to the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    FetchPage,
    RedirectDetected,
    AnalyzePage,
    FormDetection,
    GenerateCredentials,
    SubmitForm,
    FormSubmitted,
    Cancelled,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::FetchPage => "fetch_page",
            LogAction::RedirectDetected => "redirect_detected",
            LogAction::AnalyzePage => "analyze_page",
            LogAction::FormDetection => "form_detection",
            LogAction::GenerateCredentials => "generate_credentials",
            LogAction::SubmitForm => "submit_form",
            LogAction::FormSubmitted => "form_submitted",
            LogAction::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub session_id: Uuid,
    pub action: String,
    pub details: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored identity. `password_ciphertext` is never plaintext.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCredential {
    pub id: Uuid,
    pub owner_user_id: String,
    pub url: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_ciphertext: String,
    pub site_name: String,
    pub successfully_registered: bool,
    pub manual_needed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub owner_user_id: String,
    pub url: String,
    pub email: String,
    pub password_ciphertext: String,
    pub site_name: String,
    pub successfully_registered: bool,
    pub manual_needed: bool,
}

/// Host part of a target URL, used as the credential's display name.
pub fn site_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_name() {
        assert_eq!(site_name("https://shop.example.com/register?x=1"), "shop.example.com");
        assert_eq!(site_name("manual-input"), "Unknown");
    }

    #[test]
    fn test_session_status_round_trip_strings() {
        for status in [SessionStatus::Pending, SessionStatus::Completed, SessionStatus::Failed] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Pending.is_terminal());
    }

    #[test]
    fn test_credential_serialization_hides_ciphertext() {
        let cred = SavedCredential {
            id: Uuid::new_v4(),
            owner_user_id: "u1".into(),
            url: "https://a.test".into(),
            email: "x@y.z".into(),
            password_ciphertext: "enc:v1:secret".into(),
            site_name: "a.test".into(),
            successfully_registered: false,
            manual_needed: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&cred).unwrap();
        assert!(!json.contains("enc:v1"));
        assert!(json.contains("\"manualNeeded\":true"));
    }
}
