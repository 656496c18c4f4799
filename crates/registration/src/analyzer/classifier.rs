use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use tabrelay_core::config::AiConfig;
use tabrelay_core::AutomationError;

use super::{AnalysisError, FormFields};

const SYSTEM_PROMPT: &str =
    "You are an expert at analyzing HTML and detecting registration forms. Always return valid JSON.";

const USER_PROMPT: &str = r#"Decide whether this HTML page contains an account registration or signup form.
Respond with a single JSON object of exactly this shape:
{
  "hasRegistrationForm": boolean,
  "confidence": number between 0 and 100,
  "formDetails": {
    "emailField": "CSS selector of the email input",
    "passwordField": "CSS selector of the password input",
    "submitButton": "CSS selector of the submit button",
    "endpoint": "form action URL or the most likely POST endpoint",
    "method": "POST or GET"
  },
  "patterns": ["detected patterns such as signup, register, join"]
}

Signals: email inputs (type="email" or a name containing email/mail/e-mail), password inputs
(type="password" or a name containing password/pass/pwd), submit buttons labelled Sign Up,
Register or Join, form actions, and registration wording.
Any email field together with a password field counts as a registration form.

HTML Content:
"#;

/// What the semantic tier reported about a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierVerdict {
    pub has_registration_form: bool,
    pub confidence: u8,
    pub form_details: Option<FormFields>,
    pub patterns: Vec<String>,
}

#[async_trait]
pub trait FormClassifier: Send + Sync {
    async fn classify(&self, html: &str) -> Result<ClassifierVerdict, AnalysisError>;
}

/// OpenAI-compatible chat completions client.
pub struct ChatClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatClassifier {
    pub fn from_config(config: &AiConfig) -> Result<Self, AutomationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AutomationError::Config(format!("ai client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

#[async_trait]
impl FormClassifier for ChatClassifier {
    async fn classify(&self, html: &str) -> Result<ClassifierVerdict, AnalysisError> {
        if self.api_key.trim().is_empty() {
            return Err(AnalysisError::NotConfigured);
        }

        let prompt = format!("{}{}", USER_PROMPT, html);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
        });

        debug!(chars = html.chars().count(), model = %self.model, "sending page to classifier");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "classifier returned an error status");
            return Err(AnalysisError::Http {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AnalysisError::Malformed(format!("chat envelope: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisError::Malformed("no completion content".to_string()))?;

        parse_verdict(&content)
    }
}

/// Drop a surrounding ```json ... ``` fence if the model added one.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("```json")) {
        text = &text[7..];
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    has_registration_form: bool,
    confidence: f64,
    #[serde(default)]
    form_details: Option<RawFormDetails>,
    #[serde(default)]
    patterns: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawFormDetails {
    #[serde(default)]
    email_field: Option<String>,
    #[serde(default)]
    password_field: Option<String>,
    #[serde(default)]
    submit_button: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse untrusted model output into a verdict. Anything off-schema is an error,
/// never a silent negative.
pub fn parse_verdict(raw: &str) -> Result<ClassifierVerdict, AnalysisError> {
    let cleaned = strip_code_fences(raw);

    let parsed: RawVerdict = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(first) => {
            // Some models wrap the object in prose; retry on the outermost braces.
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if end > start => serde_json::from_str(&cleaned[start..=end])
                    .map_err(|e| AnalysisError::Malformed(e.to_string()))?,
                _ => return Err(AnalysisError::Malformed(first.to_string())),
            }
        }
    };

    if !parsed.confidence.is_finite() || !(0.0..=100.0).contains(&parsed.confidence) {
        return Err(AnalysisError::Schema(format!(
            "confidence {} outside 0..=100",
            parsed.confidence
        )));
    }

    let form_details = parsed.form_details.map(|d| FormFields {
        email_selector: non_empty(d.email_field),
        password_selector: non_empty(d.password_field),
        submit_selector: non_empty(d.submit_button),
        endpoint: non_empty(d.endpoint),
        method: non_empty(d.method),
    });

    Ok(ClassifierVerdict {
        has_registration_form: parsed.has_registration_form,
        confidence: parsed.confidence.round() as u8,
        form_details,
        patterns: parsed.patterns.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_stub;
    use axum::{http::StatusCode, routing::post, Json, Router};

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```JSON {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_full_verdict() {
        let raw = r##"```json
        {
          "hasRegistrationForm": true,
          "confidence": 82.4,
          "formDetails": {
            "emailField": "#email",
            "passwordField": "input[type=password]",
            "submitButton": "button.signup",
            "endpoint": "/api/register",
            "method": "POST"
          },
          "patterns": ["signup", "register"]
        }
        ```"##;

        let verdict = parse_verdict(raw).unwrap();
        assert!(verdict.has_registration_form);
        assert_eq!(verdict.confidence, 82);
        let fields = verdict.form_details.unwrap();
        assert_eq!(fields.endpoint.as_deref(), Some("/api/register"));
        assert_eq!(fields.submit_selector.as_deref(), Some("button.signup"));
        assert_eq!(verdict.patterns, vec!["signup", "register"]);
    }

    #[test]
    fn test_parse_tolerates_missing_optionals_and_prose() {
        let verdict =
            parse_verdict(r#"Here you go: {"hasRegistrationForm": false, "confidence": 10} hope it helps"#)
                .unwrap();
        assert!(!verdict.has_registration_form);
        assert_eq!(verdict.confidence, 10);
        assert!(verdict.form_details.is_none());
        assert!(verdict.patterns.is_empty());

        let blanks = parse_verdict(
            r#"{"hasRegistrationForm": true, "confidence": 70, "formDetails": {"endpoint": "", "method": null}, "patterns": null}"#,
        )
        .unwrap();
        assert_eq!(blanks.form_details.unwrap().endpoint, None);
    }

    #[test]
    fn test_parse_rejects_off_schema_output() {
        assert!(matches!(parse_verdict("not json at all"), Err(AnalysisError::Malformed(_))));
        assert!(matches!(parse_verdict(r#"{"confidence": 90}"#), Err(AnalysisError::Malformed(_))));
        assert!(matches!(
            parse_verdict(r#"{"hasRegistrationForm": "yes", "confidence": 90}"#),
            Err(AnalysisError::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"hasRegistrationForm": true, "confidence": 140}"#),
            Err(AnalysisError::Schema(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"hasRegistrationForm": true, "confidence": -1}"#),
            Err(AnalysisError::Schema(_))
        ));
    }

    fn ai_config(endpoint: String, api_key: &str) -> AiConfig {
        AiConfig { endpoint, api_key: api_key.to_string(), ..AiConfig::default() }
    }

    #[tokio::test]
    async fn test_classifier_talks_chat_completions() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["messages"][0]["role"], "system");
                assert!(body["messages"][1]["content"].as_str().unwrap().contains("<form>"));
                Json(serde_json::json!({
                    "choices": [{"message": {"content":
                        "```json\n{\"hasRegistrationForm\": true, \"confidence\": 91, \"patterns\": [\"signup\"]}\n```"
                    }}]
                }))
            }),
        );
        let stub = spawn_stub(app).await;
        let classifier =
            ChatClassifier::from_config(&ai_config(stub.url("/v1/chat/completions").to_string(), "k")).unwrap();

        let verdict = classifier.classify("<form></form>").await.unwrap();
        assert_eq!(verdict.confidence, 91);
        assert_eq!(verdict.patterns, vec!["signup"]);
    }

    #[tokio::test]
    async fn test_classifier_surfaces_http_errors() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let stub = spawn_stub(app).await;
        let classifier =
            ChatClassifier::from_config(&ai_config(stub.url("/v1/chat/completions").to_string(), "k")).unwrap();

        let err = classifier.classify("<p></p>").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Http { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_classifier_without_key_is_not_configured() {
        let classifier = ChatClassifier::from_config(&ai_config("http://127.0.0.1:1/".into(), "")).unwrap();
        assert!(matches!(classifier.classify("x").await, Err(AnalysisError::NotConfigured)));
    }
}
