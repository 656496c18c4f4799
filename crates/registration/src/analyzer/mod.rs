//! Two-tier registration form detection: a semantic classifier first, a
//! textual field scan second.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use tabrelay_core::AutomationError;

pub mod classifier;
pub mod fallback;

pub use classifier::{parse_verdict, strip_code_fences, ChatClassifier, ClassifierVerdict, FormClassifier};

/// Confidence assigned when only the field scan found a form.
pub const FALLBACK_CONFIDENCE: u8 = 60;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("classifier not configured")]
    NotConfigured,

    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid JSON from classifier: {0}")]
    Malformed(String),

    #[error("classifier output failed validation: {0}")]
    Schema(String),
}

impl From<AnalysisError> for AutomationError {
    fn from(e: AnalysisError) -> Self {
        AutomationError::Analysis(e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub email_selector: Option<String>,
    pub password_selector: Option<String>,
    pub submit_selector: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTier {
    Classifier,
    FieldScan,
}

/// A positive detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalysis {
    pub confidence: u8,
    pub fields: Option<FormFields>,
    pub patterns: Vec<String>,
    pub tier: DetectionTier,
    /// What the classifier said, when it answered at all.
    pub ai_confidence: Option<u8>,
}

#[derive(Debug)]
pub enum AnalyzeError {
    /// Neither tier found a form. A soft outcome, not a fault.
    NoForm { ai_confidence: Option<u8> },
    /// The classifier failed and the field scan found nothing to fall back on.
    Failed(AnalysisError),
}

impl From<AnalyzeError> for AutomationError {
    fn from(e: AnalyzeError) -> Self {
        match e {
            AnalyzeError::NoForm { .. } => AutomationError::NoFormDetected,
            AnalyzeError::Failed(inner) => inner.into(),
        }
    }
}

pub struct FormAnalyzer {
    classifier: Arc<dyn FormClassifier>,
    confidence_threshold: u8,
    max_html_chars: usize,
}

impl FormAnalyzer {
    pub fn new(classifier: Arc<dyn FormClassifier>, confidence_threshold: u8, max_html_chars: usize) -> Self {
        Self {
            classifier,
            confidence_threshold,
            max_html_chars,
        }
    }

    pub fn confidence_threshold(&self) -> u8 {
        self.confidence_threshold
    }

    pub fn max_html_chars(&self) -> usize {
        self.max_html_chars
    }

    pub async fn analyze(&self, html: &str) -> Result<FormAnalysis, AnalyzeError> {
        let truncated = truncate_chars(html, self.max_html_chars);

        let (ai_fields, mut patterns, ai_confidence, classifier_error) =
            match self.classifier.classify(truncated).await {
                Ok(verdict) if verdict.has_registration_form && verdict.confidence >= self.confidence_threshold => {
                    info!(confidence = verdict.confidence, "classifier detected a registration form");
                    return Ok(FormAnalysis {
                        confidence: verdict.confidence,
                        fields: verdict.form_details,
                        patterns: verdict.patterns,
                        tier: DetectionTier::Classifier,
                        ai_confidence: Some(verdict.confidence),
                    });
                }
                Ok(verdict) => {
                    debug!(
                        has_form = verdict.has_registration_form,
                        confidence = verdict.confidence,
                        "classifier below threshold, scanning fields"
                    );
                    (verdict.form_details, verdict.patterns, Some(verdict.confidence), None)
                }
                Err(e) => {
                    warn!(error = %e, "classifier failed, scanning fields");
                    (None, Vec::new(), None, Some(e))
                }
            };

        let scan = fallback::scan(html);
        if scan.is_form() {
            info!("field scan detected a registration form");
            patterns.push("email_field".to_string());
            patterns.push("password_field".to_string());

            // Selectors from a rejected verdict are not trusted, the target is.
            let fields = ai_fields.map(|f| FormFields {
                email_selector: None,
                password_selector: None,
                submit_selector: f.submit_selector,
                endpoint: f.endpoint,
                method: f.method,
            });

            return Ok(FormAnalysis {
                confidence: FALLBACK_CONFIDENCE,
                fields,
                patterns,
                tier: DetectionTier::FieldScan,
                ai_confidence,
            });
        }

        match classifier_error {
            Some(e) => Err(AnalyzeError::Failed(e)),
            None => Err(AnalyzeError::NoForm { ai_confidence }),
        }
    }
}

/// Longest prefix of at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
