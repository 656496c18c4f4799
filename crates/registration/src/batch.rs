use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use tabrelay_core::AutomationError;

use crate::cancellable;
use crate::pipeline::{AutomationRequest, Orchestrator};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSummary {
    pub url: String,
    pub repetition: u32,
    pub success: bool,
    pub session_id: Option<Uuid>,
    pub email: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub invocations: Vec<InvocationSummary>,
    pub stop_reason: Option<String>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.invocations.iter().filter(|i| i.success).count()
    }
}

/// Runs the pipeline once per (url, repetition), one at a time.
pub struct BatchRunner {
    orchestrator: Arc<Orchestrator>,
    delay: Duration,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<Orchestrator>, delay: Duration) -> Self {
        Self { orchestrator, delay }
    }

    pub async fn run(
        &self,
        user_id: &str,
        urls: &[String],
        repetitions: u32,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();

        'reps: for repetition in 1..=repetitions {
            if repetition > 1
                && !self.delay.is_zero()
                && cancellable(cancel, tokio::time::sleep(self.delay)).await.is_none()
            {
                summary.stop_reason = Some("cancelled".to_string());
                break;
            }

            for url in urls {
                if cancel.is_cancelled() {
                    summary.stop_reason = Some("cancelled".to_string());
                    break 'reps;
                }

                info!(url = %url, repetition, repetitions, "launching automation");
                let result = self
                    .orchestrator
                    .run(user_id, AutomationRequest::new(url.clone()), cancel)
                    .await;

                match result {
                    Ok(resp) => summary.invocations.push(InvocationSummary {
                        url: url.clone(),
                        repetition,
                        success: resp.success,
                        session_id: resp.session_id,
                        email: resp.email,
                        error: resp.error,
                    }),
                    Err(e) => {
                        let fatal = matches!(
                            e,
                            AutomationError::UsageLimit | AutomationError::Storage(_) | AutomationError::Config(_)
                        );
                        warn!(url = %url, error = %e, "automation rejected");
                        summary.invocations.push(InvocationSummary {
                            url: url.clone(),
                            repetition,
                            success: false,
                            session_id: None,
                            email: None,
                            error: Some(e.to_string()),
                        });
                        if fatal {
                            summary.stop_reason = Some(e.to_string());
                            break 'reps;
                        }
                    }
                }
            }
        }

        info!(
            launched = summary.invocations.len(),
            succeeded = summary.succeeded(),
            stop_reason = summary.stop_reason.as_deref().unwrap_or("none"),
            "batch finished"
        );
        summary
    }
}
