use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use tabrelay_core::{AutomationError, AutomationSession, LogAction, LogEntry, SessionStatus};
use tabrelay_storage::SessionLedger;

use crate::redirect::HopObserver;

/// Writes one session's audit trail. Entries are appended in call order and the
/// terminal status is written at most once.
#[derive(Clone)]
pub struct SessionRecorder {
    ledger: Arc<dyn SessionLedger>,
    session_id: Uuid,
}

fn storage(context: &str, e: anyhow::Error) -> AutomationError {
    AutomationError::Storage(format!("{}: {}", context, e))
}

impl SessionRecorder {
    /// Create the `pending` row. Reusing an id is rejected.
    pub async fn open(
        ledger: Arc<dyn SessionLedger>,
        session_id: Uuid,
        user_id: &str,
        url: &str,
    ) -> Result<Self, AutomationError> {
        let created = ledger
            .open_session(session_id, user_id, url)
            .await
            .map_err(|e| storage("open session", e))?;
        if !created {
            return Err(AutomationError::InvalidInput(format!("session {} already exists", session_id)));
        }

        debug!(session_id = %session_id, "session opened");
        Ok(Self { ledger, session_id })
    }

    pub fn id(&self) -> Uuid {
        self.session_id
    }

    pub async fn log(&self, action: LogAction, details: impl AsRef<str>, success: bool) -> Result<(), AutomationError> {
        self.ledger
            .append_log(self.session_id, action.as_str(), details.as_ref(), success)
            .await
            .map_err(|e| storage("append log", e))?;
        Ok(())
    }

    pub async fn complete(&self) -> Result<(), AutomationError> {
        self.finish(SessionStatus::Completed, None).await
    }

    pub async fn fail(&self, error: &str) -> Result<(), AutomationError> {
        self.finish(SessionStatus::Failed, Some(error)).await
    }

    async fn finish(&self, status: SessionStatus, error: Option<&str>) -> Result<(), AutomationError> {
        let changed = self
            .ledger
            .finish_session(self.session_id, status, error)
            .await
            .map_err(|e| storage("finish session", e))?;
        if !changed {
            warn!(session_id = %self.session_id, status = %status, "session already terminal, status not changed");
        }
        Ok(())
    }

    /// Best effort terminal write used when the pipeline itself hit an infrastructure fault.
    pub async fn fail_quietly(&self, error: &str) {
        if let Err(e) = self.fail(error).await {
            warn!(session_id = %self.session_id, error = %e, "could not mark session failed");
        }
    }

    pub async fn snapshot(&self) -> Result<Option<AutomationSession>, AutomationError> {
        self.ledger.session(self.session_id).await.map_err(|e| storage("load session", e))
    }

    pub async fn entries(&self) -> Result<Vec<LogEntry>, AutomationError> {
        self.ledger.session_logs(self.session_id).await.map_err(|e| storage("load logs", e))
    }
}

#[async_trait]
impl HopObserver for SessionRecorder {
    async fn on_hop(&self, target: &Url) -> Result<(), AutomationError> {
        self.log(LogAction::RedirectDetected, format!("Following redirect to: {}", target), true)
            .await
    }
}
