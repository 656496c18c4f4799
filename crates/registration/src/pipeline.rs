use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use tabrelay_core::{AppConfig, AutomationError, LogAction};
use tabrelay_storage::{AutomationStore, SessionLedger};

use crate::analyzer::{AnalyzeError, ChatClassifier, FormAnalysis, FormAnalyzer, FormClassifier};
use crate::cancellable;
use crate::credentials::{CredentialCipher, CredentialFlags, CredentialStore};
use crate::email::DisposableMailbox;
use crate::fetcher::{validate_target, HttpFetcher, PageSource};
use crate::identity::{Identity, IdentityGenerator};
use crate::manual_assist::ManualAssist;
use crate::redirect::{RedirectResolver, ResolvedPage};
use crate::session::SessionRecorder;
use crate::submitter::{resolve_submit_target, FormSubmitter};
use crate::usage_gate::{GateDecision, UsageGate};

pub const NO_FORM_SESSION_ERROR: &str = "No registration form detected - credentials saved for manual use";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

impl AutomationRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), session_id: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_saved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a session went wrong, so the failure entry lands under the right tag.
struct StageFailure {
    action: Option<LogAction>,
    error: AutomationError,
}

impl From<AutomationError> for StageFailure {
    fn from(error: AutomationError) -> Self {
        Self { action: None, error }
    }
}

fn at<E: Into<AutomationError>>(action: LogAction) -> impl FnOnce(E) -> StageFailure {
    move |e| StageFailure { action: Some(action), error: e.into() }
}

fn cancelled() -> StageFailure {
    StageFailure { action: Some(LogAction::Cancelled), error: AutomationError::Cancelled }
}

/// Sequences gate, fetch, redirects, detection, identity and submission for one URL.
pub struct Orchestrator {
    gate: UsageGate,
    sessions: Arc<dyn SessionLedger>,
    source: Arc<dyn PageSource>,
    resolver: RedirectResolver,
    analyzer: Arc<FormAnalyzer>,
    identities: Arc<IdentityGenerator>,
    submitter: FormSubmitter,
    credentials: CredentialStore,
    allow_private_hosts: bool,
}

impl Orchestrator {
    pub fn from_config<S>(
        config: &AppConfig,
        store: Arc<S>,
        cipher: Arc<dyn CredentialCipher>,
    ) -> Result<Self, AutomationError>
    where
        S: AutomationStore + 'static,
    {
        let classifier: Arc<dyn FormClassifier> = Arc::new(ChatClassifier::from_config(&config.ai)?);

        Ok(Self {
            gate: UsageGate::new(store.clone(), config.quota.free_limit),
            sessions: store.clone(),
            source: Arc::new(HttpFetcher::new(&config.fetch)?),
            resolver: RedirectResolver::new(config.fetch.max_redirect_hops),
            analyzer: Arc::new(FormAnalyzer::new(
                classifier,
                config.ai.confidence_threshold,
                config.ai.max_html_chars,
            )),
            identities: Arc::new(IdentityGenerator::new(DisposableMailbox::from_config(&config.mailbox)?)),
            submitter: FormSubmitter::new(&config.fetch)?,
            credentials: CredentialStore::new(store, cipher),
            allow_private_hosts: config.fetch.allow_private_hosts,
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FormClassifier>) -> Self {
        self.analyzer = Arc::new(FormAnalyzer::new(
            classifier,
            self.analyzer.confidence_threshold(),
            self.analyzer.max_html_chars(),
        ));
        self
    }

    pub fn with_page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_mailbox(mut self, mailbox: DisposableMailbox) -> Self {
        self.identities = Arc::new(IdentityGenerator::new(mailbox));
        self
    }

    pub fn gate(&self) -> &UsageGate {
        &self.gate
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn manual_assist(&self) -> ManualAssist {
        ManualAssist::new(self.analyzer.clone(), self.identities.clone(), self.credentials.clone())
    }

    /// Run one automation attempt. Handled pipeline failures come back as
    /// `Ok` with `success: false`; `Err` is a rejection or an infrastructure fault.
    pub async fn run(
        &self,
        user_id: &str,
        request: AutomationRequest,
        cancel: &CancellationToken,
    ) -> Result<AutomationResponse, AutomationError> {
        let raw_url = request.url.trim();
        if raw_url.is_empty() {
            return Err(AutomationError::InvalidInput("url is required".to_string()));
        }
        let url = validate_target(raw_url, self.allow_private_hosts)
            .map_err(|e| AutomationError::InvalidInput(e.to_string()))?;

        let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
        if request.session_id.is_some() {
            let existing = self
                .sessions
                .session(session_id)
                .await
                .map_err(|e| AutomationError::Storage(format!("load session: {}", e)))?;
            if existing.is_some() {
                return Err(AutomationError::InvalidInput(format!("session {} already exists", session_id)));
            }
        }

        if let GateDecision::Denied { reason, usage } = self.gate.check_and_consume(user_id, 1).await? {
            info!(user_id, count = usage.count, reason = %reason, "automation rejected by usage gate");
            return Err(AutomationError::UsageLimit);
        }

        // The unit is already spent and usage never decreases, so a lost race
        // on the id or a storage fault here costs the caller one run.
        let recorder = match SessionRecorder::open(self.sessions.clone(), session_id, user_id, url.as_str()).await {
            Ok(recorder) => recorder,
            Err(e) => {
                warn!(session_id = %session_id, user_id, error = %e, "usage consumed but session could not be opened");
                return Err(e);
            }
        };
        info!(session_id = %session_id, user_id, url = %url, "automation started");

        match self.execute(&recorder, user_id, &url, cancel).await {
            Ok(mut response) => {
                response.session_id = Some(session_id);
                Ok(response)
            }
            Err(StageFailure { action, error }) if error.is_session_outcome() => {
                let message = error.to_string();
                warn!(session_id = %session_id, error = %message, "automation failed");
                if let Some(action) = action {
                    recorder.log(action, &message, false).await?;
                }
                recorder.fail(&message).await?;
                Ok(AutomationResponse {
                    success: false,
                    session_id: Some(session_id),
                    error: Some(message),
                    ..AutomationResponse::default()
                })
            }
            Err(StageFailure { error, .. }) => {
                error!(session_id = %session_id, error = %error, "automation aborted");
                recorder.fail_quietly(&error.to_string()).await;
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        recorder: &SessionRecorder,
        user_id: &str,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<AutomationResponse, StageFailure> {
        recorder.log(LogAction::FetchPage, format!("Fetching page: {}", url), true).await?;
        let page = cancellable(cancel, self.source.fetch(url))
            .await
            .ok_or_else(cancelled)?
            .map_err(at(LogAction::FetchPage))?;

        debug!(
            session_id = %recorder.id(),
            status = page.status,
            response_time_ms = page.response_time_ms,
            "page fetched"
        );

        let ResolvedPage { html, final_url, hops } =
            cancellable(cancel, self.resolver.resolve(&*self.source, page, recorder))
                .await
                .ok_or_else(cancelled)??;
        if hops > 0 {
            info!(session_id = %recorder.id(), hops, final_url = %final_url, "redirects followed");
        }

        recorder.log(LogAction::AnalyzePage, "Analyzing page with AI...", true).await?;
        let analysis = match cancellable(cancel, self.analyzer.analyze(&html)).await.ok_or_else(cancelled)? {
            Ok(analysis) => analysis,
            Err(AnalyzeError::NoForm { ai_confidence }) => {
                return self.save_for_manual(recorder, user_id, url, ai_confidence, cancel).await;
            }
            Err(AnalyzeError::Failed(e)) => return Err(at(LogAction::AnalyzePage)(e)),
        };

        let identity = cancellable(cancel, self.identities.generate()).await.ok_or_else(cancelled)?;
        recorder
            .log(LogAction::GenerateCredentials, format!("Generated email: {}", identity.email), true)
            .await?;

        let target = resolve_submit_target(analysis.fields.as_ref(), &final_url, self.allow_private_hosts);
        recorder
            .log(LogAction::SubmitForm, format!("Submitting to endpoint: {}", target), true)
            .await?;

        let outcome = cancellable(cancel, self.submitter.submit(&target, &identity))
            .await
            .ok_or_else(cancelled)?
            .map_err(at(LogAction::FormSubmitted))?;

        recorder
            .log(LogAction::FormSubmitted, format!("Response status: {}", outcome.status), outcome.success)
            .await?;

        if outcome.success {
            self.credentials
                .save(user_id, url.as_str(), &identity, CredentialFlags::REGISTERED)
                .await?;
            recorder.complete().await?;
            info!(session_id = %recorder.id(), status = outcome.status, "registration submitted");
            Ok(success_response(&analysis, &identity, outcome.status))
        } else {
            let message = format!("HTTP {}", outcome.status);
            recorder.fail(&message).await?;
            info!(session_id = %recorder.id(), status = outcome.status, "registration rejected by target");
            Ok(AutomationResponse {
                success: false,
                error: Some(message),
                ..success_response(&analysis, &identity, outcome.status)
            })
        }
    }

    async fn save_for_manual(
        &self,
        recorder: &SessionRecorder,
        user_id: &str,
        url: &Url,
        ai_confidence: Option<u8>,
        cancel: &CancellationToken,
    ) -> Result<AutomationResponse, StageFailure> {
        let identity = cancellable(cancel, self.identities.generate()).await.ok_or_else(cancelled)?;
        self.credentials
            .save(user_id, url.as_str(), &identity, CredentialFlags::MANUAL)
            .await?;

        recorder
            .log(
                LogAction::FormDetection,
                "No registration form found - credentials generated and saved for manual registration",
                false,
            )
            .await?;
        recorder.fail(NO_FORM_SESSION_ERROR).await?;
        info!(session_id = %recorder.id(), "no form detected, credentials saved for manual use");

        Ok(AutomationResponse {
            success: false,
            email: Some(identity.email),
            ai_confidence,
            credentials_saved: Some(true),
            message: Some("Credentials saved for manual use".to_string()),
            error: Some("No registration form detected".to_string()),
            ..AutomationResponse::default()
        })
    }
}

fn success_response(analysis: &FormAnalysis, identity: &Identity, status: u16) -> AutomationResponse {
    AutomationResponse {
        success: true,
        email: Some(identity.email.clone()),
        status: Some(status),
        ai_confidence: Some(analysis.confidence),
        patterns: Some(analysis.patterns.clone()),
        credentials_saved: Some(true),
        ..AutomationResponse::default()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::analyzer::stub::StubClassifier;
    use crate::analyzer::AnalysisError;
    use crate::credentials::ChaChaCipher;
    use crate::testing::spawn_stub;
    use axum::{
        http::{header, StatusCode},
        response::{Html, IntoResponse},
        routing::get,
        Router,
    };
    use tabrelay_core::SessionStatus;
    use tabrelay_storage::{CredentialVault, MemoryStore, SessionLedger, UsageLedger};

    const SIGNUP_PAGE: &str = r#"<html><body><form method="post">
        <input type="email" name="email"><input type="password" name="password">
        <button type="submit">Sign up</button></form></body></html>"#;

    fn site(submit_status: StatusCode) -> Router {
        // No endpoint is reported by the stub classifiers, so submissions go back to the page.
        Router::new()
            .route(
                "/start",
                get(|| async { Html(SIGNUP_PAGE) }).post(move || async move {
                    (submit_status, [(header::LOCATION, "/welcome")]).into_response()
                }),
            )
            .route("/blog", get(|| async { Html("<html><body><p>Nothing to see</p></body></html>") }))
            .route("/hop", get(|| async { Html(r#"<script>window.location.href = "/start";</script>"#) }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
    }

    async fn actions(store: &MemoryStore, id: Uuid) -> Vec<String> {
        store.session_logs(id).await.unwrap().into_iter().map(|l| l.action).collect()
    }

    #[tokio::test]
    async fn test_detected_form_and_302_completes_session() {
        let stub = spawn_stub(site(StatusCode::FOUND)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 80));

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/start").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.status, Some(302));
        assert_eq!(resp.ai_confidence, Some(80));
        assert_eq!(resp.credentials_saved, Some(true));

        let id = resp.session_id.unwrap();
        assert_eq!(store.session(id).await.unwrap().unwrap().status, SessionStatus::Completed);
        assert_eq!(
            actions(&store, id).await,
            vec!["fetch_page", "analyze_page", "generate_credentials", "submit_form", "form_submitted"]
        );

        let saved = store.list_credentials("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].successfully_registered);
        assert!(!saved[0].manual_needed);
        assert_eq!(store.usage("u1").await.unwrap().unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn test_no_form_saves_credentials_for_manual_use() {
        let stub = spawn_stub(site(StatusCode::OK)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(false, 10));

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/blog").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.credentials_saved, Some(true));
        assert_eq!(resp.ai_confidence, Some(10));
        assert_eq!(resp.error.as_deref(), Some("No registration form detected"));

        let session = store.session(resp.session_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.error.as_deref(), Some(NO_FORM_SESSION_ERROR));

        let saved = store.list_credentials("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].manual_needed);
        assert!(!saved[0].successfully_registered);
        assert_eq!(saved[0].email, resp.email.unwrap());
    }

    #[tokio::test]
    async fn test_classifier_error_still_submits_via_field_scan() {
        let stub = spawn_stub(site(StatusCode::OK)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::failing());

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/start").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.ai_confidence, Some(60));
        assert!(resp.patterns.unwrap().contains(&"password_field".to_string()));
    }

    #[tokio::test]
    async fn test_redirect_is_followed_and_logged() {
        let stub = spawn_stub(site(StatusCode::FOUND)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 90));

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/hop").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(
            actions(&store, resp.session_id.unwrap()).await,
            vec![
                "fetch_page",
                "redirect_detected",
                "analyze_page",
                "generate_credentials",
                "submit_form",
                "form_submitted"
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_submission_fails_session() {
        let stub = spawn_stub(site(StatusCode::BAD_REQUEST)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 80));

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/start").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, Some(400));
        assert_eq!(resp.error.as_deref(), Some("HTTP 400"));
        let session = store.session(resp.session_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(store.list_credentials("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_a_handled_outcome() {
        let stub = spawn_stub(site(StatusCode::OK)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 80));

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/missing").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("failed to fetch page: HTTP 404"));

        let id = resp.session_id.unwrap();
        assert_eq!(store.session(id).await.unwrap().unwrap().status, SessionStatus::Failed);
        let logs = store.session_logs(id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].success);
        assert!(!logs[1].success);
    }

    #[tokio::test]
    async fn test_analysis_error_fails_session_without_credentials() {
        let stub = spawn_stub(site(StatusCode::OK)).await;
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(
            store.clone(),
            StubClassifier::reply(Err(AnalysisError::Malformed("garbage".into()))),
        );

        let resp = pipeline
            .run("u1", AutomationRequest::new(stub.url("/blog").as_str()), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("analysis failed"));
        assert_eq!(store.credential_count(), 0);
    }

    #[tokio::test]
    async fn test_rejections_write_nothing() {
        let store = store_with_user("u1", 3);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 80));
        let cancel = CancellationToken::new();
        let id = Uuid::new_v4();

        let request = AutomationRequest { url: "https://site.test/".into(), session_id: Some(id) };
        let err = pipeline.run("u1", request, &cancel).await.unwrap_err();
        assert!(matches!(err, AutomationError::UsageLimit));
        assert!(store.session(id).await.unwrap().is_none());

        let err = pipeline.run("u1", AutomationRequest::new("ftp://site.test/"), &cancel).await.unwrap_err();
        assert!(matches!(err, AutomationError::InvalidInput(_)));

        let err = pipeline.run("u1", AutomationRequest::new("  "), &cancel).await.unwrap_err();
        assert!(matches!(err, AutomationError::InvalidInput(_)));

        assert_eq!(store.usage("u1").await.unwrap().unwrap().usage_count, 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_fails_session() {
        let store = store_with_user("u1", 0);
        let pipeline = orchestrator(store.clone(), StubClassifier::verdict(true, 80));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let resp = pipeline
            .run("u1", AutomationRequest::new("http://127.0.0.1:9/"), &cancel)
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("cancelled"));
        let id = resp.session_id.unwrap();
        assert_eq!(store.session(id).await.unwrap().unwrap().status, SessionStatus::Failed);
        assert_eq!(actions(&store, id).await, vec!["fetch_page", "cancelled"]);
    }

    /// Delegates to a `MemoryStore` but reports every session id as taken,
    /// as if another request had claimed it first.
    struct ClaimedIds(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl UsageLedger for ClaimedIds {
        async fn ensure_usage_record(&self, user_id: &str) -> anyhow::Result<()> {
            self.0.ensure_usage_record(user_id).await
        }
        async fn usage(&self, user_id: &str) -> anyhow::Result<Option<tabrelay_core::UsageRecord>> {
            self.0.usage(user_id).await
        }
        async fn try_consume(
            &self,
            user_id: &str,
            units: u32,
            limit: u32,
        ) -> anyhow::Result<tabrelay_storage::ConsumeOutcome> {
            self.0.try_consume(user_id, units, limit).await
        }
        async fn mark_paid(&self, user_id: &str, customer: Option<&str>) -> anyhow::Result<()> {
            self.0.mark_paid(user_id, customer).await
        }
    }

    #[async_trait::async_trait]
    impl SessionLedger for ClaimedIds {
        async fn open_session(&self, _id: Uuid, _user_id: &str, _url: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn append_log(&self, id: Uuid, action: &str, details: &str, success: bool) -> anyhow::Result<i64> {
            self.0.append_log(id, action, details, success).await
        }
        async fn finish_session(
            &self,
            id: Uuid,
            status: SessionStatus,
            error: Option<&str>,
        ) -> anyhow::Result<bool> {
            self.0.finish_session(id, status, error).await
        }
        async fn session(&self, id: Uuid) -> anyhow::Result<Option<tabrelay_core::AutomationSession>> {
            self.0.session(id).await
        }
        async fn session_logs(&self, id: Uuid) -> anyhow::Result<Vec<tabrelay_core::LogEntry>> {
            self.0.session_logs(id).await
        }
    }

    #[async_trait::async_trait]
    impl CredentialVault for ClaimedIds {
        async fn insert_credential(
            &self,
            credential: tabrelay_core::NewCredential,
        ) -> anyhow::Result<tabrelay_core::SavedCredential> {
            self.0.insert_credential(credential).await
        }
        async fn credential(&self, user_id: &str, id: Uuid) -> anyhow::Result<Option<tabrelay_core::SavedCredential>> {
            self.0.credential(user_id, id).await
        }
        async fn list_credentials(&self, user_id: &str) -> anyhow::Result<Vec<tabrelay_core::SavedCredential>> {
            self.0.list_credentials(user_id).await
        }
    }

    #[tokio::test]
    async fn test_lost_session_id_race_spends_the_unit_without_a_session() {
        let inner = store_with_user("u1", 0);
        let pipeline = Orchestrator::from_config(
            &test_config(),
            Arc::new(ClaimedIds(inner.clone())),
            Arc::new(ChaChaCipher::new("test", [3u8; 32]).unwrap()),
        )
        .unwrap()
        .with_classifier(Arc::new(StubClassifier::verdict(true, 80)));
        let id = Uuid::new_v4();

        let request = AutomationRequest { url: "https://site.test/".into(), session_id: Some(id) };
        let err = pipeline.run("u1", request, &CancellationToken::new()).await.err().unwrap();

        assert!(matches!(err, AutomationError::InvalidInput(_)));
        assert!(inner.session(id).await.unwrap().is_none());
        assert_eq!(inner.usage("u1").await.unwrap().unwrap().usage_count, 1);
        assert_eq!(inner.credential_count(), 0);
    }
}
