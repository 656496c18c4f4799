//! Registration-automation pipeline: quota gate, page fetch, client-side redirect
//! resolution, two-tier form detection, identity synthesis, submission and the
//! durable session ledger around them.

use std::future::Future;

use tokio_util::sync::CancellationToken;

pub mod analyzer;
pub mod batch;
pub mod credentials;
pub mod email;
pub mod fetcher;
pub mod identity;
pub mod manual_assist;
pub mod pipeline;
pub mod redirect;
pub mod session;
pub mod submitter;
pub mod usage_gate;

pub use analyzer::{AnalysisError, ChatClassifier, DetectionTier, FormAnalysis, FormAnalyzer, FormClassifier, FormFields};
pub use batch::{BatchRunner, BatchSummary};
pub use credentials::{ChaChaCipher, CredentialCipher, CredentialStore};
pub use email::DisposableMailbox;
pub use fetcher::{FetchError, FetchedPage, HttpFetcher, PageSource};
pub use identity::{Identity, IdentityGenerator};
pub use manual_assist::{ManualAssist, ManualAssistOutcome};
pub use pipeline::{AutomationRequest, AutomationResponse, Orchestrator};
pub use redirect::{HopObserver, RedirectResolver, ResolvedPage};
pub use session::SessionRecorder;
pub use submitter::{FormSubmitter, SubmissionOutcome};
pub use usage_gate::{GateDecision, UsageGate, UsageSnapshot};

/// Run `fut` until it completes or `cancel` fires, whichever comes first.
/// Returns `None` when cancelled; the future is dropped at its suspension point.
pub async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
