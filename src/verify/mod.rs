//! Turning a payment reference into a confirmed or failed checkout.
//!
//! [`PaymentVerifier`] drives one [`VerificationState`] per run. It calls the
//! [`VerifyPayment`] collaborator exactly once, then either replaces the current page
//! with the confirmation target or notifies the user and returns to the listing page.
//! If the hosting page unmounts while the call is pending, the result is discarded.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

mod state;

use crate::ServiceType;
use crate::callback::CanonicalCallback;
pub use state::{FailureReason, VerificationEvent, VerificationState};

/// The status literal that marks a verified payment.
pub const SUCCESS_STATUS: &str = "success";

/// The answer of the verification backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub status: String,
}

impl VerificationResponse {
    pub fn success() -> Self {
        Self::with_status(SUCCESS_STATUS)
    }

    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("verification request failed: {0}")]
    Transport(String),

    #[error("verification service unavailable")]
    Unavailable,
}

/// The backend contract `verifyPayment(reference) -> {status}`.
pub trait VerifyPayment: Send + Sync {
    fn verify_payment(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<VerificationResponse, VerifyError>> + Send;
}

impl<F, Fut> VerifyPayment for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<VerificationResponse, VerifyError>> + Send,
{
    fn verify_payment(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<VerificationResponse, VerifyError>> + Send {
        self(reference.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Adds a history entry.
    Push,
    /// Replaces the current history entry, so back-navigation skips it.
    Replace,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str, mode: NavigationMode);
}

/// A user-facing notification about a failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub service: ServiceType,
    pub reason: FailureReason,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Default)]
struct Lifecycle {
    unmounted: AtomicBool,
    notify: Notify,
}

/// Mount state of the page hosting a verification.
#[derive(Debug, Clone, Default)]
pub struct PageLifecycle {
    inner: Arc<Lifecycle>,
}

impl PageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unmount(&self) {
        if !self.inner.unmounted.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.unmounted.load(Ordering::SeqCst)
    }

    /// Resolves once the page is unmounted.
    pub async fn unmounted(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // register before checking the flag so an unmount in between is not lost
        notified.as_mut().enable();

        if !self.is_mounted() {
            return;
        }
        notified.await;
    }
}

/// Runs the verify-then-route flow.
#[derive(Debug, Clone)]
pub struct PaymentVerifier<V, N, T> {
    verifier: V,
    navigator: N,
    notifier: T,
}

impl<V, N, T> PaymentVerifier<V, N, T>
where
    V: VerifyPayment,
    N: Navigator,
    T: Notifier,
{
    pub fn new(verifier: V, navigator: N, notifier: T) -> Self {
        Self {
            verifier,
            navigator,
            notifier,
        }
    }

    /// Verifies the reference of `callback` and navigates on the outcome.
    ///
    /// Returns the terminal state, or `None` when `lifecycle` was unmounted before the
    /// outcome arrived; in that case no notification or navigation happens.
    #[tracing::instrument(
        name = "verifying payment",
        skip(self, callback, lifecycle),
        fields(service = %callback.service)
    )]
    pub async fn run(
        &self,
        callback: &CanonicalCallback,
        lifecycle: &PageLifecycle,
    ) -> Option<VerificationState> {
        let mut state = VerificationState::begin(callback.reference.clone());

        if let Some(reference) = state.pending_reference().map(str::to_string) {
            let outcome = tokio::select! {
                biased;
                _ = lifecycle.unmounted() => {
                    tracing::debug!("page unmounted, discarding verification");
                    return None;
                }
                outcome = self.verifier.verify_payment(&reference) => outcome,
            };

            let event = match outcome {
                Ok(response) if response.is_success() => VerificationEvent::Confirmed,
                Ok(response) => VerificationEvent::Rejected {
                    status: response.status,
                },
                Err(err) => {
                    tracing::error!(err = %err, "payment verification failed");
                    VerificationEvent::Errored {
                        message: err.to_string(),
                    }
                }
            };
            state = state.transition(event);
        }

        if !lifecycle.is_mounted() {
            tracing::debug!("page unmounted, discarding verification");
            return None;
        }

        self.settle(callback, &state);
        Some(state)
    }

    fn settle(&self, callback: &CanonicalCallback, state: &VerificationState) {
        match state {
            VerificationState::Succeeded { .. } => {
                let target = callback.confirmation_target();
                tracing::info!(location = %target, "payment verified");
                self.navigator.navigate(&target, NavigationMode::Replace);
            }
            VerificationState::Failed { reason } => {
                tracing::warn!(reason = %reason, "payment not verified");
                self.notifier.notify(Notice {
                    service: callback.service,
                    reason: *reason,
                    message: reason.message().to_string(),
                });
                self.navigator
                    .navigate(&callback.service.listing_path(), NavigationMode::Push);
            }
            VerificationState::Verifying { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        navigations: Mutex<Vec<(String, NavigationMode)>>,
        notices: Mutex<Vec<Notice>>,
    }

    impl Navigator for Arc<Recorder> {
        fn navigate(&self, target: &str, mode: NavigationMode) {
            self.navigations
                .lock()
                .unwrap()
                .push((target.to_string(), mode));
        }
    }

    impl Notifier for Arc<Recorder> {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let recorder = Arc::new(Recorder::default());
        let verifier = PaymentVerifier::new(
            |_reference: String| async { Ok::<_, VerifyError>(VerificationResponse::with_status("failed")) },
            recorder.clone(),
            recorder.clone(),
        );
        let callback = CanonicalCallback::new(ServiceType::CarHire).with_reference("CH-1");

        let state = verifier.run(&callback, &PageLifecycle::new()).await;

        assert_eq!(
            state.and_then(|state| state.failure_reason()),
            Some(FailureReason::VerificationRejected)
        );
        assert_eq!(
            *recorder.navigations.lock().unwrap(),
            vec![("/car-hire".to_string(), NavigationMode::Push)]
        );
        let notices = recorder.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].reason, FailureReason::VerificationRejected);
    }

    #[tokio::test]
    async fn test_hotel_success_is_entity_scoped() {
        let recorder = Arc::new(Recorder::default());
        let verifier = PaymentVerifier::new(
            |_reference: String| async { Ok::<_, VerifyError>(VerificationResponse::success()) },
            recorder.clone(),
            recorder.clone(),
        );
        let callback = CanonicalCallback::new(ServiceType::Hotel)
            .with_entity_id("h9")
            .with_reference("HT-1");

        verifier.run(&callback, &PageLifecycle::new()).await;

        assert_eq!(
            *recorder.navigations.lock().unwrap(),
            vec![(
                "/hotels/h9/success?reference=HT-1".to_string(),
                NavigationMode::Replace
            )]
        );
        assert!(recorder.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmounted_before_start() {
        let recorder = Arc::new(Recorder::default());
        let verifier = PaymentVerifier::new(
            |_reference: String| async { Ok::<_, VerifyError>(VerificationResponse::success()) },
            recorder.clone(),
            recorder.clone(),
        );
        let lifecycle = PageLifecycle::new();
        lifecycle.unmount();

        let callback = CanonicalCallback::new(ServiceType::Flight);
        assert!(verifier.run(&callback, &lifecycle).await.is_none());
        assert!(recorder.navigations.lock().unwrap().is_empty());
        assert!(recorder.notices.lock().unwrap().is_empty());
    }
}
