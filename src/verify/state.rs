//! Verification state machine.
//!
//! ```text
//! begin(Some(ref)) ──► Verifying ──┬── Confirmed ──► Succeeded
//!                                  ├── Rejected  ──► Failed(VerificationRejected)
//!                                  └── Errored   ──► Failed(VerificationError)
//! begin(None) ─────────────────────────────────────► Failed(MissingReference)
//! ```

use std::fmt;

/// Why a payment could not be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// No `reference` or `trxref` could be resolved.
    MissingReference,
    /// The collaborator answered with a status other than success.
    VerificationRejected,
    /// The collaborator call itself failed.
    VerificationError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MissingReference => "MissingReference",
            FailureReason::VerificationRejected => "VerificationRejected",
            FailureReason::VerificationError => "VerificationError",
        }
    }

    /// The user-facing notification text.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::MissingReference => "No payment reference was found.",
            FailureReason::VerificationRejected => "Payment verification failed.",
            FailureReason::VerificationError => {
                "We could not verify your payment. Please try again."
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome reported while `Verifying`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    Confirmed,
    Rejected { status: String },
    Errored { message: String },
}

/// The state of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Verifying { reference: String },
    Succeeded { reference: String },
    Failed { reason: FailureReason },
}

impl VerificationState {
    /// Enters the machine. Without a usable reference it is already `Failed`.
    pub fn begin(reference: Option<String>) -> Self {
        match reference.filter(|reference| !reference.is_empty()) {
            Some(reference) => VerificationState::Verifying { reference },
            None => VerificationState::Failed {
                reason: FailureReason::MissingReference,
            },
        }
    }

    /// Applies `event`. Terminal states ignore every event.
    pub fn transition(self, event: VerificationEvent) -> Self {
        match (self, event) {
            (VerificationState::Verifying { reference }, VerificationEvent::Confirmed) => {
                VerificationState::Succeeded { reference }
            }
            (VerificationState::Verifying { .. }, VerificationEvent::Rejected { status }) => {
                tracing::debug!(status, "payment verification rejected");
                VerificationState::Failed {
                    reason: FailureReason::VerificationRejected,
                }
            }
            (VerificationState::Verifying { .. }, VerificationEvent::Errored { message }) => {
                tracing::debug!(message, "payment verification errored");
                VerificationState::Failed {
                    reason: FailureReason::VerificationError,
                }
            }
            (state, event) => {
                tracing::warn!(state = state.as_str(), ?event, "ignoring event in a terminal state");
                state
            }
        }
    }

    /// The reference still awaiting verification, if any.
    pub fn pending_reference(&self) -> Option<&str> {
        match self {
            VerificationState::Verifying { reference } => Some(reference),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationState::Verifying { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            VerificationState::Failed { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Verifying { .. } => "Verifying",
            VerificationState::Succeeded { .. } => "Succeeded",
            VerificationState::Failed { .. } => "Failed",
        }
    }
}
