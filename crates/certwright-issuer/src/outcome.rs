//! Issuance outcomes.
//!
//! Every issuance ends in one [`Outcome`]. Failures carry a [`Reason`] whose
//! class decides how the request is treated on the next pass:
//!
//! | Reason | Outcome |
//! |---|---|
//! | `MissingAnnotation` | failed |
//! | `MissingSecret`, `ErrorParsingKey` | pending, retried when the secret changes |
//! | `ErrorGettingSecret` | pending, error returned to the caller for backoff |
//! | `ErrorGenerating`, `ErrorPublicKey`, `ErrorKeyMatch`, `ErrorSigning` | failed |

use std::fmt;

use crate::error::IssuerError;

/// Machine readable failure reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    MissingAnnotation,
    MissingSecret,
    ErrorParsingKey,
    ErrorGettingSecret,
    ErrorGenerating,
    ErrorPublicKey,
    ErrorKeyMatch,
    ErrorSigning,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MissingAnnotation => "MissingAnnotation",
            Reason::MissingSecret => "MissingSecret",
            Reason::ErrorParsingKey => "ErrorParsingKey",
            Reason::ErrorGettingSecret => "ErrorGettingSecret",
            Reason::ErrorGenerating => "ErrorGenerating",
            Reason::ErrorPublicKey => "ErrorPublicKey",
            Reason::ErrorKeyMatch => "ErrorKeyMatch",
            Reason::ErrorSigning => "ErrorSigning",
        }
    }

    /// Whether the request stays pending rather than failing for good
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Reason::MissingSecret | Reason::ErrorParsingKey | Reason::ErrorGettingSecret
        )
    }

    /// Whether the error is handed back to the caller so it retries with backoff
    pub fn requires_backoff(&self) -> bool {
        matches!(self, Reason::ErrorGettingSecret)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issued certificate and its CA, both PEM encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceResult {
    pub certificate: Vec<u8>,
    pub certificate_authority: Vec<u8>,
}

impl IssuanceResult {
    /// A self-signed certificate is its own CA
    pub fn self_signed(pem: Vec<u8>) -> Self {
        Self {
            certificate_authority: pem.clone(),
            certificate: pem,
        }
    }
}

/// Why an issuance did not produce a certificate
#[derive(Debug)]
pub struct Failure {
    pub reason: Reason,
    pub message: String,
    pub error: IssuerError,
}

impl Failure {
    /// Message recorded on the request condition
    pub fn condition_message(&self) -> String {
        format!("{}: {}", self.message, self.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Ready,
    Pending,
    Failed,
}

/// Result of one issuance attempt
#[derive(Debug)]
pub enum Outcome {
    Ready(IssuanceResult),
    Pending(Failure),
    Failed(Failure),
}

impl Outcome {
    /// Failure outcome; pending or failed depending on `reason`
    pub fn failure(reason: Reason, message: impl Into<String>, error: impl Into<IssuerError>) -> Self {
        let failure = Failure {
            reason,
            message: message.into(),
            error: error.into(),
        };
        if reason.is_retryable() {
            Outcome::Pending(failure)
        } else {
            Outcome::Failed(failure)
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Ready(_) => OutcomeKind::Ready,
            Outcome::Pending(_) => OutcomeKind::Pending,
            Outcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        self.as_failure().map(|failure| failure.reason)
    }

    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Pending(failure) | Outcome::Failed(failure) => Some(failure),
        }
    }

    pub fn issuance(&self) -> Option<&IssuanceResult> {
        match self {
            Outcome::Ready(result) => Some(result),
            _ => None,
        }
    }

    /// Error the caller must see so it retries with backoff
    pub fn backoff_error(&self) -> Option<&IssuerError> {
        match self {
            Outcome::Pending(failure) if failure.reason.requires_backoff() => Some(&failure.error),
            _ => None,
        }
    }

    /// Collapse into `(result, error)` form: a result on success, an error only
    /// when backoff is required, neither otherwise.
    pub fn into_response(self) -> std::result::Result<Option<IssuanceResult>, IssuerError> {
        match self {
            Outcome::Ready(result) => Ok(Some(result)),
            Outcome::Pending(failure) if failure.reason.requires_backoff() => Err(failure.error),
            Outcome::Pending(_) | Outcome::Failed(_) => Ok(None),
        }
    }
}
