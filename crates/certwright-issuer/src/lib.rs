//! Certwright Issuer - self-signed issuance for certificate requests
//!
//! [`SelfSigned`] resolves the private key a request references, builds the
//! certificate template from the request, checks that the request was signed by
//! that key and signs the template with it. Every invocation ends in exactly one
//! [`Outcome`], which is also reported to the configured condition sink.

pub mod api;
pub mod error;
pub mod options;
pub mod outcome;
pub mod reporter;
pub mod selfsigned;
pub mod template;

// 重新导出常用类型
pub use api::{
    CertificateRequest, CertificateRequestSpec, IssuerConfig, IssuerScope, SelfSignedIssuer,
    PRIVATE_KEY_ANNOTATION,
};
pub use error::{IssuerError, Result};
pub use options::IssuerOptions;
pub use outcome::{Failure, IssuanceResult, Outcome, OutcomeKind, Reason};
pub use reporter::{
    Condition, ConditionSink, ConditionStatus, Event, EventRecorder, EventType, MemoryRecorder,
    OutcomeReporter,
};
pub use selfsigned::{SelfSigned, CONTROLLER_NAME, EMPTY_DN_MESSAGE};
pub use template::generate_template;
