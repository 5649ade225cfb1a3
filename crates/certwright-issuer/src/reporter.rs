//! Outcome reporting.
//!
//! The issuance step records its result on the request through a
//! [`ConditionSink`] and raises events through an [`EventRecorder`].
//! [`MemoryRecorder`] implements both in memory.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use time::OffsetDateTime;

use crate::{
    api::CertificateRequest,
    error::IssuerError,
    outcome::{Failure, Outcome},
};

/// Condition reason recorded on successful issuance
pub const REASON_ISSUED: &str = "Issued";
/// Event reason for issuer configuration problems
pub const REASON_BAD_CONFIG: &str = "BadConfig";

const ISSUED_MESSAGE: &str = "Certificate fetched from issuer successfully";

/// Receives the condition update for each issuance
pub trait ConditionSink: Send + Sync {
    fn report_failed(
        &self,
        request: &CertificateRequest,
        error: &IssuerError,
        reason: &str,
        message: &str,
    );

    fn report_pending(
        &self,
        request: &CertificateRequest,
        error: &IssuerError,
        reason: &str,
        message: &str,
    );

    fn report_ready(&self, request: &CertificateRequest);
}

/// Receives events attached to a request
pub trait EventRecorder: Send + Sync {
    fn emit_warning(&self, request: &CertificateRequest, reason: &str, message: &str);
}

/// Routes an [`Outcome`] to the sink and the log
#[derive(Clone)]
pub struct OutcomeReporter {
    conditions: Arc<dyn ConditionSink>,
    events: Arc<dyn EventRecorder>,
}

impl OutcomeReporter {
    pub fn new(conditions: Arc<dyn ConditionSink>, events: Arc<dyn EventRecorder>) -> Self {
        Self { conditions, events }
    }

    pub fn report(&self, request: &CertificateRequest, outcome: &Outcome) {
        match outcome {
            Outcome::Ready(_) => {
                tracing::debug!(request = %request.key(), "self signed certificate issued");
                self.conditions.report_ready(request);
            }
            Outcome::Pending(failure) => {
                log_failure(request, failure);
                self.conditions.report_pending(
                    request,
                    &failure.error,
                    failure.reason.as_str(),
                    &failure.message,
                );
            }
            Outcome::Failed(failure) => {
                log_failure(request, failure);
                self.conditions.report_failed(
                    request,
                    &failure.error,
                    failure.reason.as_str(),
                    &failure.message,
                );
            }
        }
    }

    /// Warn that the certificate will carry an empty issuer DN
    pub fn warn_empty_issuer_dn(&self, request: &CertificateRequest, message: &str) {
        tracing::debug!(
            request = %request.key(),
            "issued cert will have an empty issuer DN, which contravenes RFC 5280. emitting warning event"
        );
        self.events.emit_warning(request, REASON_BAD_CONFIG, message);
    }
}

fn log_failure(request: &CertificateRequest, failure: &Failure) {
    tracing::error!(
        request = %request.key(),
        reason = %failure.reason,
        error = %failure.error,
        "{}",
        failure.message
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    Ready,
    Pending,
    Failed,
}

/// Ready condition of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

/// In-memory condition sink and event recorder, keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    conditions: RwLock<HashMap<String, Vec<Condition>>>,
    events: RwLock<HashMap<String, Vec<Event>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every condition reported for the request, oldest first
    pub fn conditions(&self, namespace: &str, name: &str) -> Vec<Condition> {
        let conditions = self.conditions.read().unwrap_or_else(PoisonError::into_inner);
        conditions
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .unwrap_or_default()
    }

    /// Most recent condition for the request
    pub fn condition(&self, namespace: &str, name: &str) -> Option<Condition> {
        self.conditions(namespace, name).pop()
    }

    pub fn events(&self, namespace: &str, name: &str) -> Vec<Event> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        events
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .unwrap_or_default()
    }

    fn record_condition(&self, request: &CertificateRequest, status: ConditionStatus, reason: &str, message: String) {
        let condition = Condition {
            status,
            reason: reason.to_string(),
            message,
            last_transition_time: OffsetDateTime::now_utc(),
        };
        self.conditions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.key())
            .or_default()
            .push(condition);
    }

    fn record_event(&self, request: &CertificateRequest, event: Event) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.key())
            .or_default()
            .push(event);
    }
}

impl ConditionSink for MemoryRecorder {
    fn report_failed(
        &self,
        request: &CertificateRequest,
        error: &IssuerError,
        reason: &str,
        message: &str,
    ) {
        self.record_event(
            request,
            Event {
                event_type: EventType::Warning,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
        self.record_condition(request, ConditionStatus::Failed, reason, format!("{message}: {error}"));
    }

    fn report_pending(
        &self,
        request: &CertificateRequest,
        error: &IssuerError,
        reason: &str,
        message: &str,
    ) {
        self.record_event(
            request,
            Event {
                event_type: EventType::Normal,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
        self.record_condition(request, ConditionStatus::Pending, reason, format!("{message}: {error}"));
    }

    fn report_ready(&self, request: &CertificateRequest) {
        self.record_condition(
            request,
            ConditionStatus::Ready,
            REASON_ISSUED,
            ISSUED_MESSAGE.to_string(),
        );
    }
}

impl EventRecorder for MemoryRecorder {
    fn emit_warning(&self, request: &CertificateRequest, reason: &str, message: &str) {
        self.record_event(
            request,
            Event {
                event_type: EventType::Warning,
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
    }
}
