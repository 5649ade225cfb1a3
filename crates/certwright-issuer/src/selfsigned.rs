//! Self-signed issuance.
//!
//! Signs a request's certificate with the private key the request itself
//! references, so the certificate is its own issuer and CA.

use std::sync::Arc;

use certwright_key::KeyResolver;
use certwright_pki::{public_keys_equal, CertificateSigner, X509Signer};

use crate::{
    api::{CertificateRequest, IssuerConfig},
    error::{IssuerError, Result},
    options::IssuerOptions,
    outcome::{IssuanceResult, Outcome, Reason},
    reporter::{ConditionSink, EventRecorder, OutcomeReporter},
    template::generate_template,
};

/// Name of the self-signed certificate request controller
pub const CONTROLLER_NAME: &str = "certificaterequests-issuer-selfsigned";

/// Warning raised when the issued certificate will have an empty issuer DN
pub const EMPTY_DN_MESSAGE: &str = "Certificate will be issued with an empty Issuer DN, which contravenes RFC 5280 and could break some strict clients";

/// Self-signed issuer
pub struct SelfSigned {
    options: IssuerOptions,
    keys: Arc<dyn KeyResolver>,
    reporter: OutcomeReporter,
    signer: Arc<dyn CertificateSigner>,
}

impl SelfSigned {
    /// Create an issuer signing with [`X509Signer`]
    pub fn new(
        options: IssuerOptions,
        keys: Arc<dyn KeyResolver>,
        conditions: Arc<dyn ConditionSink>,
        events: Arc<dyn EventRecorder>,
    ) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            options,
            keys,
            reporter: OutcomeReporter::new(conditions, events),
            signer: Arc::new(X509Signer::new()),
        })
    }

    /// Replace the signing strategy
    pub fn with_signer(mut self, signer: Arc<dyn CertificateSigner>) -> Self {
        self.signer = signer;
        self
    }

    pub fn options(&self) -> &IssuerOptions {
        &self.options
    }

    /// Issue a self-signed certificate for `request`.
    ///
    /// The outcome is reported to the condition sink exactly once before it is
    /// returned. Only [`Reason::ErrorGettingSecret`] yields a backoff error.
    pub fn sign(&self, request: &CertificateRequest, issuer: &IssuerConfig) -> Outcome {
        let outcome = self.issue(request, issuer);
        self.reporter.report(request, &outcome);
        outcome
    }

    fn issue(&self, request: &CertificateRequest, issuer: &IssuerConfig) -> Outcome {
        let annotation = &self.options.private_key_annotation;

        let Some(secret_name) = request.private_key_secret_name(annotation) else {
            return Outcome::failure(
                Reason::MissingAnnotation,
                format!("Annotation {annotation:?} missing or reference empty"),
                IssuerError::MissingSecretName,
            );
        };

        let private_key = match self.keys.resolve_key(&request.namespace, secret_name) {
            Ok(key) => key,
            Err(err) if err.is_not_found() => {
                return Outcome::failure(
                    Reason::MissingSecret,
                    format!("Referenced secret {}/{secret_name} not found", request.namespace),
                    err,
                );
            }
            Err(err) if err.is_invalid_data() => {
                return Outcome::failure(
                    Reason::ErrorParsingKey,
                    format!("Failed to get key {secret_name:?} referenced in annotation {annotation:?}"),
                    err,
                );
            }
            Err(err) => {
                let resource_namespace = self.options.resource_namespace(issuer);
                return Outcome::failure(
                    Reason::ErrorGettingSecret,
                    format!("Failed to get certificate key pair from secret {resource_namespace}/{secret_name}"),
                    err,
                );
            }
        };

        let template = match generate_template(request, issuer, &self.options) {
            Ok(template) => template,
            Err(err) => {
                return Outcome::failure(
                    Reason::ErrorGenerating,
                    "Error generating certificate template",
                    err,
                );
            }
        };

        // The issuer DN is the subject DN
        if template.has_empty_subject() {
            self.reporter.warn_empty_issuer_dn(request, EMPTY_DN_MESSAGE);
        }

        let public_key = match private_key.public_key() {
            Ok(public_key) => public_key,
            Err(err) => {
                return Outcome::failure(
                    Reason::ErrorPublicKey,
                    "Failed to get public key from private key",
                    err,
                );
            }
        };

        let binding = match public_keys_equal(&public_key, &template.public_key) {
            Ok(true) => Ok(()),
            Ok(false) => Err(IssuerError::KeyMismatch),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = binding {
            return Outcome::failure(
                Reason::ErrorKeyMatch,
                "Error generating certificate template",
                err,
            );
        }

        match self.signer.sign(&template, &template, &public_key, &private_key) {
            Ok(signed) => Outcome::Ready(IssuanceResult::self_signed(signed.pem)),
            Err(err) => Outcome::failure(Reason::ErrorSigning, "Error signing certificate", err),
        }
    }
}
