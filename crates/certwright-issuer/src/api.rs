//! Certificate request and issuer resources as seen by the issuance step.

use std::collections::BTreeMap;

use certwright_pki::KeyUsage;
use serde::{Deserialize, Serialize};
use time::Duration;

/// Annotation naming the secret that holds the request's private key
pub const PRIVATE_KEY_ANNOTATION: &str = "cert-manager.io/private-key-secret-name";

/// A pending certificate request. Never modified by issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub spec: CertificateRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequestSpec {
    /// PEM-encoded PKCS#10 request
    pub request: Vec<u8>,
    /// Requested lifetime; the issuer default applies when absent
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub is_ca: bool,
    #[serde(default)]
    pub usages: Vec<KeyUsage>,
}

impl CertificateRequest {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        request: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            annotations: BTreeMap::new(),
            spec: CertificateRequestSpec {
                request: request.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.spec.duration = Some(duration);
        self
    }

    pub fn with_is_ca(mut self, is_ca: bool) -> Self {
        self.spec.is_ca = is_ca;
        self
    }

    pub fn with_usages(mut self, usages: &[KeyUsage]) -> Self {
        self.spec.usages = usages.to_vec();
        self
    }

    /// Secret name stored under `annotation`, if present and non-empty
    pub fn private_key_secret_name(&self, annotation: &str) -> Option<&str> {
        self.annotations
            .get(annotation)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Whether the issuer lives in a namespace or is cluster scoped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssuerScope {
    Namespaced(String),
    Cluster,
}

/// Self-signed issuer policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfSignedIssuer {
    /// Replaces any CRL distribution points implied by the request
    #[serde(default)]
    pub crl_distribution_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    pub name: String,
    pub scope: IssuerScope,
    #[serde(default)]
    pub self_signed: SelfSignedIssuer,
}

impl IssuerConfig {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: IssuerScope::Namespaced(namespace.into()),
            self_signed: SelfSignedIssuer::default(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: IssuerScope::Cluster,
            self_signed: SelfSignedIssuer::default(),
        }
    }

    pub fn with_crl_distribution_points(mut self, points: Vec<String>) -> Self {
        self.self_signed.crl_distribution_points = points;
        self
    }
}
