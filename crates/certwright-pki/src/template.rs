//! Certificate templates
//!
//! A [`CertificateTemplate`] is the canonical to-be-signed description of a
//! certificate, derived from a CSR plus the request's duration, CA flag and
//! usages. The template has a single distinguished name that serves as both
//! subject and issuer, since every certificate issued from it is self-signed.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::db::rfc5280;
use der::{
    asn1::{Ia5String, OctetString},
    Decode, Encode,
};
use pkcs8::spki::SubjectPublicKeyInfoOwned;
use time::Duration;
use x509_cert::{
    ext::{
        pkix::{
            crl::dp::DistributionPoint,
            name::{DistributionPointName, GeneralName},
            CrlDistributionPoints, SubjectAltName,
        },
        Extension,
    },
    name::Name,
};

use crate::{
    csr::Csr,
    error::{PkiError, Result},
    usage::{split_usages, KeyUsage, DEFAULT_KEY_USAGES},
};

/// Default certificate lifetime (90 days)
pub const DEFAULT_CERTIFICATE_DURATION: Duration = Duration::days(90);

/// Subject alternative names requested for a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltNames {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub email_addresses: Vec<String>,
    pub uris: Vec<String>,
}

impl SubjectAltNames {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty()
            && self.ip_addresses.is_empty()
            && self.email_addresses.is_empty()
            && self.uris.is_empty()
    }

    /// Collect names from every subjectAltName extension in `extensions`
    pub fn from_extensions(extensions: &[Extension]) -> Result<Self> {
        let mut sans = Self::default();

        for ext in extensions
            .iter()
            .filter(|ext| ext.extn_id == rfc5280::ID_CE_SUBJECT_ALT_NAME)
        {
            let names = SubjectAltName::from_der(ext.extn_value.as_bytes()).map_err(|e| {
                PkiError::ParseError(format!("Failed to parse subjectAltName: {}", e))
            })?;

            for name in names.0 {
                match name {
                    GeneralName::DnsName(dns) => sans.dns_names.push(dns.to_string()),
                    GeneralName::Rfc822Name(email) => sans.email_addresses.push(email.to_string()),
                    GeneralName::UniformResourceIdentifier(uri) => sans.uris.push(uri.to_string()),
                    GeneralName::IpAddress(ip) => sans.ip_addresses.push(ip_from_octets(ip.as_bytes())?),
                    other => {
                        tracing::debug!(?other, "ignoring unsupported subjectAltName entry");
                    }
                }
            }
        }

        Ok(sans)
    }

    /// Encode as a non-critical subjectAltName extension
    pub fn to_extension(&self) -> Result<Extension> {
        let mut names = Vec::new();

        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(dns)?));
        }
        for ip in &self.ip_addresses {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            let octets = OctetString::new(octets)
                .map_err(|e| PkiError::GenerationError(format!("Invalid IP address: {}", e)))?;
            names.push(GeneralName::IpAddress(octets));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(ia5(email)?));
        }
        for uri in &self.uris {
            names.push(GeneralName::UniformResourceIdentifier(ia5(uri)?));
        }

        let value = SubjectAltName(names)
            .to_der()
            .map_err(|e| PkiError::GenerationError(format!("Failed to encode subjectAltName: {}", e)))?;

        Ok(Extension {
            extn_id: rfc5280::ID_CE_SUBJECT_ALT_NAME,
            critical: false,
            extn_value: OctetString::new(value)
                .map_err(|e| PkiError::GenerationError(format!("Failed to wrap extension: {}", e)))?,
        })
    }
}

/// The canonical to-be-signed certificate structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    /// Subject distinguished name, also used as the issuer
    pub subject: Name,
    /// Public key declared by the request
    pub public_key: SubjectPublicKeyInfoOwned,
    pub subject_alt_names: SubjectAltNames,
    pub key_usages: Vec<KeyUsage>,
    pub extended_key_usages: Vec<KeyUsage>,
    pub is_ca: bool,
    /// Length of the validity window; the signer anchors it in time
    pub duration: Duration,
    pub crl_distribution_points: Vec<String>,
}

impl CertificateTemplate {
    /// Issuer distinguished name. Identical to the subject.
    pub fn issuer(&self) -> &Name {
        &self.subject
    }

    /// Whether the subject DN serializes to the empty string.
    ///
    /// RFC 5280 requires a non-empty issuer DN, so a self-signed certificate
    /// issued from such a template violates it.
    pub fn has_empty_subject(&self) -> bool {
        self.subject.to_string().is_empty()
    }

    /// Replace the CRL distribution points, discarding any request-supplied value
    pub fn set_crl_distribution_points(&mut self, points: Vec<String>) {
        self.crl_distribution_points = points;
    }
}

/// Builds a [`CertificateTemplate`] from a PEM-encoded CSR.
///
/// The CSR bytes are only borrowed; nothing about the request is modified.
#[derive(Debug, Clone)]
pub struct TemplateBuilder<'a> {
    csr_pem: &'a [u8],
    duration: Duration,
    is_ca: bool,
    usages: Vec<KeyUsage>,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(csr_pem: &'a [u8]) -> Self {
        Self {
            csr_pem,
            duration: DEFAULT_CERTIFICATE_DURATION,
            is_ca: false,
            usages: Vec::new(),
        }
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_ca(mut self, is_ca: bool) -> Self {
        self.is_ca = is_ca;
        self
    }

    /// Requested usages; an empty list falls back to [`DEFAULT_KEY_USAGES`]
    pub fn usages(mut self, usages: &[KeyUsage]) -> Self {
        self.usages = usages.to_vec();
        self
    }

    pub fn build(self) -> Result<CertificateTemplate> {
        if !self.duration.is_positive() {
            return Err(PkiError::GenerationError(format!(
                "Certificate duration must be positive, got {}",
                self.duration
            )));
        }

        let csr = Csr::from_pem(self.csr_pem)?;
        csr.verify_signature()?;

        let requested = csr.requested_extensions()?;
        let subject_alt_names = SubjectAltNames::from_extensions(&requested)?;
        let crl_distribution_points = crl_distribution_point_uris(&requested)?;

        let usages = if self.usages.is_empty() {
            DEFAULT_KEY_USAGES.to_vec()
        } else {
            self.usages
        };
        let (key_usages, extended_key_usages) = split_usages(&usages, self.is_ca);

        Ok(CertificateTemplate {
            subject: csr.subject().clone(),
            public_key: csr.public_key_info().clone(),
            subject_alt_names,
            key_usages,
            extended_key_usages,
            is_ca: self.is_ca,
            duration: self.duration,
            crl_distribution_points,
        })
    }
}

/// URIs of every full-name distribution point in any CRL distribution points extension
pub(crate) fn crl_distribution_point_uris(extensions: &[Extension]) -> Result<Vec<String>> {
    let mut uris = Vec::new();

    for ext in extensions
        .iter()
        .filter(|ext| ext.extn_id == rfc5280::ID_CE_CRL_DISTRIBUTION_POINTS)
    {
        let points = CrlDistributionPoints::from_der(ext.extn_value.as_bytes()).map_err(|e| {
            PkiError::ParseError(format!("Failed to parse CRL distribution points: {}", e))
        })?;

        for point in points.0 {
            if let Some(DistributionPointName::FullName(names)) = point.distribution_point {
                uris.extend(names.into_iter().filter_map(|name| match name {
                    GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                    _ => None,
                }));
            }
        }
    }

    Ok(uris)
}

/// Non-critical CRL distribution points extension listing `uris` in a single full-name point
pub(crate) fn crl_distribution_points_extension(uris: &[String]) -> Result<Extension> {
    let names = uris
        .iter()
        .map(|uri| ia5(uri).map(GeneralName::UniformResourceIdentifier))
        .collect::<Result<Vec<_>>>()?;
    let points = CrlDistributionPoints(vec![DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(names)),
        reasons: None,
        crl_issuer: None,
    }]);
    let value = points.to_der().map_err(|e| {
        PkiError::GenerationError(format!("Failed to encode CRL distribution points: {}", e))
    })?;

    Ok(Extension {
        extn_id: rfc5280::ID_CE_CRL_DISTRIBUTION_POINTS,
        critical: false,
        extn_value: OctetString::new(value)
            .map_err(|e| PkiError::GenerationError(format!("Failed to wrap extension: {}", e)))?,
    })
}

fn ia5(value: &str) -> Result<Ia5String> {
    Ia5String::new(value)
        .map_err(|e| PkiError::GenerationError(format!("Invalid IA5 string {:?}: {}", value, e)))
}

fn ip_from_octets(octets: &[u8]) -> Result<IpAddr> {
    match octets.len() {
        4 => {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(octets);
            Ok(IpAddr::V4(Ipv4Addr::from(v4)))
        }
        16 => {
            let mut v6 = [0u8; 16];
            v6.copy_from_slice(octets);
            Ok(IpAddr::V6(Ipv6Addr::from(v6)))
        }
        len => Err(PkiError::ParseError(format!(
            "Invalid IP address length in subjectAltName: {}",
            len
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use certwright_key::PrivateKey;

    use super::*;
    use crate::csr::{create_csr, create_csr_with_extensions};

    fn sans() -> SubjectAltNames {
        SubjectAltNames {
            dns_names: vec!["app.example.com".to_string(), "www.example.com".to_string()],
            ip_addresses: vec!["10.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
            email_addresses: vec!["ops@example.com".to_string()],
            uris: vec!["spiffe://example.com/app".to_string()],
        }
    }

    #[test]
    fn test_build_template_from_csr() {
        let key = PrivateKey::ed25519_from_seed(&[8u8; 32]);
        let subject = Name::from_str("CN=app.example.com").unwrap();
        let csr_pem = create_csr(&key, subject.clone(), &sans()).unwrap().to_pem().unwrap();

        let template = TemplateBuilder::new(csr_pem.as_bytes())
            .duration(Duration::hours(24))
            .usages(&[KeyUsage::DigitalSignature, KeyUsage::ServerAuth])
            .build()
            .unwrap();

        assert_eq!(template.subject, subject);
        assert_eq!(template.issuer(), &template.subject);
        assert!(!template.has_empty_subject());
        assert_eq!(template.subject_alt_names, sans());
        assert_eq!(template.key_usages, vec![KeyUsage::DigitalSignature]);
        assert_eq!(template.extended_key_usages, vec![KeyUsage::ServerAuth]);
        assert_eq!(template.duration, Duration::hours(24));
        assert_eq!(template.public_key, key.public_key().unwrap().to_spki().unwrap());
        assert!(template.crl_distribution_points.is_empty());
    }

    #[test]
    fn test_defaults_and_ca() {
        let key = PrivateKey::p256_from_scalar(&[0x33; 32]).unwrap();
        let csr_pem = create_csr(&key, Name::default(), &SubjectAltNames::default())
            .unwrap()
            .to_pem()
            .unwrap();

        let template = TemplateBuilder::new(csr_pem.as_bytes())
            .is_ca(true)
            .build()
            .unwrap();

        assert!(template.has_empty_subject());
        assert!(template.is_ca);
        assert_eq!(template.duration, DEFAULT_CERTIFICATE_DURATION);
        assert_eq!(
            template.key_usages,
            vec![KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment, KeyUsage::CertSign]
        );
    }

    #[test]
    fn test_request_supplied_crl_points_are_read() {
        let key = PrivateKey::ed25519_from_seed(&[9u8; 32]);
        let csr = create_csr_with_extensions(
            &key,
            Name::from_str("CN=crl").unwrap(),
            vec![crl_distribution_points_extension(&["http://request.example.com/crl".to_string()]).unwrap()],
        )
        .unwrap();
        let pem = csr.to_pem().unwrap();

        let mut template = TemplateBuilder::new(pem.as_bytes()).build().unwrap();
        assert_eq!(
            template.crl_distribution_points,
            vec!["http://request.example.com/crl".to_string()]
        );

        template.set_crl_distribution_points(vec![]);
        assert!(template.crl_distribution_points.is_empty());
    }

    #[test]
    fn test_invalid_inputs_fail() {
        assert!(TemplateBuilder::new(b"not a csr").build().is_err());

        let key = PrivateKey::ed25519_from_seed(&[10u8; 32]);
        let pem = create_csr(&key, Name::default(), &SubjectAltNames::default())
            .unwrap()
            .to_pem()
            .unwrap();
        let err = TemplateBuilder::new(pem.as_bytes())
            .duration(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, PkiError::GenerationError(_)));
    }
}
