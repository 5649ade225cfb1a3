//! Certificate signing strategies.
//!
//! [`CertificateSigner`] is the seam between template generation and the
//! actual X.509 encoding. [`X509Signer`] is the production strategy; it can be
//! pinned to a fixed serial number and validity start so output is repeatable.

use std::time::Duration as StdDuration;

use certwright_key::{PrivateKey, PublicKey};
use const_oid::{db::rfc5280, ObjectIdentifier};
use der::{
    asn1::{BitString, GeneralizedTime, OctetString, UtcTime},
    flagset::FlagSet,
    Encode,
};
use time::OffsetDateTime;
use x509_cert::{
    certificate::{TbsCertificate, Version},
    ext::{
        pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage as KeyUsageExt, KeyUsages},
        Extension,
    },
    serial_number::SerialNumber,
    time::{Time, Validity},
    Certificate,
};

use crate::{
    cert::export_certificate,
    error::{PkiError, Result},
    template::{crl_distribution_points_extension, CertificateTemplate},
    usage::KeyUsage,
};

const ID_KP_IPSEC_END_SYSTEM: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.5");
const ID_KP_IPSEC_TUNNEL: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.6");
const ID_KP_IPSEC_USER: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.7");

/// A signed certificate in both PEM and parsed form
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    /// PEM-encoded certificate
    pub pem: Vec<u8>,
    pub certificate: Certificate,
}

/// Turns an (issuer, subject) template pair into a signed certificate.
///
/// For self-signed issuance both templates are the same value and
/// `subject_public_key` is the public half of `issuer_private_key`.
pub trait CertificateSigner: Send + Sync {
    fn sign(
        &self,
        issuer: &CertificateTemplate,
        subject: &CertificateTemplate,
        subject_public_key: &PublicKey,
        issuer_private_key: &PrivateKey,
    ) -> Result<SignedCertificate>;
}

/// Where certificate serial numbers come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialNumberSource {
    /// 16 random bytes, positive and non-zero
    Random,
    /// Big-endian positive integer
    Fixed(Vec<u8>),
}

/// Where the validity window starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityAnchor {
    Now,
    Fixed(OffsetDateTime),
}

/// Encodes the template as an X.509 v3 certificate and signs it with the
/// issuer key.
///
/// Every supported key signs deterministically, so a signer with a fixed
/// serial and validity anchor always produces the same bytes.
#[derive(Debug, Clone)]
pub struct X509Signer {
    serial: SerialNumberSource,
    anchor: ValidityAnchor,
}

impl Default for X509Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl X509Signer {
    /// Random serial numbers, validity starting at signing time
    pub fn new() -> Self {
        Self {
            serial: SerialNumberSource::Random,
            anchor: ValidityAnchor::Now,
        }
    }

    /// Fixed serial number and validity start
    pub fn deterministic(not_before: OffsetDateTime, serial: impl Into<Vec<u8>>) -> Self {
        Self {
            serial: SerialNumberSource::Fixed(serial.into()),
            anchor: ValidityAnchor::Fixed(not_before),
        }
    }

    fn serial_number(&self) -> Result<SerialNumber> {
        let bytes = match &self.serial {
            SerialNumberSource::Random => {
                let mut serial = [0u8; 16];
                getrandom::fill(&mut serial).map_err(|e| {
                    PkiError::SigningError(format!("Failed to generate serial number: {e}"))
                })?;
                serial[0] &= 0x7f;
                serial[0] |= 0x01;
                serial.to_vec()
            }
            SerialNumberSource::Fixed(serial) => {
                if serial.iter().all(|b| *b == 0) {
                    return Err(PkiError::SigningError(
                        "Serial number must be non-zero".to_string(),
                    ));
                }
                if serial.first().is_some_and(|b| b & 0x80 != 0) {
                    return Err(PkiError::SigningError(
                        "Serial number must be positive".to_string(),
                    ));
                }
                serial.clone()
            }
        };

        SerialNumber::new(&bytes)
            .map_err(|e| PkiError::SigningError(format!("Invalid serial number: {e}")))
    }

    fn not_before(&self) -> Result<OffsetDateTime> {
        let anchor = match self.anchor {
            ValidityAnchor::Now => OffsetDateTime::now_utc(),
            ValidityAnchor::Fixed(at) => at,
        };
        anchor
            .replace_nanosecond(0)
            .map_err(|e| PkiError::SigningError(format!("Invalid validity start: {e}")))
    }
}

impl CertificateSigner for X509Signer {
    fn sign(
        &self,
        issuer: &CertificateTemplate,
        subject: &CertificateTemplate,
        subject_public_key: &PublicKey,
        issuer_private_key: &PrivateKey,
    ) -> Result<SignedCertificate> {
        if issuer.subject != subject.subject || issuer.public_key != subject.public_key {
            return Err(PkiError::SigningError(
                "Issuer and subject templates must describe the same certificate".to_string(),
            ));
        }
        if issuer_private_key.public_key()? != *subject_public_key {
            return Err(PkiError::SigningError(
                "Subject public key does not belong to the issuer private key".to_string(),
            ));
        }

        // 设置有效期
        let not_before = self.not_before()?;
        let not_after = not_before.checked_add(subject.duration).ok_or_else(|| {
            PkiError::SigningError(format!("Certificate duration {} overflows", subject.duration))
        })?;

        let signature_algorithm = issuer_private_key.signature_algorithm();
        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number: self.serial_number()?,
            signature: signature_algorithm.clone(),
            issuer: issuer.issuer().clone(),
            validity: Validity {
                not_before: x509_time(not_before)?,
                not_after: x509_time(not_after)?,
            },
            subject: subject.subject.clone(),
            subject_public_key_info: subject.public_key.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions(subject)?),
        };

        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| PkiError::SigningError(format!("Failed to encode certificate: {e}")))?;
        let signature = issuer_private_key.sign(&tbs_der)?;

        let certificate = Certificate {
            tbs_certificate,
            signature_algorithm,
            signature: BitString::from_bytes(&signature)
                .map_err(|e| PkiError::SigningError(format!("Failed to encode signature: {e}")))?,
        };
        let der = certificate
            .to_der()
            .map_err(|e| PkiError::SigningError(format!("Failed to encode certificate: {e}")))?;

        tracing::debug!(
            subject = %subject.subject,
            algorithm = %issuer_private_key.algorithm(),
            %not_before,
            is_ca = subject.is_ca,
            "signed certificate"
        );

        Ok(SignedCertificate {
            pem: export_certificate(&der),
            certificate,
        })
    }
}

fn extensions(template: &CertificateTemplate) -> Result<Vec<Extension>> {
    let mut extensions = vec![encode_extension(
        rfc5280::ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca: template.is_ca,
            path_len_constraint: None,
        },
    )?];

    let key_usage = template
        .key_usages
        .iter()
        .filter_map(|usage| key_usage_flag(*usage))
        .fold(FlagSet::<KeyUsages>::default(), |flags, flag| flags | flag);
    if !key_usage.is_empty() {
        extensions.push(encode_extension(
            rfc5280::ID_CE_KEY_USAGE,
            true,
            &KeyUsageExt(key_usage),
        )?);
    }

    let extended: Vec<ObjectIdentifier> = template
        .extended_key_usages
        .iter()
        .filter_map(|usage| extended_key_usage_oid(*usage))
        .collect();
    if !extended.is_empty() {
        extensions.push(encode_extension(
            rfc5280::ID_CE_EXT_KEY_USAGE,
            false,
            &ExtendedKeyUsage(extended),
        )?);
    }

    if !template.subject_alt_names.is_empty() {
        let mut sans = template.subject_alt_names.to_extension()?;
        // RFC 5280 4.2.1.6: critical when the subject is empty
        sans.critical = template.has_empty_subject();
        extensions.push(sans);
    }

    if !template.crl_distribution_points.is_empty() {
        extensions.push(crl_distribution_points_extension(&template.crl_distribution_points)?);
    }

    Ok(extensions)
}

fn encode_extension(extn_id: ObjectIdentifier, critical: bool, value: &impl Encode) -> Result<Extension> {
    let value = value
        .to_der()
        .map_err(|e| PkiError::SigningError(format!("Failed to encode extension {extn_id}: {e}")))?;
    Ok(Extension {
        extn_id,
        critical,
        extn_value: OctetString::new(value)
            .map_err(|e| PkiError::SigningError(format!("Failed to wrap extension {extn_id}: {e}")))?,
    })
}

/// UTCTime through 2049, GeneralizedTime afterwards
fn x509_time(at: OffsetDateTime) -> Result<Time> {
    let secs = u64::try_from(at.unix_timestamp())
        .map_err(|_| PkiError::SigningError(format!("Certificate time {at} precedes 1970")))?;
    let since_epoch = StdDuration::from_secs(secs);

    let time = if at.year() < 2050 {
        UtcTime::from_unix_duration(since_epoch).map(Time::from)
    } else {
        GeneralizedTime::from_unix_duration(since_epoch).map(Time::from)
    };
    time.map_err(|e| PkiError::SigningError(format!("Invalid certificate time {at}: {e}")))
}

fn key_usage_flag(usage: KeyUsage) -> Option<KeyUsages> {
    let flag = match usage.canonical() {
        KeyUsage::DigitalSignature => KeyUsages::DigitalSignature,
        KeyUsage::ContentCommitment => KeyUsages::NonRepudiation,
        KeyUsage::KeyEncipherment => KeyUsages::KeyEncipherment,
        KeyUsage::DataEncipherment => KeyUsages::DataEncipherment,
        KeyUsage::KeyAgreement => KeyUsages::KeyAgreement,
        KeyUsage::CertSign => KeyUsages::KeyCertSign,
        KeyUsage::CrlSign => KeyUsages::CRLSign,
        KeyUsage::EncipherOnly => KeyUsages::EncipherOnly,
        KeyUsage::DecipherOnly => KeyUsages::DecipherOnly,
        _ => return None,
    };
    Some(flag)
}

fn extended_key_usage_oid(usage: KeyUsage) -> Option<ObjectIdentifier> {
    let oid = match usage.canonical() {
        KeyUsage::Any => rfc5280::ANY_EXTENDED_KEY_USAGE,
        KeyUsage::ServerAuth => rfc5280::ID_KP_SERVER_AUTH,
        KeyUsage::ClientAuth => rfc5280::ID_KP_CLIENT_AUTH,
        KeyUsage::CodeSigning => rfc5280::ID_KP_CODE_SIGNING,
        KeyUsage::EmailProtection => rfc5280::ID_KP_EMAIL_PROTECTION,
        KeyUsage::IpsecEndSystem => ID_KP_IPSEC_END_SYSTEM,
        KeyUsage::IpsecTunnel => ID_KP_IPSEC_TUNNEL,
        KeyUsage::IpsecUser => ID_KP_IPSEC_USER,
        KeyUsage::Timestamping => rfc5280::ID_KP_TIME_STAMPING,
        KeyUsage::OcspSigning => rfc5280::ID_KP_OCSP_SIGNING,
        _ => return None,
    };
    Some(oid)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use der::Decode;
    use time::{macros::datetime, Duration};
    use x509_cert::name::Name;

    use super::*;
    use crate::{
        cert::{certificate_info, parse_certificate},
        csr::create_csr,
        template::{SubjectAltNames, TemplateBuilder},
    };

    const RSA_PEM: &str = include_str!("../../certwright-key/testdata/rsa-2048.pem");

    fn template(key: &PrivateKey, subject: &str, sans: &SubjectAltNames) -> CertificateTemplate {
        let name = Name::from_str(subject).unwrap();
        let pem = create_csr(key, name, sans).unwrap().to_pem().unwrap();
        TemplateBuilder::new(pem.as_bytes())
            .duration(Duration::hours(48))
            .usages(&[KeyUsage::DigitalSignature, KeyUsage::ServerAuth, KeyUsage::IpsecUser])
            .build()
            .unwrap()
    }

    fn extension(cert: &Certificate, oid: ObjectIdentifier) -> Option<&Extension> {
        cert.tbs_certificate
            .extensions
            .as_ref()
            .and_then(|exts| exts.iter().find(|ext| ext.extn_id == oid))
    }

    #[test]
    fn test_deterministic_signing_is_repeatable() {
        let key = PrivateKey::ed25519_from_seed(&[5u8; 32]);
        let public = key.public_key().unwrap();
        let tpl = template(&key, "CN=repeatable,O=Example", &SubjectAltNames::default());

        let start = datetime!(2024-01-01 00:00:00 UTC);
        let signer = X509Signer::deterministic(start, vec![0x01, 0x02, 0x03]);
        let first = signer.sign(&tpl, &tpl, &public, &key).unwrap();
        let second = signer.sign(&tpl, &tpl, &public, &key).unwrap();
        assert_eq!(first.pem, second.pem);

        let info = certificate_info(&first.certificate).unwrap();
        assert_eq!(info.serial_number, "010203");
        assert_eq!(info.not_before, start);
        assert_eq!(info.not_after, start + Duration::hours(48));
        assert!(info.is_self_issued());
        assert!(!info.is_ca);
        assert_eq!(info.subject, tpl.subject.to_string());
    }

    #[test]
    fn test_deterministic_signing_is_repeatable_for_ecdsa_and_rsa() {
        let keys = [
            PrivateKey::p256_from_scalar(&[0x21; 32]).unwrap(),
            PrivateKey::p384_from_scalar(&[0x22; 48]).unwrap(),
            PrivateKey::from_pem(RSA_PEM).unwrap(),
        ];
        let signer = X509Signer::deterministic(datetime!(2024-01-01 00:00:00 UTC), vec![0x07]);

        for key in keys {
            let public = key.public_key().unwrap();
            let tpl = template(&key, "CN=repeatable", &SubjectAltNames::default());
            let first = signer.sign(&tpl, &tpl, &public, &key).unwrap();
            let second = signer.sign(&tpl, &tpl, &public, &key).unwrap();
            assert_eq!(first.pem, second.pem, "{}", key.algorithm());
        }
    }

    #[test]
    fn test_signature_verifies_for_every_algorithm() {
        let keys = [
            PrivateKey::from_pem(RSA_PEM).unwrap(),
            PrivateKey::p256_from_scalar(&[0x23; 32]).unwrap(),
            PrivateKey::p384_from_scalar(&[0x24; 48]).unwrap(),
            PrivateKey::ed25519_from_seed(&[0x25; 32]),
        ];

        for key in keys {
            let public = key.public_key().unwrap();
            let tpl = template(&key, "CN=verify", &SubjectAltNames::default());
            let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();
            let cert = &signed.certificate;

            assert_eq!(cert.signature_algorithm, key.signature_algorithm());
            assert_eq!(cert.tbs_certificate.signature, key.signature_algorithm());

            let tbs = cert.tbs_certificate.to_der().unwrap();
            assert!(public.verify(&tbs, cert.signature.raw_bytes()).is_ok());
        }
    }

    #[test]
    fn test_repeated_attribute_dn_is_kept_verbatim() {
        let key = PrivateKey::p256_from_scalar(&[0x26; 32]).unwrap();
        let public = key.public_key().unwrap();
        let tpl = template(&key, "CN=app,OU=a,OU=b", &SubjectAltNames::default());
        assert_eq!(tpl.subject.0.len(), 3);

        let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();
        let tbs = &signed.certificate.tbs_certificate;
        assert_eq!(tbs.subject, tpl.subject);
        assert_eq!(tbs.issuer, tpl.subject);
        assert_eq!(tbs.subject.to_der().unwrap(), tpl.subject.to_der().unwrap());

        let reparsed = parse_certificate(&signed.pem).unwrap();
        assert_eq!(reparsed.tbs_certificate.subject.to_string(), tpl.subject.to_string());
    }

    #[test]
    fn test_pem_matches_parsed_certificate() {
        let key = PrivateKey::p256_from_scalar(&[0x66; 32]).unwrap();
        let public = key.public_key().unwrap();
        let sans = SubjectAltNames {
            dns_names: vec!["app.example.com".to_string()],
            ip_addresses: vec!["192.0.2.1".parse().unwrap()],
            ..Default::default()
        };
        let tpl = template(&key, "CN=app.example.com", &sans);

        let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();
        let reparsed = parse_certificate(&signed.pem).unwrap();
        assert_eq!(reparsed, signed.certificate);

        let info = certificate_info(&reparsed).unwrap();
        assert_eq!(info.subject_alt_names, sans);
        assert_eq!(
            PublicKey::from_spki(&reparsed.tbs_certificate.subject_public_key_info).unwrap(),
            public
        );
        assert!(!extension(&reparsed, rfc5280::ID_CE_SUBJECT_ALT_NAME).unwrap().critical);
    }

    #[test]
    fn test_usages_are_encoded() {
        let key = PrivateKey::ed25519_from_seed(&[4u8; 32]);
        let public = key.public_key().unwrap();
        let tpl = template(&key, "CN=usages", &SubjectAltNames::default());

        let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();

        let ku = extension(&signed.certificate, rfc5280::ID_CE_KEY_USAGE).unwrap();
        assert!(ku.critical);
        let ku = KeyUsageExt::from_der(ku.extn_value.as_bytes()).unwrap();
        assert!(ku.digital_signature());
        assert!(!ku.key_cert_sign());

        let eku = extension(&signed.certificate, rfc5280::ID_CE_EXT_KEY_USAGE).unwrap();
        assert!(!eku.critical);
        let eku = ExtendedKeyUsage::from_der(eku.extn_value.as_bytes()).unwrap();
        assert_eq!(eku.0, vec![rfc5280::ID_KP_SERVER_AUTH, ID_KP_IPSEC_USER]);
    }

    #[test]
    fn test_empty_subject_stays_empty() {
        let key = PrivateKey::ed25519_from_seed(&[6u8; 32]);
        let public = key.public_key().unwrap();
        let sans = SubjectAltNames {
            dns_names: vec!["ca.example.com".to_string()],
            ..Default::default()
        };
        let pem = create_csr(&key, Name::default(), &sans)
            .unwrap()
            .to_pem()
            .unwrap();
        let tpl = TemplateBuilder::new(pem.as_bytes()).is_ca(true).build().unwrap();

        let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();
        let info = certificate_info(&signed.certificate).unwrap();
        assert!(info.subject.is_empty());
        assert!(info.issuer.is_empty());
        assert!(info.is_ca);
        assert!(extension(&signed.certificate, rfc5280::ID_CE_SUBJECT_ALT_NAME).unwrap().critical);
    }

    #[test]
    fn test_crl_distribution_points_are_embedded() {
        let key = PrivateKey::ed25519_from_seed(&[7u8; 32]);
        let public = key.public_key().unwrap();
        let mut tpl = template(&key, "CN=crl", &SubjectAltNames::default());
        tpl.set_crl_distribution_points(vec!["http://crl.example.com/ca.crl".to_string()]);

        let signed = X509Signer::new().sign(&tpl, &tpl, &public, &key).unwrap();
        let info = certificate_info(&signed.certificate).unwrap();
        assert_eq!(info.crl_distribution_points, vec!["http://crl.example.com/ca.crl".to_string()]);
    }

    #[test]
    fn test_validity_after_2049_uses_generalized_time() {
        let key = PrivateKey::ed25519_from_seed(&[3u8; 32]);
        let public = key.public_key().unwrap();
        let tpl = template(&key, "CN=late", &SubjectAltNames::default());

        let start = datetime!(2049-12-31 12:00:00 UTC);
        let signed = X509Signer::deterministic(start, vec![0x01])
            .sign(&tpl, &tpl, &public, &key)
            .unwrap();
        let validity = &signed.certificate.tbs_certificate.validity;
        assert!(matches!(validity.not_before, Time::UtcTime(_)));
        assert!(matches!(validity.not_after, Time::GeneralTime(_)));

        let info = certificate_info(&signed.certificate).unwrap();
        assert_eq!(info.not_after, start + Duration::hours(48));
    }

    #[test]
    fn test_random_serials_are_positive() {
        let signer = X509Signer::new();
        let first = signer.serial_number().unwrap();
        let second = signer.serial_number().unwrap();
        assert_ne!(first, second);
        assert_eq!(first.as_bytes().len(), 16);
        assert_eq!(first.as_bytes()[0] & 0x80, 0);
    }

    #[test]
    fn test_rejects_invalid_fixed_serials() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        for serial in [vec![], vec![0x00, 0x00], vec![0x80, 0x01]] {
            let err = X509Signer::deterministic(start, serial).serial_number().unwrap_err();
            assert!(matches!(err, PkiError::SigningError(_)));
        }
    }

    #[test]
    fn test_rejects_foreign_public_key() {
        let key = PrivateKey::ed25519_from_seed(&[8u8; 32]);
        let other = PrivateKey::ed25519_from_seed(&[9u8; 32]).public_key().unwrap();
        let tpl = template(&key, "CN=mismatch", &SubjectAltNames::default());

        let err = X509Signer::new().sign(&tpl, &tpl, &other, &key).unwrap_err();
        assert!(matches!(err, PkiError::SigningError(_)));
    }

    #[test]
    fn test_rejects_overflowing_duration() {
        let key = PrivateKey::ed25519_from_seed(&[10u8; 32]);
        let public = key.public_key().unwrap();
        let mut tpl = template(&key, "CN=overflow", &SubjectAltNames::default());
        tpl.duration = Duration::MAX;

        assert!(X509Signer::new().sign(&tpl, &tpl, &public, &key).is_err());
    }
}
