use const_oid::db::rfc5280;
use der::Decode;
use time::OffsetDateTime;
use x509_cert::{ext::pkix::BasicConstraints, time::Time, Certificate};

use crate::{
    error::{PkiError, Result},
    template::{crl_distribution_point_uris, SubjectAltNames},
};

const CERTIFICATE_PEM_TAG: &str = "CERTIFICATE";

/// Summary of an issued certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// 序列号 (hex)
    pub serial_number: String,
    /// Subject DN in RFC 4514 form
    pub subject: String,
    /// Issuer DN in RFC 4514 form
    pub issuer: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub subject_alt_names: SubjectAltNames,
    /// 是否为CA证书
    pub is_ca: bool,
    pub crl_distribution_points: Vec<String>,
}

impl CertificateInfo {
    /// Issuer and subject carry the same DN
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

/// 解析证书内容
///
/// Accepts DER or PEM (`CERTIFICATE` tag).
pub fn parse_certificate(cert_data: &[u8]) -> Result<Certificate> {
    let der_data = if cert_data.starts_with(b"-----BEGIN") {
        let block = pem::parse(cert_data)
            .map_err(|e| PkiError::ParseError(format!("Failed to parse PEM: {e}")))?;
        if block.tag() != CERTIFICATE_PEM_TAG {
            return Err(PkiError::ParseError(format!(
                "Invalid PEM tag {:?}, expected {CERTIFICATE_PEM_TAG}",
                block.tag()
            )));
        }
        block.into_contents()
    } else {
        cert_data.to_vec()
    };

    Certificate::from_der(&der_data)
        .map_err(|e| PkiError::ParseError(format!("Failed to parse DER: {e}")))
}

/// 导出证书为 PEM
pub fn export_certificate(der_data: &[u8]) -> Vec<u8> {
    let pem = pem::Pem::new(CERTIFICATE_PEM_TAG, der_data.to_vec());
    pem::encode(&pem).into_bytes()
}

/// Extract a summary of the certificate fields callers inspect
pub fn certificate_info(cert: &Certificate) -> Result<CertificateInfo> {
    let tbs = &cert.tbs_certificate;
    let extensions = tbs.extensions.clone().unwrap_or_default();

    let mut is_ca = false;
    for ext in extensions
        .iter()
        .filter(|ext| ext.extn_id == rfc5280::ID_CE_BASIC_CONSTRAINTS)
    {
        let constraints = BasicConstraints::from_der(ext.extn_value.as_bytes())
            .map_err(|e| PkiError::ParseError(format!("Failed to parse basic constraints: {e}")))?;
        is_ca = constraints.ca;
    }

    Ok(CertificateInfo {
        serial_number: hex::encode(tbs.serial_number.as_bytes()),
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        not_before: parse_time(&tbs.validity.not_before)?,
        not_after: parse_time(&tbs.validity.not_after)?,
        subject_alt_names: SubjectAltNames::from_extensions(&extensions)?,
        is_ca,
        crl_distribution_points: crl_distribution_point_uris(&extensions)?,
    })
}

fn parse_time(time: &Time) -> Result<OffsetDateTime> {
    let secs = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|e| PkiError::ParseError(format!("Certificate time out of range: {e}")))?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| PkiError::ParseError(format!("Certificate time out of range: {e}")))
}
