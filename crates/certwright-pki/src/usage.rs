//! Requested certificate usages.
//!
//! A request names its usages with the strings used by certificate request
//! resources (`"digital signature"`, `"server auth"`, ...). Some map onto the
//! key usage extension, the rest onto the extended key usage extension.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Usages applied when a request names none
pub const DEFAULT_KEY_USAGES: [KeyUsage; 2] = [KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment];

/// A requested certificate usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyUsage {
    #[serde(rename = "signing")]
    Signing,
    #[serde(rename = "digital signature")]
    DigitalSignature,
    #[serde(rename = "content commitment")]
    ContentCommitment,
    #[serde(rename = "key encipherment")]
    KeyEncipherment,
    #[serde(rename = "key agreement")]
    KeyAgreement,
    #[serde(rename = "data encipherment")]
    DataEncipherment,
    #[serde(rename = "cert sign")]
    CertSign,
    #[serde(rename = "crl sign")]
    CrlSign,
    #[serde(rename = "encipher only")]
    EncipherOnly,
    #[serde(rename = "decipher only")]
    DecipherOnly,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "server auth")]
    ServerAuth,
    #[serde(rename = "client auth")]
    ClientAuth,
    #[serde(rename = "code signing")]
    CodeSigning,
    #[serde(rename = "email protection")]
    EmailProtection,
    #[serde(rename = "s/mime")]
    SMime,
    #[serde(rename = "ipsec end system")]
    IpsecEndSystem,
    #[serde(rename = "ipsec tunnel")]
    IpsecTunnel,
    #[serde(rename = "ipsec user")]
    IpsecUser,
    #[serde(rename = "timestamping")]
    Timestamping,
    #[serde(rename = "ocsp signing")]
    OcspSigning,
}

impl KeyUsage {
    /// Whether this usage belongs in the extended key usage extension
    pub fn is_extended(&self) -> bool {
        !matches!(
            self,
            KeyUsage::Signing
                | KeyUsage::DigitalSignature
                | KeyUsage::ContentCommitment
                | KeyUsage::KeyEncipherment
                | KeyUsage::KeyAgreement
                | KeyUsage::DataEncipherment
                | KeyUsage::CertSign
                | KeyUsage::CrlSign
                | KeyUsage::EncipherOnly
                | KeyUsage::DecipherOnly
        )
    }

    /// Collapse aliases onto the usage they stand for
    pub fn canonical(self) -> Self {
        match self {
            KeyUsage::Signing => KeyUsage::DigitalSignature,
            KeyUsage::SMime => KeyUsage::EmailProtection,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Signing => "signing",
            KeyUsage::DigitalSignature => "digital signature",
            KeyUsage::ContentCommitment => "content commitment",
            KeyUsage::KeyEncipherment => "key encipherment",
            KeyUsage::KeyAgreement => "key agreement",
            KeyUsage::DataEncipherment => "data encipherment",
            KeyUsage::CertSign => "cert sign",
            KeyUsage::CrlSign => "crl sign",
            KeyUsage::EncipherOnly => "encipher only",
            KeyUsage::DecipherOnly => "decipher only",
            KeyUsage::Any => "any",
            KeyUsage::ServerAuth => "server auth",
            KeyUsage::ClientAuth => "client auth",
            KeyUsage::CodeSigning => "code signing",
            KeyUsage::EmailProtection => "email protection",
            KeyUsage::SMime => "s/mime",
            KeyUsage::IpsecEndSystem => "ipsec end system",
            KeyUsage::IpsecTunnel => "ipsec tunnel",
            KeyUsage::IpsecUser => "ipsec user",
            KeyUsage::Timestamping => "timestamping",
            KeyUsage::OcspSigning => "ocsp signing",
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split usages into (key usages, extended key usages), canonicalised and
/// de-duplicated. `is_ca` adds `cert sign`.
pub(crate) fn split_usages(usages: &[KeyUsage], is_ca: bool) -> (Vec<KeyUsage>, Vec<KeyUsage>) {
    let mut all: Vec<KeyUsage> = usages.iter().map(|u| u.canonical()).collect();
    if is_ca {
        all.push(KeyUsage::CertSign);
    }
    all.sort();
    all.dedup();

    all.into_iter().partition(|u| !u.is_extended())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_names_deserialize() {
        let usages: Vec<KeyUsage> =
            serde_json::from_str(r#"["digital signature", "server auth", "s/mime"]"#).unwrap();
        assert_eq!(
            usages,
            vec![KeyUsage::DigitalSignature, KeyUsage::ServerAuth, KeyUsage::SMime]
        );
        assert_eq!(KeyUsage::SMime.to_string(), "s/mime");
    }

    #[test]
    fn test_split_usages() {
        let (key, ext) = split_usages(
            &[KeyUsage::Signing, KeyUsage::DigitalSignature, KeyUsage::ServerAuth, KeyUsage::SMime],
            false,
        );
        assert_eq!(key, vec![KeyUsage::DigitalSignature]);
        assert_eq!(ext, vec![KeyUsage::ServerAuth, KeyUsage::EmailProtection]);
    }

    #[test]
    fn test_ca_adds_cert_sign() {
        let (key, ext) = split_usages(&DEFAULT_KEY_USAGES, true);
        assert!(key.contains(&KeyUsage::CertSign));
        assert!(key.contains(&KeyUsage::KeyEncipherment));
        assert!(ext.is_empty());
    }
}
