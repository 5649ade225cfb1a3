//! Certificate Signing Request (CSR) module
//!
//! Parses PKCS#10 requests carried by certificate requests, verifies their
//! proof of possession and exposes the requested subject, public key and
//! extensions. Requests can also be built and signed from a [`PrivateKey`].

use certwright_key::{PrivateKey, PublicKey};
use const_oid::db::rfc5912;
use der::{
    asn1::{BitString, SetOfVec},
    Any, Decode, Encode,
};
use pkcs8::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::{
    attr::Attribute,
    ext::Extension,
    name::Name,
    request::{CertReq, CertReqInfo, Version},
};

use crate::{
    error::{PkiError, Result},
    template::SubjectAltNames,
};

const CSR_PEM_TAGS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// A parsed PKCS#10 certificate signing request
#[derive(Debug, Clone)]
pub struct Csr {
    inner: CertReq,
}

/// Build an unsigned CertReqInfo from subject, public key and requested extensions
///
/// An empty `extensions` list produces a request without an extension request attribute.
pub fn build_unsigned(
    subject: Name,
    public_key: &PublicKey,
    extensions: Vec<Extension>,
) -> Result<CertReqInfo> {
    let public_key = public_key.to_spki()?;

    let attributes = if extensions.is_empty() {
        SetOfVec::new()
    } else {
        let value = Any::encode_from(&extensions)
            .map_err(|e| PkiError::CsrError(format!("Failed to encode extensions: {}", e)))?;
        let values = SetOfVec::try_from(vec![value])
            .map_err(|e| PkiError::CsrError(format!("Failed to build attribute: {}", e)))?;
        let attribute = Attribute {
            oid: rfc5912::ID_EXTENSION_REQ,
            values,
        };
        SetOfVec::try_from(vec![attribute])
            .map_err(|e| PkiError::CsrError(format!("Failed to build attributes: {}", e)))?
    };

    Ok(CertReqInfo {
        version: Version::V1,
        subject,
        public_key,
        attributes,
    })
}

/// Create a signed CSR requesting the given subject alternative names
pub fn create_csr(key: &PrivateKey, subject: Name, sans: &SubjectAltNames) -> Result<Csr> {
    let extensions = if sans.is_empty() {
        Vec::new()
    } else {
        vec![sans.to_extension()?]
    };
    create_csr_with_extensions(key, subject, extensions)
}

/// Create a signed CSR with an arbitrary extension request
pub fn create_csr_with_extensions(
    key: &PrivateKey,
    subject: Name,
    extensions: Vec<Extension>,
) -> Result<Csr> {
    let public_key = key.public_key()?;
    let info = build_unsigned(subject, &public_key, extensions)?;

    let info_der = info
        .to_der()
        .map_err(|e| PkiError::CsrError(format!("Failed to encode CertReqInfo: {}", e)))?;
    let signature = key.sign(&info_der)?;

    Csr::assemble(info, key.signature_algorithm(), &signature)
}

impl Csr {
    /// Assemble a complete CSR from CertReqInfo and signature
    pub fn assemble(
        info: CertReqInfo,
        algorithm: AlgorithmIdentifierOwned,
        signature: &[u8],
    ) -> Result<Self> {
        let inner = CertReq {
            info,
            algorithm,
            signature: BitString::from_bytes(signature)
                .map_err(|e| PkiError::CsrError(format!("Failed to create signature: {}", e)))?,
        };

        Ok(Self { inner })
    }

    /// Parse CSR from PEM format
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self> {
        let block = pem::parse(pem)
            .map_err(|e| PkiError::CsrError(format!("Failed to decode CSR PEM: {}", e)))?;

        if !CSR_PEM_TAGS.contains(&block.tag()) {
            return Err(PkiError::CsrError(format!(
                "Invalid PEM tag {:?}, expected CERTIFICATE REQUEST",
                block.tag()
            )));
        }

        Self::from_der(block.contents())
    }

    /// Parse CSR from DER format
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertReq::from_der(der)
            .map_err(|e| PkiError::CsrError(format!("Failed to parse DER: {}", e)))?;

        Ok(Self { inner })
    }

    /// Export CSR to PEM format
    pub fn to_pem(&self) -> Result<String> {
        let der = self.to_der()?;
        Ok(pem::encode(&pem::Pem::new("CERTIFICATE REQUEST", der)))
    }

    /// Export CSR to DER format
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| PkiError::CsrError(format!("Failed to encode DER: {}", e)))
    }

    /// Requested subject distinguished name
    pub fn subject(&self) -> &Name {
        &self.inner.info.subject
    }

    /// Requested public key as SubjectPublicKeyInfo
    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.info.public_key
    }

    /// Decoded requested public key
    pub fn public_key(&self) -> Result<PublicKey> {
        Ok(PublicKey::from_spki(self.public_key_info())?)
    }

    /// Extensions carried in the extension request attribute(s)
    pub fn requested_extensions(&self) -> Result<Vec<Extension>> {
        let mut extensions = Vec::new();

        for attribute in self.inner.info.attributes.iter() {
            if attribute.oid != rfc5912::ID_EXTENSION_REQ {
                continue;
            }
            for value in attribute.values.iter() {
                let der = value.to_der().map_err(|e| {
                    PkiError::CsrError(format!("Failed to encode extension request: {}", e))
                })?;
                let requested = Vec::<Extension>::from_der(&der).map_err(|e| {
                    PkiError::CsrError(format!("Failed to parse extension request: {}", e))
                })?;
                extensions.extend(requested);
            }
        }

        Ok(extensions)
    }

    /// Verify the CSR self-signature against its own public key
    pub fn verify_signature(&self) -> Result<()> {
        let public_key = self.public_key()?;

        let expected = match public_key {
            PublicKey::Rsa(_) => rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            PublicKey::P256(_) => rfc5912::ECDSA_WITH_SHA_256,
            PublicKey::P384(_) => rfc5912::ECDSA_WITH_SHA_384,
            PublicKey::Ed25519(_) => const_oid::db::rfc8410::ID_ED_25519,
        };
        if self.inner.algorithm.oid != expected {
            return Err(PkiError::CsrError(format!(
                "Unsupported signature algorithm {} for {} key",
                self.inner.algorithm.oid,
                public_key.algorithm()
            )));
        }

        let info_der = self.inner.info.to_der().map_err(|e| {
            PkiError::CsrError(format!("Failed to encode info for verification: {}", e))
        })?;
        let signature = self
            .inner
            .signature
            .as_bytes()
            .ok_or_else(|| PkiError::CsrError("Signature is not octet aligned".to_string()))?;

        public_key
            .verify(&info_der, signature)
            .map_err(|e| PkiError::CsrError(format!("CSR signature check failed: {}", e)))
    }
}
