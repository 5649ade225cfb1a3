//! Certwright PKI - certificate templates and self-signed issuance
//!
//! Turns a PKCS#10 certificate request into a canonical certificate template,
//! checks that the template's public key is bound to a given private key, and
//! signs the template with a pluggable signing strategy.

pub mod binding;
pub mod cert;
pub mod csr;
pub mod error;
pub mod signer;
pub mod template;
pub mod usage;

// 重新导出常用类型
pub use binding::public_keys_equal;
pub use cert::{certificate_info, export_certificate, parse_certificate, CertificateInfo};
pub use csr::{build_unsigned, create_csr, create_csr_with_extensions, Csr};
pub use error::{PkiError, Result};
pub use signer::{
    CertificateSigner, SerialNumberSource, SignedCertificate, ValidityAnchor, X509Signer,
};
pub use template::{
    CertificateTemplate, SubjectAltNames, TemplateBuilder, DEFAULT_CERTIFICATE_DURATION,
};
pub use usage::{KeyUsage, DEFAULT_KEY_USAGES};
