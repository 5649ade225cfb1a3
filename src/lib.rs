//! # Certwright
//!
//! Self-signed certificate issuance for a certificate request reconciliation pipeline.
//!
//! ## Crates
//!
//! - `certwright_key` - private key material and secret-backed key resolution
//! - `certwright_pki` - CSR parsing, certificate templates and signing
//! - `certwright_issuer` - the self-signed issuance step and its outcome reporting

// Re-export all sub-crates
pub use certwright_issuer;
pub use certwright_key;
pub use certwright_pki;
