//! Key binding checks.

use certwright_key::PublicKey;
use pkcs8::spki::SubjectPublicKeyInfoOwned;

use crate::error::Result;

/// Compare a derived public key with the public key declared in a template.
///
/// Returns `Ok(false)` on a mismatch. An error means the declared key could not
/// be decoded at all (for example an unsupported algorithm); callers treat it
/// like a mismatch but keep the error for diagnostics.
pub fn public_keys_equal(public_key: &PublicKey, declared: &SubjectPublicKeyInfoOwned) -> Result<bool> {
    let declared = PublicKey::from_spki(declared)?;
    Ok(declared == *public_key)
}
