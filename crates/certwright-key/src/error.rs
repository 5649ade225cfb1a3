use thiserror::Error;

/// Errors raised while loading or resolving private key material.
///
/// Resolution callers branch on the variant: a missing secret and malformed key
/// data are expected to heal on a later pass, anything else is treated as
/// transient infrastructure trouble.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The referenced secret does not exist
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The secret exists but its key data cannot be used
    #[error("invalid key data: {0}")]
    InvalidData(String),

    /// The backing secret store failed
    #[error("secret store error: {0}")]
    Store(String),

    /// Key encoding failed
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl KeyError {
    /// Secret not found error
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        KeyError::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Malformed key data error
    pub fn invalid_data(msg: impl std::fmt::Display) -> Self {
        KeyError::InvalidData(msg.to_string())
    }

    /// Store lock error
    pub fn lock_error(msg: impl std::fmt::Display) -> Self {
        KeyError::Store(format!("Lock error: {}", msg))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KeyError::NotFound { .. })
    }

    pub fn is_invalid_data(&self) -> bool {
        matches!(self, KeyError::InvalidData(_))
    }
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, KeyError>;
