pub mod error;
pub mod key;
pub mod store;

// Re-export core functionality
pub use error::{KeyError, Result};
pub use key::{Algorithm, PrivateKey, PublicKey};
// Re-export store types
pub use store::{
    KeyResolver, MemorySecretStore, Secret, SecretKeyResolver, SecretStore, TLS_PRIVATE_KEY_KEY,
};
