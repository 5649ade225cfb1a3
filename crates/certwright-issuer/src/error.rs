use certwright_key::KeyError;
use certwright_pki::PkiError;
use thiserror::Error;

/// 签发流程的错误类型
#[derive(Error, Debug)]
pub enum IssuerError {
    /// 请求未引用私钥
    #[error("secret name missing")]
    MissingSecretName,

    /// 密钥解析错误
    #[error(transparent)]
    Key(#[from] KeyError),

    /// 模板或签名错误
    #[error(transparent)]
    Pki(#[from] PkiError),

    #[error("request not signed by referenced private key")]
    KeyMismatch,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, IssuerError>;
