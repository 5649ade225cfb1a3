use certwright_key::KeyError;
use thiserror::Error;

/// PKI模块的错误类型
#[derive(Error, Debug)]
pub enum PkiError {
    /// CSR相关错误
    #[error("CSR error: {0}")]
    CsrError(String),

    /// 证书模板生成错误
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// 签名错误
    #[error("Signing error: {0}")]
    SigningError(String),

    /// 解析错误
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 密钥错误
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, PkiError>;
