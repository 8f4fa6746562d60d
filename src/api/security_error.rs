use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Token rejected")]
    TokenRejected,

    #[error("Base64 is not canonical")]
    NonCanonicalBase64,

    #[error("Invalid cursor")]
    InvalidCursor,

    #[error("Base64 Error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

pub type SecurityResult<T> = Result<T, SecurityError>;
