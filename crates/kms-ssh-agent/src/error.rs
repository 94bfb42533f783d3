use kms_signer::{HashAlgorithm, SignerError};

/// Protocol-level failures returned to the calling SSH client.
///
/// Every variant is a typed, recoverable error: the serving loop converts
/// them into agent failure responses, so one odd request can never unwind
/// the process that other connections share.
#[derive(Debug, thiserror::Error)]
pub enum AgentOpError {
    #[error("no identity matches the requested public key")]
    IdentityNotFound,
    #[error("unsupported signature flags: {0:#06x}")]
    UnsupportedSignatureFlags(u32),
    #[error("operation not supported by this agent: {0}")]
    NotImplemented(&'static str),
    #[error("key type has no SSH algorithm: {0}")]
    UnsupportedKeyType(String),
    #[error("key declared as {declared} but its point decodes as {inferred}")]
    CurveMismatch { declared: String, inferred: String },
    #[error("no SSH signature format uses {0}")]
    UnsupportedDigest(HashAlgorithm),
    #[error("remote signature is not valid DER: {0}")]
    MalformedSignature(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Key(#[from] ssh_key::Error),
    #[error(transparent)]
    Encoding(#[from] ssh_encoding::Error),
}
