use crate::algorithm::{HashAlgorithm, Mode};

/// Failures from the remote-signing adapter.
///
/// Translation and negotiation failures are terminal — malformed input or a
/// bad (mode, hash) pairing cannot become valid by retrying. Remote failures
/// are propagated verbatim; retry policy belongs to the transport client.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("unsupported key spec: {0}")]
    UnsupportedKeySpec(String),
    #[error("malformed public key encoding: {0}")]
    MalformedKeyEncoding(String),
    #[error("no signing algorithms negotiable for mode {0}")]
    UnknownSigningMode(Mode),
    #[error("hash {hash} not supported for mode {mode}")]
    UnsupportedHashForMode { mode: Mode, hash: HashAlgorithm },
    #[error("KMS request failed: {0}")]
    RemoteCallFailed(String),
    #[error("KMS response missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_hash_names_mode_and_hash() {
        let error = SignerError::UnsupportedHashForMode {
            mode: Mode::Ecdsa,
            hash: HashAlgorithm::Sha384,
        };
        let message = error.to_string();
        assert!(message.contains("ecdsa"));
        assert!(message.contains("SHA-384"));
    }

    #[test]
    fn unsupported_key_spec_names_spec() {
        let error = SignerError::UnsupportedKeySpec("SYMMETRIC_DEFAULT".into());
        assert!(error.to_string().contains("SYMMETRIC_DEFAULT"));
    }
}
