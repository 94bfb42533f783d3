//! Signing-algorithm negotiation.
//!
//! KMS identifies a signature scheme by a single string combining the
//! padding/structure mode and the digest. Consumers hold those two halves
//! separately — a signer is constructed with a fixed [`Mode`], while the hash
//! arrives per call — so the table here joins them back together.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::SignerError;

/// Signature padding/structure scheme, fixed per signer at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// RSASSA PKCS#1 v1.5.
    Pkcs1v15,
    /// RSASSA-PSS.
    Pss,
    /// ECDSA over the key's curve.
    Ecdsa,
    /// Generic RSA with no padding choice. Carries no table entries; a
    /// signer must be constructed with an explicit padding mode instead.
    Rsa,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Pkcs1v15 => "pkcs1v15",
            Mode::Pss => "pss",
            Mode::Ecdsa => "ecdsa",
            Mode::Rsa => "rsa",
        })
    }
}

/// Digest function for a signature operation. Only these three ever have
/// table entries; anything else fails negotiation regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// Legacy digest kept in the vocabulary for callers (the original
    /// `ssh-rsa` signature format uses it) but never present in the table.
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        })
    }
}

static ALGORITHMS: Lazy<HashMap<Mode, HashMap<HashAlgorithm, &'static str>>> =
    Lazy::new(|| {
        HashMap::from([
            (
                Mode::Pkcs1v15,
                HashMap::from([
                    (HashAlgorithm::Sha256, "RSASSA_PKCS1_V1_5_SHA_256"),
                    (HashAlgorithm::Sha384, "RSASSA_PKCS1_V1_5_SHA_384"),
                    (HashAlgorithm::Sha512, "RSASSA_PKCS1_V1_5_SHA_512"),
                ]),
            ),
            (
                Mode::Pss,
                HashMap::from([
                    (HashAlgorithm::Sha256, "RSASSA_PSS_SHA_256"),
                    (HashAlgorithm::Sha384, "RSASSA_PSS_SHA_384"),
                    (HashAlgorithm::Sha512, "RSASSA_PSS_SHA_512"),
                ]),
            ),
            (
                Mode::Ecdsa,
                HashMap::from([
                    (HashAlgorithm::Sha256, "ECDSA_SHA_256"),
                    (HashAlgorithm::Sha384, "ECDSA_SHA_384"),
                    (HashAlgorithm::Sha512, "ECDSA_SHA_512"),
                ]),
            ),
        ])
    });

/// Resolves the KMS signing-algorithm identifier for a (mode, hash) pair.
pub fn signing_algorithm(
    mode: Mode,
    hash: HashAlgorithm,
) -> Result<&'static str, SignerError> {
    let by_hash = ALGORITHMS
        .get(&mode)
        .ok_or(SignerError::UnknownSigningMode(mode))?;
    by_hash
        .get(&hash)
        .copied()
        .ok_or(SignerError::UnsupportedHashForMode { mode, hash })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [Mode; 3] = [Mode::Pkcs1v15, Mode::Pss, Mode::Ecdsa];
    const HASHES: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    #[test]
    fn every_supported_pair_has_a_distinct_identifier() {
        let mut seen = std::collections::HashSet::new();
        for mode in MODES {
            for hash in HASHES {
                let id = signing_algorithm(mode, hash).unwrap();
                assert!(!id.is_empty());
                assert!(seen.insert(id), "duplicate identifier {id}");
            }
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn pkcs1v15_sha256_resolves_to_kms_identifier() {
        assert_eq!(
            signing_algorithm(Mode::Pkcs1v15, HashAlgorithm::Sha256).unwrap(),
            "RSASSA_PKCS1_V1_5_SHA_256"
        );
    }

    #[test]
    fn sha1_is_rejected_for_every_mode() {
        for mode in MODES {
            let err = signing_algorithm(mode, HashAlgorithm::Sha1).unwrap_err();
            assert!(matches!(
                err,
                SignerError::UnsupportedHashForMode { hash: HashAlgorithm::Sha1, .. }
            ));
        }
    }

    #[test]
    fn generic_rsa_mode_never_negotiates() {
        for hash in HASHES {
            let err = signing_algorithm(Mode::Rsa, hash).unwrap_err();
            assert!(matches!(err, SignerError::UnknownSigningMode(Mode::Rsa)));
        }
    }
}
