//! Translation of KMS public-key replies into usable key material.
//!
//! KMS describes a key with a spec string (`RSA_2048`, `ECC_NIST_P256`, …)
//! and returns the public half as SubjectPublicKeyInfo DER. SSH and X.509
//! consumers each want a different concrete representation, so the
//! translator normalizes to [`KmsPublicKey`] and lets the front-ends encode
//! from there.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::pkcs8::DecodePublicKey;

use crate::error::SignerError;

/// Elliptic curves KMS can hold signing keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCurve {
    NistP256,
    NistP384,
    NistP521,
    Secp256k1,
}

impl std::fmt::Display for KeyCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyCurve::NistP256 => "nistp256",
            KeyCurve::NistP384 => "nistp384",
            KeyCurve::NistP521 => "nistp521",
            KeyCurve::Secp256k1 => "secp256k1",
        })
    }
}

/// Public key material translated from a KMS reply.
///
/// EC points are stored uncompressed SEC1, already validated as on-curve by
/// the matching curve crate's decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmsPublicKey {
    Rsa(rsa::RsaPublicKey),
    Ecdsa { curve: KeyCurve, point: Vec<u8> },
}

impl KmsPublicKey {
    pub fn is_rsa(&self) -> bool {
        matches!(self, KmsPublicKey::Rsa(_))
    }
}

/// Translates a KMS key-spec tag and SPKI DER into key material.
///
/// Pure function of its inputs. Fails with
/// [`SignerError::UnsupportedKeySpec`] for specs outside the signing matrix
/// (symmetric keys, unknown future specs) and
/// [`SignerError::MalformedKeyEncoding`] when the DER does not decode as a
/// public key of the declared type.
pub fn parse_public_key(key_spec: &str, der: &[u8]) -> Result<KmsPublicKey, SignerError> {
    let malformed = |e: &dyn std::fmt::Display| SignerError::MalformedKeyEncoding(e.to_string());

    match key_spec {
        "RSA_2048" | "RSA_3072" | "RSA_4096" => {
            let key = rsa::RsaPublicKey::from_public_key_der(der)
                .map_err(|e| malformed(&e))?;
            Ok(KmsPublicKey::Rsa(key))
        }
        "ECC_NIST_P256" => {
            let key = p256::PublicKey::from_public_key_der(der)
                .map_err(|e| malformed(&e))?;
            Ok(KmsPublicKey::Ecdsa {
                curve: KeyCurve::NistP256,
                point: key.to_encoded_point(false).as_bytes().to_vec(),
            })
        }
        "ECC_NIST_P384" => {
            let key = p384::PublicKey::from_public_key_der(der)
                .map_err(|e| malformed(&e))?;
            Ok(KmsPublicKey::Ecdsa {
                curve: KeyCurve::NistP384,
                point: key.to_encoded_point(false).as_bytes().to_vec(),
            })
        }
        "ECC_NIST_P521" => {
            let key = p521::PublicKey::from_public_key_der(der)
                .map_err(|e| malformed(&e))?;
            Ok(KmsPublicKey::Ecdsa {
                curve: KeyCurve::NistP521,
                point: key.to_encoded_point(false).as_bytes().to_vec(),
            })
        }
        "ECC_SECG_P256K1" => {
            let key = k256::PublicKey::from_public_key_der(der)
                .map_err(|e| malformed(&e))?;
            Ok(KmsPublicKey::Ecdsa {
                curve: KeyCurve::Secp256k1,
                point: key.to_encoded_point(false).as_bytes().to_vec(),
            })
        }
        other => Err(SignerError::UnsupportedKeySpec(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::ChaCha20Rng;
    use rand_chacha::rand_core::SeedableRng;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::traits::PublicKeyParts;
    use sha2::{Digest, Sha256};

    use super::*;

    fn seeded_rng(seed: &str) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(Sha256::digest(seed.as_bytes()).into())
    }

    #[test]
    fn rsa_round_trip_preserves_modulus_and_exponent() {
        let private = rsa::RsaPrivateKey::new(&mut seeded_rng("parse-rsa"), 2048).unwrap();
        let public = private.to_public_key();
        let der = public.to_public_key_der().unwrap();

        let parsed = parse_public_key("RSA_2048", der.as_bytes()).unwrap();
        match parsed {
            KmsPublicKey::Rsa(key) => {
                assert_eq!(key.n(), public.n());
                assert_eq!(key.e(), public.e());
            }
            other => panic!("expected RSA key, got {other:?}"),
        }
    }

    #[test]
    fn p256_key_yields_uncompressed_point() {
        let secret = p256::SecretKey::random(&mut seeded_rng("parse-p256"));
        let der = secret.public_key().to_public_key_der().unwrap();

        let parsed = parse_public_key("ECC_NIST_P256", der.as_bytes()).unwrap();
        match parsed {
            KmsPublicKey::Ecdsa { curve, point } => {
                assert_eq!(curve, KeyCurve::NistP256);
                assert_eq!(point.len(), 65);
                assert_eq!(point[0], 0x04);
            }
            other => panic!("expected EC key, got {other:?}"),
        }
    }

    #[test]
    fn symmetric_spec_is_unsupported() {
        let err = parse_public_key("SYMMETRIC_DEFAULT", &[0x30, 0x00]).unwrap_err();
        assert!(matches!(err, SignerError::UnsupportedKeySpec(spec) if spec == "SYMMETRIC_DEFAULT"));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = parse_public_key("RSA_2048", b"not der at all").unwrap_err();
        assert!(matches!(err, SignerError::MalformedKeyEncoding(_)));
    }

    #[test]
    fn ec_der_under_rsa_spec_is_malformed() {
        let secret = p256::SecretKey::random(&mut seeded_rng("parse-cross"));
        let der = secret.public_key().to_public_key_der().unwrap();
        let err = parse_public_key("RSA_2048", der.as_bytes()).unwrap_err();
        assert!(matches!(err, SignerError::MalformedKeyEncoding(_)));
    }
}
