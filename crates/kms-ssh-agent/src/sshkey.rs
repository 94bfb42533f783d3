//! SSH wire encodings for KMS-held keys and their signatures.
//!
//! The agent advertises keys as SSH wire blobs and must hand back
//! signatures in the SSH signature structure. RSA is a straight re-labeling
//! of the KMS output; ECDSA needs the DER `ECDSA-Sig-Value` from KMS
//! re-encoded as the `mpint r || mpint s` payload SSH expects.

use der::Decode;
use der::asn1::UintRef;
use kms_signer::{HashAlgorithm, KeyCurve, KmsPublicKey};
use rsa::traits::PublicKeyParts;
use sha2::{Digest, Sha256, Sha384, Sha512};
use ssh_encoding::Encode;
use ssh_key::public::{EcdsaPublicKey, KeyData, RsaPublicKey};
use ssh_key::{Algorithm, EcdsaCurve, HashAlg, Mpint, Signature};

use crate::error::AgentOpError;

/// Converts translated KMS key material into an SSH public key.
///
/// secp256k1 keys fail here: SSH defines no algorithm for that curve.
pub fn key_data(key: &KmsPublicKey) -> Result<KeyData, AgentOpError> {
    match key {
        KmsPublicKey::Rsa(rsa) => {
            let e = Mpint::from_positive_bytes(&rsa.e().to_bytes_be())?;
            let n = Mpint::from_positive_bytes(&rsa.n().to_bytes_be())?;
            Ok(KeyData::Rsa(RsaPublicKey { e, n }))
        }
        KmsPublicKey::Ecdsa { curve, point } => {
            let declared = match curve {
                KeyCurve::NistP256 => EcdsaCurve::NistP256,
                KeyCurve::NistP384 => EcdsaCurve::NistP384,
                KeyCurve::NistP521 => EcdsaCurve::NistP521,
                // Rejected before decoding: a secp256k1 point is the same
                // length as a P-256 one and would be inferred as such.
                KeyCurve::Secp256k1 => {
                    return Err(AgentOpError::UnsupportedKeyType(curve.to_string()));
                }
            };
            let key = EcdsaPublicKey::from_sec1_bytes(point)?;
            if key.curve() != declared {
                return Err(AgentOpError::CurveMismatch {
                    declared: declared.to_string(),
                    inferred: key.curve().to_string(),
                });
            }
            Ok(KeyData::Ecdsa(key))
        }
    }
}

/// The hash an SSH signature uses for this key when the client requests no
/// specific algorithm. ECDSA hashes are fixed by the curve; for RSA this
/// agent signs rsa-sha2-256 (the legacy SHA-1 `ssh-rsa` format has no KMS
/// algorithm and is rejected by current OpenSSH anyway).
pub fn default_hash(key: &KeyData) -> Result<HashAlgorithm, AgentOpError> {
    match key {
        KeyData::Rsa(_) => Ok(HashAlgorithm::Sha256),
        KeyData::Ecdsa(ecdsa) => Ok(match ecdsa.curve() {
            EcdsaCurve::NistP256 => HashAlgorithm::Sha256,
            EcdsaCurve::NistP384 => HashAlgorithm::Sha384,
            EcdsaCurve::NistP521 => HashAlgorithm::Sha512,
        }),
        other => Err(AgentOpError::UnsupportedKeyType(
            other.algorithm().to_string(),
        )),
    }
}

/// Digests the message to be signed with the hash the signature will name.
pub fn digest_message(hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, AgentOpError> {
    match hash {
        HashAlgorithm::Sha256 => Ok(Sha256::digest(data).to_vec()),
        HashAlgorithm::Sha384 => Ok(Sha384::digest(data).to_vec()),
        HashAlgorithm::Sha512 => Ok(Sha512::digest(data).to_vec()),
        HashAlgorithm::Sha1 => Err(AgentOpError::UnsupportedDigest(hash)),
    }
}

/// ECDSA-Sig-Value ::= SEQUENCE { r INTEGER, s INTEGER }
#[derive(der::Sequence)]
struct EcdsaSigValue<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// Wraps raw KMS signature bytes in the SSH signature structure for `key`.
pub fn ssh_signature(
    key: &KeyData,
    hash: HashAlgorithm,
    raw: &[u8],
) -> Result<Signature, AgentOpError> {
    match key {
        KeyData::Rsa(_) => {
            let hash = match hash {
                HashAlgorithm::Sha256 => HashAlg::Sha256,
                HashAlgorithm::Sha512 => HashAlg::Sha512,
                other => return Err(AgentOpError::UnsupportedDigest(other)),
            };
            Ok(Signature::new(
                Algorithm::Rsa { hash: Some(hash) },
                raw.to_vec(),
            )?)
        }
        KeyData::Ecdsa(ecdsa) => {
            let sig = EcdsaSigValue::from_der(raw)
                .map_err(|e| AgentOpError::MalformedSignature(e.to_string()))?;
            let mut data = Vec::new();
            Mpint::from_positive_bytes(sig.r.as_bytes())?.encode(&mut data)?;
            Mpint::from_positive_bytes(sig.s.as_bytes())?.encode(&mut data)?;
            Ok(Signature::new(
                Algorithm::Ecdsa {
                    curve: ecdsa.curve(),
                },
                data,
            )?)
        }
        other => Err(AgentOpError::UnsupportedKeyType(
            other.algorithm().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p256_key_data() -> KeyData {
        // Tag + length are all from_sec1_bytes checks; any 65-byte point
        // starting 0x04 stands in for a real one.
        let mut point = [0x04u8; 65];
        point[1..].fill(0x11);
        KeyData::Ecdsa(EcdsaPublicKey::from_sec1_bytes(&point).unwrap())
    }

    #[test]
    fn nist_point_converts_with_its_declared_curve() {
        let mut point = vec![0x04u8; 65];
        point[1..].fill(0x22);
        let key = key_data(&KmsPublicKey::Ecdsa {
            curve: KeyCurve::NistP256,
            point,
        })
        .unwrap();
        match key {
            KeyData::Ecdsa(ecdsa) => assert_eq!(ecdsa.curve(), EcdsaCurve::NistP256),
            other => panic!("expected ECDSA key data, got {other:?}"),
        }
    }

    #[test]
    fn secp256k1_material_has_no_ssh_algorithm() {
        let err = key_data(&KmsPublicKey::Ecdsa {
            curve: KeyCurve::Secp256k1,
            point: vec![0x04; 65],
        })
        .unwrap_err();
        assert!(matches!(err, AgentOpError::UnsupportedKeyType(s) if s == "secp256k1"));
    }

    #[test]
    fn declared_curve_must_match_the_point() {
        // A 65-byte point decodes as P-256, not the declared P-384.
        let err = key_data(&KmsPublicKey::Ecdsa {
            curve: KeyCurve::NistP384,
            point: vec![0x04; 65],
        })
        .unwrap_err();
        assert!(matches!(err, AgentOpError::CurveMismatch { .. }));
    }

    #[test]
    fn ecdsa_der_is_reencoded_as_ssh_mpints() {
        // SEQUENCE { INTEGER 0x01, INTEGER 0x0080 }
        let der = [0x30, 0x07, 0x02, 0x01, 0x01, 0x02, 0x02, 0x00, 0x80];
        let sig = ssh_signature(&p256_key_data(), HashAlgorithm::Sha256, &der).unwrap();

        assert_eq!(
            sig.algorithm(),
            Algorithm::Ecdsa {
                curve: EcdsaCurve::NistP256
            }
        );
        // mpint(1) then mpint(0x80), which re-gains its sign byte.
        assert_eq!(
            sig.as_bytes(),
            [0, 0, 0, 1, 0x01, 0, 0, 0, 2, 0x00, 0x80]
        );
    }

    #[test]
    fn garbage_ecdsa_signature_is_rejected() {
        let err =
            ssh_signature(&p256_key_data(), HashAlgorithm::Sha256, b"junk").unwrap_err();
        assert!(matches!(err, AgentOpError::MalformedSignature(_)));
    }

    #[test]
    fn rsa_signature_passes_bytes_through() {
        let e = Mpint::from_positive_bytes(&[0x01, 0x00, 0x01]).unwrap();
        let n = Mpint::from_positive_bytes(&[0xAB; 256]).unwrap();
        let key = KeyData::Rsa(RsaPublicKey { e, n });

        let sig = ssh_signature(&key, HashAlgorithm::Sha512, &[0x5a; 256]).unwrap();
        assert_eq!(
            sig.algorithm(),
            Algorithm::Rsa {
                hash: Some(HashAlg::Sha512)
            }
        );
        assert_eq!(sig.as_bytes(), &[0x5a; 256][..]);
    }

    #[test]
    fn sha384_has_no_rsa_signature_format() {
        let e = Mpint::from_positive_bytes(&[0x01, 0x00, 0x01]).unwrap();
        let n = Mpint::from_positive_bytes(&[0xAB; 256]).unwrap();
        let key = KeyData::Rsa(RsaPublicKey { e, n });

        let err = ssh_signature(&key, HashAlgorithm::Sha384, &[0x5a; 256]).unwrap_err();
        assert!(matches!(err, AgentOpError::UnsupportedDigest(HashAlgorithm::Sha384)));
    }
}
