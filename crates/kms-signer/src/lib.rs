//! Remote signing with AWS KMS keys.
//!
//! A [`RemoteSigner`] holds a KMS key identifier and a fixed signing mode,
//! translates the key's public material into local representations, and
//! turns sign requests into single KMS calls — so SSH-agent and X.509
//! consumers can treat a key that never leaves KMS like any other signer.

pub mod algorithm;
pub mod error;
pub mod kms;
pub mod parse;
pub mod signer;
pub mod x509;

pub use algorithm::{HashAlgorithm, Mode, signing_algorithm};
pub use error::SignerError;
pub use kms::{AwsKms, CreatedKey, KmsClient, PublicKeyReply};
pub use parse::{KeyCurve, KmsPublicKey, parse_public_key};
pub use signer::RemoteSigner;
pub use x509::CertificateSigner;
