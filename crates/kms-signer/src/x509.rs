//! Certificate-signing adapter.
//!
//! X.509 builders consume a synchronous signer implementing the `signature`
//! and `spki` traits. [`CertificateSigner`] satisfies that contract on top
//! of a [`RemoteSigner`], bridging to the async core by blocking on a held
//! runtime handle (certificate issuance is a one-shot CLI flow, never run
//! inside the agent's executor).
//!
//! Only RSA keys in PKCS#1 v1.5 mode with SHA-256 are supported — the shape
//! the CA workflows use.

use rsa::pkcs1v15::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use signature::{Keypair, Signer};
use spki::der::asn1::AnyRef;
use spki::{AlgorithmIdentifierOwned, DynSignatureAlgorithmIdentifier};
use tokio::runtime::Handle;

use crate::algorithm::{HashAlgorithm, Mode};
use crate::error::SignerError;
use crate::parse::KmsPublicKey;
use crate::signer::RemoteSigner;

const SHA_256_WITH_RSA_ENCRYPTION: spki::ObjectIdentifier = const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION;

/// A [`RemoteSigner`] expressed through the sync signing traits X.509
/// certificate builders expect.
pub struct CertificateSigner {
    signer: RemoteSigner,
    handle: Handle,
    public_key: rsa::RsaPublicKey,
}

impl CertificateSigner {
    /// Pins the remote key's public half and wraps the signer.
    ///
    /// Fails if the remote key is not RSA or the signer's mode is anything
    /// but PKCS#1 v1.5 — the only signature structure issued here.
    pub async fn new(signer: RemoteSigner, handle: Handle) -> Result<Self, SignerError> {
        if signer.mode() != Mode::Pkcs1v15 {
            return Err(SignerError::UnknownSigningMode(signer.mode()));
        }
        let public_key = match signer.public_key().await? {
            KmsPublicKey::Rsa(key) => key.clone(),
            KmsPublicKey::Ecdsa { curve, .. } => {
                return Err(SignerError::UnsupportedKeySpec(format!(
                    "EC key ({curve}) cannot back an RSA certificate signer"
                )));
            }
        };
        Ok(Self {
            signer,
            handle,
            public_key,
        })
    }

    pub fn key_id(&self) -> &str {
        self.signer.key_id()
    }

    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public_key
    }
}

impl Keypair for CertificateSigner {
    type VerifyingKey = VerifyingKey<Sha256>;

    fn verifying_key(&self) -> Self::VerifyingKey {
        VerifyingKey::new(self.public_key.clone())
    }
}

impl DynSignatureAlgorithmIdentifier for CertificateSigner {
    fn signature_algorithm_identifier(&self) -> spki::Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: SHA_256_WITH_RSA_ENCRYPTION,
            parameters: Some(AnyRef::NULL.into()),
        })
    }
}

impl Signer<Signature> for CertificateSigner {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        let digest = Sha256::digest(msg);
        let raw = self
            .handle
            .block_on(self.signer.sign_digest(&digest, HashAlgorithm::Sha256))
            .map_err(signature::Error::from_source)?;
        Signature::try_from(raw.as_slice())
    }
}
