//! The SSH identity facade: an ordered set of remote signers presented
//! through the identity-listing/signing contract an SSH agent engine
//! consumes.

use std::sync::Arc;

use kms_signer::{HashAlgorithm, RemoteSigner};
use ssh_key::PublicKey;
use ssh_key::public::KeyData;
use tracing::debug;

use crate::error::AgentOpError;
use crate::sshkey;

/// `SSH_AGENT_RSA_SHA2_256` signature-request flag (draft-miller-ssh-agent).
pub const RSA_SHA2_256: u32 = 0x02;
/// `SSH_AGENT_RSA_SHA2_512` signature-request flag.
pub const RSA_SHA2_512: u32 = 0x04;

/// Facade over an ordered, immutable sequence of [`RemoteSigner`]s.
///
/// Insertion order is enumeration and lookup order. Clones share the
/// underlying signers (and their public-key caches), which is what lets the
/// protocol engine clone one facade per connection.
#[derive(Clone)]
pub struct KmsAgent {
    signers: Arc<[RemoteSigner]>,
}

impl KmsAgent {
    pub fn new(signers: Vec<RemoteSigner>) -> Self {
        Self {
            signers: signers.into(),
        }
    }

    /// All identities, in order: SSH public key with the KMS key identifier
    /// as its comment. Fail-fast — the first signer whose key cannot be
    /// retrieved or encoded aborts the listing with that error.
    pub async fn list_identities(&self) -> Result<Vec<PublicKey>, AgentOpError> {
        let mut identities = Vec::with_capacity(self.signers.len());
        for signer in self.signers.iter() {
            let material = signer.public_key().await?;
            let data = sshkey::key_data(material)?;
            identities.push(PublicKey::new(data, signer.key_id()));
        }
        debug!(count = identities.len(), "listed identities");
        Ok(identities)
    }

    /// Signs `data` with the first signer whose SSH wire key equals
    /// `pubkey`, using the key type's default hash.
    pub async fn sign_with_key(
        &self,
        pubkey: &KeyData,
        data: &[u8],
    ) -> Result<ssh_key::Signature, AgentOpError> {
        let (signer, key) = self.find_signer(pubkey).await?;
        let hash = sshkey::default_hash(&key)?;
        self.sign(signer, &key, hash, data).await
    }

    /// Signs `data` with the matching signer using the hash the signature
    /// flags demand: `RSA_SHA2_256` or `RSA_SHA2_512`, nothing else. The
    /// flags are RSA-specific, so a non-RSA identity cannot honor them.
    /// Matching happens before flag validation, so an unknown key reports
    /// `IdentityNotFound` regardless of the flags it arrived with.
    pub async fn sign_with_flags(
        &self,
        pubkey: &KeyData,
        data: &[u8],
        flags: u32,
    ) -> Result<ssh_key::Signature, AgentOpError> {
        let (signer, key) = self.find_signer(pubkey).await?;
        let hash = match flags {
            RSA_SHA2_256 => HashAlgorithm::Sha256,
            RSA_SHA2_512 => HashAlgorithm::Sha512,
            other => return Err(AgentOpError::UnsupportedSignatureFlags(other)),
        };
        if !matches!(key, KeyData::Rsa(_)) {
            return Err(AgentOpError::UnsupportedSignatureFlags(flags));
        }
        self.sign(signer, &key, hash, data).await
    }

    /// Linear scan in insertion order; first byte-for-byte wire-key match
    /// wins.
    async fn find_signer(
        &self,
        pubkey: &KeyData,
    ) -> Result<(&RemoteSigner, KeyData), AgentOpError> {
        for signer in self.signers.iter() {
            let material = signer.public_key().await?;
            let data = sshkey::key_data(material)?;
            if &data == pubkey {
                return Ok((signer, data));
            }
        }
        Err(AgentOpError::IdentityNotFound)
    }

    async fn sign(
        &self,
        signer: &RemoteSigner,
        key: &KeyData,
        hash: HashAlgorithm,
        data: &[u8],
    ) -> Result<ssh_key::Signature, AgentOpError> {
        debug!(key_id = %signer.key_id(), %hash, data_len = data.len(), "sign");
        let digest = sshkey::digest_message(hash, data)?;
        let raw = signer.sign_digest(&digest, hash).await?;
        sshkey::ssh_signature(key, hash, &raw)
    }
}
