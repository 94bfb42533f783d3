//! The remote signer: a KMS key presented through a local signing contract.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::algorithm::{self, HashAlgorithm, Mode};
use crate::error::SignerError;
use crate::kms::KmsClient;
use crate::parse::{self, KmsPublicKey};

/// A signing identity whose private half lives inside KMS.
///
/// The key identifier and signing mode are fixed at construction. Public key
/// material is fetched lazily on first use and cached for the signer's
/// lifetime — there is no refresh: if the remote key is rotated out from
/// under a live signer, the cache goes stale by design.
///
/// Safe for concurrent use; each sign is one independent remote call with no
/// ordering guarantee relative to any other.
pub struct RemoteSigner {
    client: Arc<dyn KmsClient>,
    key_id: String,
    mode: Mode,
    public_key: OnceCell<KmsPublicKey>,
}

impl RemoteSigner {
    pub fn new(client: Arc<dyn KmsClient>, key_id: impl Into<String>, mode: Mode) -> Self {
        Self {
            client,
            key_id: key_id.into(),
            mode,
            public_key: OnceCell::new(),
        }
    }

    /// The KMS key identifier (ARN or alias) this signer was built with.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Fetches and translates the public key with one remote call,
    /// bypassing the cache.
    pub async fn fetch_public_key(&self) -> Result<KmsPublicKey, SignerError> {
        let reply = self.client.get_public_key(&self.key_id).await?;
        debug!(key_id = %self.key_id, key_spec = %reply.key_spec, "fetched public key");
        parse::parse_public_key(&reply.key_spec, &reply.der)
    }

    /// The signer's public key, fetched on first call and cached thereafter.
    ///
    /// Concurrent first calls coalesce into a single remote fetch; a failed
    /// fetch leaves the cache empty so a later call may try again.
    pub async fn public_key(&self) -> Result<&KmsPublicKey, SignerError> {
        self.public_key
            .get_or_try_init(|| self.fetch_public_key())
            .await
    }

    /// Signs an already-computed digest, returning the raw signature bytes.
    ///
    /// The algorithm identifier is negotiated from the signer's fixed mode
    /// and `hash`; the caller must supply a digest computed with that same
    /// hash. One remote call, no retries.
    pub async fn sign_digest(
        &self,
        digest: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Vec<u8>, SignerError> {
        let algorithm = algorithm::signing_algorithm(self.mode, hash)?;
        debug!(key_id = %self.key_id, algorithm, "signing digest");
        self.client
            .sign_digest(&self.key_id, digest, algorithm)
            .await
    }
}

impl std::fmt::Debug for RemoteSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSigner")
            .field("key_id", &self.key_id)
            .field("mode", &self.mode)
            .field("public_key_cached", &self.public_key.initialized())
            .finish()
    }
}
