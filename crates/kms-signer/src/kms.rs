//! The KMS collaborator seam.
//!
//! [`KmsClient`] is the narrow slice of the KMS API this system consumes:
//! fetch a public key, sign a pre-computed digest, and (for provisioning
//! only) create and alias a signing key. Production traffic goes through
//! [`AwsKms`]; tests substitute in-process fakes.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::{KeySpec, KeyUsageType, MessageType, SigningAlgorithmSpec, Tag};
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::error::SignerError;

/// A public-key reply: the key's declared spec tag plus SPKI DER bytes.
#[derive(Debug, Clone)]
pub struct PublicKeyReply {
    pub key_spec: String,
    pub der: Vec<u8>,
}

/// Identifiers of a freshly created signing key.
#[derive(Debug, Clone)]
pub struct CreatedKey {
    pub key_id: String,
    pub arn: String,
}

#[async_trait]
pub trait KmsClient: Send + Sync {
    /// Fetches the public half of the named key.
    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyReply, SignerError>;

    /// Signs a pre-computed digest with the named key and algorithm,
    /// returning the raw signature bytes.
    async fn sign_digest(
        &self,
        key_id: &str,
        digest: &[u8],
        algorithm: &str,
    ) -> Result<Vec<u8>, SignerError>;

    /// Creates an asymmetric sign/verify key. Provisioning only.
    async fn create_signing_key(
        &self,
        key_spec: &str,
        description: &str,
        created_by: &str,
    ) -> Result<CreatedKey, SignerError>;

    /// Points an alias at an existing key. Provisioning only.
    async fn create_alias(&self, alias_name: &str, target_key_id: &str)
        -> Result<(), SignerError>;
}

/// Production [`KmsClient`] backed by the AWS SDK.
///
/// Credentials, region, timeouts, and retries all come from the ambient SDK
/// configuration; nothing here retries on its own.
#[derive(Debug, Clone)]
pub struct AwsKms {
    client: aws_sdk_kms::Client,
}

impl AwsKms {
    /// Builds a client from the default credential/region chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_kms::Client::new(&config),
        }
    }
}

fn remote_error(e: impl std::error::Error + Send + Sync + 'static) -> SignerError {
    SignerError::RemoteCallFailed(DisplayErrorContext(&e).to_string())
}

#[async_trait]
impl KmsClient for AwsKms {
    async fn get_public_key(&self, key_id: &str) -> Result<PublicKeyReply, SignerError> {
        let reply = self
            .client
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(remote_error)?;

        let key_spec = reply
            .key_spec()
            .ok_or(SignerError::MissingField("KeySpec"))?
            .as_str()
            .to_string();
        let der = reply
            .public_key()
            .ok_or(SignerError::MissingField("PublicKey"))?
            .as_ref()
            .to_vec();

        Ok(PublicKeyReply { key_spec, der })
    }

    async fn sign_digest(
        &self,
        key_id: &str,
        digest: &[u8],
        algorithm: &str,
    ) -> Result<Vec<u8>, SignerError> {
        let reply = self
            .client
            .sign()
            .key_id(key_id)
            .message(Blob::new(digest))
            .message_type(MessageType::Digest)
            .signing_algorithm(SigningAlgorithmSpec::from(algorithm))
            .send()
            .await
            .map_err(remote_error)?;

        Ok(reply
            .signature()
            .ok_or(SignerError::MissingField("Signature"))?
            .as_ref()
            .to_vec())
    }

    async fn create_signing_key(
        &self,
        key_spec: &str,
        description: &str,
        created_by: &str,
    ) -> Result<CreatedKey, SignerError> {
        let tag = Tag::builder()
            .tag_key("created-by")
            .tag_value(created_by)
            .build()
            .map_err(remote_error)?;

        let reply = self
            .client
            .create_key()
            .key_spec(KeySpec::from(key_spec))
            .key_usage(KeyUsageType::SignVerify)
            .description(description)
            .tags(tag)
            .send()
            .await
            .map_err(remote_error)?;

        let metadata = reply
            .key_metadata()
            .ok_or(SignerError::MissingField("KeyMetadata"))?;
        Ok(CreatedKey {
            key_id: metadata.key_id().to_string(),
            arn: metadata
                .arn()
                .ok_or(SignerError::MissingField("KeyMetadata.Arn"))?
                .to_string(),
        })
    }

    async fn create_alias(
        &self,
        alias_name: &str,
        target_key_id: &str,
    ) -> Result<(), SignerError> {
        self.client
            .create_alias()
            .alias_name(alias_name)
            .target_key_id(target_key_id)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }
}
