//! SSH agent backed by AWS KMS keys.
//!
//! Presents one or more [`kms_signer::RemoteSigner`]s as SSH identities
//! over the standard agent protocol. Private key material never leaves
//! KMS; the agent only relays digests and signatures.

pub mod agent;
pub mod error;
pub mod install;
pub mod session;
pub mod sshkey;

pub use agent::{KmsAgent, RSA_SHA2_256, RSA_SHA2_512};
pub use error::AgentOpError;
pub use session::AgentSession;
