//! SSH agent protocol session and listener.
//!
//! `ssh-agent-lib` owns framing and dispatch; this module adapts
//! [`KmsAgent`] to its `Session` trait. The engine clones the session per
//! accepted connection, and every failure is converted into an agent
//! failure response for that connection only — the daemon keeps serving.

use std::io;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use anyhow::Context as _;
use ssh_agent_lib::agent::{Session, listen};
use ssh_agent_lib::error::AgentError;
use ssh_agent_lib::proto::{AddIdentity, Extension, Identity, RemoveIdentity, SignRequest};
use ssh_key::Signature;
use tracing::{debug, info, warn};

use crate::agent::KmsAgent;
use crate::error::AgentOpError;

#[derive(Clone)]
pub struct AgentSession {
    agent: KmsAgent,
}

impl AgentSession {
    pub fn new(agent: KmsAgent) -> Self {
        Self { agent }
    }
}

fn failure(err: AgentOpError) -> AgentError {
    warn!(error = %err, "request failed");
    AgentError::other(io::Error::other(err.to_string()))
}

#[ssh_agent_lib::async_trait]
impl Session for AgentSession {
    async fn request_identities(&mut self) -> Result<Vec<Identity>, AgentError> {
        let identities = self.agent.list_identities().await.map_err(failure)?;
        Ok(identities
            .into_iter()
            .map(|key| Identity {
                pubkey: key.key_data().clone(),
                comment: key.comment().to_string(),
            })
            .collect())
    }

    async fn sign(&mut self, request: SignRequest) -> Result<Signature, AgentError> {
        debug!(flags = request.flags, data_len = request.data.len(), "sign request");
        let result = if request.flags == 0 {
            self.agent.sign_with_key(&request.pubkey, &request.data).await
        } else {
            self.agent
                .sign_with_flags(&request.pubkey, &request.data, request.flags)
                .await
        };
        result.map_err(failure)
    }

    // This agent's identities come from KMS configuration alone; everything
    // below is a deliberate, loud refusal rather than a silent no-op.

    async fn add_identity(&mut self, _identity: AddIdentity) -> Result<(), AgentError> {
        Err(failure(AgentOpError::NotImplemented("add-identity")))
    }

    async fn remove_identity(&mut self, _identity: RemoveIdentity) -> Result<(), AgentError> {
        Err(failure(AgentOpError::NotImplemented("remove-identity")))
    }

    async fn remove_all_identities(&mut self) -> Result<(), AgentError> {
        Err(failure(AgentOpError::NotImplemented("remove-all-identities")))
    }

    async fn lock(&mut self, _key: String) -> Result<(), AgentError> {
        Err(failure(AgentOpError::NotImplemented("lock")))
    }

    async fn unlock(&mut self, _key: String) -> Result<(), AgentError> {
        Err(failure(AgentOpError::NotImplemented("unlock")))
    }

    async fn extension(&mut self, _extension: Extension) -> Result<Option<Extension>, AgentError> {
        Err(failure(AgentOpError::NotImplemented("extension")))
    }
}

/// Binds the Unix socket (mode 0600, replacing any stale socket file) and
/// serves connections until the listener itself fails.
pub async fn serve(agent: KmsAgent, socket_path: &Path) -> anyhow::Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .with_context(|| format!("removing stale socket {socket_path:?}"))?;
    }

    let listener = tokio::net::UnixListener::bind(socket_path)
        .with_context(|| format!("bind SSH agent socket {socket_path:?}"))?;
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("chmod 0600 {socket_path:?}"))?;

    info!(socket = %socket_path.display(), "serving SSH agent");
    listen(listener, AgentSession::new(agent))
        .await
        .context("SSH agent listener")
}
