use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kms_signer::{AwsKms, Mode, RemoteSigner};
use kms_ssh_agent::{KmsAgent, install, session};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision a KMS key and register the agent with the OS.
    Install,
    /// Serve the SSH agent over a Unix socket.
    Agent {
        /// KMS key identifier (ARN or alias) to serve as an identity.
        #[clap(long, env = "KMS_SSH_AGENT_KEY_ID")]
        key_id: String,
        /// Unix socket path to listen on.
        #[clap(long, env = "KMS_SSH_AGENT_SOCKET")]
        socket: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let client = Arc::new(AwsKms::from_env().await);

    match args.command {
        Command::Install => install::run(client).await,
        Command::Agent { key_id, socket } => {
            let socket = match socket {
                Some(path) => path,
                None => {
                    let home = dirs::home_dir().context("cannot determine home directory")?;
                    install::default_socket_path(&home)
                }
            };
            let signer = RemoteSigner::new(client, key_id, Mode::Pkcs1v15);
            session::serve(KmsAgent::new(vec![signer]), &socket).await
        }
    }
}
