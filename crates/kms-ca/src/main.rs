use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kms_signer::AwsKms;
use tracing_subscriber::EnvFilter;

mod ca;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a certificate request (and throwaway key) for the given DNS names.
    MkCsr {
        /// DNS names; the first becomes the subject common name.
        #[clap(required = true)]
        names: Vec<String>,
    },
    /// Sign csr.pem with the KMS-held root key, emitting cert.pem.
    SignCsr,
    /// Provision the KMS root key and write a self-signed root certificate.
    MkRoot,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::MkCsr { names } => ca::mk_csr(&names),
        Command::SignCsr => {
            let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
            let client = Arc::new(runtime.block_on(AwsKms::from_env()));
            ca::sign_csr(client, runtime.handle())
        }
        Command::MkRoot => {
            let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
            let client = Arc::new(runtime.block_on(AwsKms::from_env()));
            ca::mk_root(client, runtime.handle())
        }
    }
}
