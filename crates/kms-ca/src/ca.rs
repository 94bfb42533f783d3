//! Certificate authority workflows over a KMS-held root key.
//!
//! Three flows, all operating on fixed filenames in the working directory:
//! `mk-root` provisions the KMS key and emits a self-signed root
//! certificate, `mk-csr` produces a request (with a local throwaway key)
//! for a set of DNS names, and `sign-csr` issues a leaf certificate for
//! that request under the KMS root. The private half of the root never
//! leaves KMS; every root-signed signature is produced remotely through
//! [`CertificateSigner`].

use std::fs;
use std::io::Write as _;
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::Path;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use const_oid::db::rfc5280::{ID_CE_SUBJECT_ALT_NAME, ID_KP_CLIENT_AUTH, ID_KP_SERVER_AUTH};
use const_oid::db::rfc5912::ID_EXTENSION_REQ;
use der::asn1::Ia5String;
use der::pem::LineEnding;
use der::{Decode as _, DecodePem as _, Encode as _, EncodePem as _};
use rsa::pkcs1::EncodeRsaPrivateKey as _;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::Keypair as _;
use sha2::Sha256;
use tokio::runtime::Handle;
use tracing::debug;
use x509_cert::Certificate;
use x509_cert::builder::{Builder as _, CertificateBuilder, Profile, RequestBuilder};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{ExtendedKeyUsage, SubjectAltName};
use x509_cert::name::Name;
use x509_cert::request::{CertReq, ExtensionReq};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{EncodePublicKey as _, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;

use kms_signer::{CertificateSigner, KmsClient, Mode, RemoteSigner};

/// KMS alias the root certificate's signing key lives under.
pub const ROOT_KEY_ALIAS: &str = "alias/kmsca-rootx";

const ROOT_PEM: &str = "root.pem";
const CSR_PEM: &str = "csr.pem";
const CSR_KEY_PEM: &str = "csr.key";
const CERT_PEM: &str = "cert.pem";

const ROOT_SERIAL: u32 = 2020;
const LEAF_SERIAL: u32 = 20191;

/// Ten years, matching the root key's intended lifetime.
const VALIDITY: Duration = Duration::from_secs(10 * 365 * 86400);

/// Builds a PKCS#10 request for `names` signed by `private`. The first
/// name becomes the subject common name; all of them land in a subject
/// alternative name extension request.
fn build_csr(names: &[String], private: &rsa::RsaPrivateKey) -> anyhow::Result<CertReq> {
    let first = names.first().context("at least one DNS name is required")?;
    let subject = Name::from_str(&format!("CN={first}"))?;

    let san = SubjectAltName(
        names
            .iter()
            .map(|name| Ok(GeneralName::DnsName(Ia5String::new(name)?)))
            .collect::<der::Result<Vec<_>>>()?,
    );

    let signing_key = SigningKey::<Sha256>::new(private.clone());
    let mut builder = RequestBuilder::new(subject, &signing_key)?;
    builder.add_extension(&san)?;
    Ok(builder.build::<rsa::pkcs1v15::Signature>()?)
}

/// DNS names carried in the request's extension-request attribute.
fn csr_dns_names(csr: &CertReq) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for attr in csr.info.attributes.iter() {
        if attr.oid != ID_EXTENSION_REQ {
            continue;
        }
        for value in attr.values.iter() {
            let ext_req = ExtensionReq::from_der(&value.to_der()?)?;
            for ext in ext_req.0 {
                if ext.extn_id != ID_CE_SUBJECT_ALT_NAME {
                    continue;
                }
                let san = SubjectAltName::from_der(ext.extn_value.as_bytes())?;
                for name in san.0 {
                    if let GeneralName::DnsName(dns) = name {
                        names.push(dns.to_string());
                    }
                }
            }
        }
    }
    Ok(names)
}

fn client_server_eku() -> ExtendedKeyUsage {
    ExtendedKeyUsage(vec![ID_KP_CLIENT_AUTH, ID_KP_SERVER_AUTH])
}

fn write_secret(path: &Path, contents: &str) -> anyhow::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("opening {path:?}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("writing {path:?}"))
}

/// Builds the leaf certificate for `csr` under `root`'s subject, carrying
/// the request's DNS names over and marking it for TLS client/server use.
fn build_leaf_cert(
    signer: &CertificateSigner,
    csr: &CertReq,
    root: &Certificate,
) -> anyhow::Result<Certificate> {
    let dns_names = csr_dns_names(csr)?;
    debug!(names = ?dns_names, "issuing leaf certificate");

    let profile = Profile::Leaf {
        issuer: root.tbs_certificate.subject.clone(),
        enable_key_agreement: false,
        enable_key_encipherment: false,
    };
    let mut builder = CertificateBuilder::new(
        profile,
        SerialNumber::from(LEAF_SERIAL),
        Validity::from_now(VALIDITY)?,
        csr.info.subject.clone(),
        csr.info.public_key.clone(),
        signer,
    )?;
    builder.add_extension(&client_server_eku())?;
    if !dns_names.is_empty() {
        let san = SubjectAltName(
            dns_names
                .iter()
                .map(|name| Ok(GeneralName::DnsName(Ia5String::new(name)?)))
                .collect::<der::Result<Vec<_>>>()?,
        );
        builder.add_extension(&san)?;
    }
    Ok(builder.build::<rsa::pkcs1v15::Signature>()?)
}

/// Builds the self-signed root: the remote key is both the certificate's
/// subject key and its signing key.
fn build_root_cert(signer: &CertificateSigner) -> anyhow::Result<Certificate> {
    let spki_der = signer.verifying_key().to_public_key_der()?;
    let spki = SubjectPublicKeyInfoOwned::try_from(spki_der.as_bytes())?;

    let subject = Name::from_str("O=Company Inc,L=San Francisco,C=US")?;
    let mut builder = CertificateBuilder::new(
        Profile::Root,
        SerialNumber::from(ROOT_SERIAL),
        Validity::from_now(VALIDITY)?,
        subject,
        spki,
        signer,
    )?;
    builder.add_extension(&client_server_eku())?;
    Ok(builder.build::<rsa::pkcs1v15::Signature>()?)
}

fn remote_root_signer(
    client: Arc<dyn KmsClient>,
    handle: &Handle,
) -> anyhow::Result<CertificateSigner> {
    let signer = RemoteSigner::new(client, ROOT_KEY_ALIAS, Mode::Pkcs1v15);
    handle
        .block_on(CertificateSigner::new(signer, handle.clone()))
        .context("binding to the KMS root key")
}

/// Writes `csr.pem` and its throwaway private key `csr.key` for `names`.
pub fn mk_csr(names: &[String]) -> anyhow::Result<()> {
    let private = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
        .context("generating request key")?;
    let csr = build_csr(names, &private)?;

    fs::write(CSR_PEM, csr.to_pem(LineEnding::LF)?).with_context(|| format!("writing {CSR_PEM}"))?;
    println!("Wrote CSR request to {CSR_PEM}");

    let key_pem = private
        .to_pkcs1_pem(LineEnding::LF)
        .context("encoding request key")?;
    write_secret(Path::new(CSR_KEY_PEM), &key_pem)?;
    println!("Wrote CSR private key to {CSR_KEY_PEM}");
    Ok(())
}

/// Issues `cert.pem`: a leaf certificate for `csr.pem`, valid for TLS
/// client and server use, signed by the KMS root named in `root.pem`.
pub fn sign_csr(client: Arc<dyn KmsClient>, handle: &Handle) -> anyhow::Result<()> {
    let csr = CertReq::from_pem(fs::read_to_string(CSR_PEM).context("reading csr.pem")?)
        .context("parsing csr.pem")?;
    let root = Certificate::from_pem(fs::read_to_string(ROOT_PEM).context("reading root.pem")?)
        .context("parsing root.pem")?;

    let signer = remote_root_signer(client, handle)?;
    let cert = build_leaf_cert(&signer, &csr, &root)?;

    fs::write(CERT_PEM, cert.to_pem(LineEnding::LF)?)
        .with_context(|| format!("writing {CERT_PEM}"))?;
    println!("Wrote leaf certificate to {CERT_PEM}");
    Ok(())
}

/// Provisions the KMS root key under [`ROOT_KEY_ALIAS`] and writes a
/// self-signed `root.pem` for it.
pub fn mk_root(client: Arc<dyn KmsClient>, handle: &Handle) -> anyhow::Result<()> {
    let created = handle
        .block_on(client.create_signing_key("RSA_2048", ROOT_KEY_ALIAS, "kms-ca"))
        .context("creating KMS root key")?;
    println!("Created KMS key with ID {}", created.key_id);

    handle
        .block_on(client.create_alias(ROOT_KEY_ALIAS, &created.key_id))
        .context("creating KMS key alias")?;
    println!("Created KMS key alias named {ROOT_KEY_ALIAS}");

    let signer = remote_root_signer(client, handle)?;
    let cert = build_root_cert(&signer)?;

    write_secret(Path::new(ROOT_PEM), &cert.to_pem(LineEnding::LF)?)?;
    println!("Wrote root CA certificate to {ROOT_PEM}");
    Ok(())
}
