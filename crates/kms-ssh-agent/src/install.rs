//! One-shot provisioning: create the KMS key, register the agent with the
//! OS service manager, wire up the SSH client config, and print the public
//! key for authorized_keys.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use kms_signer::{KmsClient, Mode, RemoteSigner};
use ssh_key::PublicKey;

use crate::sshkey;

/// Default socket path under the user's home directory.
pub fn default_socket_path(home: &Path) -> PathBuf {
    home.join(".ssh").join("kms-ssh-agent.sock")
}

pub async fn run(client: Arc<dyn KmsClient>) -> anyhow::Result<()> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let exe = std::env::current_exe().context("cannot determine executable path")?;
    let socket_path = default_socket_path(&home);

    let created = client
        .create_signing_key(
            "RSA_2048",
            &format!("kms-ssh-agent for {user}"),
            "kms-ssh-agent",
        )
        .await
        .context("creating KMS key")?;
    println!("* Created KMS key with ARN: {}", created.arn);

    let service_path = write_service_registration(&home, &exe, &created.arn, &socket_path)
        .context("writing service registration")?;
    println!("* Wrote service registration to {}", service_path.display());

    let ssh_config_path = home.join(".ssh").join("config");
    append_identity_agent(&ssh_config_path, &socket_path)
        .with_context(|| format!("updating {}", ssh_config_path.display()))?;
    println!(
        "* Added IdentityAgent config to {}",
        ssh_config_path.display()
    );

    let signer = RemoteSigner::new(client, created.arn.clone(), Mode::Pkcs1v15);
    let material = signer.public_key().await.context("fetching public key")?;
    let key = PublicKey::new(sshkey::key_data(material)?, created.arn.clone());
    println!(
        "* Now you can add the following SSH public key to .ssh/authorized_keys \
         on hosts you want to SSH into:\n\n{}\n",
        key.to_openssh()?
    );

    println!(
        "If you want to uninstall, follow these steps:\n\n  \
         * Delete {}\n  \
         * Delete {}\n  \
         * Remove the IdentityAgent block at the bottom of {}\n  \
         * Delete the KMS key with ARN {}",
        service_path.display(),
        socket_path.display(),
        ssh_config_path.display(),
        created.arn
    );

    Ok(())
}

fn append_identity_agent(ssh_config_path: &Path, socket_path: &Path) -> anyhow::Result<()> {
    let mut config = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ssh_config_path)?;
    writeln!(config, "\nHost *\n  IdentityAgent {}", socket_path.display())?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn write_service_registration(
    home: &Path,
    exe: &Path,
    key_arn: &str,
    socket_path: &Path,
) -> anyhow::Result<PathBuf> {
    let unit_dir = home.join(".config").join("systemd").join("user");
    std::fs::create_dir_all(&unit_dir)?;
    let unit_path = unit_dir.join("kms-ssh-agent.service");
    let unit = format!(
        "[Unit]\n\
         Description=SSH agent backed by an AWS KMS key\n\n\
         [Service]\n\
         ExecStart={exe} agent\n\
         Environment=KMS_SSH_AGENT_KEY_ID={key_arn}\n\
         Environment=KMS_SSH_AGENT_SOCKET={socket}\n\
         Restart=on-failure\n\n\
         [Install]\n\
         WantedBy=default.target\n",
        exe = exe.display(),
        socket = socket_path.display(),
    );
    std::fs::write(&unit_path, unit)?;
    println!("* Enable it with: systemctl --user enable --now kms-ssh-agent");
    Ok(unit_path)
}

#[cfg(target_os = "macos")]
fn write_service_registration(
    home: &Path,
    exe: &Path,
    key_arn: &str,
    socket_path: &Path,
) -> anyhow::Result<PathBuf> {
    let agents_dir = home.join("Library").join("LaunchAgents");
    std::fs::create_dir_all(&agents_dir)?;
    let plist_path = agents_dir.join("com.kms-ssh-agent.plist");
    let plist = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
    <dict>
        <key>Label</key>
        <string>com.kms-ssh-agent</string>
        <key>ProgramArguments</key>
        <array>
            <string>{exe}</string>
            <string>agent</string>
        </array>
        <key>EnvironmentVariables</key>
        <dict>
            <key>KMS_SSH_AGENT_KEY_ID</key>
            <string>{key_arn}</string>
            <key>KMS_SSH_AGENT_SOCKET</key>
            <string>{socket}</string>
        </dict>
        <key>RunAtLoad</key>
        <true/>
    </dict>
</plist>
"#,
        exe = exe.display(),
        socket = socket_path.display(),
    );
    std::fs::write(&plist_path, plist)?;
    Ok(plist_path)
}
