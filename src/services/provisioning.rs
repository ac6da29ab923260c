//! OS-level account creation, delegated to the per-cluster create scripts.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("No account creation command configured for cluster '{0}'")]
    UnsupportedCluster(String),

    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Exit { command: String, status: String },
}

/// Everything the create script needs for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub username: String,
    pub email: String,
    pub ssh_key: String,
    pub cc_email: Option<String>,
    /// Create the account without sending the welcome email.
    pub no_email: bool,
}

#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), ProvisionError>;
}

/// Runs the configured create script for the host's cluster.
pub struct CommandProvisioner {
    cluster: Option<String>,
    commands: HashMap<String, String>,
    dry_run: bool,
}

impl CommandProvisioner {
    #[must_use]
    pub const fn new(
        cluster: Option<String>,
        commands: HashMap<String, String>,
        dry_run: bool,
    ) -> Self {
        Self {
            cluster,
            commands,
            dry_run,
        }
    }

    fn program(&self) -> Result<&str, ProvisionError> {
        let cluster = self.cluster.as_deref().unwrap_or("unknown");
        self.commands
            .get(cluster)
            .map(String::as_str)
            .ok_or_else(|| ProvisionError::UnsupportedCluster(cluster.to_string()))
    }

    #[must_use]
    pub fn arguments(request: &ProvisionRequest) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            request.username.clone(),
            "-e".to_string(),
            request.email.clone(),
            "-k".to_string(),
            request.ssh_key.clone(),
        ];

        if let Some(cc) = &request.cc_email {
            args.push("-c".to_string());
            args.push(cc.clone());
        }
        if request.no_email {
            args.push("-n".to_string());
        }

        args
    }
}

#[async_trait]
impl AccountProvisioner for CommandProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), ProvisionError> {
        let program = self.program()?;
        let args = Self::arguments(request);

        if self.dry_run {
            println!("Arguments that would be used:");
            println!("{program} {}", args.join(" "));
            return Ok(());
        }

        info!("Creating account {} with {}", request.username, program);

        let status = Command::new(program)
            .args(&args)
            .status()
            .await
            .map_err(|source| ProvisionError::Spawn {
                command: program.to_string(),
                source,
            })?;

        if !status.success() {
            error!("{} failed for {}: {}", program, request.username, status);
            return Err(ProvisionError::Exit {
                command: program.to_string(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}
