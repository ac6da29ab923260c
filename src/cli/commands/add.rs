use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use super::{Flags, open_store, split_user_args, validate_candidate};
use crate::cli::UserArgs;
use crate::config::Config;
use crate::db::repositories::contact::ContactInsert;
use crate::db::{self, ContactRepository, InstituteRepository, ProjectRepository};
use crate::domain::{AccountStatus, NewUser, Operator, ProjectBinding, RequestId};
use crate::services::{
    Announcement, CommandProvisioner, HostContext, Notifier, Onboarding, RequestLifecycle,
    TerminalPrompt,
};

pub async fn cmd_add_user(
    config: &Config,
    flags: Flags,
    args: UserArgs,
    noconfirm: bool,
    nosupportemail: bool,
) -> anyhow::Result<()> {
    let host = HostContext::detect(&config.cluster);
    let verify_key = !args.nosshverify;
    let (user, binding) = split_user_args(args, host.cluster_name());

    validate_candidate(config, flags, &user, verify_key)?;

    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;
    let prompt = TerminalPrompt;
    let provisioner = CommandProvisioner::new(
        host.cluster.clone(),
        config.provisioning.commands.clone(),
        flags.debug,
    );
    let lifecycle = RequestLifecycle::new(&txn, &prompt, &provisioner, &config.accounts, &host);

    let request_id = match lifecycle.onboard(&user, &binding, !noconfirm).await? {
        Onboarding::Requested {
            request_id,
            username,
            new_user,
        } => {
            if new_user {
                println!("Created pending user {username}");
            } else {
                println!("Using existing user {username}");
            }
            println!("Account request id {request_id} added");
            request_id
        }
        Onboarding::Aborted => {
            println!("Doing nothing and exiting.");
            return Ok(());
        }
    };

    db::finish(txn, flags.debug).await?;

    if !nosupportemail {
        Notifier::new(&config.notifications, flags.debug)
            .notify(&binding.cluster, Announcement::Single(request_id))
            .await
            .context("Failed to notify support")?;
    }

    Ok(())
}

/// One row of a user CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvUser {
    #[serde(default)]
    pub username: Option<String>,
    pub given_name: String,
    #[serde(default)]
    pub surname: Option<String>,
    pub email: String,
    pub ssh_key: String,
    #[serde(rename = "project_ID")]
    pub project: String,
}

impl CsvUser {
    #[must_use]
    pub fn new_user(&self) -> NewUser {
        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.trim().is_empty());
        NewUser {
            username: non_empty(&self.username),
            given_name: self.given_name.clone(),
            surname: non_empty(&self.surname),
            email: self.email.clone(),
            ssh_key: self.ssh_key.clone(),
        }
    }
}

/// Reads a headed CSV with columns
/// `username,given_name,surname,email,ssh_key,project_ID`.
pub fn read_user_csv(path: &Path) -> anyhow::Result<Vec<CsvUser>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut users = Vec::new();
    for (line, row) in reader.deserialize::<CsvUser>().enumerate() {
        let user = row.with_context(|| format!("Invalid row {} in {}", line + 1, path.display()))?;
        users.push(user);
    }

    Ok(users)
}

pub async fn cmd_add_csv(
    config: &Config,
    flags: Flags,
    path: &Path,
    noconfirm: bool,
    nosupportemail: bool,
    nosshverify: bool,
) -> anyhow::Result<()> {
    let rows = read_user_csv(path)?;
    if rows.is_empty() {
        println!("No users found in {}", path.display());
        return Ok(());
    }

    for row in &rows {
        validate_candidate(config, flags, &row.new_user(), !nosshverify)
            .with_context(|| format!("Invalid entry for {}", row.email))?;
    }

    let host = HostContext::detect(&config.cluster);
    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;
    let prompt = TerminalPrompt;
    let provisioner = CommandProvisioner::new(
        host.cluster.clone(),
        config.provisioning.commands.clone(),
        flags.debug,
    );
    let lifecycle = RequestLifecycle::new(&txn, &prompt, &provisioner, &config.accounts, &host);

    let Some(poc_id) = lifecycle.select_contact(&Operator::from_env()).await? else {
        println!("None chosen, doing nothing and exiting.");
        return Ok(());
    };
    println!("Using Point of Contact ID {poc_id}");

    let mut last: Option<RequestId> = None;
    for row in &rows {
        let binding = ProjectBinding {
            project: row.project.clone(),
            poc_id: poc_id.clone(),
            cluster: host.cluster_name().to_string(),
        };

        match lifecycle.onboard(&row.new_user(), &binding, !noconfirm).await? {
            Onboarding::Requested {
                request_id,
                username,
                ..
            } => {
                println!("Account request id {request_id} added for {username}");
                last = Some(request_id);
            }
            Onboarding::Aborted => {
                println!("Doing nothing and exiting.");
                return Ok(());
            }
        }
    }

    db::finish(txn, flags.debug).await?;

    if let Some(last) = last
        && !nosupportemail
    {
        Notifier::new(&config.notifications, flags.debug)
            .notify(
                host.cluster_name(),
                Announcement::Batch {
                    count: rows.len(),
                    last,
                },
            )
            .await
            .context("Failed to notify support")?;
    }

    Ok(())
}

pub async fn cmd_add_project(
    config: &Config,
    flags: Flags,
    project: &str,
    institute: &str,
) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;

    ProjectRepository::new(&txn)
        .add_project(project, institute)
        .await
        .with_context(|| format!("Failed to add project {project}"))?;

    db::finish(txn, flags.debug).await?;
    println!("Added project {project} for institute {institute}");
    Ok(())
}

/// Existing users joining another project are active straight away.
pub async fn cmd_add_projectuser(
    config: &Config,
    flags: Flags,
    username: &str,
    project: &str,
    poc_id: &str,
) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;

    let projects = ProjectRepository::new(&txn);
    if projects.get_project(project).await?.is_none() {
        warn!("Project {} is not in the projects table", project);
    }
    projects
        .add_member(username, project, poc_id, AccountStatus::Active)
        .await
        .with_context(|| format!("Failed to add {username} to {project}"))?;

    db::finish(txn, flags.debug).await?;
    println!("Added {username} to project {project} (contact {poc_id})");
    Ok(())
}

pub async fn cmd_add_poc(
    config: &Config,
    flags: Flags,
    contact: ContactInsert<'_>,
) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;

    ContactRepository::new(&txn)
        .add(&contact)
        .await
        .with_context(|| format!("Failed to add point of contact {}", contact.poc_id))?;

    db::finish(txn, flags.debug).await?;
    println!("Added point of contact {}", contact.poc_id);
    Ok(())
}

pub async fn cmd_add_institute(
    config: &Config,
    flags: Flags,
    id: &str,
    name: &str,
) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;

    InstituteRepository::new(&txn)
        .add(id, name)
        .await
        .with_context(|| format!("Failed to add institute {id}"))?;

    db::finish(txn, flags.debug).await?;
    println!("Added institute {id}: {name}");
    Ok(())
}
