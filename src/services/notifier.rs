//! Announces new account requests to the support team.

use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::NotificationConfig;
use crate::domain::RequestId;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Exit { command: String, status: String },
}

/// What was requested: one account, or a CSV batch ending at `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Single(RequestId),
    Batch { count: usize, last: RequestId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// RFC 822 text as handed to sendmail.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nContent-Type: text/plain; charset=\"utf-8\"\n\n{}",
            self.from, self.to, self.subject, self.body
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[must_use]
pub fn compose(config: &NotificationConfig, cluster: &str, announcement: Announcement) -> Message {
    let display = capitalize(cluster);

    let mut body = match announcement {
        Announcement::Single(id) => {
            format!("{display} user account request id {id} has been received.")
        }
        Announcement::Batch { count, last } => format!(
            "{display} multi-user account request has been received for {count} users, \
             last request id {last}."
        ),
    };
    body.push_str(&format!(
        "\nPlease run '{cluster}-show requests' on a {display} login node to see pending requests.\n\
         Requests can then be approved by running '{cluster}-create request id1 [id2 id3 ...]'\n\n"
    ));

    Message {
        from: config.from.clone(),
        to: config.to.clone(),
        subject: format!("{display} account request"),
        body,
    }
}

pub struct Notifier<'a> {
    config: &'a NotificationConfig,
    dry_run: bool,
}

impl<'a> Notifier<'a> {
    #[must_use]
    pub const fn new(config: &'a NotificationConfig, dry_run: bool) -> Self {
        Self { config, dry_run }
    }

    #[must_use]
    pub fn announces(&self, cluster: &str) -> bool {
        self.config.clusters.iter().any(|c| c == cluster)
    }

    /// Sends the announcement if `cluster` is one that gets them. Returns
    /// whether a message was produced.
    pub async fn notify(
        &self,
        cluster: &str,
        announcement: Announcement,
    ) -> Result<bool, NotifyError> {
        if !self.announces(cluster) {
            debug!("No notification configured for cluster {}", cluster);
            return Ok(false);
        }

        let message = compose(self.config, cluster, announcement);

        if self.dry_run {
            println!();
            println!("Email that would be sent:");
            println!("{}", message.render());
            return Ok(true);
        }

        self.send(&message).await?;
        println!("RC Support has been notified to create the account(s).");
        Ok(true)
    }

    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let command = self.config.sendmail_path.clone();
        let spawn_err = |source| NotifyError::Spawn {
            command: command.clone(),
            source,
        };

        let mut child = Command::new(&command)
            .args(["-t", "-oi"])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.render().as_bytes())
                .await
                .map_err(spawn_err)?;
        }

        let status = child.wait().await.map_err(spawn_err)?;
        if !status.success() {
            return Err(NotifyError::Exit {
                command,
                status: status.to_string(),
            });
        }

        info!("Sent '{}' to {}", message.subject, message.to);
        Ok(())
    }
}
