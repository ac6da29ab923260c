//! Duplicate-user detection for new account requests.
//!
//! Usernames are globally unique, so a username match always rejects. The
//! same person asking for a second project shows up as an email match, which
//! the operator resolves by reusing the existing account.

use sea_orm::ConnectionTrait;
use tracing::info;

use crate::db::{UserRepository, UserSummary};
use crate::domain::{DuplicateKey, NewUser};
use crate::error::AccountError;
use crate::services::prompt::Prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    CreateNew,
    /// Attach the new membership and request to this existing username.
    UseExisting(String),
    Reject(String),
    Abort,
}

fn describe(user: &UserSummary) -> String {
    format!(
        "{}, {} {}, {}, created {}",
        user.username,
        user.givenname,
        user.surname.as_deref().unwrap_or(""),
        user.email,
        user.creation_date
    )
}

pub async fn resolve_duplicates<C: ConnectionTrait>(
    conn: &C,
    candidate: &NewUser,
    key: DuplicateKey,
    prompt: &dyn Prompt,
) -> Result<Decision, AccountError> {
    let value = match key {
        DuplicateKey::Username => match candidate.username.as_deref() {
            Some(username) if !username.is_empty() => username,
            _ => return Ok(Decision::CreateNew),
        },
        DuplicateKey::Email => candidate.email.as_str(),
    };

    let existing = UserRepository::new(conn).find_by(key, value).await?;
    if existing.is_empty() {
        return Ok(Decision::CreateNew);
    }

    info!("{} user(s) with this {} already exist", existing.len(), key);

    if key == DuplicateKey::Username {
        return Ok(Decision::Reject(value.to_string()));
    }

    let options: Vec<String> = existing.iter().map(describe).collect();
    let choice = prompt.choose(
        &format!(
            "{} user(s) with this {key} already exist. Do you want to add a new project to one \
             of the existing accounts instead? (You should do this if it is the same individual.)",
            existing.len()
        ),
        &options,
    );

    match choice {
        Some(index) => {
            let username = existing[index].username.clone();
            info!("Using existing user {}", username);
            Ok(Decision::UseExisting(username))
        }
        None => Ok(second_account(key, prompt)),
    }
}

fn second_account(key: DuplicateKey, prompt: &dyn Prompt) -> Decision {
    if prompt.confirm(
        &format!("Do you want to create a second account with that {key}?"),
        false,
    ) {
        Decision::CreateNew
    } else {
        Decision::Abort
    }
}

/// Direct account creation has no existing account to attach to: an email
/// match only asks whether a second account is wanted.
pub async fn confirm_second_account<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    prompt: &dyn Prompt,
) -> Result<Decision, AccountError> {
    let existing = UserRepository::new(conn)
        .find_by(DuplicateKey::Email, email)
        .await?;

    if existing.is_empty() {
        return Ok(Decision::CreateNew);
    }

    for user in &existing {
        println!("{}", describe(user));
    }

    Ok(second_account(DuplicateKey::Email, prompt))
}
