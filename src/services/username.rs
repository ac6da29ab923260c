//! Allocation of mmm role-account usernames.

use sea_orm::ConnectionTrait;

use crate::constants::accounts::{MMM_DIGITS, MMM_PREFIX};
use crate::db::UserRepository;
use crate::error::AccountError;

/// Suffix used when no mmm username exists yet.
const FIRST_SUFFIX: u32 = 1;

/// The mmm username following `last_known`, the greatest one in use.
///
/// `mmm0042` becomes `mmm0043`; `None` starts the range at `mmm0001`.
pub fn next_mmm_username(last_known: Option<&str>) -> Result<String, AccountError> {
    let next = match last_known {
        None => FIRST_SUFFIX,
        Some(last) => {
            let suffix = last
                .len()
                .checked_sub(MMM_DIGITS)
                .and_then(|start| last.get(start..))
                .and_then(|digits| digits.parse::<u32>().ok())
                .ok_or_else(|| {
                    AccountError::Validation(crate::validation::ValidationError::MalformedMmm(
                        last.to_string(),
                    ))
                })?;
            suffix + 1
        }
    };

    let rendered = format!("{next:0width$}", width = MMM_DIGITS);
    if rendered.len() > MMM_DIGITS {
        return Err(AccountError::UsernamesExhausted(
            last_known.unwrap_or_default().to_string(),
        ));
    }

    Ok(format!("{MMM_PREFIX}{rendered}"))
}

/// Looks up the greatest mmm username across the local and shared user
/// tables and returns the one after it.
pub async fn allocate_mmm_username<C: ConnectionTrait>(
    conn: &C,
    extra_schemas: &[String],
) -> Result<String, AccountError> {
    let last = UserRepository::new(conn)
        .last_mmm_username(extra_schemas)
        .await?;
    next_mmm_username(last.as_deref())
}
