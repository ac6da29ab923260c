mod add;
mod create;
mod show;

pub use add::{
    CsvUser, cmd_add_csv, cmd_add_institute, cmd_add_poc, cmd_add_project, cmd_add_projectuser,
    cmd_add_user, read_user_csv,
};
pub use create::{cmd_automate, cmd_create_request, cmd_create_user};
pub use show::{
    cmd_show_contacts, cmd_show_institutes, cmd_show_lastmmm, cmd_show_requests,
    cmd_show_tickets, cmd_show_user, cmd_show_whois,
};

use crate::cli::UserArgs;
use crate::config::Config;
use crate::db::Store;
use crate::domain::{NewUser, ProjectBinding};
use crate::validation::{validate_ssh_key, validate_ucl_policy};

/// Flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub debug: bool,
    pub verbose: bool,
}

async fn open_store(config: &Config, flags: Flags) -> anyhow::Result<Store> {
    Ok(Store::connect(&config.general.database_url, flags.verbose).await?)
}

/// Checks done before any database access.
fn validate_candidate(
    config: &Config,
    flags: Flags,
    user: &NewUser,
    verify_key: bool,
) -> anyhow::Result<()> {
    validate_ucl_policy(
        &user.email,
        user.username.as_deref(),
        &config.accounts.institutional_domain,
    )?;

    if verify_key {
        let info = validate_ssh_key(&user.ssh_key)?;
        if flags.verbose || flags.debug {
            println!();
            println!("SSH key verified ({} {} bits).", info.key_type.name(), info.bits);
            println!();
        }
    }

    Ok(())
}

fn split_user_args(args: UserArgs, cluster: &str) -> (NewUser, ProjectBinding) {
    let user = NewUser {
        username: args.username,
        given_name: args.given_name,
        surname: args.surname,
        email: args.email,
        ssh_key: args.ssh_key,
    };
    let binding = ProjectBinding {
        project: args.project,
        poc_id: args.poc_id,
        cluster: cluster.to_string(),
    };
    (user, binding)
}
