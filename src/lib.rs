pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod services;
pub mod validation;

use clap::{CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{AddCommands, Cli, Commands, CreateCommands, Flags, ShowCommands};
pub use config::Config;
use db::repositories::contact::ContactInsert;
use error::{AccountError, DatastoreError};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config, cli.verbose);

    let flags = Flags {
        debug: cli.debug,
        verbose: cli.verbose,
    };

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if flags.debug {
        debug!("Debug mode: changes will be rolled back");
    }

    match command {
        Commands::Add { command } => run_add(&config, flags, command).await,
        Commands::Create { command } => run_create(&config, flags, command).await,
        Commands::Show { command } => run_show(&config, flags, command).await,
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if verbose {
        log_level.push_str(",sqlx::query=info");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn run_add(config: &Config, flags: Flags, command: AddCommands) -> anyhow::Result<()> {
    match command {
        AddCommands::User {
            user,
            noconfirm,
            nosupportemail,
        } => cli::cmd_add_user(config, flags, user, noconfirm, nosupportemail).await,

        AddCommands::Csv {
            file,
            noconfirm,
            nosupportemail,
            nosshverify,
        } => cli::cmd_add_csv(config, flags, &file, noconfirm, nosupportemail, nosshverify).await,

        AddCommands::Project { project, institute } => {
            cli::cmd_add_project(config, flags, &project, &institute).await
        }

        AddCommands::ProjectUser {
            username,
            project,
            poc_id,
        } => cli::cmd_add_projectuser(config, flags, &username, &project, &poc_id).await,

        AddCommands::Poc {
            poc_id,
            given_name,
            surname,
            email,
            institute,
            username,
        } => {
            let contact = ContactInsert {
                poc_id: &poc_id,
                given_name: &given_name,
                surname: surname.as_deref(),
                email: &email,
                institute: &institute,
                username: username.as_deref(),
            };
            cli::cmd_add_poc(config, flags, contact).await
        }

        AddCommands::Institute { id, name } => {
            cli::cmd_add_institute(config, flags, &id, &name).await
        }
    }
}

async fn run_create(config: &Config, flags: Flags, command: CreateCommands) -> anyhow::Result<()> {
    match command {
        CreateCommands::User {
            user,
            cc_email,
            noemail,
        } => cli::cmd_create_user(config, flags, user, cc_email.as_deref(), noemail).await,

        CreateCommands::Request { ids, noemail } => {
            cli::cmd_create_request(config, flags, &ids, noemail).await
        }

        CreateCommands::Automate { noemail } => cli::cmd_automate(config, flags, noemail).await,
    }
}

async fn run_show(config: &Config, flags: Flags, command: ShowCommands) -> anyhow::Result<()> {
    match command {
        ShowCommands::Requests { all, test, recent } => {
            cli::cmd_show_requests(config, flags, all, test, recent).await
        }
        ShowCommands::User { username } => cli::cmd_show_user(config, flags, &username).await,
        ShowCommands::Contacts => cli::cmd_show_contacts(config, flags).await,
        ShowCommands::Institutes => cli::cmd_show_institutes(config, flags).await,
        ShowCommands::Whois {
            username,
            email,
            given_name,
            surname,
        } => cli::cmd_show_whois(config, flags, &username, &email, &given_name, &surname).await,
        ShowCommands::LastMmm => cli::cmd_show_lastmmm(config, flags).await,
        ShowCommands::Tickets { id } => cli::cmd_show_tickets(config, flags, id).await,
    }
}

/// The message shown to the operator when an invocation fails. Datastore
/// failures get their own wording whether or not they came through the
/// account layer.
#[must_use]
pub fn failure_message(err: &anyhow::Error) -> String {
    let datastore = err.chain().find_map(|cause| {
        cause.downcast_ref::<DatastoreError>().or_else(|| {
            match cause.downcast_ref::<AccountError>() {
                Some(AccountError::Datastore(inner)) => Some(inner),
                _ => None,
            }
        })
    });

    datastore.map_or_else(|| format!("{err:#}"), ToString::to_string)
}
