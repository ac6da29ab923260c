//! CLI module - Command-line interface for thomas
//!
//! Three command groups mirror the operator workflow: `add` records pending
//! requests, `create` approves them, `show` inspects the database.

mod commands;

use clap::{Args, Parser, Subcommand};

use crate::validation::validate_username;

/// thomas - MMM Hub account database administration
#[derive(Parser)]
#[command(name = "thomas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show what would happen without committing any change
    #[arg(long, global = true)]
    pub debug: bool,

    /// Echo the SQL statements being sent
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add data to the account database
    Add {
        #[command(subcommand)]
        command: AddCommands,
    },

    /// Create accounts, from requests or from scratch
    Create {
        #[command(subcommand)]
        command: CreateCommands,
    },

    /// Show database contents
    Show {
        #[command(subcommand)]
        command: ShowCommands,
    },
}

fn parse_username(value: &str) -> Result<String, String> {
    validate_username(value)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    /// Institutional username of the user, mmm username allocated if absent
    #[arg(short = 'u', long = "user", value_parser = parse_username)]
    pub username: Option<String>,

    /// Given name of user
    #[arg(short = 'n', long = "name")]
    pub given_name: String,

    /// Surname of user
    #[arg(short = 's', long)]
    pub surname: Option<String>,

    /// Institutional email address of user
    #[arg(short = 'e', long)]
    pub email: String,

    /// User's public ssh key (quotes necessary)
    #[arg(short = 'k', long = "key")]
    pub ssh_key: String,

    /// Initial project the user belongs to
    #[arg(short = 'p', long)]
    pub project: String,

    /// Short ID of the user's Point of Contact
    #[arg(short = 'c', long = "contact")]
    pub poc_id: String,

    /// Do not verify SSH key (use with caution!)
    #[arg(long)]
    pub nosshverify: bool,
}

#[derive(Subcommand)]
pub enum AddCommands {
    /// Request a new user with their initial project
    User {
        #[command(flatten)]
        user: UserArgs,

        /// Don't ask for confirmation on user account creation
        #[arg(long)]
        noconfirm: bool,

        /// Do not email support to create this account
        #[arg(long)]
        nosupportemail: bool,
    },

    /// Request every user in a CSV file
    Csv {
        /// Path to CSV file of users
        #[arg(short = 'f', long = "file")]
        file: std::path::PathBuf,

        /// Don't ask for confirmation on user account creation
        #[arg(long)]
        noconfirm: bool,

        /// Do not email support to create these accounts
        #[arg(long)]
        nosupportemail: bool,

        /// Do not verify SSH keys (use with caution!)
        #[arg(long)]
        nosshverify: bool,
    },

    /// Add a new project
    Project {
        /// A new unique project ID
        #[arg(short = 'p', long)]
        project: String,

        /// Institute ID this project belongs to
        #[arg(short = 'i', long)]
        institute: String,
    },

    /// Add an existing user to an existing project
    #[command(name = "projectuser")]
    ProjectUser {
        /// An existing username
        #[arg(short = 'u', long = "user", value_parser = parse_username)]
        username: String,

        /// An existing project ID
        #[arg(short = 'p', long)]
        project: String,

        /// An existing Point of Contact ID
        #[arg(short = 'c', long = "contact")]
        poc_id: String,
    },

    /// Add a new Point of Contact
    Poc {
        /// Unique PoC ID, in form N(ame)N(ame)_instituteID
        #[arg(short = 'p', long = "poc_id")]
        poc_id: String,

        /// Given name of PoC
        #[arg(short = 'n', long = "name")]
        given_name: String,

        /// Surname of PoC
        #[arg(short = 's', long)]
        surname: Option<String>,

        /// Email address of PoC
        #[arg(short = 'e', long)]
        email: String,

        /// Institute ID of PoC
        #[arg(short = 'i', long)]
        institute: String,

        /// The PoC's institutional username
        #[arg(short = 'u', long = "user", value_parser = parse_username)]
        username: Option<String>,
    },

    /// Add a new institute or consortium
    Institute {
        /// Unique institute ID, eg QMUL, Imperial, Soton
        #[arg(short = 'i', long = "id")]
        id: String,

        /// Full name of institute or consortium
        #[arg(short = 'n', long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CreateCommands {
    /// Create a new active user account without a request
    User {
        #[command(flatten)]
        user: UserArgs,

        /// CC the welcome email to this address
        #[arg(short = 'b', long = "cc")]
        cc_email: Option<String>,

        /// Create account, don't send welcome email
        #[arg(long)]
        noemail: bool,
    },

    /// Approve request(s) by id
    Request {
        /// The request id(s) to carry out
        #[arg(required = true)]
        ids: Vec<i32>,

        /// Create account, don't send welcome email
        #[arg(long)]
        noemail: bool,
    },

    /// Carry out every pending non-test request for this cluster
    Automate {
        /// Create accounts, don't send welcome emails
        #[arg(long)]
        noemail: bool,
    },
}

#[derive(Subcommand)]
pub enum ShowCommands {
    /// Show pending requests for this cluster
    Requests {
        /// Show every request, done or not
        #[arg(long, conflicts_with_all = ["test", "recent"])]
        all: bool,

        /// Show pending test requests
        #[arg(long, conflicts_with = "recent")]
        test: bool,

        /// Show the N most recent requests
        #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "20")]
        recent: Option<u64>,
    },

    /// Show a user and their projects
    User {
        username: String,
    },

    /// List points of contact
    #[command(alias = "pocs")]
    Contacts,

    /// List institutes
    Institutes,

    /// Search users by partial username, email or name
    Whois {
        #[arg(short = 'u', long = "user", default_value = "")]
        username: String,

        #[arg(short = 'e', long, default_value = "")]
        email: String,

        #[arg(short = 'n', long = "name", default_value = "")]
        given_name: String,

        #[arg(short = 's', long, default_value = "")]
        surname: String,
    },

    /// Show the greatest mmm username in use
    #[command(name = "lastmmm", alias = "getmmm")]
    LastMmm,

    /// Show pending SAFE tickets
    Tickets {
        /// Show one ticket by id
        #[arg(long)]
        id: Option<i64>,
    },
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_usernames() {
        let parsed = Cli::try_parse_from(["thomas", "add", "projectuser", "-u", "abc", "-p", "p", "-c", "c"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["thomas", "create", "request", "3", "5", "--debug"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Create {
                command: CreateCommands::Request { ids, noemail },
            }) => {
                assert_eq!(ids, vec![3, 5]);
                assert!(!noemail);
            }
            _ => panic!("expected create request"),
        }
    }

    #[test]
    fn recent_defaults_to_twenty() {
        let cli = Cli::try_parse_from(["thomas", "show", "requests", "--recent"]).unwrap();
        match cli.command {
            Some(Commands::Show {
                command: ShowCommands::Requests { recent, .. },
            }) => assert_eq!(recent, Some(20)),
            _ => panic!("expected show requests"),
        }
    }
}
