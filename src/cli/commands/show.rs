//! Read-only views of the account database.

use super::{Flags, open_store};
use crate::config::Config;
use crate::db::{
    ContactRepository, InstituteRepository, ProjectRepository, RequestRow, TicketRepository,
    UserRepository, UserSummary,
};
use crate::services::{CommandProvisioner, HostContext, RequestLifecycle, TerminalPrompt};

fn print_requests(rows: &[RequestRow]) {
    if rows.is_empty() {
        println!("No requests found.");
        return;
    }

    println!(
        "{:<6} {:<10} {:<24} {:<32} {:<8} {:<6} {:<10} {}",
        "id", "username", "name", "email", "cluster", "done", "approver", "created"
    );
    println!("{:-<110}", "");

    for row in rows {
        let name = format!("{} {}", row.givenname, row.surname.as_deref().unwrap_or(""));
        println!(
            "{:<6} {:<10} {:<24} {:<32} {:<8} {:<6} {:<10} {}",
            row.id,
            row.username,
            name.trim_end(),
            row.email,
            row.cluster,
            if row.isdone { "yes" } else { "no" },
            row.approver.as_deref().unwrap_or("-"),
            row.creation_date
        );
    }
}

fn print_users(users: &[UserSummary]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }

    for user in users {
        println!(
            "{}, {} {}, {}, {}, created {}",
            user.username,
            user.givenname,
            user.surname.as_deref().unwrap_or(""),
            user.email,
            user.status,
            user.creation_date
        );
    }
}

pub async fn cmd_show_requests(
    config: &Config,
    flags: Flags,
    all: bool,
    test: bool,
    recent: Option<u64>,
) -> anyhow::Result<()> {
    let host = HostContext::detect(&config.cluster);
    let store = open_store(config, flags).await?;
    let prompt = TerminalPrompt;
    let provisioner =
        CommandProvisioner::new(host.cluster.clone(), config.provisioning.commands.clone(), true);
    let lifecycle =
        RequestLifecycle::new(&store.conn, &prompt, &provisioner, &config.accounts, &host);

    let rows = if all {
        lifecycle.all_requests().await?
    } else if let Some(limit) = recent {
        lifecycle.recent_requests(limit).await?
    } else if test {
        lifecycle.pending_test_requests(host.cluster_name()).await?
    } else {
        lifecycle.pending_requests(host.cluster_name()).await?
    };

    print_requests(&rows);
    Ok(())
}

pub async fn cmd_show_user(config: &Config, flags: Flags, username: &str) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;

    let Some(user) = UserRepository::new(&store.conn).get(username).await? else {
        println!("User {username} not found.");
        return Ok(());
    };

    println!("Username:  {}", user.username);
    println!(
        "Name:      {} {}",
        user.givenname,
        user.surname.as_deref().unwrap_or("")
    );
    println!("Email:     {}", user.email);
    println!("Status:    {}", user.status);
    println!("Created:   {}", user.creation_date);
    if let Some(modified) = &user.modification_date {
        println!("Modified:  {modified}");
    }
    println!("SSH key:   {}", user.ssh_key);

    let memberships = ProjectRepository::new(&store.conn)
        .memberships(username)
        .await?;

    println!();
    println!("Projects ({}):", memberships.len());
    for m in memberships {
        println!(
            "  {} (contact {}) {} since {}",
            m.project, m.poc_id, m.status, m.creation_date
        );
    }

    Ok(())
}

pub async fn cmd_show_contacts(config: &Config, flags: Flags) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let contacts = ContactRepository::new(&store.conn).list_all().await?;

    println!("Points of contact ({} total)", contacts.len());
    println!("{:-<70}", "");
    for c in contacts {
        println!(
            "{}, {} {}, {}, {}, status: {}",
            c.poc_id,
            c.poc_givenname,
            c.poc_surname.as_deref().unwrap_or(""),
            c.poc_email.as_deref().unwrap_or("-"),
            c.institute,
            c.status
        );
    }

    Ok(())
}

pub async fn cmd_show_institutes(config: &Config, flags: Flags) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let institutes = InstituteRepository::new(&store.conn).list_all().await?;

    println!("Institutes ({} total)", institutes.len());
    println!("{:-<70}", "");
    for i in institutes {
        println!("{:<12} {}", i.inst_id, i.name);
    }

    Ok(())
}

pub async fn cmd_show_whois(
    config: &Config,
    flags: Flags,
    username: &str,
    email: &str,
    given_name: &str,
    surname: &str,
) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let users = UserRepository::new(&store.conn)
        .whois(username, email, given_name, surname)
        .await?;

    print_users(&users);
    Ok(())
}

pub async fn cmd_show_lastmmm(config: &Config, flags: Flags) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let last = UserRepository::new(&store.conn)
        .last_mmm_username(&config.accounts.mmm_user_schemas)
        .await?;

    match last {
        Some(username) => println!("{username}"),
        None => println!("No mmm usernames in use."),
    }
    Ok(())
}

pub async fn cmd_show_tickets(config: &Config, flags: Flags, id: Option<i64>) -> anyhow::Result<()> {
    let store = open_store(config, flags).await?;
    let tickets = TicketRepository::new(&store.conn);

    let tickets = match id {
        Some(id) => tickets.get(id).await?.into_iter().collect::<Vec<_>>(),
        None => tickets.pending().await?,
    };

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    for t in tickets {
        println!(
            "{} [{}] {}: {} {} <{}> account {} on {} project {}",
            t.id,
            t.status,
            t.ticket_type,
            t.firstname.as_deref().unwrap_or(""),
            t.lastname.as_deref().unwrap_or(""),
            t.email.as_deref().unwrap_or("-"),
            t.account_name.as_deref().unwrap_or("-"),
            t.machine.as_deref().unwrap_or("-"),
            t.project.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
