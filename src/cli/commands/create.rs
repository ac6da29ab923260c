use std::collections::BTreeSet;

use super::{Flags, open_store, split_user_args, validate_candidate};
use crate::cli::UserArgs;
use crate::config::Config;
use crate::db;
use crate::domain::{Operator, RequestId};
use crate::services::{
    ApprovalReport, CommandProvisioner, HostContext, Prompt, RequestLifecycle, TerminalPrompt,
};

/// Account creation only makes sense on a cluster login node. Returns
/// `false` if the operator does not want to carry on elsewhere.
fn confirm_host(host: &HostContext, prompt: &dyn Prompt) -> bool {
    if host.cluster.is_some() {
        return true;
    }

    prompt.confirm(
        &format!(
            "Current hostname does not appear to be on Thomas or Michael or Young ({})\n \
             Do you want to continue?",
            host.nodename
        ),
        false,
    )
}

fn print_report(report: &ApprovalReport) {
    if report.is_empty() {
        println!("No requests to carry out.");
        return;
    }

    for entry in &report.entries {
        println!("{entry}");
    }
    println!(
        "{} of {} request(s) approved",
        report.approved(),
        report.entries.len()
    );
}

pub async fn cmd_create_user(
    config: &Config,
    flags: Flags,
    args: UserArgs,
    cc_email: Option<&str>,
    noemail: bool,
) -> anyhow::Result<()> {
    let host = HostContext::detect(&config.cluster);
    let prompt = TerminalPrompt;
    if !confirm_host(&host, &prompt) {
        return Ok(());
    }

    let verify_key = !args.nosshverify;
    let (user, binding) = split_user_args(args, host.cluster_name());
    validate_candidate(config, flags, &user, verify_key)?;

    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;
    let provisioner = CommandProvisioner::new(
        host.cluster.clone(),
        config.provisioning.commands.clone(),
        flags.debug,
    );
    let lifecycle = RequestLifecycle::new(&txn, &prompt, &provisioner, &config.accounts, &host);

    let Some(username) = lifecycle
        .create_active_user(&user, &binding, cc_email, noemail)
        .await?
    else {
        println!("No second account requested, doing nothing and exiting.");
        return Ok(());
    };

    db::finish(txn, flags.debug).await?;
    println!("Created account {username} in project {}", binding.project);
    Ok(())
}

pub async fn cmd_create_request(
    config: &Config,
    flags: Flags,
    ids: &[i32],
    noemail: bool,
) -> anyhow::Result<()> {
    let host = HostContext::detect(&config.cluster);
    let prompt = TerminalPrompt;
    if !confirm_host(&host, &prompt) {
        return Ok(());
    }

    let ids: BTreeSet<RequestId> = ids.iter().copied().map(RequestId::new).collect();

    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;
    let provisioner = CommandProvisioner::new(
        host.cluster.clone(),
        config.provisioning.commands.clone(),
        flags.debug,
    );
    let lifecycle = RequestLifecycle::new(&txn, &prompt, &provisioner, &config.accounts, &host);

    let report = lifecycle
        .approve_request(&ids, &Operator::from_env(), noemail)
        .await?;

    db::finish(txn, flags.debug).await?;
    print_report(&report);
    Ok(())
}

pub async fn cmd_automate(config: &Config, flags: Flags, noemail: bool) -> anyhow::Result<()> {
    let host = HostContext::detect(&config.cluster);
    let Some(cluster) = host.cluster.clone() else {
        anyhow::bail!(
            "You do not appear to be on a supported cluster: nodename is {}",
            host.nodename
        );
    };

    let store = open_store(config, flags).await?;
    let txn = store.begin().await?;
    let prompt = TerminalPrompt;
    let provisioner = CommandProvisioner::new(
        host.cluster.clone(),
        config.provisioning.commands.clone(),
        flags.debug,
    );
    let lifecycle = RequestLifecycle::new(&txn, &prompt, &provisioner, &config.accounts, &host);

    let report = lifecycle
        .automate_pending(&cluster, &Operator::from_env(), noemail)
        .await?;

    db::finish(txn, flags.debug).await?;
    print_report(&report);
    Ok(())
}
