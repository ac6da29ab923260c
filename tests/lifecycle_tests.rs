//! Request lifecycle flows against an in-memory database.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use thomas::config::AccountsConfig;
use thomas::db::repositories::contact::ContactInsert;
use thomas::db::repositories::user::UserInsert;
use thomas::db::{
    ContactRepository, InstituteRepository, ProjectRepository, RequestRepository, Store,
    UserRepository,
};
use thomas::domain::{AccountStatus, NewUser, Operator, ProjectBinding, RequestId};
use thomas::entities::prelude::{ProjectUsers, Requests, Users};
use thomas::error::AccountError;
use thomas::services::prompt::{Answer, ScriptedPrompt};
use thomas::services::{
    AccountProvisioner, ApprovalOutcome, HostContext, Onboarding, ProvisionError,
    ProvisionRequest, RequestLifecycle,
};

#[derive(Default)]
struct RecordingProvisioner {
    calls: Mutex<Vec<ProvisionRequest>>,
    fail_for: Option<String>,
}

impl RecordingProvisioner {
    fn failing_for(username: &str) -> Self {
        Self {
            fail_for: Some(username.to_string()),
            ..Self::default()
        }
    }

    fn usernames(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.username.clone())
            .collect()
    }
}

#[async_trait]
impl AccountProvisioner for RecordingProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), ProvisionError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail_for.as_deref() == Some(request.username.as_str()) {
            return Err(ProvisionError::Exit {
                command: "createThomasuser".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

struct Fixture {
    store: Store,
    settings: AccountsConfig,
    host: HostContext,
    prompt: ScriptedPrompt,
    provisioner: RecordingProvisioner,
}

impl Fixture {
    async fn new() -> Self {
        let store = Store::new("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");

        InstituteRepository::new(&store.conn)
            .add("Inst", "Institute of Testing")
            .await
            .unwrap();
        ProjectRepository::new(&store.conn)
            .add_project("Proj1", "Inst")
            .await
            .unwrap();
        ContactRepository::new(&store.conn)
            .add(&ContactInsert {
                poc_id: "PoC_Inst",
                given_name: "Pat",
                surname: Some("Contact"),
                email: "poc@inst.edu",
                institute: "Inst",
                username: Some("ccspapp"),
            })
            .await
            .unwrap();

        Self {
            store,
            settings: AccountsConfig::default(),
            host: HostContext::new("login01.thomas.example", &["thomas".to_string()]),
            prompt: ScriptedPrompt::default(),
            provisioner: RecordingProvisioner::default(),
        }
    }

    fn with_answers(mut self, answers: impl IntoIterator<Item = Answer>) -> Self {
        self.prompt = ScriptedPrompt::new(answers);
        self
    }

    fn with_provisioner(mut self, provisioner: RecordingProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    fn conn(&self) -> &DatabaseConnection {
        &self.store.conn
    }

    fn lifecycle(&self) -> RequestLifecycle<'_, DatabaseConnection> {
        RequestLifecycle::new(
            &self.store.conn,
            &self.prompt,
            &self.provisioner,
            &self.settings,
            &self.host,
        )
    }

    async fn existing_user(&self, username: &str, email: &str) {
        UserRepository::new(self.conn())
            .insert(&UserInsert {
                username,
                given_name: "Existing",
                surname: None,
                email,
                ssh_key: "ssh-ed25519 AAAA existing",
                status: AccountStatus::Active,
            })
            .await
            .unwrap();
    }

    async fn counts(&self) -> (u64, u64, u64) {
        (
            Users::find().count(self.conn()).await.unwrap(),
            ProjectUsers::find().count(self.conn()).await.unwrap(),
            Requests::find().count(self.conn()).await.unwrap(),
        )
    }
}

fn candidate(email: &str) -> NewUser {
    NewUser {
        username: None,
        given_name: "Alice".to_string(),
        surname: Some("Smith".to_string()),
        email: email.to_string(),
        ssh_key: "ssh-ed25519 AAAAC3Nz alice@laptop".to_string(),
    }
}

fn binding(cluster: &str) -> ProjectBinding {
    ProjectBinding {
        project: "Proj1".to_string(),
        poc_id: "PoC_Inst".to_string(),
        cluster: cluster.to_string(),
    }
}

fn operator() -> Operator {
    Operator::new("ccspapp")
}

async fn request_for(fx: &Fixture, email: &str, cluster: &str) -> (String, RequestId) {
    match fx
        .lifecycle()
        .onboard(&candidate(email), &binding(cluster), false)
        .await
        .unwrap()
    {
        Onboarding::Requested {
            request_id,
            username,
            ..
        } => (username, request_id),
        Onboarding::Aborted => panic!("onboarding aborted"),
    }
}

#[tokio::test]
async fn new_user_gets_next_mmm_username_and_pending_request() {
    let fx = Fixture::new().await;
    fx.existing_user("mmm0042", "someone@else.edu").await;

    let outcome = fx
        .lifecycle()
        .onboard(&candidate("alice@inst.edu"), &binding("thomas"), false)
        .await
        .unwrap();

    let Onboarding::Requested {
        request_id,
        username,
        new_user,
    } = outcome
    else {
        panic!("expected a request");
    };
    assert_eq!(username, "mmm0043");
    assert!(new_user);
    assert!(request_id.value() > 0);

    let user = UserRepository::new(fx.conn())
        .get("mmm0043")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, "pending");
    assert_eq!(user.email, "alice@inst.edu");

    let memberships = ProjectRepository::new(fx.conn())
        .memberships("mmm0043")
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].status, "pending");
    assert_eq!(memberships[0].poc_id, "PoC_Inst");

    let requests = RequestRepository::new(fx.conn())
        .get_many(&[request_id])
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].isdone);
    assert_eq!(requests[0].poc_cc_email.as_deref(), Some("poc@inst.edu"));
    assert_eq!(requests[0].cluster, "thomas");
}

#[tokio::test]
async fn first_mmm_username_is_0001() {
    let fx = Fixture::new().await;
    let (username, _) = request_for(&fx, "alice@inst.edu", "thomas").await;
    assert_eq!(username, "mmm0001");
}

#[tokio::test]
async fn operator_can_decline_the_new_user() {
    let fx = Fixture::new()
        .await
        .with_answers([Answer::Confirm(false)]);

    let outcome = fx
        .lifecycle()
        .onboard(&candidate("alice@inst.edu"), &binding("thomas"), true)
        .await
        .unwrap();

    assert_eq!(outcome, Onboarding::Aborted);
    assert_eq!(fx.counts().await, (0, 0, 0));
    assert!(fx.prompt.asked()[0].contains("Username: mmm0001"));
}

#[tokio::test]
async fn automate_approves_every_pending_request() {
    let fx = Fixture::new().await;
    let (first, first_id) = request_for(&fx, "alice@inst.edu", "thomas").await;
    let (second, second_id) = request_for(&fx, "bob@inst.edu", "thomas").await;

    let report = fx
        .lifecycle()
        .automate_pending("thomas", &operator(), false)
        .await
        .unwrap();

    assert_eq!(report.approved(), 2);
    assert_eq!(
        report.entries.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![first_id, second_id]
    );
    assert_eq!(fx.provisioner.usernames(), vec![first.clone(), second.clone()]);

    let calls = fx.provisioner.calls.lock().unwrap().clone();
    assert_eq!(calls[0].cc_email.as_deref(), Some("poc@inst.edu"));
    assert!(!calls[0].no_email);

    let users = UserRepository::new(fx.conn());
    let projects = ProjectRepository::new(fx.conn());
    for username in [&first, &second] {
        assert_eq!(users.get(username).await.unwrap().unwrap().status, "active");
        let memberships = projects.memberships(username).await.unwrap();
        assert!(memberships.iter().all(|m| m.status == "active"));
    }

    let requests = RequestRepository::new(fx.conn())
        .get_many(&[first_id, second_id])
        .await
        .unwrap();
    assert!(requests.iter().all(|r| r.isdone));
    assert!(requests.iter().all(|r| r.approver.as_deref() == Some("ccspapp")));
    assert!(requests.iter().all(|r| r.modification_date.is_some()));
}

#[tokio::test]
async fn approving_twice_reports_already_approved() {
    let fx = Fixture::new().await;
    let (_, id) = request_for(&fx, "alice@inst.edu", "thomas").await;
    let ids = BTreeSet::from([id]);

    let first = fx
        .lifecycle()
        .approve_request(&ids, &operator(), false)
        .await
        .unwrap();
    assert_eq!(first.approved(), 1);

    let second = fx
        .lifecycle()
        .approve_request(&ids, &Operator::new("someone"), false)
        .await
        .unwrap();
    assert_eq!(
        second.outcome(id),
        Some(&ApprovalOutcome::AlreadyApproved {
            approver: "ccspapp".to_string()
        })
    );
    assert_eq!(fx.provisioner.usernames().len(), 1);
}

#[tokio::test]
async fn duplicate_username_is_rejected_without_prompting() {
    let fx = Fixture::new().await;
    fx.existing_user("ccaaxyz", "x@ucl.ac.uk").await;
    let before = fx.counts().await;

    let mut user = candidate("other@inst.edu");
    user.username = Some("ccaaxyz".to_string());

    let err = fx
        .lifecycle()
        .onboard(&user, &binding("thomas"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::DuplicateConflict(ref u) if u == "ccaaxyz"));
    assert!(fx.prompt.asked().is_empty());
    assert_eq!(fx.counts().await, before);
}

#[tokio::test]
async fn duplicate_email_declined_changes_nothing() {
    let fx = Fixture::new()
        .await
        .with_answers([Answer::Choose(None), Answer::Confirm(false)]);
    fx.existing_user("mmm0007", "alice@inst.edu").await;
    let before = fx.counts().await;

    let outcome = fx
        .lifecycle()
        .onboard(&candidate("alice@inst.edu"), &binding("thomas"), false)
        .await
        .unwrap();

    assert_eq!(outcome, Onboarding::Aborted);
    assert_eq!(fx.counts().await, before);
    assert_eq!(fx.prompt.asked().len(), 2);
}

#[tokio::test]
async fn duplicate_email_can_create_second_account() {
    let fx = Fixture::new()
        .await
        .with_answers([Answer::Choose(None), Answer::Confirm(true)]);
    fx.existing_user("mmm0007", "alice@inst.edu").await;

    let outcome = fx
        .lifecycle()
        .onboard(&candidate("alice@inst.edu"), &binding("thomas"), false)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Onboarding::Requested { ref username, new_user: true, .. } if username == "mmm0008"
    ));
}

#[tokio::test]
async fn duplicate_email_can_reuse_existing_account() {
    let fx = Fixture::new().await.with_answers([Answer::Choose(Some(0))]);
    fx.existing_user("mmm0007", "alice@inst.edu").await;

    let outcome = fx
        .lifecycle()
        .onboard(&candidate("alice@inst.edu"), &binding("thomas"), false)
        .await
        .unwrap();

    let Onboarding::Requested {
        username, new_user, ..
    } = outcome
    else {
        panic!("expected a request");
    };
    assert_eq!(username, "mmm0007");
    assert!(!new_user);

    let (users, memberships, requests) = fx.counts().await;
    assert_eq!((users, memberships, requests), (1, 1, 1));
}

#[tokio::test]
async fn provisioning_failure_leaves_request_pending() {
    let fx = Fixture::new().await;
    let (failing, failing_id) = request_for(&fx, "alice@inst.edu", "thomas").await;
    let (_, ok_id) = request_for(&fx, "bob@inst.edu", "thomas").await;
    let fx = fx.with_provisioner(RecordingProvisioner::failing_for(&failing));

    let report = fx
        .lifecycle()
        .approve_request(&BTreeSet::from([failing_id, ok_id]), &operator(), false)
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(failing_id),
        Some(ApprovalOutcome::Failed { .. })
    ));
    assert!(matches!(
        report.outcome(ok_id),
        Some(ApprovalOutcome::Approved { .. })
    ));

    let user = UserRepository::new(fx.conn())
        .get(&failing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, "pending");

    let request = RequestRepository::new(fx.conn())
        .get_many(&[failing_id])
        .await
        .unwrap();
    assert!(!request[0].isdone);
    assert_eq!(request[0].approver, None);
}

#[tokio::test]
async fn cluster_mismatch_does_not_stop_the_batch() {
    let fx = Fixture::new().await;
    let (_, young_id) = request_for(&fx, "alice@inst.edu", "young").await;
    let (_, thomas_id) = request_for(&fx, "bob@inst.edu", "thomas").await;
    let missing = RequestId::new(999);

    let report = fx
        .lifecycle()
        .approve_request(
            &BTreeSet::from([missing, thomas_id, young_id]),
            &operator(),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        report.outcome(young_id),
        Some(&ApprovalOutcome::ClusterMismatch {
            cluster: "young".to_string(),
            nodename: "login01.thomas.example".to_string(),
        })
    );
    assert!(matches!(
        report.outcome(thomas_id),
        Some(ApprovalOutcome::Approved { .. })
    ));
    assert_eq!(report.outcome(missing), Some(&ApprovalOutcome::NotFound));
    assert_eq!(report.entries.last().map(|e| e.id), Some(missing));
}

#[tokio::test]
async fn out_of_range_mmm_username_is_not_provisioned() {
    let mut fx = Fixture::new().await;
    fx.settings.max_mmm_account = 1;
    let (_, first) = request_for(&fx, "alice@inst.edu", "thomas").await;
    let (_, second) = request_for(&fx, "bob@inst.edu", "thomas").await;

    let report = fx
        .lifecycle()
        .approve_request(&BTreeSet::from([first, second]), &operator(), false)
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(first),
        Some(ApprovalOutcome::Approved { .. })
    ));
    assert!(matches!(
        report.outcome(second),
        Some(ApprovalOutcome::Failed { reason }) if reason.contains("mmm0002")
    ));
    assert_eq!(fx.provisioner.usernames(), vec!["mmm0001"]);
}

#[tokio::test]
async fn reserved_requests_are_left_out_of_automation() {
    let mut fx = Fixture::new().await;
    let (_, real) = request_for(&fx, "alice@inst.edu", "thomas").await;
    let (_, reserved) = request_for(&fx, "tester@inst.edu", "thomas").await;
    fx.settings.reserved_request_ids = vec![reserved.value()];

    let lifecycle = fx.lifecycle();
    let pending = lifecycle.pending_requests("thomas").await.unwrap();
    assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![real]);
    assert_eq!(pending[0].givenname, "Alice");

    let tests = lifecycle.pending_test_requests("thomas").await.unwrap();
    assert_eq!(tests.iter().map(|r| r.id).collect::<Vec<_>>(), vec![reserved]);

    let report = lifecycle
        .automate_pending("thomas", &operator(), true)
        .await
        .unwrap();
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.outcome(real), Some(&ApprovalOutcome::Approved {
        username: "mmm0001".to_string()
    }));
    assert!(fx.provisioner.calls.lock().unwrap()[0].no_email);

    assert_eq!(lifecycle.all_requests().await.unwrap().len(), 2);
    assert_eq!(lifecycle.recent_requests(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn contact_without_email_is_not_found() {
    let fx = Fixture::new().await;
    let mut binding = binding("thomas");
    binding.poc_id = "Nobody_Inst".to_string();

    let err = fx
        .lifecycle()
        .create_user_and_request(&candidate("alice@inst.edu"), &binding)
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::NotFound(_)));
}

#[tokio::test]
async fn operator_with_one_contact_record_is_used_directly() {
    let fx = Fixture::new().await;

    let chosen = fx.lifecycle().select_contact(&operator()).await.unwrap();

    assert_eq!(chosen.as_deref(), Some("PoC_Inst"));
    assert!(fx.prompt.asked().is_empty());
}

#[tokio::test]
async fn other_operators_choose_from_all_contacts() {
    let fx = Fixture::new().await.with_answers([Answer::Choose(None)]);

    let chosen = fx
        .lifecycle()
        .select_contact(&Operator::new("stranger"))
        .await
        .unwrap();

    assert_eq!(chosen, None);
    assert_eq!(fx.prompt.asked().len(), 1);
}

#[tokio::test]
async fn create_active_user_provisions_immediately() {
    let fx = Fixture::new().await;

    let username = fx
        .lifecycle()
        .create_active_user(
            &candidate("alice@inst.edu"),
            &binding("thomas"),
            Some("cc@inst.edu"),
            true,
        )
        .await
        .unwrap();

    assert_eq!(username.as_deref(), Some("mmm0001"));
    let user = UserRepository::new(fx.conn())
        .get("mmm0001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, "active");

    let memberships = ProjectRepository::new(fx.conn())
        .memberships("mmm0001")
        .await
        .unwrap();
    assert_eq!(memberships[0].status, "active");

    let calls = fx.provisioner.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cc_email.as_deref(), Some("cc@inst.edu"));
    assert!(calls[0].no_email);
}

#[tokio::test]
async fn create_active_user_fails_when_provisioning_fails() {
    let fx = Fixture::new()
        .await
        .with_provisioner(RecordingProvisioner::failing_for("mmm0001"));

    let err = fx
        .lifecycle()
        .create_active_user(&candidate("alice@inst.edu"), &binding("thomas"), None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::Provisioning(_)));
}

#[tokio::test]
async fn create_active_user_stops_when_second_account_declined() {
    let fx = Fixture::new().await.with_answers([Answer::Confirm(false)]);
    fx.existing_user("mmm0005", "alice@inst.edu").await;

    let created = fx
        .lifecycle()
        .create_active_user(&candidate("alice@inst.edu"), &binding("thomas"), None, false)
        .await
        .unwrap();

    assert_eq!(created, None);
    assert!(fx.provisioner.usernames().is_empty());
}

#[tokio::test]
async fn uncommitted_work_is_rolled_back() {
    let fx = Fixture::new().await;

    let txn = fx.store.begin().await.unwrap();
    let lifecycle = RequestLifecycle::new(&txn, &fx.prompt, &fx.provisioner, &fx.settings, &fx.host);
    lifecycle
        .create_user_and_request(&candidate("alice@inst.edu"), &binding("thomas"))
        .await
        .unwrap();
    thomas::db::finish(txn, true).await.unwrap();

    assert_eq!(fx.counts().await, (0, 0, 0));
}
