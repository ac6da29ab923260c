//! Account request lifecycle: pending requests are created by the add flow and
//! approved (provisioned, then activated) by the create flow.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use sea_orm::ConnectionTrait;
use tracing::{debug, info, warn};

use crate::config::AccountsConfig;
use crate::db::repositories::request::{RequestInsert, ReservedFilter};
use crate::db::repositories::user::UserInsert;
use crate::db::{
    ContactRepository, ProjectRepository, RequestRepository, RequestRow, UserRepository,
};
use crate::domain::{AccountStatus, DuplicateKey, NewUser, Operator, ProjectBinding, RequestId};
use crate::entities::points_of_contact;
use crate::error::AccountError;
use crate::services::duplicates::{Decision, confirm_second_account, resolve_duplicates};
use crate::services::host::HostContext;
use crate::services::prompt::Prompt;
use crate::services::provisioning::{AccountProvisioner, ProvisionRequest};
use crate::services::username::allocate_mmm_username;
use crate::validation::validate_mmm_range;

/// Result of the interactive add-user flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Onboarding {
    Requested {
        request_id: RequestId,
        username: String,
        /// `false` when the request was attached to an existing account.
        new_user: bool,
    },
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved { username: String },
    AlreadyApproved { approver: String },
    ClusterMismatch { cluster: String, nodename: String },
    Failed { reason: String },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEntry {
    pub id: RequestId,
    pub outcome: ApprovalOutcome,
}

impl fmt::Display for ApprovalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id;
        match &self.outcome {
            ApprovalOutcome::Approved { username } => {
                write!(f, "Request id {id} approved, {username} is now active")
            }
            ApprovalOutcome::AlreadyApproved { approver } => {
                write!(f, "Request id {id} was already approved by {approver}")
            }
            ApprovalOutcome::ClusterMismatch { cluster, nodename } => {
                write!(f, "Request id {id} was for {cluster} and this is {nodename}")
            }
            ApprovalOutcome::Failed { reason } => write!(f, "Request id {id} failed: {reason}"),
            ApprovalOutcome::NotFound => write!(f, "Request id {id} not found"),
        }
    }
}

/// Per-request outcomes of one approval batch, in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalReport {
    pub entries: Vec<ApprovalEntry>,
}

impl ApprovalReport {
    fn push(&mut self, id: RequestId, outcome: ApprovalOutcome) {
        self.entries.push(ApprovalEntry { id, outcome });
    }

    #[must_use]
    pub fn approved(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ApprovalOutcome::Approved { .. }))
            .count()
    }

    #[must_use]
    pub fn outcome(&self, id: RequestId) -> Option<&ApprovalOutcome> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.outcome)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RequestLifecycle<'a, C> {
    conn: &'a C,
    prompt: &'a dyn Prompt,
    provisioner: &'a dyn AccountProvisioner,
    settings: &'a AccountsConfig,
    host: &'a HostContext,
}

impl<'a, C: ConnectionTrait> RequestLifecycle<'a, C> {
    #[must_use]
    pub const fn new(
        conn: &'a C,
        prompt: &'a dyn Prompt,
        provisioner: &'a dyn AccountProvisioner,
        settings: &'a AccountsConfig,
        host: &'a HostContext,
    ) -> Self {
        Self {
            conn,
            prompt,
            provisioner,
            settings,
            host,
        }
    }

    /// The supplied username, or the next free mmm one.
    pub async fn allocate_username(&self, supplied: Option<&str>) -> Result<String, AccountError> {
        match supplied {
            Some(username) if !username.is_empty() => Ok(username.to_string()),
            _ => {
                let username =
                    allocate_mmm_username(self.conn, &self.settings.mmm_user_schemas).await?;
                debug!("Allocated username {}", username);
                Ok(username)
            }
        }
    }

    /// Adds a pending membership for `username` and the request that will
    /// activate it.
    pub async fn create_request(
        &self,
        username: &str,
        user: &NewUser,
        binding: &ProjectBinding,
    ) -> Result<RequestId, AccountError> {
        ProjectRepository::new(self.conn)
            .add_member(
                username,
                &binding.project,
                &binding.poc_id,
                AccountStatus::Pending,
            )
            .await?;

        let poc_email = ContactRepository::new(self.conn)
            .email_for(&binding.poc_id)
            .await?
            .flatten()
            .ok_or_else(|| AccountError::not_found("Email for point of contact", &binding.poc_id))?;

        let request_id = RequestRepository::new(self.conn)
            .insert(&RequestInsert {
                username,
                email: &user.email,
                ssh_key: &user.ssh_key,
                poc_cc_email: Some(&poc_email),
                cluster: &binding.cluster,
            })
            .await?;

        info!(
            "Created request {} for {} on {}",
            request_id, username, binding.cluster
        );
        Ok(request_id)
    }

    /// Stores `candidate` as a pending user and requests its first project.
    pub async fn create_user_and_request(
        &self,
        candidate: &NewUser,
        binding: &ProjectBinding,
    ) -> Result<(String, RequestId), AccountError> {
        let username = self.allocate_username(candidate.username.as_deref()).await?;

        UserRepository::new(self.conn)
            .insert(&UserInsert {
                username: &username,
                given_name: &candidate.given_name,
                surname: candidate.surname.as_deref(),
                email: &candidate.email,
                ssh_key: &candidate.ssh_key,
                status: AccountStatus::Pending,
            })
            .await?;

        let request_id = self.create_request(&username, candidate, binding).await?;
        Ok((username, request_id))
    }

    /// The add-user flow: duplicate checks, then a new request for either a
    /// new or an existing account. `confirm` asks the operator before a new
    /// user is stored.
    pub async fn onboard(
        &self,
        candidate: &NewUser,
        binding: &ProjectBinding,
        confirm: bool,
    ) -> Result<Onboarding, AccountError> {
        if let Decision::Reject(username) =
            resolve_duplicates(self.conn, candidate, DuplicateKey::Username, self.prompt).await?
        {
            return Err(AccountError::DuplicateConflict(username));
        }

        match resolve_duplicates(self.conn, candidate, DuplicateKey::Email, self.prompt).await? {
            Decision::UseExisting(username) => {
                let request_id = self.create_request(&username, candidate, binding).await?;
                return Ok(Onboarding::Requested {
                    request_id,
                    username,
                    new_user: false,
                });
            }
            Decision::Abort => {
                info!("No second account requested");
                return Ok(Onboarding::Aborted);
            }
            Decision::Reject(username) => return Err(AccountError::DuplicateConflict(username)),
            Decision::CreateNew => {}
        }

        let username = self.allocate_username(candidate.username.as_deref()).await?;

        if confirm
            && !self.prompt.confirm(
                &format!(
                    "Do you want to create the user account with this information?\n    \
                     Username: {username}\n    Email: {}\n    SSH key: {}\n",
                    candidate.email, candidate.ssh_key
                ),
                true,
            )
        {
            info!("Entry rejected for {}", username);
            return Ok(Onboarding::Aborted);
        }

        let named = NewUser {
            username: Some(username),
            ..candidate.clone()
        };
        let (username, request_id) = self.create_user_and_request(&named, binding).await?;

        Ok(Onboarding::Requested {
            request_id,
            username,
            new_user: true,
        })
    }

    /// Picks the point of contact for a CSV batch. `None` means the operator
    /// chose none.
    pub async fn select_contact(&self, operator: &Operator) -> Result<Option<String>, AccountError> {
        let contacts = ContactRepository::new(self.conn);
        let own = contacts.find_by_username(operator.name()).await?;

        if let [only] = own.as_slice() {
            return Ok(Some(only.poc_id.clone()));
        }

        let question = "Please choose which point of contact ID to use for these user account requests.";

        if !own.is_empty() {
            if let Some(index) = self.prompt.choose(question, &describe_contacts(&own)) {
                return Ok(Some(own[index].poc_id.clone()));
            }
            println!("None chosen, showing all points of contact.");
        }

        let all = contacts.list_all().await?;
        Ok(self
            .prompt
            .choose(question, &describe_contacts(&all))
            .map(|index| all[index].poc_id.clone()))
    }

    /// Approves each id in ascending order. Per-request problems are reported
    /// and the batch moves on; datastore errors abort the whole batch.
    pub async fn approve_request(
        &self,
        ids: &BTreeSet<RequestId>,
        operator: &Operator,
        no_email: bool,
    ) -> Result<ApprovalReport, AccountError> {
        let wanted: Vec<RequestId> = ids.iter().copied().collect();
        let requests = RequestRepository::new(self.conn);
        let mut found: HashMap<i32, _> = requests
            .get_many(&wanted)
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        let mut report = ApprovalReport::default();

        for id in wanted {
            let Some(request) = found.remove(&id.value()) else {
                warn!("Request id {} not found", id);
                report.push(id, ApprovalOutcome::NotFound);
                continue;
            };

            if request.isdone {
                report.push(
                    id,
                    ApprovalOutcome::AlreadyApproved {
                        approver: request.approver.unwrap_or_default(),
                    },
                );
                continue;
            }

            if let Err(err) = validate_mmm_range(&request.username, self.settings.max_mmm_account) {
                warn!("Request id {}: {}", id, err);
                report.push(
                    id,
                    ApprovalOutcome::Failed {
                        reason: err.to_string(),
                    },
                );
                continue;
            }

            if !self.host.serves(&request.cluster) {
                warn!(
                    "Request id {} was for {} and this is {}",
                    id, request.cluster, self.host.nodename
                );
                report.push(
                    id,
                    ApprovalOutcome::ClusterMismatch {
                        cluster: request.cluster,
                        nodename: self.host.nodename.clone(),
                    },
                );
                continue;
            }

            let provision = ProvisionRequest {
                username: request.username.clone(),
                email: request.email,
                ssh_key: request.ssh_key,
                cc_email: request.poc_cc_email,
                no_email,
            };

            if let Err(err) = self.provisioner.provision(&provision).await {
                warn!("Request id {}: {}", id, err);
                report.push(
                    id,
                    ApprovalOutcome::Failed {
                        reason: err.to_string(),
                    },
                );
                continue;
            }

            requests.mark_done(id, operator.name()).await?;
            UserRepository::new(self.conn)
                .set_status(&request.username, AccountStatus::Active)
                .await?;
            let memberships = ProjectRepository::new(self.conn)
                .activate_pending(&request.username)
                .await?;

            info!(
                "Approved request {} for {} ({} membership(s) activated)",
                id, request.username, memberships
            );
            report.push(
                id,
                ApprovalOutcome::Approved {
                    username: request.username,
                },
            );
        }

        Ok(report)
    }

    /// Approves every open, non-test request for `cluster`.
    pub async fn automate_pending(
        &self,
        cluster: &str,
        operator: &Operator,
        no_email: bool,
    ) -> Result<ApprovalReport, AccountError> {
        let ids: BTreeSet<RequestId> = self
            .pending_requests(cluster)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();

        if ids.is_empty() {
            debug!("No automatable requests found for {}", cluster);
            return Ok(ApprovalReport::default());
        }

        self.approve_request(&ids, operator, no_email).await
    }

    pub async fn pending_requests(&self, cluster: &str) -> Result<Vec<RequestRow>, AccountError> {
        Ok(RequestRepository::new(self.conn)
            .open(
                cluster,
                &self.settings.reserved_request_ids,
                ReservedFilter::Exclude,
            )
            .await?)
    }

    pub async fn pending_test_requests(
        &self,
        cluster: &str,
    ) -> Result<Vec<RequestRow>, AccountError> {
        Ok(RequestRepository::new(self.conn)
            .open(
                cluster,
                &self.settings.reserved_request_ids,
                ReservedFilter::Only,
            )
            .await?)
    }

    pub async fn all_requests(&self) -> Result<Vec<RequestRow>, AccountError> {
        Ok(RequestRepository::new(self.conn).all().await?)
    }

    pub async fn recent_requests(&self, limit: u64) -> Result<Vec<RequestRow>, AccountError> {
        Ok(RequestRepository::new(self.conn).recent(limit).await?)
    }

    /// Creates an active account directly, bypassing the request queue.
    /// Returns `None` if the operator declined a second account for the email.
    pub async fn create_active_user(
        &self,
        candidate: &NewUser,
        binding: &ProjectBinding,
        cc_email: Option<&str>,
        no_email: bool,
    ) -> Result<Option<String>, AccountError> {
        if let Decision::Reject(username) =
            resolve_duplicates(self.conn, candidate, DuplicateKey::Username, self.prompt).await?
        {
            return Err(AccountError::DuplicateConflict(username));
        }

        if confirm_second_account(self.conn, &candidate.email, self.prompt).await?
            == Decision::Abort
        {
            info!("No second account requested");
            return Ok(None);
        }

        let username = self.allocate_username(candidate.username.as_deref()).await?;
        validate_mmm_range(&username, self.settings.max_mmm_account)?;

        UserRepository::new(self.conn)
            .insert(&UserInsert {
                username: &username,
                given_name: &candidate.given_name,
                surname: candidate.surname.as_deref(),
                email: &candidate.email,
                ssh_key: &candidate.ssh_key,
                status: AccountStatus::Active,
            })
            .await?;
        ProjectRepository::new(self.conn)
            .add_member(
                &username,
                &binding.project,
                &binding.poc_id,
                AccountStatus::Active,
            )
            .await?;

        self.provisioner
            .provision(&ProvisionRequest {
                username: username.clone(),
                email: candidate.email.clone(),
                ssh_key: candidate.ssh_key.clone(),
                cc_email: cc_email.map(str::to_string),
                no_email,
            })
            .await?;

        info!("Created active account {}", username);
        Ok(Some(username))
    }
}

fn describe_contacts(contacts: &[points_of_contact::Model]) -> Vec<String> {
    contacts
        .iter()
        .map(|c| {
            format!(
                "{}, {} {}, {}, status: {}",
                c.poc_id,
                c.poc_givenname,
                c.poc_surname.as_deref().unwrap_or(""),
                c.institute,
                c.status
            )
        })
        .collect()
}
