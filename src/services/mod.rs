pub mod duplicates;
pub use duplicates::{Decision, confirm_second_account, resolve_duplicates};

pub mod host;
pub use host::HostContext;

pub mod lifecycle;
pub use lifecycle::{ApprovalEntry, ApprovalOutcome, ApprovalReport, Onboarding, RequestLifecycle};

pub mod notifier;
pub use notifier::{Announcement, Notifier, NotifyError};

pub mod prompt;
pub use prompt::{Prompt, TerminalPrompt};

pub mod provisioning;
pub use provisioning::{AccountProvisioner, CommandProvisioner, ProvisionError, ProvisionRequest};

pub mod username;
pub use username::{allocate_mmm_username, next_mmm_username};
