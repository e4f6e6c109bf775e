//! Client-side synchronization for the company directory: a normalized HTTP
//! resource client plus the list and create-form controllers built on it.

use shared::domain::{Company, CompanyId};

pub mod error;
pub mod form_controller;
pub mod list_controller;
pub mod refresh;
pub mod resource_client;

pub use error::RequestError;
pub use form_controller::{
    CompanyFormController, FormField, FormPhase, FormState, FormTransitionError, SubmitOutcome,
    VALIDATION_MESSAGE,
};
pub use list_controller::{
    CollectionState, CompanyListController, DeleteOutcome, ListView, LoadStatus,
    DELETE_CONFIRMATION_PROMPT,
};
pub use refresh::{RefreshSignal, RefreshTrigger};
pub use resource_client::{
    CompanyApi, DeleteAck, HttpCompanyClient, Operation, DEFAULT_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Blocking yes/no prompt consulted before destructive actions.
pub trait ConfirmationGate: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Gate that approves everything, for non-interactive callers.
pub struct AutoConfirm;

impl ConfirmationGate for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub enum DirectoryEvent {
    ListChanged(CollectionState),
    FormChanged(FormState),
    CompanyCreated(Company),
    CompanyDeleted(CompanyId),
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/sync_flow_tests.rs"]
mod sync_flow_tests;
