//! Entry form for adding one company.

use std::sync::Arc;

use shared::domain::{Company, CompanyDraft};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::RequestError, refresh::RefreshTrigger, resource_client::CompanyApi, DirectoryEvent,
    EVENT_CHANNEL_CAPACITY,
};

pub const VALIDATION_MESSAGE: &str = "Both name and location are required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Closed,
    Open,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    phase: FormPhase,
    name: String,
    location: String,
    error: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            phase: FormPhase::Closed,
            name: String::new(),
            location: String::new(),
            error: None,
        }
    }
}

impl FormState {
    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != FormPhase::Closed
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the submit action should be offered at all.
    pub fn can_submit(&self) -> bool {
        self.phase == FormPhase::Open && self.trimmed_draft().is_some()
    }

    fn trimmed_draft(&self) -> Option<CompanyDraft> {
        let name = self.name.trim();
        let location = self.location.trim();
        if name.is_empty() || location.is_empty() {
            return None;
        }
        Some(CompanyDraft::new(name, location))
    }

    fn reset(&mut self, phase: FormPhase) {
        *self = Self {
            phase,
            ..Self::default()
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormTransitionError {
    #[error("form is already open")]
    AlreadyOpen,
    #[error("form is not open")]
    NotOpen,
    #[error("a submission is in flight")]
    SubmitInFlight,
    #[error("form controller has been detached")]
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Company),
    /// A field was empty after trimming; no request was made.
    Invalid,
    Failed(RequestError),
    /// The controller was detached before the call resolved.
    Discarded,
}

struct FormControllerState {
    form: FormState,
    attached: bool,
}

pub struct CompanyFormController {
    api: Arc<dyn CompanyApi>,
    trigger: RefreshTrigger,
    inner: Mutex<FormControllerState>,
    events: broadcast::Sender<DirectoryEvent>,
}

impl CompanyFormController {
    pub fn new(api: Arc<dyn CompanyApi>, trigger: RefreshTrigger) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            trigger,
            inner: Mutex::new(FormControllerState {
                form: FormState::default(),
                attached: true,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> FormState {
        self.inner.lock().await.form.clone()
    }

    pub async fn open(&self) -> Result<(), FormTransitionError> {
        let mut guard = self.inner.lock().await;
        ensure_attached(&guard)?;
        match guard.form.phase {
            FormPhase::Closed => {
                guard.form.reset(FormPhase::Open);
                self.publish(&guard.form);
                Ok(())
            }
            FormPhase::Open => Err(FormTransitionError::AlreadyOpen),
            FormPhase::Submitting => Err(FormTransitionError::SubmitInFlight),
        }
    }

    pub async fn update_field(
        &self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<(), FormTransitionError> {
        let mut guard = self.inner.lock().await;
        ensure_attached(&guard)?;
        match guard.form.phase {
            FormPhase::Open => {
                let value = value.into();
                match field {
                    FormField::Name => guard.form.name = value,
                    FormField::Location => guard.form.location = value,
                }
                self.publish(&guard.form);
                Ok(())
            }
            FormPhase::Closed => Err(FormTransitionError::NotOpen),
            FormPhase::Submitting => Err(FormTransitionError::SubmitInFlight),
        }
    }

    /// Validates the trimmed fields and creates the company. Success closes
    /// the form and bumps the refresh trigger; failure reopens it with the
    /// entered values intact.
    pub async fn submit(&self) -> Result<SubmitOutcome, FormTransitionError> {
        let draft = {
            let mut guard = self.inner.lock().await;
            ensure_attached(&guard)?;
            match guard.form.phase {
                FormPhase::Open => {}
                FormPhase::Closed => return Err(FormTransitionError::NotOpen),
                FormPhase::Submitting => return Err(FormTransitionError::SubmitInFlight),
            }
            let Some(draft) = guard.form.trimmed_draft() else {
                guard.form.error = Some(VALIDATION_MESSAGE.to_string());
                self.publish(&guard.form);
                return Ok(SubmitOutcome::Invalid);
            };
            guard.form.phase = FormPhase::Submitting;
            guard.form.error = None;
            self.publish(&guard.form);
            draft
        };

        let result = self.api.create(&draft).await;

        let mut guard = self.inner.lock().await;
        if !guard.attached {
            debug!("form: dropping create result for detached controller");
            return Ok(SubmitOutcome::Discarded);
        }
        let outcome = match result {
            Ok(company) => {
                info!(company_id = company.id.0, "form: company created");
                guard.form.reset(FormPhase::Closed);
                let generation = self.trigger.bump();
                debug!(generation, "form: refresh trigger bumped");
                let _ = self
                    .events
                    .send(DirectoryEvent::CompanyCreated(company.clone()));
                SubmitOutcome::Created(company)
            }
            Err(err) => {
                warn!(status = err.status(), "form: create failed: {err}");
                guard.form.phase = FormPhase::Open;
                guard.form.error = Some(err.message().to_string());
                SubmitOutcome::Failed(err)
            }
        };
        self.publish(&guard.form);
        Ok(outcome)
    }

    /// Closes and resets the form. Refused while a submission is in flight,
    /// leaving the state untouched.
    pub async fn close(&self) -> Result<(), FormTransitionError> {
        let mut guard = self.inner.lock().await;
        ensure_attached(&guard)?;
        if guard.form.phase == FormPhase::Submitting {
            debug!("form: close ignored while submitting");
            return Err(FormTransitionError::SubmitInFlight);
        }
        guard.form.reset(FormPhase::Closed);
        self.publish(&guard.form);
        Ok(())
    }

    pub async fn cancel(&self) -> Result<(), FormTransitionError> {
        self.close().await
    }

    /// Tears the form down; a create still in flight resolves into nothing.
    pub async fn detach(&self) {
        let mut guard = self.inner.lock().await;
        guard.attached = false;
    }

    fn publish(&self, form: &FormState) {
        let _ = self.events.send(DirectoryEvent::FormChanged(form.clone()));
    }
}

fn ensure_attached(state: &FormControllerState) -> Result<(), FormTransitionError> {
    if state.attached {
        Ok(())
    } else {
        Err(FormTransitionError::Detached)
    }
}

#[cfg(test)]
#[path = "tests/form_controller_tests.rs"]
mod tests;
