//! Local mirror of the remote company collection and its derived view state.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use shared::domain::{Company, CompanyId};
use tokio::{
    sync::{broadcast, Mutex},
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, info, warn};

use crate::{
    error::RequestError,
    refresh::RefreshSignal,
    resource_client::CompanyApi,
    ConfirmationGate, DirectoryEvent, EVENT_CHANNEL_CAPACITY,
};

pub const DELETE_CONFIRMATION_PROMPT: &str = "Are you sure you want to delete this company?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed,
}

/// What the list should present, derived from [`CollectionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    Loading,
    Error(String),
    Empty,
    Populated(Vec<Company>),
}

impl ListView {
    pub fn heading(&self) -> String {
        match self {
            ListView::Empty => "Companies (0)".to_string(),
            ListView::Populated(records) => format!("Companies ({})", records.len()),
            ListView::Loading | ListView::Error(_) => "Companies".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState {
    records: Vec<Company>,
    load_status: LoadStatus,
    load_error: Option<String>,
    deleting_id: Option<CompanyId>,
    delete_error: Option<String>,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            load_status: LoadStatus::Loading,
            load_error: None,
            deleting_id: None,
            delete_error: None,
        }
    }
}

impl CollectionState {
    pub fn records(&self) -> &[Company] {
        &self.records
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    /// Message of the last failed list fetch; present only while `Failed`.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn deleting_id(&self) -> Option<CompanyId> {
        self.deleting_id
    }

    /// Message of the last failed delete, shown alongside the list.
    pub fn delete_error(&self) -> Option<&str> {
        self.delete_error.as_deref()
    }

    pub fn is_deleting(&self, id: CompanyId) -> bool {
        self.deleting_id == Some(id)
    }

    pub fn view(&self) -> ListView {
        match self.load_status {
            LoadStatus::Loading => ListView::Loading,
            LoadStatus::Failed => ListView::Error(self.load_error.clone().unwrap_or_default()),
            LoadStatus::Ready if self.records.is_empty() => ListView::Empty,
            LoadStatus::Ready => ListView::Populated(self.records.clone()),
        }
    }

    fn begin_load(&mut self) {
        self.load_status = LoadStatus::Loading;
        self.load_error = None;
        self.delete_error = None;
    }

    fn finish_load(&mut self, records: Vec<Company>) {
        self.records = records;
        self.load_status = LoadStatus::Ready;
    }

    fn fail_load(&mut self, message: &str) {
        self.records.clear();
        self.load_status = LoadStatus::Failed;
        self.load_error = Some(message.to_string());
    }

    fn clear_transient(&mut self) {
        self.deleting_id = None;
        self.delete_error = None;
    }

    fn remove_record(&mut self, id: CompanyId) -> bool {
        let before = self.records.len();
        self.records.retain(|company| company.id != id);
        self.records.len() != before
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The confirmation gate said no; nothing was sent.
    Declined,
    Deleted,
    Failed(RequestError),
    /// The controller was unmounted before the call resolved.
    Discarded,
}

struct ListControllerState {
    collection: CollectionState,
    mounted: bool,
    /// Bumped on every mount; calls started under an older epoch are stale.
    epoch: u64,
}

impl ListControllerState {
    fn accepts(&self, epoch: u64) -> bool {
        self.mounted && self.epoch == epoch
    }
}

pub struct CompanyListController {
    api: Arc<dyn CompanyApi>,
    confirm: Arc<dyn ConfirmationGate>,
    signal: Mutex<RefreshSignal>,
    inner: Mutex<ListControllerState>,
    listeners: StdMutex<Vec<AbortHandle>>,
    events: broadcast::Sender<DirectoryEvent>,
}

impl CompanyListController {
    pub fn new(
        api: Arc<dyn CompanyApi>,
        confirm: Arc<dyn ConfirmationGate>,
        signal: RefreshSignal,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            confirm,
            signal: Mutex::new(signal),
            inner: Mutex::new(ListControllerState {
                collection: CollectionState::default(),
                mounted: false,
                epoch: 0,
            }),
            listeners: StdMutex::new(Vec::new()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> CollectionState {
        self.inner.lock().await.collection.clone()
    }

    pub async fn view(&self) -> ListView {
        self.inner.lock().await.collection.view()
    }

    /// Attaches the controller and performs the initial fetch. Transient
    /// delete state left over from a previous mount is cleared.
    pub async fn mount(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.mounted = true;
            guard.epoch += 1;
            guard.collection.clear_transient();
        }
        self.signal.lock().await.mark_seen();
        self.refresh().await;
    }

    /// Detaches the controller; results of calls still in flight are dropped
    /// and refresh listeners are stopped.
    pub async fn unmount(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.mounted = false;
        }
        let listeners = std::mem::take(
            &mut *self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for listener in listeners {
            listener.abort();
        }
        debug!("list: controller unmounted");
    }

    pub async fn is_mounted(&self) -> bool {
        self.inner.lock().await.mounted
    }

    /// Re-fetches the whole collection, replacing `records` on success and
    /// discarding them on failure.
    pub async fn refresh(&self) {
        let epoch = {
            let mut guard = self.inner.lock().await;
            if !guard.mounted {
                debug!("list: refresh ignored, controller not mounted");
                return;
            }
            guard.collection.begin_load();
            self.publish(&guard.collection);
            guard.epoch
        };

        let result = self.api.list_all().await;

        let mut guard = self.inner.lock().await;
        if !guard.accepts(epoch) {
            debug!("list: dropping fetch result for unmounted controller");
            return;
        }
        match result {
            Ok(records) => {
                info!(count = records.len(), "list: companies loaded");
                guard.collection.finish_load(records);
            }
            Err(err) => {
                warn!(status = err.status(), "list: fetch failed: {err}");
                guard.collection.fail_load(err.message());
            }
        }
        self.publish(&guard.collection);
    }

    /// User-initiated retry after a failed load.
    pub async fn retry(&self) {
        self.refresh().await;
    }

    /// Re-fetches if the refresh trigger moved since it was last observed.
    /// Returns whether a fetch was performed.
    pub async fn sync_with_trigger(&self) -> bool {
        let changed = self.signal.lock().await.take_change();
        match changed {
            Some(generation) => {
                debug!(generation, "list: refresh trigger changed");
                self.refresh().await;
                true
            }
            None => false,
        }
    }

    /// Spawns a task that re-fetches on every trigger bump until the
    /// controller is unmounted or every trigger is dropped. `unmount` aborts
    /// the task, so a remounted controller needs a new listener.
    pub fn spawn_refresh_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut signal = controller.signal.lock().await.clone();
            while signal.changed().await.is_some() {
                if !controller.is_mounted().await {
                    break;
                }
                controller.sync_with_trigger().await;
            }
            debug!("list: refresh listener stopped");
        });
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| !listener.is_finished());
        listeners.push(handle.abort_handle());
        handle
    }

    /// Deletes one company after confirmation. On success the record is
    /// removed locally without a re-fetch.
    ///
    /// Deletes are not serialized: a second call overwrites `deleting_id`,
    /// the first resolution clears it, and removals apply in arrival order.
    pub async fn delete(&self, id: CompanyId) -> DeleteOutcome {
        if !self.confirm.confirm(DELETE_CONFIRMATION_PROMPT) {
            info!(company_id = id.0, "list: delete declined");
            return DeleteOutcome::Declined;
        }

        let epoch = {
            let mut guard = self.inner.lock().await;
            if !guard.mounted {
                debug!(company_id = id.0, "list: delete ignored, controller not mounted");
                return DeleteOutcome::Discarded;
            }
            guard.collection.deleting_id = Some(id);
            guard.collection.delete_error = None;
            self.publish(&guard.collection);
            guard.epoch
        };

        let result = self.api.delete(id).await;

        let mut guard = self.inner.lock().await;
        if !guard.accepts(epoch) {
            debug!(company_id = id.0, "list: dropping delete result for unmounted controller");
            return DeleteOutcome::Discarded;
        }
        guard.collection.deleting_id = None;
        let outcome = match result {
            Ok(_) => {
                let removed = guard.collection.remove_record(id);
                info!(company_id = id.0, removed, "list: company deleted");
                let _ = self.events.send(DirectoryEvent::CompanyDeleted(id));
                DeleteOutcome::Deleted
            }
            Err(err) => {
                warn!(company_id = id.0, status = err.status(), "list: delete failed: {err}");
                guard.collection.delete_error = Some(err.message().to_string());
                DeleteOutcome::Failed(err)
            }
        };
        self.publish(&guard.collection);
        outcome
    }

    fn publish(&self, collection: &CollectionState) {
        let _ = self
            .events
            .send(DirectoryEvent::ListChanged(collection.clone()));
    }
}

#[cfg(test)]
#[path = "tests/list_controller_tests.rs"]
mod tests;
