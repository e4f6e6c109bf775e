use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{Company, CompanyDraft, CompanyId},
    error::ErrorBody,
};
use tokio::{net::TcpListener, sync::Notify};

use crate::{
    error::RequestError,
    resource_client::{CompanyApi, DeleteAck},
    ConfirmationGate,
};

pub(crate) fn company(id: i64, name: &str, location: &str) -> Company {
    Company {
        id: CompanyId(id),
        name: name.to_string(),
        location: location.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    List,
    Get(CompanyId),
    Create(CompanyDraft),
    Update(CompanyId, CompanyDraft),
    Delete(CompanyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum GateKey {
    List,
    Create,
    Delete(CompanyId),
}

/// Scripted [`CompanyApi`] that records calls and can hold a call open until
/// the test releases it.
#[derive(Default)]
pub(crate) struct FakeCompanyApi {
    calls: StdMutex<Vec<ApiCall>>,
    list_results: StdMutex<VecDeque<Result<Vec<Company>, RequestError>>>,
    create_results: StdMutex<VecDeque<Result<Company, RequestError>>>,
    delete_failures: StdMutex<HashMap<CompanyId, RequestError>>,
    gates: StdMutex<HashMap<GateKey, Arc<Notify>>>,
}

impl FakeCompanyApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_list(&self, result: Result<Vec<Company>, RequestError>) {
        self.list_results.lock().expect("lock").push_back(result);
    }

    pub(crate) fn push_create(&self, result: Result<Company, RequestError>) {
        self.create_results.lock().expect("lock").push_back(result);
    }

    pub(crate) fn fail_delete(&self, id: CompanyId, err: RequestError) {
        self.delete_failures.lock().expect("lock").insert(id, err);
    }

    /// Holds calls matching `key` until the returned handle is notified.
    pub(crate) fn gate(&self, key: GateKey) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .expect("lock")
            .insert(key, Arc::clone(&notify));
        notify
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("lock").clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    async fn enter(&self, call: ApiCall, key: Option<GateKey>) {
        self.calls.lock().expect("lock").push(call);
        let gate = key.and_then(|key| self.gates.lock().expect("lock").get(&key).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl CompanyApi for FakeCompanyApi {
    async fn list_all(&self) -> Result<Vec<Company>, RequestError> {
        self.enter(ApiCall::List, Some(GateKey::List)).await;
        self.list_results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_by_id(&self, id: CompanyId) -> Result<Company, RequestError> {
        self.enter(ApiCall::Get(id), None).await;
        Err(RequestError::with_status("Company not found", 404))
    }

    async fn create(&self, draft: &CompanyDraft) -> Result<Company, RequestError> {
        self.enter(ApiCall::Create(draft.clone()), Some(GateKey::Create))
            .await;
        self.create_results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(Company {
                    id: CompanyId(100),
                    name: draft.name.clone(),
                    location: draft.location.clone(),
                })
            })
    }

    async fn update(&self, id: CompanyId, draft: &CompanyDraft) -> Result<Company, RequestError> {
        self.enter(ApiCall::Update(id, draft.clone()), None).await;
        Ok(Company {
            id,
            name: draft.name.clone(),
            location: draft.location.clone(),
        })
    }

    async fn delete(&self, id: CompanyId) -> Result<DeleteAck, RequestError> {
        self.enter(ApiCall::Delete(id), Some(GateKey::Delete(id)))
            .await;
        if let Some(err) = self.delete_failures.lock().expect("lock").get(&id).cloned() {
            return Err(err);
        }
        Ok(DeleteAck(
            json!({"message": "Company deleted successfully"}),
        ))
    }
}

/// Gate answering with a fixed value and recording every prompt.
pub(crate) struct ScriptedGate {
    answer: bool,
    prompts: StdMutex<Vec<String>>,
}

impl ScriptedGate {
    pub(crate) fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: StdMutex::new(Vec::new()),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().expect("lock").push(message.to_string());
        self.answer
    }
}

/// Polls `check` until it returns true, panicking after one second.
pub(crate) async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[derive(Clone, Default)]
pub(crate) struct DirectoryServerState {
    companies: Arc<StdMutex<Vec<Company>>>,
    next_id: Arc<StdMutex<i64>>,
    list_requests: Arc<StdMutex<u32>>,
}

impl DirectoryServerState {
    pub(crate) fn seeded(companies: Vec<Company>) -> Self {
        let next_id = companies.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        Self {
            companies: Arc::new(StdMutex::new(companies)),
            next_id: Arc::new(StdMutex::new(next_id)),
            list_requests: Arc::new(StdMutex::new(0)),
        }
    }

    pub(crate) fn companies(&self) -> Vec<Company> {
        self.companies.lock().expect("lock").clone()
    }

    pub(crate) fn list_requests(&self) -> u32 {
        *self.list_requests.lock().expect("lock")
    }
}

fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("Company not found")),
    )
}

async fn list_companies(State(state): State<DirectoryServerState>) -> Json<Vec<Company>> {
    *state.list_requests.lock().expect("lock") += 1;
    Json(state.companies())
}

async fn create_company(
    State(state): State<DirectoryServerState>,
    Json(draft): Json<CompanyDraft>,
) -> Json<Company> {
    let id = {
        let mut next_id = state.next_id.lock().expect("lock");
        let id = *next_id;
        *next_id += 1;
        id
    };
    let created = Company {
        id: CompanyId(id),
        name: draft.name,
        location: draft.location,
    };
    state.companies.lock().expect("lock").push(created.clone());
    Json(created)
}

async fn get_company(
    State(state): State<DirectoryServerState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match state.companies().into_iter().find(|c| c.id.0 == id) {
        Some(company) => Json(company).into_response(),
        None => not_found().into_response(),
    }
}

async fn update_company(
    State(state): State<DirectoryServerState>,
    Path(id): Path<i64>,
    Json(draft): Json<CompanyDraft>,
) -> axum::response::Response {
    let mut companies = state.companies.lock().expect("lock");
    match companies.iter_mut().find(|c| c.id.0 == id) {
        Some(company) => {
            company.name = draft.name;
            company.location = draft.location;
            Json(company.clone()).into_response()
        }
        None => not_found().into_response(),
    }
}

async fn delete_company(
    State(state): State<DirectoryServerState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let mut companies = state.companies.lock().expect("lock");
    let before = companies.len();
    companies.retain(|c| c.id.0 != id);
    if companies.len() == before {
        return not_found().into_response();
    }
    Json(json!({"message": "Company deleted successfully"})).into_response()
}

/// In-process stand-in for the directory service.
pub(crate) async fn spawn_directory_server(state: DirectoryServerState) -> String {
    let app = Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route(
            "/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .with_state(state);
    serve(app).await
}

pub(crate) async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}
