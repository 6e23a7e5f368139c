//! In-memory plugin backend.
//!
//! [`InMemoryBackend`] is a [`Transport`] that answers the plugin and
//! platform endpoints from process memory. Mappings are kept as JSON blobs
//! under the same keys the plugin's key-value store uses, and the status
//! codes and bodies follow the plugin router: `{status:"ok", mappings}` on a
//! save, `{error}` on any failure.
//!
//! Faults can be queued to exercise failure paths, requests are recorded,
//! and a [`Gate`] can hold requests in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use snag_proto::{
    ChannelEntity, ChannelRulesResponse, Collaborator, ErrorBody, Organization,
    PlatformUserEntity, ProjectChannelMappings, ProjectEntity, TestConnectionRequest,
    UserMapping, UserMappingsEnvelope,
};
use tracing::debug;

use crate::config::ApiPaths;
use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Key under which user mappings are stored.
pub const USER_MAPPINGS_KEY: &str = "user_mappings";

/// Key under which project→channel rules are stored.
pub const CHANNEL_RULES_KEY: &str = "project_channel_mappings";

/// Message returned by the connection test when the token sees no organizations.
pub const NO_ORGANIZATIONS_MESSAGE: &str = "No organizations found. Check API token permissions.";

#[derive(Debug, Clone)]
enum Fault {
    Respond(ApiResponse),
    Disconnect(String),
}

#[derive(Debug, Default)]
struct BackendState {
    kv: HashMap<String, Vec<u8>>,
    api_token: Option<String>,
    organizations: Vec<Organization>,
    projects: Vec<ProjectEntity>,
    collaborators: Vec<Collaborator>,
    channels: Vec<ChannelEntity>,
    users: Vec<PlatformUserEntity>,
    queued_faults: VecDeque<Fault>,
    path_faults: HashMap<String, ApiResponse>,
    requests: Vec<ApiRequest>,
    gate: Option<Shared<oneshot::Receiver<()>>>,
}

/// Holds requests sent to an [`InMemoryBackend`] until released or dropped.
#[derive(Debug)]
pub struct Gate {
    sender: oneshot::Sender<()>,
}

impl Gate {
    /// Lets every held request proceed.
    pub fn release(self) {
        let _ = self.sender.send(());
    }
}

/// Shared, cloneable in-memory server.
///
/// Clones share state, so one backend can serve several sessions.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
    paths: ApiPaths,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(ApiPaths::default())
    }
}

impl InMemoryBackend {
    /// Creates an empty backend serving `paths`.
    #[must_use]
    pub fn new(paths: ApiPaths) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::default())),
            paths,
        }
    }

    /// Sets the Bugsnag API token the plugin is configured with.
    #[must_use]
    pub fn with_api_token(self, token: impl Into<String>) -> Self {
        self.state.lock().api_token = Some(token.into());
        self
    }

    /// Sets the organizations visible to the token.
    #[must_use]
    pub fn with_organizations(self, organizations: Vec<Organization>) -> Self {
        self.state.lock().organizations = organizations;
        self
    }

    /// Sets the provider project catalog.
    #[must_use]
    pub fn with_projects(self, projects: Vec<ProjectEntity>) -> Self {
        self.state.lock().projects = projects;
        self
    }

    /// Sets the provider collaborator catalog.
    #[must_use]
    pub fn with_collaborators(self, collaborators: Vec<Collaborator>) -> Self {
        self.state.lock().collaborators = collaborators;
        self
    }

    /// Sets the platform channel catalog.
    #[must_use]
    pub fn with_channels(self, channels: Vec<ChannelEntity>) -> Self {
        self.state.lock().channels = channels;
        self
    }

    /// Sets the platform user catalog.
    #[must_use]
    pub fn with_platform_users(self, users: Vec<PlatformUserEntity>) -> Self {
        self.state.lock().users = users;
        self
    }

    /// Stores channel rules as if saved earlier.
    pub fn seed_channel_mappings(&self, mappings: &ProjectChannelMappings) {
        self.seed_json(CHANNEL_RULES_KEY, mappings);
    }

    /// Stores user mappings as if saved earlier.
    pub fn seed_user_mappings(&self, mappings: &[UserMapping]) {
        self.seed_json(USER_MAPPINGS_KEY, &mappings);
    }

    /// Stores raw bytes under `key`, e.g. a corrupt blob.
    pub fn seed_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.state.lock().kv.insert(key.to_string(), bytes.into());
    }

    fn seed_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        self.seed_raw(key, bytes);
    }

    /// Channel rules currently stored, if any were saved.
    #[must_use]
    pub fn stored_channel_mappings(&self) -> Option<ProjectChannelMappings> {
        self.stored(CHANNEL_RULES_KEY)
    }

    /// User mappings currently stored, if any were saved.
    #[must_use]
    pub fn stored_user_mappings(&self) -> Option<Vec<UserMapping>> {
        self.stored(USER_MAPPINGS_KEY)
    }

    /// Raw JSON stored under `key`.
    #[must_use]
    pub fn stored_raw(&self, key: &str) -> Option<Value> {
        self.stored(key)
    }

    fn stored<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.lock();
        state
            .kv
            .get(key)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    /// Answers the next request with `status` and `body`, whatever it is.
    pub fn fail_next(&self, status: u16, body: Value) {
        self.state
            .lock()
            .queued_faults
            .push_back(Fault::Respond(ApiResponse::json(status, &body)));
    }

    /// Fails the next request before it reaches the server.
    pub fn fail_next_transport(&self, message: impl Into<String>) {
        self.state
            .lock()
            .queued_faults
            .push_back(Fault::Disconnect(message.into()));
    }

    /// Answers every request to `path` with `status` and `body` until cleared.
    pub fn fail_path(&self, path: &str, status: u16, body: Value) {
        self.state
            .lock()
            .path_faults
            .insert(strip_query(path).to_string(), ApiResponse::json(status, &body));
    }

    /// Removes queued and per-path faults.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.queued_faults.clear();
        state.path_faults.clear();
    }

    /// Holds all subsequent requests until the returned gate is released.
    #[must_use]
    pub fn hold(&self) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.state.lock().gate = Some(receiver.shared());
        Gate { sender }
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received for `method` and `path`.
    #[must_use]
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if let Some(fault) = state.queued_faults.pop_front() {
            return match fault {
                Fault::Respond(response) => Ok(response),
                Fault::Disconnect(message) => Err(TransportError::new(message)),
            };
        }

        let (path, query) = split_query(&request.path);
        if let Some(response) = state.path_faults.get(path) {
            return Ok(response.clone());
        }

        let response = if path == self.paths.test() {
            post_only(request, |body| test_connection(&state, body))
        } else if path == self.paths.projects() {
            get_only(request, || list_projects(&state))
        } else if path == self.paths.organizations() {
            get_only(request, || {
                with_token(&state, || {
                    ok(&json!({ "organizations": state.organizations }))
                })
            })
        } else if path == self.paths.collaborators() {
            get_only(request, || {
                with_token(&state, || {
                    ok(&json!({ "collaborators": state.collaborators }))
                })
            })
        } else if path == self.paths.channel_rules() {
            match request.method {
                Method::Get => get_channel_rules(&state),
                Method::Post => save_channel_rules(&mut state, request.body.as_ref()),
            }
        } else if path == self.paths.user_mappings() {
            match request.method {
                Method::Get => get_user_mappings(&state),
                Method::Post => save_user_mappings(&mut state, request.body.as_ref()),
            }
        } else if path == self.paths.channels() {
            get_only(request, || ok(&state.channels))
        } else if path == strip_query(&self.paths.users()) {
            let per_page = per_page(query).unwrap_or(usize::MAX);
            get_only(request, || {
                ok(&state.users.iter().take(per_page).collect::<Vec<_>>())
            })
        } else {
            error(404, "not found")
        };

        Ok(response)
    }
}

impl Transport for InMemoryBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let gate = self.state.lock().gate.clone();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let response = self.handle(&request)?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "in-memory backend answered"
        );
        Ok(response)
    }
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

fn strip_query(path: &str) -> &str {
    split_query(path).0
}

fn per_page(query: Option<&str>) -> Option<usize> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "per_page")
        .and_then(|(_, value)| value.parse().ok())
}

fn ok<T: Serialize + ?Sized>(body: &T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(value) => ApiResponse::json(200, &value),
        Err(e) => error(500, &format!("failed to encode response: {e}")),
    }
}

fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::json(status, &json!(ErrorBody::new(message)))
}

fn get_only(request: &ApiRequest, handler: impl FnOnce() -> ApiResponse) -> ApiResponse {
    match request.method {
        Method::Get => handler(),
        Method::Post => error(405, "method not allowed"),
    }
}

fn post_only(
    request: &ApiRequest,
    handler: impl FnOnce(Option<&Value>) -> ApiResponse,
) -> ApiResponse {
    match request.method {
        Method::Post => handler(request.body.as_ref()),
        Method::Get => error(405, "method not allowed"),
    }
}

fn configured_token(state: &BackendState) -> Option<&str> {
    state
        .api_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn with_token(state: &BackendState, handler: impl FnOnce() -> ApiResponse) -> ApiResponse {
    if configured_token(state).is_none() {
        return error(401, "missing Bugsnag API token");
    }
    handler()
}

fn test_connection(state: &BackendState, body: Option<&Value>) -> ApiResponse {
    let request: TestConnectionRequest = match body.cloned().map(serde_json::from_value) {
        None => TestConnectionRequest::default(),
        Some(Ok(request)) => request,
        Some(Err(e)) => return error(400, &format!("invalid JSON payload: {e}")),
    };

    let configured = configured_token(state);
    let token = request.api_token.as_deref().or(configured);
    let Some(token) = token else {
        return error(401, "missing Bugsnag API token");
    };
    if configured.is_some_and(|expected| expected != token) {
        return error(401, "invalid Bugsnag API token");
    }

    let project_names: Vec<&str> = state.projects.iter().map(|p| p.name.as_str()).collect();

    if let Some(org_id) = &request.organization_id {
        if !state.organizations.iter().any(|o| &o.id == org_id) {
            return error(502, "failed to fetch projects: organization not found");
        }
        return ok(&json!({
            "status": "ok",
            "organization": org_id,
            "project_count": project_names.len(),
            "projects": project_names,
        }));
    }

    let Some(first) = state.organizations.first() else {
        return ok(&json!({ "status": "ok", "message": NO_ORGANIZATIONS_MESSAGE }));
    };

    ok(&json!({
        "status": "ok",
        "organization_count": state.organizations.len(),
        "organization": first.name,
        "project_count": project_names.len(),
        "projects": project_names,
    }))
}

fn list_projects(state: &BackendState) -> ApiResponse {
    with_token(state, || match state.organizations.first() {
        None => ok(&json!({ "projects": [], "message": "No organizations found" })),
        Some(org) => ok(&json!({
            "organization_id": org.id,
            "projects": state.projects,
        })),
    })
}

fn get_channel_rules(state: &BackendState) -> ApiResponse {
    let mappings: ProjectChannelMappings = match state.kv.get(CHANNEL_RULES_KEY) {
        Some(bytes) if !bytes.is_empty() => match serde_json::from_slice::<Option<_>>(bytes) {
            Ok(mappings) => mappings.unwrap_or_default(),
            Err(e) => return error(500, &format!("failed to parse channel rules: {e}")),
        },
        _ => ProjectChannelMappings::new(),
    };
    ok(&json!({ "mappings": mappings }))
}

fn save_channel_rules(state: &mut BackendState, body: Option<&Value>) -> ApiResponse {
    let payload: ChannelRulesResponse = match body.cloned().map(serde_json::from_value) {
        Some(Ok(payload)) => payload,
        Some(Err(e)) => return error(400, &format!("invalid JSON payload: {e}")),
        None => return error(400, "invalid JSON payload: empty body"),
    };
    if payload.mappings.is_none() && payload.rules.is_none() {
        return error(400, "invalid JSON payload: missing mappings");
    }

    let mappings = payload.into_mappings();
    match serde_json::to_vec(&mappings) {
        Ok(bytes) => {
            state.kv.insert(CHANNEL_RULES_KEY.to_string(), bytes);
            ok(&json!({ "status": "ok", "mappings": mappings }))
        }
        Err(e) => error(500, &format!("failed to encode channel rules: {e}")),
    }
}

fn get_user_mappings(state: &BackendState) -> ApiResponse {
    let mappings: Vec<UserMapping> = match state.kv.get(USER_MAPPINGS_KEY) {
        Some(bytes) if !bytes.is_empty() => match serde_json::from_slice::<Option<_>>(bytes) {
            Ok(mappings) => mappings.unwrap_or_default(),
            Err(e) => return error(500, &format!("failed to parse user mappings: {e}")),
        },
        _ => Vec::new(),
    };
    ok(&UserMappingsEnvelope { mappings })
}

fn save_user_mappings(state: &mut BackendState, body: Option<&Value>) -> ApiResponse {
    let payload: UserMappingsEnvelope = match body.cloned().map(serde_json::from_value) {
        Some(Ok(payload)) => payload,
        Some(Err(e)) => return error(400, &format!("invalid JSON payload: {e}")),
        None => return error(400, "invalid JSON payload: empty body"),
    };

    match serde_json::to_vec(&payload.mappings) {
        Ok(bytes) => {
            state.kv.insert(USER_MAPPINGS_KEY.to_string(), bytes);
            ok(&json!({ "status": "ok", "mappings": payload.mappings }))
        }
        Err(e) => error(500, &format!("failed to encode mappings: {e}")),
    }
}
