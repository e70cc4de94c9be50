//! In-process stand-in for a Jamf Pro instance.
//!
//! # Design
//! Serves the identity endpoint, computer groups over the legacy XML root and
//! categories over the versioned JSON root. Group writes are replicated
//! lazily: after a write, the next `lag_reads` reads of that id still see
//! the previous state (or 404 for a new record), which is what the client's
//! read-after-write polling has to absorb.
//!
//! Every resource route requires a bearer token issued by this server.
//! Requests arriving without the `APBALANCEID` cookie are counted and
//! exposed on `GET /__mock/stats`.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{debug, info};

pub const AFFINITY_COOKIE: &str = "APBALANCEID";
const AFFINITY_VALUE: &str = "aws.usw2.mock-node-1";
const XML: &str = "text/xml;charset=UTF-8";

/// Knobs for a mock instance.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// `expires_in` reported with every issued token.
    pub token_lifetime_secs: u64,
    /// Reads of a group that still see the old state after each write.
    pub lag_reads: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self { token_lifetime_secs: 1200, lag_reads: 0 }
    }
}

/// Counters for assertions from outside the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub tokens_issued: u64,
    pub requests_without_affinity: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub and_or: String,
    #[serde(default)]
    pub search_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub opening_paren: bool,
    #[serde(default)]
    pub closing_paren: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub criterion: Vec<Criterion>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default)]
    pub computer: Vec<Member>,
}

/// `<computer_group>` document as stored and served.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "computer_group")]
pub struct GroupDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_smart: bool,
    #[serde(default, skip_serializing_if = "criteria_empty")]
    pub criteria: Criteria,
    #[serde(default, skip_serializing_if = "members_empty")]
    pub computers: Members,
}

fn criteria_empty(criteria: &Criteria) -> bool {
    criteria.criterion.is_empty()
}

fn members_empty(members: &Members) -> bool {
    members.computer.is_empty()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub priority: i32,
}

#[derive(Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Deserialize)]
pub struct TokenForm {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub grant_type: String,
}

#[derive(Serialize)]
struct GroupSummary {
    id: i64,
    name: String,
    is_smart: bool,
}

#[derive(Serialize)]
struct GroupListing {
    computer_groups: Vec<GroupSummary>,
}

#[derive(Serialize)]
#[serde(rename = "computer_group")]
struct WrittenId {
    id: i64,
}

/// A record whose latest write becomes readable only after `lag` reads.
#[derive(Debug, Default)]
struct Replicated<T> {
    committed: Option<T>,
    stale: Option<T>,
    lag: u32,
}

impl<T: Clone> Replicated<T> {
    fn write(&mut self, value: Option<T>, lag: u32) {
        self.stale = self.committed.take();
        self.committed = value;
        self.lag = lag;
    }

    fn read(&mut self) -> Option<T> {
        if self.lag > 0 {
            self.lag -= 1;
            return self.stale.clone();
        }
        self.committed.clone()
    }

    /// Deleted and no reader can still see the old value.
    fn is_gone(&self) -> bool {
        self.committed.is_none() && self.lag == 0
    }
}

#[derive(Debug, Default)]
struct Store {
    tokens: HashSet<String>,
    stats: Stats,
    groups: BTreeMap<i64, Replicated<GroupDoc>>,
    next_group_id: i64,
    categories: BTreeMap<i64, Category>,
    next_category_id: i64,
}

impl Store {
    /// Reads group `id`, dropping its record once a delete has replicated.
    fn read_group(&mut self, id: i64) -> Option<GroupDoc> {
        let record = self.groups.get_mut(&id)?;
        let group = record.read();
        if record.is_gone() {
            self.groups.remove(&id);
        }
        group
    }
}

#[derive(Clone)]
struct AppState {
    config: MockConfig,
    store: Arc<Mutex<Store>>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState { config, store: Arc::new(Mutex::new(Store::default())) };

    let api = Router::new()
        .route("/JSSResource/computergroups", get(list_groups))
        .route(
            "/JSSResource/computergroups/id/{id}",
            get(get_group).post(create_group).put(update_group).delete(delete_group),
        )
        .route("/uapi/v1/categories", get(list_categories).post(create_category))
        .route(
            "/uapi/v1/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/api/oauth/token", post(issue_token))
        .route("/__mock/stats", get(stats))
        .merge(api)
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn has_affinity(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .any(|pair| pair.trim().starts_with(&format!("{AFFINITY_COOKIE}=")))
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    {
        let mut store = state.store.lock().await;
        if !has_affinity(request.headers()) {
            store.stats.requests_without_affinity += 1;
        }
        let authorized = token.is_some_and(|t| store.tokens.contains(&t));
        if !authorized {
            debug!(path = %request.uri().path(), "rejecting request without a valid token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }
    next.run(request).await
}

async fn issue_token(State(state): State<AppState>, Form(form): Form<TokenForm>) -> Response {
    if form.grant_type != "client_credentials"
        || form.client_id.is_empty()
        || form.client_secret.is_empty()
    {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "invalid_client"})))
            .into_response();
    }
    let mut store = state.store.lock().await;
    store.stats.tokens_issued += 1;
    let token = format!("mock-token-{}", store.stats.tokens_issued);
    store.tokens.insert(token.clone());
    info!(client_id = %form.client_id, "issued token");

    let body = serde_json::json!({
        "access_token": token,
        "scope": "api-role:1",
        "token_type": "Bearer",
        "expires_in": state.config.token_lifetime_secs,
    });
    let cookie = format!("{AFFINITY_COOKIE}={AFFINITY_VALUE}; Path=/; HttpOnly");
    ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.store.lock().await.stats.clone())
}

fn xml<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match quick_xml::se::to_string(value) {
        Ok(body) => (status, [(header::CONTENT_TYPE, XML)], body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn parse_group(body: &str) -> Result<GroupDoc, Response> {
    quick_xml::de::from_str(body)
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("malformed group: {err}")).into_response())
}

async fn list_groups(State(state): State<AppState>) -> Json<GroupListing> {
    let store = state.store.lock().await;
    let computer_groups = store
        .groups
        .iter()
        .filter_map(|(id, record)| {
            record.committed.as_ref().map(|g| GroupSummary {
                id: *id,
                name: g.name.clone(),
                is_smart: g.is_smart,
            })
        })
        .collect();
    Json(GroupListing { computer_groups })
}

async fn get_group(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.lock().await;
    match store.read_group(id) {
        Some(group) => xml(StatusCode::OK, &group),
        None => not_found(),
    }
}

async fn create_group(State(state): State<AppState>, body: String) -> Response {
    let mut group = match parse_group(&body) {
        Ok(group) => group,
        Err(rejection) => return rejection,
    };
    let mut store = state.store.lock().await;
    store.next_group_id += 1;
    let id = store.next_group_id;
    group.id = Some(id);
    store.groups.entry(id).or_default().write(Some(group), state.config.lag_reads);
    info!(id, "group created");
    xml(StatusCode::CREATED, &WrittenId { id })
}

async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: String,
) -> Response {
    let mut group = match parse_group(&body) {
        Ok(group) => group,
        Err(rejection) => return rejection,
    };
    let mut store = state.store.lock().await;
    let Some(record) = store.groups.get_mut(&id).filter(|r| r.committed.is_some()) else {
        return not_found();
    };
    group.id = Some(id);
    record.write(Some(group), state.config.lag_reads);
    xml(StatusCode::CREATED, &WrittenId { id })
}

async fn delete_group(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.lock().await;
    let Some(record) = store.groups.get_mut(&id).filter(|r| r.committed.is_some()) else {
        return not_found();
    };
    record.write(None, state.config.lag_reads);
    if record.is_gone() {
        store.groups.remove(&id);
    }
    info!(id, "group deleted");
    xml(StatusCode::OK, &WrittenId { id })
}

async fn list_categories(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = state.store.lock().await;
    let results: Vec<&Category> = store.categories.values().collect();
    Json(serde_json::json!({ "totalCount": results.len(), "results": results }))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, StatusCode> {
    let store = state.store.lock().await;
    store.categories.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CategoryInput>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut store = state.store.lock().await;
    store.next_category_id += 1;
    let id = store.next_category_id;
    let category = Category { id: id.to_string(), name: input.name, priority: input.priority };
    store.categories.insert(id, category);

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("localhost");
    let href = format!("http://{host}/api/v1/categories/{id}");
    (StatusCode::CREATED, Json(serde_json::json!({ "id": id.to_string(), "href": href })))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, StatusCode> {
    let mut store = state.store.lock().await;
    let category = store.categories.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    category.name = input.name;
    category.priority = input.priority;
    Ok(Json(category.clone()))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.store.lock().await;
    store.categories.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicated_record_serves_stale_state_for_lag_reads() {
        let mut record = Replicated::default();
        record.write(Some(1), 2);
        assert_eq!(record.read(), None);
        assert_eq!(record.read(), None);
        assert_eq!(record.read(), Some(1));

        record.write(Some(2), 1);
        assert_eq!(record.read(), Some(1));
        assert_eq!(record.read(), Some(2));

        record.write(None, 0);
        assert_eq!(record.read(), None);
        assert!(record.is_gone());
    }

    #[test]
    fn deleted_group_record_is_dropped_once_lag_drains() {
        let mut store = Store::default();
        let mut record = Replicated::default();
        record.write(Some(GroupDoc { id: Some(1), ..GroupDoc::default() }), 0);
        record.write(None, 1);
        store.groups.insert(1, record);

        assert_eq!(store.read_group(1).and_then(|g| g.id), Some(1));
        assert!(store.groups.is_empty());
        assert!(store.read_group(1).is_none());
    }

    #[test]
    fn group_doc_reads_wrapped_lists() {
        let doc: GroupDoc = quick_xml::de::from_str(
            "<computer_group><name>Lab</name><is_smart>false</is_smart>\
             <computers><computer><id>1</id><name>a</name></computer>\
             <computer><id>2</id><name>b</name></computer></computers></computer_group>",
        )
        .unwrap();
        assert_eq!(doc.id, None);
        assert_eq!(doc.computers.computer.len(), 2);
        assert!(doc.criteria.criterion.is_empty());
    }

    #[test]
    fn group_doc_omits_empty_lists() {
        let doc = GroupDoc { id: Some(3), name: "Empty".to_string(), ..GroupDoc::default() };
        assert_eq!(
            quick_xml::se::to_string(&doc).unwrap(),
            "<computer_group><id>3</id><name>Empty</name>\
             <is_smart>false</is_smart></computer_group>"
        );
    }

    #[test]
    fn affinity_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "a=1; APBALANCEID=node".parse().unwrap());
        assert!(has_affinity(&headers));
        headers.insert(header::COOKIE, "AWSALB=node".parse().unwrap());
        assert!(!has_affinity(&headers));
    }
}
