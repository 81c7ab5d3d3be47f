//! In-memory JSON:API broker used by the client's integration tests.
//!
//! Serves a single `projects` resource type behind bearer authentication,
//! plus a few endpoints that misbehave on purpose (slow, empty, non-JSON).

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const JSON_API: &str = "application/vnd.api+json";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<String>,
}

impl Project {
    fn resource(&self) -> Value {
        let owner = self
            .owner_id
            .as_ref()
            .map(|id| json!({"type": "users", "id": id}))
            .unwrap_or(Value::Null);
        json!({
            "type": "projects",
            "id": self.id,
            "attributes": {
                "name": self.name,
                "description": self.description,
            },
            "relationships": {
                "owner": {"data": owner}
            },
            "links": {"self": format!("/projects/{}", self.id)}
        })
    }
}

/// Projects in insertion order.
pub type Db = Arc<RwLock<Vec<Project>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/slow", get(slow))
        .route("/empty", get(empty))
        .route("/garbage", get(garbage))
        .route("/echo/{*rest}", get(echo))
        .layer(middleware::from_fn(require_bearer))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn document(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_API)], body.to_string()).into_response()
}

fn error_document(status: StatusCode, title: &str, detail: impl Into<String>) -> Response {
    document(
        status,
        json!({
            "errors": [{
                "status": status.as_u16().to_string(),
                "title": title,
                "detail": detail.into(),
            }]
        }),
    )
}

fn not_found(id: &str) -> Response {
    error_document(
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("project {id} does not exist"),
    )
}

async fn require_bearer(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejecting request without bearer token");
        return error_document(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "a bearer token is required",
        );
    }
    next.run(request).await
}

/// Attributes accepted on create and update.
#[derive(Deserialize, Default)]
struct ProjectAttributes {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ProjectData {
    #[serde(default)]
    attributes: ProjectAttributes,
    #[serde(default)]
    relationships: Option<Value>,
}

#[derive(Deserialize)]
struct ProjectDocument {
    data: ProjectData,
}

fn parse_document(body: &[u8]) -> Result<ProjectDocument, Response> {
    serde_json::from_slice(body).map_err(|e| {
        error_document(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            format!("malformed document: {e}"),
        )
    })
}

fn owner_of(relationships: &Option<Value>) -> Option<String> {
    relationships
        .as_ref()?
        .pointer("/owner/data/id")?
        .as_str()
        .map(str::to_string)
}

async fn list_projects(State(db): State<Db>) -> Response {
    let projects = db.read().await;
    let data: Vec<Value> = projects.iter().map(Project::resource).collect();
    document(
        StatusCode::OK,
        json!({"data": data, "meta": {"total": projects.len()}}),
    )
}

async fn create_project(State(db): State<Db>, body: Bytes) -> Response {
    let doc = match parse_document(&body) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    let Some(name) = doc.data.attributes.name.filter(|n| !n.trim().is_empty()) else {
        return error_document(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid Attribute",
            "name is required",
        );
    };
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name,
        description: doc.data.attributes.description,
        owner_id: owner_of(&doc.data.relationships),
    };
    db.write().await.push(project.clone());
    document(StatusCode::CREATED, json!({"data": project.resource()}))
}

async fn get_project(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let projects = db.read().await;
    match projects.iter().find(|p| p.id == id) {
        Some(project) => document(StatusCode::OK, json!({"data": project.resource()})),
        None => not_found(&id),
    }
}

async fn update_project(State(db): State<Db>, Path(id): Path<String>, body: Bytes) -> Response {
    let doc = match parse_document(&body) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    let mut projects = db.write().await;
    let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
        return not_found(&id);
    };
    if let Some(name) = doc.data.attributes.name {
        project.name = name;
    }
    if let Some(description) = doc.data.attributes.description {
        project.description = Some(description);
    }
    if let Some(owner) = owner_of(&doc.data.relationships) {
        project.owner_id = Some(owner);
    }
    document(StatusCode::OK, json!({"data": project.resource()}))
}

async fn delete_project(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let mut projects = db.write().await;
    let before = projects.len();
    projects.retain(|p| p.id != id);
    if projects.len() == before {
        return not_found(&id);
    }
    document(StatusCode::OK, json!({"meta": {"deleted": id}}))
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default = "default_delay_ms")]
    ms: u64,
}

fn default_delay_ms() -> u64 {
    1_000
}

async fn slow(Query(params): Query<SlowParams>) -> Response {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    document(
        StatusCode::OK,
        json!({"data": {"type": "delays", "id": "slow", "attributes": {"ms": params.ms}}}),
    )
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn garbage() -> Response {
    (StatusCode::OK, "<html>upstream error</html>").into_response()
}

async fn echo(uri: Uri) -> Response {
    document(
        StatusCode::OK,
        json!({"meta": {"path": uri.path(), "query": uri.query()}}),
    )
}
