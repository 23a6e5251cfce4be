//! In-process stand-in for the three backend services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use shared::{Role, User};
use tempfile::TempDir;

use crate::api::Backend;
use crate::config::ServicesConfig;
use crate::nav::{Navigator, Route, Section};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (k.to_string(), v.to_string())
            })
            .collect()
    }
}

#[derive(Default)]
struct StubState {
    routes: HashMap<(String, String), (u16, String)>,
    requests: Vec<Recorded>,
}

#[derive(Clone)]
pub struct Stub {
    url: String,
    state: Arc<Mutex<StubState>>,
}

impl Stub {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Answer `method path` (query ignored) with `status` and `body`.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
    }

    pub fn services(&self) -> ServicesConfig {
        ServicesConfig {
            core_url: self.url.clone(),
            studies_url: self.url.clone(),
            rooms_url: self.url.clone(),
            request_timeout_secs: 5,
        }
    }

    pub fn backend(&self, session: Arc<Session>) -> Backend {
        Backend::new(&self.services(), session).unwrap()
    }
}

async fn handle(
    State(state): State<Arc<Mutex<StubState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    };

    let mut state = state.lock().unwrap();
    let answer = state
        .routes
        .get(&(recorded.method.clone(), recorded.path.clone()))
        .cloned();
    state.requests.push(recorded);

    let (status, body) = answer.unwrap_or((404, json!({"error": "Not found"}).to_string()));
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// A signed-in session talking to a fresh stub.
pub struct TestEnv {
    pub stub: Stub,
    pub session: Arc<Session>,
    pub backend: Backend,
    _dir: TempDir,
}

impl TestEnv {
    pub async fn signed_in() -> Self {
        Self::with_user(sample_user()).await
    }

    pub async fn signed_in_as_admin() -> Self {
        let mut user = sample_user();
        user.role = Role::Admin;
        Self::with_user(user).await
    }

    async fn with_user(user: User) -> Self {
        let stub = Stub::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        store.save("test-token", &user).unwrap();

        let session = Arc::new(Session::new(store, Navigator::new(Route::Dashboard(Section::Overview))));
        session.init();
        let backend = stub.backend(session.clone());

        Self {
            stub,
            session,
            backend,
            _dir: dir,
        }
    }

    pub fn route(&self) -> Route {
        self.session.navigator().current()
    }
}

pub fn sample_user() -> User {
    User {
        id: 1,
        username: "jsmith".to_string(),
        email: "jsmith@example.com".to_string(),
        role: Role::User,
        full_name: "Jane Smith".to_string(),
        phone: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn status_json(id: i64, name: &str) -> Value {
    json!({"id": id, "name": name, "description": "", "display_order": id})
}

pub fn default_statuses() -> Value {
    json!({"statuses": [
        status_json(1, "New Contact"),
        status_json(2, "In Studies"),
        status_json(3, "Baptized"),
        status_json(4, "Gospel Worker"),
    ]})
}

pub fn contact_json(id: i64, name: &str, status_id: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.split_whitespace().next().unwrap_or("x").to_lowercase()),
        "phone": "555-0100",
        "location": "Springfield",
        "notes": "",
        "date_added": "2024-01-01T00:00:00Z",
        "last_updated": "2024-01-01T00:00:00Z",
        "current_status_id": status_id
    })
}

pub fn lesson_json(id: i64, title: &str, sequence_number: i64) -> Value {
    json!({"id": id, "title": title, "description": "", "sequence_number": sequence_number})
}

pub fn study_json(id: i64, contact_id: i64, lesson_id: i64) -> Value {
    json!({
        "id": id,
        "contact_id": contact_id,
        "lesson_id": lesson_id,
        "date_completed": "2024-03-10T00:00:00Z",
        "location": "Home",
        "duration_minutes": 45,
        "notes": "",
        "taught_by_user_id": 1
    })
}

pub fn room_json(id: i64, name: &str, capacity: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "capacity": capacity,
        "location": "Main building",
        "description": "",
        "is_available": true
    })
}

pub fn reservation_json(id: i64, room_id: i64, title: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "room_id": room_id,
        "user_id": 1,
        "title": title,
        "description": "",
        "start_time": start,
        "end_time": end,
        "recurring_type": "none"
    })
}
