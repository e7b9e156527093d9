//! Common test utilities for E2E tests
//!
//! `FakeBackend` is an in-process stand-in for the PHP API, served by axum
//! on a random local port. `TestApp` wires an `AppState` to it with a
//! temporary database and a switchable connectivity check.

#![allow(dead_code)]

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use nomad::connectivity::StaticConnectivity;
use nomad::data::Session;
use nomad::{AppState, config};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_PASSWORD: &str = "correct-horse";
pub const TEST_USER_ID: i64 = 42;

/// One multipart upload as received by the fake backend
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub fields: HashMap<String, String>,
    pub file_field: String,
    pub file_name: String,
    pub file_len: usize,
}

#[derive(Default)]
struct BackendState {
    /// Endpoint names in arrival order
    requests: Vec<String>,
    /// JSON bodies posted to each endpoint
    json_bodies: Vec<(String, Value)>,
    uploads: Vec<RecordedUpload>,
    /// `Some(message)` makes uploads answer `success: false`
    reject_uploads: Option<String>,
    /// `Some(status)` makes uploads fail with a bare HTTP error
    upload_http_error: Option<StatusCode>,
    /// Category id -> items
    feed: HashMap<i64, Vec<Value>>,
    reject_feed: Option<String>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process fake of the PHP API
pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/nomad_api/upload_discovery.php", post(upload_discovery))
            .route("/nomad_api/get_category_items.php", get(category_items))
            .route("/nomad_api/get_single_observation.php", get(single_observation))
            .route("/nomad_api/login.php", post(login))
            .route("/nomad_api/signup.php", post(signup))
            .route("/nomad_api/get_profile.php", get(profile))
            .route("/nomad_api/update_profile_bio.php", post(ack_json))
            .route(
                "/nomad_api/upload_profile_picture.php",
                post(upload_profile_picture),
            )
            .route("/nomad_api/upload_background.php", post(upload_background))
            .route("/nomad_api/search_friends.php", post(search_friends))
            .route("/nomad_api/add_friend.php", post(ack_json))
            .route("/nomad_api/update_observation.php", post(ack_json))
            .route("/nomad_api/delete_observation.php", post(ack_json))
            .route("/nomad_api/toggle_like.php", post(toggle_like))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/nomad_api"),
            state,
        }
    }

    /// Endpoint names hit so far
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// Last JSON body posted to `endpoint`
    pub fn last_json(&self, endpoint: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .json_bodies
            .iter()
            .rev()
            .find(|(name, _)| name == endpoint)
            .map(|(_, body)| body.clone())
    }

    pub fn reject_uploads(&self, message: Option<&str>) {
        self.state.lock().unwrap().reject_uploads = message.map(str::to_string);
    }

    pub fn fail_uploads_with_status(&self, status: Option<StatusCode>) {
        self.state.lock().unwrap().upload_http_error = status;
    }

    pub fn reject_feed(&self, message: Option<&str>) {
        self.state.lock().unwrap().reject_feed = message.map(str::to_string);
    }

    /// Replace the items served for a category
    pub fn set_feed(&self, category_id: i64, observation_ids: &[i64]) {
        let items = observation_ids
            .iter()
            .map(|&id| observation_json(id, category_id))
            .collect();
        self.state.lock().unwrap().feed.insert(category_id, items);
    }

    /// Serve raw item objects for a category
    pub fn set_feed_items(&self, category_id: i64, items: Vec<Value>) {
        self.state.lock().unwrap().feed.insert(category_id, items);
    }
}

/// Observation in the loose shape the PHP backend emits
pub fn observation_json(id: i64, category_id: i64) -> Value {
    json!({
        "observation_id": id.to_string(),
        "user_id": "7",
        "category_id": category_id,
        "title": format!("Observer {id}"),
        "description": format!("Observation number {id}"),
        "image_url": format!("http://backend.test/uploads/{id}.jpg"),
        "latitude": "51.5",
        "longitude": null,
        "created_at": "2025-04-01 08:30:00",
    })
}

fn record(state: &Shared, endpoint: &str) {
    state.lock().unwrap().requests.push(endpoint.to_string());
}

fn record_json(state: &Shared, endpoint: &str, body: &Value) {
    let mut guard = state.lock().unwrap();
    guard.requests.push(endpoint.to_string());
    guard.json_bodies.push((endpoint.to_string(), body.clone()));
}

async fn read_multipart(mut multipart: Multipart) -> RecordedUpload {
    let mut upload = RecordedUpload {
        fields: HashMap::new(),
        file_field: String::new(),
        file_name: String::new(),
        file_len: 0,
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await.unwrap();
                upload.file_field = name;
                upload.file_name = file_name;
                upload.file_len = bytes.len();
            }
            None => {
                let text = field.text().await.unwrap();
                upload.fields.insert(name, text);
            }
        }
    }

    upload
}

async fn upload_discovery(
    State(state): State<Shared>,
    multipart: Multipart,
) -> axum::response::Response {
    record(&state, "upload_discovery.php");
    let upload = read_multipart(multipart).await;

    let (reject, http_error) = {
        let guard = state.lock().unwrap();
        (guard.reject_uploads.clone(), guard.upload_http_error)
    };

    if let Some(status) = http_error {
        return (status, "Internal Server Error").into_response();
    }
    if let Some(message) = reject {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response();
    }

    state.lock().unwrap().uploads.push(upload);
    Json(json!({ "success": true, "message": "Discovery uploaded successfully!" })).into_response()
}

async fn category_items(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "get_category_items.php");
    let category_id: i64 = query
        .get("category_id")
        .and_then(|id| id.parse().ok())
        .unwrap_or_default();

    let guard = state.lock().unwrap();
    if let Some(message) = &guard.reject_feed {
        return Json(json!({ "success": false, "message": message }));
    }
    let items = guard.feed.get(&category_id).cloned().unwrap_or_default();
    Json(json!({ "success": true, "items": items }))
}

async fn single_observation(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "get_single_observation.php");
    match query.get("observation_id").and_then(|id| id.parse::<i64>().ok()) {
        Some(id) => Json(json!({ "success": true, "data": observation_json(id, 2) })),
        None => Json(json!({ "success": false, "message": "Observation not found." })),
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record_json(&state, "login.php", &body);
    if body["password"] != TEST_PASSWORD {
        return Json(json!({ "success": false, "message": "Invalid email or password." }));
    }

    Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user_id": TEST_USER_ID.to_string(),
            "username": "wanderer",
            "email": body["email"],
            "full_name": "Wan Derer",
            "session_token": "abc123token",
            "profile_picture_url": null,
            "background_picture_url": "",
            "bio": "Field notes",
        }
    }))
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record_json(&state, "signup.php", &body);
    if body["email"] == "taken@example.com" {
        return Json(json!({ "success": false, "message": "Email already registered." }));
    }

    Json(json!({
        "success": true,
        "message": "Account created",
        "data": {
            "user_id": 43,
            "username": "newcomer",
            "email": body["email"],
            "full_name": body["name"],
        }
    }))
}

async fn profile(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "get_profile.php");
    let user_id = query.get("user_id").cloned().unwrap_or_default();

    Json(json!({
        "success": true,
        "data": {
            "full_name": format!("User {user_id}"),
            "username": format!("user{user_id}"),
            "bio": null,
            "profile_picture_url": null,
            "background_picture_url": null,
            "posts_count": "1",
            "friends_count": 3,
            "posts": [
                {
                    "observation_id": 5,
                    "image_url": "http://backend.test/uploads/5.jpg",
                    "title": "Red kite"
                }
            ]
        }
    }))
}

async fn upload_profile_picture(
    State(state): State<Shared>,
    multipart: Multipart,
) -> Json<Value> {
    record(&state, "upload_profile_picture.php");
    let upload = read_multipart(multipart).await;
    let url = format!("http://backend.test/avatars/{}", upload.file_name);
    state.lock().unwrap().uploads.push(upload);
    Json(json!({ "success": true, "data": { "profile_picture_url": url } }))
}

async fn upload_background(State(state): State<Shared>, multipart: Multipart) -> Json<Value> {
    record(&state, "upload_background.php");
    let upload = read_multipart(multipart).await;
    let url = format!("http://backend.test/backgrounds/{}", upload.file_name);
    state.lock().unwrap().uploads.push(upload);
    Json(json!({ "success": true, "data": { "background_picture_url": url } }))
}

async fn search_friends(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record_json(&state, "search_friends.php", &body);
    Json(json!({
        "success": true,
        "data": {
            "users": [
                {
                    "user_id": "8",
                    "username": "fernhunter",
                    "full_name": "Fern Hunter",
                    "profile_picture_url": "",
                    "is_friend": "1"
                },
                {
                    "user_id": 9,
                    "username": "mossy",
                    "full_name": null,
                    "is_friend": 0
                }
            ]
        }
    }))
}

async fn toggle_like(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    record_json(&state, "toggle_like.php", &body);
    Json(json!({ "success": true, "message": "liked" }))
}

/// Generic JSON endpoint that records its body and says yes
async fn ack_json(
    State(state): State<Shared>,
    uri: axum::http::Uri,
    Json(body): Json<Value>,
) -> Json<Value> {
    let endpoint = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    record_json(&state, &endpoint, &body);
    Json(json!({ "success": true, "message": "OK" }))
}

/// Application wired to a fake backend
pub struct TestApp {
    pub backend: FakeBackend,
    pub state: AppState,
    pub connectivity: Arc<StaticConnectivity>,
    pub _temp_dir: TempDir,
    temp_path: PathBuf,
}

impl TestApp {
    /// Online, signed out, empty store
    pub async fn new() -> Self {
        let backend = FakeBackend::start().await;
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().to_path_buf();

        let config = config::AppConfig {
            api: config::ApiConfig {
                base_url: backend.base_url.clone(),
                connect_timeout_secs: 2,
                request_timeout_secs: 5,
                upload_timeout_secs: 5,
                user_agent: "Nomad/test".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_path.join("nomad_offline.db"),
            },
            outbox: config::OutboxConfig {
                dir: temp_path.join("outbox"),
            },
            connectivity: config::ConnectivityConfig {
                mode: config::ConnectivityMode::Online,
                probe_timeout_ms: 500,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let connectivity = Arc::new(StaticConnectivity::new(true));
        let state = AppState::new(config)
            .await
            .unwrap()
            .with_connectivity(connectivity.clone());

        Self {
            backend,
            state,
            connectivity,
            _temp_dir: temp_dir,
            temp_path,
        }
    }

    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    /// Sign in through the backend
    pub async fn sign_in(&self) -> Session {
        self.state
            .account_service()
            .login("wanderer@example.com", TEST_PASSWORD)
            .await
            .unwrap()
    }

    /// Write a small image outside the outbox
    pub fn write_image(&self, name: &str) -> PathBuf {
        let path = self.temp_path.join(name);
        std::fs::write(&path, b"\xFF\xD8\xFF\xE0fake-jpeg").unwrap();
        path
    }
}
