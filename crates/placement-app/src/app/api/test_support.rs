//! Shared fixtures for the HTTP handler tests.

use std::sync::Arc;

use salvo::http::ReqBody;
use salvo::test::{RequestBuilder, ResponseExt, TestClient};
use salvo::{Router, Service};
use serde_json::Value;

use crate::config::{
    AuthConfig, AuthMethod, ConfigHandler, DatabaseConfig, LoggingConfig, ProxyAuthConfig,
    RateLimitConfig, ServerConfig, Settings, StorageConfig,
};
use crate::store_handler::{FileStorageHandler, StoreHandler};
use placement_db::memory::MemoryStore;
use placement_service::storage::LocalFileStorage;

pub const HOSPITAL_USER: i32 = 100;
pub const FACILITY_USER: i32 = 200;
pub const OTHER_FACILITY_USER: i32 = 201;

const BASE: &str = "http://127.0.0.1:5800";
const BOUNDARY: &str = "placement-test-boundary";

fn test_settings(upload_dir: &str) -> Settings {
    Settings {
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            run_migrations: false,
        },
        auth: AuthConfig {
            method: AuthMethod::Proxy,
            proxy: ProxyAuthConfig::default(),
            single_user: None,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_string(),
        },
        rate_limit: RateLimitConfig {
            enabled: false,
            requests_per_minute: 60,
        },
    }
}

/// A full API service over an in-memory store and a temporary upload dir.
pub struct TestApp {
    pub service: Service,
    pub facility_id: i32,
    _uploads: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let store = Arc::new(MemoryStore::new());
        let _hospital = store.add_hospital(HOSPITAL_USER, "St. Mary's");
        let facility = store.add_facility(FACILITY_USER, "Oak House");
        let _other = store.add_facility(OTHER_FACILITY_USER, "Birch Lodge");

        let settings = test_settings(&uploads.path().to_string_lossy());
        let router = Router::new()
            .hoop(StoreHandler { store })
            .hoop(FileStorageHandler {
                files: Arc::new(LocalFileStorage::new(uploads.path())),
            })
            .hoop(ConfigHandler {
                settings: Arc::new(settings),
            })
            .push(super::routes());

        Self {
            service: Service::new(router),
            facility_id: facility.id,
            _uploads: uploads,
        }
    }
}

pub fn as_user(builder: RequestBuilder, user_id: i32, role: &str) -> RequestBuilder {
    builder
        .add_header("x-user-id", user_id.to_string(), true)
        .add_header("x-user-role", role, true)
}

pub fn get(path: &str, user_id: i32, role: &str) -> RequestBuilder {
    as_user(TestClient::get(format!("{BASE}{path}")), user_id, role)
}

pub fn post(path: &str, user_id: i32, role: &str) -> RequestBuilder {
    as_user(TestClient::post(format!("{BASE}{path}")), user_id, role)
}

pub fn put(path: &str, user_id: i32, role: &str) -> RequestBuilder {
    as_user(TestClient::put(format!("{BASE}{path}")), user_id, role)
}

pub fn delete(path: &str, user_id: i32, role: &str) -> RequestBuilder {
    as_user(TestClient::delete(format!("{BASE}{path}")), user_id, role)
}

/// Attaches a single multipart `file` field.
pub fn with_file(builder: RequestBuilder, file_name: &str, contents: &[u8]) -> RequestBuilder {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    builder
        .add_header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
            true,
        )
        .body(ReqBody::Once(body.into()))
}

/// Sends `builder` and returns the status with the JSON body (`Null` when empty).
pub async fn send_json(builder: RequestBuilder, app: &TestApp) -> (u16, Value) {
    let mut response = builder.send(&app.service).await;
    let status = response
        .status_code
        .map_or(0, |status| status.as_u16());
    let text = response.take_string().await.unwrap_or_default();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("response body is JSON")
    };
    (status, body)
}

/// Creates a pending request from the hospital user and returns its id.
pub async fn create_request(app: &TestApp) -> i64 {
    let (status, body) = send_json(
        post("/api/requests", HOSPITAL_USER, "hospital").json(&serde_json::json!({
            "facility_id": app.facility_id,
            "age": 81,
            "gender": "female",
            "condition": "hip fracture",
        })),
        app,
    )
    .await;
    assert_eq!(status, 201, "create failed: {body}");
    body["id"].as_i64().expect("request id")
}

/// Creates and accepts a request; returns the room id.
pub async fn open_room(app: &TestApp) -> String {
    let request_id = create_request(app).await;
    let (status, body) = send_json(
        post(
            &format!("/api/requests/{request_id}/accept"),
            FACILITY_USER,
            "facility",
        ),
        app,
    )
    .await;
    assert_eq!(status, 201, "accept failed: {body}");
    body["room"]["id"].as_str().expect("room id").to_string()
}
