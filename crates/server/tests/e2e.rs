use std::net::SocketAddr;
use std::path::PathBuf;

use configs::AppConfig;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

struct TestApp {
    base_url: String,
    dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Full production wiring from config; the chat API points at a closed port.
async fn start_server() -> anyhow::Result<TestApp> {
    let dir = std::env::temp_dir().join(format!("server_e2e_{}", Uuid::new_v4()));
    let closed = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let closed_addr = closed.local_addr()?;
    drop(closed);

    let mut cfg = AppConfig::default();
    cfg.storage.data_dir = dir.to_string_lossy().to_string();
    cfg.storage.document_file = dir.join("db.json").to_string_lossy().to_string();
    cfg.storage.credentials_file = dir.join("users.json").to_string_lossy().to_string();
    cfg.chat.api_base = format!("http://{}:{}/v1", closed_addr.ip(), closed_addr.port());
    cfg.chat.api_key_file = dir.join("missing_key.txt").to_string_lossy().to_string();
    cfg.chat.connect_timeout_secs = 2;
    cfg.chat.request_timeout_secs = 5;
    cfg.normalize_and_validate()?;

    let app = server::startup::build_app(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, dir })
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_data_round_trip_persists_to_disk() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let creds = [("username", "alice"), ("password", "pw1")];

    let body: Value = c.post(format!("{}/register/", app.base_url)).form(&creds).send().await?.json().await?;
    assert_eq!(body, json!({"status": "success"}));

    let payload = json!({"projects": [{"name": "demo", "lang": "rust"}]}).to_string();
    let body: Value = c
        .post(format!("{}/api/", app.base_url))
        .form(&[creds[0], creds[1], ("json", payload.as_str())])
        .send().await?
        .json().await?;
    assert_eq!(body, json!({"status": "success"}));

    let body: Value = c.get(format!("{}/api/", app.base_url)).query(&creds).send().await?.json().await?;
    assert_eq!(body, json!({"projects": [{"name": "demo", "lang": "rust"}]}));

    // whole document on disk, keyed by username
    let on_disk: Value = serde_json::from_slice(&tokio::fs::read(app.dir.join("db.json")).await?)?;
    assert_eq!(on_disk["alice"]["projects"][0]["name"], "demo");
    // the credential store never holds the plain password
    let users = tokio::fs::read_to_string(app.dir.join("users.json")).await?;
    assert!(users.contains("alice"));
    assert!(!users.contains("pw1"));
    Ok(())
}

#[tokio::test]
async fn e2e_chat_without_api_key_is_bad_gateway() -> anyhow::Result<()> {
    if std::env::var("OPENAI_API_KEY").is_ok() { return Ok(()); }
    let app = start_server().await?;
    let res = reqwest::Client::new()
        .post(format!("{}/chat/", app.base_url))
        .form(&[("chat_history", r#"[{"role":"user","content":"hello"}]"#)])
        .send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_GATEWAY);
    let body = res.json::<Value>().await?;
    assert_eq!(body, json!({"status": "error", "message": "Chat completion failed"}));
    Ok(())
}
