use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{extract::State, http::{HeaderMap, StatusCode}, routing::post, Json, Router};
use configs::ChatConfig;
use serde_json::{json, Value};
use service::chat::{ChatError, ChatMessage, ChatRelay, OpenAiChatRelay, SYSTEM_PROMPT};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Upstream {
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn completions(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    up.seen.lock().unwrap().push((auth, body.clone()));

    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    match last.as_str() {
        "fail" => (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": {"message": "rate limited"}}))),
        "empty" => (StatusCode::OK, Json(json!({"choices": []}))),
        _ => (
            StatusCode::OK,
            Json(json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": format!("echo: {last}")}}]})),
        ),
    }
}

async fn start_upstream() -> anyhow::Result<(String, Upstream)> {
    let up = Upstream::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(up.clone());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("upstream error: {}", e); }
    });
    Ok((format!("http://{}:{}/v1", addr.ip(), addr.port()), up))
}

fn relay(api_base: &str) -> anyhow::Result<OpenAiChatRelay> {
    let cfg = ChatConfig { api_base: api_base.to_string(), model: "test-model".into(), ..ChatConfig::default() };
    Ok(OpenAiChatRelay::from_config(&cfg, Some("sk-test".into()))?)
}

#[tokio::test]
async fn relay_sends_prompt_and_returns_first_choice() -> anyhow::Result<()> {
    let (base, up) = start_upstream().await?;
    let relay = relay(&base)?;

    let reply = relay.relay(&[ChatMessage::new("user", "how do I download my repls?")]).await?;
    assert_eq!(reply, "echo: how do I download my repls?");

    let seen = up.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0], json!({"role": "system", "content": SYSTEM_PROMPT}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "how do I download my repls?"}));
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn relay_maps_upstream_errors() -> anyhow::Result<()> {
    let (base, _up) = start_upstream().await?;
    let relay = relay(&base)?;

    let err = relay.relay(&[ChatMessage::new("user", "fail")]).await.unwrap_err();
    assert!(matches!(err, ChatError::Upstream { status: 429, .. }), "{err}");

    let err = relay.relay(&[ChatMessage::new("user", "empty")]).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyReply), "{err}");
    Ok(())
}

#[tokio::test]
async fn relay_reports_unreachable_upstream() -> anyhow::Result<()> {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let relay = relay(&format!("http://{}:{}/v1", addr.ip(), addr.port()))?;
    let err = relay.relay(&[ChatMessage::new("user", "hi")]).await.unwrap_err();
    assert!(matches!(err, ChatError::Transport(_) | ChatError::Timeout), "{err}");
    Ok(())
}
