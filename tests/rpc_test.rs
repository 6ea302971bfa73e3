// SPDX-License-Identifier: MIT
use futures_util::{SinkExt, StreamExt};
use questd::{config::DaemonConfig, ipc::event::EventBroadcaster, storage::Storage, AppContext};
use serde_json::{json, Value};
/// Integration tests for the questd JSON-RPC server.
/// Spins up a real daemon on a free port and exercises the RPC surface.
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Start a daemon on a random port and return the WebSocket URL.
async fn start_test_daemon() -> (String, Arc<AppContext>) {
    let data_dir = tempfile::tempdir().unwrap().keep();
    let port = get_free_port();

    let config = Arc::new(DaemonConfig::new(
        Some(port),
        Some(data_dir.clone()),
        Some("warn".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(&data_dir).await.unwrap());
    let broadcaster = Arc::new(EventBroadcaster::new());
    // Empty token disables the auth challenge for tests.
    let ctx = Arc::new(AppContext::assemble(
        config,
        storage,
        broadcaster,
        String::new(),
    ));

    let ctx_server = ctx.clone();
    tokio::spawn(async move {
        questd::ipc::run(ctx_server).await.ok();
    });

    // Give server a moment to bind
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let url = format!("ws://127.0.0.1:{}", ctx.config.port);
    (url, ctx)
}

fn get_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn ws_rpc(url: &str, method: &str, params: Value) -> Value {
    let (mut ws, _) = connect_async(url).await.expect("ws connect failed");

    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    });
    ws.send(Message::Text(serde_json::to_string(&request).unwrap()))
        .await
        .unwrap();

    // Read messages until we get the response (skip notifications)
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        if let Message::Text(text) = msg {
            let v: Value = serde_json::from_str(&text).unwrap();
            if v.get("id").is_some() {
                return v;
            }
        }
    }
}

#[tokio::test]
async fn test_daemon_ping() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "daemon.ping", json!({})).await;
    assert_eq!(resp["result"]["pong"], true);
}

#[tokio::test]
async fn test_daemon_status() {
    let (url, ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "daemon.status", json!({})).await;
    let result = &resp["result"];
    assert!(result["version"].is_string());
    assert!(result["uptimeSecs"].is_number());
    assert_eq!(result["port"], ctx.config.port);
}

#[tokio::test]
async fn test_method_not_found() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "no.such.method", json!({})).await;
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn test_progress_get_creates_default_record() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "progress.get", json!({ "userId": "alice" })).await;
    let progress = &resp["result"]["progress"];
    assert_eq!(progress["userId"], "alice");
    assert_eq!(progress["coins"], 0);
    assert_eq!(progress["xp"], 0);
    assert_eq!(progress["level"], 1);
    assert_eq!(progress["dailyStreak"], 0);
    assert_eq!(resp["result"]["achievements"], json!([]));
}

#[tokio::test]
async fn test_progress_get_requires_user_id() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "progress.get", json!({})).await;
    assert_eq!(resp["error"]["code"], -32004);
}

#[tokio::test]
async fn test_unknown_user_reset_is_user_not_found() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "progress.reset", json!({ "userId": "ghost" })).await;
    assert_eq!(resp["error"]["code"], -32001);
}

#[tokio::test]
async fn test_apply_action_awards_and_unlocks() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(
        &url,
        "progress.applyAction",
        json!({ "userId": "alice", "actionType": "complete_goal" }),
    )
    .await;
    let result = &resp["result"];
    assert_eq!(result["coinsAwarded"], 25);
    // 25 for the action + 15 for the first_goal achievement.
    assert_eq!(result["progress"]["coins"], 40);
    assert_eq!(result["progress"]["totalActions"], 1);
    let newly = result["newAchievements"].as_array().unwrap();
    assert!(newly.iter().any(|a| a["code"] == "first_goal"));
}

#[tokio::test]
async fn test_apply_action_missing_action_type() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "progress.applyAction", json!({ "userId": "alice" })).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_apply_action_negative_amount_rejected() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(
        &url,
        "progress.applyAction",
        json!({ "userId": "alice", "actionType": "create_note", "amount": -1 }),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_apply_action_oversized_amount_rejected() {
    let (url, ctx) = start_test_daemon().await;
    let resp = ws_rpc(
        &url,
        "progress.applyAction",
        json!({ "userId": "alice", "actionType": "create_note", "amount": u64::MAX }),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
    // Nothing was mutated by the rejected call.
    assert!(ctx.store.get("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_check_in_then_same_day_noop() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "progress.checkIn", json!({ "userId": "bob" })).await;
    assert_eq!(resp["result"]["dailyBonusAwarded"], true);
    assert_eq!(resp["result"]["progress"]["dailyStreak"], 1);

    let resp = ws_rpc(&url, "progress.checkIn", json!({ "userId": "bob" })).await;
    assert_eq!(resp["result"]["dailyBonusAwarded"], false);
    assert_eq!(resp["result"]["progress"]["dailyStreak"], 1);
}

#[tokio::test]
async fn test_achievements_list_covers_catalog() {
    let (url, _ctx) = start_test_daemon().await;
    let resp = ws_rpc(&url, "achievements.list", json!({ "userId": "alice" })).await;
    let achievements = resp["result"].as_array().unwrap();
    assert!(achievements.len() >= 10);
    for a in achievements {
        assert!(a["code"].is_string());
        assert!(a["title"].is_string());
        assert!(a["target"].is_number());
        assert_eq!(a["unlocked"], false);
        assert_eq!(a["progress"], 0.0);
    }
}

#[tokio::test]
async fn test_unlock_notification_is_pushed() {
    let (url, _ctx) = start_test_daemon().await;

    // Hold a subscriber connection open, then trigger an unlock from a
    // second connection and expect the push notification on the first.
    let (mut sub, _) = connect_async(&url).await.unwrap();
    // Let the server task register its broadcast subscription.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    ws_rpc(
        &url,
        "progress.applyAction",
        json!({ "userId": "alice", "actionType": "log_prayer" }),
    )
    .await;

    let deadline = tokio::time::Duration::from_secs(2);
    let found = tokio::time::timeout(deadline, async {
        loop {
            let msg = sub.next().await.unwrap().unwrap();
            if let Message::Text(text) = msg {
                let v: Value = serde_json::from_str(&text).unwrap();
                if v["method"] == "achievement.unlocked" {
                    return v;
                }
            }
        }
    })
    .await
    .expect("no achievement.unlocked notification within 2s");

    assert_eq!(found["params"]["userId"], "alice");
    assert_eq!(found["params"]["code"], "first_prayer");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_health_on_shared_port() {
    let (url, _ctx) = start_test_daemon().await;
    let addr = url.strip_prefix("ws://").unwrap().to_string();

    use std::io::{Read as _, Write as _};
    let mut stream = std::net::TcpStream::connect(&addr).unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("ok"));
}

#[tokio::test]
async fn test_auth_required_when_token_set() {
    let data_dir = tempfile::tempdir().unwrap().keep();
    let port = get_free_port();
    let config = Arc::new(DaemonConfig::new(
        Some(port),
        Some(data_dir.clone()),
        Some("warn".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(&data_dir).await.unwrap());
    let broadcaster = Arc::new(EventBroadcaster::new());
    let ctx = Arc::new(AppContext::assemble(
        config,
        storage,
        broadcaster,
        "secret-token".to_string(),
    ));
    let ctx_server = ctx.clone();
    tokio::spawn(async move {
        questd::ipc::run(ctx_server).await.ok();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let url = format!("ws://127.0.0.1:{port}");

    // Without daemon.auth the first call is rejected.
    let resp = ws_rpc(&url, "progress.get", json!({ "userId": "alice" })).await;
    assert_eq!(resp["error"]["code"], -32004);

    // Authenticated connection works.
    let (mut ws, _) = connect_async(&url).await.unwrap();
    let auth = json!({
        "jsonrpc": "2.0", "id": 1, "method": "daemon.auth",
        "params": { "token": "secret-token" }
    });
    ws.send(Message::Text(serde_json::to_string(&auth).unwrap()))
        .await
        .unwrap();
    let msg = ws.next().await.unwrap().unwrap();
    let v: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
    assert_eq!(v["result"]["authenticated"], true);

    let req = json!({
        "jsonrpc": "2.0", "id": 2, "method": "progress.get",
        "params": { "userId": "alice" }
    });
    ws.send(Message::Text(serde_json::to_string(&req).unwrap()))
        .await
        .unwrap();
    let msg = ws.next().await.unwrap().unwrap();
    let v: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
    assert_eq!(v["result"]["progress"]["coins"], 0);
}
