// ============================================
// File: crates/wakelink-server/tests/end_to_end.rs
// ============================================
//! End-to-end tests: a real daemon on loopback, a real client, a mock
//! Wake-on-LAN sender and a file-backed storage image.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

use wakelink_common::MacAddress;
use wakelink_core::crypto::KeyMode;
use wakelink_server::handlers::PacketHandler;
use wakelink_server::{build_handler, DeviceClient, Result, Server, ServerConfig};
use wakelink_transport::mock::MockWakeSender;

const TOKEN: &str = "0123456789abcdef0123456789abcdef0123456789abcdef";

struct Device {
    server: Arc<Server>,
    addr: SocketAddr,
    waker: Arc<MockWakeSender>,
    handler: Arc<PacketHandler>,
    task: JoinHandle<Result<()>>,
}

impl Device {
    async fn start(config: ServerConfig) -> Self {
        let waker = Arc::new(MockWakeSender::new());
        let handler = build_handler(&config, waker.clone()).await.unwrap();

        let server = Arc::new(Server::new(config));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr();

        let task = {
            let server = Arc::clone(&server);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { server.serve(listener, handler).await })
        };

        Self {
            server,
            addr,
            waker,
            handler,
            task,
        }
    }

    fn client(&self, token: &str) -> DeviceClient {
        DeviceClient::new(self.addr, "WL-E2E", token, KeyMode::Shared)
            .unwrap()
            .with_timeout(Duration::from_secs(3))
    }

    async fn stop(self) {
        self.server.shutdown();
        self.task.await.unwrap().unwrap();
    }
}

fn config(dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.device.device_id = "WL-E2E".to_string();
    config.device.token_file = dir.join("token").display().to_string();
    config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
    config.storage.path = dir.join("eeprom.bin").display().to_string();
    config
}

fn data(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn test_command_set_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token"), format!("{TOKEN}\n")).unwrap();
    let device = Device::start(config(dir.path())).await;
    let client = device.client(TOKEN);

    let pong = client.send("ping", Map::new()).await.unwrap();
    assert_eq!(pong["status"], "success");
    assert_eq!(pong["result"], "pong");

    let woke = client
        .send("wake", data(json!({ "mac": "AA:BB:CC:DD:EE:FF" })))
        .await
        .unwrap();
    assert_eq!(woke["result"], "wol_sent");
    assert_eq!(
        device.waker.take_sent(),
        vec!["AA:BB:CC:DD:EE:FF".parse::<MacAddress>().unwrap()]
    );

    let missing = client.send("wake", Map::new()).await.unwrap();
    assert_eq!(missing["error"], "MAC_ADDRESS_REQUIRED");

    let info = client.send("info", Map::new()).await.unwrap();
    assert_eq!(info["device_id"], "WL-E2E");
    assert_eq!(info["crypto_enabled"], true);
    assert_eq!(info["requests"], 4);

    let crypto = client.send("crypto_info", Map::new()).await.unwrap();
    assert_eq!(crypto["key_info"], "SECURE|REQUESTS:5/1000|STATUS:ACTIVE");

    let unknown = client.send("open_setup", Map::new()).await.unwrap();
    assert_eq!(unknown["error"], "UNKNOWN_COMMAND");
    assert_eq!(unknown["command"], "open_setup");

    assert_eq!(device.handler.stats().handled, 6);
    device.stop().await;
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token"), TOKEN).unwrap();
    let device = Device::start(config(dir.path())).await;

    let intruder = device.client("ffffffffffffffffffffffffffffffff");
    assert!(intruder.send("wake", data(json!({ "mac": "AABBCCDDEEFF" }))).await.is_err());
    assert_eq!(device.waker.sent_count(), 0);

    let owner = device.client(TOKEN);
    let counters = owner.send("counter_info", Map::new()).await.unwrap();
    assert_eq!(counters["requests"], 1);

    assert_eq!(device.handler.stats().rejected, 1);
    device.stop().await;
}

#[tokio::test]
async fn test_update_token_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token"), TOKEN).unwrap();
    let device = Device::start(config(dir.path())).await;
    let client = device.client(TOKEN);

    let updated = client.send("update_token", Map::new()).await.unwrap();
    assert_eq!(updated["result"], "token_updated");
    let new_token = updated["new_token"].as_str().unwrap().to_string();
    assert_eq!(new_token.len(), 96);

    assert!(client.send("ping", Map::new()).await.is_err());

    client.rotate(&new_token).unwrap();
    let counters = client.send("counter_info", Map::new()).await.unwrap();
    assert_eq!(counters["requests"], 1);

    let saved = std::fs::read_to_string(dir.path().join("token")).unwrap();
    assert_eq!(saved.trim(), new_token);
    device.stop().await;
}

#[tokio::test]
async fn test_limit_then_restart_keeps_window_closed() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.device.token = Some(TOKEN.to_string());
    cfg.crypto.request_limit = 3;

    let device = Device::start(cfg.clone()).await;
    let client = device.client(TOKEN);
    for _ in 0..3 {
        let reply = client.send("ping", Map::new()).await.unwrap();
        assert_eq!(reply["status"], "success");
    }

    let refused = client.send("ping", Map::new()).await.unwrap();
    assert_eq!(refused["status"], "error");
    assert_eq!(refused["error"], "ERROR:LIMIT_EXCEEDED");
    assert!(refused["request_id"].is_null());
    device.stop().await;

    let restarted = Device::start(cfg).await;
    let refused = restarted
        .client(TOKEN)
        .send("reset_counter", Map::new())
        .await
        .unwrap();
    assert_eq!(refused["error"], "ERROR:LIMIT_EXCEEDED");
    restarted.stop().await;
}

#[tokio::test]
async fn test_counter_checkpoint_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.device.token = Some(TOKEN.to_string());

    let device = Device::start(cfg.clone()).await;
    let client = device.client(TOKEN);
    for _ in 0..12 {
        client.send("ping", Map::new()).await.unwrap();
    }
    device.stop().await;

    let restarted = Device::start(cfg).await;
    let counters = restarted
        .client(TOKEN)
        .send("counter_info", Map::new())
        .await
        .unwrap();
    // Checkpoint at 10, plus this request.
    assert_eq!(counters["requests"], 11);
    restarted.stop().await;
}
