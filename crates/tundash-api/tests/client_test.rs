#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tundash_api::models::{ConfigDocument, IptablesEntry};
use tundash_api::{ApiClient, Error, LogFrame};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn sample_config() -> serde_json::Value {
    json!({
        "general": { "enabled": true, "log_level": "info" },
        "clients": [{
            "id": "c1",
            "alias": "home",
            "enabled": true,
            "local_addr": "127.0.0.1",
            "local_port": "1234",
            "remote_addr": "vpn.example.com",
            "remote_port": "4567",
            "tun_local": "192.168.200.1",
            "tun_peer": "192.168.200.2"
        }],
        "servers": []
    })
}

// ── Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn test_get_config() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_config()))
        .mount(&server)
        .await;

    let doc = client.get_config().await.unwrap();

    assert!(doc.general.enabled);
    assert_eq!(doc.clients.len(), 1);
    assert_eq!(doc.clients[0].id, "c1");
    assert_eq!(doc.clients[0].local_port, Some(json!("1234")));
    assert_eq!(doc.clients[0].remote_port, Some(json!("4567")));
    assert_eq!(doc.clients[0].tunnel.tun_peer, "192.168.200.2");
    assert!(doc.servers.is_empty());
}

#[tokio::test]
async fn test_save_config_posts_full_document() {
    let (server, client) = setup().await;

    let doc: ConfigDocument = serde_json::from_value(sample_config()).unwrap();

    // String ports go back out as strings.
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .and(body_json(sample_config()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.save_config(&doc).await.unwrap();
}

#[tokio::test]
async fn test_save_config_failure_carries_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("Saved but failed to start processes: exit 1\n"),
        )
        .mount(&server)
        .await;

    let err = client
        .save_config(&ConfigDocument::default())
        .await
        .unwrap_err();

    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Saved but failed to start processes: exit 1");
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_config_bad_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = client.get_config().await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body == "<html>"),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enabled": true,
            "system": "running",
            "binary_ok": true,
            "processes": [
                { "id": "s1", "alias": "A", "type": "server", "pid": 123, "running": true }
            ],
            "diagnostics": {
                "binaries": { "client": "missing", "server": "ab12", "ok": false },
                "iptables": { "masquerade": 1, "dnat": 2, "total": 3 },
                "interfaces": [{ "name": "tun0", "status": "UP", "addrs": ["192.168.1.1/32"] }]
            }
        })))
        .mount(&server)
        .await;

    let status = client.get_status().await.unwrap();

    assert_eq!(status.enabled, Some(true));
    assert_eq!(status.processes.len(), 1);
    assert_eq!(status.processes[0].pid, Some(123));
    assert_eq!(status.processes[0].kind.as_deref(), Some("server"));

    let diagnostics = status.diagnostics.unwrap();
    assert_eq!(diagnostics.interfaces[0].name, "tun0");
    assert!(matches!(
        diagnostics.iptables,
        Some(IptablesEntry::Counters(c)) if c.total == 3
    ));
}

#[tokio::test]
async fn test_get_status_with_null_processes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processes": null,
            "diagnostics": { "binaries": null, "iptables": null, "interfaces": null }
        })))
        .mount(&server)
        .await;

    let status = client.get_status().await.unwrap();
    assert!(status.processes.is_empty());
    assert!(status.diagnostics.unwrap().interfaces.is_empty());
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restart() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/action/restart"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.restart().await.unwrap();
}

#[tokio::test]
async fn test_restart_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/action/restart"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.restart().await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_get_firewall_rules() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/iptables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "raw": "-A POSTROUTING -j MASQUERADE\n-A PREROUTING -j DNAT",
            "rules": ["-A POSTROUTING -j MASQUERADE", "-A PREROUTING -j DNAT"]
        })))
        .mount(&server)
        .await;

    let rules = client.get_firewall_rules().await.unwrap();
    assert_eq!(rules.rules.len(), 2);
}

// ── Log stream ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_open_log_stream_decodes_sse_body() {
    let (server, client) = setup().await;

    let body = concat!(
        "data: {\"process_id\":\"c1\",\"stream\":\"stdout\",\"content\":\"up\"}\n\n",
        ": heartbeat\n\n",
        "data: {\"process_id\":\"c1\",\"stream\":\"stderr\",\"content\":\"warn\"}\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let stream = client.open_log_stream().await.unwrap();
    let frames: Vec<LogFrame> = stream.map(Result::unwrap).collect().await;

    assert_eq!(
        frames,
        vec![
            LogFrame::Record(
                "{\"process_id\":\"c1\",\"stream\":\"stdout\",\"content\":\"up\"}".into()
            ),
            LogFrame::Heartbeat,
            LogFrame::Record(
                "{\"process_id\":\"c1\",\"stream\":\"stderr\",\"content\":\"warn\"}".into()
            ),
        ]
    );
}

#[tokio::test]
async fn test_open_log_stream_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let result = client.open_log_stream().await;
    assert!(matches!(result, Err(Error::Status { status: 401, .. })));
}
