#![allow(clippy::unwrap_used)]
// End-to-end tests of the dashboard over HttpBackend using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tundash_core::{
    ApplyState, Command, CommandResult, CoreError, Dashboard, DashboardConfig, InstanceId,
    InstancePatch, NodeKind, StreamState,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn remote_config() -> Value {
    json!({
        "general": { "enabled": true, "log_level": "info" },
        "clients": [],
        "servers": [{
            "id": "s1",
            "alias": "edge",
            "enabled": true,
            "local_port": "4567",
            "remote_addr": "10.0.0.1",
            "remote_port": 51820,
            "tun_local": "192.168.201.1",
            "tun_peer": "192.168.201.2"
        }]
    })
}

fn status_body() -> Value {
    json!({
        "processes": [{ "id": "s1", "alias": "edge", "type": "server", "pid": 123, "running": true }],
        "diagnostics": {
            "binaries": { "client": "missing", "server": "ab12" },
            "iptables": "Chain PREROUTING (policy ACCEPT)",
            "interfaces": []
        }
    })
}

/// A document using every field this client models plus some it does
/// not, with ports in each encoding the backend has been seen to store.
fn detailed_config() -> Value {
    json!({
        "general": { "enabled": true, "log_level": "debug", "theme": "dark" },
        "clients": [{
            "id": "c1",
            "alias": "home",
            "enabled": true,
            "local_addr": "127.0.0.1",
            "local_port": 1234,
            "remote_addr": "vpn.example.com",
            "remote_port": "",
            "tun_local": "192.168.200.1",
            "tun_peer": "192.168.200.2",
            "tun_name": "tun9",
            "tun_local_ipv6": "fcc8::1",
            "tun_peer_ipv6": "fcc8::2",
            "handshake_file": "/etc/phantun/hs.bin",
            "ipv4_only": true,
            "mtu": 1400
        }],
        "servers": [{
            "id": "s1",
            "alias": "edge",
            "enabled": false,
            "local_port": "4567",
            "remote_addr": "10.0.0.1",
            "remote_port": null,
            "tun_local": "192.168.201.1",
            "tun_peer": "192.168.201.2",
            "notes": { "owner": "ops" }
        }],
        "version": 3
    })
}

async fn setup() -> (MockServer, DashboardConfig) {
    setup_with(remote_config()).await
}

async fn setup_with(document: Value) -> (MockServer, DashboardConfig) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .mount(&server)
        .await;

    let config = DashboardConfig::new(Url::parse(&server.uri()).unwrap()).oneshot();
    (server, config)
}

async fn pushed_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/api/config")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn running_server_renders_active_row() {
    let (_server, config) = setup().await;
    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let graph = dashboard.topology_snapshot();
    let row = graph.row(&InstanceId::from("s1")).unwrap();
    assert!(row.active);
    assert_eq!(row.pid, Some(123));
    assert_eq!(row.node(NodeKind::RemoteEndpoint).label, "10.0.0.1:51820");

    dashboard.shutdown().await;
}

#[tokio::test]
async fn disabling_pushes_full_document_then_restarts() {
    let (server, config) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/action/restart"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let result = dashboard
        .execute(Command::SetEnabled {
            id: "s1".into(),
            enabled: false,
        })
        .await
        .unwrap();
    let CommandResult::Edited(outcome) = result else {
        panic!("unexpected result: {result:?}");
    };
    assert_eq!(outcome.apply, ApplyState::Applied);

    let mut expected = remote_config();
    expected["servers"][0]["enabled"] = json!(false);
    assert_eq!(pushed_bodies(&server).await, [expected]);

    dashboard.shutdown().await;
}

#[tokio::test]
async fn edit_preserves_every_other_field() {
    let (server, config) = setup_with(detailed_config()).await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    dashboard
        .execute(Command::UpdateInstance {
            id: "c1".into(),
            patch: InstancePatch {
                alias: Some("cabin".into()),
                ..InstancePatch::default()
            },
        })
        .await
        .unwrap();

    let mut expected = detailed_config();
    expected["clients"][0]["alias"] = json!("cabin");
    assert_eq!(pushed_bodies(&server).await, [expected]);

    dashboard.shutdown().await;
}

#[tokio::test]
async fn unparseable_port_does_not_block_load_or_commit() {
    let mut document = remote_config();
    document["servers"][0]["local_port"] = json!("abc");
    let (server, config) = setup_with(document).await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let s1 = dashboard.store().snapshot().instance(&"s1".into()).cloned().unwrap();
    assert!(s1.endpoint.local_port().is_invalid());
    assert_eq!(s1.endpoint.local_port().to_string(), "abc");

    dashboard
        .execute(Command::RemoveInstance { id: "s1".into() })
        .await
        .unwrap();

    let bodies = pushed_bodies(&server).await;
    assert_eq!(bodies[0]["servers"], json!([]));

    dashboard.shutdown().await;
}

#[tokio::test]
async fn restart_failure_reports_saved_but_not_applied() {
    let (server, config) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/action/restart"))
        .respond_with(ResponseTemplate::new(500).set_body_string("exit status 1"))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let outcome = dashboard
        .editor()
        .toggle(&"s1".into())
        .await
        .unwrap();

    match outcome.apply {
        ApplyState::Failed(e) => assert_eq!(e.status(), Some(500)),
        other => panic!("expected restart failure, got: {other:?}"),
    }
    dashboard.shutdown().await;
}

#[tokio::test]
async fn rejected_push_surfaces_transport_error() {
    let (server, config) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid config"))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let err = dashboard
        .store()
        .commit(|c| c.general.enabled = false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::Transport {
            message: "HTTP 400: invalid config".into(),
            status: Some(400),
        }
    );
    assert!(dashboard.store().snapshot().general.enabled);
    dashboard.shutdown().await;
}

#[tokio::test]
async fn status_diagnostics_are_parsed() {
    let (_server, config) = setup().await;
    let dashboard = Dashboard::new(config).unwrap();
    dashboard.start().await.unwrap();

    let snapshot = dashboard.poller().snapshot();
    assert!(snapshot.is_running(&"s1".into()));
    assert_eq!(snapshot.summary().running, 1);
    let binaries = snapshot.diagnostics.binaries.as_ref().unwrap();
    assert!(!binaries.client_present());
    assert!(binaries.server_present());
    assert!(!binaries.ok);
    assert!(snapshot.diagnostics.firewall.is_some());

    dashboard.shutdown().await;
}

#[tokio::test]
async fn log_stream_fills_view_then_goes_down() {
    let (server, mut config) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/logs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(concat!(
                    "data: {\"process_id\":\"s1\",\"stream\":\"stdout\",\"content\":\"listening\"}\n\n",
                    ": heartbeat\n\n",
                    "data: not json\n\n",
                    "data: {\"content\":\"service started\"}\n\n",
                )),
        )
        .mount(&server)
        .await;
    config.stream_logs = true;

    let dashboard = Dashboard::new(config).unwrap();
    let mut state = dashboard.logs().subscribe_state();
    dashboard.start().await.unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| matches!(s, StreamState::Down { .. })),
    )
    .await
    .unwrap()
    .unwrap();

    let lines = dashboard.logs().lines();
    let contents: Vec<_> = lines.iter().map(|l| l.content.as_str()).collect();
    assert_eq!(contents, ["listening", "service started"]);
    assert_eq!(lines[1].source, "system");
    assert_eq!(dashboard.logs().dropped_records(), 1);

    dashboard.shutdown().await;
}
