use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::command::{Command, CommandDispatcher, NewUser};
use super::message::StreamEvent;
use super::snapshot_loader::SnapshotLoader;
use super::websocket::{EventStreamListener, send_or_keep};
use crate::aggregator::{AggregatorSettings, Snapshot, SnapshotKind};
use crate::model::Permission;
use crate::session::{DashboardSession, REFRESH_AFTER_CLEAR, WorkItem};
use crate::utils::DashboardError;

type Routes = HashMap<&'static str, (u16, String)>;

/// Serve canned JSON responses keyed by `"METHOD /path"`. Unknown routes get
/// a 404. Every request line is reported on the returned receiver.
async fn fake_http(routes: Routes) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let routes = routes.clone();
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                respond(stream, &routes, &seen_tx).await;
            });
        }
    });

    (format!("http://{addr}"), seen_rx)
}

async fn respond(mut stream: TcpStream, routes: &Routes, seen: &mpsc::UnboundedSender<String>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + 4 + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let route: String = request_line
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    let body = String::from_utf8_lossy(&buf[head_end + 4..]).to_string();
    let _ = seen.send(format!("{route} {body}").trim_end().to_string());

    let (status, payload) = routes
        .get(route.as_str())
        .cloned()
        .unwrap_or((404, r#"{"error": "not found"}"#.to_string()));
    let response = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.ok();
}

async fn closed_port_url(scheme: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("{scheme}://{addr}")
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_fetch_topics_snapshot() {
    let routes = Routes::from([(
        "GET /api/topics",
        (200, json!({"topics": {"a": ["c1", "c2"], "b": 3}}).to_string()),
    )]);
    let (base_url, _seen) = fake_http(routes).await;
    let loader = SnapshotLoader::new(&base_url, Duration::from_secs(5)).unwrap();

    match loader.fetch(SnapshotKind::Topics).await.unwrap() {
        Snapshot::Topics(counts) => {
            assert_eq!(counts["a"], 2);
            assert_eq!(counts["b"], 3);
        }
        other => panic!("Expected topics, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_reports_http_status() {
    let routes = Routes::from([("GET /api/stats", (500, "{}".to_string()))]);
    let (base_url, _seen) = fake_http(routes).await;
    let loader = SnapshotLoader::with_client(http_client(), &format!("{base_url}/"));

    match loader.fetch(SnapshotKind::Stats).await {
        Err(DashboardError::Status { status, url }) => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/api/stats"));
            assert!(!url.contains("//api"));
        }
        other => panic!("Expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_rejects_non_json_body() {
    let routes = Routes::from([("GET /api/logs", (200, "<html>".to_string()))]);
    let (base_url, _seen) = fake_http(routes).await;
    let loader = SnapshotLoader::with_client(http_client(), &base_url);

    assert!(matches!(
        loader.fetch(SnapshotKind::Logs).await,
        Err(DashboardError::Json(_))
    ));
}

#[tokio::test]
async fn test_load_all_forwards_every_kind() {
    let routes = Routes::from([
        ("GET /api/topics", (200, json!({"topics": {"t": 1}}).to_string())),
        ("GET /api/stats", (200, json!({"running": true}).to_string())),
        ("GET /api/logs", (200, json!({"logs": []}).to_string())),
    ]);
    let (base_url, _seen) = fake_http(routes).await;
    let loader = SnapshotLoader::with_client(http_client(), &base_url);
    let (tx, mut rx) = mpsc::unbounded_channel();

    loader.load_all(&tx).await.unwrap();
    drop(tx);

    let mut loaded = Vec::new();
    let mut failed = Vec::new();
    while let Some(item) = rx.recv().await {
        match item {
            WorkItem::Snapshot(snapshot) => loaded.push(snapshot.kind()),
            WorkItem::SnapshotFailed { kind, error } => {
                assert!(error.contains("404"), "unexpected error: {error}");
                failed.push(kind);
            }
            other => panic!("Unexpected work item {other:?}"),
        }
    }
    assert_eq!(loaded.len(), 3);
    assert!(loaded.contains(&SnapshotKind::Stats));
    assert_eq!(failed.len(), SnapshotKind::ALL.len() - 3);
}

#[tokio::test]
async fn test_load_all_survives_unreachable_server() {
    let loader = SnapshotLoader::with_client(http_client(), &closed_port_url("http").await);
    let (tx, mut rx) = mpsc::unbounded_channel();

    loader.load_all(&tx).await.unwrap();
    drop(tx);

    let mut count = 0;
    while let Some(item) = rx.recv().await {
        assert!(matches!(item, WorkItem::SnapshotFailed { .. }));
        count += 1;
    }
    assert_eq!(count, SnapshotKind::ALL.len());
}

#[tokio::test]
async fn test_clear_dashboard_reloads_system_clients_and_topics() {
    let routes = Routes::from([
        (
            "GET /api/system",
            (200, json!({"ip_addresses": [{"interface": "eth0", "ip": "10.0.0.5"}]}).to_string()),
        ),
        ("GET /api/clients", (200, json!({"c-1": {"username": "amy"}}).to_string())),
        ("GET /api/topics", (200, json!({"topics": {"fresh": 2}}).to_string())),
    ]);
    let (base_url, mut seen) = fake_http(routes).await;
    let (work_tx, mut work_rx) = mpsc::unbounded_channel();
    let mut session = DashboardSession::new(AggregatorSettings::default(), 64)
        .with_loader(SnapshotLoader::with_client(http_client(), &base_url), work_tx);
    session.handle(WorkItem::Stream(
        StreamEvent::decode("new_topic", json!({"topic": "stale"})).unwrap(),
    ));

    session.handle(WorkItem::Command(Command::ClearDashboard));
    assert!(session.aggregator().topics().is_empty());

    let mut reloaded = Vec::new();
    for _ in 0..REFRESH_AFTER_CLEAR.len() {
        let item = tokio::time::timeout(Duration::from_secs(5), work_rx.recv())
            .await
            .expect("refresh result arrives")
            .unwrap();
        match &item {
            WorkItem::Snapshot(snapshot) => reloaded.push(snapshot.kind()),
            other => panic!("Expected a snapshot, got {other:?}"),
        }
        session.handle(item);
    }
    for kind in REFRESH_AFTER_CLEAR {
        assert!(reloaded.contains(&kind), "{} was not reloaded", kind.name());
    }

    let mut requests = Vec::new();
    while let Ok(line) = seen.try_recv() {
        requests.push(line);
    }
    for path in ["GET /api/system", "GET /api/clients", "GET /api/topics"] {
        assert!(requests.iter().any(|line| line.starts_with(path)), "{path} missing");
    }
    assert_eq!(requests.len(), 3);

    let aggregator = session.aggregator();
    assert_eq!(aggregator.topic("fresh").unwrap().message_count, 2);
    assert!(aggregator.topic("stale").is_none());
    assert_eq!(aggregator.clients().len(), 1);
    assert_eq!(aggregator.system_info().ip_addresses[0].ip, "10.0.0.5");
}

#[tokio::test]
async fn test_dispatch_broker_commands_over_http() {
    let routes = Routes::from([
        ("GET /api/broker/start", (200, json!({"success": true}).to_string())),
        (
            "GET /api/broker/stop",
            (200, json!({"success": false, "error": "Broker not running"}).to_string()),
        ),
        ("GET /api/broker/pause", (503, "unavailable".to_string())),
        ("POST /api/config", (200, String::new())),
    ]);
    let (base_url, mut seen) = fake_http(routes).await;
    let (outbound, _outbound_rx) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(http_client(), &base_url, outbound);

    assert!(dispatcher.dispatch(&Command::StartBroker).await.success);

    let stopped = dispatcher.dispatch(&Command::StopBroker).await;
    assert_eq!(stopped.error.as_deref(), Some("Broker not running"));

    let paused = dispatcher.dispatch(&Command::PauseBroker).await;
    assert!(!paused.success);
    assert!(paused.error.unwrap().contains("503"));

    let saved = dispatcher
        .dispatch(&Command::SaveConfig(Default::default()))
        .await;
    assert!(saved.success);

    let mut requests = Vec::new();
    while let Ok(line) = seen.try_recv() {
        requests.push(line);
    }
    let post = requests
        .iter()
        .find(|line| line.starts_with("POST /api/config"))
        .expect("config was posted");
    assert!(post.contains(r#""port":1883"#));
}

#[tokio::test]
async fn test_dispatch_user_commands_over_event_stream() {
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(http_client(), "http://unused", outbound);

    let response = dispatcher
        .dispatch(&Command::AddUser(NewUser {
            username: "amy".to_string(),
            password: "pw".to_string(),
            permissions: vec![Permission::Write],
        }))
        .await;
    assert!(response.success);

    let frame = outbound_rx.try_recv().unwrap();
    let value: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(value["event"], "add_user");
    assert_eq!(value["data"]["permissions"], json!(["write"]));

    drop(outbound_rx);
    let response = dispatcher.dispatch(&Command::ClearDashboard).await;
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("event stream channel closed")
    );
}

#[tokio::test]
async fn test_dispatch_unreachable_server_fails_softly() {
    let (outbound, _outbound_rx) = mpsc::unbounded_channel();
    let dispatcher =
        CommandDispatcher::new(http_client(), &closed_port_url("http").await, outbound);

    let response = dispatcher.dispatch(&Command::StartBroker).await;
    assert!(!response.success);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_listener_forwards_decoded_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let frames = [
            json!({"event": "new_topic", "data": {"topic": "t", "count": 1}}).to_string(),
            "garbage".to_string(),
            json!({"event": "unknown_event", "data": {}}).to_string(),
            json!({"event": "log_update", "data": {"level": "ERROR", "message": "x"}})
                .to_string(),
        ];
        for frame in frames {
            ws.send(WsMessage::Text(frame.into())).await.unwrap();
        }
        // hold the connection open until the client goes away
        while ws.next().await.is_some() {}
    });

    let (work_tx, mut work_rx) = mpsc::unbounded_channel();
    let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(
        EventStreamListener::new(&format!("ws://{addr}"), Duration::from_millis(50))
            .run(work_tx, outbound_rx),
    );

    let first = tokio::time::timeout(Duration::from_secs(2), work_rx.recv())
        .await
        .unwrap();
    assert!(matches!(first, Some(WorkItem::Stream(StreamEvent::Topic(_)))));
    let second = tokio::time::timeout(Duration::from_secs(2), work_rx.recv())
        .await
        .unwrap();
    assert!(matches!(second, Some(WorkItem::Stream(StreamEvent::Log(_)))));

    drop(work_rx);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("listener stops once the session is gone")
        .unwrap();
}

#[tokio::test]
async fn test_listener_sends_outbound_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (received_tx, mut received_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let WsMessage::Text(text) = msg {
                received_tx.send(text.to_string()).unwrap();
            }
        }
    });

    let (work_tx, _work_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let dispatcher = CommandDispatcher::new(http_client(), "http://unused", outbound_tx);
    tokio::spawn(
        EventStreamListener::new(&format!("ws://{addr}"), Duration::from_millis(50))
            .run(work_tx, outbound_rx),
    );

    dispatcher
        .dispatch(&Command::DeleteUser {
            username: "bob".to_string(),
        })
        .await;

    let frame = tokio::time::timeout(Duration::from_secs(2), received_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(
        value,
        json!({"event": "delete_user", "data": {"username": "bob"}})
    );
}

#[tokio::test]
async fn test_listener_reconnects_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for n in 0..2u64 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let frame = json!({"event": "new_topic", "data": {"topic": "t", "count": n}});
            ws.send(WsMessage::Text(frame.to_string().into())).await.unwrap();
            ws.close(None).await.ok();
        }
    });

    let (work_tx, mut work_rx) = mpsc::unbounded_channel();
    let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    tokio::spawn(
        EventStreamListener::new(&format!("ws://{addr}"), Duration::from_millis(20))
            .run(work_tx, outbound_rx),
    );

    let mut counts = Vec::new();
    for _ in 0..2 {
        let item = tokio::time::timeout(Duration::from_secs(3), work_rx.recv())
            .await
            .unwrap();
        match item {
            Some(WorkItem::Stream(StreamEvent::Topic(topic))) => counts.push(topic.count),
            other => panic!("Expected topic event, got {other:?}"),
        }
    }
    assert_eq!(counts, vec![Some(0), Some(1)]);
}

#[tokio::test]
async fn test_listener_stops_when_session_closed() {
    let (work_tx, work_rx) = mpsc::unbounded_channel();
    let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    drop(work_rx);

    let url = closed_port_url("ws").await;
    tokio::time::timeout(
        Duration::from_secs(2),
        EventStreamListener::new(&url, Duration::from_millis(10)).run(work_tx, outbound_rx),
    )
    .await
    .expect("listener gives up once nobody takes work");
}

#[tokio::test]
async fn test_failed_outbound_frame_is_kept_for_next_connection() {
    let frame = WsMessage::Text(json!({"event": "clear_logs", "data": null}).to_string().into());

    let (mut dead, dead_rx) = futures::channel::mpsc::channel::<WsMessage>(1);
    drop(dead_rx);
    let mut unsent = None;
    assert!(!send_or_keep(&mut dead, frame.clone(), &mut unsent).await);
    assert_eq!(unsent.as_ref(), Some(&frame));

    let (mut live, mut live_rx) = futures::channel::mpsc::channel::<WsMessage>(1);
    let retry = unsent.take().unwrap();
    assert!(send_or_keep(&mut live, retry, &mut unsent).await);
    assert!(unsent.is_none());
    assert_eq!(live_rx.next().await, Some(frame));
}
