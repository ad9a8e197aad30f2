use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use port_bridge::clipboard::MemoryClipboard;
use port_bridge::runtime::TOKIO;
use port_bridge::{BootstrapError, HostConfig, ReadyState, bootstrap_with_clipboard};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

fn fixture() -> String {
    format!("{}/tests/fixtures/echo_app.js", env!("CARGO_MANIFEST_DIR"))
}

fn host_config(location: &str, server_url: &str, extra: &[&str]) -> HostConfig {
    let bundle = fixture();
    let mut args = vec![
        "port-bridge",
        "--bundle",
        bundle.as_str(),
        "--location",
        location,
        "--server-url",
        server_url,
        "--clipboard",
        "memory",
    ];
    args.extend_from_slice(extra);
    HostConfig::parse_from(args)
}

/// Game server stand-in: sends `frames` once the client connects and reports
/// every text frame it receives.
fn game_server(frames: Vec<&'static str>) -> (String, mpsc::Receiver<String>) {
    let listener = TOKIO.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    TOKIO.spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    let _ = tx.send(text.to_string());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    (url, rx)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test_log::test]
fn server_frames_round_trip_through_the_application() {
    let (url, server_rx) = game_server(vec!["state:42", "flags", "copy"]);
    let clipboard = Arc::new(MemoryClipboard::new());
    let config = host_config(
        "http://localhost:3000/?room=game42&playerName=Ada",
        &url,
        &[],
    );

    let page = bootstrap_with_clipboard(&config, clipboard.clone()).unwrap();

    assert_eq!(page.config().room_id, "game42");
    assert_eq!(page.config().opponent_name, "Ada");
    assert!(page.config().joining_room);

    assert_eq!(server_rx.recv_timeout(TIMEOUT).unwrap(), "echo:state:42");

    let flags: serde_json::Value =
        serde_json::from_str(&server_rx.recv_timeout(TIMEOUT).unwrap()).unwrap();
    assert_eq!(flags["host"], "http://localhost:3000/?room=game42&playerName=Ada");
    assert_eq!(flags["roomId"], "game42");

    assert!(wait_until(|| clipboard.contents().as_deref() == Some("game42")));
    // The transient copy element is gone once the copy is done.
    assert!(wait_until(|| page.document().count_by_tag("textarea") == 0));
    assert_eq!(page.socket_state(), ReadyState::Open);

    // Nothing from the clipboard port reaches the server.
    assert!(server_rx.recv_timeout(Duration::from_millis(200)).is_err());

    page.shutdown();
}

#[test_log::test]
fn unreachable_server_leaves_the_application_running() {
    let listener = TOKIO.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    drop(listener);

    let clipboard = Arc::new(MemoryClipboard::new());
    let config = host_config("http://localhost:3000/", &url, &[]);
    let page = bootstrap_with_clipboard(&config, clipboard).unwrap();

    assert!(!page.config().joining_room);
    assert!(wait_until(|| page.socket_state() == ReadyState::Closed));

    page.shutdown();
}

#[test_log::test]
fn missing_mount_point_aborts_startup() {
    let config = host_config(
        "http://localhost:3000/",
        "ws://127.0.0.1:9/ws",
        &["--page-element", "app"],
    );
    let err = bootstrap_with_clipboard(&config, Arc::new(MemoryClipboard::new()))
        .err()
        .unwrap();
    assert!(matches!(err, BootstrapError::MissingMountPoint(_)));
}

#[test_log::test]
fn invalid_location_aborts_startup() {
    let config = host_config("not a url", "ws://127.0.0.1:9/ws", &[]);
    let err = bootstrap_with_clipboard(&config, Arc::new(MemoryClipboard::new()))
        .err()
        .unwrap();
    assert!(matches!(err, BootstrapError::InvalidLocation { .. }));
}
