//! Live streams on a real listener: shutdown and stream slots

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use audio_relay::config::Config;
use audio_relay::services::ActiveStreams;
use audio_relay::web::WebServer;
use common::{FakeRunner, app_state, test_config};

const LIVE_SCRIPT: &str = "while true; do printf data; sleep 0.05; done";
const RADIO_PATH: &str = "/radio-stream?url=http://radio.example.com/live";

struct RunningServer {
    addr: SocketAddr,
    active: Arc<ActiveStreams>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

async fn start(config: Config, runner: Arc<FakeRunner>) -> RunningServer {
    let state = app_state(config, runner);
    let active = state.active_streams.clone();
    let server = WebServer::new(state).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve_with_shutdown(listener, async move {
        let _ = stopped.await;
    }));

    RunningServer { addr, active, stop, task }
}

/// Send a GET and return the connection plus the first bytes of the response
async fn get(addr: SocketAddr, path: &str) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = vec![0u8; 2048];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let head = String::from_utf8_lossy(&buf[..n]).into_owned();
    (stream, head)
}

#[tokio::test]
async fn shutdown_ends_open_radio_stream() {
    let server = start(test_config(LIVE_SCRIPT), Arc::new(FakeRunner::default())).await;

    let (_client, head) = get(server.addr, RADIO_PATH).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(server.active.count(), 1);

    server.stop.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), server.task).await;

    assert!(stopped.is_ok(), "server kept running with a live stream open");
    stopped.unwrap().unwrap().unwrap();
    assert_eq!(server.active.count(), 0);
}

#[tokio::test]
async fn full_server_rejects_before_resolving() {
    let mut config = test_config(LIVE_SCRIPT);
    config.relay.max_concurrent_streams = 1;
    let runner = Arc::new(FakeRunner::default());
    let server = start(config, runner.clone()).await;

    let (_live, head) = get(server.addr, RADIO_PATH).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");

    let (_busy, head) = get(server.addr, "/stream?url=dQw4w9WgXcQ").await;
    assert!(head.starts_with("HTTP/1.1 503"), "{head}");
    assert!(runner.programs().is_empty());

    server.stop.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), server.task).await;
    assert!(stopped.is_ok());
}
