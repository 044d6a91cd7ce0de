// MIT License - Copyright (c) 2026 Peter Wright
// End-to-end tests against a scripted fake panel

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use envisalink_bridge::protocol::encode_frame;
use envisalink_bridge::{AlarmBridge, BridgeConfig, BridgeEvent, CommandOutcome, EventReceiver};

const TIMEOUT: Duration = Duration::from_secs(5);

struct FakePanel {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl FakePanel {
    async fn expect_line(&mut self, expected: &str) {
        let line = timeout(TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for panel line")
            .expect("panel read failed")
            .expect("panel connection closed");
        assert_eq!(line, expected);
    }

    async fn send(&mut self, payload: &str) {
        self.writer
            .write_all(encode_frame(payload).as_bytes())
            .await
            .expect("panel write failed");
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("panel write failed");
    }
}

/// Start a listener, connect the bridge to it, and return both ends.
async fn start(config_fn: impl FnOnce(envisalink_bridge::BridgeConfigBuilder) -> BridgeConfig) -> (AlarmBridge, FakePanel) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = config_fn(
        BridgeConfig::builder()
            .panel_host("127.0.0.1")
            .panel_port(addr.port())
            .panel_password("1234"),
    );

    let (bridge, accepted) = tokio::join!(AlarmBridge::connect(config), async {
        listener.accept().await.unwrap().0
    });
    let (reader, writer) = accepted.into_split();
    (
        bridge.expect("bridge connect failed"),
        FakePanel {
            lines: BufReader::new(reader).lines(),
            writer,
        },
    )
}

async fn recv_event(rx: &mut EventReceiver) -> BridgeEvent {
    timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn read_until_contains(stream: &mut TcpStream, needle: &str) -> String {
    let mut acc = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = timeout(TIMEOUT, stream.read(&mut buf))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
            .expect("client read failed");
        assert!(n > 0, "connection closed before {needle:?} arrived");
        acc.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&acc).to_string();
        if text.contains(needle) {
            return text;
        }
    }
}

async fn read_greeting(stream: &mut TcpStream) {
    let mut greeting = [0u8; 6];
    timeout(TIMEOUT, stream.read_exact(&mut greeting))
        .await
        .expect("timed out waiting for greeting")
        .expect("greeting read failed");
    assert_eq!(&greeting, b"505300");
}

#[tokio::test]
async fn test_login_handshake() {
    let (_bridge, mut panel) = start(|b| b.build()).await;

    // Panel challenges, bridge answers with 005 + password
    panel.send("5053").await;
    panel.expect_line("00512345F").await;

    // Login success triggers a status report request
    panel.send("5051").await;
    panel.expect_line("00191").await;
}

#[tokio::test]
async fn test_zone_update_event() {
    let (bridge, mut panel) = start(|b| b.suppress_initial_update(false).build()).await;
    let mut events = bridge.subscribe();

    panel.send("609001").await;
    match recv_event(&mut events).await {
        BridgeEvent::ZoneUpdate(evt) => {
            assert_eq!(evt.zone, 1);
            assert_eq!(evt.code, "609");
            assert_eq!(evt.status, "open");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let snapshot = bridge.snapshot().await;
    assert_eq!(snapshot.zones.get(&1).unwrap().status, "open");
}

#[tokio::test]
async fn test_initial_update_suppressed_by_default() {
    let (bridge, mut panel) = start(|b| b.build()).await;
    let mut events = bridge.subscribe();

    panel.send("609002").await;
    panel.send("610002").await;

    // Only the second observation of zone 2 produces an event
    match recv_event(&mut events).await {
        BridgeEvent::ZoneUpdate(evt) => {
            assert_eq!(evt.zone, 2);
            assert_eq!(evt.status, "restored");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_tracked_command_completion() {
    let (bridge, mut panel) = start(|b| b.build()).await;

    let outcome = bridge.send_command_tracked("0301").await.unwrap();
    panel.expect_line("0301C4").await;
    panel.send("500030").await;

    let outcome = timeout(TIMEOUT, outcome)
        .await
        .expect("timed out waiting for outcome")
        .expect("outcome channel closed");
    assert_eq!(
        outcome,
        CommandOutcome::Completed {
            echoed: "030".to_string()
        }
    );
}

#[tokio::test]
async fn test_tracked_command_error() {
    let (bridge, mut panel) = start(|b| b.build()).await;

    let outcome = bridge.send_command_tracked("0301").await.unwrap();
    panel.expect_line("0301C4").await;
    panel.send("502020").await;

    let outcome = timeout(TIMEOUT, outcome).await.unwrap().unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Failed {
            detail: "020".to_string()
        }
    );
}

#[tokio::test]
async fn test_untracked_send_displaces_tracked_command() {
    let (bridge, mut panel) = start(|b| b.build()).await;

    let stale = bridge.send_command_tracked("0301").await.unwrap();
    panel.expect_line("0301C4").await;

    // A plain send takes over the command channel; the acknowledge that
    // follows belongs to it, not to the earlier tracked command.
    bridge.send_command("000").await.unwrap();
    panel.expect_line("00090").await;
    panel.send("500000").await;

    let result = timeout(TIMEOUT, stale)
        .await
        .expect("timed out waiting for displaced receiver");
    assert!(
        result.is_err(),
        "displaced tracked receiver must observe a closed channel, got {result:?}"
    );
}

#[tokio::test]
async fn test_bad_checksum_dropped_when_verifying() {
    let (bridge, mut panel) = start(|b| {
        b.verify_checksums(true)
            .suppress_initial_update(false)
            .build()
    })
    .await;
    let mut events = bridge.subscribe();

    // Wrong checksum: ignored entirely
    panel.send_raw(b"609001FF\r\n").await;
    // Correct frame right behind it is still processed
    panel.send("609003").await;

    match recv_event(&mut events).await {
        BridgeEvent::ZoneUpdate(evt) => assert_eq!(evt.zone, 3),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(bridge.snapshot().await.zones.get(&1).is_none());
}

#[tokio::test]
async fn test_connection_ended_event() {
    let (bridge, panel) = start(|b| b.build()).await;
    let mut events = bridge.subscribe();

    drop(panel);
    match recv_event(&mut events).await {
        BridgeEvent::ConnectionEnded => {}
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_proxy_greeting_and_auth() {
    let (bridge, _panel) = start(|b| b.proxy_enable(true).server_port(0).build()).await;
    let addr = bridge.proxy_addr().expect("proxy enabled");

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_greeting(&mut client).await;

    // Correct password: everything we send comes back (the proxy mirrors
    // client bytes), then the login-success frame, then the 005 acknowledge.
    client
        .write_all(encode_frame("0051234").as_bytes())
        .await
        .unwrap();
    let received = read_until_contains(&mut client, "5000052A\r\n").await;
    assert!(received.contains("00512345F"), "echo missing: {received:?}");
    assert!(received.contains("5051CB\r\n"), "accept missing: {received:?}");
}

#[tokio::test]
async fn test_proxy_rejects_bad_password() {
    let (bridge, _panel) = start(|b| b.proxy_enable(true).server_port(0).build()).await;
    let addr = bridge.proxy_addr().expect("proxy enabled");

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_greeting(&mut client).await;

    client
        .write_all(encode_frame("005wrong1").as_bytes())
        .await
        .unwrap();
    read_until_contains(&mut client, "5050CA\r\n").await;

    // The proxy closes the connection after the failure frame
    let mut buf = [0u8; 64];
    let closed = timeout(TIMEOUT, async {
        loop {
            match client.read(&mut buf).await {
                Ok(0) => break true,
                Ok(_) => continue,
                Err(_) => break true,
            }
        }
    })
    .await
    .expect("connection was not closed");
    assert!(closed);
}

#[tokio::test]
async fn test_proxy_broadcasts_to_all_clients_without_auth() {
    let (bridge, mut panel) = start(|b| b.proxy_enable(true).server_port(0).build()).await;
    let addr = bridge.proxy_addr().expect("proxy enabled");

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    read_greeting(&mut first).await;
    read_greeting(&mut second).await;
    // Let the accept loop finish registering both clients
    sleep(Duration::from_millis(100)).await;

    // Neither client has authenticated; both still get panel traffic
    panel.send("609004").await;
    read_until_contains(&mut first, "60900433\r\n").await;
    read_until_contains(&mut second, "60900433\r\n").await;
}

#[tokio::test]
async fn test_proxy_relays_authenticated_commands() {
    let (bridge, mut panel) = start(|b| b.proxy_enable(true).server_port(0).build()).await;
    let addr = bridge.proxy_addr().expect("proxy enabled");

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_greeting(&mut client).await;
    client
        .write_all(encode_frame("0051234").as_bytes())
        .await
        .unwrap();
    read_until_contains(&mut client, "5051CB\r\n").await;

    // Status report request: locally acknowledged, relayed to the panel
    client
        .write_all(encode_frame("001").as_bytes())
        .await
        .unwrap();
    read_until_contains(&mut client, "50000126\r\n").await;
    panel.expect_line("00191").await;
}

#[tokio::test]
async fn test_proxy_relays_commands_even_without_login() {
    // The password check only decides whether a connection stays open;
    // commands from a client that never logged in are still relayed.
    let (bridge, mut panel) = start(|b| b.proxy_enable(true).server_port(0).build()).await;
    let addr = bridge.proxy_addr().expect("proxy enabled");

    let mut client = TcpStream::connect(addr).await.unwrap();
    read_greeting(&mut client).await;

    client
        .write_all(encode_frame("001").as_bytes())
        .await
        .unwrap();
    read_until_contains(&mut client, "50000126\r\n").await;
    panel.expect_line("00191").await;
}
