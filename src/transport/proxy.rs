// MIT License - Copyright (c) 2026 Peter Wright
// Downstream proxy: multiplexes additional TPI clients onto the one panel session

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::catalogue::{Catalogue, ClientAction};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{encode_frame, split_frames, CommandFrame};

/// Sent to every client immediately on connect, before any authentication.
/// The literal is fixed, CRLF and all absent, exactly as panels in the field
/// expect it.
const GREETING: &[u8] = b"505300";

/// TCP server that lets additional TPI clients share the panel session.
///
/// Every panel frame is fanned out to every connected client via
/// [`broadcast`](Self::broadcast). Client traffic flows the other way only
/// after a password check; accepted commands are acknowledged locally and
/// relayed upstream through the `panel_tx` channel.
pub struct ProxyServer {
    clients: Arc<Mutex<Vec<ClientHandle>>>,
    local_addr: SocketAddr,
    accept_handle: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

struct ClientHandle {
    id: u64,
    addr: SocketAddr,
    writer: Arc<Mutex<tokio::net::tcp::OwnedWriteHalf>>,
}

struct ClientContext {
    id: u64,
    addr: SocketAddr,
    writer: Arc<Mutex<tokio::net::tcp::OwnedWriteHalf>>,
    clients: Arc<Mutex<Vec<ClientHandle>>>,
    catalogue: Arc<dyn Catalogue>,
    password: String,
    panel_tx: mpsc::UnboundedSender<String>,
}

impl ProxyServer {
    /// Bind the listener and start accepting clients.
    ///
    /// `panel_tx` receives `code + payload` strings for every client command
    /// accepted for relay.
    pub async fn start(
        config: &BridgeConfig,
        catalogue: Arc<dyn Catalogue>,
        panel_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Arc<Self>> {
        let listener =
            TcpListener::bind((config.server_host.as_str(), config.server_port)).await?;
        let local_addr = listener.local_addr()?;
        info!("Proxy listening on {local_addr}");

        let clients: Arc<Mutex<Vec<ClientHandle>>> = Arc::new(Mutex::new(Vec::new()));
        let password = config.effective_server_password().to_string();

        let accept_handle = {
            let clients = clients.clone();
            tokio::spawn(async move {
                let next_id = AtomicU64::new(0);
                loop {
                    match listener.accept().await {
                        Ok((stream, addr)) => {
                            let id = next_id.fetch_add(1, Ordering::Relaxed);
                            accept_client(
                                stream,
                                addr,
                                id,
                                clients.clone(),
                                catalogue.clone(),
                                password.clone(),
                                panel_tx.clone(),
                            )
                            .await;
                        }
                        Err(e) => {
                            warn!("Proxy accept error: {e}");
                        }
                    }
                }
            })
        };

        Ok(Arc::new(Self {
            clients,
            local_addr,
            accept_handle: std::sync::Mutex::new(Some(accept_handle)),
        }))
    }

    /// The bound listen address. Useful when the configured port is 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Fan a panel frame out to every connected client.
    ///
    /// Takes `code + payload` (checksum already stripped) and re-encodes it
    /// per client write. Authentication state is irrelevant here; every
    /// client gets the traffic from the moment it connects. A client whose
    /// socket write fails is dropped from the set; the others are
    /// unaffected.
    pub async fn broadcast(&self, payload: &str) {
        let line = encode_frame(payload);
        let mut clients = self.clients.lock().await;
        let mut failed = Vec::new();
        for client in clients.iter() {
            let mut writer = client.writer.lock().await;
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Dropping proxy client {} ({}): {e}", client.id, client.addr);
                failed.push(client.id);
            }
        }
        clients.retain(|c| !failed.contains(&c.id));
    }

    /// Stop accepting and disconnect every client.
    pub async fn shutdown(&self) {
        self.abort_accept_loop();
        let mut clients = self.clients.lock().await;
        for client in clients.drain(..) {
            let mut writer = client.writer.lock().await;
            let _ = writer.shutdown().await;
        }
    }

    fn abort_accept_loop(&self) {
        if let Ok(mut guard) = self.accept_handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for ProxyServer {
    fn drop(&mut self) {
        self.abort_accept_loop();
    }
}

async fn accept_client(
    stream: TcpStream,
    addr: SocketAddr,
    id: u64,
    clients: Arc<Mutex<Vec<ClientHandle>>>,
    catalogue: Arc<dyn Catalogue>,
    password: String,
    panel_tx: mpsc::UnboundedSender<String>,
) {
    info!("Proxy client {id} connected from {addr}");
    let (reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));

    {
        let mut w = writer.lock().await;
        if let Err(e) = w.write_all(GREETING).await {
            warn!("Failed to greet proxy client {id}: {e}");
            return;
        }
    }

    clients.lock().await.push(ClientHandle {
        id,
        addr,
        writer: writer.clone(),
    });

    let ctx = ClientContext {
        id,
        addr,
        writer,
        clients,
        catalogue,
        password,
        panel_tx,
    };
    tokio::spawn(client_loop(reader, ctx));
}

async fn client_loop(mut reader: tokio::net::tcp::OwnedReadHalf, ctx: ClientContext) {
    let mut authed = false;
    let mut buf = vec![0u8; 4096];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Proxy client {} disconnected", ctx.id);
                break;
            }
            Ok(n) => {
                let chunk = &buf[..n];

                // Everything a client sends is mirrored straight back to it.
                {
                    let mut writer = ctx.writer.lock().await;
                    if writer.write_all(chunk).await.is_err() {
                        break;
                    }
                }

                let text = String::from_utf8_lossy(chunk);
                let mut keep_open = true;
                for token in split_frames(&text) {
                    if !handle_client_frame(&ctx, token, &mut authed).await {
                        keep_open = false;
                        break;
                    }
                }
                if !keep_open {
                    break;
                }
            }
            Err(e) => {
                debug!("Proxy client {} read error: {e}", ctx.id);
                break;
            }
        }
    }

    ctx.clients.lock().await.retain(|c| c.id != ctx.id);
    info!("Proxy client {} ({}) removed", ctx.id, ctx.addr);
}

/// Handle one client frame. Returns false when the connection should close.
///
/// Every recognized frame is acknowledged with the catalogue's `send`
/// payload. The password check only controls whether the connection stays
/// open; relaying is not gated on it.
async fn handle_client_frame(ctx: &ClientContext, token: &str, authed: &mut bool) -> bool {
    let Some(frame) = CommandFrame::parse(token) else {
        debug!("Proxy client {}: malformed token {token:?}", ctx.id);
        return true;
    };
    let Some(meta) = ctx.catalogue.client_meta(frame.code) else {
        debug!("Proxy client {}: unrecognized command {token}", ctx.id);
        return true;
    };
    debug!("Proxy client {}: {} ({})", ctx.id, token, meta.name);

    match meta.action {
        ClientAction::CheckPassword => {
            if frame.payload == ctx.password {
                *authed = true;
                debug!("Proxy client {} authenticated", ctx.id);
                if !write_client(ctx, &encode_frame("5051")).await {
                    return false;
                }
            } else {
                warn!("Proxy client {} failed authentication", ctx.id);
                let _ = write_client(ctx, &encode_frame("5050")).await;
                return false;
            }
        }
        ClientAction::Forward => {
            if !*authed {
                debug!("Proxy client {}: relaying {} without login", ctx.id, frame.code);
            }
            if ctx
                .panel_tx
                .send(frame.without_checksum().to_string())
                .is_err()
            {
                warn!("Panel relay channel closed");
            }
        }
        ClientAction::None => {}
    }

    write_client(ctx, &encode_frame(meta.send)).await
}

async fn write_client(ctx: &ClientContext, line: &str) -> bool {
    let mut writer = ctx.writer.lock().await;
    writer.write_all(line.as_bytes()).await.is_ok()
}
