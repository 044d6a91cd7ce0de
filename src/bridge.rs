// MIT License - Copyright (c) 2026 Peter Wright
// Top-level facade wiring the panel session, state store and proxy together

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

use crate::catalogue::{Catalogue, TpiCatalogue};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::event::{event_channel, AlarmSnapshot, BridgeEvent, EventReceiver, EventSender};
use crate::state::AlarmStateStore;
use crate::transport::{CommandOutcome, ProxyServer, UpstreamSession};

/// Connection to a panel interface plus the optional downstream proxy.
///
/// `connect` resolves as soon as the TCP session is up; the login handshake
/// is then driven by the panel's challenge frames in the background. Events
/// start flowing to subscribers as soon as the panel starts talking.
pub struct AlarmBridge {
    event_tx: EventSender,
    store: Arc<Mutex<AlarmStateStore>>,
    session: UpstreamSession,
    proxy: Option<Arc<ProxyServer>>,
    forward_handle: Option<tokio::task::JoinHandle<()>>,
}

impl AlarmBridge {
    /// Connect using the built-in TPI command catalogue.
    pub async fn connect(config: BridgeConfig) -> Result<Self> {
        Self::connect_with_catalogue(config, Arc::new(TpiCatalogue)).await
    }

    /// Connect with a caller-supplied command catalogue.
    pub async fn connect_with_catalogue(
        config: BridgeConfig,
        catalogue: Arc<dyn Catalogue>,
    ) -> Result<Self> {
        let (event_tx, _keepalive) = event_channel(256);
        let store = Arc::new(Mutex::new(AlarmStateStore::new(&config, event_tx.clone())));

        let (panel_tx, mut panel_rx) = mpsc::unbounded_channel::<String>();
        let proxy = if config.proxy_enable {
            Some(ProxyServer::start(&config, catalogue.clone(), panel_tx).await?)
        } else {
            None
        };

        let session = match UpstreamSession::connect(
            &config,
            catalogue,
            store.clone(),
            event_tx.clone(),
            proxy.clone(),
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                if let Some(proxy) = &proxy {
                    proxy.shutdown().await;
                }
                return Err(e);
            }
        };

        // Relay proxy client commands up to the panel.
        let forward_handle = proxy.as_ref().map(|_| {
            let link = session.link();
            tokio::spawn(async move {
                while let Some(payload) = panel_rx.recv().await {
                    if let Err(e) = link.send(&payload).await {
                        warn!("Failed to relay client command to panel: {e}");
                    }
                }
            })
        });

        Ok(Self {
            event_tx,
            store,
            session,
            proxy,
            forward_handle,
        })
    }

    /// Subscribe to bridge events. Each receiver is independent; dropping it
    /// ends that subscription without affecting others.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Send `code + payload` to the panel, fire-and-forget.
    pub async fn send_command(&self, payload: &str) -> Result<()> {
        self.session.send(payload).await
    }

    /// Send a command and obtain a receiver resolved by the panel's
    /// acknowledge or error frame. A later tracked send displaces an
    /// unresolved earlier one.
    pub async fn send_command_tracked(
        &self,
        payload: &str,
    ) -> Result<oneshot::Receiver<CommandOutcome>> {
        self.session.send_tracked(payload).await
    }

    /// Current aggregate zone/partition/user state.
    pub async fn snapshot(&self) -> AlarmSnapshot {
        self.store.lock().await.snapshot()
    }

    /// Emit the current aggregate as a `Data` event to all subscribers.
    pub async fn publish_snapshot(&self) {
        self.store.lock().await.emit_snapshot();
    }

    /// The proxy's bound address, when the proxy is enabled.
    pub fn proxy_addr(&self) -> Option<SocketAddr> {
        self.proxy.as_ref().map(|p| p.local_addr())
    }

    /// Shut down the proxy and drop the panel session.
    pub async fn disconnect(self) {
        info!("Bridge disconnecting");
        if let Some(proxy) = &self.proxy {
            proxy.shutdown().await;
        }
        let _ = self.event_tx.send(BridgeEvent::ConnectionEnded);
    }
}

impl Drop for AlarmBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
        }
    }
}
