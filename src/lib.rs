// MIT License - Copyright (c) 2026 Peter Wright
//
//! # envisalink-bridge
//!
//! TCP/IP communication with DSC alarm panels through an Envisalink-style
//! TPI module, plus an optional proxy server that multiplexes additional
//! TPI clients onto the single session the module allows.
//!
//! ## Quick Start
//!
//! ```no_run
//! use envisalink_bridge::{AlarmBridge, BridgeConfig, BridgeEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .panel_host("192.168.0.100")
//!         .panel_password("user")
//!         .proxy_enable(true)
//!         .build();
//!
//!     let bridge = AlarmBridge::connect(config).await?;
//!
//!     let mut events = bridge.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Arm partition 1 away and wait for the panel's acknowledge
//!     let outcome = bridge.send_command_tracked("0301").await?;
//!     println!("Outcome: {:?}", outcome.await);
//!
//!     tokio::signal::ctrl_c().await?;
//!     bridge.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod catalogue;
pub mod config;
pub mod devices;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use bridge::AlarmBridge;
pub use catalogue::{Catalogue, ClientAction, PanelAction, TpiCatalogue};
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use devices::{ArmMode, OpeningClosing, PartitionState, TroubleFlags, UserState, ZoneState};
pub use error::{BridgeError, Result};
pub use event::{AlarmSnapshot, BridgeEvent, EventReceiver};
pub use transport::CommandOutcome;
