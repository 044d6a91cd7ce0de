// MIT License - Copyright (c) 2026 Peter Wright

pub mod proxy;
pub mod upstream;

pub use proxy::ProxyServer;
pub use upstream::{CommandOutcome, PanelLink, UpstreamSession};
