// MIT License - Copyright (c) 2026 Peter Wright

/// All errors surfaced by the envisalink-bridge library.
///
/// Protocol-level failures (bad passwords, unknown codes, client socket
/// faults) never appear here; they surface as named events or log lines,
/// and nothing is fatal to the host process.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to panel at {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
