//! The `eegm-stream` crate defines the stream layer of the EEG monitor:
//! a client that keeps a websocket open to the headset bridge, decodes
//! every frame into an [`eegm_reading::Reading`] and publishes the latest
//! one for any number of consumers.
//!
//! The crate defines a top-level [`StreamManager`] object, which owns a
//! single driver task with the following responsibilities:
//! 1. Establish the connection through a [`Connector`] (the websocket
//!    client [`WsConnector`] in production), moving the published
//!    [`ConnectionState`] through `Connecting` to `Connected`
//! 2. Receive frames and hand each text frame to the decoder. Decoded
//!    readings replace the published [`Snapshot`]; frames the decoder
//!    rejects are logged, counted and skipped
//! 3. On any transport failure (read error, remote close, read timeout)
//!    publish `Disconnected` first, then wait out the [`ReconnectPolicy`]
//!    delay and start over. Retries never stop until
//!    [`StreamManager::stop`] is called
//!
//! Consumers read the latest value with [`StreamManager::snapshot`], or
//! through a cloneable [`SnapshotReader`] that can also await updates.
//!
//! # Examples
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), eegm_stream::StreamError> {
//!     let manager =
//!         eegm_stream::StreamManager::websocket("ws://127.0.0.1:8000/eeg", Default::default())?;
//!     manager.start().await;
//!
//!     let mut reader = manager.reader();
//!     while let Some(snapshot) = reader.changed().await {
//!         if let Some(reading) = snapshot.reading {
//!             log::info!("{} attention {}", snapshot.state, reading.attention);
//!         }
//!     }
//!
//!     manager.stop().await
//! }
//! ```

mod config;
mod manager;
mod snapshot;
mod transport;

use thiserror::Error;

pub use config::{ReconnectPolicy, StreamConfig};
pub use manager::StreamManager;
pub use snapshot::{ConnectionState, Snapshot, SnapshotReader};
pub use transport::{Connector, Frame, FrameSource, WsConnector, WsSource};

pub use eegm_reading::{Channel, DecodeError, Reading};

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Handshake failure: {0}")]
    HandshakeFailure(String),
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error(transparent)]
    MalformedPayload(#[from] DecodeError),
    #[error("Invalid endpoint {0}")]
    InvalidEndpoint(String),
    #[error("Driver task error: {0}")]
    Driver(String),
}

/// Delay between a disconnect and the next connect attempt, unless
/// configured otherwise
pub const DEFAULT_RECONNECT_DELAY: tokio::time::Duration = tokio::time::Duration::from_secs(5);

// Upper bound on the close handshake in `stop()` and `reconnect()`
const CLOSE_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(1);
