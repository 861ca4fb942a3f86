//! TUI Front end for watching a BrainLink EEG headset's
//! readings as they stream in from the headset bridge,
//! along with the health of the connection to it

pub mod config;
pub mod event;
pub mod monitor;
pub mod ui;

use eegm_stream::StreamError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
    #[error("Stream Error")]
    StreamError(#[from] StreamError),
    #[error("Event Handling Error")]
    EventError,
    #[error("Logging setup Error {0}")]
    LoggingError(String),
}
