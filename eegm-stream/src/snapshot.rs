use chrono::{DateTime, Local};
use eegm_reading::Reading;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// [`ConnectionState`] of the upstream stream, as last written by the
/// driver task. Front ends can use this to render connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        };
        f.write_str(s)
    }
}

/// [`Snapshot`] is the externally observable pair of connection state and
/// latest reading, plus a few counters. Every write replaces the whole
/// value, so a reader never sees fields from two different frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub state: ConnectionState,
    /// Last successfully decoded reading, kept across disconnects
    pub reading: Option<Reading>,
    /// Frames rejected by the decoder since the manager was created
    pub decode_failures: u64,
    /// Connect attempts started since the manager was created
    pub connect_attempts: u64,
    pub last_frame_at: Option<DateTime<Local>>,
}

impl Snapshot {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Write side of the latest-value slot. Only the driver task (and the
/// manager, once the driver has exited) holds one
#[derive(Clone)]
pub(crate) struct SnapshotWriter(Arc<watch::Sender<Snapshot>>);

impl SnapshotWriter {
    pub(crate) fn new() -> (Self, SnapshotReader) {
        let (tx, rx) = watch::channel(Snapshot::default());
        (Self(Arc::new(tx)), SnapshotReader { rx })
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.0.send_if_modified(|snapshot| {
            if snapshot.state == state {
                false
            } else {
                log::debug!("Connection state {} -> {state:}", snapshot.state);
                snapshot.state = state;
                true
            }
        });
    }

    pub(crate) fn begin_attempt(&self) {
        self.0.send_modify(|snapshot| {
            snapshot.state = ConnectionState::Connecting;
            snapshot.connect_attempts += 1;
        });
    }

    pub(crate) fn publish(&self, reading: Reading) {
        self.0.send_modify(|snapshot| {
            snapshot.reading = Some(reading);
            snapshot.last_frame_at = Some(Local::now());
        });
    }

    pub(crate) fn decode_failed(&self) {
        self.0.send_modify(|snapshot| snapshot.decode_failures += 1);
    }
}

/// Cloneable read handle on the latest snapshot, for consumers that
/// should not own the [`StreamManager`](crate::StreamManager)
#[derive(Clone, Debug)]
pub struct SnapshotReader {
    rx: watch::Receiver<Snapshot>,
}

impl SnapshotReader {
    /// Copy of the current snapshot; never blocks on the driver
    pub fn snapshot(&self) -> Snapshot {
        *self.rx.borrow()
    }

    /// Wait for the next write. Returns `None` once the manager is gone
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Stream of snapshots, starting with the current one
    pub fn updates(&self) -> WatchStream<Snapshot> {
        WatchStream::new(self.rx.clone())
    }
}
