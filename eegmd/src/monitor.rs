use eegm_stream::{Snapshot, SnapshotReader, StreamManager, WsConnector};

use crate::{config::MonitorSettings, MonitorError};

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;

/// App state for the front end: the stream it watches plus what the
/// UI last rendered
pub struct EegMonitor {
    pub running: bool,
    pub display_values: bool,
    pub snapshot: Snapshot,
    stream: StreamManager<WsConnector>,
}

impl EegMonitor {
    pub fn new(settings: &MonitorSettings) -> MonitorResult<Self> {
        let stream = StreamManager::websocket(&settings.endpoint, settings.stream_config())?;
        Ok(Self {
            running: true,
            display_values: settings.display_values,
            snapshot: stream.snapshot(),
            stream,
        })
    }

    pub async fn start(&self) {
        self.stream.start().await;
    }

    pub fn reader(&self) -> SnapshotReader {
        self.stream.reader()
    }

    pub fn endpoint(&self) -> &str {
        self.stream.endpoint()
    }

    pub fn tick(&mut self) {
        self.snapshot = self.stream.snapshot();
    }

    pub fn update(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }

    pub fn toggle_display(&mut self) {
        self.display_values = !self.display_values;
        log::debug!("Value display toggled to {}", self.display_values);
    }

    pub async fn reconnect(&self) {
        log::info!("Manual reconnect requested");
        self.stream.reconnect().await;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub async fn shutdown(&mut self) -> MonitorResult<()> {
        self.stream.stop().await?;
        self.tick();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use eegm_stream::ConnectionState;
    use std::time::Duration;

    pub(crate) fn settings() -> MonitorSettings {
        MonitorSettings {
            endpoint: "ws://127.0.0.1:9/eeg".to_string(),
            reconnect_delay: Duration::from_secs(5),
            read_timeout: None,
            display_values: true,
            refresh: Duration::from_millis(100),
            log_dir: "./logs".to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_bad_endpoint() {
        let mut bad = settings();
        bad.endpoint = "http://127.0.0.1:8000/eeg".to_string();
        assert!(matches!(
            EegMonitor::new(&bad),
            Err(MonitorError::StreamError(_))
        ));
    }

    #[tokio::test]
    async fn toggles_and_quits() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        assert!(app.running);
        assert!(app.display_values);
        assert_eq!(app.snapshot.state, ConnectionState::Disconnected);

        app.toggle_display();
        assert!(!app.display_values);
        app.quit();
        assert!(!app.running);
        app.shutdown().await.unwrap();
        assert_eq!(app.snapshot.state, ConnectionState::Disconnected);
    }
}
