//! Static configuration, baked in at build time from the workspace
//! `cfg.toml` (section `[eegmd]`). Missing keys fall back to the
//! defaults below

use eegm_stream::StreamConfig;
use std::time::Duration;

#[toml_cfg::toml_config]
pub struct MonitorConfig {
    #[default("ws://127.0.0.1:8000/eeg")]
    endpoint: &'static str,
    #[default(5000)]
    reconnect_delay_ms: u64,
    #[default(0)]
    read_timeout_ms: u64,
    #[default(true)]
    display_values: bool,
    #[default(100)]
    refresh_millis: u64,
    #[default("./logs")]
    log_dir: &'static str,
}

/// Runtime view of [`MonitorConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub endpoint: String,
    pub reconnect_delay: Duration,
    pub read_timeout: Option<Duration>,
    pub display_values: bool,
    pub refresh: Duration,
    pub log_dir: String,
}

impl MonitorSettings {
    pub fn from_static() -> Self {
        Self::from_config(&MONITOR_CONFIG)
    }

    fn from_config(config: &MonitorConfig) -> Self {
        Self {
            endpoint: config.endpoint.to_string(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            read_timeout: match config.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            display_values: config.display_values,
            refresh: Duration::from_millis(config.refresh_millis.max(1)),
            log_dir: config.log_dir.to_string(),
        }
    }

    pub fn stream_config(&self) -> StreamConfig {
        let config = StreamConfig::default().with_reconnect_delay(self.reconnect_delay);
        match self.read_timeout {
            Some(timeout) => config.with_read_timeout(timeout),
            None => config,
        }
    }
}
