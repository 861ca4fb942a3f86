//! Headless run of the stream layer: logs every snapshot until Ctrl-C.
//! Pair with `mock-headset`, then kill / restart it to watch the
//! reconnect behaviour.
//!
//! Usage: `RUST_LOG=info stream-test [endpoint]`

use eegm_stream::{StreamConfig, StreamManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8000/eeg".to_string());

    log::info!("Initializing stream manager for {endpoint:}");
    let manager = StreamManager::websocket(&endpoint, StreamConfig::default()).map_err(|e| {
        log::error!("Error creating stream manager {e:}");
        e
    })?;
    manager.start().await;

    let mut reader = manager.reader();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping stream");
                break;
            }
            snapshot = reader.changed() => {
                let Some(snapshot) = snapshot else { break };
                match snapshot.reading {
                    Some(reading) => log::info!(
                        "{} (attempts {}, dropped {}) signal {} attention {} meditation {}",
                        snapshot.state,
                        snapshot.connect_attempts,
                        snapshot.decode_failures,
                        reading.signal,
                        reading.attention,
                        reading.meditation
                    ),
                    None => log::info!(
                        "{} (attempts {}) no reading yet",
                        snapshot.state,
                        snapshot.connect_attempts
                    ),
                }
            }
        }
    }

    manager.stop().await?;
    Ok(())
}
