use eegm_reading::{decode, Reading};
use std::sync::Arc;
use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    task::JoinHandle,
    time::Duration,
};

use crate::{
    snapshot::SnapshotWriter, ConnectionState, Connector, Frame, FrameSource, Snapshot,
    SnapshotReader, StreamConfig, StreamError, WsConnector, CLOSE_TIMEOUT,
};

/// Control messages from the [`StreamManager`] to its driver task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reconnect,
    Shutdown,
}

/// Why a connection (or connection attempt) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Transport or handshake failure, wait out the retry delay
    Failed,
    /// Forced reconnect, skip the retry delay once
    Reconnect,
    Shutdown,
}

struct Driver {
    commands: UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl Driver {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// [`StreamManager`] owns one upstream connection and the latest-value
/// slot it feeds. All socket work happens on a single driver task spawned
/// by [`StreamManager::start`]; the manager itself only sends it commands,
/// so the control methods can be called from any task.
///
/// The manager is meant to be owned by the application and passed by
/// reference to whatever needs the control surface; read-only consumers
/// can take a [`SnapshotReader`] instead.
pub struct StreamManager<C: Connector> {
    connector: Arc<C>,
    config: StreamConfig,
    writer: SnapshotWriter,
    reader: SnapshotReader,
    driver: Mutex<Option<Driver>>,
}

impl StreamManager<WsConnector> {
    /// Manager for a websocket endpoint, e.g. `ws://127.0.0.1:8000/eeg`
    pub fn websocket(endpoint: &str, config: StreamConfig) -> Result<Self, StreamError> {
        Ok(Self::new(WsConnector::new(endpoint)?, config))
    }
}

impl<C: Connector> StreamManager<C> {
    pub fn new(connector: C, config: StreamConfig) -> Self {
        let (writer, reader) = SnapshotWriter::new();
        Self {
            connector: Arc::new(connector),
            config,
            writer,
            reader,
            driver: Mutex::new(None),
        }
    }

    /// Start connecting. Does nothing if the driver is already running,
    /// whether connecting, connected or waiting to retry
    pub async fn start(&self) {
        let mut driver = self.driver.lock().await;
        if driver.as_ref().is_some_and(Driver::is_running) {
            log::debug!("Stream to {} already running", self.connector.endpoint());
            return;
        }
        *driver = Some(self.spawn_driver());
    }

    /// Close the connection with a normal closure and stop retrying. The
    /// published state is `Disconnected` once this returns
    pub async fn stop(&self) -> Result<(), StreamError> {
        let mut driver = self.driver.lock().await;
        let res = match driver.take() {
            Some(Driver { commands, handle }) => {
                commands.send(Command::Shutdown).ok();
                handle.await.map_err(|e| {
                    log::error!("Stream driver did not exit cleanly {e:}");
                    StreamError::Driver(e.to_string())
                })
            }
            None => Ok(()),
        };
        self.writer.set_state(ConnectionState::Disconnected);
        log::info!("Stream to {} stopped", self.connector.endpoint());
        res
    }

    /// Drop the current connection (if any) and connect again right away,
    /// skipping the retry delay this one time. Starts the driver if it is
    /// not running
    pub async fn reconnect(&self) {
        let mut driver = self.driver.lock().await;
        if let Some(running) = driver.as_ref().filter(|d| d.is_running()) {
            if running.commands.send(Command::Reconnect).is_ok() {
                return;
            }
        }
        *driver = Some(self.spawn_driver());
    }

    /// Current state and latest reading; never waits on the driver
    pub fn snapshot(&self) -> Snapshot {
        self.reader.snapshot()
    }

    /// Read-only handle for consumers
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }

    fn spawn_driver(&self) -> Driver {
        let (commands, receiver) = unbounded_channel();
        let task = DriverTask {
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            writer: self.writer.clone(),
        };
        log::info!("Starting stream to {}", self.connector.endpoint());
        let handle = tokio::spawn(async move {
            task.run(receiver).await;
        });
        Driver { commands, handle }
    }
}

impl<C: Connector> Drop for StreamManager<C> {
    fn drop(&mut self) {
        // dropping the task drops any open connection with it
        if let Some(driver) = self.driver.get_mut().take() {
            driver.handle.abort();
        }
    }
}

/// Everything the driver task owns. It is the only writer of the
/// snapshot while it runs
struct DriverTask<C: Connector> {
    connector: Arc<C>,
    config: StreamConfig,
    writer: SnapshotWriter,
}

impl<C: Connector> DriverTask<C> {
    async fn run(self, mut commands: UnboundedReceiver<Command>) {
        let mut failures: u32 = 0;

        loop {
            let exit = match self.establish(&mut commands).await {
                Ok(source) => {
                    failures = 0;
                    self.writer.set_state(ConnectionState::Connected);
                    log::info!("Connected to {}", self.connector.endpoint());
                    self.receive(source, &mut commands).await
                }
                Err(exit) => exit,
            };

            // must land before any wait so nobody sees a stale `Connected`
            self.writer.set_state(ConnectionState::Disconnected);

            match exit {
                Exit::Shutdown => break,
                Exit::Reconnect => {
                    log::info!("Forced reconnect to {}", self.connector.endpoint());
                }
                Exit::Failed => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.reconnect.delay(failures);
                    log::info!(
                        "Reconnecting to {} in {delay:?}",
                        self.connector.endpoint()
                    );
                    if Self::wait(delay, &mut commands).await == Exit::Shutdown {
                        break;
                    }
                }
            }
        }
        log::debug!("Stream driver for {} exiting", self.connector.endpoint());
    }

    /// One connect attempt, raced against incoming commands
    async fn establish(
        &self,
        commands: &mut UnboundedReceiver<Command>,
    ) -> Result<C::Source, Exit> {
        self.writer.begin_attempt();
        log::debug!("Connecting to {}", self.connector.endpoint());

        tokio::select! {
            cmd = commands.recv() => Err(Self::interrupted(cmd)),
            res = self.connector.connect() => res.map_err(|e| {
                log::warn!("Connect to {} failed: {e:}", self.connector.endpoint());
                Exit::Failed
            }),
        }
    }

    /// Receive loop, runs until the connection fails or a command arrives.
    /// The source is closed or dropped before this returns
    async fn receive(
        &self,
        mut source: C::Source,
        commands: &mut UnboundedReceiver<Command>,
    ) -> Exit {
        loop {
            let next = tokio::select! {
                cmd = commands.recv() => Err(Self::interrupted(cmd)),
                next = Self::next_frame(&mut source, self.config.read_timeout) => Ok(next),
            };

            let next = match next {
                Ok(next) => next,
                Err(exit) => {
                    Self::close(&mut source).await;
                    return exit;
                }
            };

            match next {
                Some(Ok(Frame::Text(text))) => match decode_frame(&text) {
                    Ok(reading) => {
                        log::trace!("Reading {reading:?}");
                        self.writer.publish(reading);
                    }
                    Err(e) => {
                        log::warn!(
                            "Dropping frame: {e:} - payload ({} bytes) {}",
                            text.len(),
                            payload_preview(&text)
                        );
                        self.writer.decode_failed();
                    }
                },
                Some(Ok(Frame::Close(reason))) => {
                    log::warn!(
                        "Remote {} closed the stream {reason:?}",
                        self.connector.endpoint()
                    );
                    return Exit::Failed;
                }
                Some(Ok(frame)) => {
                    log::trace!("Ignoring frame {frame:?}");
                }
                Some(Err(e)) => {
                    log::warn!("Stream from {} failed: {e:}", self.connector.endpoint());
                    return Exit::Failed;
                }
                None => {
                    log::warn!("Stream from {} ended", self.connector.endpoint());
                    return Exit::Failed;
                }
            }
        }
    }

    async fn next_frame(
        source: &mut C::Source,
        read_timeout: Option<Duration>,
    ) -> Option<Result<Frame, StreamError>> {
        match read_timeout {
            Some(limit) => tokio::time::timeout(limit, source.next_frame())
                .await
                .unwrap_or_else(|_| {
                    Some(Err(StreamError::TransportFailure(format!(
                        "no frame within {limit:?}"
                    ))))
                }),
            None => source.next_frame().await,
        }
    }

    async fn close(source: &mut C::Source) {
        match tokio::time::timeout(CLOSE_TIMEOUT, source.close()).await {
            Ok(Ok(())) => log::debug!("Stream closed"),
            Ok(Err(e)) => log::warn!("Error closing stream {e:}"),
            Err(_) => log::warn!("Timed out closing stream"),
        }
    }

    /// Wait out the retry delay. Commands cut it short
    async fn wait(delay: Duration, commands: &mut UnboundedReceiver<Command>) -> Exit {
        tokio::select! {
            cmd = commands.recv() => Self::interrupted(cmd),
            _ = tokio::time::sleep(delay) => Exit::Failed,
        }
    }

    // A closed command channel means the manager is gone
    fn interrupted(cmd: Option<Command>) -> Exit {
        match cmd {
            Some(Command::Reconnect) => Exit::Reconnect,
            Some(Command::Shutdown) | None => Exit::Shutdown,
        }
    }
}

/// Most characters of a rejected payload that make it into the log
const PAYLOAD_PREVIEW_CHARS: usize = 120;

fn decode_frame(text: &str) -> Result<Reading, StreamError> {
    Ok(decode(text)?)
}

fn payload_preview(text: &str) -> &str {
    match text.char_indices().nth(PAYLOAD_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
