use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use eegm_stream::{Snapshot, SnapshotReader};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    monitor::{EegMonitor, MonitorResult},
    MonitorError,
};

pub enum Event {
    Tick,
    Key(KeyEvent),
    /// The stream published a new snapshot
    Snapshot(Snapshot),
}

#[allow(dead_code)]
#[derive(Debug)]
pub struct EventHandler {
    sender: mpsc::UnboundedSender<Event>,
    receiver: mpsc::UnboundedReceiver<Event>,
    handler: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, reader: SnapshotReader) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _sender = sender.clone();

        let mut snapshots = reader.updates();

        let handler = tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick = tokio::time::interval(tick_rate);

            loop {
                let tick_delay = tick.tick();
                let crossterm_event = reader.next().fuse();
                let snapshot = snapshots.next().fuse();

                let sent = tokio::select! {
                  _ = _sender.closed() => {
                    break;
                  }
                  _ = tick_delay => {
                    _sender.send(Event::Tick)
                  }
                  Some(Ok(evt)) = crossterm_event => {
                    match evt {
                      CrosstermEvent::Key(key) if key.kind == crossterm::event::KeyEventKind::Press => {
                        _sender.send(Event::Key(key))
                      },
                      CrosstermEvent::Key(_) => Ok(()),
                      e => {
                        log::trace!("Untracked term event {e:?}");
                        Ok(())
                      }
                    }
                  }
                  Some(snapshot) = snapshot => {
                    log::trace!("Snapshot update {snapshot:?}");
                    _sender.send(Event::Snapshot(snapshot))
                  }
                };

                if sent.is_err() {
                    log::warn!("Event receiver dropped, stopping event handler");
                    break;
                }
            }
        });
        Self {
            sender,
            receiver,
            handler,
        }
    }

    pub async fn next(&mut self) -> MonitorResult<Event> {
        self.receiver.recv().await.ok_or(MonitorError::EventError)
    }
}

pub async fn handle_key_input_events(key_event: KeyEvent, app: &mut EegMonitor) {
    match key_event.code {
        // Exit application on `ESC` or `q`
        KeyCode::Esc | KeyCode::Char('q') => {
            app.quit();
        }
        // Exit application on `Ctrl-C`
        KeyCode::Char('c') | KeyCode::Char('C') => {
            if key_event.modifiers == KeyModifiers::CONTROL {
                app.quit();
            }
        }
        KeyCode::Char('d') | KeyCode::Char('D') => {
            app.toggle_display();
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.reconnect().await;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::tests::settings;
    use eegm_stream::ConnectionState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[tokio::test]
    async fn display_toggle_key() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        handle_key_input_events(key(KeyCode::Char('d'), KeyModifiers::NONE), &mut app).await;
        assert!(!app.display_values);
        handle_key_input_events(key(KeyCode::Char('D'), KeyModifiers::SHIFT), &mut app).await;
        assert!(app.display_values);
        assert!(app.running);
    }

    #[tokio::test]
    async fn quit_keys() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        handle_key_input_events(key(KeyCode::Char('c'), KeyModifiers::NONE), &mut app).await;
        assert!(app.running);
        handle_key_input_events(key(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut app).await;
        assert!(!app.running);

        let mut app = EegMonitor::new(&settings()).unwrap();
        handle_key_input_events(key(KeyCode::Esc, KeyModifiers::NONE), &mut app).await;
        assert!(!app.running);
    }

    #[tokio::test]
    async fn reconnect_key_starts_a_connect_attempt() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        let mut reader = app.reader();
        assert_eq!(reader.snapshot().connect_attempts, 0);

        handle_key_input_events(key(KeyCode::Char('r'), KeyModifiers::NONE), &mut app).await;
        let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let next = reader.changed().await.expect("stream dropped");
                if next.connect_attempts > 0 {
                    return next;
                }
            }
        })
        .await
        .expect("no connect attempt after reconnect key");
        assert_eq!(snapshot.connect_attempts, 1);
        assert!(app.running);
        assert!(app.display_values);

        app.shutdown().await.unwrap();
        assert_eq!(app.snapshot.state, ConnectionState::Disconnected);
    }
}
