use eegmd::{
    config::MonitorSettings,
    event::{handle_key_input_events, Event, EventHandler},
    monitor::{EegMonitor, MonitorResult},
    ui::Tui,
    MonitorError,
};
use tracing_appender::rolling;
use tracing_subscriber::FmtSubscriber;

use tracing_log::LogTracer;

#[tokio::main]
async fn main() -> MonitorResult<()> {
    let settings = MonitorSettings::from_static();

    LogTracer::init().map_err(|e| MonitorError::LoggingError(e.to_string()))?;

    // the TUI owns the terminal, so logs go to a file
    let log = rolling::daily(&settings.log_dir, "eeg-monitor");
    let (nb, _guard) = tracing_appender::non_blocking(log);

    let sub = FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(nb)
        .finish();

    tracing::subscriber::set_global_default(sub)
        .map_err(|e| MonitorError::LoggingError(e.to_string()))?;

    let mut app = EegMonitor::new(&settings)?;
    log::info!("Watching {}", app.endpoint());
    app.start().await;

    let mut events = EventHandler::new(settings.refresh, app.reader());
    let mut tui = Tui::new()?;
    tui.init()?;

    while app.running {
        tui.draw(&app)?;
        match events.next().await {
            Ok(Event::Tick) => app.tick(),
            Ok(Event::Key(key)) => handle_key_input_events(key, &mut app).await,
            Ok(Event::Snapshot(snapshot)) => app.update(snapshot),
            Err(e) => {
                log::error!("Error in app event loop {e:}, exiting");
                break;
            }
        }
    }

    tui.exit()?;
    app.shutdown().await?;

    Ok(())
}
