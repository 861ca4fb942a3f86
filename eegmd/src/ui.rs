use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetSize};
use eegm_reading::Channel;
use eegm_stream::ConnectionState;
use ratatui::{
    layout::{Alignment, Layout, Rect},
    prelude::{Constraint, CrosstermBackend, Stylize},
    style::{Color, Style},
    text::{Line, Text},
    widgets::{Block, BorderType, Cell, Paragraph, Row, Table},
    Frame, Terminal, TerminalOptions, Viewport,
};
use std::{io, panic};

use crate::monitor::{EegMonitor, MonitorResult};

pub fn render(app: &EegMonitor, frame: &mut Frame) {
    let rects = Layout::vertical([Constraint::Min(5), Constraint::Length(4)]).split(frame.size());

    if app.display_values {
        render_table(app, frame, rects[0]);
    } else {
        frame.render_widget(
            Paragraph::new("Value display off, press `d` to show")
                .block(Block::bordered().border_type(BorderType::Rounded))
                .style(Style::default().fg(Color::DarkGray).bg(Color::Black))
                .centered(),
            rects[0],
        );
    }

    frame.render_widget(
        Paragraph::new(Text::from(vec![
            Line::from(status_line(app)),
            Line::from("`d` toggle values, `r` reconnect, `Esc`/`q` quit"),
        ]))
        .block(
            Block::bordered()
                .title("EEG Monitor")
                .title_alignment(Alignment::Center)
                .border_type(BorderType::Rounded),
        )
        .style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .centered(),
        rects[1],
    );
}

fn status_line(app: &EegMonitor) -> String {
    let snapshot = &app.snapshot;
    let last = snapshot
        .last_frame_at
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "Connection Status: {} | last frame {last:} | dropped frames {}",
        snapshot.state, snapshot.decode_failures
    )
}

pub fn render_table(app: &EegMonitor, f: &mut Frame, area: Rect) {
    let header_style = Style::default().fg(Color::Cyan).bg(Color::Black);

    let header = ["Channel", "Value"]
        .into_iter()
        .map(Cell::from)
        .collect::<Row>()
        .style(header_style)
        .height(1);

    // keep showing the last reading while disconnected, but dimmed
    let text_color = match app.snapshot.state {
        ConnectionState::Connected => Color::Cyan,
        _ => Color::DarkGray,
    };

    let rows = Channel::ALL.iter().map(|&channel| {
        let value = app
            .snapshot
            .reading
            .map(|r| r.get(channel).to_string())
            .unwrap_or_else(|| "-".to_string());
        Row::new(vec![channel.label().to_string(), value])
            .style(Style::new().fg(text_color).bg(Color::Black))
            .height(1)
    });

    let t = Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .header(header)
        .block(
            Block::bordered()
                .title(app.endpoint().to_string())
                .border_type(BorderType::Rounded),
        )
        .bg(Color::Black);
    f.render_widget(t, area);
}

/// Terminal the monitor draws to. All output, resizes included, goes to
/// stderr
#[derive(Debug)]
pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stderr>>,
    /// Size to restore on exit, as (cols, rows)
    saved_size: (u16, u16),
}

const TERM_SIZE: (u16, u16) = (72, 20);

/// Ask the terminal emulator to resize to `(cols, rows)`
fn resize(out: &mut impl io::Write, (cols, rows): (u16, u16)) -> io::Result<()> {
    crossterm::execute!(out, SetSize(cols, rows))
}

impl Tui {
    pub fn new() -> Result<Self, std::io::Error> {
        let saved_size = terminal::size()?;
        resize(&mut io::stderr(), TERM_SIZE)?;

        let (cols, rows) = TERM_SIZE;
        let options = TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, cols, rows)),
        };

        Ok(Self {
            terminal: Terminal::with_options(CrosstermBackend::new(io::stderr()), options)?,
            saved_size,
        })
    }

    pub fn init(&mut self) -> MonitorResult<()> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stderr(), EnterAlternateScreen)?;

        let panic_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic| {
            Self::reset().ok();
            panic_hook(panic);
        }));

        self.terminal.clear()?;
        Ok(())
    }

    pub fn draw(&mut self, app: &EegMonitor) -> MonitorResult<()> {
        self.terminal.draw(|frame| render(app, frame))?;
        Ok(())
    }

    fn reset() -> MonitorResult<()> {
        terminal::disable_raw_mode()?;
        crossterm::execute!(io::stderr(), LeaveAlternateScreen)?;
        Ok(())
    }

    /// Leave raw mode and the alternate screen, then put the terminal back
    /// to the size it had before [`Tui::new`]
    pub fn exit(&mut self) -> MonitorResult<()> {
        Self::reset()?;
        resize(&mut io::stderr(), self.saved_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::tests::settings;
    use eegm_reading::Reading;
    use eegm_stream::Snapshot;
    use ratatui::backend::TestBackend;

    fn rendered(app: &EegMonitor) -> String {
        let mut terminal = Terminal::new(TestBackend::new(TERM_SIZE.0, TERM_SIZE.1)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn resize_writes_cols_then_rows() {
        let mut out = Vec::new();
        resize(&mut out, TERM_SIZE).unwrap();
        assert_eq!(out, b"\x1b[8;20;72t");
    }

    #[tokio::test]
    async fn renders_reading_and_status() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        app.update(Snapshot {
            state: ConnectionState::Connected,
            reading: Some(Reading {
                attention: 61,
                low_alpha: 5113,
                ..Default::default()
            }),
            decode_failures: 3,
            ..Default::default()
        });

        let screen = rendered(&app);
        assert!(screen.contains("Attention"));
        assert!(screen.contains("5113"));
        assert!(screen.contains("Low Gamma"));
        assert!(screen.contains("Connection Status: Connected"));
        assert!(screen.contains("dropped frames 3"));
    }

    #[tokio::test]
    async fn hides_values_when_toggled_off() {
        let mut app = EegMonitor::new(&settings()).unwrap();
        app.update(Snapshot {
            reading: Some(Reading {
                attention: 61,
                ..Default::default()
            }),
            ..Default::default()
        });
        app.toggle_display();

        let screen = rendered(&app);
        assert!(!screen.contains("Attention"));
        assert!(screen.contains("Value display off"));
        assert!(screen.contains("Connection Status: Disconnected"));
    }
}
