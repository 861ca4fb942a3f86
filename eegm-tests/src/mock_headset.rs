//! Stand-in for the headset bridge: serves `/eeg` and pushes a synthetic
//! reading to every connected client ten times a second.
//!
//! Usage: `mock-headset [listen addr] [malformed every n frames]`

use eegm_reading::Reading;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    http::StatusCode,
    Message,
};

const FRAME_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:8000".to_string())
        .parse()?;
    let malformed_every: u64 = args.next().map(|n| n.parse()).transpose()?.unwrap_or(0);

    let listener = TcpListener::bind(addr).await?;
    log::info!("Mock headset serving ws://{addr}/eeg");

    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("Client connected from {peer:}");
        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, malformed_every).await {
                log::warn!("Client {peer:} dropped: {e:}");
            }
        });
    }
}

async fn serve_client(
    stream: TcpStream,
    malformed_every: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        if req.uri().path() == "/eeg" {
            Ok(resp)
        } else {
            let mut err = ErrorResponse::new(Some("no such endpoint".to_string()));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
    })
    .await?;

    let (mut sink, mut incoming) = ws.split();
    let mut tick = tokio::time::interval(FRAME_INTERVAL);
    let mut count: u64 = 0;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                count += 1;
                let payload = if malformed_every != 0 && count % malformed_every == 0 {
                    r#"{"Signal":"lost contact"}"#.to_string()
                } else {
                    synthetic(count).to_json()?
                };
                sink.send(Message::Text(payload)).await?;
            }
            msg = incoming.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        log::info!("Client closed after {count:} frames");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

/// Slowly drifting values, so the front end has something to show
fn synthetic(count: u64) -> Reading {
    let t = count as f64 / 10.0;
    let wave = |period: f64, scale: f64| ((t / period).sin() * 0.5 + 0.5) * scale;
    Reading {
        signal: if count % 50 < 3 { 200 } else { 0 },
        attention: wave(7.0, 100.0) as i32,
        meditation: wave(11.0, 100.0) as i32,
        delta: wave(3.0, 150_000.0) as i32,
        theta: wave(4.0, 60_000.0) as i32,
        low_alpha: wave(5.0, 20_000.0) as i32,
        high_alpha: wave(6.0, 20_000.0) as i32,
        low_beta: wave(2.5, 15_000.0) as i32,
        high_beta: wave(3.5, 15_000.0) as i32,
        low_gamma: wave(1.5, 8_000.0) as i32,
        high_gamma: wave(2.0, 8_000.0) as i32,
    }
}
