use futures::prelude::*;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::StreamError;

/// One message delivered by the upstream connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    /// Remote sent a close frame, with its reason if any
    Close(Option<String>),
}

/// An established, receive-only connection
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Await the next frame. `None` means the stream ended
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>>;

    /// Close with a normal-closure indication
    async fn close(&mut self) -> Result<(), StreamError>;
}

/// Trait to allow different transports to feed the
/// [`StreamManager`](crate::StreamManager); the websocket client is
/// the only production implementation
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Source: FrameSource + 'static;

    async fn connect(&self) -> Result<Self::Source, StreamError>;

    /// Endpoint description, used for logging
    fn endpoint(&self) -> &str;
}

/// [`Connector`] for a `ws://` or `wss://` endpoint
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(endpoint: &str) -> Result<Self, StreamError> {
        let url = Url::parse(endpoint)
            .map_err(|e| StreamError::InvalidEndpoint(format!("{endpoint:}: {e:}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(StreamError::InvalidEndpoint(format!(
                "{endpoint:}: unsupported scheme {other:}"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    type Source = WsSource;

    async fn connect(&self) -> Result<WsSource, StreamError> {
        let (ws, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| StreamError::HandshakeFailure(e.to_string()))?;
        log::debug!(
            "Websocket handshake with {} complete, status {}",
            self.url,
            response.status()
        );
        Ok(WsSource { ws })
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}

pub struct WsSource {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl From<Message> for Frame {
    fn from(msg: Message) -> Frame {
        match msg {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(data) => Frame::Binary(data),
            Message::Ping(_) => Frame::Ping,
            Message::Pong(_) => Frame::Pong,
            Message::Close(close) => Frame::Close(close.map(|c| c.reason.into_owned())),
            // only produced when writing raw frames
            Message::Frame(_) => Frame::Binary(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>> {
        self.ws.next().await.map(|res| {
            res.map(Frame::from)
                .map_err(|e| StreamError::TransportFailure(e.to_string()))
        })
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.ws
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client closing".into(),
            }))
            .await
            .map_err(|e| StreamError::TransportFailure(e.to_string()))
    }
}
