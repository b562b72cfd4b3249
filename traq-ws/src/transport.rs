//! Transport seam between the connection manager and the socket.
//!
//! The manager only needs four things from a transport: open an
//! authenticated connection, yield inbound frames until close, send a
//! liveness probe, and close on request. [`WsConnector`] provides them over
//! `tokio-tungstenite`; tests substitute scripted transports.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use traq_core::{DecodeError, TraqError, TraqResult};

/// An inbound data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// The frame payload as text. Binary frames must be valid UTF-8.
    pub fn into_text(self) -> Result<String, DecodeError> {
        match self {
            Frame::Text(text) => Ok(text),
            Frame::Binary(bytes) => String::from_utf8(bytes)
                .map_err(|e| DecodeError::InvalidJson(format!("binary frame is not utf-8: {e}"))),
        }
    }
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`, authenticating with `token` as a bearer token.
    async fn connect(&self, url: &str, token: &str) -> TraqResult<Box<dyn Transport>>;
}

/// One open connection.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next data frame.
    ///
    /// `None` means the connection is closed. Errors are transport faults;
    /// the connection should be considered dead after one.
    async fn next_frame(&mut self) -> Option<TraqResult<Frame>>;

    /// Send a liveness probe. An error means the probe could not be sent.
    async fn ping(&mut self) -> TraqResult<()>;

    /// Close the connection.
    async fn close(&mut self) -> TraqResult<()>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for the traQ bot gateway over WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str, token: &str) -> TraqResult<Box<dyn Transport>> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TraqError::Config(format!("invalid gateway url: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TraqError::Config("access token is not a valid header value".into()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, response) = connect_async(request).await.map_err(transport_error)?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsTransport { ws }))
    }
}

/// A live `tokio-tungstenite` connection.
pub struct WsTransport {
    ws: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_frame(&mut self) -> Option<TraqResult<Frame>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(Ok(Frame::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(Ok(Frame::Binary(bytes.to_vec())));
                }
                Some(Ok(Message::Close(frame))) => {
                    let code: u16 = frame.as_ref().map_or(1000, |f| f.code.into());
                    debug!(code, "server closed the connection");
                    return None;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // Control frames are answered by tungstenite itself.
                    trace!("control frame");
                }
                Some(Err(e)) => return Some(Err(transport_error(e))),
                None => return None,
            }
        }
    }

    async fn ping(&mut self) -> TraqResult<()> {
        self.ws
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| TraqError::Liveness(e.to_string()))
    }

    async fn close(&mut self) -> TraqResult<()> {
        self.ws.close(None).await.map_err(transport_error)
    }
}

fn transport_error(e: tokio_tungstenite::tungstenite::Error) -> TraqError {
    TraqError::Transport(e.to_string())
}
