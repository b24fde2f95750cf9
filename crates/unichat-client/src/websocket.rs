//! WebSocket link.
//!
//! One JSON event per text message. The user identity travels in the
//! `x-user-id` request header of the upgrade request.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest, http::HeaderValue},
};
use unichat_proto::UserId;

use crate::{Link, LinkError};

/// Upgrade request header carrying the user identity.
pub const USER_ID_HEADER: &str = "x-user-id";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Link`] over a WebSocket (`ws://` or `wss://`).
#[derive(Debug)]
pub struct WsLink {
    url: String,
    stream: Option<WsStream>,
}

impl WsLink {
    /// Create a link to `url`. Nothing is opened until [`Link::open`].
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), stream: None }
    }

    /// Server URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Link for WsLink {
    async fn open(&mut self, identity: &UserId) -> Result<(), LinkError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| LinkError::Connect(e.to_string()))?;
        let user = HeaderValue::from_str(identity.as_str())
            .map_err(|e| LinkError::Connect(format!("invalid identity: {e}")))?;
        request.headers_mut().insert(USER_ID_HEADER, user);

        let (stream, response) =
            connect_async(request).await.map_err(|e| LinkError::Connect(e.to_string()))?;
        tracing::debug!(url = %self.url, status = %response.status(), "websocket open");

        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), LinkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::Closed);
        };

        stream.send(Message::Text(text.into())).await.map_err(|e| LinkError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LinkError>> {
        let stream = self.stream.as_mut()?;

        loop {
            match stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "websocket closed by server");
                    return None;
                },
                Ok(Message::Binary(bytes)) => {
                    tracing::debug!(len = bytes.len(), "ignoring binary message");
                },
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {},
                Err(e) => return Some(Err(LinkError::Io(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                tracing::debug!(error = %e, "websocket close failed");
            }
        }
    }
}
