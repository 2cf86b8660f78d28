use crate::model::{IncomingMessage, OutgoingMessage};
use futures::{SinkExt, TryStreamExt};
use serde_json::Error as JsonError;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        client::IntoClientRequest,
        error::Error as TungsteniteError,
        http::Request,
        protocol::{CloseFrame, WebSocketConfig as Config},
        Message,
    },
    MaybeTlsStream,
    WebSocketStream,
};
use tracing::{debug, instrument};

pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    #[instrument(skip(request), fields(uri = %request.uri()))]
    pub(crate) async fn connect(request: Request<()>) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async_with_config(
            request,
            Some(Config {
                max_message_size: None,
                max_frame_size: None,
                ..Default::default()
            }),
            true,
        )
        .await?;

        Ok(Self(stream))
    }

    /// Waits for the next decodable frame from the node.
    ///
    /// Returns `Ok(None)` for frames which carry no event (pings, undecodable
    /// payloads), and `Err(Error::WsClosed(..))` once the node hangs up.
    pub(crate) async fn recv_json_no_timeout(&mut self) -> Result<Option<IncomingMessage>> {
        match self.0.try_next().await? {
            Some(msg) => convert_ws_message(Some(msg)),
            None => Err(Error::WsClosed(None)),
        }
    }

    pub(crate) async fn send_json(&mut self, value: &OutgoingMessage) -> Result<()> {
        Ok(serde_json::to_string(value)
            .map(Message::Text)
            .map_err(Error::from)
            .map(|m| self.0.send(m))?
            .await?)
    }

    pub(crate) async fn close(&mut self) -> Result<()> {
        Ok(self.0.close(None).await?)
    }
}

/// Builds the handshake request for a node's websocket, carrying the
/// credentials and identity Lavalink requires.
pub(crate) fn handshake_request(
    url: &str,
    password: &str,
    user_id: u64,
    shard_count: u64,
) -> crate::error::LavalinkResult<Request<()>> {
    let mut request = url.into_client_request().map_err(Error::from)?;
    let headers = request.headers_mut();

    headers.insert("Authorization", password.parse()?);
    headers.insert("User-Id", user_id.to_string().parse()?);
    headers.insert("Num-Shards", shard_count.to_string().parse()?);
    headers.insert("Client-Name", crate::constants::CLIENT_NAME.parse()?);

    Ok(request)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors encountered on a node's websocket.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// JSON (de)serialization error.
    Json(JsonError),

    /// Lavalink only speaks JSON text frames.
    UnexpectedBinaryMessage(Vec<u8>),

    /// Error from the underlying websocket library.
    Ws(TungsteniteError),

    /// The node closed the connection, with an optional reason.
    WsClosed(Option<CloseFrame<'static>>),
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Error {
        Error::Json(e)
    }
}

impl From<TungsteniteError> for Error {
    fn from(e: TungsteniteError) -> Error {
        match e {
            TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed =>
                Error::WsClosed(None),
            e => Error::Ws(e),
        }
    }
}

#[inline]
pub(crate) fn convert_ws_message(message: Option<Message>) -> Result<Option<IncomingMessage>> {
    Ok(match message {
        Some(Message::Text(payload)) => serde_json::from_str(&payload)
            .map_err(|e| {
                debug!("Unexpected JSON: {e}. Payload: {payload}");
                e
            })
            .ok(),
        Some(Message::Binary(bytes)) => {
            return Err(Error::UnexpectedBinaryMessage(bytes));
        },
        Some(Message::Close(frame)) => {
            return Err(Error::WsClosed(frame));
        },
        // Ping/Pong message behaviour is internally handled by tungstenite.
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IncomingMessage, NodeEvent};

    #[test]
    fn text_frames_decode_into_events() {
        let frame = Message::Text(
            r#"{"op":"event","type":"TrackStartEvent","guildId":"5","track":"QAAA"}"#.into(),
        );

        match convert_ws_message(Some(frame)) {
            Ok(Some(IncomingMessage::Event(NodeEvent::TrackStart(ev)))) => {
                assert_eq!(ev.guild_id.get(), 5);
                assert_eq!(ev.track, "QAAA");
            },
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn garbage_is_dropped_not_fatal() {
        let frame = Message::Text("{not json".into());
        assert!(matches!(convert_ws_message(Some(frame)), Ok(None)));
    }

    #[test]
    fn close_frames_surface_as_errors() {
        assert!(matches!(
            convert_ws_message(Some(Message::Close(None))),
            Err(Error::WsClosed(None))
        ));
    }

    #[test]
    fn handshake_carries_credentials() {
        let req = handshake_request("ws://127.0.0.1:2333", "hunter2", 7, 2).unwrap();
        let headers = req.headers();

        assert_eq!(headers["Authorization"], "hunter2");
        assert_eq!(headers["User-Id"], "7");
        assert_eq!(headers["Num-Shards"], "2");
        assert!(headers["Client-Name"]
            .to_str()
            .unwrap()
            .starts_with("lavasnek/"));
    }
}
