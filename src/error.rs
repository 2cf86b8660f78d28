//! Client, gateway and node error handling.

use crate::ws::Error as WsError;
use flume::SendError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use std::{error::Error, fmt};
use tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue;

#[derive(Debug)]
#[non_exhaustive]
/// Error returned by any operation against a Lavalink node or the
/// voice gateway handshake feeding it.
pub enum LavalinkError {
    /// A connection-info waiter was dropped, cancelled, or replaced.
    Dropped,
    /// A [`ConnectionInfo`] was missing fields needed to open a session.
    ///
    /// [`ConnectionInfo`]: crate::ConnectionInfo
    IncompleteConnectionInfo,
    /// A configured value could not be sent as a websocket handshake header.
    InvalidHeader(InvalidHeaderValue),
    /// A REST response from the node could not be decoded.
    Json(JsonError),
    /// The REST API of the node could not be reached, or replied with an error status.
    Network(HttpError),
    /// The background task owning the node socket has exited.
    NodeClosed,
    /// A command was issued for a guild before [`create_session`] was called for it.
    ///
    /// *Users should `join` and `create_session` before retrying.*
    ///
    /// [`create_session`]: crate::Lavalink::create_session
    NoSessionPresent,
    /// No gateway shard was provided to send voice state updates with.
    NoSender,
    /// Voice connection details were not received from Discord in the
    /// time given in [the client's configuration].
    ///
    /// This can occur if the bot lacks permission to join the channel, if a
    /// message is lost by the Discord client between restarts, or if Discord's
    /// gateway believes that this bot is still in the channel it attempts to join.
    ///
    /// [the client's configuration]: crate::Config
    TimedOut,
    /// The node socket failed to connect, send, or receive.
    Ws(WsError),
}

impl LavalinkError {
    /// Indicates whether this failure came from a handshake deadline expiring.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, LavalinkError::TimedOut)
    }

    /// Indicates whether this failure may have left (or been
    /// caused by) Discord's gateway state being in an
    /// inconsistent state.
    ///
    /// Failure to `leave` before rejoining may cause further
    /// timeouts.
    #[must_use]
    pub fn should_leave_server(&self) -> bool {
        matches!(self, LavalinkError::TimedOut)
    }

    /// Indicates whether this failure came from the transport to the node, and
    /// may succeed if retried later.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            LavalinkError::Network(_) | LavalinkError::Ws(_) | LavalinkError::NodeClosed
        )
    }
}

impl fmt::Display for LavalinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LavalinkError::Dropped => write!(f, "request was cancelled/dropped."),
            LavalinkError::IncompleteConnectionInfo =>
                write!(f, "connection info is missing a channel, endpoint, token or session."),
            LavalinkError::InvalidHeader(e) => write!(f, "invalid handshake header: {}.", e),
            LavalinkError::Json(e) => write!(f, "unexpected response from node: {}.", e),
            LavalinkError::Network(e) => write!(f, "network error talking to node: {}.", e),
            LavalinkError::NodeClosed => write!(f, "the node connection has closed."),
            LavalinkError::NoSessionPresent =>
                write!(f, "no session present for this guild, create one first."),
            LavalinkError::NoSender => write!(f, "no gateway destination."),
            LavalinkError::TimedOut => write!(f, "gateway response from Discord timed out."),
            LavalinkError::Ws(e) => write!(f, "node websocket failure {:?}.", e),
        }
    }
}

impl Error for LavalinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LavalinkError::InvalidHeader(e) => Some(e),
            LavalinkError::Json(e) => Some(e),
            LavalinkError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HttpError> for LavalinkError {
    fn from(e: HttpError) -> Self {
        LavalinkError::Network(e)
    }
}

impl From<InvalidHeaderValue> for LavalinkError {
    fn from(e: InvalidHeaderValue) -> Self {
        LavalinkError::InvalidHeader(e)
    }
}

impl From<JsonError> for LavalinkError {
    fn from(e: JsonError) -> Self {
        LavalinkError::Json(e)
    }
}

impl<T> From<SendError<T>> for LavalinkError {
    fn from(_e: SendError<T>) -> Self {
        LavalinkError::NodeClosed
    }
}

impl From<WsError> for LavalinkError {
    fn from(e: WsError) -> Self {
        LavalinkError::Ws(e)
    }
}

/// Convenience type for Lavalink error handling.
pub type LavalinkResult<T> = Result<T, LavalinkError>;

pub use crate::ws::{Error as SocketError, Result as SocketResult};
