use crate::id::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of the voice handshake an update carried.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Half {
    /// `VOICE_SERVER_UPDATE`: endpoint and token.
    Server,
    /// `VOICE_STATE_UPDATE`: session id and channel.
    State,
}

#[derive(Clone, Debug)]
pub(crate) enum ConnectionProgress {
    Complete(ConnectionInfo),
    Incomplete(Partial),
}

impl ConnectionProgress {
    pub(crate) fn new(guild_id: GuildId) -> Self {
        ConnectionProgress::Incomplete(Partial {
            guild_id,
            channel_id: None,
            endpoint: None,
            session_id: None,
            token: None,
        })
    }

    pub(crate) fn get_connection_info(&self) -> Option<&ConnectionInfo> {
        if let Self::Complete(c) = self {
            Some(c)
        } else {
            None
        }
    }

    pub(crate) fn info(&self) -> Option<ConnectionInfo> {
        self.get_connection_info().cloned()
    }

    pub(crate) fn channel_id(&self) -> Option<ChannelId> {
        match self {
            ConnectionProgress::Complete(conn_info) => conn_info.channel_id,
            ConnectionProgress::Incomplete(part) => part.channel_id,
        }
    }

    /// Applies a voice state update for the bot user.
    ///
    /// Returns `true` if this update left the connection complete.
    pub(crate) fn apply_state_update(&mut self, session_id: String, channel_id: ChannelId) -> bool {
        match self {
            Self::Complete(c) if c.channel_id == Some(channel_id) => {
                c.session_id = session_id;
                true
            },
            Self::Complete(c) => {
                // Moved to another channel by an admin: Discord follows up with a
                // fresh server update, so the old endpoint is no longer usable.
                let guild_id = c.guild_id;
                *self = Self::Incomplete(Partial {
                    guild_id,
                    channel_id: Some(channel_id),
                    endpoint: None,
                    session_id: Some(session_id),
                    token: None,
                });
                false
            },
            Self::Incomplete(i) => i
                .apply_state_update(session_id, channel_id)
                .map(|info| {
                    *self = Self::Complete(info);
                })
                .is_some(),
        }
    }

    /// Applies a voice server update.
    ///
    /// Returns `true` if this update left the connection complete.
    pub(crate) fn apply_server_update(&mut self, endpoint: String, token: String) -> bool {
        match self {
            Self::Complete(c) => {
                c.endpoint = endpoint;
                c.token = token;
                true
            },
            Self::Incomplete(i) => i
                .apply_server_update(endpoint, token)
                .map(|info| {
                    *self = Self::Complete(info);
                })
                .is_some(),
        }
    }
}

/// Parameters and information needed to open a Lavalink session for a guild's
/// voice connection.
///
/// These are assembled from a guild's `VOICE_SERVER_UPDATE` and
/// `VOICE_STATE_UPDATE` gateway events, either by this library's own gateway
/// handling or by [`raw_handle_event_voice_server_update`] and
/// [`raw_handle_event_voice_state_update`].
///
/// [`raw_handle_event_voice_server_update`]: crate::Lavalink::raw_handle_event_voice_server_update
/// [`raw_handle_event_voice_state_update`]: crate::Lavalink::raw_handle_event_voice_state_update
#[derive(Clone, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ConnectionInfo {
    /// ID of the voice channel being joined, if it is known.
    ///
    /// This is not needed to establish a connection, but can be useful
    /// for book-keeping.
    pub channel_id: Option<ChannelId>,
    /// URL of the voice websocket gateway server assigned to this call.
    pub endpoint: String,
    /// ID of the target voice channel's parent guild.
    pub guild_id: GuildId,
    /// Unique string describing this session for validation/authentication purposes.
    pub session_id: String,
    /// Ephemeral secret used to validate the above session.
    pub token: String,
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("channel_id", &self.channel_id)
            .field("endpoint", &self.endpoint)
            .field("guild_id", &self.guild_id)
            .field("session_id", &self.session_id)
            .field("token", &"<secret>")
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct Partial {
    pub channel_id: Option<ChannelId>,
    pub endpoint: Option<String>,
    pub guild_id: GuildId,
    pub session_id: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partial")
            .field("channel_id", &self.channel_id)
            .field("endpoint", &self.endpoint)
            .field("guild_id", &self.guild_id)
            .field("session_id", &self.session_id)
            .field("token_is_some", &self.token.is_some())
            .finish()
    }
}

impl Partial {
    fn finalise(&mut self) -> Option<ConnectionInfo> {
        if self.channel_id.is_some()
            && self.endpoint.is_some()
            && self.session_id.is_some()
            && self.token.is_some()
        {
            Some(ConnectionInfo {
                channel_id: self.channel_id,
                endpoint: self.endpoint.take()?,
                session_id: self.session_id.take()?,
                token: self.token.take()?,
                guild_id: self.guild_id,
            })
        } else {
            None
        }
    }

    fn apply_state_update(
        &mut self,
        session_id: String,
        channel_id: ChannelId,
    ) -> Option<ConnectionInfo> {
        if self.channel_id.map_or(false, |c| c != channel_id) {
            self.endpoint = None;
            self.token = None;
        }

        self.channel_id = Some(channel_id);
        self.session_id = Some(session_id);

        self.finalise()
    }

    fn apply_server_update(&mut self, endpoint: String, token: String) -> Option<ConnectionInfo> {
        self.endpoint = Some(endpoint);
        self.token = Some(token);

        self.finalise()
    }
}
