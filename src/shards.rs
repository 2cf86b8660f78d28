//! Handles for sending voice state updates over a Discord gateway connection.

use crate::{error::LavalinkResult, id::*};
use async_trait::async_trait;
use derivative::Derivative;
use std::sync::Arc;

/// Trait for a generic shard handle to send voice state updates to Discord.
///
/// This allows any Discord library to drive joins and leaves through
/// [`Lavalink::join`] and [`Lavalink::leave`], and is intended to wrap a
/// message channel to a single shard. Only `VoiceStateUpdate` (opcode 4)
/// messages are ever sent.
///
/// Implementors must still feed Discord's replies back in via
/// [`Lavalink::raw_handle_event_voice_server_update`] and
/// [`Lavalink::raw_handle_event_voice_state_update`].
///
/// [`Lavalink::join`]: crate::Lavalink::join
/// [`Lavalink::leave`]: crate::Lavalink::leave
/// [`Lavalink::raw_handle_event_voice_server_update`]: crate::Lavalink::raw_handle_event_voice_server_update
/// [`Lavalink::raw_handle_event_voice_state_update`]: crate::Lavalink::raw_handle_event_voice_state_update
#[async_trait]
pub trait VoiceUpdate {
    /// Send a voice update message to the inner shard handle.
    async fn update_voice_state(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
        self_deaf: bool,
        self_mute: bool,
    ) -> LavalinkResult<()>;
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[non_exhaustive]
/// A reference to an individual gateway connection.
pub enum Shard {
    /// Handle to a generic shard instance.
    Generic(#[derivative(Debug = "ignore")] Arc<dyn VoiceUpdate + Send + Sync>),
}

impl Shard {
    /// Wraps any voice state sender as a shard handle.
    pub fn generic<T>(sender: T) -> Self
    where
        T: VoiceUpdate + Send + Sync + 'static,
    {
        Shard::Generic(Arc::new(sender))
    }
}

#[async_trait]
impl VoiceUpdate for Shard {
    async fn update_voice_state(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
        self_deaf: bool,
        self_mute: bool,
    ) -> LavalinkResult<()> {
        match self {
            Shard::Generic(g) =>
                g.update_voice_state(guild_id, channel_id, self_deaf, self_mute)
                    .await,
        }
    }
}

/// A shard handle which forwards every voice state update into a channel.
///
/// Useful when the gateway connection lives on another task: the receiving
/// side serialises each [`VoiceStateRequest`] as an opcode 4 payload.
#[derive(Clone, Debug)]
pub struct ChannelShard(pub flume::Sender<VoiceStateRequest>);

/// A request to move the bot's voice state in one guild.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoiceStateRequest {
    /// Guild whose voice state should change.
    pub guild_id: GuildId,
    /// Channel to join, or `None` to disconnect.
    pub channel_id: Option<ChannelId>,
    /// Whether to join self-deafened.
    pub self_deaf: bool,
    /// Whether to join self-muted.
    pub self_mute: bool,
}

impl VoiceStateRequest {
    /// Renders this request as a Discord gateway opcode 4 payload.
    #[must_use]
    pub fn to_gateway_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "op": 4,
            "d": {
                "channel_id": self.channel_id,
                "guild_id": self.guild_id,
                "self_deaf": self.self_deaf,
                "self_mute": self.self_mute
            }
        })
    }
}

#[async_trait]
impl VoiceUpdate for ChannelShard {
    async fn update_voice_state(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
        self_deaf: bool,
        self_mute: bool,
    ) -> LavalinkResult<()> {
        self.0
            .send_async(VoiceStateRequest {
                guild_id,
                channel_id,
                self_deaf,
                self_mute,
            })
            .await
            .map_err(|_| crate::error::LavalinkError::NoSender)
    }
}
