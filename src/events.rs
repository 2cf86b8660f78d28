//! Caller-supplied reactions to events pushed by a node.

use crate::{
    model::{
        PlayerDestroyed,
        PlayerUpdate,
        Stats,
        TrackException,
        TrackFinish,
        TrackStart,
        TrackStuck,
        WebSocketClosed,
    },
    Lavalink,
};
use async_trait::async_trait;

/// Trait to handle events received from a Lavalink node.
///
/// Every method defaults to a no-op, so implementors only override what they
/// need. Callbacks for one node run one at a time, in the order their frames
/// arrived: the next frame is not read until the current callback returns.
/// Long-running work should be spawned onto its own task.
///
/// Each callback receives a handle to the client, which may be used to issue
/// further commands (e.g., skipping past a track which raised an exception).
#[async_trait]
pub trait LavalinkEventHandler: Send + Sync {
    /// Periodic node statistics.
    async fn stats(&self, _client: Lavalink, _event: Stats) {}

    /// Periodic playback position of a guild's player.
    async fn player_update(&self, _client: Lavalink, _event: PlayerUpdate) {}

    async fn track_start(&self, _client: Lavalink, _event: TrackStart) {}

    /// A track has ended.
    ///
    /// For guilds on the queue loop, the queue has already moved on by the
    /// time this is called.
    async fn track_finish(&self, _client: Lavalink, _event: TrackFinish) {}

    async fn track_exception(&self, _client: Lavalink, _event: TrackException) {}

    async fn track_stuck(&self, _client: Lavalink, _event: TrackStuck) {}

    /// Either Discord closed a guild's voice connection on the node, or
    /// (when `guild_id` is `None`) the connection to the node itself ended.
    ///
    /// The latter is delivered once, after which no more events arrive.
    async fn websocket_closed(&self, _client: Lavalink, _event: WebSocketClosed) {}

    async fn player_destroyed(&self, _client: Lavalink, _event: PlayerDestroyed) {}
}

/// A handler which ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

#[async_trait]
impl LavalinkEventHandler for NoopHandler {}
