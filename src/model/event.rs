use crate::id::{GuildId, UserId};
use serde::{Deserialize, Serialize};

/// Any frame a node pushes over its websocket.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
#[non_exhaustive]
pub enum IncomingMessage {
    /// Periodic position report for one guild's player.
    PlayerUpdate(PlayerUpdate),
    /// Periodic resource usage report for the whole node.
    Stats(Stats),
    /// A playback or voice connection event for one guild.
    Event(NodeEvent),
    /// An `op` this library does not understand.
    #[serde(other)]
    Unknown,
}

/// Playback and voice connection events, keyed by their `type` field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum NodeEvent {
    /// A track began playing.
    #[serde(rename = "TrackStartEvent")]
    TrackStart(TrackStart),
    /// A track stopped playing, for any reason.
    #[serde(rename = "TrackEndEvent")]
    TrackFinish(TrackFinish),
    /// A track raised an exception while loading or playing.
    #[serde(rename = "TrackExceptionEvent")]
    TrackException(TrackException),
    /// A track stopped producing audio frames.
    #[serde(rename = "TrackStuckEvent")]
    TrackStuck(TrackStuck),
    /// Discord closed the node's voice websocket for a guild.
    #[serde(rename = "WebSocketClosedEvent")]
    WebSocketClosed(WebSocketClosed),
    /// A guild's player was torn down on the node.
    #[serde(rename = "PlayerDestroyedEvent")]
    PlayerDestroyed(PlayerDestroyed),
    /// An event `type` this library does not understand.
    #[serde(other)]
    Unknown,
}

impl NodeEvent {
    /// Guild the event relates to, if any.
    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            NodeEvent::TrackStart(e) => Some(e.guild_id),
            NodeEvent::TrackFinish(e) => Some(e.guild_id),
            NodeEvent::TrackException(e) => Some(e.guild_id),
            NodeEvent::TrackStuck(e) => Some(e.guild_id),
            NodeEvent::WebSocketClosed(e) => e.guild_id,
            NodeEvent::PlayerDestroyed(e) => Some(e.guild_id),
            NodeEvent::Unknown => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub guild_id: GuildId,
    pub state: PlayerState,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PlayerState {
    /// Unix timestamp of the report, in milliseconds.
    pub time: i64,
    /// Playback position in milliseconds, absent when nothing is playing.
    #[serde(default)]
    pub position: Option<i64>,
    /// Whether the node's voice connection for this guild is up.
    #[serde(default)]
    pub connected: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub players: i64,
    pub playing_players: i64,
    /// Node uptime in milliseconds.
    pub uptime: i64,
    pub memory: Memory,
    pub cpu: Cpu,
    /// Audio frame statistics for the last minute; absent until a player has run.
    #[serde(default)]
    pub frame_stats: Option<FrameStats>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Memory {
    pub free: i64,
    pub used: i64,
    pub allocated: i64,
    pub reservable: i64,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub cores: i64,
    pub system_load: f64,
    pub lavalink_load: f64,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FrameStats {
    pub sent: i64,
    pub nulled: i64,
    pub deficit: i64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStart {
    pub guild_id: GuildId,
    /// Handle of the track which started.
    #[serde(default)]
    pub track: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFinish {
    pub guild_id: GuildId,
    /// Handle of the track which ended.
    #[serde(default)]
    pub track: String,
    pub reason: TrackEndReason,
}

/// Why a node stopped playing a track.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackEndReason {
    /// Playback reached the end of the track.
    Finished,
    /// The track failed to start.
    LoadFailed,
    /// A `stop` command ended it.
    Stopped,
    /// A new `play` command displaced it.
    Replaced,
    /// The player was cleaned up.
    Cleanup,
    /// A reason this library does not understand.
    #[serde(other)]
    Unknown,
}

impl TrackEndReason {
    /// Whether a queue should move on to its next entry after this reason.
    #[must_use]
    pub fn may_start_next(self) -> bool {
        matches!(self, TrackEndReason::Finished | TrackEndReason::LoadFailed)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackException {
    pub guild_id: GuildId,
    #[serde(default)]
    pub track: String,
    /// Structured exception, as sent by Lavalink 3.4 and later.
    #[serde(default)]
    pub exception: Option<Exception>,
    /// Bare error message, as sent by older nodes.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Exception {
    #[serde(default)]
    pub message: Option<String>,
    /// One of `COMMON`, `SUSPICIOUS` or `FAULT`.
    pub severity: String,
    #[serde(default)]
    pub cause: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStuck {
    pub guild_id: GuildId,
    #[serde(default)]
    pub track: String,
    pub threshold_ms: u64,
}

/// A closed websocket, either Discord's voice socket for one guild or (with
/// `guild_id` unset) this client's own connection to the node.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketClosed {
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub code: u16,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub by_remote: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDestroyed {
    pub guild_id: GuildId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub cleanup: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> IncomingMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn track_end_decodes_with_reason() {
        let msg = decode(
            r#"{"op":"event","type":"TrackEndEvent","guildId":"9","track":"QA","reason":"FINISHED"}"#,
        );

        match msg {
            IncomingMessage::Event(NodeEvent::TrackFinish(e)) => {
                assert_eq!(e.guild_id, GuildId(9));
                assert!(e.reason.may_start_next());
            },
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn stopped_and_replaced_do_not_advance() {
        assert!(!TrackEndReason::Stopped.may_start_next());
        assert!(!TrackEndReason::Replaced.may_start_next());
        assert!(!TrackEndReason::Cleanup.may_start_next());
        assert!(TrackEndReason::LoadFailed.may_start_next());
    }

    #[test]
    fn stats_decode() {
        let msg = decode(
            r#"{"op":"stats","players":2,"playingPlayers":1,"uptime":1000,
                "memory":{"free":1,"used":2,"allocated":3,"reservable":4},
                "cpu":{"cores":4,"systemLoad":0.5,"lavalinkLoad":0.1}}"#,
        );

        match msg {
            IncomingMessage::Stats(s) => {
                assert_eq!(s.playing_players, 1);
                assert_eq!(s.cpu.cores, 4);
                assert!(s.frame_stats.is_none());
            },
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn player_update_decodes() {
        let msg = decode(
            r#"{"op":"playerUpdate","guildId":"3","state":{"time":1500,"position":600,"connected":true}}"#,
        );

        assert_eq!(
            msg,
            IncomingMessage::PlayerUpdate(PlayerUpdate {
                guild_id: GuildId(3),
                state: PlayerState {
                    time: 1500,
                    position: Some(600),
                    connected: true,
                },
            })
        );
    }

    #[test]
    fn unknown_kinds_are_tolerated() {
        assert_eq!(decode(r#"{"op":"ready","resumed":false}"#), IncomingMessage::Unknown);
        assert_eq!(
            decode(r#"{"op":"event","type":"SegmentSkipped","guildId":"1"}"#),
            IncomingMessage::Event(NodeEvent::Unknown)
        );
    }

    #[test]
    fn exception_accepts_both_shapes() {
        let new = decode(
            r#"{"op":"event","type":"TrackExceptionEvent","guildId":"1","track":"QA",
                "exception":{"message":"boom","severity":"COMMON","cause":"x"}}"#,
        );
        let old = decode(
            r#"{"op":"event","type":"TrackExceptionEvent","guildId":"1","track":"QA","error":"boom"}"#,
        );

        for msg in [new, old] {
            assert!(matches!(msg, IncomingMessage::Event(NodeEvent::TrackException(_))));
        }
    }
}
