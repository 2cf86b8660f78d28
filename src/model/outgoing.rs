use super::Band;
use crate::{id::GuildId, info::ConnectionInfo};
use serde::{Deserialize, Serialize};

/// Commands sent to a node over its websocket.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
#[non_exhaustive]
pub enum OutgoingMessage {
    /// Hands the node a guild's voice credentials, creating or refreshing its player.
    VoiceUpdate(VoiceUpdatePayload),
    Play(Play),
    Stop(GuildCommand),
    Pause(Pause),
    Seek(Seek),
    Volume(Volume),
    Equalizer(Equalizer),
    /// Tears down the guild's player and voice connection on the node.
    Destroy(GuildCommand),
}

impl OutgoingMessage {
    /// Guild this command is addressed to.
    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        match self {
            OutgoingMessage::VoiceUpdate(m) => m.guild_id,
            OutgoingMessage::Play(m) => m.guild_id,
            OutgoingMessage::Stop(m) | OutgoingMessage::Destroy(m) => m.guild_id,
            OutgoingMessage::Pause(m) => m.guild_id,
            OutgoingMessage::Seek(m) => m.guild_id,
            OutgoingMessage::Volume(m) => m.guild_id,
            OutgoingMessage::Equalizer(m) => m.guild_id,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildCommand {
    pub guild_id: GuildId,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceUpdatePayload {
    pub guild_id: GuildId,
    pub session_id: String,
    pub event: VoiceServerEvent,
}

/// The `VOICE_SERVER_UPDATE` payload, as Discord delivered it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VoiceServerEvent {
    pub token: String,
    pub guild_id: GuildId,
    pub endpoint: String,
}

impl From<&ConnectionInfo> for VoiceUpdatePayload {
    fn from(info: &ConnectionInfo) -> Self {
        Self {
            guild_id: info.guild_id,
            session_id: info.session_id.clone(),
            event: VoiceServerEvent {
                token: info.token.clone(),
                guild_id: info.guild_id,
                endpoint: info.endpoint.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub guild_id: GuildId,
    pub track: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    /// When set, the node ignores this command if something is already playing.
    pub no_replace: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pause {
    pub guild_id: GuildId,
    pub pause: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seek {
    pub guild_id: GuildId,
    /// Target position in milliseconds.
    pub position: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub guild_id: GuildId,
    pub volume: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equalizer {
    pub guild_id: GuildId,
    pub bands: Vec<Band>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ChannelId;
    use serde_json::{json, to_value};

    #[test]
    fn voice_update_matches_lavalink_shape() {
        let info = ConnectionInfo {
            channel_id: Some(ChannelId(10)),
            endpoint: "eu-west.discord.media:443".into(),
            guild_id: GuildId(1),
            session_id: "abc".into(),
            token: "tok".into(),
        };

        let msg = OutgoingMessage::VoiceUpdate(VoiceUpdatePayload::from(&info));
        assert_eq!(
            to_value(&msg).unwrap(),
            json!({
                "op": "voiceUpdate",
                "guildId": "1",
                "sessionId": "abc",
                "event": {
                    "token": "tok",
                    "guild_id": "1",
                    "endpoint": "eu-west.discord.media:443"
                }
            })
        );
    }

    #[test]
    fn play_omits_unset_bounds() {
        let msg = OutgoingMessage::Play(Play {
            guild_id: GuildId(2),
            track: "QA".into(),
            start_time: None,
            end_time: Some(3000),
            no_replace: false,
        });

        assert_eq!(
            to_value(&msg).unwrap(),
            json!({
                "op": "play",
                "guildId": "2",
                "track": "QA",
                "endTime": 3000,
                "noReplace": false
            })
        );
    }

    #[test]
    fn simple_commands_are_tagged() {
        let stop = OutgoingMessage::Stop(GuildCommand {
            guild_id: GuildId(4),
        });
        assert_eq!(to_value(&stop).unwrap(), json!({"op": "stop", "guildId": "4"}));

        let destroy = OutgoingMessage::Destroy(GuildCommand {
            guild_id: GuildId(4),
        });
        assert_eq!(destroy.guild_id(), GuildId(4));
        assert_eq!(to_value(&destroy).unwrap()["op"], "destroy");
    }
}
