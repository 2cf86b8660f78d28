//! Building and issuing `play` commands.

use crate::{
    error::LavalinkResult,
    id::{GuildId, UserId},
    model::{OutgoingMessage, Play, Track, TrackQueue},
    Lavalink,
};
use std::time::Duration;
use tracing::{debug, instrument};

/// Accumulates options for playing a track in one guild.
///
/// Nothing is sent until [`start`] or [`queue`] is called.
///
/// [`start`]: PlayBuilder::start
/// [`queue`]: PlayBuilder::queue
#[derive(Debug)]
#[must_use = "a PlayBuilder does nothing until started or queued"]
pub struct PlayBuilder {
    client: Lavalink,
    guild_id: GuildId,
    track: Track,
    requester: Option<UserId>,
    start_time: u64,
    finish_time: Option<u64>,
    replace: bool,
}

impl PlayBuilder {
    pub(crate) fn new(client: Lavalink, guild_id: GuildId, track: Track) -> Self {
        Self {
            client,
            guild_id,
            track,
            requester: None,
            start_time: 0,
            finish_time: None,
            replace: true,
        }
    }

    /// Records who asked for this track.
    pub fn requester(mut self, requester: impl Into<UserId>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    /// Whether [`start`] may interrupt a track which is already playing.
    ///
    /// Defaults to `true`.
    ///
    /// [`start`]: PlayBuilder::start
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Begins playback at the given offset into the track.
    pub fn start_time(mut self, start: Duration) -> Self {
        self.start_time = duration_millis(start);
        self
    }

    pub fn start_time_secs(self, secs: u64) -> Self {
        self.start_time(Duration::from_secs(secs))
    }

    pub fn start_time_millis(self, millis: u64) -> Self {
        self.start_time(Duration::from_millis(millis))
    }

    /// Ends playback at the given offset into the track.
    pub fn finish_time(mut self, finish: Duration) -> Self {
        self.finish_time = Some(duration_millis(finish));
        self
    }

    pub fn finish_time_secs(self, secs: u64) -> Self {
        self.finish_time(Duration::from_secs(secs))
    }

    pub fn finish_time_millis(self, millis: u64) -> Self {
        self.finish_time(Duration::from_millis(millis))
    }

    fn into_entry(self) -> (Lavalink, GuildId, bool, TrackQueue) {
        let entry = TrackQueue {
            track: self.track,
            start_time: self.start_time,
            end_time: self.finish_time,
            requester: self.requester,
        };

        (self.client, self.guild_id, self.replace, entry)
    }

    /// Plays the track immediately, taking the place of the queue head.
    ///
    /// When [`replace`] is `false` and the node still holds a track, the node
    /// ignores the command and local state is left untouched. A stopped or
    /// finished player counts as free even while `now_playing` is set.
    ///
    /// # Errors
    ///
    /// Fails with [`NoSessionPresent`] if no session exists for the guild.
    ///
    /// [`replace`]: PlayBuilder::replace
    /// [`NoSessionPresent`]: crate::error::LavalinkError::NoSessionPresent
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn start(self) -> LavalinkResult<()> {
        let (client, guild_id, replace, entry) = self.into_entry();
        client.require_session(guild_id)?;

        let nodes = &client.inner.nodes;
        let busy = !replace && nodes.is_busy(guild_id);
        let applied = nodes.with_node(guild_id, |node| {
            if busy {
                return false;
            }

            match node.queue.first_mut() {
                Some(head) => *head = entry.clone(),
                None => node.queue.push(entry.clone()),
            }
            node.now_playing = Some(entry.clone());
            true
        });

        if !applied {
            debug!("Player busy and replace disabled; node will ignore this track.");
        }

        client.send(play_message(guild_id, &entry, !replace)).await
    }

    /// Adds the track to the end of the guild's queue, starting it straight
    /// away if nothing is playing.
    ///
    /// The guild joins the queue loop, so each finished track hands over to
    /// the next one without further calls.
    ///
    /// # Errors
    ///
    /// Fails with [`NoSessionPresent`] if no session exists for the guild.
    ///
    /// [`NoSessionPresent`]: crate::error::LavalinkError::NoSessionPresent
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn queue(self) -> LavalinkResult<()> {
        let (client, guild_id, _, entry) = self.into_entry();
        client.require_session(guild_id)?;

        let nodes = &client.inner.nodes;
        let idle_head = nodes.with_node(guild_id, |node| {
            node.queue.push(entry);

            if node.now_playing.is_none() {
                node.now_playing = node.queue.first().cloned();
                node.now_playing.clone()
            } else {
                None
            }
        });
        nodes.add_to_loops(guild_id);

        match idle_head {
            Some(head) => {
                debug!("Player idle, starting queue head.");
                client.send(play_message(guild_id, &head, false)).await
            },
            None => Ok(()),
        }
    }
}

pub(crate) fn play_message(guild_id: GuildId, entry: &TrackQueue, no_replace: bool) -> OutgoingMessage {
    OutgoingMessage::Play(Play {
        guild_id,
        track: entry.track.track.clone(),
        start_time: (entry.start_time > 0).then_some(entry.start_time),
        end_time: entry.end_time,
        no_replace,
    })
}

pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
