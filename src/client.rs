use crate::{
    constants::{EQ_BAND_COUNT, MAX_VOLUME},
    error::{LavalinkError, LavalinkResult},
    gateway::GatewayResolver,
    id::{ChannelId, GuildId, UserId},
    join::{ConnectionInfoInsert, ConnectionInfoRemove},
    model::{
        Band,
        Equalizer,
        GuildCommand,
        Info,
        OutgoingMessage,
        Pause,
        Seek,
        Track,
        TrackQueue,
        Tracks,
        Volume,
        VoiceUpdatePayload,
    },
    nodes::{Node, NodeStore},
    player::{duration_millis, play_message, PlayBuilder},
    rest::RestClient,
    shards::{Shard, VoiceUpdate},
    tasks::NodeMessage,
    Config,
    ConnectionInfo,
};
use dashmap::DashMap;
use flume::Sender;
use parking_lot::RwLock as PRwLock;
use std::{collections::HashMap, fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, instrument};

/// A client connected to a single Lavalink node.
///
/// This is a cheap handle: clones share the same node connection, sessions,
/// and per-guild state. Every callback of a [`LavalinkEventHandler`] receives
/// one.
///
/// [`LavalinkEventHandler`]: crate::LavalinkEventHandler
#[derive(Clone, Debug)]
pub struct Lavalink {
    pub(crate) inner: Arc<LavalinkInner>,
}

#[derive(Debug)]
pub(crate) struct LavalinkInner {
    pub(crate) config: Config,
    pub(crate) rest: RestClient,
    pub(crate) gateway: Arc<GatewayResolver>,
    pub(crate) nodes: NodeStore,
    pub(crate) sessions: DashMap<GuildId, ConnectionInfo>,
    pub(crate) commands: Sender<NodeMessage>,
    pub(crate) shard: PRwLock<Option<Shard>>,
}

impl Lavalink {
    pub(crate) fn new_raw(config: Config, commands: Sender<NodeMessage>, shard: Option<Shard>) -> Self {
        let rest = RestClient::new(
            config.rest_uri(),
            config.password.clone(),
            config.search_prefix.clone(),
        );

        Self::from_inner(Arc::new(LavalinkInner {
            gateway: Arc::new(GatewayResolver::new(config.user_id)),
            config,
            rest,
            nodes: NodeStore::default(),
            sessions: DashMap::new(),
            commands,
            shard: PRwLock::new(shard),
        }))
    }

    pub(crate) fn from_inner(inner: Arc<LavalinkInner>) -> Self {
        Self { inner }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) async fn send(&self, msg: OutgoingMessage) -> LavalinkResult<()> {
        match &msg {
            OutgoingMessage::Play(m) => self.inner.nodes.mark_playing(m.guild_id),
            OutgoingMessage::Stop(m) | OutgoingMessage::Destroy(m) =>
                self.inner.nodes.mark_silent(m.guild_id),
            _ => {},
        }

        self.inner
            .commands
            .send_async(NodeMessage::Command(msg))
            .await
            .map_err(LavalinkError::from)
    }

    pub(crate) fn require_session(&self, guild_id: GuildId) -> LavalinkResult<()> {
        if self.inner.sessions.contains_key(&guild_id) {
            Ok(())
        } else {
            Err(LavalinkError::NoSessionPresent)
        }
    }

    fn shard(&self) -> Option<Shard> {
        self.inner.shard.read().clone()
    }

    /// Attaches a gateway shard, letting [`join`] and [`leave`] move the bot
    /// between voice channels.
    ///
    /// Replaces any shard given to the builder.
    ///
    /// [`join`]: Lavalink::join
    /// [`leave`]: Lavalink::leave
    pub fn start_discord_gateway(&self, shard: Shard) {
        *self.inner.shard.write() = Some(shard);
    }

    /// Closes the node connection and stops delivering events.
    ///
    /// Commands sent afterwards fail with [`LavalinkError::NodeClosed`].
    pub async fn close(&self) -> LavalinkResult<()> {
        self.inner
            .commands
            .send_async(NodeMessage::Close)
            .await
            .map_err(LavalinkError::from)
    }

    /// Feeds a `VOICE_SERVER_UPDATE` event from Discord into the client.
    pub fn raw_handle_event_voice_server_update<G>(&self, guild_id: G, endpoint: String, token: String)
    where
        G: Into<GuildId>,
    {
        self.inner
            .gateway
            .handle_server_update(guild_id.into(), endpoint, token);
    }

    /// Feeds a `VOICE_STATE_UPDATE` event from Discord into the client.
    ///
    /// Updates for users other than the bot are ignored. A `channel_id` of
    /// `None` means the bot left voice, and removes the guild's connection info.
    pub fn raw_handle_event_voice_state_update<G, U>(
        &self,
        guild_id: G,
        user_id: U,
        session_id: String,
        channel_id: Option<ChannelId>,
    ) where
        G: Into<GuildId>,
        U: Into<UserId>,
    {
        self.inner.gateway.handle_state_update(
            guild_id.into(),
            user_id.into(),
            session_id,
            channel_id,
        );
    }

    /// Waits until both halves of the voice handshake arrive for a guild.
    ///
    /// Only events received after this call count. A `timeout` of `None`
    /// waits forever.
    pub fn wait_for_full_connection_info_insert<G: Into<GuildId>>(
        &self,
        guild_id: G,
        timeout: Option<Duration>,
    ) -> ConnectionInfoInsert {
        let (registration, rx) = self.inner.gateway.register_insert(guild_id.into());
        ConnectionInfoInsert::new(registration, rx.into_recv_async(), timeout)
    }

    /// Waits until the bot's voice state in a guild reports no channel.
    ///
    /// A `timeout` of `None` waits forever.
    pub fn wait_for_connection_info_remove<G: Into<GuildId>>(
        &self,
        guild_id: G,
        timeout: Option<Duration>,
    ) -> ConnectionInfoRemove {
        let (registration, rx) = self.inner.gateway.register_remove(guild_id.into());
        ConnectionInfoRemove::new(registration, rx.into_recv_async(), timeout)
    }

    /// Complete voice connection info for a guild, if the bot is connected.
    #[must_use]
    pub fn get_guild_gateway_connection_info<G: Into<GuildId>>(&self, guild_id: G) -> Option<ConnectionInfo> {
        self.inner.gateway.info(guild_id.into())
    }

    /// Joins a voice channel through the attached shard, using the
    /// configured gateway timeout.
    #[inline]
    pub async fn join<C, G>(&self, guild_id: G, channel_id: C) -> LavalinkResult<ConnectionInfo>
    where
        C: Into<ChannelId>,
        G: Into<GuildId>,
    {
        self._join(guild_id.into(), channel_id.into(), self.inner.config.gateway_timeout)
            .await
    }

    /// Joins a voice channel through the attached shard, waiting at most
    /// `timeout` for Discord's reply.
    #[inline]
    pub async fn join_with_timeout<C, G>(
        &self,
        guild_id: G,
        channel_id: C,
        timeout: Option<Duration>,
    ) -> LavalinkResult<ConnectionInfo>
    where
        C: Into<ChannelId>,
        G: Into<GuildId>,
    {
        self._join(guild_id.into(), channel_id.into(), timeout).await
    }

    #[instrument(skip(self))]
    async fn _join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        timeout: Option<Duration>,
    ) -> LavalinkResult<ConnectionInfo> {
        let shard = self.shard().ok_or(LavalinkError::NoSender)?;

        // Register before asking, so that a fast reply is not missed.
        let wait = self.wait_for_full_connection_info_insert(guild_id, timeout);

        let config = &self.inner.config;
        shard
            .update_voice_state(guild_id, Some(channel_id), config.self_deaf, config.self_mute)
            .await?;

        wait.await
    }

    /// Leaves voice in a guild and forgets its session and connection info.
    ///
    /// With a shard attached, this waits for Discord to confirm the bot has
    /// left. The guild's [`Node`] and its queue loop registration are kept;
    /// see [`remove_guild_node`] and [`remove_guild_from_loops`].
    ///
    /// [`remove_guild_node`]: Lavalink::remove_guild_node
    /// [`remove_guild_from_loops`]: Lavalink::remove_guild_from_loops
    #[inline]
    pub async fn leave<G: Into<GuildId>>(&self, guild_id: G) -> LavalinkResult<()> {
        self._leave(guild_id.into()).await
    }

    #[instrument(skip(self))]
    async fn _leave(&self, guild_id: GuildId) -> LavalinkResult<()> {
        self.inner.sessions.remove(&guild_id);

        if let Some(shard) = self.shard() {
            let in_voice = self.inner.gateway.channel_id(guild_id).is_some();
            let wait = self.wait_for_connection_info_remove(guild_id, self.inner.config.gateway_timeout);

            if let Err(e) = shard.update_voice_state(guild_id, None, false, false).await {
                drop(wait);
                self.inner.gateway.remove(guild_id);
                return Err(e);
            }

            if in_voice {
                wait.await?;
            }
        }

        self.inner.gateway.remove(guild_id);

        Ok(())
    }

    /// Hands a guild's voice connection to the node, creating its player.
    ///
    /// Calling this again for the same guild refreshes the session.
    #[instrument(skip(self))]
    pub async fn create_session(&self, connection_info: &ConnectionInfo) -> LavalinkResult<()> {
        if connection_info.endpoint.is_empty()
            || connection_info.token.is_empty()
            || connection_info.session_id.is_empty()
        {
            return Err(LavalinkError::IncompleteConnectionInfo);
        }

        let guild_id = connection_info.guild_id;
        self.send(OutgoingMessage::VoiceUpdate(VoiceUpdatePayload::from(connection_info)))
            .await?;

        self.inner.sessions.insert(guild_id, connection_info.clone());
        self.inner.nodes.with_node(guild_id, |_| {});

        debug!("Session created for {}.", guild_id);

        Ok(())
    }

    /// Destroys a guild's player on the node and forgets its session.
    ///
    /// The bot stays in voice until [`leave`] is called, and the guild's
    /// [`Node`] is kept until [`remove_guild_node`] is called.
    ///
    /// [`leave`]: Lavalink::leave
    /// [`remove_guild_node`]: Lavalink::remove_guild_node
    #[instrument(skip(self))]
    pub async fn destroy<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        self.send(OutgoingMessage::Destroy(GuildCommand { guild_id }))
            .await?;
        self.inner.sessions.remove(&guild_id);

        Ok(())
    }

    /// Loads an identifier (a link, or a prefixed search) exactly as given.
    pub async fn get_tracks(&self, query: &str) -> LavalinkResult<Tracks> {
        self.inner.rest.load_tracks(query).await
    }

    /// Searches the configured search backend for free text.
    pub async fn search_tracks(&self, query: &str) -> LavalinkResult<Tracks> {
        self.inner.rest.search_tracks(query).await
    }

    /// Loads `query` directly when it is a link, or searches for it otherwise.
    ///
    /// No matches yields an empty list of tracks, not an error.
    pub async fn auto_search_tracks(&self, query: &str) -> LavalinkResult<Tracks> {
        self.inner.rest.auto_search_tracks(query).await
    }

    /// Decodes a track handle back into its metadata.
    pub async fn decode_track(&self, track: &str) -> LavalinkResult<Info> {
        self.inner.rest.decode_track(track).await
    }

    /// Prepares to play a track in a guild.
    ///
    /// See [`PlayBuilder::start`] and [`PlayBuilder::queue`].
    pub fn play<G: Into<GuildId>>(&self, guild_id: G, track: Track) -> PlayBuilder {
        PlayBuilder::new(self.clone(), guild_id.into(), track)
    }

    /// Stops playback.
    ///
    /// The queue and `now_playing` are left as they are.
    #[instrument(skip(self))]
    pub async fn stop<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        self.send(OutgoingMessage::Stop(GuildCommand { guild_id }))
            .await
    }

    /// Removes the head of the queue and returns it, playing the next entry
    /// if there is one.
    ///
    /// When nothing is left, `now_playing` is cleared but the node keeps
    /// playing until [`stop`] is called.
    ///
    /// [`stop`]: Lavalink::stop
    #[instrument(skip(self))]
    pub async fn skip<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<Option<TrackQueue>> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        let (skipped, next) = self.inner.nodes.skip(guild_id);

        if let Some(next) = next {
            self.send(play_message(guild_id, &next, false)).await?;
        }

        Ok(skipped)
    }

    #[instrument(skip(self))]
    pub async fn set_pause<G: Into<GuildId> + Debug>(&self, guild_id: G, pause: bool) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        self.send(OutgoingMessage::Pause(Pause { guild_id, pause }))
            .await?;
        self.inner
            .nodes
            .with_node(guild_id, |node| node.is_paused = pause);

        Ok(())
    }

    #[inline]
    pub async fn pause<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<()> {
        self.set_pause(guild_id, true).await
    }

    #[inline]
    pub async fn resume<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<()> {
        self.set_pause(guild_id, false).await
    }

    /// Jumps to a position in the current track.
    #[instrument(skip(self))]
    pub async fn seek<G: Into<GuildId> + Debug>(&self, guild_id: G, position: Duration) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        self.send(OutgoingMessage::Seek(Seek {
            guild_id,
            position: duration_millis(position),
        }))
        .await
    }

    #[inline]
    pub async fn seek_secs<G: Into<GuildId> + Debug>(&self, guild_id: G, secs: u64) -> LavalinkResult<()> {
        self.seek(guild_id, Duration::from_secs(secs)).await
    }

    #[inline]
    pub async fn seek_millis<G: Into<GuildId> + Debug>(&self, guild_id: G, millis: u64) -> LavalinkResult<()> {
        self.seek(guild_id, Duration::from_millis(millis)).await
    }

    /// Sets the player volume, clamped to `0..=1000`. `100` is unchanged.
    #[instrument(skip(self))]
    pub async fn volume<G: Into<GuildId> + Debug>(&self, guild_id: G, volume: u16) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        let volume = volume.min(MAX_VOLUME);
        self.send(OutgoingMessage::Volume(Volume { guild_id, volume }))
            .await?;
        self.inner
            .nodes
            .with_node(guild_id, |node| node.volume = volume);

        Ok(())
    }

    /// Sends any number of equaliser band changes.
    #[instrument(skip(self))]
    pub async fn equalize_dynamic<G: Into<GuildId> + Debug>(
        &self,
        guild_id: G,
        bands: Vec<Band>,
    ) -> LavalinkResult<()> {
        let guild_id = guild_id.into();
        self.require_session(guild_id)?;

        let bands = bands.into_iter().map(|b| Band::new(b.band, b.gain)).collect();
        self.send(OutgoingMessage::Equalizer(Equalizer { guild_id, bands }))
            .await
    }

    /// Sets the gain of all fifteen bands at once.
    pub async fn equalize_all<G: Into<GuildId> + Debug>(
        &self,
        guild_id: G,
        gains: [f64; EQ_BAND_COUNT],
    ) -> LavalinkResult<()> {
        self.equalize_dynamic(guild_id, Band::all(gains)).await
    }

    pub async fn equalize_band<G: Into<GuildId> + Debug>(&self, guild_id: G, band: Band) -> LavalinkResult<()> {
        self.equalize_dynamic(guild_id, vec![band]).await
    }

    /// Returns every band to neutral gain.
    pub async fn equalize_reset<G: Into<GuildId> + Debug>(&self, guild_id: G) -> LavalinkResult<()> {
        self.equalize_dynamic(guild_id, Band::neutral()).await
    }

    /// A snapshot of a guild's player state, if one has been created.
    #[must_use]
    pub fn get_guild_node<G: Into<GuildId>>(&self, guild_id: G) -> Option<Node> {
        self.inner.nodes.get(guild_id.into())
    }

    /// Replaces a guild's player state wholesale.
    pub fn set_guild_node<G: Into<GuildId>>(&self, guild_id: G, node: Node) {
        self.inner.nodes.set(guild_id.into(), node);
    }

    /// Forgets a guild's player state. Does nothing if there is none.
    pub fn remove_guild_node<G: Into<GuildId>>(&self, guild_id: G) {
        self.inner.nodes.remove(guild_id.into());
    }

    /// Merges key/value pairs into a guild's data, overwriting existing keys.
    pub fn set_data<G: Into<GuildId>>(&self, guild_id: G, data: HashMap<String, String>) {
        self.inner.nodes.set_data(guild_id.into(), data);
    }

    #[must_use]
    pub fn get_data<G: Into<GuildId>>(&self, guild_id: G) -> Option<HashMap<String, String>> {
        self.inner.nodes.get_data(guild_id.into())
    }

    /// Stops a guild's queue from advancing on its own.
    ///
    /// This is independent of [`remove_guild_node`]: fully cleaning up a
    /// guild takes both.
    ///
    /// [`remove_guild_node`]: Lavalink::remove_guild_node
    pub fn remove_guild_from_loops<G: Into<GuildId>>(&self, guild_id: G) {
        self.inner.nodes.remove_from_loops(guild_id.into());
    }

    /// Guilds whose queues currently advance on their own.
    #[must_use]
    pub fn loops(&self) -> Vec<GuildId> {
        self.inner.nodes.loops()
    }

    #[cfg(test)]
    pub(crate) fn test_client() -> (Self, flume::Receiver<NodeMessage>) {
        let (tx, rx) = flume::unbounded();
        let config = Config::default().user_id(UserId(100));

        (Self::new_raw(config, tx, None), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shards::{ChannelShard, VoiceStateRequest};

    const G: GuildId = GuildId(1);

    fn info() -> ConnectionInfo {
        ConnectionInfo {
            channel_id: Some(ChannelId(2)),
            endpoint: "ep".into(),
            guild_id: G,
            session_id: "s".into(),
            token: "t".into(),
        }
    }

    fn track(handle: &str) -> Track {
        Track {
            track: handle.into(),
            info: None,
        }
    }

    fn commands(rx: &flume::Receiver<NodeMessage>) -> Vec<OutgoingMessage> {
        rx.drain()
            .filter_map(|m| match m {
                NodeMessage::Command(c) => Some(c),
                NodeMessage::Close => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn play_needs_a_session() {
        let (client, rx) = Lavalink::test_client();

        let res = client.play(G, track("a")).start().await;
        assert!(matches!(res, Err(LavalinkError::NoSessionPresent)));
        assert!(commands(&rx).is_empty());

        client.create_session(&info()).await.unwrap();
        client.play(G, track("a")).start().await.unwrap();

        let node = client.get_guild_node(G).unwrap();
        assert_eq!(node.now_playing.unwrap().track, track("a"));

        let sent = commands(&rx);
        assert!(matches!(sent[0], OutgoingMessage::VoiceUpdate(_)));
        assert!(matches!(&sent[1], OutgoingMessage::Play(p) if p.track == "a" && !p.no_replace));
    }

    #[tokio::test]
    async fn incomplete_info_is_rejected() {
        let (client, _rx) = Lavalink::test_client();
        let mut partial = info();
        partial.token.clear();

        assert!(matches!(
            client.create_session(&partial).await,
            Err(LavalinkError::IncompleteConnectionInfo)
        ));
    }

    #[tokio::test]
    async fn commands_fail_without_session() {
        let (client, _rx) = Lavalink::test_client();

        assert!(matches!(client.stop(G).await, Err(LavalinkError::NoSessionPresent)));
        assert!(matches!(client.skip(G).await, Err(LavalinkError::NoSessionPresent)));
        assert!(matches!(client.pause(G).await, Err(LavalinkError::NoSessionPresent)));
        assert!(matches!(client.seek_secs(G, 3).await, Err(LavalinkError::NoSessionPresent)));
        assert!(matches!(client.destroy(G).await, Err(LavalinkError::NoSessionPresent)));
    }

    #[tokio::test]
    async fn skip_walks_the_queue() {
        let (client, rx) = Lavalink::test_client();
        client.create_session(&info()).await.unwrap();

        assert!(client.skip(G).await.unwrap().is_none());
        assert!(client.get_guild_node(G).unwrap().now_playing.is_none());

        for handle in ["a", "b", "c"] {
            client.play(G, track(handle)).queue().await.unwrap();
        }
        commands(&rx);

        let skipped = client.skip(G).await.unwrap().unwrap();
        assert_eq!(skipped.track, track("a"));

        let node = client.get_guild_node(G).unwrap();
        assert_eq!(node.queue.len(), 2);
        assert_eq!(node.now_playing.unwrap().track, track("b"));
        assert!(matches!(&commands(&rx)[..], [OutgoingMessage::Play(p)] if p.track == "b"));
    }

    #[tokio::test]
    async fn queue_only_starts_when_idle() {
        let (client, rx) = Lavalink::test_client();
        client.create_session(&info()).await.unwrap();
        commands(&rx);

        client
            .play(G, track("a"))
            .requester(UserId(5))
            .queue()
            .await
            .unwrap();
        client.play(G, track("b")).queue().await.unwrap();

        let sent = commands(&rx);
        assert_eq!(sent.len(), 1);
        assert!(client.get_guild_node(G).unwrap().is_on_loops);
        assert_eq!(client.loops(), vec![G]);
        assert_eq!(
            client.get_guild_node(G).unwrap().queue[0].requester,
            Some(UserId(5))
        );
    }

    #[tokio::test]
    async fn no_replace_keeps_current_track() {
        let (client, rx) = Lavalink::test_client();
        client.create_session(&info()).await.unwrap();
        client.play(G, track("a")).start().await.unwrap();
        commands(&rx);

        client
            .play(G, track("b"))
            .replace(false)
            .start_time_secs(2)
            .start()
            .await
            .unwrap();

        assert_eq!(
            client.get_guild_node(G).unwrap().now_playing.unwrap().track,
            track("a")
        );
        assert!(matches!(
            &commands(&rx)[..],
            [OutgoingMessage::Play(p)] if p.no_replace && p.start_time == Some(2000)
        ));
    }

    #[tokio::test]
    async fn destroy_keeps_node_until_removed() {
        let (client, _rx) = Lavalink::test_client();
        client.create_session(&info()).await.unwrap();
        client.play(G, track("a")).queue().await.unwrap();

        client.destroy(G).await.unwrap();
        let node = client.get_guild_node(G).unwrap();
        assert_eq!(node.queue.len(), 1);
        assert_eq!(client.loops(), vec![G]);
        assert!(matches!(
            client.play(G, track("b")).start().await,
            Err(LavalinkError::NoSessionPresent)
        ));

        client.remove_guild_node(G);
        assert!(client.get_guild_node(G).is_none());
        client.remove_guild_node(G);
    }

    #[tokio::test]
    async fn player_settings_are_recorded() {
        let (client, rx) = Lavalink::test_client();
        client.create_session(&info()).await.unwrap();
        commands(&rx);

        client.pause(G).await.unwrap();
        assert!(client.get_guild_node(G).unwrap().is_paused);
        client.resume(G).await.unwrap();
        assert!(!client.get_guild_node(G).unwrap().is_paused);

        client.volume(G, 5000).await.unwrap();
        assert_eq!(client.get_guild_node(G).unwrap().volume, 1000);

        client.equalize_band(G, Band::new(3, 0.5)).await.unwrap();
        client.equalize_reset(G).await.unwrap();

        let sent = commands(&rx);
        assert_eq!(sent.len(), 5);
        assert!(matches!(&sent[2], OutgoingMessage::Volume(v) if v.volume == 1000));
        assert!(matches!(&sent[4], OutgoingMessage::Equalizer(e) if e.bands.len() == 15));
    }

    #[tokio::test]
    async fn join_without_shard_has_no_sender() {
        let (client, _rx) = Lavalink::test_client();

        assert!(matches!(
            client.join(G, ChannelId(2)).await,
            Err(LavalinkError::NoSender)
        ));
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn join_and_leave_through_shard() {
        let (client, _rx) = Lavalink::test_client();
        let (tx, gateway) = flume::unbounded::<VoiceStateRequest>();
        client.start_discord_gateway(Shard::generic(ChannelShard(tx)));

        // Stand in for Discord answering the bot's opcode 4.
        let responder = client.clone();
        tokio::spawn(async move {
            while let Ok(req) = gateway.recv_async().await {
                match req.channel_id {
                    Some(c) => {
                        responder.raw_handle_event_voice_state_update(req.guild_id, UserId(100), "s".into(), Some(c));
                        responder.raw_handle_event_voice_server_update(req.guild_id, "ep".into(), "t".into());
                    },
                    None => responder.raw_handle_event_voice_state_update(req.guild_id, UserId(100), "s".into(), None),
                }
            }
        });

        let info = client.join(G, ChannelId(2)).await.unwrap();
        assert_eq!(info.channel_id, Some(ChannelId(2)));
        assert_eq!(client.get_guild_gateway_connection_info(G), Some(info.clone()));

        client.create_session(&info).await.unwrap();
        client.leave(G).await.unwrap();

        assert!(client.get_guild_gateway_connection_info(G).is_none());
        assert!(client.get_guild_node(G).is_some());
        assert!(matches!(client.stop(G).await, Err(LavalinkError::NoSessionPresent)));
    }

    #[tokio::test]
    async fn failed_leave_still_forgets_connection_info() {
        let (client, _rx) = Lavalink::test_client();
        let (tx, gateway) = flume::unbounded::<VoiceStateRequest>();
        drop(gateway);
        client.start_discord_gateway(Shard::generic(ChannelShard(tx)));

        client.raw_handle_event_voice_state_update(G, UserId(100), "s".into(), Some(ChannelId(2)));
        client.raw_handle_event_voice_server_update(G, "ep".into(), "t".into());
        assert!(client.get_guild_gateway_connection_info(G).is_some());

        assert!(matches!(client.leave(G).await, Err(LavalinkError::NoSender)));
        assert!(client.get_guild_gateway_connection_info(G).is_none());
    }

    #[tokio::test]
    async fn close_stops_accepting_commands() {
        let (client, rx) = Lavalink::test_client();
        client.close().await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(NodeMessage::Close)));

        drop(rx);
        client.create_session(&info()).await.unwrap_err();
    }
}
