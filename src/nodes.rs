//! Per-guild player state kept alongside a node connection.

use crate::{constants::DEFAULT_VOLUME, id::GuildId, model::TrackQueue};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local view of one guild's player: its queue, what is playing, and any
/// caller-owned key/value data.
///
/// Nodes are created lazily by the first command for a guild, and are never
/// removed implicitly: [`Lavalink::destroy`] and [`Lavalink::leave`] leave
/// them in place until [`Lavalink::remove_guild_node`] is called.
///
/// [`Lavalink::destroy`]: crate::Lavalink::destroy
/// [`Lavalink::leave`]: crate::Lavalink::leave
/// [`Lavalink::remove_guild_node`]: crate::Lavalink::remove_guild_node
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Node {
    /// Guild this player belongs to.
    pub guild_id: GuildId,
    /// Upcoming tracks. While playing, the head is the current track.
    pub queue: Vec<TrackQueue>,
    /// The track the node was last told to play.
    pub now_playing: Option<TrackQueue>,
    pub is_paused: bool,
    /// Last volume sent to the node, from `0` to `1000`.
    pub volume: u16,
    /// Whether finished tracks automatically hand over to the next queue entry.
    pub is_on_loops: bool,
    /// Arbitrary data owned by the caller.
    pub data: HashMap<String, String>,
}

impl Node {
    /// Creates an idle player with an empty queue.
    #[must_use]
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            queue: Vec::new(),
            now_playing: None,
            is_paused: false,
            volume: DEFAULT_VOLUME,
            is_on_loops: false,
            data: HashMap::new(),
        }
    }
}

/// Concurrent store of every guild's [`Node`], plus the set of guilds whose
/// queues advance on their own.
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
    nodes: DashMap<GuildId, Node>,
    loops: DashSet<GuildId>,
    /// Guilds whose node player has no track loaded, even if `now_playing`
    /// still names one.
    silent: DashSet<GuildId>,
}

impl NodeStore {
    pub(crate) fn get(&self, guild_id: GuildId) -> Option<Node> {
        self.nodes.get(&guild_id).map(|n| n.clone())
    }

    pub(crate) fn set(&self, guild_id: GuildId, mut node: Node) {
        node.guild_id = guild_id;
        node.is_on_loops = self.loops.contains(&guild_id);
        self.nodes.insert(guild_id, node);
    }

    pub(crate) fn remove(&self, guild_id: GuildId) -> Option<Node> {
        self.silent.remove(&guild_id);
        self.nodes.remove(&guild_id).map(|(_, n)| n)
    }

    /// Records that the node was sent a track to play.
    pub(crate) fn mark_playing(&self, guild_id: GuildId) {
        self.silent.remove(&guild_id);
    }

    /// Records that the node player stopped or was torn down.
    pub(crate) fn mark_silent(&self, guild_id: GuildId) {
        self.silent.insert(guild_id);
    }

    /// Records that `finished` ended on the node, unless the guild has since
    /// moved on to another track.
    pub(crate) fn settle(&self, guild_id: GuildId, finished: &str) {
        let current = self
            .nodes
            .get(&guild_id)
            .and_then(|n| n.now_playing.as_ref().map(|np| np.track.track == finished));

        if current != Some(false) {
            self.mark_silent(guild_id);
        }
    }

    /// Whether the node player is believed to hold a track, so that a
    /// `noReplace` play would be ignored.
    pub(crate) fn is_busy(&self, guild_id: GuildId) -> bool {
        !self.silent.contains(&guild_id)
            && self
                .nodes
                .get(&guild_id)
                .map_or(false, |n| n.now_playing.is_some())
    }

    /// Runs `f` against a guild's node, creating it first if needed.
    pub(crate) fn with_node<R>(&self, guild_id: GuildId, f: impl FnOnce(&mut Node) -> R) -> R {
        let mut node = self
            .nodes
            .entry(guild_id)
            .or_insert_with(|| Node::new(guild_id));

        f(&mut node)
    }

    pub(crate) fn set_data(&self, guild_id: GuildId, data: HashMap<String, String>) {
        self.with_node(guild_id, |node| node.data.extend(data));
    }

    pub(crate) fn get_data(&self, guild_id: GuildId) -> Option<HashMap<String, String>> {
        self.nodes.get(&guild_id).map(|n| n.data.clone())
    }

    pub(crate) fn add_to_loops(&self, guild_id: GuildId) {
        self.loops.insert(guild_id);
        self.with_node(guild_id, |node| node.is_on_loops = true);
    }

    pub(crate) fn remove_from_loops(&self, guild_id: GuildId) {
        self.loops.remove(&guild_id);

        if let Some(mut node) = self.nodes.get_mut(&guild_id) {
            node.is_on_loops = false;
        }
    }

    pub(crate) fn loops(&self) -> Vec<GuildId> {
        self.loops.iter().map(|g| *g).collect()
    }

    /// Drops the head of the queue, returning it and the entry which is now
    /// playing in its place.
    ///
    /// An empty queue leaves `now_playing` empty.
    pub(crate) fn skip(&self, guild_id: GuildId) -> (Option<TrackQueue>, Option<TrackQueue>) {
        let mut node = match self.nodes.get_mut(&guild_id) {
            Some(n) => n,
            None => return (None, None),
        };

        if node.queue.is_empty() {
            node.now_playing = None;
            return (None, None);
        }

        let skipped = node.queue.remove(0);
        node.now_playing = node.queue.first().cloned();

        (Some(skipped), node.now_playing.clone())
    }

    /// Moves a looping guild's queue past a track which just ended.
    ///
    /// Does nothing unless `finished` is the current head, so that tracks
    /// played outside the queue never consume it. Guilds off the loop drop
    /// the finished head and go idle without starting the next entry.
    pub(crate) fn advance(&self, guild_id: GuildId, finished: &str) -> Advance {
        let looping = self.loops.contains(&guild_id);

        let mut node = match self.nodes.get_mut(&guild_id) {
            Some(n) => n,
            None => return Advance::NotLooping,
        };

        if !looping {
            if node.queue.first().map_or(false, |head| head.track.track == finished) {
                node.queue.remove(0);
            }

            if node
                .now_playing
                .as_ref()
                .map_or(false, |np| np.track.track == finished)
            {
                node.now_playing = None;
            }

            return Advance::NotLooping;
        }

        match node.queue.first() {
            Some(head) if head.track.track == finished => {},
            _ => return Advance::NotHead,
        }

        node.queue.remove(0);
        node.now_playing = node.queue.first().cloned();

        match &node.now_playing {
            Some(next) => Advance::Next(next.clone()),
            None => Advance::Exhausted,
        }
    }
}

/// Outcome of [`NodeStore::advance`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Advance {
    NotLooping,
    NotHead,
    Exhausted,
    Next(TrackQueue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;

    const G: GuildId = GuildId(1);

    fn entry(handle: &str) -> TrackQueue {
        TrackQueue {
            track: Track {
                track: handle.into(),
                info: None,
            },
            ..Default::default()
        }
    }

    fn store_with_queue(handles: &[&str]) -> NodeStore {
        let store = NodeStore::default();
        store.with_node(G, |node| {
            node.queue = handles.iter().map(|h| entry(h)).collect();
            node.now_playing = node.queue.first().cloned();
        });
        store
    }

    #[test]
    fn skip_on_empty_queue_returns_nothing() {
        let store = NodeStore::default();
        store.with_node(G, |_| {});

        assert_eq!(store.skip(G), (None, None));
        assert!(store.get(G).unwrap().now_playing.is_none());
    }

    #[test]
    fn skip_pops_head_and_promotes_next() {
        let store = store_with_queue(&["a", "b", "c"]);

        let (skipped, next) = store.skip(G);
        assert_eq!(skipped, Some(entry("a")));
        assert_eq!(next, Some(entry("b")));

        let node = store.get(G).unwrap();
        assert_eq!(node.queue.len(), 2);
        assert_eq!(node.now_playing, Some(entry("b")));
    }

    #[test]
    fn skip_of_last_entry_leaves_nothing_playing() {
        let store = store_with_queue(&["a"]);

        assert_eq!(store.skip(G), (Some(entry("a")), None));
        assert!(store.get(G).unwrap().now_playing.is_none());
    }

    #[test]
    fn data_merges_and_overwrites() {
        let store = NodeStore::default();
        store.set_data(G, HashMap::from([("a".into(), "1".into()), ("b".into(), "2".into())]));
        store.set_data(G, HashMap::from([("b".into(), "3".into())]));

        let data = store.get_data(G).unwrap();
        assert_eq!(data["a"], "1");
        assert_eq!(data["b"], "3");
    }

    #[test]
    fn removing_absent_node_is_fine() {
        let store = NodeStore::default();
        assert!(store.remove(G).is_none());
        assert!(store.get(G).is_none());
    }

    #[test]
    fn loops_are_independent_of_nodes() {
        let store = NodeStore::default();
        store.add_to_loops(G);
        assert!(store.get(G).unwrap().is_on_loops);

        store.remove(G);
        assert_eq!(store.loops(), vec![G]);

        store.remove_from_loops(G);
        assert!(store.loops().is_empty());
    }

    #[test]
    fn off_loop_finish_drops_the_head_and_idles() {
        let store = store_with_queue(&["a", "b"]);
        assert_eq!(store.advance(G, "a"), Advance::NotLooping);

        let node = store.get(G).unwrap();
        assert!(node.now_playing.is_none());
        assert_eq!(node.queue, vec![entry("b")]);

        assert_eq!(store.advance(G, "zzz"), Advance::NotLooping);
        assert_eq!(store.get(G).unwrap().queue, vec![entry("b")]);
    }

    #[test]
    fn advance_only_moves_past_the_head() {
        let store = store_with_queue(&["a", "b"]);
        store.add_to_loops(G);

        assert_eq!(store.advance(G, "zzz"), Advance::NotHead);
        assert_eq!(store.advance(G, "a"), Advance::Next(entry("b")));
        assert_eq!(store.advance(G, "b"), Advance::Exhausted);

        let node = store.get(G).unwrap();
        assert!(node.queue.is_empty());
        assert!(node.now_playing.is_none());
    }

    #[test]
    fn stopped_player_is_not_busy() {
        let store = store_with_queue(&["a"]);
        assert!(store.is_busy(G));

        store.mark_silent(G);
        assert!(!store.is_busy(G));

        store.mark_playing(G);
        assert!(store.is_busy(G));

        store.settle(G, "other");
        assert!(store.is_busy(G));
        store.settle(G, "a");
        assert!(!store.is_busy(G));
    }
}
