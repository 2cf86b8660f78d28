//! Per-guild assembly of voice connection info from Discord gateway events.

use crate::{
    id::{ChannelId, GuildId, UserId},
    info::{ConnectionInfo, ConnectionProgress, Half},
};
use dashmap::DashMap;
use flume::{Receiver, Sender};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, trace};

/// Tracks the bot's own voice handshake in every guild, and wakes anyone
/// waiting on a guild's connection info to appear or disappear.
///
/// Each guild is locked independently: updates and waiters in one guild
/// never contend with or wake those of another.
#[derive(Debug)]
pub(crate) struct GatewayResolver {
    user_id: UserId,
    guilds: DashMap<GuildId, GuildGateway>,
    next_waiter: AtomicU64,
}

#[derive(Debug, Default)]
struct GuildGateway {
    progress: Option<ConnectionProgress>,
    inserts: Vec<InsertWaiter>,
    removes: Vec<RemoveWaiter>,
}

#[derive(Debug)]
struct InsertWaiter {
    id: u64,
    seen_server: bool,
    seen_state: bool,
    tx: Sender<ConnectionInfo>,
}

#[derive(Debug)]
struct RemoveWaiter {
    id: u64,
    tx: Sender<()>,
}

impl GuildGateway {
    fn is_idle(&self) -> bool {
        self.progress.is_none() && self.inserts.is_empty() && self.removes.is_empty()
    }

    fn notify_inserts(&mut self, half: Half, info: Option<ConnectionInfo>) {
        self.inserts.retain_mut(|waiter| {
            match half {
                Half::Server => waiter.seen_server = true,
                Half::State => waiter.seen_state = true,
            }

            match &info {
                Some(info) if waiter.seen_server && waiter.seen_state => {
                    let _ = waiter.tx.send(info.clone());
                    false
                },
                _ => !waiter.tx.is_disconnected(),
            }
        });
    }

    fn notify_removes(&mut self) {
        for waiter in self.removes.drain(..) {
            let _ = waiter.tx.send(());
        }
    }
}

impl GatewayResolver {
    pub(crate) fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            guilds: DashMap::new(),
            next_waiter: AtomicU64::new(0),
        }
    }

    /// Complete connection info for a guild, if both halves are present.
    pub(crate) fn info(&self, guild_id: GuildId) -> Option<ConnectionInfo> {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.progress.as_ref().and_then(ConnectionProgress::info))
    }

    /// Voice channel the bot is known to be in, even mid-handshake.
    pub(crate) fn channel_id(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.progress.as_ref().and_then(ConnectionProgress::channel_id))
    }

    pub(crate) fn handle_server_update(&self, guild_id: GuildId, endpoint: String, token: String) {
        let mut guild = self.guilds.entry(guild_id).or_default();

        let progress = guild
            .progress
            .get_or_insert_with(|| ConnectionProgress::new(guild_id));
        let info = if progress.apply_server_update(endpoint, token) {
            progress.info()
        } else {
            None
        };

        debug!("Voice server update for {}: complete={}.", guild_id, info.is_some());
        guild.notify_inserts(Half::Server, info);
    }

    pub(crate) fn handle_state_update(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        session_id: String,
        channel_id: Option<ChannelId>,
    ) {
        if user_id != self.user_id {
            trace!("Ignoring voice state of user {} in {}.", user_id, guild_id);
            return;
        }

        let channel_id = match channel_id {
            Some(c) => c,
            None => {
                debug!("Bot left voice in {}.", guild_id);
                self.remove(guild_id);
                return;
            },
        };

        let mut guild = self.guilds.entry(guild_id).or_default();

        let progress = guild
            .progress
            .get_or_insert_with(|| ConnectionProgress::new(guild_id));
        let info = if progress.apply_state_update(session_id, channel_id) {
            progress.info()
        } else {
            None
        };

        debug!("Voice state update for {}: complete={}.", guild_id, info.is_some());
        guild.notify_inserts(Half::State, info);
    }

    /// Forgets a guild's connection info and wakes any removal waiters.
    ///
    /// Pending insert waiters stay registered.
    pub(crate) fn remove(&self, guild_id: GuildId) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.progress = None;
            guild.notify_removes();
        }

        self.guilds.remove_if(&guild_id, |_, g| g.is_idle());
    }

    pub(crate) fn register_insert(
        self: &Arc<Self>,
        guild_id: GuildId,
    ) -> (Registration, Receiver<ConnectionInfo>) {
        let (tx, rx) = flume::bounded(1);
        let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);

        self.guilds
            .entry(guild_id)
            .or_default()
            .inserts
            .push(InsertWaiter {
                id,
                seen_server: false,
                seen_state: false,
                tx,
            });

        (self.registration(guild_id, id), rx)
    }

    pub(crate) fn register_remove(self: &Arc<Self>, guild_id: GuildId) -> (Registration, Receiver<()>) {
        let (tx, rx) = flume::bounded(1);
        let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);

        self.guilds
            .entry(guild_id)
            .or_default()
            .removes
            .push(RemoveWaiter { id, tx });

        (self.registration(guild_id, id), rx)
    }

    fn registration(self: &Arc<Self>, guild_id: GuildId, id: u64) -> Registration {
        Registration {
            resolver: self.clone(),
            guild_id,
            id,
        }
    }

    fn unregister(&self, guild_id: GuildId, id: u64) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.inserts.retain(|w| w.id != id);
            guild.removes.retain(|w| w.id != id);
        }

        self.guilds.remove_if(&guild_id, |_, g| g.is_idle());
    }

    #[cfg(test)]
    fn waiter_count(&self, guild_id: GuildId) -> usize {
        self.guilds
            .get(&guild_id)
            .map_or(0, |g| g.inserts.len() + g.removes.len())
    }
}

/// Keeps a waiter registered with its guild for as long as it lives.
#[derive(Debug)]
pub(crate) struct Registration {
    resolver: Arc<GatewayResolver>,
    guild_id: GuildId,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.resolver.unregister(self.guild_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LavalinkError,
        join::{ConnectionInfoInsert, ConnectionInfoRemove},
    };
    use std::time::Duration;

    const BOT: UserId = UserId(100);
    const G: GuildId = GuildId(1);

    fn resolver() -> Arc<GatewayResolver> {
        Arc::new(GatewayResolver::new(BOT))
    }

    fn wait_insert(r: &Arc<GatewayResolver>, timeout: Option<Duration>) -> ConnectionInfoInsert {
        let (reg, rx) = r.register_insert(G);
        ConnectionInfoInsert::new(reg, rx.into_recv_async(), timeout)
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn waiter_completes_in_either_order() {
        for server_first in [true, false] {
            let r = resolver();
            let wait = wait_insert(&r, Some(Duration::from_secs(5)));

            if server_first {
                r.handle_server_update(G, "ep".into(), "tok".into());
                r.handle_state_update(G, BOT, "sess".into(), Some(ChannelId(2)));
            } else {
                r.handle_state_update(G, BOT, "sess".into(), Some(ChannelId(2)));
                r.handle_server_update(G, "ep".into(), "tok".into());
            }

            let info = wait.await.unwrap();
            assert_eq!(info.endpoint, "ep");
            assert_eq!(info.token, "tok");
            assert_eq!(info.session_id, "sess");
            assert_eq!(info.channel_id, Some(ChannelId(2)));
            assert_eq!(r.waiter_count(G), 0);
        }
    }

    #[tokio::test]
    async fn zero_timeout_without_events_times_out() {
        let r = resolver();
        let res = wait_insert(&r, Some(Duration::ZERO)).await;

        assert!(matches!(res, Err(LavalinkError::TimedOut)));
        assert_eq!(r.waiter_count(G), 0);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn old_halves_do_not_satisfy_new_waiters() {
        let r = resolver();
        r.handle_server_update(G, "ep".into(), "tok".into());
        r.handle_state_update(G, BOT, "sess".into(), Some(ChannelId(2)));
        assert!(r.info(G).is_some());

        let wait = wait_insert(&r, Some(Duration::from_millis(50)));
        r.handle_state_update(G, BOT, "sess2".into(), Some(ChannelId(2)));

        assert!(matches!(wait.await, Err(LavalinkError::TimedOut)));
        assert_eq!(r.info(G).unwrap().session_id, "sess2");
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn other_users_are_ignored() {
        let r = resolver();
        let wait = wait_insert(&r, Some(Duration::from_millis(50)));

        r.handle_server_update(G, "ep".into(), "tok".into());
        r.handle_state_update(G, UserId(7), "theirs".into(), Some(ChannelId(2)));

        assert!(matches!(wait.await, Err(LavalinkError::TimedOut)));
        assert!(r.info(G).is_none());
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn guilds_do_not_wake_each_other() {
        let r = resolver();
        let wait = wait_insert(&r, Some(Duration::from_millis(50)));

        let other = GuildId(2);
        r.handle_server_update(other, "ep".into(), "tok".into());
        r.handle_state_update(other, BOT, "sess".into(), Some(ChannelId(2)));

        assert!(matches!(wait.await, Err(LavalinkError::TimedOut)));
        assert!(r.info(other).is_some());
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn null_channel_removes_info() {
        let r = resolver();
        r.handle_server_update(G, "ep".into(), "tok".into());
        r.handle_state_update(G, BOT, "sess".into(), Some(ChannelId(2)));

        let (reg, rx) = r.register_remove(G);
        let wait = ConnectionInfoRemove::new(reg, rx.into_recv_async(), Some(Duration::from_secs(5)));

        r.handle_state_update(G, BOT, "sess".into(), None);

        wait.await.unwrap();
        assert!(r.info(G).is_none());
        assert!(r.guilds.get(&G).is_none());
    }

    #[test]
    fn dropping_a_waiter_unregisters_it() {
        let r = resolver();
        let (reg, _rx) = r.register_insert(G);
        assert_eq!(r.waiter_count(G), 1);

        drop(reg);
        assert_eq!(r.waiter_count(G), 0);
        assert!(r.guilds.get(&G).is_none());
    }
}
