use crate::{constants::*, id::UserId};
use derivative::Derivative;
use std::time::Duration;

/// Configuration for a [`Lavalink`] client and its node connection.
///
/// [`Lavalink`]: crate::Lavalink
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[non_exhaustive]
pub struct Config {
    /// Hostname or IP address of the node.
    ///
    /// Defaults to `127.0.0.1`.
    pub host: String,

    /// Port the node listens on, for both REST and websocket traffic.
    ///
    /// Defaults to `2333`.
    pub port: u16,

    /// Password configured in the node's `application.yml`.
    ///
    /// Defaults to `youshallnotpass`.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Whether to reach the node over `https`/`wss`.
    ///
    /// Defaults to `false`.
    pub is_ssl: bool,

    /// User ID of the bot account.
    ///
    /// Sent to the node on connect, and used to pick the bot's own voice
    /// state out of every `VOICE_STATE_UPDATE` in a guild.
    pub user_id: UserId,

    /// Number of gateway shards the bot runs.
    ///
    /// Defaults to `1`.
    pub shard_count: u64,

    /// Whether joins and leaves are sent through a [`Shard`] owned by this
    /// client.
    ///
    /// When `false`, the caller's own gateway client moves the bot between
    /// channels, and only feeds voice events back through the `raw_handle_*`
    /// methods.
    ///
    /// Defaults to `true`.
    ///
    /// [`Shard`]: crate::shards::Shard
    pub start_gateway: bool,

    /// Configures the amount of time to wait for Discord to reply with connection information
    /// if [`Lavalink::join`]/[`wait_for_full_connection_info_insert`] are used.
    ///
    /// This is a useful fallback in the event that:
    ///  * the underlying Discord client restarts and loses a join request, or
    ///  * a channel join fails because the bot is already believed to be there.
    ///
    /// Defaults to 5 seconds. If set to `None`, connections will never time out.
    ///
    /// [`Lavalink::join`]: crate::Lavalink::join
    /// [`wait_for_full_connection_info_insert`]: crate::Lavalink::wait_for_full_connection_info_insert
    pub gateway_timeout: Option<Duration>,

    /// Whether the bot joins voice channels deafened.
    ///
    /// Defaults to `true`, since the bot never listens.
    pub self_deaf: bool,

    /// Whether the bot joins voice channels muted.
    ///
    /// Defaults to `false`.
    pub self_mute: bool,

    /// Prefix prepended to free-text queries to run a search on the node.
    ///
    /// Defaults to `ytsearch:`.
    pub search_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: DEFAULT_PASSWORD.to_string(),
            is_ssl: false,
            user_id: UserId(0),
            shard_count: 1,
            start_gateway: true,
            gateway_timeout: Some(DEFAULT_GATEWAY_TIMEOUT),
            self_deaf: true,
            self_mute: false,
            search_prefix: DEFAULT_SEARCH_PREFIX.to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn is_ssl(mut self, is_ssl: bool) -> Self {
        self.is_ssl = is_ssl;
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = user_id.into();
        self
    }

    #[must_use]
    pub fn shard_count(mut self, shard_count: u64) -> Self {
        self.shard_count = shard_count;
        self
    }

    #[must_use]
    pub fn start_gateway(mut self, start_gateway: bool) -> Self {
        self.start_gateway = start_gateway;
        self
    }

    #[must_use]
    pub fn gateway_timeout(mut self, gateway_timeout: Option<Duration>) -> Self {
        self.gateway_timeout = gateway_timeout;
        self
    }

    #[must_use]
    pub fn self_deaf(mut self, self_deaf: bool) -> Self {
        self.self_deaf = self_deaf;
        self
    }

    #[must_use]
    pub fn self_mute(mut self, self_mute: bool) -> Self {
        self.self_mute = self_mute;
        self
    }

    #[must_use]
    pub fn search_prefix(mut self, search_prefix: impl Into<String>) -> Self {
        self.search_prefix = search_prefix.into();
        self
    }

    /// Address of the node's websocket endpoint.
    #[must_use]
    pub fn socket_uri(&self) -> String {
        let scheme = if self.is_ssl { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Base address of the node's REST API.
    #[must_use]
    pub fn rest_uri(&self) -> String {
        let scheme = if self.is_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_node() {
        let config = Config::default();

        assert_eq!(config.socket_uri(), "ws://127.0.0.1:2333");
        assert_eq!(config.rest_uri(), "http://127.0.0.1:2333");
        assert_eq!(config.gateway_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn ssl_switches_schemes() {
        let config = Config::default().host("lava.example.com").port(443).is_ssl(true);

        assert_eq!(config.socket_uri(), "wss://lava.example.com:443");
        assert_eq!(config.rest_uri(), "https://lava.example.com:443");
    }

    #[test]
    fn password_is_not_logged() {
        let config = Config::default().password("hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
