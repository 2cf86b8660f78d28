use crate::{
    error::LavalinkResult,
    events::LavalinkEventHandler,
    id::UserId,
    shards::Shard,
    tasks::NodeRunner,
    ws::{self, WsStream},
    Config,
    Lavalink,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, info_span};
use tracing_futures::Instrument;

/// Fluent construction of a [`Lavalink`] client.
///
/// ```rust,no_run
/// # async fn run() -> lavasnek::error::LavalinkResult<()> {
/// use lavasnek::{LavalinkBuilder, NoopHandler};
///
/// let lavalink = LavalinkBuilder::new(123_456_789_u64, "youshallnotpass")
///     .set_host("127.0.0.1")
///     .set_port(2333)
///     .set_start_gateway(false)
///     .build(NoopHandler)
///     .await?;
/// # let _ = lavalink;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct LavalinkBuilder {
    config: Config,
    shard: Option<Shard>,
}

impl LavalinkBuilder {
    /// Starts a builder for the given bot user and node password.
    pub fn new(user_id: impl Into<UserId>, password: impl Into<String>) -> Self {
        Self::from_config(Config::default().user_id(user_id).password(password))
    }

    pub fn from_config(config: Config) -> Self {
        Self { config, shard: None }
    }

    pub fn set_host(mut self, host: impl Into<String>) -> Self {
        self.config = self.config.host(host);
        self
    }

    pub fn set_port(mut self, port: u16) -> Self {
        self.config = self.config.port(port);
        self
    }

    /// Sets both host and port from a socket address.
    pub fn set_addr(mut self, addr: SocketAddr) -> Self {
        self.config = self.config.host(addr.ip().to_string()).port(addr.port());
        self
    }

    pub fn set_password(mut self, password: impl Into<String>) -> Self {
        self.config = self.config.password(password);
        self
    }

    pub fn set_user_id(mut self, user_id: impl Into<UserId>) -> Self {
        self.config = self.config.user_id(user_id);
        self
    }

    pub fn set_shard_count(mut self, shard_count: u64) -> Self {
        self.config = self.config.shard_count(shard_count);
        self
    }

    pub fn set_is_ssl(mut self, is_ssl: bool) -> Self {
        self.config = self.config.is_ssl(is_ssl);
        self
    }

    /// Whether joins and leaves go through the shard given to [`set_gateway`].
    ///
    /// When `false`, any such shard is ignored; one can still be attached
    /// later with [`Lavalink::start_discord_gateway`].
    ///
    /// [`set_gateway`]: LavalinkBuilder::set_gateway
    pub fn set_start_gateway(mut self, start_gateway: bool) -> Self {
        self.config = self.config.start_gateway(start_gateway);
        self
    }

    pub fn set_gateway_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.gateway_timeout(timeout);
        self
    }

    pub fn set_self_deaf(mut self, self_deaf: bool) -> Self {
        self.config = self.config.self_deaf(self_deaf);
        self
    }

    pub fn set_search_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config = self.config.search_prefix(prefix);
        self
    }

    /// Gateway shard used to send voice state updates.
    pub fn set_gateway(mut self, shard: Shard) -> Self {
        self.shard = Some(shard);
        self
    }

    /// Connects to the node and starts delivering its events to `handler`.
    ///
    /// # Errors
    ///
    /// Fails if the websocket handshake with the node fails, e.g. due to a
    /// wrong password or an unreachable host.
    pub async fn build<H>(self, handler: H) -> LavalinkResult<Lavalink>
    where
        H: LavalinkEventHandler + 'static,
    {
        let config = self.config;
        let uri = config.socket_uri();

        let request = ws::handshake_request(
            &uri,
            &config.password,
            config.user_id.get(),
            config.shard_count,
        )?;
        let stream = WsStream::connect(request).await?;
        info!("Connected to node at {}.", uri);

        let shard = if config.start_gateway { self.shard } else { None };

        let (tx, rx) = flume::unbounded();
        let client = Lavalink::new_raw(config, tx, shard);

        let runner = NodeRunner::new(rx, stream, Arc::new(handler), Arc::downgrade(&client.inner));
        tokio::spawn(runner.run().instrument(info_span!("node", %uri)));

        Ok(client)
    }
}
