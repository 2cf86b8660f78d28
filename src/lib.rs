#![deny(rustdoc::broken_intra_doc_links)]
//! Lavasnek is an async client for [Lavalink] audio nodes, written in Rust.
//!
//! The library offers:
//!  * Per-guild queues and player state, kept in step with the commands sent
//!  to the node.
//!  * Assembly of Discord's two-part voice handshake into a [`ConnectionInfo`],
//!  from events relayed by any gateway library or through an attached
//!  [`Shard`](shards::Shard).
//!  * Track loading and search over the node's REST API.
//!  * In-order delivery of node events to a [`LavalinkEventHandler`].
//!
//! ## Intents
//! Voice handshakes require the `GUILD_VOICE_STATES` intent on the bot's
//! gateway connection.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lavasnek::{id::ChannelId, model::TrackStart, Lavalink, LavalinkBuilder, LavalinkEventHandler};
//!
//! struct Handler;
//!
//! #[async_trait::async_trait]
//! impl LavalinkEventHandler for Handler {
//!     async fn track_start(&self, _client: Lavalink, event: TrackStart) {
//!         println!("Started track in {}", event.guild_id);
//!     }
//! }
//!
//! # async fn run() -> lavasnek::error::LavalinkResult<()> {
//! let lavalink = LavalinkBuilder::new(123_u64, "youshallnotpass")
//!     .set_start_gateway(false)
//!     .build(Handler)
//!     .await?;
//!
//! // Relay these from your gateway library as they arrive.
//! lavalink.raw_handle_event_voice_state_update(1_u64, 123_u64, "session".into(), Some(ChannelId(2)));
//! lavalink.raw_handle_event_voice_server_update(1_u64, "endpoint".into(), "token".into());
//!
//! if let Some(info) = lavalink.get_guild_gateway_connection_info(1_u64) {
//!     lavalink.create_session(&info).await?;
//!
//!     let found = lavalink.auto_search_tracks("never gonna give you up").await?;
//!     if let Some(track) = found.tracks.into_iter().next() {
//!         lavalink.play(1_u64, track).queue().await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [Lavalink]: https://github.com/freyacodes/Lavalink

#![warn(clippy::pedantic)]
#![allow(
    // Allowed as they are too pedantic
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::too_many_lines,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
)]

mod builder;
mod client;
mod config;
pub mod constants;
pub mod error;
mod events;
mod gateway;
pub mod id;
pub(crate) mod info;
pub mod join;
pub mod model;
mod nodes;
mod player;
mod rest;
pub mod shards;
mod tasks;
mod ws;

pub use crate::{
    builder::LavalinkBuilder,
    client::Lavalink,
    config::Config,
    events::{LavalinkEventHandler, NoopHandler},
    info::ConnectionInfo,
    nodes::Node,
    player::PlayBuilder,
};
