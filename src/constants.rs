//! Constants affecting client defaults and Lavalink API handling.

use std::time::Duration;

/// Name sent to Lavalink nodes in the `Client-Name` header.
pub const CLIENT_NAME: &str = concat!("lavasnek/", env!("CARGO_PKG_VERSION"));

/// Port Lavalink listens on out of the box.
pub const DEFAULT_PORT: u16 = 2333;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Password shipped in Lavalink's sample `application.yml`.
pub const DEFAULT_PASSWORD: &str = "youshallnotpass";

/// Default time to wait for Discord to deliver both halves of a voice handshake.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix handed to Lavalink's load endpoint to run a YouTube text search.
pub const DEFAULT_SEARCH_PREFIX: &str = "ytsearch:";

/// Volume a fresh player starts at.
pub const DEFAULT_VOLUME: u16 = 100;

/// Largest volume Lavalink accepts.
pub const MAX_VOLUME: u16 = 1000;

/// Number of equaliser bands exposed by Lavalink.
pub const EQ_BAND_COUNT: usize = 15;

/// Lowest accepted gain for an equaliser band (fully muted).
pub const EQ_MIN_GAIN: f64 = -0.25;

/// Highest accepted gain for an equaliser band.
pub const EQ_MAX_GAIN: f64 = 1.0;

/// Close code reported when a node socket drops without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;
