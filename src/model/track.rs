use crate::{
    constants::{EQ_BAND_COUNT, EQ_MAX_GAIN, EQ_MIN_GAIN},
    id::UserId,
};
use serde::{Deserialize, Serialize};

/// Result of a load or search request against a node.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    /// How the node interpreted the identifier.
    ///
    /// One of `TRACK_LOADED`, `PLAYLIST_LOADED`, `SEARCH_RESULT`, `NO_MATCHES`
    /// or `LOAD_FAILED`.
    pub load_type: String,
    /// Present when the identifier resolved to a playlist.
    #[serde(default)]
    pub playlist_info: Option<PlaylistInfo>,
    /// Matching tracks, in the order the node ranked them.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Metadata describing a loaded playlist.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    /// Name of the playlist.
    pub name: Option<String>,
    /// Index of the track picked by the link, if any.
    ///
    /// Lavalink reports `-1` when nothing was selected; this is mapped to `None`.
    #[serde(default, deserialize_with = "selected_track")]
    pub selected_track: Option<u64>,
}

fn selected_track<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| u64::try_from(v).ok()))
}

/// A playable track, as resolved by a node.
///
/// The `track` blob is opaque: only the node that produced it can decode it.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Track {
    /// Base64 encoded track handle.
    pub track: String,
    /// Decoded track metadata, if the node supplied it.
    #[serde(default)]
    pub info: Option<Info>,
}

/// Human-facing metadata for a track.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Source-specific identifier (e.g., a YouTube video id).
    pub identifier: String,
    /// Whether the node can seek within this track.
    pub is_seekable: bool,
    /// Uploader or artist.
    pub author: String,
    /// Length in milliseconds.
    pub length: u64,
    /// Whether this is a livestream.
    pub is_stream: bool,
    /// Start position in milliseconds.
    pub position: u64,
    /// Title of the track.
    pub title: String,
    /// Link back to the source.
    #[serde(default)]
    pub uri: String,
}

/// A queued track, along with who asked for it and any playback bounds.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct TrackQueue {
    /// The track to play.
    pub track: Track,
    /// Offset in milliseconds to begin playback from.
    pub start_time: u64,
    /// Offset in milliseconds to end playback at, if set.
    pub end_time: Option<u64>,
    /// User who requested this track.
    pub requester: Option<UserId>,
}

/// A single equaliser band adjustment.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Band {
    /// Band index, from `0` to `14`.
    pub band: u8,
    /// Multiplier for the band, from `-0.25` (muted) to `1.0`.
    pub gain: f64,
}

impl Band {
    /// Creates a band adjustment, clamping both values into the ranges
    /// Lavalink accepts.
    #[must_use]
    pub fn new(band: u8, gain: f64) -> Self {
        Self {
            band: band.min(EQ_BAND_COUNT as u8 - 1),
            gain: gain.clamp(EQ_MIN_GAIN, EQ_MAX_GAIN),
        }
    }

    /// Builds a full set of bands from one gain per band.
    #[must_use]
    pub fn all(gains: [f64; EQ_BAND_COUNT]) -> Vec<Self> {
        gains
            .iter()
            .enumerate()
            .map(|(i, gain)| Self::new(i as u8, *gain))
            .collect()
    }

    /// Builds a full set of neutral bands.
    #[must_use]
    pub fn neutral() -> Vec<Self> {
        Self::all([0.0; EQ_BAND_COUNT])
    }
}
