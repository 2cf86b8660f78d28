//! Track loading over a node's REST API.

use crate::{
    error::LavalinkResult,
    model::{Info, Tracks},
};
use reqwest::{header::AUTHORIZATION, Client};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use tracing::{debug, instrument};
use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct RestClient {
    http: Client,
    base: String,
    password: String,
    search_prefix: String,
}

impl RestClient {
    pub(crate) fn new(base: String, password: String, search_prefix: String) -> Self {
        Self {
            http: Client::new(),
            base,
            password,
            search_prefix,
        }
    }

    /// Loads an identifier exactly as given.
    #[instrument(skip(self))]
    pub(crate) async fn load_tracks(&self, identifier: &str) -> LavalinkResult<Tracks> {
        self.get("loadtracks", &[("identifier", identifier)]).await
    }

    /// Runs a text search against the configured search backend.
    pub(crate) async fn search_tracks(&self, query: &str) -> LavalinkResult<Tracks> {
        self.load_tracks(&format!("{}{}", self.search_prefix, query))
            .await
    }

    /// Loads `query` directly if it is a link, or searches for it otherwise.
    pub(crate) async fn auto_search_tracks(&self, query: &str) -> LavalinkResult<Tracks> {
        self.load_tracks(&identifier_for(query, &self.search_prefix))
            .await
    }

    #[instrument(skip(self))]
    pub(crate) async fn decode_track(&self, track: &str) -> LavalinkResult<Info> {
        self.get("decodetrack", &[("track", track)]).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> LavalinkResult<T> {
        let body = self
            .http
            .get(format!("{}/{}", self.base, path))
            .header(AUTHORIZATION, &self.password)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        debug!("Node replied with {} bytes.", body.len());

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Chooses the identifier sent to `/loadtracks` for a user query.
///
/// Links (absolute URLs with a host) and identifiers already carrying the
/// search prefix are passed through untouched; anything else becomes a
/// prefixed search.
pub(crate) fn identifier_for<'a>(query: &'a str, search_prefix: &str) -> Cow<'a, str> {
    let query = query.trim();

    if is_link(query) || query.starts_with(search_prefix) {
        Cow::Borrowed(query)
    } else {
        Cow::Owned(format!("{}{}", search_prefix, query))
    }
}

fn is_link(query: &str) -> bool {
    Url::parse(query).map_or(false, |url| url.has_host())
}
