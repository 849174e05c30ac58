//! Discogs API client for release metadata.
//!
//! Searching the Discogs database requires a personal access token
//! (`DISCOGS_ACCESS_TOKEN`).  A search returns lightweight hits; the master
//! release behind the first hit carries the year, genres and tracklist.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;

pub const DEFAULT_API_URL: &str = "https://api.discogs.com";

const USER_AGENT: &str = concat!("SongIdentifier/", env!("CARGO_PKG_VERSION"));

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One entry of a database search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Labels the release appeared on, most relevant first.
    #[serde(default, rename = "label")]
    pub labels: Vec<String>,
}

/// A master release: the catalog grouping above individual pressings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MasterRelease {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tracklist: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackEntry {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub title: String,
    /// Track length as printed on the release, usually `MM:SS`, often empty.
    #[serde(default)]
    pub duration: String,
}

// ── Catalog trait ────────────────────────────────────────────────────────────

/// A searchable release catalog.
pub trait ReleaseCatalog {
    /// First page of master releases matching a song title and artist.
    fn search_masters(&self, title: &str, artist: &str) -> Result<Vec<SearchHit>, CatalogError>;

    /// Full master release by ID.
    fn master(&self, id: u64) -> Result<MasterRelease, CatalogError>;
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct DiscogsClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl DiscogsClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        DiscogsClient {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Check if we have a token (search is refused without one).
    pub fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    /// Build a request with auth and user-agent headers.
    fn api_get(&self, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        debug!("Discogs GET {}", url);

        let req = self.agent.get(&url).set("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Discogs token={}", token)),
            None => req,
        }
    }
}

impl ReleaseCatalog for DiscogsClient {
    fn search_masters(&self, title: &str, artist: &str) -> Result<Vec<SearchHit>, CatalogError> {
        if !self.has_credentials() {
            return Err(CatalogError::MissingCredentials("Discogs search"));
        }

        let response: ApiSearchResponse = self
            .api_get("/database/search")
            .query("q", title)
            .query("artist", artist)
            .query("type", "master")
            .query("page", "1")
            .query("per_page", "50")
            .call()?
            .into_json()?;

        debug!("Discogs search returned {} results", response.results.len());
        Ok(response.results)
    }

    fn master(&self, id: u64) -> Result<MasterRelease, CatalogError> {
        let master = self
            .api_get(&format!("/masters/{}", id))
            .call()?
            .into_json()?;
        Ok(master)
    }
}
