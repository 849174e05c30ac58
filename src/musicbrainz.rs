//! MusicBrainz ISRC lookup - finds the release a specific recording appeared on.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;

pub const DEFAULT_API_URL: &str = "https://musicbrainz.org/ws/2";

const USER_AGENT: &str = concat!("SongIdentifier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct IsrcResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

/// A recording registered under an ISRC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A registry of recordings indexed by ISRC.
pub trait RecordingRegistry {
    /// All recordings registered under `isrc`, with their releases.
    fn recordings_by_isrc(&self, isrc: &str) -> Result<Vec<Recording>, CatalogError>;

    /// Title of the first release of the first recording.
    fn album_for_isrc(&self, isrc: &str) -> Result<String, CatalogError> {
        self.recordings_by_isrc(isrc)?
            .into_iter()
            .next()
            .and_then(|rec| rec.releases.into_iter().next())
            .map(|rel| rel.title)
            .ok_or_else(|| CatalogError::Empty(format!("ISRC {}", isrc)))
    }
}

pub struct MusicBrainzClient {
    agent: ureq::Agent,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        MusicBrainzClient {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RecordingRegistry for MusicBrainzClient {
    fn recordings_by_isrc(&self, isrc: &str) -> Result<Vec<Recording>, CatalogError> {
        let url = format!("{}/isrc/{}", self.base_url, isrc);
        debug!("MusicBrainz GET {}", url);

        let response: IsrcResponse = self
            .agent
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .query("inc", "releases")
            .query("fmt", "json")
            .call()?
            .into_json()?;

        Ok(response.recordings)
    }
}
