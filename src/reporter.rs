//! Reporting an identified song: a spin on the Spinitron playlist and a
//! one-line mirror file read by Radio Logik.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{LocalLogWarning, PipelineError, Result};
use crate::song::SongMetadata;

pub const DEFAULT_SPIN_URL: &str = "https://spinitron.com/api/spin/create-v1";

/// Query parameters of a spin, in the order Spinitron documents them.
///
/// `sd` duration, `aw` artist, `dn` album (disc name), `dr` release year,
/// `ln` label, `dl` genre, `sn` song name.
pub fn spin_query(metadata: &SongMetadata) -> [(&'static str, String); 7] {
    [
        ("sd", metadata.duration.to_string()),
        ("aw", metadata.artist.clone()),
        ("dn", metadata.album.clone()),
        ("dr", metadata.year.to_string()),
        ("ln", metadata.label.clone()),
        ("dl", metadata.genre.clone()),
        ("sn", metadata.title.clone()),
    ]
}

/// Remote play-log endpoint.
pub trait SpinReporter {
    fn report(&self, metadata: &SongMetadata) -> Result<()>;
}

pub struct SpinitronClient {
    agent: ureq::Agent,
    url: String,
    token: String,
}

impl SpinitronClient {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Self {
        SpinitronClient {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.to_string(),
            token: token.to_string(),
        }
    }
}

impl SpinReporter for SpinitronClient {
    fn report(&self, metadata: &SongMetadata) -> Result<()> {
        let mut req = self
            .agent
            .get(&self.url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json");
        for (key, value) in spin_query(metadata) {
            req = req.query(key, &value);
        }
        debug!("Spinitron GET {}", req.url());

        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let status = response.status_text().to_string();
                let body = response.into_string().unwrap_or_default();
                return Err(PipelineError::Report(format!("{} {}: {}", code, status, body.trim())));
            }
            Err(e) => return Err(PipelineError::Report(e.to_string())),
        };

        let body = response
            .into_string()
            .map_err(|e| PipelineError::Report(format!("could not read response: {}", e)))?;
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => info!("Spin created! Response from Spinitron: {}", json),
            Err(_) => info!("Spin created! Response from Spinitron (not JSON): {}", body.trim()),
        }
        Ok(())
    }
}

/// Single-line `"{artist} - {title}"` mirror of the current song.
#[derive(Debug, Clone)]
pub struct LocalLog {
    path: Option<PathBuf>,
}

impl LocalLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        LocalLog { path }
    }

    /// Overwrite the mirror file with the current song.
    pub fn write(&self, metadata: &SongMetadata) -> std::result::Result<&PathBuf, LocalLogWarning> {
        let path = self.path.as_ref().ok_or(LocalLogWarning::NoPath)?;
        fs::write(path, format!("{} - {}\n", metadata.artist, metadata.title)).map_err(|source| {
            LocalLogWarning::Write {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }

    /// Best-effort [`LocalLog::write`]: failures are logged, never returned.
    pub fn log_locally(&self, metadata: &SongMetadata) {
        match self.write(metadata) {
            Ok(path) => info!("Song metadata logged for Radio Logik at {}", path.display()),
            Err(e) => warn!("Failed to log song for Radio Logik. Reason: {}", e),
        }
    }
}
