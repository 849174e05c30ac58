//! Error and warning types shared by every pipeline stage.
//!
//! [`PipelineError`] ends the current identification cycle.  The warning
//! types ([`MetadataWarning`], [`LocalLogWarning`]) are logged and the cycle
//! carries on with whatever data it already has.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures that abort a cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio capture failed: {0}")]
    Capture(String),

    #[error("the recognition service could not identify the song")]
    NoMatch,

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("spin report failed: {0}")]
    Report(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of a single catalog or registry request.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("could not decode response: {0}")]
    Decode(#[from] io::Error),

    #[error("{0} requires an access token")]
    MissingCredentials(&'static str),

    #[error("no results for {0}")]
    Empty(String),
}

impl From<ureq::Error> for CatalogError {
    fn from(err: ureq::Error) -> Self {
        CatalogError::Http(Box::new(err))
    }
}

/// A track duration that is not in `MM:SS` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed duration {0:?}, expected MM:SS")]
pub struct DurationError(pub String);

/// Non-fatal gaps while enriching an identified song.
#[derive(Debug, Error)]
pub enum MetadataWarning {
    #[error("no release metadata found for {title} by {artist}")]
    NoRelease { title: String, artist: String },

    #[error("release lookup failed: {0}")]
    ReleaseLookup(#[source] CatalogError),

    #[error("could not read track duration: {0}")]
    MalformedDuration(#[from] DurationError),

    #[error("ISRC lookup for {isrc} failed: {source}")]
    IsrcLookup {
        isrc: String,
        #[source]
        source: CatalogError,
    },
}

/// The local metadata mirror could not be written.
#[derive(Debug, Error)]
pub enum LocalLogWarning {
    #[error("no local metadata file configured")]
    NoPath,

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
