//! Merges release-catalog and ISRC-registry data into one [`SongMetadata`].
//!
//! Two independent lookups run for every identified song:
//!
//! 1. **Release search** (title + artist): year, duration of the first
//!    track, first label and all genres of the first master release found.
//! 2. **ISRC lookup** (only with an ISRC): the title of the first release of
//!    the first matching recording becomes the album.  When it succeeds it
//!    always wins over any album value set before it.
//!
//! Neither lookup can fail the resolution.  A failing step reports a
//! [`MetadataWarning`] and whatever it gathered before failing is kept.

use tracing::{info, warn};

use crate::discogs::ReleaseCatalog;
use crate::error::MetadataWarning;
use crate::musicbrainz::RecordingRegistry;
use crate::song::{duration_to_seconds, IdentifiedSong, ReleaseDetails, SongMetadata};

/// Data gathered by a step that did not finish.
#[derive(Debug)]
pub struct Partial<T> {
    pub value: T,
    pub warning: MetadataWarning,
}

/// Outcome of [`MetadataResolver::resolve`].
#[derive(Debug)]
pub struct Resolution {
    pub metadata: SongMetadata,
    /// Every non-fatal problem met on the way, in the order they happened.
    pub warnings: Vec<MetadataWarning>,
}

pub struct MetadataResolver {
    catalog: Box<dyn ReleaseCatalog>,
    registry: Box<dyn RecordingRegistry>,
}

impl MetadataResolver {
    pub fn new(catalog: Box<dyn ReleaseCatalog>, registry: Box<dyn RecordingRegistry>) -> Self {
        MetadataResolver { catalog, registry }
    }

    /// Look up everything known about a song.  Never fails; see [`Resolution::warnings`].
    pub fn resolve(&self, title: &str, artist: &str, isrc: &str) -> Resolution {
        let song = IdentifiedSong {
            title: title.to_string(),
            artist: artist.to_string(),
            isrc: isrc.to_string(),
        };
        let mut warnings = Vec::new();
        let mut metadata = SongMetadata::from_identified(&song);

        metadata = match self.release_details(title, artist) {
            Ok(details) => metadata.with_release(details),
            Err(Partial { value, warning }) => {
                let partial = metadata.with_release(value);
                match &warning {
                    MetadataWarning::NoRelease { .. } => warn!("{}", warning),
                    _ => warn!(
                        "Could not fetch all metadata, inspect what is missing: {:?}. Reason: {}",
                        partial, warning
                    ),
                }
                warnings.push(warning);
                partial
            }
        };

        if !isrc.is_empty() {
            match self.album(isrc) {
                Ok(album) => metadata = metadata.with_album(album),
                Err(warning) => {
                    warn!("Failed to fetch album of {} by {}. Reason: {}", title, artist, warning);
                    warnings.push(warning);
                }
            }
        }

        info!("Resolved metadata for {} by {}", title, artist);
        Resolution { metadata, warnings }
    }

    /// Release search step: first master release matching title and artist.
    pub fn release_details(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<ReleaseDetails, Partial<ReleaseDetails>> {
        let mut details = ReleaseDetails::default();

        let hits = match self.catalog.search_masters(title, artist) {
            Ok(hits) => hits,
            Err(e) => {
                return Err(Partial {
                    value: details,
                    warning: MetadataWarning::ReleaseLookup(e),
                })
            }
        };

        let Some(hit) = hits.into_iter().next() else {
            return Err(Partial {
                value: details,
                warning: MetadataWarning::NoRelease {
                    title: title.to_string(),
                    artist: artist.to_string(),
                },
            });
        };

        if let Some(label) = hit.labels.into_iter().next() {
            details.label = label;
        }

        let master = match self.catalog.master(hit.id) {
            Ok(master) => master,
            Err(e) => {
                return Err(Partial {
                    value: details,
                    warning: MetadataWarning::ReleaseLookup(e),
                })
            }
        };

        details.year = master.year;
        details.genre = master.genres.join(", ");

        if let Some(track) = master.tracklist.first() {
            match duration_to_seconds(&track.duration) {
                Ok(secs) => details.duration = secs,
                Err(e) => {
                    return Err(Partial {
                        value: details,
                        warning: e.into(),
                    })
                }
            }
        }

        Ok(details)
    }

    /// ISRC step: album title from the recording registry.
    pub fn album(&self, isrc: &str) -> Result<String, MetadataWarning> {
        self.registry
            .album_for_isrc(isrc)
            .map_err(|source| MetadataWarning::IsrcLookup {
                isrc: isrc.to_string(),
                source,
            })
    }
}
