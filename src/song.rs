//! Identification results and the merged metadata record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DurationError;

/// A song matched by the recognition service.
///
/// Only constructed for an actual match; "nothing found" is reported as
/// [`crate::PipelineError::NoMatch`] instead of an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedSong {
    pub title: String,
    pub artist: String,
    /// International Standard Recording Code, empty when the service has none.
    #[serde(default)]
    pub isrc: String,
}

/// Fields contributed by the release catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDetails {
    pub year: u32,
    pub duration: u32,
    pub label: String,
    pub genre: String,
}

/// Metadata reported for one identified song.
///
/// Every field falls back to its zero value, so formatting and reporting
/// never have to deal with missing data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds.
    pub duration: u32,
    pub year: u32,
    pub label: String,
    pub genre: String,
    pub isrc: String,
}

impl SongMetadata {
    /// Start from the recognition result with every enrichment field at its default.
    pub fn from_identified(song: &IdentifiedSong) -> Self {
        SongMetadata {
            title: song.title.clone(),
            artist: song.artist.clone(),
            isrc: song.isrc.clone(),
            ..Default::default()
        }
    }

    pub fn with_release(self, details: ReleaseDetails) -> Self {
        SongMetadata {
            year: details.year,
            duration: details.duration,
            label: details.label,
            genre: details.genre,
            ..self
        }
    }

    pub fn with_album(self, album: impl Into<String>) -> Self {
        SongMetadata {
            album: album.into(),
            ..self
        }
    }
}

impl fmt::Display for SongMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Title:    {}", self.title)?;
        writeln!(f, "  Artist:   {}", self.artist)?;
        writeln!(f, "  Album:    {}", self.album)?;
        writeln!(f, "  Duration: {}s", self.duration)?;
        writeln!(f, "  Year:     {}", self.year)?;
        writeln!(f, "  Label:    {}", self.label)?;
        writeln!(f, "  Genre:    {}", self.genre)?;
        write!(f, "  ISRC:     {}", self.isrc)
    }
}

/// Convert a catalog track length like `"3:45"` into seconds.
pub fn duration_to_seconds(s: &str) -> Result<u32, DurationError> {
    let malformed = || DurationError(s.to_string());

    let (mins, secs) = s.trim().split_once(':').ok_or_else(malformed)?;
    let mins: u32 = mins.parse().map_err(|_| malformed())?;
    let secs: u32 = secs.parse().map_err(|_| malformed())?;

    mins.checked_mul(60)
        .and_then(|m| m.checked_add(secs))
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(duration_to_seconds("3:45"), Ok(225));
        assert_eq!(duration_to_seconds("0:07"), Ok(7));
        assert_eq!(duration_to_seconds("12:00"), Ok(720));
        assert_eq!(duration_to_seconds(" 4:05 "), Ok(245));
    }

    #[test]
    fn test_duration_at_u32_limit() {
        assert_eq!(duration_to_seconds("71582788:15"), Ok(u32::MAX));
        assert_eq!(
            duration_to_seconds("71582788:16"),
            Err(DurationError("71582788:16".to_string()))
        );
    }

    #[test]
    fn test_duration_rejects_malformed() {
        for bad in ["", "345", "3:", ":45", "a:45", "3:4x", "1:02:30", "-1:30", "71582789:00"] {
            assert_eq!(
                duration_to_seconds(bad),
                Err(DurationError(bad.to_string())),
                "input {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_from_identified_defaults_enrichment() {
        let song = IdentifiedSong {
            title: "Test Song".to_string(),
            artist: "Test Artist".to_string(),
            isrc: "US1234567890".to_string(),
        };
        let m = SongMetadata::from_identified(&song);
        assert_eq!(m.title, "Test Song");
        assert_eq!(m.artist, "Test Artist");
        assert_eq!(m.isrc, "US1234567890");
        assert_eq!(m.album, "");
        assert_eq!(m.duration, 0);
        assert_eq!(m.year, 0);
        assert_eq!(m.label, "");
        assert_eq!(m.genre, "");
    }

    #[test]
    fn test_builders_only_touch_their_fields() {
        let song = IdentifiedSong {
            title: "T".to_string(),
            artist: "A".to_string(),
            isrc: String::new(),
        };
        let m = SongMetadata::from_identified(&song)
            .with_album("Album")
            .with_release(ReleaseDetails {
                year: 1999,
                duration: 200,
                label: "L".to_string(),
                genre: "Jazz".to_string(),
            });
        assert_eq!(m.album, "Album");
        assert_eq!(m.year, 1999);
        assert_eq!(m.title, "T");
    }
}
