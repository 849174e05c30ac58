pub mod capture;
pub mod cli;
pub mod config;
pub mod discogs;
pub mod error;
pub mod logging;
pub mod musicbrainz;
pub mod operator;
pub mod pipeline;
pub mod recognizer;
pub mod reporter;
pub mod resolver;
pub mod song;
pub mod wavfile;

pub use capture::{AudioCapture, CaptureSpec, CpalCapture, InputDevice};
pub use config::{Config, Settings};
pub use error::{CatalogError, LocalLogWarning, MetadataWarning, PipelineError};
pub use operator::{OperatorPrompt, StdinPrompt};
pub use pipeline::{Pipeline, PipelineOptions, Stage};
pub use recognizer::{Recognizer, SongrecRecognizer};
pub use reporter::{LocalLog, SpinReporter, SpinitronClient};
pub use resolver::{MetadataResolver, Resolution};
pub use song::{duration_to_seconds, IdentifiedSong, ReleaseDetails, SongMetadata};
