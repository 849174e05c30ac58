//! Command line of the `song_identifier` binary.
//!
//! Every setting can also come from the environment variable of the same
//! name used by existing deployments (`SAMPLE_RATE`, `SPINITRON_ACCESS_TOKEN`, …).
//! A flag given on the command line wins over the environment.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Parser;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "song_identifier",
    version,
    about = "Identify the song playing on a line-in source and log it as a Spinitron spin"
)]
pub struct Cli {
    /// Sample rate in Hz
    #[arg(long, env = "SAMPLE_RATE")]
    pub sample_rate: Option<u32>,

    /// Length of each recorded clip in seconds
    #[arg(long = "duration", env = "RECORDING_DURATION_SEC")]
    pub recording_duration_sec: Option<u32>,

    /// Number of channels to record
    #[arg(long, env = "NUMBER_OF_CHANNELS")]
    pub channels: Option<u16>,

    /// Device number (as listed by show_sources) to use without asking
    #[arg(long, env = "DEVICE")]
    pub device: Option<usize>,

    /// Ask for the device again before every song
    #[arg(long, env = "RESELECT_DEVICE", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub reselect_device: Option<bool>,

    /// List devices without input channels too
    #[arg(long, env = "DISPLAY_OUTPUT_DEVICES", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub display_output_devices: Option<bool>,

    /// Spinitron spin endpoint
    #[arg(long, env = "SPINITRON_API_URL")]
    pub spinitron_api_url: Option<String>,

    /// Spinitron bearer token
    #[arg(long, env = "SPINITRON_ACCESS_TOKEN", hide_env_values = true)]
    pub spinitron_access_token: Option<String>,

    /// File overwritten with "artist - title" after each song
    #[arg(long, env = "RADIO_LOGIK_METADATA_FILE_PATH")]
    pub radio_logik_metadata_file_path: Option<PathBuf>,

    /// Discogs personal access token
    #[arg(long, env = "DISCOGS_ACCESS_TOKEN", hide_env_values = true)]
    pub discogs_access_token: Option<String>,

    /// Discogs API base URL
    #[arg(long, env = "DISCOGS_API_URL")]
    pub discogs_api_url: Option<String>,

    /// MusicBrainz web service base URL
    #[arg(long, env = "MUSICBRAINZ_API_URL")]
    pub musicbrainz_api_url: Option<String>,

    /// songrec executable used for recognition
    #[arg(long, env = "SONGREC_PATH")]
    pub songrec_path: Option<PathBuf>,

    /// Timeout for HTTP requests in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SEC")]
    pub http_timeout_sec: Option<u64>,

    /// Timeout for one recognition in seconds
    #[arg(long, env = "RECOGNITION_TIMEOUT_SEC")]
    pub recognition_timeout_sec: Option<u64>,

    /// Log full error chains and debug output
    #[arg(long, env = "DEBUG", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub debug: Option<bool>,

    /// Saved defaults file (default: ~/.state/song-identifier/defaults.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save the given options as defaults and exit
    #[arg(long)]
    pub save_defaults: bool,

    /// Show the saved defaults and exit
    #[arg(long)]
    pub show_saved_defaults: bool,
}

impl Cli {
    /// The options given on the command line or in the environment.
    pub fn to_config(&self) -> Config {
        Config {
            sample_rate: self.sample_rate,
            recording_duration_sec: self.recording_duration_sec,
            channels: self.channels,
            device: self.device,
            reselect_device: self.reselect_device,
            display_output_devices: self.display_output_devices,
            spinitron_api_url: self.spinitron_api_url.clone(),
            spinitron_access_token: self.spinitron_access_token.clone(),
            radio_logik_metadata_file_path: self.radio_logik_metadata_file_path.clone(),
            discogs_access_token: self.discogs_access_token.clone(),
            discogs_api_url: self.discogs_api_url.clone(),
            musicbrainz_api_url: self.musicbrainz_api_url.clone(),
            songrec_path: self.songrec_path.clone(),
            http_timeout_sec: self.http_timeout_sec,
            recognition_timeout_sec: self.recognition_timeout_sec,
            debug: self.debug,
        }
    }
}
