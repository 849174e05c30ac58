use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CaptureSpec;
use crate::error::PipelineError;
use crate::{discogs, musicbrainz, reporter};

/// Configuration defaults that can be saved to a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_duration_sec: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reselect_device: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_output_devices: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spinitron_api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spinitron_access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_logik_metadata_file_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discogs_access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discogs_api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub musicbrainz_api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub songrec_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_sec: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition_timeout_sec: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// Fully resolved settings, every value present and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sample_rate: u32,
    pub recording_duration_sec: u32,
    pub channels: u16,
    /// Preselected 1-based device number.
    pub device: Option<usize>,
    pub reselect_device: bool,
    pub display_output_devices: bool,
    pub spinitron_api_url: String,
    pub spinitron_access_token: Option<String>,
    pub radio_logik_metadata_file_path: Option<PathBuf>,
    pub discogs_access_token: Option<String>,
    pub discogs_api_url: String,
    pub musicbrainz_api_url: String,
    pub songrec_path: PathBuf,
    pub http_timeout: Duration,
    pub recognition_timeout: Duration,
    pub debug: bool,
}

impl Settings {
    pub fn capture_spec(&self) -> CaptureSpec {
        CaptureSpec {
            duration_secs: self.recording_duration_sec,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

fn positive<T: PartialOrd + Default + Copy>(value: Option<T>, name: &str) -> Result<T, PipelineError> {
    match value {
        Some(v) if v > T::default() => Ok(v),
        Some(_) => Err(PipelineError::Config(format!("{} must be greater than 0", name))),
        None => Err(PipelineError::Config(format!("{} is not set", name))),
    }
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Values used when neither the saved defaults nor the command line set them.
    pub fn builtin_defaults() -> Self {
        Config {
            sample_rate: Some(44100),
            recording_duration_sec: Some(10),
            channels: Some(1),
            device: None,
            reselect_device: Some(false),
            display_output_devices: Some(false),
            spinitron_api_url: Some(reporter::DEFAULT_SPIN_URL.to_string()),
            spinitron_access_token: None,
            radio_logik_metadata_file_path: None,
            discogs_access_token: None,
            discogs_api_url: Some(discogs::DEFAULT_API_URL.to_string()),
            musicbrainz_api_url: Some(musicbrainz::DEFAULT_API_URL.to_string()),
            songrec_path: Some(PathBuf::from("songrec")),
            http_timeout_sec: Some(20),
            recognition_timeout_sec: Some(60),
            debug: Some(false),
        }
    }

    /// Get the config file path (~/.state/song-identifier/defaults.toml)
    pub fn get_config_path() -> Result<PathBuf, io::Error> {
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set"))?;

        let config_dir = Path::new(&home).join(".state").join("song-identifier");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load config from file; a missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<(), PipelineError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        fs::write(path, toml_string)?;

        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        fn take<T: Clone>(mine: &mut Option<T>, theirs: &Option<T>) {
            if theirs.is_some() {
                mine.clone_from(theirs);
            }
        }

        take(&mut self.sample_rate, &other.sample_rate);
        take(&mut self.recording_duration_sec, &other.recording_duration_sec);
        take(&mut self.channels, &other.channels);
        take(&mut self.device, &other.device);
        take(&mut self.reselect_device, &other.reselect_device);
        take(&mut self.display_output_devices, &other.display_output_devices);
        take(&mut self.spinitron_api_url, &other.spinitron_api_url);
        take(&mut self.spinitron_access_token, &other.spinitron_access_token);
        take(&mut self.radio_logik_metadata_file_path, &other.radio_logik_metadata_file_path);
        take(&mut self.discogs_access_token, &other.discogs_access_token);
        take(&mut self.discogs_api_url, &other.discogs_api_url);
        take(&mut self.musicbrainz_api_url, &other.musicbrainz_api_url);
        take(&mut self.songrec_path, &other.songrec_path);
        take(&mut self.http_timeout_sec, &other.http_timeout_sec);
        take(&mut self.recognition_timeout_sec, &other.recognition_timeout_sec);
        take(&mut self.debug, &other.debug);
    }

    /// Validate and fill in every value.  Call on a config merged over
    /// [`Config::builtin_defaults`].
    pub fn resolve(&self) -> Result<Settings, PipelineError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| PipelineError::Config(format!("{} is not set", name)))
        };

        Ok(Settings {
            sample_rate: positive(self.sample_rate, "SAMPLE_RATE")?,
            recording_duration_sec: positive(self.recording_duration_sec, "RECORDING_DURATION_SEC")?,
            channels: positive(self.channels, "NUMBER_OF_CHANNELS")?,
            device: match self.device {
                Some(0) => return Err(PipelineError::Config("DEVICE numbers start at 1".to_string())),
                other => other,
            },
            reselect_device: self.reselect_device.unwrap_or(false),
            display_output_devices: self.display_output_devices.unwrap_or(false),
            spinitron_api_url: required(&self.spinitron_api_url, "SPINITRON_API_URL")?,
            spinitron_access_token: self.spinitron_access_token.clone().filter(|t| !t.is_empty()),
            radio_logik_metadata_file_path: self.radio_logik_metadata_file_path.clone(),
            discogs_access_token: self.discogs_access_token.clone().filter(|t| !t.is_empty()),
            discogs_api_url: required(&self.discogs_api_url, "DISCOGS_API_URL")?,
            musicbrainz_api_url: required(&self.musicbrainz_api_url, "MUSICBRAINZ_API_URL")?,
            songrec_path: self.songrec_path.clone().unwrap_or_else(|| PathBuf::from("songrec")),
            http_timeout: Duration::from_secs(positive(self.http_timeout_sec, "HTTP_TIMEOUT_SEC")?),
            recognition_timeout: Duration::from_secs(positive(
                self.recognition_timeout_sec,
                "RECOGNITION_TIMEOUT_SEC",
            )?),
            debug: self.debug.unwrap_or(false),
        })
    }

    /// Print the config in a human-readable format.  Tokens are masked.
    pub fn print(&self, title: &str) {
        println!("{}:", title);

        if let Some(rate) = self.sample_rate {
            println!("  Sample rate:          {} Hz", rate);
        }
        if let Some(duration) = self.recording_duration_sec {
            println!("  Recording duration:   {} seconds", duration);
        }
        if let Some(channels) = self.channels {
            println!("  Channels:             {}", channels);
        }
        if let Some(device) = self.device {
            println!("  Device:               {}", device);
        }
        if let Some(reselect) = self.reselect_device {
            println!("  Reselect device:      {}", if reselect { "every song" } else { "once" });
        }
        if let Some(show_all) = self.display_output_devices {
            println!("  Output devices:       {}", if show_all { "listed" } else { "hidden" });
        }
        if let Some(url) = &self.spinitron_api_url {
            println!("  Spinitron URL:        {}", url);
        }
        if self.spinitron_access_token.is_some() {
            println!("  Spinitron token:      ********");
        }
        if let Some(path) = &self.radio_logik_metadata_file_path {
            println!("  Radio Logik file:     {}", path.display());
        }
        if self.discogs_access_token.is_some() {
            println!("  Discogs token:        ********");
        }
        if let Some(url) = &self.discogs_api_url {
            println!("  Discogs URL:          {}", url);
        }
        if let Some(url) = &self.musicbrainz_api_url {
            println!("  MusicBrainz URL:      {}", url);
        }
        if let Some(path) = &self.songrec_path {
            println!("  songrec:              {}", path.display());
        }
        if let Some(timeout) = self.http_timeout_sec {
            println!("  HTTP timeout:         {} seconds", timeout);
        }
        if let Some(timeout) = self.recognition_timeout_sec {
            println!("  Recognition timeout:  {} seconds", timeout);
        }
        if let Some(debug) = self.debug {
            println!("  Debug trace:          {}", if debug { "enabled" } else { "disabled" });
        }
    }
}
