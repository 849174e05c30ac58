//! Run the metadata lookup for one song without recording anything.
//!
//! Usage:
//!   metadata_lookup "Song Title" "Artist" [--isrc USXXX0000000]
//!
//! Uses the same saved defaults and environment (DISCOGS_ACCESS_TOKEN,
//! DISCOGS_API_URL, MUSICBRAINZ_API_URL, HTTP_TIMEOUT_SEC) as song_identifier.

use anyhow::{Context, Result};
use clap::Parser;

use song_identifier::discogs::DiscogsClient;
use song_identifier::logging::init_logging;
use song_identifier::musicbrainz::MusicBrainzClient;
use song_identifier::reporter::spin_query;
use song_identifier::{Config, MetadataResolver};

#[derive(Debug, Parser)]
#[command(name = "metadata_lookup", version)]
struct Args {
    /// Song title as recognized
    title: String,

    /// Artist as recognized
    artist: String,

    /// ISRC used for the album lookup
    #[arg(long, default_value = "")]
    isrc: String,

    /// Also print the spin query that would be sent
    #[arg(long)]
    spin: bool,

    /// Discogs personal access token
    #[arg(long, env = "DISCOGS_ACCESS_TOKEN", hide_env_values = true)]
    discogs_access_token: Option<String>,

    /// Discogs API base URL
    #[arg(long, env = "DISCOGS_API_URL")]
    discogs_api_url: Option<String>,

    /// MusicBrainz web service base URL
    #[arg(long, env = "MUSICBRAINZ_API_URL")]
    musicbrainz_api_url: Option<String>,

    /// Timeout for HTTP requests in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SEC")]
    http_timeout_sec: Option<u64>,

    /// Log every request
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    /// Overrides given on the command line or in the environment.
    fn to_config(&self) -> Config {
        Config {
            discogs_access_token: self.discogs_access_token.clone(),
            discogs_api_url: self.discogs_api_url.clone(),
            musicbrainz_api_url: self.musicbrainz_api_url.clone(),
            http_timeout_sec: self.http_timeout_sec,
            ..Config::new()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::builtin_defaults();
    let config_path = Config::get_config_path().context("cannot locate the saved defaults")?;
    config.merge(&Config::load_from(&config_path)?);
    config.merge(&args.to_config());
    let settings = config.resolve()?;
    init_logging(args.verbose || settings.debug);

    let catalog = DiscogsClient::new(
        &settings.discogs_api_url,
        settings.discogs_access_token.clone(),
        settings.http_timeout,
    );
    println!("Discogs credentials: {}", if catalog.has_credentials() { "yes" } else { "no" });

    let resolver = MetadataResolver::new(
        Box::new(catalog),
        Box::new(MusicBrainzClient::new(&settings.musicbrainz_api_url, settings.http_timeout)),
    );
    let resolution = resolver.resolve(&args.title, &args.artist, &args.isrc);

    println!();
    println!("=== Song Metadata ===");
    println!("{}", resolution.metadata);

    if !resolution.warnings.is_empty() {
        println!();
        println!("=== Warnings ({}) ===", resolution.warnings.len());
        for warning in &resolution.warnings {
            println!("  {}", warning);
        }
    }

    if args.spin {
        println!();
        println!("=== Spin Query ===");
        for (key, value) in spin_query(&resolution.metadata) {
            println!("  {}={}", key, value);
        }
    }

    Ok(())
}
