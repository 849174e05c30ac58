//! Song recognition through the Shazam service.
//!
//! The clip is handed to the `songrec` command line client
//! (`songrec audio-file-to-recognized-song <file>`), which fingerprints it,
//! queries Shazam and prints the raw JSON response.  Only the best match is
//! used: `track.title`, `track.subtitle` (the artist) and `track.isrc`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::song::IdentifiedSong;
use crate::wavfile;

/// Turns a recorded clip into an identified song.
pub trait Recognizer {
    fn recognize(&self, wav: &[u8]) -> Result<IdentifiedSong>;
}

/// Parse a Shazam response.  A missing or empty `track` is [`PipelineError::NoMatch`].
pub fn parse_recognition(json_str: &str) -> Result<IdentifiedSong> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| PipelineError::Recognition(format!("Failed to parse JSON: {}", e)))?;

    let track = match json.get("track").and_then(|t| t.as_object()) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(PipelineError::NoMatch),
    };

    let field = |name: &str| {
        track
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Ok(IdentifiedSong {
        title: field("title"),
        artist: field("subtitle"),
        isrc: field("isrc"),
    })
}

/// Runs the `songrec` executable on a temporary WAV file.
pub struct SongrecRecognizer {
    program: PathBuf,
    timeout: Duration,
}

impl SongrecRecognizer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        SongrecRecognizer {
            program: program.into(),
            timeout,
        }
    }

    fn run(&self, wav_path: &Path) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg("audio-file-to-recognized-song")
            .arg(wav_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::Recognition(format!(
                    "could not start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Drain both pipes so a large response cannot stall the child.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = thread::spawn(move || read_all(stdout));
        let err_reader = thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::Recognition(format!(
                    "no answer from the recognition service after {}s",
                    self.timeout.as_secs()
                )));
            }
            thread::sleep(Duration::from_millis(50));
        };

        let stdout = out_reader.join().unwrap_or_default();
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            if stderr.contains("No match") {
                return Err(PipelineError::NoMatch);
            }
            return Err(PipelineError::Recognition(format!(
                "{} failed ({}): {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

fn read_all<R: Read>(pipe: Option<R>) -> String {
    let mut s = String::new();
    if let Some(mut p) = pipe {
        let _ = p.read_to_string(&mut s);
    }
    s
}

impl Recognizer for SongrecRecognizer {
    fn recognize(&self, wav: &[u8]) -> Result<IdentifiedSong> {
        let clip = wavfile::clip_info(wav)
            .map_err(|e| PipelineError::Recognition(format!("not a WAV clip: {}", e)))?;
        if clip.frames == 0 {
            return Err(PipelineError::Recognition("the recorded clip is empty".to_string()));
        }
        debug!(
            "submitting {:.1}s clip ({} Hz, {} ch)",
            clip.duration_secs(),
            clip.spec.sample_rate,
            clip.spec.channels
        );

        let mut file = tempfile::Builder::new()
            .prefix("song_identifier_")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(wav)?;
        file.flush()?;

        info!("Identifying song...");
        let response = self.run(file.path())?;
        debug!("recognition response: {}", response.trim());

        parse_recognition(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH: &str = r#"{
        "matches": [{"id": "1", "offset": 12.5}],
        "track": {
            "key": "123456",
            "title": "Test Song",
            "subtitle": "Test Artist",
            "isrc": "US1234567890",
            "sections": [{"type": "SONG", "metadata": [{"title": "Album", "text": "Shazam Album"}]}]
        }
    }"#;

    #[test]
    fn test_parse_match() {
        let song = parse_recognition(MATCH).unwrap();
        assert_eq!(
            song,
            IdentifiedSong {
                title: "Test Song".to_string(),
                artist: "Test Artist".to_string(),
                isrc: "US1234567890".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_isrc_is_not_an_error() {
        let song = parse_recognition(r#"{"track": {"title": "Song", "subtitle": "Band"}}"#).unwrap();
        assert_eq!(song.isrc, "");
        assert_eq!(song.artist, "Band");
    }

    #[test]
    fn test_no_track_is_no_match() {
        for body in [r#"{"matches": [], "tagid": "abc"}"#, r#"{"track": {}}"#, r#"{"track": null}"#] {
            assert!(
                matches!(parse_recognition(body), Err(PipelineError::NoMatch)),
                "body {}",
                body
            );
        }
    }

    #[test]
    fn test_garbage_is_recognition_error() {
        assert!(matches!(
            parse_recognition("Error: connection refused"),
            Err(PipelineError::Recognition(_))
        ));
    }

    #[test]
    fn test_invalid_clip_is_not_submitted() {
        // The program would fail to start; the clip check must come first.
        let r = SongrecRecognizer::new("/nonexistent/songrec", Duration::from_secs(1));

        match r.recognize(b"not audio at all") {
            Err(PipelineError::Recognition(msg)) => assert!(msg.starts_with("not a WAV clip")),
            other => panic!("unexpected {:?}", other),
        }

        let empty = wavfile::encode_pcm16(&[], 8000, 1).unwrap();
        match r.recognize(&empty) {
            Err(PipelineError::Recognition(msg)) => assert_eq!(msg, "the recorded clip is empty"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_program() {
        let r = SongrecRecognizer::new("/nonexistent/songrec", Duration::from_secs(1));
        let wav = wavfile::encode_pcm16(&[0; 100], 8000, 1).unwrap();
        assert!(matches!(r.recognize(&wav), Err(PipelineError::Recognition(_))));
    }

    #[cfg(unix)]
    fn fake_songrec(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("songrec");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_program_on_clip() {
        let dir = tempfile::tempdir().unwrap();
        // Only answer when called the way songrec expects.
        let script = format!(
            "[ \"$1\" = audio-file-to-recognized-song ] && [ -s \"$2\" ] || exit 3\ncat <<'EOF'\n{}\nEOF",
            MATCH
        );
        let program = fake_songrec(dir.path(), &script);

        let r = SongrecRecognizer::new(program, Duration::from_secs(10));
        let wav = wavfile::encode_pcm16(&[0; 16000], 16000, 1).unwrap();
        let song = r.recognize(&wav).unwrap();
        assert_eq!(song.title, "Test Song");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_program_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_songrec(dir.path(), "echo 'network unreachable' >&2\nexit 1");

        let r = SongrecRecognizer::new(program, Duration::from_secs(10));
        let wav = wavfile::encode_pcm16(&[0; 100], 8000, 1).unwrap();
        match r.recognize(&wav) {
            Err(PipelineError::Recognition(msg)) => assert!(msg.contains("network unreachable")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_program() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_songrec(dir.path(), "sleep 10");

        let r = SongrecRecognizer::new(program, Duration::from_millis(200));
        let wav = wavfile::encode_pcm16(&[0; 100], 8000, 1).unwrap();
        let started = Instant::now();
        assert!(matches!(r.recognize(&wav), Err(PipelineError::Recognition(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
