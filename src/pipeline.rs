//! The identification loop.
//!
//! Each cycle walks through the stages in order:
//!
//! ```text
//! SelectingDevice -> Capturing -> Recognizing -> Resolving -> Reporting -> AwaitingContinue
//! ```
//!
//! Device selection only runs when no device has been chosen yet or when the
//! device is re-selected every cycle.  A failure in any stage ends that cycle,
//! is logged, and the operator is asked whether to go on.  Nothing but the
//! chosen device survives from one cycle to the next.

use std::error::Error;
use std::fmt;

use tracing::{debug, error, info};

use crate::capture::{self, AudioCapture, CaptureSpec, CpalCapture, InputDevice};
use crate::config::Settings;
use crate::discogs::DiscogsClient;
use crate::error::{PipelineError, Result};
use crate::musicbrainz::MusicBrainzClient;
use crate::operator::{self, OperatorPrompt};
use crate::recognizer::{Recognizer, SongrecRecognizer};
use crate::reporter::{LocalLog, SpinReporter, SpinitronClient};
use crate::resolver::MetadataResolver;
use crate::song::SongMetadata;

/// The states of one cycle.
///
/// Only `SelectingDevice`, `Capturing`, `Recognizing` and `Reporting` can end
/// a cycle early.  Resolution turns every problem into a warning, and a
/// failed continue prompt simply stops the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelectingDevice,
    Capturing,
    Recognizing,
    Resolving,
    Reporting,
    AwaitingContinue,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::SelectingDevice => "selecting the device",
            Stage::Capturing => "recording",
            Stage::Recognizing => "identifying the song",
            Stage::Resolving => "fetching metadata",
            Stage::Reporting => "reporting the spin",
            Stage::AwaitingContinue => "waiting for the operator",
        };
        f.write_str(s)
    }
}

/// A cycle that ended early.
#[derive(Debug)]
pub struct CycleFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed while {}: {}", self.stage, self.error)
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, CycleFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, CycleFailure> {
        self.map_err(|error| CycleFailure { stage, error })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub capture: CaptureSpec,
    /// 1-based device number that replaces the device prompt.
    pub device: Option<usize>,
    pub reselect_device: bool,
    pub show_all_devices: bool,
    pub debug: bool,
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        PipelineOptions {
            capture: settings.capture_spec(),
            device: settings.device,
            reselect_device: settings.reselect_device,
            show_all_devices: settings.display_output_devices,
            debug: settings.debug,
        }
    }
}

/// Counts for one run of [`Pipeline::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub reported: usize,
}

pub struct Pipeline {
    capture: Box<dyn AudioCapture>,
    recognizer: Box<dyn Recognizer>,
    resolver: MetadataResolver,
    reporter: Box<dyn SpinReporter>,
    local_log: LocalLog,
    options: PipelineOptions,
    device: Option<InputDevice>,
}

impl Pipeline {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        recognizer: Box<dyn Recognizer>,
        resolver: MetadataResolver,
        reporter: Box<dyn SpinReporter>,
        local_log: LocalLog,
        options: PipelineOptions,
    ) -> Self {
        Pipeline {
            capture,
            recognizer,
            resolver,
            reporter,
            local_log,
            options,
            device: None,
        }
    }

    /// Wire up the real capture, recognition, catalog and reporting clients.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings
            .spinitron_access_token
            .as_deref()
            .ok_or_else(|| PipelineError::Config("SPINITRON_ACCESS_TOKEN is not set".to_string()))?;

        let resolver = MetadataResolver::new(
            Box::new(DiscogsClient::new(
                &settings.discogs_api_url,
                settings.discogs_access_token.clone(),
                settings.http_timeout,
            )),
            Box::new(MusicBrainzClient::new(&settings.musicbrainz_api_url, settings.http_timeout)),
        );

        Ok(Pipeline::new(
            Box::new(CpalCapture::new()),
            Box::new(SongrecRecognizer::new(settings.songrec_path.clone(), settings.recognition_timeout)),
            resolver,
            Box::new(SpinitronClient::new(&settings.spinitron_api_url, token, settings.http_timeout)),
            LocalLog::new(settings.radio_logik_metadata_file_path.clone()),
            PipelineOptions::from(settings),
        ))
    }

    /// The device in use, choosing one first if needed.
    fn ensure_device(&mut self, prompt: &mut dyn OperatorPrompt) -> Result<InputDevice> {
        if let Some(device) = &self.device {
            if !self.options.reselect_device {
                return Ok(device.clone());
            }
        }
        self.device = None;

        let devices = capture::selectable_devices(self.capture.devices()?, self.options.show_all_devices);

        let chosen = match self.options.device {
            Some(number) => capture::select_device(&devices, &number.to_string())?,
            None => {
                prompt.show(&capture::format_device_list(&devices));
                let answer = prompt
                    .ask("Select the required device: ")?
                    .ok_or_else(|| PipelineError::Device("no device selected".to_string()))?;
                capture::select_device(&devices, &answer)?
            }
        };

        info!("Using audio device {}", chosen.name);
        self.device = Some(chosen.clone());
        Ok(chosen)
    }

    /// One pass from device selection to reporting.
    pub fn run_cycle(
        &mut self,
        prompt: &mut dyn OperatorPrompt,
    ) -> std::result::Result<SongMetadata, CycleFailure> {
        let device = self.ensure_device(prompt).at(Stage::SelectingDevice)?;

        let wav = self
            .capture
            .capture(&device, &self.options.capture)
            .at(Stage::Capturing)?;
        debug!("clip is {} bytes", wav.len());

        let song = self.recognizer.recognize(&wav).at(Stage::Recognizing)?;
        info!("Shazam identified song: {} by {}", song.title, song.artist);

        let resolution = self.resolver.resolve(&song.title, &song.artist, &song.isrc);
        let metadata = resolution.metadata;
        info!("Song metadata:\n{}", metadata);

        self.reporter.report(&metadata).at(Stage::Reporting)?;
        self.local_log.log_locally(&metadata);

        Ok(metadata)
    }

    fn log_failure(&self, failure: &CycleFailure) {
        error!("An error occurred: {}", failure);
        if self.options.debug {
            let mut source = failure.error.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            error!("  at stage {:?}: {:?}", failure.stage, failure.error);
        }
    }

    /// Run cycles until the operator declines to continue.
    pub fn run(&mut self, prompt: &mut dyn OperatorPrompt) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            match self.run_cycle(prompt) {
                Ok(_) => summary.reported += 1,
                Err(failure) => self.log_failure(&failure),
            }
            summary.cycles += 1;

            if !operator::confirm_next(prompt) {
                break;
            }
        }

        info!(
            "Finished after {} cycle(s), {} song(s) reported",
            summary.cycles, summary.reported
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::tests::ScriptedPrompt;
    use crate::reporter::spin_query;
    use crate::resolver::tests::{test_catalog, FakeRegistry};
    use crate::song::IdentifiedSong;
    use crate::wavfile;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const SPEC: CaptureSpec = CaptureSpec {
        duration_secs: 10,
        sample_rate: 44100,
        channels: 1,
    };

    #[derive(Clone, Default)]
    struct FakeCapture {
        fail: bool,
        recorded_from: Rc<RefCell<Vec<String>>>,
    }

    impl AudioCapture for FakeCapture {
        fn devices(&self) -> Result<Vec<InputDevice>> {
            Ok(vec![
                InputDevice {
                    index: 0,
                    name: "HDMI Output".to_string(),
                    input_channels: 0,
                    output_channels: 2,
                },
                InputDevice {
                    index: 1,
                    name: "Line In".to_string(),
                    input_channels: 2,
                    output_channels: 0,
                },
            ])
        }

        fn capture(&self, device: &InputDevice, spec: &CaptureSpec) -> Result<Vec<u8>> {
            if self.fail {
                return Err(PipelineError::Capture("buffer overrun".to_string()));
            }
            self.recorded_from.borrow_mut().push(device.name.clone());
            wavfile::encode_pcm16(&vec![0; spec.sample_count()], spec.sample_rate, spec.channels)
                .map_err(|e| PipelineError::Capture(e.to_string()))
        }
    }

    struct FakeRecognizer {
        answers: RefCell<VecDeque<Result<IdentifiedSong>>>,
    }

    impl FakeRecognizer {
        fn new(answers: Vec<Result<IdentifiedSong>>) -> Self {
            FakeRecognizer {
                answers: RefCell::new(answers.into()),
            }
        }
    }

    impl Recognizer for FakeRecognizer {
        fn recognize(&self, wav: &[u8]) -> Result<IdentifiedSong> {
            let clip = wavfile::clip_info(wav).map_err(|e| PipelineError::Recognition(e.to_string()))?;
            assert_eq!(clip.duration_secs(), 10.0);
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(PipelineError::NoMatch))
        }
    }

    #[derive(Clone, Default)]
    struct FakeReporter {
        reject: bool,
        spins: Rc<RefCell<Vec<Vec<(&'static str, String)>>>>,
    }

    impl SpinReporter for FakeReporter {
        fn report(&self, metadata: &SongMetadata) -> Result<()> {
            if self.reject {
                return Err(PipelineError::Report("500 Internal Server Error".to_string()));
            }
            self.spins.borrow_mut().push(spin_query(metadata).to_vec());
            Ok(())
        }
    }

    fn test_song() -> IdentifiedSong {
        IdentifiedSong {
            title: "Test Song".to_string(),
            artist: "Test Artist".to_string(),
            isrc: "US1234567890".to_string(),
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            capture: SPEC,
            device: None,
            reselect_device: false,
            show_all_devices: false,
            debug: true,
        }
    }

    fn pipeline(
        capture: FakeCapture,
        answers: Vec<Result<IdentifiedSong>>,
        reporter: FakeReporter,
        local_log: LocalLog,
        options: PipelineOptions,
    ) -> Pipeline {
        let resolver = MetadataResolver::new(
            Box::new(test_catalog("3:45")),
            Box::new(FakeRegistry(Some("Test Album"))),
        );
        Pipeline::new(
            Box::new(capture),
            Box::new(FakeRecognizer::new(answers)),
            resolver,
            Box::new(reporter),
            local_log,
            options,
        )
    }

    #[test]
    fn test_end_to_end_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("radiologik.txt");
        let capture = FakeCapture::default();
        let reporter = FakeReporter::default();

        let mut p = pipeline(
            capture.clone(),
            vec![Ok(test_song())],
            reporter.clone(),
            LocalLog::new(Some(log_path.clone())),
            options(),
        );
        let mut prompt = ScriptedPrompt::new(["1", "n"]);
        let summary = p.run(&mut prompt);

        assert_eq!(summary, RunSummary { cycles: 1, reported: 1 });
        assert_eq!(*capture.recorded_from.borrow(), vec!["Line In"]);

        let spins = reporter.spins.borrow();
        assert_eq!(spins.len(), 1);
        let expected: Vec<(&str, String)> = vec![
            ("sd", "225".to_string()),
            ("aw", "Test Artist".to_string()),
            ("dn", "Test Album".to_string()),
            ("dr", "2020".to_string()),
            ("ln", "TestLabel".to_string()),
            ("dl", "Rock, Pop".to_string()),
            ("sn", "Test Song".to_string()),
        ];
        assert_eq!(spins[0], expected);

        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "Test Artist - Test Song\n");
        assert_eq!(prompt.remaining(), 0);
    }

    #[test]
    fn test_run_cycle_returns_merged_metadata() {
        let mut p = pipeline(
            FakeCapture::default(),
            vec![Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            options(),
        );
        let mut prompt = ScriptedPrompt::new(["1"]);
        let metadata = p.run_cycle(&mut prompt).unwrap();

        assert_eq!(
            metadata,
            SongMetadata {
                title: "Test Song".to_string(),
                artist: "Test Artist".to_string(),
                album: "Test Album".to_string(),
                duration: 225,
                year: 2020,
                label: "TestLabel".to_string(),
                genre: "Rock, Pop".to_string(),
                isrc: "US1234567890".to_string(),
            }
        );
    }

    #[test]
    fn test_no_match_skips_reporting_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("radiologik.txt");
        let reporter = FakeReporter::default();

        let mut p = pipeline(
            FakeCapture::default(),
            vec![Err(PipelineError::NoMatch), Ok(test_song())],
            reporter.clone(),
            LocalLog::new(Some(log_path.clone())),
            options(),
        );

        let mut prompt = ScriptedPrompt::new(["1"]);
        let failure = p.run_cycle(&mut prompt).unwrap_err();
        assert_eq!(failure.stage, Stage::Recognizing);
        assert!(matches!(failure.error, PipelineError::NoMatch));
        assert!(reporter.spins.borrow().is_empty());
        assert!(!log_path.exists());

        // The device chosen before is reused; the next cycle succeeds.
        let mut prompt = ScriptedPrompt::new(["n"]);
        let summary = p.run(&mut prompt);
        assert_eq!(summary, RunSummary { cycles: 1, reported: 1 });
        assert_eq!(reporter.spins.borrow().len(), 1);
    }

    #[test]
    fn test_failed_report_ends_cycle_without_local_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("radiologik.txt");
        let reporter = FakeReporter {
            reject: true,
            ..Default::default()
        };

        let mut p = pipeline(
            FakeCapture::default(),
            vec![Ok(test_song()), Ok(test_song())],
            reporter,
            LocalLog::new(Some(log_path.clone())),
            options(),
        );
        let mut prompt = ScriptedPrompt::new(["1", "y", "n"]);
        let summary = p.run(&mut prompt);

        assert_eq!(summary, RunSummary { cycles: 2, reported: 0 });
        assert!(!log_path.exists());
    }

    #[test]
    fn test_capture_failure_is_contained() {
        let capture = FakeCapture {
            fail: true,
            ..Default::default()
        };
        let mut p = pipeline(capture, vec![], FakeReporter::default(), LocalLog::new(None), options());

        let mut prompt = ScriptedPrompt::new(["1"]);
        let failure = p.run_cycle(&mut prompt).unwrap_err();
        assert_eq!(failure.stage, Stage::Capturing);
    }

    #[test]
    fn test_bad_device_answer_asks_again_next_cycle() {
        let capture = FakeCapture::default();
        let mut p = pipeline(
            capture.clone(),
            vec![Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            options(),
        );

        // "2" is out of range: only the line-in device passes the filter.
        let mut prompt = ScriptedPrompt::new(["2", "y", "1", "n"]);
        let summary = p.run(&mut prompt);

        assert_eq!(summary, RunSummary { cycles: 2, reported: 1 });
        assert_eq!(capture.recorded_from.borrow().len(), 1);
        assert_eq!(prompt.remaining(), 0);
    }

    #[test]
    fn test_device_prompt_once_unless_reselecting() {
        let mut p = pipeline(
            FakeCapture::default(),
            vec![Ok(test_song()), Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            options(),
        );
        let mut prompt = ScriptedPrompt::new(["1", "y", "n"]);
        assert_eq!(p.run(&mut prompt).reported, 2);

        let mut p = pipeline(
            FakeCapture::default(),
            vec![Ok(test_song()), Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            PipelineOptions {
                reselect_device: true,
                ..options()
            },
        );
        let mut prompt = ScriptedPrompt::new(["1", "y", "1", "n"]);
        assert_eq!(p.run(&mut prompt).reported, 2);
        assert_eq!(prompt.remaining(), 0);
    }

    #[test]
    fn test_show_all_devices_lists_outputs() {
        let capture = FakeCapture::default();
        let mut p = pipeline(
            capture.clone(),
            vec![Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            PipelineOptions {
                show_all_devices: true,
                ..options()
            },
        );
        let mut prompt = ScriptedPrompt::new(["2"]);
        p.run_cycle(&mut prompt).unwrap();

        assert!(prompt.transcript[0].contains("1: HDMI Output"));
        assert_eq!(*capture.recorded_from.borrow(), vec!["Line In"]);
    }

    #[test]
    fn test_preselected_device_skips_prompt() {
        let capture = FakeCapture::default();
        let mut p = pipeline(
            capture.clone(),
            vec![Ok(test_song())],
            FakeReporter::default(),
            LocalLog::new(None),
            PipelineOptions {
                device: Some(1),
                ..options()
            },
        );
        let mut prompt = ScriptedPrompt::new(["n"]);
        let summary = p.run(&mut prompt);

        assert_eq!(summary.reported, 1);
        assert_eq!(prompt.transcript, vec!["Record Next Song [y/n]: "]);
    }

    #[test]
    fn test_closed_input_during_selection() {
        let mut p = pipeline(
            FakeCapture::default(),
            vec![],
            FakeReporter::default(),
            LocalLog::new(None),
            options(),
        );
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let summary = p.run(&mut prompt);
        assert_eq!(summary, RunSummary { cycles: 1, reported: 0 });
    }
}
