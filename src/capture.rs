//! Line-in capture: device enumeration, selection and fixed-length recording.
//!
//! Recording is synchronous.  [`AudioCapture::capture`] blocks for the whole
//! clip and returns it as WAV bytes ready for the recognizer.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::wavfile;

/// An audio device as offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// Position in the host's device enumeration.
    pub index: usize,
    pub name: String,
    pub input_channels: u16,
    pub output_channels: u16,
}

impl InputDevice {
    pub fn can_record(&self) -> bool {
        self.input_channels > 0
    }
}

/// Clip parameters for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSpec {
    pub duration_secs: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl CaptureSpec {
    /// Total number of interleaved samples in a full clip.
    pub fn sample_count(&self) -> usize {
        self.duration_secs as usize * self.sample_rate as usize * self.channels as usize
    }
}

/// Source of recorded clips.
pub trait AudioCapture {
    /// Every device the audio host knows about, recordable or not.
    fn devices(&self) -> Result<Vec<InputDevice>>;

    /// Record `spec.duration_secs` seconds from `device` and return WAV bytes.
    fn capture(&self, device: &InputDevice, spec: &CaptureSpec) -> Result<Vec<u8>>;
}

/// Apply the capability filter: only devices with input channels, unless
/// `show_all` is set.
pub fn selectable_devices(all: Vec<InputDevice>, show_all: bool) -> Vec<InputDevice> {
    if show_all {
        all
    } else {
        all.into_iter().filter(InputDevice::can_record).collect()
    }
}

/// Numbered listing shown before the device prompt.
pub fn format_device_list(devices: &[InputDevice]) -> String {
    devices
        .iter()
        .enumerate()
        .map(|(i, d)| {
            format!(
                "{}: {} ({} in, {} out)",
                i + 1,
                d.name,
                d.input_channels,
                d.output_channels
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve the operator's 1-based answer against the listed devices.
pub fn select_device(devices: &[InputDevice], answer: &str) -> Result<InputDevice> {
    if devices.is_empty() {
        return Err(PipelineError::Device("no audio input devices found".to_string()));
    }

    let number: usize = answer
        .trim()
        .parse()
        .map_err(|_| PipelineError::Device(format!("'{}' is not a device number", answer.trim())))?;

    number
        .checked_sub(1)
        .and_then(|i| devices.get(i))
        .cloned()
        .ok_or_else(|| {
            PipelineError::Device(format!(
                "device {} does not exist, choose 1 to {}",
                number,
                devices.len()
            ))
        })
}

// ── cpal backend ─────────────────────────────────────────────────────────────

/// Records from the default cpal host (ALSA/PulseAudio, CoreAudio, WASAPI).
pub struct CpalCapture {
    host: cpal::Host,
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalCapture {
    pub fn new() -> Self {
        CpalCapture {
            host: cpal::default_host(),
        }
    }

    fn open(&self, target: &InputDevice) -> Result<Device> {
        let device = self
            .host
            .devices()
            .map_err(|e| PipelineError::Device(e.to_string()))?
            .nth(target.index)
            .ok_or_else(|| PipelineError::Device(format!("{} is no longer available", target.name)))?;

        match device.name() {
            Ok(name) if name == target.name => Ok(device),
            _ => Err(PipelineError::Device(format!(
                "device list changed, {} is no longer at position {}",
                target.name,
                target.index + 1
            ))),
        }
    }
}

fn max_channels<I>(configs: std::result::Result<I, cpal::SupportedStreamConfigsError>) -> u16
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    configs
        .map(|it| it.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

impl AudioCapture for CpalCapture {
    fn devices(&self) -> Result<Vec<InputDevice>> {
        let devices = self
            .host
            .devices()
            .map_err(|e| PipelineError::Device(e.to_string()))?;

        let found: Vec<InputDevice> = devices
            .enumerate()
            .map(|(index, device)| InputDevice {
                index,
                name: device.name().unwrap_or_else(|_| "Unknown Device".to_string()),
                input_channels: max_channels(device.supported_input_configs()),
                output_channels: max_channels(device.supported_output_configs()),
            })
            .collect();

        if found.is_empty() {
            return Err(PipelineError::Device("no audio devices found".to_string()));
        }
        Ok(found)
    }

    fn capture(&self, target: &InputDevice, spec: &CaptureSpec) -> Result<Vec<u8>> {
        if spec.duration_secs == 0 {
            return Err(PipelineError::Capture("recording duration must be at least 1 second".to_string()));
        }

        let device = self.open(target)?;
        let sample_format = device
            .default_input_config()
            .map_err(|e| PipelineError::Device(format!("{}: {}", target.name, e)))?
            .sample_format();

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        debug!(device = %target.name, ?sample_format, ?config, "opening input stream");

        let wanted = spec.sample_count();
        let buffer = Arc::new(Mutex::new(Vec::with_capacity(wanted)));
        let failure = Arc::new(Mutex::new(None));

        let stream = match sample_format {
            SampleFormat::F32 => build_capture_stream::<f32>(&device, &config, &buffer, wanted, &failure),
            SampleFormat::I16 => build_capture_stream::<i16>(&device, &config, &buffer, wanted, &failure),
            SampleFormat::U16 => build_capture_stream::<u16>(&device, &config, &buffer, wanted, &failure),
            SampleFormat::I32 => build_capture_stream::<i32>(&device, &config, &buffer, wanted, &failure),
            other => {
                return Err(PipelineError::Capture(format!("unsupported sample format {:?}", other)));
            }
        }
        .map_err(|e| PipelineError::Capture(e.to_string()))?;

        stream.play().map_err(|e| PipelineError::Capture(e.to_string()))?;
        info!("Recording started ({} s from {})", spec.duration_secs, target.name);
        thread::sleep(Duration::from_secs(spec.duration_secs as u64));
        drop(stream);
        info!("Recording finished");

        if let Some(err) = failure.lock().ok().and_then(|mut f| f.take()) {
            return Err(PipelineError::Capture(err));
        }

        let samples = buffer
            .lock()
            .map(|mut b| std::mem::take(&mut *b))
            .map_err(|_| PipelineError::Capture("capture buffer poisoned".to_string()))?;

        if samples.is_empty() {
            return Err(PipelineError::Capture(format!("no audio received from {}", target.name)));
        }
        debug!("captured {} of {} samples", samples.len(), wanted);

        wavfile::encode_pcm16(&samples, spec.sample_rate, spec.channels)
            .map_err(|e| PipelineError::Capture(format!("could not encode clip: {}", e)))
    }
}

fn build_capture_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer: &Arc<Mutex<Vec<i16>>>,
    limit: usize,
    failure: &Arc<Mutex<Option<String>>>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let buffer = Arc::clone(buffer);
    let failure = Arc::clone(failure);

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if let Ok(mut buf) = buffer.lock() {
                let room = limit.saturating_sub(buf.len());
                buf.extend(data.iter().take(room).map(|&s| i16::from_sample(s)));
            }
        },
        move |err| {
            if let Ok(mut f) = failure.lock() {
                f.get_or_insert_with(|| err.to_string());
            }
        },
        None,
    )
}
