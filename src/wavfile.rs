//! In-memory WAV encoding of captured clips.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Format and length of an encoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub spec: WavSpec,
    /// Samples per channel.
    pub frames: u32,
}

impl ClipInfo {
    pub fn duration_secs(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.spec.sample_rate as f64
    }
}

/// Encode interleaved signed 16-bit samples as a complete WAV file.
pub fn encode_pcm16(samples: &[i16], rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

/// Read the format of a clip held in memory.
pub fn clip_info(bytes: &[u8]) -> Result<ClipInfo, hound::Error> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    Ok(ClipInfo {
        spec: reader.spec(),
        frames: reader.duration(),
    })
}
