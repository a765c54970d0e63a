// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Decoding of encoded audio blobs into shared in-memory PCM.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

/// Error types for decoding operations.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no audio source configured")]
    NoSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio format error: {0}")]
    Format(#[from] SymphoniaError),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("sample rate not specified")]
    UnknownSampleRate,

    #[error("decoded to no audio")]
    Empty,
}

/// Decoded PCM audio, interleaved f32. The data lives in an Arc so that every voice
/// playing this sample shares the same buffer.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Creates decoded audio from interleaved samples.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        Self {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    /// The interleaved sample data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Playback length of the whole buffer.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Returns a copy transcoded to the given sample rate, or a cheap clone if it already matches.
    pub fn to_sample_rate(&self, target_rate: u32) -> DecodedAudio {
        if target_rate == self.sample_rate || target_rate == 0 {
            return self.clone();
        }

        info!(
            source_rate = self.sample_rate,
            target_rate, "Transcoding sample"
        );
        DecodedAudio::new(
            transcode_samples(&self.data, self.channel_count, self.sample_rate, target_rate),
            self.channel_count,
            target_rate,
        )
    }
}

/// Decodes an encoded audio blob (WAV, FLAC, MP3, OGG...) entirely into memory.
/// The extension is only a hint for the format probe.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(&track.codec_params, &decoder_opts)?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channel_count: u16 = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is skipped, the rest of the stream is still usable.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if channel_count == 0 {
            channel_count = spec.channels.count() as u16;
        }
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if samples.is_empty() || channel_count == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedAudio::new(samples, channel_count, sample_rate))
}

/// Transcodes samples from one sample rate to another using linear interpolation.
/// Loops are transcoded once when cached, so this never runs in the render path.
fn transcode_samples(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);

    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let idx0 = source_frame * channels + channel;
            let idx1 = (source_frame + 1) * channels + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}
