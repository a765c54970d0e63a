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
use std::{error::Error, fs, io::Cursor, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::config::{LoopWindow, SampleDefinition};

/// Encodes planar channels as a 32-bit float wav. All channels must be the same length.
pub fn wav_bytes(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(
            &mut cursor,
            WavSpec {
                channels: channels.len() as u16,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )
        .unwrap();

        let frames = channels.first().map(Vec::len).unwrap_or(0);
        for frame in 0..frames {
            for channel in channels {
                writer.write_sample(channel[frame]).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Writes a wav file of the given planar channels.
pub fn write_wav(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    fs::write(path, wav_bytes(channels, sample_rate))?;
    Ok(())
}

/// Writes a mono wav holding a constant value and returns a catalog entry for it.
pub fn constant_sample(
    dir: &Path,
    id: &str,
    value: f32,
    seconds: f64,
    sample_rate: u32,
    loop_window: Option<LoopWindow>,
) -> SampleDefinition {
    let file = format!("{}.wav", id);
    let frames = (seconds * sample_rate as f64).round() as usize;
    write_wav(&dir.join(&file), &[vec![value; frames]], sample_rate).unwrap();
    SampleDefinition::new(id, Some(&id.to_uppercase()), Some(&file), loop_window)
}
