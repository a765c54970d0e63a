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
use super::decode::DecodedAudio;

/// The repeating region of a buffer, in frames. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    pub start: usize,
    pub end: usize,
}

impl LoopRegion {
    /// The whole buffer.
    pub fn full(audio: &DecodedAudio) -> Self {
        LoopRegion {
            start: 0,
            end: audio.frames(),
        }
    }

    /// Length of one repetition in frames.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plays a shared buffer forever. Playback begins at frame zero, runs until the end of the
/// loop region and then jumps back to the region's start, so a lead-in before the region is
/// heard exactly once.
pub struct LoopingSource {
    audio: DecodedAudio,
    region: LoopRegion,
    position: usize,
}

impl LoopingSource {
    /// Creates a new looping source. An empty or out of range region falls back to the whole
    /// buffer.
    pub fn new(audio: DecodedAudio, region: LoopRegion) -> Self {
        let frames = audio.frames();
        let region = if region.is_empty() || region.end > frames {
            LoopRegion::full(&audio)
        } else {
            region
        };

        Self {
            audio,
            region,
            position: 0,
        }
    }

    /// The frame that will be rendered next.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Adds the next frame into `out`, scaled by `gain`. Output channels beyond the source's
    /// channel count repeat the source channels, so mono loops land on every output.
    #[inline]
    pub fn mix_next_frame(&mut self, out: &mut [f32], gain: f32) {
        if self.region.is_empty() {
            return;
        }

        let channels = self.audio.channel_count() as usize;
        let base = self.position * channels;
        let data = self.audio.data();
        for (index, sample) in out.iter_mut().enumerate() {
            *sample += data[base + index % channels] * gain;
        }

        self.position += 1;
        if self.position >= self.region.end {
            self.position = self.region.start;
        }
    }
}
