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
use std::{fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::info;

use super::looping::LoopRegion;
use super::mixer::{AudioMixer, MixerHandle};
use super::{DeviceError, PlayRequest, PlaybackHandle};

/// Sample rate used when the configuration doesn't name one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// A record of one play request made to the mock device.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayRecord {
    pub source_id: u64,
    pub start_delay: Duration,
    pub region: LoopRegion,
    pub gain: f32,
}

/// A mock device. Nothing is sent to hardware; the mixer is rendered on demand with `render`,
/// and every request is recorded.
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: Arc<Mutex<AudioMixer>>,
    handle: MixerHandle,
    played: Arc<Mutex<Vec<PlayRecord>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, sample_rate: u32) -> Device {
        let (mixer, handle) = AudioMixer::new(2, sample_rate);
        Device {
            name: name.to_string(),
            mixer: Arc::new(Mutex::new(mixer)),
            handle,
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Renders the given number of frames, as the audio callback would.
    pub fn render(&self, num_frames: usize) -> Vec<f32> {
        self.mixer.lock().process_frames(num_frames)
    }

    /// Sources held by the mixer as of the last render.
    pub fn active_source_count(&self) -> usize {
        self.mixer.lock().active_source_count()
    }

    /// Every request made so far, in order.
    pub fn played(&self) -> Vec<PlayRecord> {
        self.played.lock().clone()
    }
}

impl super::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }

    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, DeviceError> {
        let start_delay = request.start_delay;
        let region = request.region;
        let gain = request.gain;
        let playback = self.handle.play(request)?;

        info!(
            device = self.name,
            source_id = playback.id(),
            start_delay_ms = start_delay.as_millis(),
            "Playing loop (mock)."
        );
        self.played.lock().push(PlayRecord {
            source_id: playback.id(),
            start_delay,
            region,
            gain,
        });
        Ok(playback)
    }

    fn stop_all(&self) -> usize {
        self.handle.stop_all()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
