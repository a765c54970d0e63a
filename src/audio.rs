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
use std::{error::Error, fmt, sync::Arc, time::Duration};

use crate::config;
use crate::playsync::CancelHandle;

pub mod cpal;
pub mod decode;
pub mod looping;
pub mod mixer;
pub mod mock;
mod thread_priority;

pub use decode::{decode_bytes, DecodeError, DecodedAudio};
pub use looping::LoopRegion;
use mixer::Gain;

/// Errors raised by an output device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("the audio output is no longer running")]
    Disconnected,
}

/// The playback handle was already stopped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("playback {0} was already stopped")]
pub struct AlreadyStopped(pub u64);

/// Everything the device needs to start a looping source.
pub struct PlayRequest {
    /// The decoded audio, already at the device sample rate.
    pub audio: DecodedAudio,
    /// The repeating region.
    pub region: LoopRegion,
    /// Initial gain.
    pub gain: f32,
    /// How far in the future the source should start sounding.
    pub start_delay: Duration,
}

/// The live handle to a source playing on a device: its cancellation and its private gain.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    cancel_handle: CancelHandle,
    gain: Gain,
}

impl PlaybackHandle {
    pub(crate) fn new(id: u64, cancel_handle: CancelHandle, gain: Gain) -> Self {
        Self {
            id,
            cancel_handle,
            gain,
        }
    }

    /// The device's source ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if the source has been stopped, here or through `Device::stop_all`.
    pub fn is_stopped(&self) -> bool {
        self.cancel_handle.is_cancelled()
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
    }

    /// Stops the source immediately, including a source that hasn't started sounding yet.
    pub fn stop(&self) -> Result<(), AlreadyStopped> {
        if self.cancel_handle.cancel() {
            Ok(())
        } else {
            Err(AlreadyStopped(self.id))
        }
    }
}

/// An audio output that can play looping sources.
pub trait Device: fmt::Display + Send + Sync {
    /// The sample rate the device renders at. Audio handed to `play` must match it.
    fn sample_rate(&self) -> u32;

    /// Schedules a looping source.
    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, DeviceError>;

    /// Stops every source the device is playing. Returns how many were still live.
    fn stop_all(&self) -> usize;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn fmt::Display>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device for the given configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(
            device,
            config.sample_rate().unwrap_or(mock::DEFAULT_SAMPLE_RATE),
        )));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
