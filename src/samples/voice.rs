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
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use super::error::StopError;
use crate::audio::PlaybackHandle;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A looping sample bound to a slot.
#[derive(Debug)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The slot this voice plays in.
    slot: String,
    /// The sample being played.
    sample_id: String,
    /// Clock time the voice was triggered.
    started_at: Duration,
    /// How long after `started_at` the audio starts sounding.
    start_delay: Duration,
    /// The live playback. Taken when the voice stops.
    handle: Option<PlaybackHandle>,
}

impl Voice {
    /// Creates a voice around a playback that has already been scheduled.
    pub fn new(
        slot: &str,
        sample_id: &str,
        started_at: Duration,
        start_delay: Duration,
        handle: Option<PlaybackHandle>,
    ) -> Self {
        Self {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            slot: slot.to_string(),
            sample_id: sample_id.to_string(),
            started_at,
            start_delay,
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }

    /// Clock time the audio is scheduled to become audible.
    pub fn audible_at(&self) -> Duration {
        self.started_at + self.start_delay
    }

    /// True while the voice holds a playback that hasn't been stopped.
    pub fn is_live(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_stopped())
    }

    /// The device source ID, while the voice holds a playback.
    pub fn source_id(&self) -> Option<u64> {
        self.handle.as_ref().map(PlaybackHandle::id)
    }

    /// The current gain, or zero once stopped.
    pub fn volume(&self) -> f32 {
        self.handle.as_ref().map_or(0.0, PlaybackHandle::gain)
    }

    /// Changes the gain of a playing voice. Clamped to 0.0..=1.0.
    pub fn set_volume(&self, volume: f32) {
        if let Some(handle) = &self.handle {
            handle.set_gain(volume.clamp(0.0, 1.0));
        }
    }

    /// Stops the playback and releases its handle. Scheduled audio that hasn't started yet
    /// never sounds. Stopping twice, or stopping a playback the device already dropped,
    /// reports a `StopError`.
    pub fn try_stop(&mut self) -> Result<(), StopError> {
        let handle = self.handle.take().ok_or(StopError::AlreadyStopped(self.id))?;
        handle
            .stop()
            .map_err(|_| StopError::DeviceStopped(self.id))?;
        info!(
            voice = self.id,
            slot = self.slot,
            sample = self.sample_id,
            "Voice stopped"
        );
        Ok(())
    }

    /// Stops the voice. Always safe to call; a voice that's already stopped is logged and
    /// otherwise ignored.
    pub fn stop(&mut self) {
        if let Err(e) = self.try_stop() {
            debug!(err = %e, slot = self.slot, "Ignoring stop of inactive voice");
        }
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mixer::Gain;
    use crate::playsync::CancelHandle;

    fn playback() -> (PlaybackHandle, CancelHandle) {
        let cancel_handle = CancelHandle::new();
        let handle = PlaybackHandle::new(7, cancel_handle.clone(), Gain::new(1.0));
        (handle, cancel_handle)
    }

    fn voice_with(handle: Option<PlaybackHandle>) -> Voice {
        Voice::new("char1", "sound1", Duration::ZERO, Duration::ZERO, handle)
    }

    #[test]
    fn test_stop_twice() {
        let (handle, cancel_handle) = playback();
        let mut voice = voice_with(Some(handle));
        assert!(voice.is_live());

        assert_eq!(voice.try_stop(), Ok(()));
        assert!(cancel_handle.is_cancelled());
        assert!(!voice.is_live());
        assert_eq!(voice.try_stop(), Err(StopError::AlreadyStopped(voice.id())));

        // The infallible form is a no-op now.
        voice.stop();
    }

    #[test]
    fn test_stop_after_device_stopped_everything() {
        let (handle, cancel_handle) = playback();
        let mut voice = voice_with(Some(handle));
        cancel_handle.cancel();

        assert!(!voice.is_live());
        assert_eq!(voice.try_stop(), Err(StopError::DeviceStopped(voice.id())));
    }

    #[test]
    fn test_never_started() {
        let mut voice = voice_with(None);
        assert!(!voice.is_live());
        assert!(voice.try_stop().is_err());
    }

    #[test]
    fn test_volume() {
        let (handle, _) = playback();
        let voice = voice_with(Some(handle));
        assert_eq!(voice.volume(), 1.0);

        voice.set_volume(0.25);
        assert_eq!(voice.volume(), 0.25);
        voice.set_volume(3.0);
        assert_eq!(voice.volume(), 1.0);
    }

    #[test]
    fn test_drop_stops() {
        let (handle, cancel_handle) = playback();
        let voice = Voice::new(
            "char1",
            "sound1",
            Duration::from_secs(2),
            Duration::from_millis(500),
            Some(handle),
        );
        assert_eq!(voice.audible_at(), Duration::from_millis(2500));
        drop(voice);
        assert!(cancel_handle.is_cancelled());
    }
}
