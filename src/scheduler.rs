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

//! Aligns newly triggered loops to the running beat cycle.

use std::time::Duration;

use tracing::info;

use crate::audio::{Device, DeviceError, PlayRequest};
use crate::config;
use crate::rhythm::BeatClock;
use crate::samples::{Sample, Voice};

pub struct LoopScheduler {
    cycle: Duration,
    alignment_lead: Duration,
}

impl LoopScheduler {
    pub fn new(rhythm: &config::Rhythm) -> LoopScheduler {
        LoopScheduler {
            cycle: rhythm.cycle_duration(),
            alignment_lead: rhythm.alignment_lead(),
        }
    }

    /// How long to wait before a loop triggered at `now` starts sounding. An idle clock means
    /// the loop starts right away and becomes the phase reference. Otherwise the loop waits
    /// for the next cycle boundary, less the alignment lead.
    pub fn start_delay(&self, beat_clock: &BeatClock, now: Duration) -> Duration {
        if !beat_clock.is_running() {
            return Duration::ZERO;
        }
        let remaining = 1.0 - beat_clock.current_phase(now);
        let until_boundary =
            Duration::from_nanos((self.cycle.as_nanos() as f64 * remaining).round() as u64);
        until_boundary.saturating_sub(self.alignment_lead)
    }

    /// Starts a sample looping on the device, aligned to the beat clock, and returns the voice
    /// for the slot. The slot must already be empty.
    pub fn trigger(
        &self,
        device: &dyn Device,
        beat_clock: &BeatClock,
        slot: &str,
        sample: &Sample,
        now: Duration,
    ) -> Result<Voice, DeviceError> {
        let start_delay = self.start_delay(beat_clock, now);
        let handle = device.play(PlayRequest {
            audio: sample.audio().clone(),
            region: sample.region(),
            gain: sample.volume(),
            start_delay,
        })?;

        let voice = Voice::new(slot, sample.id(), now, start_delay, Some(handle));
        info!(
            voice = voice.id(),
            slot,
            sample = sample.id(),
            start_delay_ms = start_delay.as_millis(),
            "Voice started"
        );
        Ok(voice)
    }
}
