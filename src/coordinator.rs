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

//! The mixer coordinator. Owns the slots, the beat clock and the sample store, and is the only
//! thing that mutates them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::{Device, DeviceError};
use crate::clock::Clock;
use crate::config;
use crate::rhythm::{BeatClock, TickEvent, TickListener};
use crate::samples::{SampleError, SampleStore, Voice};
use crate::scheduler::LoopScheduler;
use crate::slots::{SlotState, Slots};

/// Why an assignment didn't happen. A sample that fails to decode and a device error leave the
/// slot empty; every other case leaves it as it was.
#[derive(Debug, thiserror::Error)]
pub enum AssignError {
    #[error("unknown slot {0}")]
    UnknownSlot(String),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("sample {sample} is already playing in slot {slot}")]
    SampleInUse { sample: String, slot: String },

    #[error("unable to start playback: {0}")]
    Device(#[from] DeviceError),
}

/// Rhythm portion of the mixer state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RhythmState {
    pub running: bool,
    pub current_beat_index: u32,
    pub beats_per_cycle: u32,
}

/// A catalog entry as shown to the display layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
    pub in_use: bool,
}

/// Read-only view of the mixer for the display layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixerSnapshot {
    pub slots: Vec<SlotState>,
    pub rhythm: RhythmState,
    pub samples: Vec<CatalogEntry>,
}

impl MixerSnapshot {
    /// The sample playing in a slot.
    pub fn sample_in(&self, slot: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|state| state.slot == slot)
            .and_then(|state| state.sample.as_deref())
    }
}

pub struct Coordinator {
    clock: Arc<dyn Clock>,
    device: Arc<dyn Device>,
    store: SampleStore,
    scheduler: LoopScheduler,
    beat_clock: BeatClock,
    slots: Slots,
}

impl Coordinator {
    /// Creates a coordinator. Samples are decoded at the device's sample rate on first use.
    pub fn new(
        config: &config::Mixer,
        base_path: &Path,
        device: Arc<dyn Device>,
        clock: Arc<dyn Clock>,
    ) -> Coordinator {
        Coordinator {
            store: SampleStore::new(config.samples().to_vec(), base_path, device.sample_rate()),
            scheduler: LoopScheduler::new(config.rhythm()),
            beat_clock: BeatClock::new(config.rhythm()),
            slots: Slots::new(config.slots()),
            clock,
            device,
        }
    }

    /// Assigns a sample to a slot, replacing whatever the slot was playing. Failures are logged.
    pub fn assign(&mut self, slot: &str, sample_id: &str) {
        if let Err(e) = self.try_assign(slot, sample_id) {
            warn!(slot, sample = sample_id, err = %e, "Assignment ignored");
        }
    }

    /// Assigns a sample to a slot, reporting why it didn't happen.
    pub fn try_assign(&mut self, slot: &str, sample_id: &str) -> Result<(), AssignError> {
        if !self.slots.contains(slot) {
            return Err(AssignError::UnknownSlot(slot.to_string()));
        }
        if let Some(playing_in) = self.slots.slot_playing(sample_id) {
            if playing_in != slot {
                return Err(AssignError::SampleInUse {
                    sample: sample_id.to_string(),
                    slot: playing_in.to_string(),
                });
            }
        }

        // An unknown ID leaves the slot alone. A sample that won't decode still empties it.
        let sample = match self.store.resolve(sample_id) {
            Ok(sample) => sample,
            Err(e @ SampleError::Unknown(_)) => return Err(e.into()),
            Err(e) => {
                if self.slots.release(slot).is_some() {
                    info!(slot, sample = sample_id, "Slot emptied by failed assignment");
                }
                self.reconcile_rhythm(self.clock.now());
                return Err(e.into());
            }
        };

        if let Some(previous) = self.slots.release(slot) {
            info!(
                slot,
                previous = previous.sample_id(),
                sample = sample_id,
                "Replacing voice"
            );
        }

        // A beat that's due has to land before the phase is read.
        let now = self.clock.now();
        self.beat_clock.tick(now);
        let result = self
            .scheduler
            .trigger(self.device.as_ref(), &self.beat_clock, slot, &sample, now);
        let outcome = match result {
            Ok(voice) => {
                self.slots.attach(voice);
                Ok(())
            }
            Err(e) => Err(AssignError::Device(e)),
        };
        self.reconcile_rhythm(now);
        outcome
    }

    /// Stops and empties a slot. Returns true if the slot was playing.
    pub fn clear(&mut self, slot: &str) -> bool {
        if !self.slots.contains(slot) {
            warn!(slot, "Clear of unknown slot ignored");
            return false;
        }
        let cleared = self.slots.release(slot).is_some();
        if cleared {
            info!(slot, "Slot cleared");
        } else {
            debug!(slot, "Slot was already empty");
        }
        self.reconcile_rhythm(self.clock.now());
        cleared
    }

    /// Stops every voice and idles the rhythm.
    pub fn stop_all(&mut self) {
        let released = self.slots.release_all();
        info!(released, "Stopping all voices");
        self.reconcile_rhythm(self.clock.now());
    }

    /// The current state for display.
    pub fn state(&self) -> MixerSnapshot {
        MixerSnapshot {
            slots: self.slots.snapshot(),
            rhythm: RhythmState {
                running: self.beat_clock.is_running(),
                current_beat_index: self.beat_clock.current_beat_index(),
                beats_per_cycle: self.beat_clock.beats_per_cycle(),
            },
            samples: self
                .store
                .catalog()
                .iter()
                .map(|definition| CatalogEntry {
                    id: definition.id().to_string(),
                    label: definition.label().to_string(),
                    in_use: self.slots.slot_playing(definition.id()).is_some(),
                })
                .collect(),
        }
    }

    /// The voice playing in a slot.
    pub fn voice(&self, slot: &str) -> Option<&Voice> {
        self.slots.get(slot)
    }

    /// Changes the gain of the voice in a slot. Returns false if the slot is empty.
    pub fn set_volume(&mut self, slot: &str, volume: f32) -> bool {
        match self.slots.get(slot) {
            Some(voice) => {
                voice.set_volume(volume);
                true
            }
            None => false,
        }
    }

    /// Elapsed fraction of the current cycle.
    pub fn current_phase(&self) -> f64 {
        self.beat_clock.current_phase(self.clock.now())
    }

    /// Registers a listener invoked on every beat tick.
    pub fn on_tick(&mut self, listener: TickListener) {
        self.beat_clock.on_tick(listener);
    }

    /// When the next beat tick is due. None while the rhythm is idle.
    pub fn next_tick_at(&self) -> Option<Duration> {
        self.beat_clock.next_tick_at()
    }

    /// Fires the beat tick if it's due.
    pub fn tick(&mut self) -> Option<TickEvent> {
        self.beat_clock.tick(self.clock.now())
    }

    /// Starts the rhythm when the first voice appears and idles it when the last one goes.
    fn reconcile_rhythm(&mut self, now: Duration) {
        let active = self.slots.active_count();
        if active > 0 {
            self.beat_clock.start(now);
        } else if self.beat_clock.stop() {
            let lingering = self.device.stop_all();
            if lingering > 0 {
                info!(lingering, "Stopped lingering playback");
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.slots.release_all();
        self.device.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::mock;
    use crate::clock::ManualClock;
    use crate::config::{Audio, LoopWindow, Rhythm, SampleDefinition};
    use crate::testutil::constant_sample;

    const RATE: u32 = 1000;

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        device: Arc<mock::Device>,
        coordinator: Coordinator,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![
            constant_sample(dir.path(), "drum", 0.5, 10.0, RATE, Some(LoopWindow::new(0.5, 8.5))),
            constant_sample(dir.path(), "piano", 0.25, 8.0, RATE, None),
            SampleDefinition::new("trumpet", Some("TRUMPET"), None, None),
        ];
        let config = config::Mixer::new(
            Audio::new("mock"),
            Rhythm::default(),
            vec!["char1".into(), "char2".into()],
            samples,
        );
        let clock = Arc::new(ManualClock::new());
        let device = Arc::new(mock::Device::get("mock", RATE));
        let coordinator = Coordinator::new(&config, dir.path(), device.clone(), clock.clone());
        Fixture {
            _dir: dir,
            clock,
            device,
            coordinator,
        }
    }

    #[test]
    fn test_assign_starts_rhythm() {
        let mut f = fixture();
        f.coordinator.try_assign("char1", "drum").unwrap();

        let state = f.coordinator.state();
        assert!(state.rhythm.running);
        assert_eq!(state.rhythm.current_beat_index, 0);
        assert_eq!(state.sample_in("char1"), Some("drum"));
        assert_eq!(f.coordinator.current_phase(), 0.0);
        assert_eq!(f.coordinator.next_tick_at(), Some(Duration::from_secs(1)));

        let played = f.device.played();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].start_delay, Duration::ZERO);
        assert_eq!(played[0].region.start, 500);
        assert_eq!(played[0].region.end, 8500);
    }

    #[test]
    fn test_clear_last_slot_idles() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        f.clock.set(Duration::from_secs(3));
        f.coordinator.tick();
        assert_eq!(f.coordinator.state().rhythm.current_beat_index, 1);

        assert!(f.coordinator.clear("char1"));
        let state = f.coordinator.state();
        assert!(!state.rhythm.running);
        assert_eq!(state.rhythm.current_beat_index, 0);
        assert_eq!(state.sample_in("char1"), None);
        assert_eq!(f.coordinator.next_tick_at(), None);

        // Clearing an empty slot is harmless.
        assert!(!f.coordinator.clear("char1"));
        assert!(!f.coordinator.clear("nowhere"));
    }

    #[test]
    fn test_unknown_sample_leaves_state() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        let before = f.coordinator.state();

        assert!(matches!(
            f.coordinator.try_assign("char1", "kazoo"),
            Err(AssignError::Sample(SampleError::Unknown(_)))
        ));
        assert_eq!(f.coordinator.state(), before);
        assert!(f.coordinator.voice("char1").is_some_and(Voice::is_live));
    }

    #[test]
    fn test_decode_failure_empties_slot() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        f.coordinator.assign("char2", "piano");
        f.device.render(1000);
        f.clock.set(Duration::from_secs(1));

        assert!(matches!(
            f.coordinator.try_assign("char1", "trumpet"),
            Err(AssignError::Sample(SampleError::Decode { .. }))
        ));
        let state = f.coordinator.state();
        assert_eq!(state.sample_in("char1"), None);
        assert!(state.rhythm.running);
        assert_eq!(f.device.played().len(), 2);

        f.device.render(1);
        assert_eq!(f.device.active_source_count(), 1);
    }

    #[test]
    fn test_decode_failure_on_last_slot_idles_rhythm() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        f.device.render(1000);
        f.clock.set(Duration::from_secs(1));

        f.coordinator.assign("char1", "trumpet");
        let state = f.coordinator.state();
        assert_eq!(state.sample_in("char1"), None);
        assert!(!state.rhythm.running);
        assert_eq!(state.rhythm.current_beat_index, 0);
        assert_eq!(f.device.render(1), vec![0.0, 0.0]);
    }

    #[test]
    fn test_assign_fires_overdue_tick_before_aligning() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        for beat in 1..8 {
            f.clock.set(Duration::from_secs(beat));
            f.coordinator.tick();
        }
        assert_eq!(f.coordinator.state().rhythm.current_beat_index, 7);

        // The boundary tick at 8s is due but hasn't been delivered yet.
        f.clock.set(Duration::from_millis(8050));
        f.coordinator.try_assign("char2", "piano").unwrap();

        assert_eq!(f.coordinator.state().rhythm.current_beat_index, 0);
        assert_eq!(f.coordinator.next_tick_at(), Some(Duration::from_secs(9)));
        assert_eq!(f.device.played()[1].start_delay, Duration::from_millis(7550));
    }

    #[test]
    fn test_unknown_slot() {
        let mut f = fixture();
        assert!(matches!(
            f.coordinator.try_assign("char9", "drum"),
            Err(AssignError::UnknownSlot(_))
        ));
        assert!(!f.coordinator.state().rhythm.running);
    }

    #[test]
    fn test_sample_in_use() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        assert!(matches!(
            f.coordinator.try_assign("char2", "drum"),
            Err(AssignError::SampleInUse { ref slot, .. }) if slot == "char1"
        ));
        assert_eq!(f.coordinator.state().sample_in("char2"), None);

        // Same slot is a replace.
        f.coordinator.try_assign("char1", "drum").unwrap();
        assert_eq!(f.device.played().len(), 2);

        let state = f.coordinator.state();
        let drum = state.samples.iter().find(|entry| entry.id == "drum").unwrap();
        assert!(drum.in_use);
        let piano = state.samples.iter().find(|entry| entry.id == "piano").unwrap();
        assert!(!piano.in_use);
        assert_eq!(piano.label, "PIANO");
    }

    #[test]
    fn test_replace_only_voice_keeps_rhythm() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        f.clock.set(Duration::from_secs(1));
        f.coordinator.tick();
        f.clock.set(Duration::from_millis(1500));

        let first = f.coordinator.voice("char1").and_then(Voice::source_id);
        f.coordinator.try_assign("char1", "piano").unwrap();

        let state = f.coordinator.state();
        assert!(state.rhythm.running);
        assert_eq!(state.rhythm.current_beat_index, 1);
        assert_eq!(state.sample_in("char1"), Some("piano"));
        assert_ne!(f.coordinator.voice("char1").and_then(Voice::source_id), first);

        // Phase 0.1875, so 6.5s to the boundary less the lead.
        assert_eq!(f.device.played()[1].start_delay, Duration::from_millis(6100));
    }

    #[test]
    fn test_stop_all() {
        let mut f = fixture();
        f.coordinator.assign("char1", "drum");
        f.coordinator.assign("char2", "piano");
        f.device.render(10);
        assert_eq!(f.device.active_source_count(), 2);

        f.coordinator.stop_all();
        assert!(!f.coordinator.state().rhythm.running);
        f.device.render(10);
        assert_eq!(f.device.active_source_count(), 0);
    }

    #[test]
    fn test_set_volume() {
        let mut f = fixture();
        f.coordinator.assign("char2", "piano");
        assert!(f.coordinator.set_volume("char2", 0.5));
        assert_eq!(f.coordinator.voice("char2").map(Voice::volume), Some(0.5));
        assert!(!f.coordinator.set_volume("char1", 0.5));
    }
}
