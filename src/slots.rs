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
use serde::Serialize;

use crate::samples::Voice;

/// What a slot is playing, for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotState {
    pub slot: String,
    pub sample: Option<String>,
}

/// The fixed set of slots and the voice bound to each.
pub struct Slots {
    slots: Vec<(String, Option<Voice>)>,
}

impl Slots {
    pub fn new(slot_ids: &[String]) -> Slots {
        Slots {
            slots: slot_ids.iter().map(|id| (id.clone(), None)).collect(),
        }
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.iter().any(|(id, _)| id == slot)
    }

    /// The voice playing in a slot.
    pub fn get(&self, slot: &str) -> Option<&Voice> {
        self.slots
            .iter()
            .find(|(id, _)| id == slot)
            .and_then(|(_, voice)| voice.as_ref())
    }

    /// Binds a voice to its slot. Any voice already there is stopped and released first.
    /// Returns false, dropping the voice, if the slot doesn't exist.
    pub fn attach(&mut self, voice: Voice) -> bool {
        let Some((_, entry)) = self.slots.iter_mut().find(|(id, _)| id == voice.slot()) else {
            return false;
        };
        if let Some(mut previous) = entry.take() {
            previous.stop();
        }
        *entry = Some(voice);
        true
    }

    /// Stops the voice in a slot and removes it. Returns the stopped voice.
    pub fn release(&mut self, slot: &str) -> Option<Voice> {
        let (_, entry) = self.slots.iter_mut().find(|(id, _)| id == slot)?;
        let mut voice = entry.take()?;
        voice.stop();
        Some(voice)
    }

    /// Stops every voice. Returns how many slots were playing.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (_, entry) in self.slots.iter_mut() {
            if let Some(mut voice) = entry.take() {
                voice.stop();
                released += 1;
            }
        }
        released
    }

    /// Number of slots holding a voice.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|(_, voice)| voice.is_some()).count()
    }

    /// The slot a sample is playing in, if any.
    pub fn slot_playing(&self, sample_id: &str) -> Option<&str> {
        self.voices()
            .find(|voice| voice.sample_id() == sample_id)
            .map(Voice::slot)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().filter_map(|(_, voice)| voice.as_ref())
    }

    /// Every slot in configuration order.
    pub fn snapshot(&self) -> Vec<SlotState> {
        self.slots
            .iter()
            .map(|(id, voice)| SlotState {
                slot: id.clone(),
                sample: voice.as_ref().map(|voice| voice.sample_id().to_string()),
            })
            .collect()
    }
}
