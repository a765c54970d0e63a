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

//! The beat clock: a fixed-period pulse over a cycle of beats.
//!
//! The clock doesn't own a timer. Whoever drives it asks for `next_tick_at` and calls `tick`
//! once that time has passed, so tests can drive it with a manual clock.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config;

/// Emitted once per beat while the clock runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TickEvent {
    /// The beat that just started.
    pub beat_index: u32,
    pub beats_per_cycle: u32,
    /// Clock time the tick fired at.
    #[serde(skip)]
    pub at: Duration,
}

/// A tick listener. Listeners run on the event queue and must not block.
pub type TickListener = Box<dyn FnMut(&TickEvent) + Send>;

pub struct BeatClock {
    beat_duration: Duration,
    beats_per_cycle: u32,
    running: bool,
    beat_index: u32,
    /// When the current beat started.
    last_tick_at: Duration,
    next_tick_at: Duration,
    listeners: Vec<TickListener>,
}

impl BeatClock {
    pub fn new(rhythm: &config::Rhythm) -> BeatClock {
        BeatClock {
            beat_duration: rhythm.beat_duration(),
            beats_per_cycle: rhythm.beats_per_cycle().max(1),
            running: false,
            beat_index: 0,
            last_tick_at: Duration::ZERO,
            next_tick_at: Duration::ZERO,
            listeners: Vec::new(),
        }
    }

    /// Starts ticking from beat 0 at `now`. Returns false if the clock was already running.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.beat_index = 0;
        self.last_tick_at = now;
        self.next_tick_at = now + self.beat_duration;
        info!(
            beats_per_cycle = self.beats_per_cycle,
            beat_ms = self.beat_duration.as_millis(),
            "Beat clock started"
        );
        true
    }

    /// Halts the clock and resets to beat 0. Returns false if the clock was already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.beat_index = 0;
        info!("Beat clock stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_beat_index(&self) -> u32 {
        self.beat_index
    }

    pub fn beats_per_cycle(&self) -> u32 {
        self.beats_per_cycle
    }

    /// The elapsed fraction of the current cycle, from the beat index and the time since the
    /// last tick. Zero while stopped.
    pub fn current_phase(&self, now: Duration) -> f64 {
        if !self.running {
            return 0.0;
        }
        let elapsed = now.saturating_sub(self.last_tick_at).as_secs_f64();
        let within_beat = (elapsed / self.beat_duration.as_secs_f64()).clamp(0.0, 1.0);
        ((self.beat_index as f64 + within_beat) / self.beats_per_cycle as f64).clamp(0.0, 1.0)
    }

    /// When the next tick is due, if the clock is running.
    pub fn next_tick_at(&self) -> Option<Duration> {
        self.running.then_some(self.next_tick_at)
    }

    /// Fires the tick if it's due. A late tick fires once; missed beats are not replayed.
    pub fn tick(&mut self, now: Duration) -> Option<TickEvent> {
        if !self.running || now < self.next_tick_at {
            return None;
        }

        let deadline = self.next_tick_at;
        if deadline + self.beat_duration > now {
            self.last_tick_at = deadline;
            self.next_tick_at = deadline + self.beat_duration;
        } else {
            // More than a beat late: restart the grid from here.
            self.last_tick_at = now;
            self.next_tick_at = now + self.beat_duration;
        }
        self.beat_index = (self.beat_index + 1) % self.beats_per_cycle;

        let event = TickEvent {
            beat_index: self.beat_index,
            beats_per_cycle: self.beats_per_cycle,
            at: now,
        };
        debug!(beat_index = event.beat_index, "Beat tick");
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        Some(event)
    }

    /// Registers a listener invoked on every tick.
    pub fn on_tick(&mut self, listener: TickListener) {
        self.listeners.push(listener);
    }
}

impl fmt::Debug for BeatClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeatClock")
            .field("running", &self.running)
            .field("beat_index", &self.beat_index)
            .field("beats_per_cycle", &self.beats_per_cycle)
            .field("next_tick_at", &self.next_tick_at)
            .finish()
    }
}
