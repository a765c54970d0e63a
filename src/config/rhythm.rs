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
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

const DEFAULT_CYCLE_DURATION_MS: u64 = 8000;
const DEFAULT_BEATS_PER_CYCLE: u32 = 8;
const DEFAULT_ALIGNMENT_LEAD_SECONDS: f64 = 0.4;

/// A YAML representation of the fixed rhythmic grid.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct Rhythm {
    /// Length of one cycle. Every loop repeats on this period.
    cycle_duration_ms: u64,

    /// Beats the cycle is divided into.
    beats_per_cycle: u32,

    /// Subtracted from computed start delays to absorb scheduling latency.
    alignment_lead_seconds: f64,
}

impl Default for Rhythm {
    fn default() -> Self {
        Rhythm {
            cycle_duration_ms: DEFAULT_CYCLE_DURATION_MS,
            beats_per_cycle: DEFAULT_BEATS_PER_CYCLE,
            alignment_lead_seconds: DEFAULT_ALIGNMENT_LEAD_SECONDS,
        }
    }
}

impl Rhythm {
    /// New will create a new rhythm configuration.
    pub fn new(cycle_duration_ms: u64, beats_per_cycle: u32, alignment_lead_seconds: f64) -> Self {
        Rhythm {
            cycle_duration_ms,
            beats_per_cycle,
            alignment_lead_seconds,
        }
    }

    pub fn cycle_duration(&self) -> Duration {
        Duration::from_millis(self.cycle_duration_ms)
    }

    pub fn beats_per_cycle(&self) -> u32 {
        self.beats_per_cycle
    }

    /// Time between two beat ticks.
    pub fn beat_duration(&self) -> Duration {
        self.cycle_duration() / self.beats_per_cycle.max(1)
    }

    /// Rounded to the nanosecond. Invalid leads count as zero.
    pub fn alignment_lead(&self) -> Duration {
        if !self.alignment_lead_seconds.is_finite() || self.alignment_lead_seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.alignment_lead_seconds * 1e9).round() as u64)
    }

    /// Rejects grids that can't tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "cycle_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.beats_per_cycle == 0 {
            return Err(ConfigError::Invalid(
                "beats_per_cycle must be greater than zero".to_string(),
            ));
        }
        if !self.alignment_lead_seconds.is_finite() || self.alignment_lead_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "alignment_lead_seconds must be a non-negative number, got {}",
                self.alignment_lead_seconds
            )));
        }
        Ok(())
    }
}
