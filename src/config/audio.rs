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
use serde::{Deserialize, Serialize};

const DEFAULT_DEVICE: &str = "default";

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Audio {
    /// The audio device. "default" picks the system default; names starting with "mock"
    /// select the mock device.
    #[serde(default = "default_device")]
    device: String,

    /// Output sample rate in Hz. Defaults to the device's own rate.
    sample_rate: Option<u32>,
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

impl Default for Audio {
    fn default() -> Self {
        Audio::new(DEFAULT_DEVICE)
    }
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            sample_rate: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the requested sample rate, if any.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }
}
