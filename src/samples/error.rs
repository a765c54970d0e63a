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
use crate::audio::DecodeError;

/// Errors raised while resolving a sample.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("unknown sample {0}")]
    Unknown(String),

    #[error("unable to decode sample {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: DecodeError,
    },
}

/// Errors raised when stopping a voice. These are always benign.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StopError {
    #[error("voice {0} was already stopped")]
    AlreadyStopped(u64),

    #[error("playback for voice {0} was already stopped by the device")]
    DeviceStopped(u64),
}
