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

//! Loop samples and the voices that play them.
//!
//! This module provides:
//! - The sample store: lazy decoding and caching of catalog entries
//! - Voices: one live, looping playback bound to a slot

mod error;
mod store;
mod voice;

pub use error::{SampleError, StopError};
pub use store::{Sample, SampleStore};
pub use voice::Voice;
