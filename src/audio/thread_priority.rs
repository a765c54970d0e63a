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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority for the audio callback thread when LOOPMIX_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

/// Reads LOOPMIX_THREAD_PRIORITY (0-99) once, before the stream is built.
pub fn callback_thread_priority() -> Option<ThreadPriorityValue> {
    let requested = std::env::var("LOOPMIX_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(requested).ok()
}

/// Raises the priority of the calling thread once. Called from inside the audio callback,
/// since that's the only place we run on the backend's thread.
pub fn configure_audio_thread_priority(
    priority: Option<ThreadPriorityValue>,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    *priority_set = true;

    let Some(priority) = priority else {
        return;
    };
    match set_current_thread_priority(ThreadPriority::Crossplatform(priority)) {
        Ok(()) => info!("Raised audio callback thread priority"),
        Err(e) => warn!(error = ?e, "Failed to raise audio callback thread priority"),
    }
}
