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
// Core audio mixing logic shared by the CPAL and mock devices.
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::looping::LoopingSource;
use super::{DeviceError, PlayRequest, PlaybackHandle};
use crate::playsync::CancelHandle;

/// Global atomic counter for generating unique source IDs.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Channel for handing new sources to the render side without taking a lock.
pub type SourceSender = crossbeam_channel::Sender<ActiveSource>;
pub type SourceReceiver = crossbeam_channel::Receiver<ActiveSource>;

/// A gain control private to one source. Stored as f32 bits so it can be changed from the
/// control side while the render side reads it.
#[derive(Clone, Debug)]
pub struct Gain(Arc<AtomicU32>);

impl Gain {
    pub fn new(value: f32) -> Self {
        Gain(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Represents an active audio source in the mixer.
pub struct ActiveSource {
    /// Unique ID for this source.
    pub id: u64,
    /// The looping source.
    pub source: LoopingSource,
    /// The source's private gain.
    pub gain: Gain,
    /// Cancel handle for this source.
    pub cancel_handle: CancelHandle,
    /// The mixer sample at which this source starts sounding.
    pub start_at_sample: u64,
}

/// The render side of the mixer. Owned by whatever drives the output (the CPAL callback or a
/// test), so rendering never contends on a lock.
pub struct AudioMixer {
    /// Active audio sources, including ones scheduled for the future.
    active_sources: Vec<ActiveSource>,
    /// Newly dispatched sources.
    source_rx: SourceReceiver,
    /// Number of output channels.
    num_channels: u16,
    /// Frames rendered so far, shared with the dispatch side.
    current_sample: Arc<AtomicU64>,
    /// Scratch frame reused for every rendered frame.
    frame: Vec<f32>,
}

impl AudioMixer {
    /// Creates a connected render side and dispatch side.
    pub fn new(num_channels: u16, sample_rate: u32) -> (AudioMixer, MixerHandle) {
        let (source_tx, source_rx) = crossbeam_channel::unbounded();
        let current_sample = Arc::new(AtomicU64::new(0));
        let num_channels = num_channels.max(1);

        (
            AudioMixer {
                active_sources: Vec::new(),
                source_rx,
                num_channels,
                current_sample: current_sample.clone(),
                frame: vec![0.0; num_channels as usize],
            },
            MixerHandle {
                source_tx,
                current_sample,
                sample_rate,
                num_channels,
                live: Arc::new(Mutex::new(Vec::new())),
            },
        )
    }

    /// Renders `num_frames` interleaved frames into `output`, which must hold at least
    /// `num_frames * num_channels` samples.
    pub fn process_into_output(&mut self, output: &mut [f32], num_frames: usize) {
        while let Ok(new_source) = self.source_rx.try_recv() {
            self.active_sources.push(new_source);
        }
        self.active_sources.retain(|source| !source.cancel_handle.is_cancelled());

        let channels = self.num_channels as usize;
        let base = self.current_sample.load(Ordering::Acquire);
        for (frame_index, out) in output
            .chunks_exact_mut(channels)
            .take(num_frames)
            .enumerate()
        {
            let now = base + frame_index as u64;
            self.frame.fill(0.0);
            for active in self.active_sources.iter_mut() {
                if now < active.start_at_sample {
                    continue;
                }
                active.source.mix_next_frame(&mut self.frame, active.gain.get());
            }
            out.copy_from_slice(&self.frame);
        }

        self.current_sample.fetch_add(num_frames as u64, Ordering::Release);
    }

    /// Processes multiple frames of audio mixing into a new buffer.
    pub fn process_frames(&mut self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames, num_frames);
        frames
    }

    /// Number of sources currently held, including scheduled ones.
    pub fn active_source_count(&self) -> usize {
        self.active_sources.len()
    }
}

/// The dispatch side of the mixer. Turns play requests into scheduled sources.
#[derive(Clone)]
pub struct MixerHandle {
    source_tx: SourceSender,
    current_sample: Arc<AtomicU64>,
    sample_rate: u32,
    num_channels: u16,
    /// Cancel handles of every dispatched source that hasn't been cancelled.
    live: Arc<Mutex<Vec<CancelHandle>>>,
}

impl MixerHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// The mixer's position in frames.
    pub fn current_sample(&self) -> u64 {
        self.current_sample.load(Ordering::Acquire)
    }

    /// Schedules a looping source to start `request.start_delay` after the current render position.
    pub fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, DeviceError> {
        let delay_samples =
            (request.start_delay.as_secs_f64() * self.sample_rate as f64).round() as u64;
        let start_at_sample = self.current_sample() + delay_samples;

        let id = SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let cancel_handle = CancelHandle::new();
        let gain = Gain::new(request.gain);
        let source = LoopingSource::new(request.audio, request.region);

        self.source_tx
            .send(ActiveSource {
                id,
                source,
                gain: gain.clone(),
                cancel_handle: cancel_handle.clone(),
                start_at_sample,
            })
            .map_err(|_| DeviceError::Disconnected)?;

        let mut live = self.live.lock();
        live.retain(|handle| !handle.is_cancelled());
        live.push(cancel_handle.clone());

        debug!(source_id = id, start_at_sample, "Source scheduled");
        Ok(PlaybackHandle::new(id, cancel_handle, gain))
    }

    /// Cancels every source this handle has dispatched. Returns how many were still live.
    pub fn stop_all(&self) -> usize {
        let mut live = self.live.lock();
        let stopped = live.iter().filter(|handle| handle.cancel()).count();
        live.clear();
        stopped
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::decode::DecodedAudio;
    use crate::audio::looping::LoopRegion;

    fn request(value: f32, frames: usize, start_delay: Duration) -> PlayRequest {
        let audio = DecodedAudio::new(vec![value; frames], 1, 10);
        PlayRequest {
            region: LoopRegion::full(&audio),
            audio,
            gain: 1.0,
            start_delay,
        }
    }

    #[test]
    fn test_basic_mixing() {
        let (mut mixer, handle) = AudioMixer::new(2, 10);
        handle.play(request(0.5, 4, Duration::ZERO)).unwrap();

        let frames = mixer.process_frames(2);
        assert_eq!(frames, vec![0.5, 0.5, 0.5, 0.5]);
        assert_eq!(handle.current_sample(), 2);
    }

    #[test]
    fn test_multiple_source_mixing() {
        let (mut mixer, handle) = AudioMixer::new(1, 10);
        handle.play(request(0.5, 4, Duration::ZERO)).unwrap();
        handle.play(request(0.25, 4, Duration::ZERO)).unwrap();

        let frames = mixer.process_frames(1);
        assert_eq!(frames, vec![0.75]);
    }

    #[test]
    fn test_scheduled_start() {
        let (mut mixer, handle) = AudioMixer::new(1, 10);
        // 10Hz, so 300ms is three frames.
        handle
            .play(request(1.0, 4, Duration::from_millis(300)))
            .unwrap();

        let frames = mixer.process_frames(5);
        assert_eq!(frames, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_cancel_before_start_never_sounds() {
        let (mut mixer, handle) = AudioMixer::new(1, 10);
        let playback = handle
            .play(request(1.0, 4, Duration::from_millis(200)))
            .unwrap();
        assert_eq!(mixer.process_frames(1), vec![0.0]);

        playback.stop().unwrap();
        assert_eq!(mixer.process_frames(4), vec![0.0; 4]);
        assert_eq!(mixer.active_source_count(), 0);
    }

    #[test]
    fn test_gain_change() {
        let (mut mixer, handle) = AudioMixer::new(1, 10);
        let playback = handle.play(request(1.0, 4, Duration::ZERO)).unwrap();
        assert_eq!(mixer.process_frames(1), vec![1.0]);

        playback.set_gain(0.25);
        assert_eq!(mixer.process_frames(1), vec![0.25]);
    }

    #[test]
    fn test_stop_all() {
        let (mut mixer, handle) = AudioMixer::new(1, 10);
        let first = handle.play(request(1.0, 4, Duration::ZERO)).unwrap();
        handle.play(request(1.0, 4, Duration::ZERO)).unwrap();
        first.stop().unwrap();

        assert_eq!(handle.stop_all(), 1);
        assert_eq!(mixer.process_frames(2), vec![0.0, 0.0]);
        assert_eq!(handle.stop_all(), 0);
    }
}
