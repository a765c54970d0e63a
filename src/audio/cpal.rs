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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::mixer::{AudioMixer, MixerHandle};
use super::thread_priority::{callback_thread_priority, configure_audio_thread_priority};
use super::{DeviceError, PlayRequest, PlaybackHandle};
use crate::config;

/// A listed output device.
struct Listing {
    name: String,
    max_channels: u16,
    host_id: cpal::HostId,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A cpal output device with a running stream. The stream lives on its own thread and renders
/// the mixer directly from the callback.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// Dispatch side of the mixer rendered by the stream.
    handle: MixerHandle,
    /// Tells the output thread to drop the stream.
    shutdown: Arc<AtomicBool>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Option<thread::JoinHandle<()>>,
}

/// Output callback: render the mixer as f32 and convert to the stream's sample type.
fn create_callback<T>(
    mut mixer: AudioMixer,
    num_channels: usize,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let priority = callback_thread_priority();
    let mut priority_set = false;
    let mut scratch: Vec<f32> = Vec::new();

    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        configure_audio_thread_priority(priority, &mut priority_set);

        let num_frames = data.len() / num_channels;
        if scratch.len() < data.len() {
            scratch.resize(data.len(), 0.0);
        }
        mixer.process_into_output(&mut scratch[..data.len()], num_frames);

        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: AudioMixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device.build_output_stream(
        config,
        create_callback::<T>(mixer, config.channels as usize),
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<Box<dyn fmt::Display>>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Listing> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs.map(|c| c.channels()).max().unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Listing {
                        name: device.name()?,
                        max_channels,
                        host_id,
                    });
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices
            .into_iter()
            .map(|device| Box::new(device) as Box<dyn fmt::Display>)
            .collect())
    }

    /// Finds a cpal output device by name. "default" picks the default host's default output.
    fn find(name: &str) -> Result<(cpal::Device, cpal::HostId), Box<dyn Error>> {
        let _shh_stderr = shh::stderr()?;

        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            return Ok((device, host.id()));
        }

        for host_id in cpal::available_hosts() {
            let Ok(devices) = cpal::host_from_id(host_id)?.output_devices() else {
                continue;
            };
            for device in devices {
                if device.name().is_ok_and(|n| n.trim() == name) {
                    return Ok((device, host_id));
                }
            }
        }

        Err(format!("no device found with name {}", name).into())
    }

    /// Gets the given cpal device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let (device, host_id) = Device::find(config.device())?;
        let name = device.name()?;

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let mut stream_config: cpal::StreamConfig = supported.into();
        if let Some(sample_rate) = config.sample_rate() {
            stream_config.sample_rate = sample_rate;
        }
        let sample_rate: u32 = stream_config.sample_rate;

        let (mixer, handle) = AudioMixer::new(stream_config.channels, sample_rate);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        // cpal streams can't always cross threads, so the stream is built and kept on this one.
        let output_thread = {
            let shutdown = shutdown.clone();
            let name = name.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "output stream (cpal)");
                let _enter = span.enter();

                let stream = match sample_format {
                    cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer),
                    cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer),
                    cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, mixer),
                    cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer),
                    other => {
                        let _ = ready_tx.send(Err(format!("unsupported sample format {}", other)));
                        return;
                    }
                };

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("failed to create stream: {}", e)));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(format!("failed to start stream: {}", e)));
                    return;
                }

                info!(device = name, sample_rate, "CPAL output stream started");
                let _ = ready_tx.send(Ok(()));

                while !shutdown.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(100));
                }
                info!(device = name, "CPAL output stream stopped");
            })
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err("output thread exited before the stream started".into()),
        }

        Ok(Device {
            name,
            host_id,
            handle,
            shutdown,
            output_thread: Some(output_thread),
        })
    }
}

impl super::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }

    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, DeviceError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(DeviceError::Disconnected);
        }
        self.handle.play(request)
    }

    fn stop_all(&self) -> usize {
        self.handle.stop_all()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.handle.stop_all();
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.handle.num_channels(),
            self.host_id.name()
        )
    }
}
