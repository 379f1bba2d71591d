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
    fmt,
    thread::{self, JoinHandle},
};

#[cfg(test)]
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use tracing::{error, info};

use super::mixer::{self, Mixer, MixerHandle};
use super::{AudioError, ScheduledVoice};
use crate::config;

/// A summary of an output device, used for listing.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// A cpal output device. The stream lives on its own thread for as long as
/// the device does.
pub struct Device {
    name: String,
    handle: MixerHandle,
    /// Dropping this ends the stream thread.
    shutdown: Option<Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("channels", &self.handle.channels())
            .field("sample_rate", &self.handle.sample_rate())
            .finish()
    }
}

/// Renders the mixer into a scratch f32 buffer and converts it into the
/// device's sample type.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() != data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                mixer.process_into(&mut scratch);
                for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(src);
                }
            },
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<DeviceInfo>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout().map_err(|e| AudioError::Device(e.to_string()))?;
        let _shh_stderr = shh::stderr().map_err(|e| AudioError::Device(e.to_string()))?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    error!(err = e.to_string(), host = host_id.name(), "Host unavailable");
                    continue;
                }
            };
            let host_devices = match host.output_devices() {
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
                let Ok(configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
                if max_channels == 0 {
                    continue;
                }

                devices.push(DeviceInfo {
                    name: device
                        .name()
                        .map_err(|e| AudioError::Device(e.to_string()))?,
                    host: host_id.name().to_string(),
                    max_channels,
                });
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Opens the named output device ("default" for the host default) and
    /// starts its stream.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let name = config.device().to_string();
        let host = cpal::default_host();
        let device = if name == "default" {
            host.default_output_device()
        } else {
            host.output_devices()
                .map_err(|e| AudioError::Device(e.to_string()))?
                .find(|device| {
                    device
                        .name()
                        .map(|device_name| device_name.trim() == name)
                        .unwrap_or(false)
                })
        }
        .ok_or_else(|| AudioError::NoDevice(name.clone()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        let sample_format = supported.sample_format();
        let mut stream_config = supported.config();
        if let Some(sample_rate) = config.sample_rate() {
            stream_config.sample_rate = cpal::SampleRate(sample_rate);
        }
        if let Some(buffer_size) = config.buffer_size() {
            stream_config.buffer_size = cpal::BufferSize::Fixed(buffer_size);
        }

        let (mixer, handle) = mixer::mixer(stream_config.channels, stream_config.sample_rate.0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        // cpal streams are not Send on every host, so the stream is created on
        // and never leaves this thread.
        let stream_thread = thread::spawn(move || {
            let stream = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer),
                cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, mixer),
                other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
            }
            .and_then(|stream| {
                stream
                    .play()
                    .map_err(|e| AudioError::Stream(e.to_string()))?;
                Ok(stream)
            });

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!(err = %e, "Failed to start CPAL stream");
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            info!("CPAL output stream started successfully");
            let _ = ready_tx.send(Ok(()));

            // Returns once the sender is dropped.
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        ready_rx.recv().map_err(|_| AudioError::Closed)??;

        info!(
            device = %name,
            channels = handle.channels(),
            sample_rate = handle.sample_rate(),
            "Audio output opened"
        );
        Ok(Device {
            name,
            handle,
            shutdown: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        })
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(stream_thread) = self.stream_thread.take() {
            if stream_thread.join().is_err() {
                error!(device = %self.name, "CPAL stream thread panicked");
            }
        }
    }
}

impl super::Device for Device {
    fn current_time(&self) -> f64 {
        self.handle.current_time()
    }

    fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }

    fn schedule(&self, voice: ScheduledVoice) -> Result<(), AudioError> {
        self.handle.submit(voice)
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, AudioError> {
        Err(AudioError::Device("not a mock device".to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({} Hz)",
            self.name,
            self.handle.channels(),
            self.handle.sample_rate()
        )
    }
}
