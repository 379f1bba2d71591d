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
use std::{fmt, sync::Arc};

use crate::config;

pub mod context;
pub mod cpal;
pub mod mixer;
pub mod mock;
pub mod voice;

pub use context::AudioContext;
pub use voice::ScheduledVoice;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no output device found with name {0}")]
    NoDevice(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("audio output stream error: {0}")]
    Stream(String),

    #[error("audio output is closed")]
    Closed,
}

/// An output with its own clock that plays scheduled voices.
pub trait Device: fmt::Display + Send + Sync {
    /// Seconds of audio rendered since the device was opened.
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Hands a voice to the output. The voice plays at its start time, or
    /// immediately if that time has already passed.
    fn schedule(&self, voice: ScheduledVoice) -> Result<(), AudioError>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, AudioError>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, AudioError> {
    cpal::Device::list()
}

/// Opens the device named in the configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
