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
// Shared audio output context. The output stays locked until the first user
// action that needs sound opens it; until then scheduling is skipped rather
// than failed.
//

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::{get_device, AudioError, Device};
use crate::config;

pub struct AudioContext {
    config: config::Audio,
    device: Mutex<Option<Arc<dyn Device>>>,
}

impl AudioContext {
    /// Creates a locked context that opens the configured device on unlock.
    pub fn new(config: config::Audio) -> AudioContext {
        AudioContext {
            config,
            device: Mutex::new(None),
        }
    }

    /// Creates a context that is already unlocked with the given device.
    pub fn with_device(device: Arc<dyn Device>) -> AudioContext {
        AudioContext {
            config: config::Audio::default(),
            device: Mutex::new(Some(device)),
        }
    }

    /// Opens the output if it is not open yet and returns it.
    pub fn unlock(&self) -> Result<Arc<dyn Device>, AudioError> {
        let mut device = self.device.lock();
        if let Some(device) = device.as_ref() {
            return Ok(device.clone());
        }

        let opened = get_device(&self.config)?;
        info!(device = %opened, "Audio output unlocked");
        *device = Some(opened.clone());
        Ok(opened)
    }

    /// Returns the output if it has been unlocked.
    pub fn device(&self) -> Option<Arc<dyn Device>> {
        self.device.lock().clone()
    }

    pub fn is_unlocked(&self) -> bool {
        self.device.lock().is_some()
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.device.lock();
        f.debug_struct("AudioContext")
            .field("configured", &self.config.device())
            .field("unlocked", &device.as_ref().map(|device| device.to_string()))
            .finish()
    }
}
