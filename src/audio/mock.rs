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
use std::{collections::VecDeque, fmt, sync::Arc, time::Instant};

#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::{AudioError, ScheduledVoice};

const MOCK_SAMPLE_RATE: u32 = 44100;

/// Only the most recent voices are kept.
const MAX_RECORDED_VOICES: usize = 256;

#[derive(Clone)]
enum Clock {
    /// Seconds since the device was opened.
    Wall(Instant),
    /// Driven by the test, stored as f64 bits.
    #[cfg(test)]
    Manual(Arc<AtomicU64>),
}

/// A mock device. Doesn't actually play anything, but records the most recent
/// voices it was asked to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    clock: Clock,
    scheduled: Arc<Mutex<VecDeque<ScheduledVoice>>>,
}

impl Device {
    /// Gets the given mock device, clocked by wall time.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            clock: Clock::Wall(Instant::now()),
            scheduled: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Gets a mock device whose clock only moves when told to.
    #[cfg(test)]
    pub fn manual(name: &str) -> Device {
        Device {
            name: name.to_string(),
            clock: Clock::Manual(Arc::new(AtomicU64::new(0f64.to_bits()))),
            scheduled: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Sets a manual clock. Has no effect on a wall clock.
    #[cfg(test)]
    pub fn set_time(&self, time: f64) {
        if let Clock::Manual(clock) = &self.clock {
            clock.store(time.to_bits(), Ordering::SeqCst);
        }
    }

    /// Moves a manual clock forward.
    #[cfg(test)]
    pub fn advance(&self, seconds: f64) {
        use crate::audio::Device as _;
        self.set_time(self.current_time() + seconds);
    }

    /// Returns the recorded voices, oldest first.
    pub fn scheduled(&self) -> Vec<ScheduledVoice> {
        self.scheduled.lock().iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn clear_scheduled(&self) {
        self.scheduled.lock().clear();
    }
}

impl crate::audio::Device for Device {
    fn current_time(&self) -> f64 {
        match &self.clock {
            Clock::Wall(start) => start.elapsed().as_secs_f64(),
            #[cfg(test)]
            Clock::Manual(clock) => f64::from_bits(clock.load(Ordering::SeqCst)),
        }
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn schedule(&self, voice: ScheduledVoice) -> Result<(), AudioError> {
        debug!(
            device = %self.name,
            instrument = %voice.instrument_id,
            start_time = voice.start_time,
            playback_rate = voice.playback_rate,
            "Voice scheduled (mock)"
        );
        let mut scheduled = self.scheduled.lock();
        if scheduled.len() == MAX_RECORDED_VOICES {
            scheduled.pop_front();
        }
        scheduled.push_back(voice);
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, AudioError> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
