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
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::samples::DecodedSample;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_voice_id() -> u64 {
    NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A one-shot playback of a sample, pinned to a time on the audio clock.
#[derive(Clone)]
pub struct ScheduledVoice {
    pub id: u64,
    pub sample: Arc<DecodedSample>,
    /// Audio clock time, in seconds, of the first frame.
    pub start_time: f64,
    /// 1.0 plays at the sample's native speed.
    pub playback_rate: f64,
    pub gain: f32,
    pub instrument_id: String,
}

impl fmt::Debug for ScheduledVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledVoice")
            .field("id", &self.id)
            .field("instrument_id", &self.instrument_id)
            .field("start_time", &self.start_time)
            .field("playback_rate", &self.playback_rate)
            .field("gain", &self.gain)
            .finish()
    }
}
