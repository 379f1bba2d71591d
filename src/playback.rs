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

//! Turns notes into voices on the audio clock.
//!
//! Voices are fire-and-forget: once handed to the output they play to the end
//! of their sample and are released by the output. Nothing here awaits on the
//! scheduling path; a sample that is not resident yet is skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::audio::voice::next_voice_id;
use crate::audio::{AudioContext, AudioError, Device, ScheduledVoice};
use crate::composition::{Category, Instrument, InstrumentKind};
use crate::samples::{DecodedSample, Residency, SampleLoadError, SampleStore};

/// The pitch at which melodic samples play unshifted (middle C).
pub const REFERENCE_PITCH: u8 = 60;

/// Gain for instruments missing from the volume table.
pub const DEFAULT_INSTRUMENT_VOLUME: f32 = 0.8;

const MELODIC_VOLUME: f32 = 0.7;
const PERCUSSIVE_VOLUME: f32 = 0.8;

/// Why a voice was not scheduled. None of these stop playback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingSkip {
    #[error("audio output is locked")]
    Locked,

    #[error("sample {0} is not loaded yet")]
    NotResident(String),

    #[error("sample unavailable: {0}")]
    LoadFailed(Arc<SampleLoadError>),

    #[error("audio output rejected the voice: {0}")]
    Device(Arc<AudioError>),
}

impl From<AudioError> for SchedulingSkip {
    fn from(e: AudioError) -> Self {
        SchedulingSkip::Device(Arc::new(e))
    }
}

/// Per-instrument gain multipliers.
#[derive(Debug, Clone)]
pub struct VolumeTable {
    volumes: HashMap<String, f32>,
}

impl VolumeTable {
    pub fn empty() -> VolumeTable {
        VolumeTable {
            volumes: HashMap::new(),
        }
    }

    pub fn with(mut self, instrument_id: impl Into<String>, volume: f32) -> VolumeTable {
        self.volumes.insert(instrument_id.into(), volume);
        self
    }

    pub fn get(&self, instrument_id: &str) -> f32 {
        self.volumes
            .get(instrument_id)
            .copied()
            .unwrap_or(DEFAULT_INSTRUMENT_VOLUME)
    }
}

impl Default for VolumeTable {
    fn default() -> Self {
        VolumeTable::empty()
            .with(InstrumentKind::AcousticGuitar.id(), 1.0)
            .with(InstrumentKind::CleanGuitar.id(), 0.85)
            .with(InstrumentKind::DistortedGuitar.id(), 0.85)
            .with(InstrumentKind::Piano.id(), 0.8)
            .with(InstrumentKind::ElectricPiano.id(), 0.8)
            .with(InstrumentKind::Kick.id(), 0.6)
            .with(InstrumentKind::HiHat.id(), 0.7)
            .with(InstrumentKind::Snare.id(), 0.8)
            .with(InstrumentKind::Crash.id(), 1.0)
    }
}

/// Playback rate for a shift in semitones.
pub fn playback_rate(semitones: i32) -> f64 {
    2f64.powf(semitones as f64 / 12.0)
}

/// How a note on an instrument is voiced: (semitone shift, requested volume).
/// Percussive sounds are never shifted.
pub fn voicing(instrument: &Instrument, pitch: u8) -> (i32, f32) {
    match instrument.category() {
        Category::Percussive => (0, PERCUSSIVE_VOLUME),
        Category::Melodic => (pitch as i32 - REFERENCE_PITCH as i32, MELODIC_VOLUME),
    }
}

pub struct PlaybackEngine {
    context: Arc<AudioContext>,
    store: SampleStore,
    volumes: VolumeTable,
}

impl PlaybackEngine {
    pub fn new(context: Arc<AudioContext>, store: SampleStore, volumes: VolumeTable) -> Self {
        PlaybackEngine {
            context,
            store,
            volumes,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn context(&self) -> &Arc<AudioContext> {
        &self.context
    }

    /// Opens the audio output if needed.
    pub fn unlock(&self) -> Result<Arc<dyn Device>, AudioError> {
        self.context.unlock()
    }

    /// Current audio clock time, or None while the output is locked.
    pub fn now(&self) -> Option<f64> {
        self.context.device().map(|device| device.current_time())
    }

    /// Schedules a one-shot voice of the sample at `start_time` on the audio
    /// clock. Returns the voice id.
    pub fn schedule_voice(
        &self,
        sample: Arc<DecodedSample>,
        start_time: f64,
        semitones: i32,
        volume: f32,
        instrument_id: &str,
    ) -> Result<u64, SchedulingSkip> {
        let device = self.context.device().ok_or(SchedulingSkip::Locked)?;
        self.schedule_on(device.as_ref(), sample, start_time, semitones, volume, instrument_id)
    }

    /// Schedules a note on an instrument without waiting. A sample that is not
    /// resident yet starts loading and the note is skipped.
    pub fn schedule_note(
        &self,
        instrument: &Instrument,
        pitch: u8,
        start_time: f64,
    ) -> Result<u64, SchedulingSkip> {
        let device = self.context.device().ok_or(SchedulingSkip::Locked)?;
        let sample = match self.store.request(instrument.sample()) {
            Residency::Ready(sample) => sample,
            Residency::Pending => {
                return Err(SchedulingSkip::NotResident(instrument.sample().to_string()))
            }
            Residency::Failed(e) => return Err(SchedulingSkip::LoadFailed(e)),
        };

        let (semitones, volume) = voicing(instrument, pitch);
        self.schedule_on(
            device.as_ref(),
            sample,
            start_time,
            semitones,
            volume,
            instrument.id(),
        )
    }

    /// Plays a note right away, as when a note is placed or an instrument is
    /// picked. Waits for the sample to load and unlocks the output.
    pub async fn preview(&self, instrument: &Instrument, pitch: u8) -> Result<u64, SchedulingSkip> {
        let sample = self
            .store
            .get(instrument.sample())
            .await
            .map_err(SchedulingSkip::LoadFailed)?;
        let device = self.context.unlock()?;

        let (semitones, volume) = voicing(instrument, pitch);
        let now = device.current_time();
        self.schedule_on(device.as_ref(), sample, now, semitones, volume, instrument.id())
    }

    fn schedule_on(
        &self,
        device: &dyn Device,
        sample: Arc<DecodedSample>,
        start_time: f64,
        semitones: i32,
        volume: f32,
        instrument_id: &str,
    ) -> Result<u64, SchedulingSkip> {
        let voice = ScheduledVoice {
            id: next_voice_id(),
            sample,
            start_time,
            playback_rate: playback_rate(semitones),
            gain: volume * self.volumes.get(instrument_id),
            instrument_id: instrument_id.to_string(),
        };
        let id = voice.id;
        debug!(
            id,
            instrument = instrument_id,
            start_time,
            semitones,
            "Scheduling voice"
        );
        device.schedule(voice)?;
        Ok(id)
    }
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("context", &self.context)
            .field("store", &self.store)
            .finish()
    }
}
