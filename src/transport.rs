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

//! The lookahead scheduler.
//!
//! A periodic task wakes every cadence and hands every note due within the
//! schedule-ahead window to the playback engine, stamped with its exact time
//! on the audio clock. Timer jitter only has to stay under the window; the
//! audio itself is sample accurate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, span, Instrument as _, Level};

use crate::audio::AudioError;
use crate::composition::{Composition, Track};
use crate::playback::PlaybackEngine;
use crate::playhead::Playhead;

mod cursor;

pub use cursor::Cursor;

pub const TOTAL_SUBDIVISIONS: u32 = 64;
pub const SUBDIVISIONS_PER_BEAT: u32 = 4;
pub const DEFAULT_SCHEDULE_AHEAD: Duration = Duration::from_millis(100);
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(25);
pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 180.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Length of one sixteenth-note subdivision in seconds.
pub fn seconds_per_subdivision(bpm: f64) -> f64 {
    60.0 / (bpm * SUBDIVISIONS_PER_BEAT as f64)
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TempoError {
    #[error("tempo {0} BPM is outside 60-180")]
    OutOfRange(f64),
}

/// Checks that a tempo is within the supported range.
pub fn validate_bpm(bpm: f64) -> Result<(), TempoError> {
    if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
        return Err(TempoError::OutOfRange(bpm));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cadence {cadence:?} must be shorter than the schedule-ahead window {window:?}")]
    Timing { cadence: Duration, window: Duration },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unable to open audio output: {0}")]
    Audio(#[from] AudioError),
}

/// Timing for the lookahead scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSettings {
    total_subdivisions: u32,
    subdivisions_per_beat: u32,
    schedule_ahead: Duration,
    cadence: Duration,
}

impl TransportSettings {
    pub fn new(
        total_subdivisions: u32,
        subdivisions_per_beat: u32,
        schedule_ahead: Duration,
        cadence: Duration,
    ) -> Result<TransportSettings, TransportError> {
        if total_subdivisions == 0 {
            return Err(TransportError::Zero("total_subdivisions"));
        }
        if subdivisions_per_beat == 0 {
            return Err(TransportError::Zero("subdivisions_per_beat"));
        }
        if cadence.is_zero() {
            return Err(TransportError::Zero("cadence"));
        }
        if cadence >= schedule_ahead {
            return Err(TransportError::Timing {
                cadence,
                window: schedule_ahead,
            });
        }

        Ok(TransportSettings {
            total_subdivisions,
            subdivisions_per_beat,
            schedule_ahead,
            cadence,
        })
    }

    pub fn total_subdivisions(&self) -> u32 {
        self.total_subdivisions
    }

    pub fn subdivisions_per_beat(&self) -> u32 {
        self.subdivisions_per_beat
    }

    pub fn schedule_ahead(&self) -> Duration {
        self.schedule_ahead
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn seconds_per_subdivision(&self, bpm: f64) -> f64 {
        60.0 / (bpm * self.subdivisions_per_beat as f64)
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            total_subdivisions: TOTAL_SUBDIVISIONS,
            subdivisions_per_beat: SUBDIVISIONS_PER_BEAT,
            schedule_ahead: DEFAULT_SCHEDULE_AHEAD,
            cadence: DEFAULT_CADENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// Everything a lookahead pass reads, shared with the loop task.
struct Lookahead {
    settings: TransportSettings,
    composition: Arc<Composition>,
    engine: Arc<PlaybackEngine>,
    playhead: Arc<Playhead>,
    /// Tempo as f64 bits.
    bpm: AtomicU64,
    /// Bumped on every start and halt. A pass only runs while it holds the
    /// current generation, so once a halt returns no stale pass can schedule.
    generation: Mutex<u64>,
}

impl Lookahead {
    fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm.load(Ordering::Relaxed))
    }

    /// Schedules everything due within the window from the latest snapshot.
    /// Returns the number of voices scheduled. Does nothing if `generation`
    /// is no longer current.
    fn pass(&self, cursor: &mut Cursor, generation: u64) -> usize {
        let current = self.generation.lock();
        if *current != generation {
            return 0;
        }
        let Some(now) = self.engine.now() else {
            return 0;
        };
        let tracks = self.composition.snapshot();
        let step = self.settings.seconds_per_subdivision(self.bpm());
        let mut scheduled = 0;

        cursor.pass(
            now,
            self.settings.schedule_ahead.as_secs_f64(),
            step,
            self.settings.total_subdivisions,
            |subdivision, start_time| {
                for track in tracks.iter() {
                    for note in track.notes_at(subdivision) {
                        match self
                            .engine
                            .schedule_note(Track::instrument(track), note.pitch(), start_time)
                        {
                            Ok(_) => scheduled += 1,
                            Err(skip) => debug!(
                                track = track.id(),
                                subdivision,
                                pitch = note.pitch(),
                                reason = %skip,
                                "Note skipped"
                            ),
                        }
                    }
                }
            },
        );

        self.playhead.set(cursor.subdivision());
        drop(current);
        scheduled
    }

    /// Invalidates any running pass and returns the new generation. Waits for
    /// a pass in progress to finish.
    fn next_generation(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }
}

/// Drives playback of the composition.
pub struct Transport {
    lookahead: Arc<Lookahead>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    pub fn new(
        settings: TransportSettings,
        bpm: f64,
        composition: Arc<Composition>,
        engine: Arc<PlaybackEngine>,
        playhead: Arc<Playhead>,
    ) -> Result<Transport, TempoError> {
        validate_bpm(bpm)?;
        Ok(Transport {
            lookahead: Arc::new(Lookahead {
                settings,
                composition,
                engine,
                playhead,
                bpm: AtomicU64::new(bpm.to_bits()),
                generation: Mutex::new(0),
            }),
            task: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.lookahead.settings
    }

    pub fn bpm(&self) -> f64 {
        self.lookahead.bpm()
    }

    /// Changes the tempo. Subdivisions already handed to the output keep
    /// their times; later ones use the new spacing.
    pub fn set_bpm(&self, bpm: f64) -> Result<(), TempoError> {
        validate_bpm(bpm)?;
        self.lookahead.bpm.store(bpm.to_bits(), Ordering::Relaxed);
        info!(bpm, "Tempo changed");
        Ok(())
    }

    pub fn state(&self) -> TransportState {
        match self.task.lock().as_ref() {
            Some(task) if !task.is_finished() => TransportState::Running,
            _ => TransportState::Stopped,
        }
    }

    /// Starts the lookahead loop from subdivision 0 at the current audio time,
    /// opening the audio output if needed. Starting while running does nothing.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let device = self.lookahead.engine.unlock()?;
        let mut cursor = Cursor::start(device.current_time());
        let lookahead = self.lookahead.clone();
        let generation = lookahead.next_generation();
        let cadence = lookahead.settings.cadence;

        info!(
            bpm = lookahead.bpm(),
            start_time = cursor.next_event_time(),
            "Transport started"
        );
        let span = span!(Level::INFO, "transport");
        *task = Some(tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(cadence);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    lookahead.pass(&mut cursor, generation);
                }
            }
            .instrument(span),
        ));
        Ok(())
    }

    /// Halts scheduling and rewinds the playhead to 0. A pass in progress is
    /// waited for; voices already handed to the output finish playing.
    pub fn stop(&self) {
        if self.halt() {
            info!("Transport stopped");
        }
        self.lookahead.playhead.reset();
    }

    /// Halts scheduling and leaves the playhead where it is.
    pub fn pause(&self) {
        if self.halt() {
            info!(
                subdivision = self.lookahead.playhead.position(),
                "Transport paused"
            );
        }
    }

    /// Aborts the loop task. Returns true if it was running.
    fn halt(&self) -> bool {
        let task = self.task.lock().take();
        self.lookahead.next_generation();
        match task {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Runs a single lookahead pass. Exposed for driving the scheduler without
    /// timers.
    pub fn pass(&self, cursor: &mut Cursor) -> usize {
        let generation = *self.lookahead.generation.lock();
        self.lookahead.pass(cursor, generation)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.halt();
    }
}
