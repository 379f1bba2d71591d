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

//! The editable set of tracks and their notes.
//!
//! The composition has a single writer (the editor) and any number of readers
//! (the scheduler). Every edit builds a new snapshot and publishes it
//! atomically, so readers never wait on an edit and always see a whole one.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

mod instrument;
mod note;
mod track;

pub use instrument::{Category, Instrument, InstrumentKind, InstrumentVariant};
pub use note::{Note, NoteKey, DEFAULT_VELOCITY, MIDI_MAX};
pub use track::Track;

/// An immutable view of every track.
pub type Snapshot = Arc<Vec<Arc<Track>>>;

#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("no track with id {0}")]
    UnknownTrack(String),

    #[error("duplicate track id {0}")]
    DuplicateTrack(String),

    #[error("pitch {0} is outside 0-127")]
    PitchOutOfRange(u8),

    #[error("velocity {0} is outside 0-127")]
    VelocityOutOfRange(u8),

    #[error("note duration must be at least one subdivision")]
    ZeroDuration,

    #[error("time {time} is past the end of a {length} subdivision timeline")]
    TimeOutOfRange { time: u32, length: u32 },

    #[error("unknown instrument kind {0}")]
    UnknownInstrumentKind(String),
}

pub struct Composition {
    tracks: ArcSwap<Vec<Arc<Track>>>,
    /// Number of subdivisions in the looping timeline.
    length: u32,
}

impl Composition {
    /// Creates a composition from the given tracks. Track ids must be unique.
    pub fn new(tracks: Vec<Track>, length: u32) -> Result<Composition, CompositionError> {
        for (i, track) in tracks.iter().enumerate() {
            if tracks[..i].iter().any(|other| other.id() == track.id()) {
                return Err(CompositionError::DuplicateTrack(track.id().to_string()));
            }
            if let Some(note) = track.notes().find(|note| note.time() >= length) {
                return Err(CompositionError::TimeOutOfRange {
                    time: note.time(),
                    length,
                });
            }
        }

        Ok(Composition {
            tracks: ArcSwap::from_pointee(tracks.into_iter().map(Arc::new).collect()),
            length,
        })
    }

    /// Timeline length in subdivisions.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.tracks.load_full()
    }

    /// Returns the current state of a single track.
    pub fn track(&self, track_id: &str) -> Option<Arc<Track>> {
        self.tracks
            .load()
            .iter()
            .find(|track| track.id() == track_id)
            .cloned()
    }

    /// Adds a note to a track, replacing any note at the same (time, pitch).
    /// Returns the replaced note.
    pub fn add_note(&self, track_id: &str, note: Note) -> Result<Option<Note>, CompositionError> {
        if note.time() >= self.length {
            return Err(CompositionError::TimeOutOfRange {
                time: note.time(),
                length: self.length,
            });
        }

        let replaced = self.edit(track_id, |track| track.insert(note))?;
        debug!(
            track = track_id,
            time = note.time(),
            pitch = note.pitch(),
            replaced = replaced.is_some(),
            "Note added"
        );
        Ok(replaced)
    }

    /// Removes the note at (time, pitch). Removing a missing note is not an
    /// error.
    pub fn remove_note(
        &self,
        track_id: &str,
        time: u32,
        pitch: u8,
    ) -> Result<Option<Note>, CompositionError> {
        let removed = self.edit(track_id, |track| track.remove(time, pitch))?;
        debug!(
            track = track_id,
            time,
            pitch,
            removed = removed.is_some(),
            "Note removed"
        );
        Ok(removed)
    }

    /// Removes every note from a track.
    pub fn clear_track(&self, track_id: &str) -> Result<(), CompositionError> {
        self.edit(track_id, Track::clear)?;
        debug!(track = track_id, "Track cleared");
        Ok(())
    }

    /// Applies an edit to one track and publishes the result as a new snapshot.
    fn edit<R, F>(&self, track_id: &str, mut f: F) -> Result<R, CompositionError>
    where
        F: FnMut(&mut Track) -> R,
    {
        if self.track(track_id).is_none() {
            return Err(CompositionError::UnknownTrack(track_id.to_string()));
        }

        let mut outcome = None;
        self.tracks.rcu(|tracks| {
            let mut tracks = (**tracks).clone();
            outcome = tracks
                .iter_mut()
                .find(|track| track.id() == track_id)
                .map(|track| f(Arc::make_mut(track)));
            tracks
        });

        outcome.ok_or_else(|| CompositionError::UnknownTrack(track_id.to_string()))
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracks = self.tracks.load();
        f.debug_struct("Composition")
            .field("length", &self.length)
            .field("tracks", &tracks.len())
            .field(
                "notes",
                &tracks.iter().map(|track| track.len()).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition() -> Composition {
        let piano = Track::new(
            "piano",
            "Piano",
            Instrument::new("piano", "Piano", InstrumentKind::Piano, "piano.wav"),
        );
        let kick = Track::new(
            "kick",
            "Kick",
            Instrument::new("kick", "Kick", InstrumentKind::Kick, "kick.wav"),
        );
        Composition::new(vec![piano, kick], 64).unwrap()
    }

    #[test]
    fn test_add_replaces() {
        let composition = composition();
        composition
            .add_note("piano", Note::new(10, 60, 1, 100).unwrap())
            .unwrap();
        let replaced = composition
            .add_note("piano", Note::new(10, 60, 4, 80).unwrap())
            .unwrap();

        assert!(replaced.is_some());
        let track = composition.track("piano").unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.notes_at(10).next().unwrap().velocity(), 80);
    }

    #[test]
    fn test_remove_idempotent() {
        let composition = composition();
        composition.add_note("kick", Note::at(0, 36).unwrap()).unwrap();

        assert!(composition.remove_note("kick", 0, 36).unwrap().is_some());
        assert!(composition.remove_note("kick", 0, 36).unwrap().is_none());
        assert!(composition.track("kick").unwrap().is_empty());
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let composition = composition();
        composition.add_note("piano", Note::at(1, 60).unwrap()).unwrap();
        let before = composition.snapshot();

        composition.add_note("piano", Note::at(2, 62).unwrap()).unwrap();

        assert_eq!(before[0].len(), 1);
        assert_eq!(composition.snapshot()[0].len(), 2);
        // Untouched tracks are shared between snapshots.
        assert!(Arc::ptr_eq(&before[1], &composition.snapshot()[1]));
    }

    #[test]
    fn test_errors() {
        let composition = composition();
        assert!(matches!(
            composition.add_note("nope", Note::at(0, 60).unwrap()),
            Err(CompositionError::UnknownTrack(_))
        ));
        assert!(matches!(
            composition.add_note("piano", Note::at(64, 60).unwrap()),
            Err(CompositionError::TimeOutOfRange { time: 64, length: 64 })
        ));
        assert!(matches!(
            composition.clear_track("nope"),
            Err(CompositionError::UnknownTrack(_))
        ));

        let a = Track::new(
            "a",
            "A",
            Instrument::new("a", "A", InstrumentKind::Snare, "a.wav"),
        );
        assert!(matches!(
            Composition::new(vec![a.clone(), a], 64),
            Err(CompositionError::DuplicateTrack(_))
        ));
    }
}
