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
use super::CompositionError;

/// Highest MIDI note number and velocity.
pub const MIDI_MAX: u8 = 127;

/// Velocity used for notes placed on the grid.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Identity of a note within a track. Ordered by time first so that a range
/// over a single subdivision yields every pitch sounding there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteKey {
    pub time: u32,
    pub pitch: u8,
}

/// A single grid event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// Subdivision index the note starts on.
    time: u32,
    /// MIDI note number.
    pitch: u8,
    /// Length in subdivisions, at least 1.
    duration: u32,
    /// MIDI velocity.
    velocity: u8,
}

impl Note {
    /// Creates a validated note.
    pub fn new(time: u32, pitch: u8, duration: u32, velocity: u8) -> Result<Note, CompositionError> {
        if pitch > MIDI_MAX {
            return Err(CompositionError::PitchOutOfRange(pitch));
        }
        if duration == 0 {
            return Err(CompositionError::ZeroDuration);
        }
        if velocity > MIDI_MAX {
            return Err(CompositionError::VelocityOutOfRange(velocity));
        }

        Ok(Note {
            time,
            pitch,
            duration,
            velocity,
        })
    }

    /// A one-subdivision note at the default velocity, as placed by clicking a cell.
    pub fn at(time: u32, pitch: u8) -> Result<Note, CompositionError> {
        Note::new(time, pitch, 1, DEFAULT_VELOCITY)
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Returns the (time, pitch) identity of this note.
    pub fn key(&self) -> NoteKey {
        NoteKey {
            time: self.time,
            pitch: self.pitch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_validation() {
        assert!(Note::new(0, 60, 1, 100).is_ok());
        assert!(Note::new(0, 127, 1, 127).is_ok());

        assert!(matches!(
            Note::new(0, 128, 1, 100),
            Err(CompositionError::PitchOutOfRange(128))
        ));
        assert!(matches!(
            Note::new(0, 60, 0, 100),
            Err(CompositionError::ZeroDuration)
        ));
        assert!(matches!(
            Note::new(0, 60, 1, 200),
            Err(CompositionError::VelocityOutOfRange(200))
        ));
    }

    #[test]
    fn test_grid_note_defaults() {
        let note = Note::at(5, 60).unwrap();
        assert_eq!(note.duration(), 1);
        assert_eq!(note.velocity(), DEFAULT_VELOCITY);
        assert_eq!(note.key(), NoteKey { time: 5, pitch: 60 });
    }

    #[test]
    fn test_key_ordering_groups_by_time() {
        let mut keys = vec![
            NoteKey { time: 2, pitch: 40 },
            NoteKey { time: 1, pitch: 90 },
            NoteKey { time: 1, pitch: 10 },
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                NoteKey { time: 1, pitch: 10 },
                NoteKey { time: 1, pitch: 90 },
                NoteKey { time: 2, pitch: 40 },
            ]
        );
    }
}
