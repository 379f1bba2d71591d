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
use std::collections::BTreeMap;
use std::sync::Arc;

use super::instrument::Instrument;
use super::note::{Note, NoteKey, MIDI_MAX};

/// A named sequence of notes played by a single instrument.
#[derive(Debug, Clone)]
pub struct Track {
    id: String,
    name: String,
    instrument: Arc<Instrument>,
    notes: BTreeMap<NoteKey, Note>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, instrument: Instrument) -> Track {
        Track {
            id: id.into(),
            name: name.into(),
            instrument: Arc::new(instrument),
            notes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    /// Adds a note, replacing and returning any note at the same (time, pitch).
    pub fn insert(&mut self, note: Note) -> Option<Note> {
        self.notes.insert(note.key(), note)
    }

    /// Removes the note at (time, pitch), if any.
    pub fn remove(&mut self, time: u32, pitch: u8) -> Option<Note> {
        self.notes.remove(&NoteKey { time, pitch })
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// All notes in (time, pitch) order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    /// Notes starting on the given subdivision, lowest pitch first.
    pub fn notes_at(&self, time: u32) -> impl Iterator<Item = &Note> {
        self.notes
            .range(NoteKey { time, pitch: 0 }..=NoteKey { time, pitch: MIDI_MAX })
            .map(|(_, note)| note)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
