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

//! The boundary to an external feedback service. The core only builds the
//! request and renders it as text; the service itself is pluggable.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::composition::{Category, Track};
use crate::util::pitch_name;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackServiceError {
    #[error("the composition has no notes to review")]
    EmptyComposition,

    #[error("feedback service unavailable: {0}")]
    Unavailable(String),

    #[error("unable to serialize composition: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackNote {
    pub pitch: u8,
    pub time: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackTrack {
    pub name: String,
    pub instrument_category: Category,
    pub notes: Vec<FeedbackNote>,
}

/// A composition as sent to a feedback service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub tracks: Vec<FeedbackTrack>,
    pub bpm: f64,
}

impl FeedbackRequest {
    /// Builds a request from a composition snapshot. Empty tracks are kept so
    /// track numbering matches the composition.
    pub fn from_tracks(tracks: &[Arc<Track>], bpm: f64) -> FeedbackRequest {
        FeedbackRequest {
            tracks: tracks
                .iter()
                .map(|track| FeedbackTrack {
                    name: track.name().to_string(),
                    instrument_category: track.instrument().category(),
                    notes: track
                        .notes()
                        .map(|note| FeedbackNote {
                            pitch: note.pitch(),
                            time: note.time(),
                            duration: note.duration(),
                        })
                        .collect(),
                })
                .collect(),
            bpm,
        }
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.notes.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, FeedbackServiceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders the composition as structured text, one block per non-empty
    /// track with its notes grouped by beat.
    pub fn describe(&self) -> String {
        let mut description = format!(
            "This is a musical composition with a tempo of {} BPM. It contains {} tracks:\n\n",
            self.bpm,
            self.tracks.len()
        );

        for (index, track) in self.tracks.iter().enumerate() {
            if track.notes.is_empty() {
                continue;
            }

            description.push_str(&format!(
                "Track {}: {} ({})\n",
                index + 1,
                track.name,
                track.instrument_category
            ));
            description.push_str(&format!("Contains {} notes:\n", track.notes.len()));

            let mut by_time: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
            for note in &track.notes {
                by_time.entry(note.time).or_default().push(note.pitch);
            }
            for (time, pitches) in by_time {
                let names: Vec<String> = pitches.into_iter().map(pitch_name).collect();
                description.push_str(&format!(
                    "  Beat {}.{}: {}\n",
                    time / 4 + 1,
                    time % 4 + 1,
                    names.join(", ")
                ));
            }

            description.push('\n');
        }

        description
    }
}

/// Produces free-text feedback for a composition.
pub trait FeedbackService: Send + Sync {
    fn feedback(
        &self,
        request: &FeedbackRequest,
    ) -> BoxFuture<'static, Result<String, FeedbackServiceError>>;
}

const CANNED_MESSAGES: [&str; 5] = [
    "Great job! Your melody has a nice rhythm and stays in key.",
    "I notice you're using a lot of notes that work well together. Try adding some variety in rhythm!",
    "Your composition sounds good! Consider adding some lower notes to balance the high ones.",
    "Nice work! Your melody has a clear structure. Try creating a pattern that repeats.",
    "I can hear a good beat! Your notes are in the right key, but watch out for some dissonant notes in bar 3.",
];

/// An offline service that answers with one of a fixed set of messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedFeedback;

impl FeedbackService for CannedFeedback {
    fn feedback(
        &self,
        request: &FeedbackRequest,
    ) -> BoxFuture<'static, Result<String, FeedbackServiceError>> {
        let result = if request.note_count() == 0 {
            Err(FeedbackServiceError::EmptyComposition)
        } else {
            let message = CANNED_MESSAGES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(CANNED_MESSAGES[0]);
            info!(notes = request.note_count(), "Canned feedback chosen");
            Ok(message.to_string())
        };
        async move { result }.boxed()
    }
}
