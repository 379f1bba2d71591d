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

//! The editor-facing facade. Wires the composition, sample store, playback
//! engine, transport and playhead together for one session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::audio::{AudioContext, AudioError};
use crate::composition::{Composition, CompositionError, Note, Snapshot};
use crate::config::{ConfigError, Session};
use crate::feedback::{FeedbackRequest, FeedbackService, FeedbackServiceError};
use crate::playback::{PlaybackEngine, SchedulingSkip};
use crate::playhead::Playhead;
use crate::samples::{Fetcher, PreloadReport, SampleStore};
use crate::transport::{TempoError, Transport, TransportError, TransportState};

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Tempo(#[from] TempoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("preview skipped: {0}")]
    Preview(#[from] SchedulingSkip),
}

pub struct Studio {
    composition: Arc<Composition>,
    engine: Arc<PlaybackEngine>,
    playhead: Arc<Playhead>,
    transport: Transport,
    display_refresh: Duration,
    display: Mutex<Option<JoinHandle<()>>>,
}

impl Studio {
    /// Builds a studio from a session, reading samples from disk and playing
    /// through the configured output once it is unlocked.
    pub fn from_session(session: &Session) -> Result<Studio, StudioError> {
        Studio::build(
            session,
            Arc::new(AudioContext::new(session.audio())),
            Arc::new(session.fetcher()),
        )
    }

    /// Builds a studio with an explicit audio context and sample source.
    pub fn build(
        session: &Session,
        context: Arc<AudioContext>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Studio, StudioError> {
        let composition = Arc::new(session.composition()?);
        let engine = Arc::new(PlaybackEngine::new(
            context,
            SampleStore::new(fetcher),
            session.volumes(),
        ));
        let playhead = Arc::new(Playhead::new());
        let transport = Transport::new(
            session.transport()?,
            session.bpm()?,
            composition.clone(),
            engine.clone(),
            playhead.clone(),
        )?;

        Ok(Studio {
            composition,
            engine,
            playhead,
            transport,
            display_refresh: session.display_refresh()?,
            display: Mutex::new(None),
        })
    }

    /// Loads the sample of every track. Failures are reported, not returned;
    /// the tracks they belong to stay silent.
    pub async fn load_samples(&self) -> PreloadReport {
        let urls: Vec<String> = self
            .composition
            .snapshot()
            .iter()
            .map(|track| track.instrument().sample().to_string())
            .collect();
        self.engine.store().preload(urls).await
    }

    pub fn tracks(&self) -> Snapshot {
        self.composition.snapshot()
    }

    pub fn composition(&self) -> &Arc<Composition> {
        &self.composition
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn add_note(&self, track_id: &str, note: Note) -> Result<Option<Note>, StudioError> {
        Ok(self.composition.add_note(track_id, note)?)
    }

    pub fn remove_note(
        &self,
        track_id: &str,
        time: u32,
        pitch: u8,
    ) -> Result<Option<Note>, StudioError> {
        Ok(self.composition.remove_note(track_id, time, pitch)?)
    }

    pub fn clear_track(&self, track_id: &str) -> Result<(), StudioError> {
        Ok(self.composition.clear_track(track_id)?)
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    pub fn set_bpm(&self, bpm: f64) -> Result<(), StudioError> {
        Ok(self.transport.set_bpm(bpm)?)
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Starts or stops playback. Starting unlocks the audio output.
    pub fn set_transport(&self, state: TransportState) -> Result<(), StudioError> {
        match state {
            TransportState::Running => {
                self.transport.start()?;
                self.ensure_display();
            }
            TransportState::Stopped => self.transport.stop(),
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.transport.pause();
    }

    pub fn unlock_audio(&self) -> Result<(), StudioError> {
        self.engine.unlock()?;
        Ok(())
    }

    /// Plays a single note of a track's instrument right away.
    pub async fn preview(&self, track_id: &str, pitch: u8) -> Result<u64, StudioError> {
        let track = self
            .composition
            .track(track_id)
            .ok_or_else(|| CompositionError::UnknownTrack(track_id.to_string()))?;
        Ok(self.engine.preview(track.instrument(), pitch).await?)
    }

    /// Returns a receiver of the displayed subdivision.
    pub fn subscribe_playhead(&self) -> watch::Receiver<u32> {
        self.playhead.subscribe()
    }

    pub fn feedback_request(&self) -> FeedbackRequest {
        FeedbackRequest::from_tracks(&self.composition.snapshot(), self.bpm())
    }

    pub async fn feedback(
        &self,
        service: &dyn FeedbackService,
    ) -> Result<String, FeedbackServiceError> {
        service.feedback(&self.feedback_request()).await
    }

    fn ensure_display(&self) {
        let mut display = self.display.lock();
        if display.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        info!(refresh = ?self.display_refresh, "Starting playhead display");
        *display = Some(self.playhead.spawn_display(self.display_refresh));
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        if let Some(display) = self.display.lock().take() {
            display.abort();
        }
    }
}

impl fmt::Debug for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Studio")
            .field("composition", &self.composition)
            .field("engine", &self.engine)
            .field("bpm", &self.bpm())
            .field("state", &self.transport_state())
            .finish()
    }
}
