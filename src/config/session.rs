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
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use super::instrument::{default_instruments, Instrument};
use super::transport::{parse_duration, Transport};
use crate::composition::{Composition, InstrumentKind, Track};
use crate::playback::VolumeTable;
use crate::playhead::DEFAULT_REFRESH;
use crate::samples::{FileFetcher, SampleCatalog};
use crate::transport::{validate_bpm, TransportSettings, DEFAULT_BPM};

/// The configuration for a sequencer session.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Session {
    /// Initial tempo in beats per minute.
    bpm: Option<f64>,

    /// The audio output configuration.
    audio: Option<Audio>,

    /// Scheduler timing.
    transport: Option<Transport>,

    /// How often the playhead is published to the display.
    display_refresh: Option<String>,

    /// Sample overrides by instrument kind.
    samples: Option<HashMap<String, String>>,

    /// Gain overrides by instrument id.
    volumes: Option<HashMap<String, f32>>,

    /// The instruments, one or more tracks each. Defaults to the built-in set.
    instruments: Option<Vec<Instrument>>,

    /// Directory relative sample references resolve against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Session {
    /// Parse a session from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Session, ConfigError> {
        let mut session = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Session>()?;
        session.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(session)
    }

    /// Replaces the audio configuration.
    pub fn with_audio(mut self, audio: Audio) -> Session {
        self.audio = Some(audio);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the validated initial tempo.
    pub fn bpm(&self) -> Result<f64, ConfigError> {
        let bpm = self.bpm.unwrap_or(DEFAULT_BPM);
        validate_bpm(bpm)?;
        Ok(bpm)
    }

    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    pub fn transport(&self) -> Result<TransportSettings, ConfigError> {
        self.transport.clone().unwrap_or_default().settings()
    }

    pub fn display_refresh(&self) -> Result<Duration, ConfigError> {
        let refresh = parse_duration("display_refresh", &self.display_refresh, DEFAULT_REFRESH)?;
        if refresh.is_zero() {
            return Err(ConfigError::Invalid(
                "display_refresh must be greater than zero".to_string(),
            ));
        }
        Ok(refresh)
    }

    /// Returns the sample catalog with any overrides applied.
    pub fn catalog(&self) -> Result<SampleCatalog, ConfigError> {
        let mut catalog = SampleCatalog::default();
        if let Some(samples) = &self.samples {
            for (kind, sample) in samples {
                catalog = catalog.with(kind.parse::<InstrumentKind>()?, sample.clone());
            }
        }
        Ok(catalog)
    }

    /// Returns the volume table with any overrides applied.
    pub fn volumes(&self) -> VolumeTable {
        let mut table = VolumeTable::default();
        if let Some(volumes) = &self.volumes {
            for (id, volume) in volumes {
                table = table.with(id, *volume);
            }
        }
        table
    }

    /// Builds every track, expanding multi-sound instruments.
    pub fn tracks(&self) -> Result<Vec<Track>, ConfigError> {
        let catalog = self.catalog()?;
        let instruments = match &self.instruments {
            Some(instruments) => instruments.clone(),
            None => default_instruments(),
        };

        let mut tracks = Vec::new();
        for instrument in &instruments {
            tracks.extend(instrument.to_tracks(&catalog)?);
        }
        Ok(tracks)
    }

    pub fn composition(&self) -> Result<Composition, ConfigError> {
        Ok(Composition::new(
            self.tracks()?,
            self.transport()?.total_subdivisions(),
        )?)
    }

    /// Returns a fetcher that resolves samples relative to the session file.
    pub fn fetcher(&self) -> FileFetcher {
        FileFetcher::new(&self.base_path)
    }

    /// Checks every part of the session without touching audio hardware.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bpm()?;
        self.display_refresh()?;
        self.composition()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config::FileFormat;

    use super::*;

    fn parse(yaml: &str) -> Session {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let session = Session::default();
        assert_eq!(session.bpm().unwrap(), 120.0);
        assert_eq!(session.audio().device(), "default");
        assert_eq!(session.display_refresh().unwrap(), Duration::from_millis(16));
        assert_eq!(session.tracks().unwrap().len(), 9);
        assert_eq!(session.composition().unwrap().length(), 64);
        assert_eq!(session.volumes().get("kick"), 0.6);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_full_session() {
        let session = parse(
            r#"
            bpm: 90
            audio:
              device: mock
            transport:
              total_subdivisions: 32
              schedule_ahead: 150ms
              cadence: 30ms
            display_refresh: 20ms
            samples:
              snare: kit/snare.flac
            volumes:
              lead: 0.5
            instruments:
              - id: lead
                name: Lead
                kind: distorted-guitar
                notes:
                  - time: 31
                    pitch: 40
              - id: drums
                name: Drums
                kind: kick
                variants:
                  - id: snare
                    name: Snare
            "#,
        );

        assert_eq!(session.bpm().unwrap(), 90.0);
        assert_eq!(session.audio().device(), "mock");
        assert_eq!(session.transport().unwrap().total_subdivisions(), 32);
        assert_eq!(session.display_refresh().unwrap(), Duration::from_millis(20));
        assert_eq!(session.volumes().get("lead"), 0.5);

        let tracks = session.tracks().unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].instrument().sample(), "kit/snare.flac");
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_invalid_sessions() {
        assert!(matches!(
            parse("bpm: 200").bpm(),
            Err(ConfigError::Tempo(_))
        ));
        assert!(matches!(
            parse("display_refresh: 0ms").display_refresh(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse("samples: { kazoo: a.wav }").catalog(),
            Err(ConfigError::Composition(_))
        ));

        let session = parse(
            r#"
            transport:
              total_subdivisions: 16
            instruments:
              - id: p
                name: P
                kind: piano
                notes:
                  - time: 16
                    pitch: 60
            "#,
        );
        assert!(matches!(
            session.validate(),
            Err(ConfigError::Composition(_))
        ));
    }

    #[test]
    fn test_deserialize_file_sets_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bpm: 100").unwrap();

        let session = Session::deserialize(&path).unwrap();
        assert_eq!(session.bpm().unwrap(), 100.0);
        assert_eq!(session.base_path(), dir.path());
        assert_eq!(
            session.fetcher().resolve("samples/kick.wav").unwrap(),
            dir.path().join("samples/kick.wav")
        );
    }
}
