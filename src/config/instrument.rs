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
use serde::Deserialize;

use super::error::ConfigError;
use crate::composition::{self, InstrumentKind, Note, Track, DEFAULT_VELOCITY};
use crate::samples::SampleCatalog;

/// A note seeded into a track when the session starts.
#[derive(Deserialize, Clone, Debug)]
pub struct NoteSeed {
    time: u32,
    pitch: u8,
    duration: Option<u32>,
    velocity: Option<u8>,
}

impl NoteSeed {
    fn to_note(&self) -> Result<Note, ConfigError> {
        Ok(Note::new(
            self.time,
            self.pitch,
            self.duration.unwrap_or(1),
            self.velocity.unwrap_or(DEFAULT_VELOCITY),
        )?)
    }
}

/// One sound of a multi-sound instrument.
#[derive(Deserialize, Clone, Debug)]
pub struct Variant {
    id: String,
    name: String,
    kind: Option<String>,
    sample: Option<String>,
    notes: Option<Vec<NoteSeed>>,
}

/// A YAML representation of an instrument. An instrument with variants
/// becomes one track per variant.
#[derive(Deserialize, Clone, Debug)]
pub struct Instrument {
    id: String,
    name: String,
    kind: String,
    sample: Option<String>,
    variants: Option<Vec<Variant>>,
    notes: Option<Vec<NoteSeed>>,
}

impl Instrument {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> Result<InstrumentKind, ConfigError> {
        Ok(self.kind.parse::<InstrumentKind>()?)
    }

    /// Builds the tracks for this instrument, filling unset samples from the
    /// catalog and seeding their notes.
    pub fn to_tracks(&self, catalog: &SampleCatalog) -> Result<Vec<Track>, ConfigError> {
        let kind = self.kind()?;
        let sample = self
            .sample
            .clone()
            .unwrap_or_else(|| catalog.sample_for(kind).to_string());

        let variants = self.variants.as_deref().unwrap_or_default();
        let variant_kinds = variants
            .iter()
            .map(|variant| variant.kind.as_deref().map(str::parse::<InstrumentKind>).transpose())
            .collect::<Result<Vec<Option<InstrumentKind>>, _>>()?;

        let instrument = composition::Instrument::new(&self.id, &self.name, kind, sample)
            .with_variants(
                variants
                    .iter()
                    .zip(variant_kinds)
                    .map(|(variant, kind)| composition::InstrumentVariant {
                        id: variant.id.clone(),
                        name: variant.name.clone(),
                        kind,
                        sample: variant.sample.clone(),
                    })
                    .collect(),
            );

        let seeds: Vec<&[NoteSeed]> = if variants.is_empty() {
            vec![self.notes.as_deref().unwrap_or_default()]
        } else {
            variants
                .iter()
                .map(|variant| variant.notes.as_deref().unwrap_or_default())
                .collect()
        };

        instrument
            .expand(catalog)
            .into_iter()
            .zip(seeds)
            .map(|(instrument, seeds)| -> Result<Track, ConfigError> {
                let mut track = Track::new(instrument.id(), instrument.name(), instrument.clone());
                for seed in seeds {
                    track.insert(seed.to_note()?);
                }
                Ok(track)
            })
            .collect()
    }
}

/// The instrument set used when a session does not list its own.
pub fn default_instruments() -> Vec<Instrument> {
    let plain = |kind: InstrumentKind, name: &str| Instrument {
        id: kind.id().to_string(),
        name: name.to_string(),
        kind: kind.id().to_string(),
        sample: None,
        variants: None,
        notes: None,
    };
    let drum = |kind: InstrumentKind, name: &str| Variant {
        id: kind.id().to_string(),
        name: name.to_string(),
        kind: None,
        sample: None,
        notes: None,
    };

    vec![
        plain(InstrumentKind::Piano, "Acoustic Piano"),
        plain(InstrumentKind::ElectricPiano, "Electric Piano"),
        plain(InstrumentKind::AcousticGuitar, "Acoustic Guitar"),
        plain(InstrumentKind::CleanGuitar, "Clean Electric Guitar"),
        plain(InstrumentKind::DistortedGuitar, "Distorted Guitar"),
        Instrument {
            id: "drums".to_string(),
            name: "Drum Kit".to_string(),
            kind: InstrumentKind::Kick.id().to_string(),
            sample: None,
            variants: Some(vec![
                drum(InstrumentKind::Kick, "Kick"),
                drum(InstrumentKind::Snare, "Snare"),
                drum(InstrumentKind::HiHat, "Hi-Hat"),
                drum(InstrumentKind::Crash, "Crash"),
            ]),
            notes: None,
        },
    ]
}
