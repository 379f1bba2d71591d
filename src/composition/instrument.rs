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
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CompositionError;
use crate::samples::SampleCatalog;

/// Broad class of an instrument's sound. Percussive voices are never
/// pitch-shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Melodic,
    Percussive,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Melodic => write!(f, "melodic"),
            Category::Percussive => write!(f, "percussive"),
        }
    }
}

/// The sound an instrument makes. Fixed when a track is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentKind {
    #[serde(alias = "piano-acoustic", alias = "acoustic-piano")]
    Piano,
    #[serde(alias = "piano-electric")]
    ElectricPiano,
    AcousticGuitar,
    #[serde(alias = "clean-electric-guitar")]
    CleanGuitar,
    DistortedGuitar,
    Kick,
    Snare,
    #[serde(alias = "hi-hat")]
    HiHat,
    Crash,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 9] = [
        InstrumentKind::Piano,
        InstrumentKind::ElectricPiano,
        InstrumentKind::AcousticGuitar,
        InstrumentKind::CleanGuitar,
        InstrumentKind::DistortedGuitar,
        InstrumentKind::Kick,
        InstrumentKind::Snare,
        InstrumentKind::HiHat,
        InstrumentKind::Crash,
    ];

    pub fn category(&self) -> Category {
        match self {
            InstrumentKind::Kick
            | InstrumentKind::Snare
            | InstrumentKind::HiHat
            | InstrumentKind::Crash => Category::Percussive,
            _ => Category::Melodic,
        }
    }

    /// The family name reported to the feedback service.
    pub fn family(&self) -> &'static str {
        match self {
            InstrumentKind::Piano | InstrumentKind::ElectricPiano => "piano",
            InstrumentKind::AcousticGuitar
            | InstrumentKind::CleanGuitar
            | InstrumentKind::DistortedGuitar => "guitar",
            _ => "drums",
        }
    }

    /// Canonical identifier, also used as the default instrument id and
    /// volume table key.
    pub fn id(&self) -> &'static str {
        match self {
            InstrumentKind::Piano => "piano-acoustic",
            InstrumentKind::ElectricPiano => "piano-electric",
            InstrumentKind::AcousticGuitar => "acoustic-guitar",
            InstrumentKind::CleanGuitar => "clean-electric-guitar",
            InstrumentKind::DistortedGuitar => "distorted-guitar",
            InstrumentKind::Kick => "kick",
            InstrumentKind::Snare => "snare",
            InstrumentKind::HiHat => "hihat",
            InstrumentKind::Crash => "crash",
        }
    }

    /// Resolves a drum sound from a display name. Matching is case-insensitive
    /// and checked in the order kick, snare, hi-hat, crash; anything else is a
    /// kick.
    pub fn drum_from_name(name: &str) -> InstrumentKind {
        let name = name.to_lowercase();
        if name.contains("kick") {
            InstrumentKind::Kick
        } else if name.contains("snare") {
            InstrumentKind::Snare
        } else if name.contains("hi") {
            InstrumentKind::HiHat
        } else if name.contains("crash") {
            InstrumentKind::Crash
        } else {
            InstrumentKind::Kick
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for InstrumentKind {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_lowercase().as_str() {
            "piano" | "piano-acoustic" | "acoustic-piano" => InstrumentKind::Piano,
            "electric-piano" | "piano-electric" => InstrumentKind::ElectricPiano,
            "acoustic-guitar" => InstrumentKind::AcousticGuitar,
            "clean-guitar" | "clean-electric-guitar" => InstrumentKind::CleanGuitar,
            "distorted-guitar" => InstrumentKind::DistortedGuitar,
            "kick" => InstrumentKind::Kick,
            "snare" => InstrumentKind::Snare,
            "hihat" | "hi-hat" => InstrumentKind::HiHat,
            "crash" => InstrumentKind::Crash,
            _ => return Err(CompositionError::UnknownInstrumentKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// One sound of a multi-sound instrument such as a drum kit.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentVariant {
    pub id: String,
    pub name: String,
    /// When absent, percussive kits resolve the sound from the name and
    /// melodic instruments inherit the parent's kind.
    pub kind: Option<InstrumentKind>,
    pub sample: Option<String>,
}

/// An immutable sound source for a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    id: String,
    name: String,
    kind: InstrumentKind,
    sample: String,
    variants: Vec<InstrumentVariant>,
}

impl Instrument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: InstrumentKind,
        sample: impl Into<String>,
    ) -> Instrument {
        Instrument {
            id: id.into(),
            name: name.into(),
            kind,
            sample: sample.into(),
            variants: Vec::new(),
        }
    }

    pub fn with_variants(mut self, variants: Vec<InstrumentVariant>) -> Instrument {
        self.variants = variants;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn variants(&self) -> &[InstrumentVariant] {
        &self.variants
    }

    /// Expands the instrument into one playable instrument per variant. An
    /// instrument without variants expands to itself.
    pub fn expand(&self, catalog: &SampleCatalog) -> Vec<Instrument> {
        if self.variants.is_empty() {
            return vec![self.clone()];
        }

        self.variants
            .iter()
            .map(|variant| {
                let kind = variant.kind.unwrap_or_else(|| match self.category() {
                    Category::Percussive => InstrumentKind::drum_from_name(&variant.name),
                    Category::Melodic => self.kind,
                });
                let sample = variant
                    .sample
                    .clone()
                    .unwrap_or_else(|| catalog.sample_for(kind).to_string());
                Instrument::new(variant.id.clone(), variant.name.clone(), kind, sample)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drum_from_name() {
        assert_eq!(InstrumentKind::drum_from_name("Kick"), InstrumentKind::Kick);
        assert_eq!(
            InstrumentKind::drum_from_name("SNARE drum"),
            InstrumentKind::Snare
        );
        assert_eq!(InstrumentKind::drum_from_name("Hi-Hat"), InstrumentKind::HiHat);
        assert_eq!(
            InstrumentKind::drum_from_name("Crash Cymbal"),
            InstrumentKind::Crash
        );
        assert_eq!(InstrumentKind::drum_from_name("Tom"), InstrumentKind::Kick);
        // Kick has priority over everything else.
        assert_eq!(
            InstrumentKind::drum_from_name("kick + snare"),
            InstrumentKind::Kick
        );
        // "hi" is matched before "crash".
        assert_eq!(
            InstrumentKind::drum_from_name("chinese crash"),
            InstrumentKind::HiHat
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(InstrumentKind::Piano.category(), Category::Melodic);
        assert_eq!(InstrumentKind::DistortedGuitar.category(), Category::Melodic);
        assert_eq!(InstrumentKind::HiHat.category(), Category::Percussive);
        assert_eq!(InstrumentKind::CleanGuitar.family(), "guitar");
        assert_eq!(InstrumentKind::Crash.family(), "drums");
    }

    #[test]
    fn test_from_str() {
        for kind in InstrumentKind::ALL {
            assert_eq!(kind.id().parse::<InstrumentKind>().unwrap(), kind);
        }
        assert_eq!(
            "Hi-Hat".parse::<InstrumentKind>().unwrap(),
            InstrumentKind::HiHat
        );
        assert!(matches!(
            "theremin".parse::<InstrumentKind>(),
            Err(CompositionError::UnknownInstrumentKind(_))
        ));
    }

    #[test]
    fn test_expand_drum_kit() {
        let catalog = SampleCatalog::default();
        let kit = Instrument::new("drums", "Drum Kit", InstrumentKind::Kick, "unused.wav")
            .with_variants(vec![
                InstrumentVariant {
                    id: "kick".to_string(),
                    name: "Kick".to_string(),
                    kind: None,
                    sample: None,
                },
                InstrumentVariant {
                    id: "hat".to_string(),
                    name: "Closed Hi-Hat".to_string(),
                    kind: None,
                    sample: Some("custom/hat.wav".to_string()),
                },
                InstrumentVariant {
                    id: "boom".to_string(),
                    name: "Boom".to_string(),
                    kind: Some(InstrumentKind::Crash),
                    sample: None,
                },
            ]);

        let expanded = kit.expand(&catalog);
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0].kind(), InstrumentKind::Kick);
        assert_eq!(expanded[0].sample(), "samples/kick.wav");
        assert_eq!(expanded[1].kind(), InstrumentKind::HiHat);
        assert_eq!(expanded[1].sample(), "custom/hat.wav");
        assert_eq!(expanded[1].id(), "hat");
        assert_eq!(expanded[2].kind(), InstrumentKind::Crash);
        assert!(expanded.iter().all(|i| i.variants().is_empty()));
    }

    #[test]
    fn test_expand_plain_instrument() {
        let piano = Instrument::new("p", "Piano", InstrumentKind::Piano, "p.wav");
        assert_eq!(piano.expand(&SampleCatalog::default()), vec![piano]);
    }
}
