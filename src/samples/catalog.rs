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

use crate::composition::InstrumentKind;

/// Default sample reference for each instrument kind.
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    samples: HashMap<InstrumentKind, String>,
}

impl SampleCatalog {
    /// Overrides the sample for a kind.
    pub fn with(mut self, kind: InstrumentKind, sample: impl Into<String>) -> SampleCatalog {
        self.samples.insert(kind, sample.into());
        self
    }

    pub fn sample_for(&self, kind: InstrumentKind) -> &str {
        self.samples
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Default for SampleCatalog {
    fn default() -> Self {
        SampleCatalog {
            samples: InstrumentKind::ALL
                .iter()
                .map(|kind| (*kind, format!("samples/{}.wav", kind.id())))
                .collect(),
        }
    }
}
