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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::transport::{
    TransportSettings, DEFAULT_CADENCE, DEFAULT_SCHEDULE_AHEAD, SUBDIVISIONS_PER_BEAT,
    TOTAL_SUBDIVISIONS,
};

/// A YAML representation of the transport timing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Transport {
    /// Length of the looping timeline in subdivisions.
    total_subdivisions: Option<u32>,

    /// Subdivisions per beat.
    subdivisions_per_beat: Option<u32>,

    /// How far ahead of the audio clock notes are handed to the output.
    schedule_ahead: Option<String>,

    /// How often the lookahead pass runs.
    cadence: Option<String>,
}

impl Transport {
    pub fn total_subdivisions(&self) -> u32 {
        self.total_subdivisions.unwrap_or(TOTAL_SUBDIVISIONS)
    }

    pub fn subdivisions_per_beat(&self) -> u32 {
        self.subdivisions_per_beat.unwrap_or(SUBDIVISIONS_PER_BEAT)
    }

    pub fn schedule_ahead(&self) -> Result<Duration, ConfigError> {
        parse_duration("schedule_ahead", &self.schedule_ahead, DEFAULT_SCHEDULE_AHEAD)
    }

    pub fn cadence(&self) -> Result<Duration, ConfigError> {
        parse_duration("cadence", &self.cadence, DEFAULT_CADENCE)
    }

    /// Builds validated transport settings.
    pub fn settings(&self) -> Result<TransportSettings, ConfigError> {
        Ok(TransportSettings::new(
            self.total_subdivisions(),
            self.subdivisions_per_beat(),
            self.schedule_ahead()?,
            self.cadence()?,
        )?)
    }
}

/// Parses an optional human duration such as "25ms", falling back to a default.
pub(super) fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(Into::into)
            .map_err(|e| ConfigError::Duration {
                field,
                value: value.clone(),
                message: e.to_string(),
            }),
        None => Ok(default),
    }
}
