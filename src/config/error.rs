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
use crate::composition::CompositionError;
use crate::transport::{TempoError, TransportError};

/// Typed error for session config failures so callers can distinguish a file
/// that failed to parse from one that parsed but describes an invalid session.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid duration {value:?} for {field}: {message}")]
    Duration {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("invalid composition: {0}")]
    Composition(#[from] CompositionError),

    #[error("invalid tempo: {0}")]
    Tempo(#[from] TempoError),

    #[error("invalid transport: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Invalid(String),
}
