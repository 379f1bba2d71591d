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

/// Why a sample could not be made resident.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    #[error("unsupported sample location scheme: {0}")]
    UnsupportedScheme(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] std::io::Error),

    #[error("decode failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("sample has no audio track")]
    NoTrack,

    #[error("sample has no decodable frames")]
    Empty,

    #[error("decode worker failed: {0}")]
    Worker(String),
}

/// A sample could not be fetched or decoded. Loads are never retried
/// automatically.
#[derive(Debug, thiserror::Error)]
#[error("failed to load sample {url}: {cause}")]
pub struct SampleLoadError {
    pub url: String,
    #[source]
    pub cause: LoadCause,
}

impl SampleLoadError {
    pub fn new(url: impl Into<String>, cause: impl Into<LoadCause>) -> SampleLoadError {
        SampleLoadError {
            url: url.into(),
            cause: cause.into(),
        }
    }
}
