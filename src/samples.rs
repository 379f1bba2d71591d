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

//! Sample fetching, decoding and caching.
//!
//! Samples are decoded fully into memory and shared between voices. Loads of
//! the same reference are coalesced and their outcome, success or failure, is
//! remembered for the session.

mod buffer;
mod catalog;
mod decode;
mod error;
mod fetch;
mod store;

pub use buffer::DecodedSample;
pub use catalog::SampleCatalog;
pub use decode::decode;
pub use error::{LoadCause, SampleLoadError};
pub use fetch::{FileFetcher, Fetcher};
pub use store::{PreloadReport, Residency, SampleStore};
