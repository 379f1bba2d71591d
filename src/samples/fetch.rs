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
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::debug;

use super::error::LoadCause;

/// Retrieves the encoded bytes behind a sample reference.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, LoadCause>>;
}

/// Fetches samples from the local filesystem. Accepts plain paths and
/// `file://` URLs; relative paths resolve against the base directory.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    pub fn new(base: impl Into<PathBuf>) -> FileFetcher {
        FileFetcher { base: base.into() }
    }

    /// Maps a sample reference onto a filesystem path.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, LoadCause> {
        let raw = match url.split_once("://") {
            Some(("file", rest)) => rest,
            Some((scheme, _)) => return Err(LoadCause::UnsupportedScheme(scheme.to_string())),
            None => url,
        };

        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base.join(path))
        }
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        FileFetcher::new(".")
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, LoadCause>> {
        let path = self.resolve(url);
        async move {
            let path = path?;
            debug!(path = ?path, "Reading sample file");
            Ok(tokio::fs::read(&path).await?)
        }
        .boxed()
    }
}

/// Returns the lowercase file extension of a sample reference, if any.
pub fn extension(url: &str) -> Option<String> {
    let name = url.rsplit('/').next().unwrap_or(url);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
