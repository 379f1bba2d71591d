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
use std::fmt;
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::buffer::DecodedSample;
use super::decode::decode;
use super::error::{LoadCause, SampleLoadError};
use super::fetch::{extension, Fetcher};

type LoadResult = Result<Arc<DecodedSample>, Arc<SampleLoadError>>;
type LoadFuture = Shared<BoxFuture<'static, LoadResult>>;

/// Cache slot for a single sample reference.
enum Entry {
    /// A load is in flight; every caller awaits the same future.
    Loading(LoadFuture),
    Ready(Arc<DecodedSample>),
    /// Failures are remembered until explicitly evicted.
    Failed(Arc<SampleLoadError>),
}

/// Non-blocking view of a sample's cache state.
#[derive(Debug, Clone)]
pub enum Residency {
    Ready(Arc<DecodedSample>),
    Pending,
    Failed(Arc<SampleLoadError>),
}

/// Outcome of a batch preload.
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<Arc<SampleLoadError>>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Memoizing, load-coalescing cache of decoded samples keyed by reference.
#[derive(Clone)]
pub struct SampleStore {
    fetcher: Arc<dyn Fetcher>,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SampleStore {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> SampleStore {
        SampleStore {
            fetcher,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the decoded sample for the reference, loading it on first use.
    /// Concurrent callers share one in-flight load.
    pub async fn get(&self, url: &str) -> LoadResult {
        let future = {
            let mut entries = self.entries.lock();
            match entries.get(url) {
                Some(Entry::Ready(sample)) => return Ok(sample.clone()),
                Some(Entry::Failed(e)) => return Err(e.clone()),
                Some(Entry::Loading(future)) => future.clone(),
                None => self.start_load(&mut entries, url),
            }
        };

        let result = future.clone().await;
        settle(&self.entries, url, &future, &result);
        result
    }

    /// Probes the cache without waiting. A miss starts a background load and
    /// reports `Pending`. Must be called from within a tokio runtime.
    pub fn request(&self, url: &str) -> Residency {
        let mut entries = self.entries.lock();
        match entries.get(url) {
            Some(Entry::Ready(sample)) => Residency::Ready(sample.clone()),
            Some(Entry::Failed(e)) => Residency::Failed(e.clone()),
            Some(Entry::Loading(_)) => Residency::Pending,
            None => {
                let _loading = self.start_load(&mut entries, url);
                Residency::Pending
            }
        }
    }

    /// Returns the sample if it is already decoded.
    pub fn resident(&self, url: &str) -> Option<Arc<DecodedSample>> {
        match self.entries.lock().get(url) {
            Some(Entry::Ready(sample)) => Some(sample.clone()),
            _ => None,
        }
    }

    /// Loads every reference concurrently and waits for all of them to settle.
    /// A failure is logged and reported but does not stop sibling loads.
    pub async fn preload<I, S>(&self, urls: I) -> PreloadReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        urls.sort();
        urls.dedup();

        let results = join_all(urls.iter().map(|url| self.get(url))).await;

        let mut report = PreloadReport::default();
        for (url, result) in urls.into_iter().zip(results) {
            match result {
                Ok(_) => report.loaded.push(url),
                Err(e) => report.failed.push(e),
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            memory_bytes = self.memory_usage(),
            "Preloaded samples"
        );
        report
    }

    /// Forgets a failed load so that the next request retries it. Returns true
    /// if a failure was evicted.
    pub fn evict_failed(&self, url: &str) -> bool {
        let mut entries = self.entries.lock();
        if matches!(entries.get(url), Some(Entry::Failed(_))) {
            entries.remove(url);
            debug!(url, "Evicted failed sample");
            return true;
        }
        false
    }

    /// Total bytes held by decoded samples.
    pub fn memory_usage(&self) -> usize {
        self.entries
            .lock()
            .values()
            .map(|entry| match entry {
                Entry::Ready(sample) => sample.memory_size(),
                _ => 0,
            })
            .sum()
    }

    /// Inserts a `Loading` entry for the reference and spawns the task that
    /// drives the load and settles the entry.
    fn start_load(&self, entries: &mut HashMap<String, Entry>, url: &str) -> LoadFuture {
        let fetch = self.fetcher.fetch(url);
        let owned_url = url.to_string();
        let future = async move {
            load(owned_url, fetch)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared();

        entries.insert(url.to_string(), Entry::Loading(future.clone()));

        let pending = future.clone();
        let store = self.entries.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let result = pending.clone().await;
            settle(&store, &url, &pending, &result);
        });

        future
    }
}

/// Replaces the `Loading` entry for this exact load with its outcome. Later
/// loads of the same reference (after an eviction) are left untouched.
fn settle(
    entries: &Mutex<HashMap<String, Entry>>,
    url: &str,
    future: &LoadFuture,
    result: &LoadResult,
) {
    let mut entries = entries.lock();
    match entries.get(url) {
        Some(Entry::Loading(current)) if current.ptr_eq(future) => {}
        _ => return,
    }

    let entry = match result {
        Ok(sample) => Entry::Ready(sample.clone()),
        Err(e) => {
            warn!(url = %e.url, err = %e.cause, "Sample failed to load");
            Entry::Failed(e.clone())
        }
    };
    entries.insert(url.to_string(), entry);
}

async fn load(
    url: String,
    fetch: BoxFuture<'static, Result<Vec<u8>, LoadCause>>,
) -> Result<DecodedSample, SampleLoadError> {
    let bytes = fetch
        .await
        .map_err(|cause| SampleLoadError::new(url.clone(), cause))?;

    let ext = extension(&url);
    let sample = tokio::task::spawn_blocking(move || decode(bytes, ext.as_deref()))
        .await
        .map_err(|e| SampleLoadError::new(url.clone(), LoadCause::Worker(e.to_string())))?
        .map_err(|cause| SampleLoadError::new(url.clone(), cause))?;

    info!(
        url = %url,
        channels = sample.channel_count(),
        sample_rate = sample.sample_rate(),
        duration_ms = sample.duration().as_millis() as u64,
        memory_bytes = sample.memory_size(),
        "Sample loaded"
    );
    Ok(sample)
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let (mut ready, mut loading, mut failed) = (0, 0, 0);
        for entry in entries.values() {
            match entry {
                Entry::Ready(_) => ready += 1,
                Entry::Loading(_) => loading += 1,
                Entry::Failed(_) => failed += 1,
            }
        }
        f.debug_struct("SampleStore")
            .field("ready", &ready)
            .field("loading", &loading)
            .field("failed", &failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testutil::{eventually_async, wav_bytes, CountingFetcher};

    fn tone() -> Vec<u8> {
        let samples: Vec<i16> = (0..441).map(|i| (i * 10) as i16).collect();
        wav_bytes(&samples, 44100).unwrap()
    }

    #[tokio::test]
    async fn test_get_is_memoized() {
        let fetcher = Arc::new(CountingFetcher::new().with("kick.wav", tone()));
        let store = SampleStore::new(fetcher.clone());

        let first = store.get("kick.wav").await.unwrap();
        let second = store.get("kick.wav").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.count("kick.wav"), 1);
        assert_eq!(first.frames(), 441);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_loads_coalesce() {
        let fetcher = Arc::new(CountingFetcher::new().with("snare.wav", tone()));
        fetcher.hold();
        let store = SampleStore::new(fetcher.clone());

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.get("snare.wav").await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.get("snare.wav").await }
        });

        eventually_async(
            || {
                let fetcher = fetcher.clone();
                async move { fetcher.count("snare.wav") >= 1 }
            },
            "Fetch never started",
        )
        .await;
        fetcher.release();

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fetcher.count("snare.wav"), 1);
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_memoized_until_evicted() {
        let fetcher = Arc::new(CountingFetcher::new());
        let store = SampleStore::new(fetcher.clone());

        let err = store.get("missing.wav").await.unwrap_err();
        assert_eq!(err.url, "missing.wav");
        assert!(store.get("missing.wav").await.is_err());
        assert_eq!(fetcher.count("missing.wav"), 1);

        assert!(store.evict_failed("missing.wav"));
        assert!(!store.evict_failed("missing.wav"));
        assert!(store.get("missing.wav").await.is_err());
        assert_eq!(fetcher.count("missing.wav"), 2);
    }

    #[tokio::test]
    async fn test_request_does_not_block() {
        let fetcher = Arc::new(CountingFetcher::new().with("hihat.wav", tone()));
        let store = SampleStore::new(fetcher.clone());

        assert!(matches!(store.request("hihat.wav"), Residency::Pending));
        assert!(store.resident("hihat.wav").is_none());

        eventually_async(
            || {
                let store = store.clone();
                async move { matches!(store.request("hihat.wav"), Residency::Ready(_)) }
            },
            "Sample never became resident",
        )
        .await;
        assert!(store.resident("hihat.wav").is_some());
        assert_eq!(fetcher.count("hihat.wav"), 1);
    }

    #[tokio::test]
    async fn test_preload_reports_failures_without_aborting() {
        let fetcher = Arc::new(
            CountingFetcher::new()
                .with("a.wav", tone())
                .with("b.wav", b"garbage".to_vec()),
        );
        let store = SampleStore::new(fetcher);

        let report = store.preload(["a.wav", "b.wav", "c.wav", "a.wav"]).await;
        assert_eq!(report.loaded, vec!["a.wav".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert!(!report.is_complete());
        assert!(store.resident("a.wav").is_some());
        assert_eq!(store.memory_usage(), 441 * 4);
    }
}
