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
use std::error::Error;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::samples::{Fetcher, LoadCause};

/// Wait for the given async predicate to return true or fail.
#[inline]
pub async fn eventually_async<F, Fut>(mut predicate: F, error_msg: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().expect("System time error");
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate().await {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}

/// Encodes mono 16-bit samples as an in-memory WAV file.
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(
            &mut cursor,
            WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        )?;
        for sample in samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// An in-memory fetcher that counts requests per URL. Fetches can be held
/// at a gate to line up concurrent loads.
pub struct CountingFetcher {
    files: HashMap<String, Vec<u8>>,
    counts: Mutex<HashMap<String, usize>>,
    gate: watch::Sender<bool>,
    pub total: AtomicUsize,
}

impl CountingFetcher {
    pub fn new() -> CountingFetcher {
        let (gate, _) = watch::channel(true);
        CountingFetcher {
            files: HashMap::new(),
            counts: Mutex::new(HashMap::new()),
            gate,
            total: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> CountingFetcher {
        self.files.insert(url.to_string(), bytes);
        self
    }

    pub fn count(&self, url: &str) -> usize {
        self.counts.lock().get(url).copied().unwrap_or(0)
    }

    /// Blocks fetches until `release` is called.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, LoadCause>> {
        *self.counts.lock().entry(url.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let file = self.files.get(url).cloned();
        let url = url.to_string();
        async move {
            let _ = gate.wait_for(|open| *open).await;
            file.ok_or_else(|| {
                LoadCause::Fetch(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{url} not found"),
                ))
            })
        }
        .boxed()
    }
}
