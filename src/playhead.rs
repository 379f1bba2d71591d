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
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{span, Instrument, Level};

/// Default period of the display refresh.
pub const DEFAULT_REFRESH: Duration = Duration::from_millis(16);

/// Bridges the scheduler's position to the display. The scheduler writes the
/// position on every pass; the display side publishes it only when it changes.
#[derive(Debug)]
pub struct Playhead {
    position: AtomicU32,
    last_published: Mutex<Option<u32>>,
    tx: watch::Sender<u32>,
}

impl Playhead {
    pub fn new() -> Playhead {
        let (tx, _) = watch::channel(0);
        Playhead {
            position: AtomicU32::new(0),
            last_published: Mutex::new(None),
            tx,
        }
    }

    /// Returns a receiver of published subdivisions.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.tx.subscribe()
    }

    /// Records the scheduler's current subdivision.
    pub fn set(&self, subdivision: u32) {
        self.position.store(subdivision, Ordering::Relaxed);
    }

    pub fn position(&self) -> u32 {
        self.position.load(Ordering::Relaxed)
    }

    /// Publishes the current position if it differs from the last published
    /// one. Returns the published value.
    pub fn refresh(&self) -> Option<u32> {
        let position = self.position();
        let mut last = self.last_published.lock();
        if *last == Some(position) {
            return None;
        }

        *last = Some(position);
        self.tx.send_replace(position);
        Some(position)
    }

    /// Rewinds to 0 and publishes it, even if 0 was the last value shown.
    pub fn reset(&self) {
        self.set(0);
        *self.last_published.lock() = None;
        self.refresh();
    }

    /// Spawns the periodic display refresh.
    pub fn spawn_display(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let playhead = self.clone();
        let span = span!(Level::INFO, "display");
        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    playhead.refresh();
                }
            }
            .instrument(span),
        )
    }
}

impl Default for Playhead {
    fn default() -> Self {
        Playhead::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_only_on_change() {
        let playhead = Playhead::new();
        let rx = playhead.subscribe();

        assert_eq!(playhead.refresh(), Some(0));
        assert_eq!(playhead.refresh(), None);

        playhead.set(5);
        assert_eq!(playhead.refresh(), Some(5));
        assert_eq!(playhead.refresh(), None);
        assert_eq!(*rx.borrow(), 5);
    }

    #[test]
    fn test_reset_always_publishes_zero() {
        let playhead = Playhead::new();
        let mut rx = playhead.subscribe();
        playhead.refresh();
        rx.borrow_and_update();

        // Zero again, but reset still publishes it.
        playhead.reset();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 0);

        playhead.set(9);
        playhead.refresh();
        playhead.reset();
        assert_eq!(*rx.borrow(), 0);
        assert_eq!(playhead.refresh(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_task_publishes() {
        let playhead = Arc::new(Playhead::new());
        let mut rx = playhead.subscribe();
        let task = playhead.spawn_display(DEFAULT_REFRESH);

        playhead.set(3);
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|sub| *sub == 3))
            .await
            .unwrap()
            .unwrap();
        task.abort();
    }
}
