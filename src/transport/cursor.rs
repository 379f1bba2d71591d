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

/// The scheduler's position: the next subdivision to schedule and the audio
/// clock time it falls on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    next_event_time: f64,
    subdivision: u32,
}

impl Cursor {
    /// A cursor at subdivision 0, due at `now`.
    pub fn start(now: f64) -> Cursor {
        Cursor {
            next_event_time: now,
            subdivision: 0,
        }
    }

    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    pub fn subdivision(&self) -> u32 {
        self.subdivision
    }

    /// Moves to the next subdivision, wrapping at `total`.
    pub fn advance(&mut self, seconds_per_subdivision: f64, total: u32) {
        self.next_event_time += seconds_per_subdivision;
        self.subdivision = (self.subdivision + 1) % total.max(1);
    }

    /// Visits every subdivision due before `now + window`, handing each one's
    /// index and start time to `schedule`, and advances past it. Returns the
    /// number of subdivisions visited.
    pub fn pass<F>(
        &mut self,
        now: f64,
        window: f64,
        seconds_per_subdivision: f64,
        total: u32,
        mut schedule: F,
    ) -> usize
    where
        F: FnMut(u32, f64),
    {
        let horizon = now + window;
        let mut visited = 0;
        while self.next_event_time < horizon {
            schedule(self.subdivision, self.next_event_time);
            self.advance(seconds_per_subdivision, total);
            visited += 1;
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start() {
        let cursor = Cursor::start(3.25);
        assert_eq!(cursor.next_event_time(), 3.25);
        assert_eq!(cursor.subdivision(), 0);
    }

    #[test]
    fn test_full_cycle_wraps() {
        let mut cursor = Cursor::start(0.0);
        for _ in 0..64 {
            cursor.advance(0.125, 64);
        }
        assert_eq!(cursor.subdivision(), 0);
        assert_eq!(cursor.next_event_time(), 8.0);

        cursor.advance(0.125, 64);
        assert_eq!(cursor.subdivision(), 1);
    }

    #[test]
    fn test_pass_schedules_within_window() {
        let mut cursor = Cursor::start(0.0);
        let mut seen = Vec::new();

        // 120 BPM: 0.125 s per subdivision, so a 0.1 s window only covers the first.
        let visited = cursor.pass(0.0, 0.1, 0.125, 64, |sub, time| seen.push((sub, time)));
        assert_eq!(visited, 1);
        assert_eq!(seen, vec![(0, 0.0)]);

        // Nothing new is due until the clock moves.
        assert_eq!(cursor.pass(0.0, 0.1, 0.125, 64, |_, _| {}), 0);

        seen.clear();
        cursor.pass(0.2, 0.1, 0.125, 64, |sub, time| seen.push((sub, time)));
        assert_eq!(seen, vec![(1, 0.125), (2, 0.25)]);
        assert_eq!(cursor.subdivision(), 3);
    }

    #[test]
    fn test_pass_catches_up_after_stall() {
        let mut cursor = Cursor::start(0.0);
        let visited = cursor.pass(1.0, 0.1, 0.125, 64, |_, _| {});
        // Every subdivision before 1.1 s is still visited, in order.
        assert_eq!(visited, 9);
        assert_eq!(cursor.subdivision(), 9);
    }

    #[test]
    fn test_tempo_change_applies_to_later_subdivisions() {
        let mut cursor = Cursor::start(0.0);
        cursor.pass(0.0, 0.1, 0.125, 64, |_, _| {});
        assert_eq!(cursor.next_event_time(), 0.125);

        // Doubling the tempo halves the spacing from here on.
        let mut times = Vec::new();
        cursor.pass(0.2, 0.1, 0.0625, 64, |_, time| times.push(time));
        assert_eq!(times, vec![0.125, 0.1875, 0.25]);
    }
}
