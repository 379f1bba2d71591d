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
use std::fmt;
use std::time::Duration;

/// A fully decoded sample, shared between voices via `Arc`.
pub struct DecodedSample {
    /// Interleaved f32 samples.
    data: Vec<f32>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Native sample rate of the audio data.
    sample_rate: u32,
}

impl DecodedSample {
    /// Creates a decoded sample from interleaved data. A trailing partial frame
    /// is dropped. Channel count and sample rate are at least 1.
    pub fn new(mut data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSample {
        let channel_count = channel_count.max(1);
        let sample_rate = sample_rate.max(1);
        let whole = data.len() - data.len() % channel_count as usize;
        data.truncate(whole);

        DecodedSample {
            data,
            channel_count,
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Playback length at the native rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the value of the given channel at a frame, or silence when the
    /// frame is out of range. Channels past the sample's count fold onto its
    /// last channel so mono samples fill every output channel.
    #[inline]
    pub fn frame_value(&self, frame: usize, channel: usize) -> f32 {
        let channel = channel.min(self.channel_count as usize - 1);
        self.data
            .get(frame * self.channel_count as usize + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for DecodedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedSample")
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let sample = DecodedSample::new(vec![0.0; 88200], 2, 44100);
        assert_eq!(sample.frames(), 44100);
        assert_eq!(sample.duration(), Duration::from_secs(1));
        assert_eq!(sample.memory_size(), 88200 * 4);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let sample = DecodedSample::new(vec![0.1, 0.2, 0.3], 2, 48000);
        assert_eq!(sample.frames(), 1);
    }

    #[test]
    fn test_frame_value() {
        let sample = DecodedSample::new(vec![0.1, 0.2, 0.3, 0.4], 2, 48000);
        assert_eq!(sample.frame_value(0, 0), 0.1);
        assert_eq!(sample.frame_value(1, 1), 0.4);
        // Out of range frames are silent.
        assert_eq!(sample.frame_value(2, 0), 0.0);
        // Extra channels fold onto the last channel.
        assert_eq!(sample.frame_value(0, 5), 0.2);

        let mono = DecodedSample::new(vec![0.5, 0.25], 1, 48000);
        assert_eq!(mono.frame_value(1, 0), 0.25);
        assert_eq!(mono.frame_value(1, 1), 0.25);
    }

    #[test]
    fn test_zero_rate_and_channels_clamped() {
        let sample = DecodedSample::new(vec![0.5; 4], 0, 0);
        assert_eq!(sample.channel_count(), 1);
        assert_eq!(sample.sample_rate(), 1);
        assert_eq!(sample.frames(), 4);
        assert_eq!(sample.duration(), Duration::from_secs(4));
    }
}
