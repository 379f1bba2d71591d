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

// Core mixing logic shared by the cpal output and tests. The render side owns
// the voices; other threads only talk to it through a channel and atomics.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::voice::ScheduledVoice;
use super::AudioError;

/// Counts a voice as live from submission until it is dropped, whether it
/// finished, was still queued, or went down with the mixer.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: &Arc<AtomicUsize>) -> LiveGuard {
        live.fetch_add(1, Ordering::Relaxed);
        LiveGuard(live.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

struct Queued {
    voice: ScheduledVoice,
    guard: LiveGuard,
}

/// A voice being rendered.
struct ActiveVoice {
    voice: ScheduledVoice,
    /// Output frame the voice begins on.
    start_frame: u64,
    /// Fractional read position in source frames.
    position: f64,
    /// Source frames consumed per output frame.
    step: f64,
    _guard: LiveGuard,
}

/// Creates a mixer and the handle used to feed it.
pub fn mixer(channels: u16, sample_rate: u32) -> (Mixer, MixerHandle) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let frames_rendered = Arc::new(AtomicU64::new(0));
    let live = Arc::new(AtomicUsize::new(0));
    let channels = channels.max(1);

    (
        Mixer {
            rx,
            voices: Vec::new(),
            channels,
            sample_rate,
            frames_rendered: frames_rendered.clone(),
        },
        MixerHandle {
            tx,
            channels,
            sample_rate,
            frames_rendered,
            live,
        },
    )
}

/// Sends voices to a mixer and reads its clock. Cheap to clone.
#[derive(Clone)]
pub struct MixerHandle {
    tx: Sender<Queued>,
    channels: u16,
    sample_rate: u32,
    frames_rendered: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
}

impl MixerHandle {
    /// Audio clock in seconds: frames rendered divided by the sample rate.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Voices submitted and not yet released.
    pub fn live_voices(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    pub fn submit(&self, voice: ScheduledVoice) -> Result<(), AudioError> {
        let guard = LiveGuard::new(&self.live);
        self.tx
            .send(Queued { voice, guard })
            .map_err(|_| AudioError::Closed)
    }
}

/// Renders scheduled voices into interleaved output buffers.
pub struct Mixer {
    rx: Receiver<Queued>,
    voices: Vec<ActiveVoice>,
    channels: u16,
    sample_rate: u32,
    frames_rendered: Arc<AtomicU64>,
}

impl Mixer {
    /// Fills `out` with the next block of interleaved audio and advances the
    /// clock by the number of frames written.
    pub fn process_into(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let channels = self.channels as usize;
        let frames = out.len() / channels;
        let base = self.frames_rendered.load(Ordering::Acquire);

        for Queued { voice, guard } in self.rx.try_iter() {
            // Late voices start on the next rendered frame.
            let start_frame = (voice.start_time * self.sample_rate as f64).round().max(0.0) as u64;
            let step =
                voice.playback_rate * voice.sample.sample_rate() as f64 / self.sample_rate as f64;
            // A voice that never advances would never finish.
            if !(step > 0.0 && step.is_finite()) {
                continue;
            }
            self.voices.push(ActiveVoice {
                voice,
                start_frame,
                position: 0.0,
                step,
                _guard: guard,
            });
        }

        self.voices.retain_mut(|active| {
            let offset = active.start_frame.saturating_sub(base);
            if offset >= frames as u64 {
                return true;
            }

            let sample = &active.voice.sample;
            let length = sample.frames() as f64;
            let gain = active.voice.gain;

            for frame in out[offset as usize * channels..frames * channels].chunks_exact_mut(channels) {
                if active.position >= length {
                    return false;
                }

                let index = active.position as usize;
                let fraction = (active.position - index as f64) as f32;
                for (channel, value) in frame.iter_mut().enumerate() {
                    let a = sample.frame_value(index, channel);
                    let b = sample.frame_value(index + 1, channel);
                    *value += (a + (b - a) * fraction) * gain;
                }
                active.position += active.step;
            }

            active.position < length
        });

        self.frames_rendered
            .store(base + frames as u64, Ordering::Release);
    }

    /// Voices currently being rendered or waiting for their start frame.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::voice::next_voice_id;
    use crate::samples::DecodedSample;

    fn voice(data: Vec<f32>, sample_rate: u32, start_time: f64, rate: f64, gain: f32) -> ScheduledVoice {
        ScheduledVoice {
            id: next_voice_id(),
            sample: Arc::new(DecodedSample::new(data, 1, sample_rate)),
            start_time,
            playback_rate: rate,
            gain,
            instrument_id: "test".to_string(),
        }
    }

    #[test]
    fn test_clock_advances_with_rendered_frames() {
        let (mut mixer, handle) = mixer(2, 100);
        let mut out = vec![0.0; 20];
        mixer.process_into(&mut out);
        assert_eq!(handle.current_time(), 0.1);
        mixer.process_into(&mut out);
        assert_eq!(handle.current_time(), 0.2);
    }

    #[test]
    fn test_voice_starts_on_its_frame() {
        let (mut mixer, handle) = mixer(1, 100);
        handle.submit(voice(vec![1.0, 1.0], 100, 0.05, 1.0, 0.5)).unwrap();

        let mut out = vec![0.0; 10];
        mixer.process_into(&mut out);
        assert_eq!(
            out,
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_voice_spanning_buffers() {
        let (mut mixer, handle) = mixer(1, 100);
        handle.submit(voice(vec![1.0; 4], 100, 0.08, 1.0, 1.0)).unwrap();

        let mut out = vec![0.0; 10];
        mixer.process_into(&mut out);
        assert_eq!(&out[8..], &[1.0, 1.0]);
        assert_eq!(mixer.active_voices(), 1);

        mixer.process_into(&mut out);
        assert_eq!(&out[..3], &[1.0, 1.0, 0.0]);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_stalled_voice_released() {
        let (mut mixer, handle) = mixer(1, 100);
        handle.submit(voice(vec![1.0; 4], 100, 0.0, 0.0, 1.0)).unwrap();
        handle.submit(voice(vec![1.0; 4], 100, 0.0, f64::NAN, 1.0)).unwrap();
        assert_eq!(handle.live_voices(), 2);

        let mut out = vec![0.0; 10];
        mixer.process_into(&mut out);
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(handle.live_voices(), 0);
        assert!(out.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn test_late_voice_starts_immediately() {
        let (mut mixer, handle) = mixer(1, 100);
        let mut out = vec![0.0; 10];
        mixer.process_into(&mut out);

        handle.submit(voice(vec![1.0], 100, 0.0, 1.0, 1.0)).unwrap();
        mixer.process_into(&mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_rate_and_interpolation() {
        let (mut mixer, handle) = mixer(1, 100);
        // Double speed skips every other source frame.
        handle
            .submit(voice(vec![0.0, 1.0, 2.0, 3.0], 100, 0.0, 2.0, 1.0))
            .unwrap();
        let mut out = vec![0.0; 4];
        mixer.process_into(&mut out);
        assert_eq!(out, vec![0.0, 2.0, 0.0, 0.0]);

        // Half speed interpolates between source frames.
        handle
            .submit(voice(vec![0.0, 1.0], 100, 0.04, 0.5, 1.0))
            .unwrap();
        mixer.process_into(&mut out);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_native_rate_ratio() {
        // A 50 Hz sample on a 100 Hz output plays each source frame twice as long.
        let (mut mixer, handle) = mixer(1, 100);
        handle.submit(voice(vec![1.0, 1.0], 50, 0.0, 1.0, 1.0)).unwrap();
        let mut out = vec![0.0; 6];
        mixer.process_into(&mut out);
        assert_eq!(&out[..4], &[1.0, 1.0, 1.0, 0.5]);
        assert_eq!(out[4], 0.0);
    }

    #[test]
    fn test_mono_fills_all_channels_and_voices_sum() {
        let (mut mixer, handle) = mixer(2, 100);
        handle.submit(voice(vec![0.25], 100, 0.0, 1.0, 1.0)).unwrap();
        handle.submit(voice(vec![0.5], 100, 0.0, 1.0, 1.0)).unwrap();
        let mut out = vec![0.0; 4];
        mixer.process_into(&mut out);
        assert_eq!(out, vec![0.75, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn test_voices_release() {
        let (mut mixer, handle) = mixer(1, 100);
        handle.submit(voice(vec![1.0; 3], 100, 0.0, 1.0, 1.0)).unwrap();
        handle.submit(voice(vec![1.0; 3], 100, 10.0, 1.0, 1.0)).unwrap();
        assert_eq!(handle.live_voices(), 2);

        let mut out = vec![0.0; 5];
        mixer.process_into(&mut out);
        assert_eq!(handle.live_voices(), 1);

        // Voices still waiting go away with the mixer.
        drop(mixer);
        assert_eq!(handle.live_voices(), 0);
        assert!(matches!(
            handle.submit(voice(vec![1.0], 100, 0.0, 1.0, 1.0)),
            Err(AudioError::Closed)
        ));
        assert_eq!(handle.live_voices(), 0);
    }
}
