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
use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::buffer::DecodedSample;
use super::error::LoadCause;

/// Decodes an encoded audio file held in memory into interleaved f32 frames.
/// The extension, if known, is passed to the format probe as a hint.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedSample, LoadCause> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadCause::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(&params, &decoder_opts)?;

    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut data: Vec<f32> = Vec::new();
    let mut scratch: Option<SampleBuffer<f32>> = None;

    while let Some(packet) = next_packet(format_reader.as_mut())? {
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is skipped rather than failing the whole sample.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count() as u16;
        }
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }

        let needs_alloc = scratch
            .as_ref()
            .map(|buf| buf.capacity() < decoded.capacity() * spec.channels.count())
            .unwrap_or(true);
        if needs_alloc {
            scratch = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = scratch.as_mut() {
            buf.copy_interleaved_ref(decoded);
            data.extend_from_slice(buf.samples());
        }
    }

    if data.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(LoadCause::Empty);
    }

    Ok(DecodedSample::new(data, channels, sample_rate))
}

/// Reads the next packet, treating the end of stream as `None`.
fn next_packet(format_reader: &mut dyn FormatReader) -> Result<Option<Packet>, LoadCause> {
    match format_reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        // Some readers report the end of stream as a decode error.
        Err(SymphoniaError::DecodeError(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    #[test]
    fn test_decode_wav() {
        let samples: Vec<i16> = (0..4410).map(|i| ((i % 100) * 100) as i16).collect();
        let bytes = wav_bytes(&samples, 44100).unwrap();

        let decoded = decode(bytes, Some("wav")).unwrap();
        assert_eq!(decoded.channel_count(), 1);
        assert_eq!(decoded.sample_rate(), 44100);
        assert_eq!(decoded.frames(), 4410);

        let expected = 100.0 * 100.0 / 32768.0;
        assert!((decoded.frame_value(1, 0) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode(b"definitely not audio".to_vec(), None);
        assert!(result.is_err());
    }
}
