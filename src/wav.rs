//! RIFF/WAVE Sample Loading
//!
//! Decodes uncompressed PCM WAVE data into a [`SampleBuffer`]. Only the two
//! depths the engine was built around are accepted: 16-bit signed and 8-bit
//! unsigned. The `fmt ` header is cross-checked (byte rate and block align
//! must agree with channel count and depth) and every chunk must lie inside
//! the file; anything else is reported as a [`LoadError`] rather than
//! patched over.
//!
//! Decoded buffers carry the file's sample rate and a base pitch of 440 Hz.

use crate::error::LoadError;
use crate::frame::Frame;
use crate::sample::SampleBuffer;
use std::path::Path;

const PCM: u16 = 1;

/// Header fields of a validated WAVE file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub frames: usize,
}

#[inline]
fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

struct Fmt {
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

fn parse_fmt(body: &[u8]) -> Result<Fmt, LoadError> {
    if body.len() < 16 {
        return Err(LoadError::Truncated { what: "fmt chunk" });
    }
    let audio_format = le_u16(body, 0);
    if audio_format != PCM {
        return Err(LoadError::UnsupportedFormat(audio_format));
    }
    Ok(Fmt {
        channels: le_u16(body, 2),
        sample_rate: le_u32(body, 4),
        byte_rate: le_u32(body, 8),
        block_align: le_u16(body, 12),
        bits_per_sample: le_u16(body, 14),
    })
}

/// Walk the chunk list and validate the header. Returns the format and the
/// raw `data` chunk.
fn parse(bytes: &[u8]) -> Result<(WaveFormat, &[u8]), LoadError> {
    if bytes.len() < 4 || &bytes[0..4] != b"RIFF" {
        return Err(LoadError::UnknownFormat);
    }
    if bytes.len() < 12 {
        return Err(LoadError::Truncated { what: "RIFF header" });
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(LoadError::NotWave);
    }

    // Writers that never patched the RIFF size are common, so only the
    // file length bounds the chunk walk.
    let riff_end = (le_u32(bytes, 4) as usize).saturating_add(8);
    let end = riff_end.min(bytes.len());

    let mut fmt = None;
    let mut data = None;
    let mut pos = 12;
    while pos + 8 <= end {
        let id = &bytes[pos..pos + 4];
        let size = le_u32(bytes, pos + 4) as usize;
        let start = pos + 8;
        let what = match id {
            b"fmt " => "fmt chunk",
            b"data" => "data chunk",
            _ => "chunk",
        };
        let body_end = start
            .checked_add(size)
            .filter(|&e| e <= end)
            .ok_or(LoadError::Truncated { what })?;
        let body = &bytes[start..body_end];

        match id {
            b"fmt " => fmt = Some(parse_fmt(body)?),
            b"data" => data = Some(body),
            other => log::debug!(
                "skipping WAVE chunk '{}' ({} bytes)",
                String::from_utf8_lossy(other),
                size
            ),
        }

        // Chunks are word aligned
        pos = body_end + (size & 1);
    }

    let fmt = fmt.ok_or(LoadError::MissingChunk("fmt "))?;
    let data = data.ok_or(LoadError::MissingChunk("data"))?;

    if fmt.bits_per_sample != 8 && fmt.bits_per_sample != 16 {
        return Err(LoadError::UnsupportedBitDepth(fmt.bits_per_sample));
    }
    if fmt.channels == 0 {
        return Err(LoadError::NoChannels);
    }
    if fmt.sample_rate == 0 {
        return Err(LoadError::SampleRate(fmt.sample_rate));
    }

    let bytes_per_sample = (fmt.bits_per_sample >> 3) as u32;
    let expected_align = fmt.channels as u32 * bytes_per_sample;
    let expected_rate = fmt.sample_rate as u64 * expected_align as u64;
    if fmt.byte_rate as u64 != expected_rate {
        return Err(LoadError::ByteRate {
            expected: expected_rate,
            found: fmt.byte_rate,
        });
    }
    if fmt.block_align as u32 != expected_align {
        return Err(LoadError::BlockAlign {
            expected: expected_align,
            found: fmt.block_align,
        });
    }
    if data.len() % fmt.block_align as usize != 0 {
        return Err(LoadError::DataLength {
            len: data.len(),
            block_align: fmt.block_align,
        });
    }

    let format = WaveFormat {
        channels: fmt.channels,
        sample_rate: fmt.sample_rate,
        byte_rate: fmt.byte_rate,
        block_align: fmt.block_align,
        bits_per_sample: fmt.bits_per_sample,
        frames: data.len() / fmt.block_align as usize,
    };
    Ok((format, data))
}

/// Validate a WAVE image and report its format without decoding samples.
pub fn probe(bytes: &[u8]) -> Result<WaveFormat, LoadError> {
    parse(bytes).map(|(format, _)| format)
}

/// Decode a WAVE image with exactly `CH` channels.
pub fn decode<const CH: usize>(bytes: &[u8]) -> Result<SampleBuffer<CH>, LoadError> {
    let (format, data) = parse(bytes)?;
    if format.channels as usize != CH {
        return Err(LoadError::ChannelCount {
            expected: CH,
            found: format.channels,
        });
    }
    if format.frames == 0 {
        return Err(LoadError::Empty);
    }

    let width = (format.bits_per_sample >> 3) as usize;
    let frames: Vec<Frame<CH>> = data
        .chunks_exact(format.block_align as usize)
        .map(|block| {
            let mut frame = Frame::silence();
            for (ch, s) in block.chunks_exact(width).enumerate() {
                frame[ch] = match width {
                    2 => i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0,
                    _ => (s[0] as f32 - 128.0) / 128.0,
                };
            }
            frame
        })
        .collect();

    Ok(SampleBuffer::new(frames).with_sample_rate(format.sample_rate as f32))
}

/// Read and decode a WAVE file.
pub fn load<const CH: usize, P: AsRef<Path>>(path: P) -> Result<SampleBuffer<CH>, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let buffer = decode::<CH>(&bytes)?;
    log::info!(
        "loaded {}: {} frame(s), {} channel(s) at {} Hz",
        path.display(),
        buffer.len(),
        CH,
        buffer.sample_rate()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hound_wav<S: hound::Sample + Copy>(channels: u16, bits: u16, samples: &[S]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Hand-assembled WAVE image: PCM fmt fields plus arbitrary extra chunks.
    struct WaveBuilder {
        fmt: [u16; 2],
        sample_rate: u32,
        byte_rate: u32,
        block_align: u16,
        bits: u16,
        chunks: Vec<([u8; 4], Vec<u8>)>,
    }

    impl WaveBuilder {
        fn mono16(data: &[i16]) -> Self {
            Self {
                fmt: [PCM, 1],
                sample_rate: 8000,
                byte_rate: 16000,
                block_align: 2,
                bits: 16,
                chunks: vec![(*b"data", data.iter().flat_map(|s| s.to_le_bytes()).collect())],
            }
        }

        fn build(&self) -> Vec<u8> {
            let mut fmt = Vec::new();
            fmt.extend_from_slice(&self.fmt[0].to_le_bytes());
            fmt.extend_from_slice(&self.fmt[1].to_le_bytes());
            fmt.extend_from_slice(&self.sample_rate.to_le_bytes());
            fmt.extend_from_slice(&self.byte_rate.to_le_bytes());
            fmt.extend_from_slice(&self.block_align.to_le_bytes());
            fmt.extend_from_slice(&self.bits.to_le_bytes());

            let mut body = b"WAVE".to_vec();
            let mut push = |id: &[u8], payload: &[u8]| {
                body.extend_from_slice(id);
                body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                body.extend_from_slice(payload);
                if payload.len() % 2 == 1 {
                    body.push(0);
                }
            };
            push(b"fmt ", &fmt);
            for (id, payload) in &self.chunks {
                push(id, payload);
            }

            let mut out = b"RIFF".to_vec();
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            out.extend_from_slice(&body);
            out
        }
    }

    #[test]
    fn test_decode_16bit_stereo() {
        let bytes = hound_wav::<i16>(2, 16, &[0, 16384, -32768, 32767, 8192, -8192]);
        let format = probe(&bytes).unwrap();
        assert_eq!(format.channels, 2);
        assert_eq!(format.frames, 3);
        assert_eq!(format.sample_rate, 22050);

        let buf = decode::<2>(&bytes).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.sample_rate(), 22050.0);
        assert_eq!(buf.base(), 440.0);
        assert_eq!(buf.frame(0).0, [0.0, 0.5]);
        assert_eq!(buf.frame(1).0, [-1.0, 32767.0 / 32768.0]);
        assert_eq!(buf.frame(2).0, [0.25, -0.25]);
    }

    #[test]
    fn test_decode_8bit_is_unsigned() {
        let bytes = hound_wav::<i8>(1, 8, &[0, 64, -128, 127]);
        let buf = decode::<1>(&bytes).unwrap();
        let values: Vec<f32> = buf.frames().iter().map(|f| f[0]).collect();
        assert_eq!(values, vec![0.0, 0.5, -1.0, 127.0 / 128.0]);
    }

    #[test]
    fn test_channel_mismatch() {
        let bytes = hound_wav::<i16>(2, 16, &[0, 0]);
        match decode::<1>(&bytes) {
            Err(LoadError::ChannelCount { expected: 1, found: 2 }) => {}
            other => panic!("unexpected result {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_skips_unknown_and_odd_chunks() {
        let mut wave = WaveBuilder::mono16(&[100, -100]);
        wave.chunks.insert(0, (*b"LIST", vec![1, 2, 3]));
        let buf = decode::<1>(&wave.build()).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.frame(0)[0], 100.0 / 32768.0);
        assert_eq!(buf.sample_rate(), 8000.0);
    }

    #[test]
    fn test_rejects_non_riff() {
        assert!(matches!(probe(b"OggS...."), Err(LoadError::UnknownFormat)));
        assert!(matches!(probe(b""), Err(LoadError::UnknownFormat)));

        let mut bytes = WaveBuilder::mono16(&[0]).build();
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(probe(&bytes), Err(LoadError::NotWave)));
    }

    #[test]
    fn test_rejects_missing_chunks() {
        let mut wave = WaveBuilder::mono16(&[0]);
        wave.chunks.clear();
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::MissingChunk("data"))
        ));

        // fmt renamed so only data remains
        let mut bytes = WaveBuilder::mono16(&[0]).build();
        bytes[12..16].copy_from_slice(b"junk");
        assert!(matches!(probe(&bytes), Err(LoadError::MissingChunk("fmt "))));
    }

    #[test]
    fn test_rejects_bad_header_fields() {
        let mut wave = WaveBuilder::mono16(&[0]);
        wave.fmt[0] = 3;
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::UnsupportedFormat(3))
        ));

        let mut wave = WaveBuilder::mono16(&[0]);
        wave.bits = 24;
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::UnsupportedBitDepth(24))
        ));

        let mut wave = WaveBuilder::mono16(&[0]);
        wave.byte_rate = 8000;
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::ByteRate {
                expected: 16000,
                found: 8000
            })
        ));

        let mut wave = WaveBuilder::mono16(&[0]);
        wave.block_align = 4;
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::BlockAlign {
                expected: 2,
                found: 4
            })
        ));

        let mut wave = WaveBuilder::mono16(&[0]);
        wave.fmt[1] = 0;
        wave.byte_rate = 0;
        wave.block_align = 0;
        assert!(matches!(probe(&wave.build()), Err(LoadError::NoChannels)));
    }

    #[test]
    fn test_rejects_ragged_data() {
        let mut wave = WaveBuilder::mono16(&[]);
        wave.chunks = vec![(*b"data", vec![0, 0, 0])];
        assert!(matches!(
            probe(&wave.build()),
            Err(LoadError::DataLength {
                len: 3,
                block_align: 2
            })
        ));
    }

    #[test]
    fn test_rejects_truncated_chunk() {
        let mut bytes = WaveBuilder::mono16(&[1, 2, 3, 4]).build();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            probe(&bytes),
            Err(LoadError::Truncated { what: "data chunk" })
        ));
    }

    #[test]
    fn test_rejects_empty_data() {
        let wave = WaveBuilder::mono16(&[]);
        assert_eq!(probe(&wave.build()).unwrap().frames, 0);
        assert!(matches!(decode::<1>(&wave.build()), Err(LoadError::Empty)));
    }

    #[test]
    fn test_load_reports_path() {
        let err = load::<1, _>("/nonexistent/tickwave/test.wav").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/tickwave/test.wav"));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("tickwave-load-{}.wav", std::process::id()));
        std::fs::write(&path, hound_wav::<i16>(1, 16, &[0, 32767, -16384])).unwrap();
        let buf = load::<1, _>(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.frame(2)[0], -0.5);
    }
}
