// Encoders turning live frames into container bytes
//
// A recorder feeds every frame to its encoder and asks for a slice of encoded
// bytes at each timeslice. Concatenating every slice in order, followed by the
// bytes returned from `finish`, yields one complete file.

use base64::Engine;
use serde::Serialize;
use tracing::warn;

use crate::capture::AudioConstraints;
use crate::error::RecorderError;
use crate::media::{AudioFrame, AudioStreamSource, MediaFrame, MediaStream, TrackKind};

pub trait MediaEncoder: Send + Sync {
    fn mime_type(&self) -> &str;

    /// File extension of the produced container, without the dot
    fn extension(&self) -> &str;

    fn write(&mut self, frame: &MediaFrame) -> Result<(), RecorderError>;

    /// Bytes encoded since the previous slice
    fn take_slice(&mut self) -> Vec<u8>;

    /// Flush whatever is still pending; the encoder is not used afterwards
    fn finish(&mut self) -> Result<Vec<u8>, RecorderError>;
}

fn matches_format(frame: &AudioFrame, constraints: &AudioConstraints) -> bool {
    if frame.sample_rate != constraints.sample_rate || frame.channels != constraints.channels {
        warn!(
            "Dropping {:?} frame: {}Hz/{}ch does not match {}Hz/{}ch",
            frame.source,
            frame.sample_rate,
            frame.channels,
            constraints.sample_rate,
            constraints.channels
        );
        return false;
    }
    true
}

/// Streaming 16-bit PCM WAV for the audio-only recorders
///
/// The header is emitted with the first audio written and declares an
/// open-ended data chunk, so the file stays valid however long it grows.
pub struct WavEncoder {
    constraints: AudioConstraints,
    header_written: bool,
    pending: Vec<u8>,
}

impl WavEncoder {
    pub fn new(constraints: AudioConstraints) -> Self {
        Self {
            constraints,
            header_written: false,
            pending: Vec::new(),
        }
    }

    fn spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.constraints.channels,
            sample_rate: self.constraints.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

impl MediaEncoder for WavEncoder {
    fn mime_type(&self) -> &str {
        "audio/wav"
    }

    fn extension(&self) -> &str {
        "wav"
    }

    fn write(&mut self, frame: &MediaFrame) -> Result<(), RecorderError> {
        let MediaFrame::Audio(audio) = frame else {
            return Ok(());
        };

        if !matches_format(audio, &self.constraints) {
            return Ok(());
        }

        if !self.header_written {
            let header = self.spec().into_header_for_infinite_file();
            self.pending.extend_from_slice(&header);
            self.header_written = true;
        }

        self.pending.reserve(audio.samples.len() * 2);
        for sample in &audio.samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(())
    }

    fn take_slice(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    fn finish(&mut self) -> Result<Vec<u8>, RecorderError> {
        Ok(self.take_slice())
    }
}

#[derive(Debug, Serialize)]
struct TrackInfo {
    id: String,
    kind: TrackKind,
    label: String,
}

/// One line of the media log
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LogRecord {
    Header {
        version: u32,
        created_at: String,
        sample_rate: u32,
        channels: u16,
        tracks: Vec<TrackInfo>,
    },
    Video {
        timestamp_ms: u64,
        width: u32,
        height: u32,
        /// Base64-encoded RGB bytes
        data: String,
    },
    Audio {
        timestamp_ms: u64,
        sample_rate: u32,
        channels: u16,
        source: AudioStreamSource,
        /// Base64-encoded little-endian PCM bytes
        pcm: String,
    },
}

/// Newline-delimited JSON container for the combined audio/video recording
///
/// The first record describes the stream; every other record carries one
/// frame with its payload base64-encoded.
pub struct MediaLogEncoder {
    constraints: AudioConstraints,
    pending: Vec<u8>,
}

impl MediaLogEncoder {
    pub const VERSION: u32 = 1;

    pub fn new(stream: &MediaStream, constraints: AudioConstraints) -> Result<Self, RecorderError> {
        let mut encoder = Self {
            constraints,
            pending: Vec::new(),
        };

        let header = LogRecord::Header {
            version: Self::VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_rate: encoder.constraints.sample_rate,
            channels: encoder.constraints.channels,
            tracks: stream
                .tracks()
                .iter()
                .map(|track| TrackInfo {
                    id: track.id().to_string(),
                    kind: track.kind(),
                    label: track.label().to_string(),
                })
                .collect(),
        };
        encoder.append(&header)?;

        Ok(encoder)
    }

    fn append(&mut self, record: &LogRecord) -> Result<(), RecorderError> {
        serde_json::to_writer(&mut self.pending, record)?;
        self.pending.push(b'\n');
        Ok(())
    }
}

impl MediaEncoder for MediaLogEncoder {
    fn mime_type(&self) -> &str {
        "application/x-ndjson"
    }

    fn extension(&self) -> &str {
        "ndjson"
    }

    fn write(&mut self, frame: &MediaFrame) -> Result<(), RecorderError> {
        let engine = &base64::engine::general_purpose::STANDARD;

        let record = match frame {
            MediaFrame::Video(video) => LogRecord::Video {
                timestamp_ms: video.timestamp_ms,
                width: video.width,
                height: video.height,
                data: engine.encode(&video.data),
            },
            MediaFrame::Audio(audio) => {
                if !matches_format(audio, &self.constraints) {
                    return Ok(());
                }
                let pcm: Vec<u8> = audio.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                LogRecord::Audio {
                    timestamp_ms: audio.timestamp_ms,
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    source: audio.source,
                    pcm: engine.encode(pcm),
                }
            }
        };

        self.append(&record)
    }

    fn take_slice(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    fn finish(&mut self) -> Result<Vec<u8>, RecorderError> {
        Ok(self.take_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaTrack, VideoFrame};

    fn constraints() -> AudioConstraints {
        AudioConstraints {
            sample_rate: 16000,
            channels: 1,
            ..AudioConstraints::default()
        }
    }

    fn audio(samples: Vec<i16>) -> MediaFrame {
        MediaFrame::Audio(AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
            source: AudioStreamSource::Mixed,
        })
    }

    #[test]
    fn test_wav_header_only_once() {
        let mut encoder = WavEncoder::new(constraints());

        encoder.write(&audio(vec![1, 2])).unwrap();
        let first = encoder.take_slice();
        encoder.write(&audio(vec![3, 4])).unwrap();
        let second = encoder.take_slice();

        assert_eq!(&first[0..4], b"RIFF");
        assert_eq!(&first[8..12], b"WAVE");
        assert!(first.ends_with(&[1, 0, 2, 0]));
        assert_eq!(second, vec![3, 0, 4, 0]);
    }

    #[test]
    fn test_wav_without_audio_stays_empty() {
        let mut encoder = WavEncoder::new(constraints());

        encoder
            .write(&MediaFrame::Video(VideoFrame {
                width: 1,
                height: 1,
                timestamp_ms: 0,
                data: vec![0, 0, 0],
            }))
            .unwrap();

        assert!(encoder.take_slice().is_empty());
        assert!(encoder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_media_log_records() {
        let video = MediaTrack::new(TrackKind::Video, "screen");
        let stream = MediaStream::new(vec![video]);
        let mut encoder = MediaLogEncoder::new(&stream, constraints()).unwrap();

        encoder
            .write(&MediaFrame::Video(VideoFrame {
                width: 2,
                height: 1,
                timestamp_ms: 40,
                data: vec![1, 2, 3, 4, 5, 6],
            }))
            .unwrap();
        encoder.write(&audio(vec![256])).unwrap();

        let bytes = encoder.finish().unwrap();
        let lines: Vec<serde_json::Value> = String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "header");
        assert_eq!(lines[0]["tracks"][0]["kind"], "video");
        assert_eq!(lines[1]["type"], "video");
        assert_eq!(lines[1]["timestamp_ms"], 40);
        assert_eq!(lines[2]["type"], "audio");
        assert_eq!(lines[2]["source"], "mixed");
        assert_eq!(lines[2]["pcm"], "AAE=");
    }
}
