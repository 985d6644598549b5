// Synthetic capture backend
//
// Produces a moving test-pattern video track and sine-tone audio tracks on
// tokio intervals. Used by the CLI, the HTTP server and the test-suite in
// place of an OS capture API.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use super::backend::{AudioConstraints, CaptureBackend, DisplayConstraints};
use crate::error::CaptureError;
use crate::media::{
    AudioFrame, AudioStreamSource, MediaFrame, MediaSource, MediaTrack, SourceKind, TrackKind,
    VideoFrame,
};

/// Configuration for the synthetic backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Whether the shared display carries system audio
    pub display_audio: bool,
    /// Whether the microphone source carries an audio track
    pub microphone_audio: bool,
    pub system_tone_hz: f32,
    pub microphone_tone_hz: f32,
    /// Length of each produced audio frame
    pub audio_frame_ms: u64,
    /// Simulate the user declining the screen picker
    pub deny_display: bool,
    /// Simulate the user declining microphone access
    pub deny_microphone: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 90,
            frame_rate: 10,
            display_audio: true,
            microphone_audio: true,
            system_tone_hz: 440.0,
            microphone_tone_hz: 220.0,
            audio_frame_ms: 20,
            deny_display: false,
            deny_microphone: false,
        }
    }
}

pub struct SyntheticBackend {
    config: SyntheticConfig,
}

impl SyntheticBackend {
    pub fn new(config: SyntheticConfig) -> Self {
        info!(
            "Synthetic backend initialized: {}x{}@{}fps, system audio: {}, microphone audio: {}",
            config.width,
            config.height,
            config.frame_rate,
            config.display_audio,
            config.microphone_audio
        );

        Self { config }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    fn supports_recording(&self) -> bool {
        true
    }

    fn supports_display_capture(&self) -> bool {
        true
    }

    async fn get_display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaSource, CaptureError> {
        if self.config.deny_display {
            return Err(CaptureError::UserCancelled);
        }

        let started = Instant::now();
        let video = MediaTrack::new(TrackKind::Video, "synthetic screen");
        spawn_video(video.clone(), &self.config, started);

        let mut tracks = vec![video];

        if let (true, Some(audio)) = (self.config.display_audio, constraints.audio.as_ref()) {
            let track = MediaTrack::new(TrackKind::Audio, "synthetic system audio");
            spawn_tone(
                track.clone(),
                ToneSpec {
                    frequency_hz: self.config.system_tone_hz,
                    frame_ms: self.config.audio_frame_ms,
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    source: AudioStreamSource::System,
                },
                started,
            );
            tracks.push(track);
        }

        Ok(MediaSource::new(SourceKind::Display, tracks))
    }

    async fn get_user_media(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaSource, CaptureError> {
        if self.config.deny_microphone {
            return Err(CaptureError::PermissionDenied(
                "microphone access was denied".to_string(),
            ));
        }

        let mut tracks = Vec::new();

        if self.config.microphone_audio {
            let track = MediaTrack::new(TrackKind::Audio, "synthetic microphone");
            spawn_tone(
                track.clone(),
                ToneSpec {
                    frequency_hz: self.config.microphone_tone_hz,
                    frame_ms: self.config.audio_frame_ms,
                    sample_rate: constraints.sample_rate,
                    channels: constraints.channels,
                    source: AudioStreamSource::Microphone,
                },
                Instant::now(),
            );
            tracks.push(track);
        }

        Ok(MediaSource::new(SourceKind::Microphone, tracks))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Time between video frames, never zero
fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_micros((1_000_000 / frame_rate.max(1) as u64).max(1))
}

fn spawn_video(track: MediaTrack, config: &SyntheticConfig, started: Instant) {
    let width = config.width.max(1);
    let height = config.height.max(1);
    let period = frame_period(config.frame_rate);

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        let ended = track.ended();
        tokio::pin!(ended);
        let mut index: u32 = 0;

        loop {
            tokio::select! {
                _ = &mut ended => break,
                _ = interval.tick() => {
                    let frame = VideoFrame {
                        width,
                        height,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                        data: test_pattern(width, height, index),
                    };
                    if !track.push(MediaFrame::Video(frame)) {
                        break;
                    }
                    index = index.wrapping_add(1);
                }
            }
        }

        debug!("Video producer for {} exited after {} frames", track.label(), index);
    });
}

/// Diagonal gradient that scrolls one pixel per frame
fn test_pattern(width: u32, height: u32, index: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(x.wrapping_add(index) as u8);
            data.push(y as u8);
            data.push(index as u8);
        }
    }
    data
}

struct ToneSpec {
    frequency_hz: f32,
    frame_ms: u64,
    sample_rate: u32,
    channels: u16,
    source: AudioStreamSource,
}

fn spawn_tone(track: MediaTrack, spec: ToneSpec, started: Instant) {
    let frame_ms = spec.frame_ms.max(1);
    let frames_per_buffer = (spec.sample_rate as u64 * frame_ms / 1000) as usize;
    let channels = spec.channels.max(1) as usize;
    let step = spec.frequency_hz / spec.sample_rate.max(1) as f32;

    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(frame_ms));
        let ended = track.ended();
        tokio::pin!(ended);
        let mut phase = 0.0f32;

        loop {
            tokio::select! {
                _ = &mut ended => break,
                _ = interval.tick() => {
                    let mut samples = Vec::with_capacity(frames_per_buffer * channels);
                    for _ in 0..frames_per_buffer {
                        let value = ((phase * TAU).sin() * 8000.0) as i16;
                        samples.extend(std::iter::repeat(value).take(channels));
                        phase = (phase + step).fract();
                    }

                    let frame = AudioFrame {
                        samples,
                        sample_rate: spec.sample_rate,
                        channels: spec.channels,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                        source: spec.source,
                    };
                    if !track.push(MediaFrame::Audio(frame)) {
                        break;
                    }
                }
            }
        }

        debug!("Tone producer for {} exited", track.label());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_constraints() -> DisplayConstraints {
        DisplayConstraints {
            cursor: super::super::backend::CursorVisibility::Always,
            audio: Some(AudioConstraints::default()),
        }
    }

    #[tokio::test]
    async fn test_display_with_and_without_audio() {
        let backend = SyntheticBackend::new(SyntheticConfig::default());
        let source = backend.get_display_media(&display_constraints()).await.unwrap();
        assert!(source.video_track().is_some());
        assert!(source.has_audio());
        source.stop_all();

        let backend = SyntheticBackend::new(SyntheticConfig {
            display_audio: false,
            ..SyntheticConfig::default()
        });
        let source = backend.get_display_media(&display_constraints()).await.unwrap();
        assert!(!source.has_audio());
        source.stop_all();
    }

    #[tokio::test]
    async fn test_denied_microphone() {
        let backend = SyntheticBackend::new(SyntheticConfig {
            deny_microphone: true,
            ..SyntheticConfig::default()
        });

        let err = backend
            .get_user_media(&AudioConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tone_frames_match_constraints() {
        let backend = SyntheticBackend::new(SyntheticConfig::default());
        let constraints = AudioConstraints {
            sample_rate: 16000,
            channels: 1,
            ..AudioConstraints::default()
        };
        let source = backend.get_user_media(&constraints).await.unwrap();
        let mut rx = source.audio_track().unwrap().subscribe();

        match rx.recv().await.unwrap() {
            MediaFrame::Audio(frame) => {
                assert_eq!(frame.sample_rate, 16000);
                assert_eq!(frame.channels, 1);
                assert_eq!(frame.samples.len(), 320); // 20ms at 16kHz mono
                assert_eq!(frame.source, AudioStreamSource::Microphone);
            }
            other => panic!("expected audio, got {:?}", other),
        }

        source.stop_all();
    }

    #[test]
    fn test_frame_period_is_never_zero() {
        assert_eq!(frame_period(5), Duration::from_millis(200));
        assert_eq!(frame_period(0), Duration::from_secs(1));
        assert_eq!(frame_period(u32::MAX), Duration::from_micros(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_frame_rate_still_produces_video() {
        let backend = SyntheticBackend::new(SyntheticConfig {
            width: 2,
            height: 2,
            frame_rate: 2_000_000,
            ..SyntheticConfig::default()
        });
        let source = backend.get_display_media(&display_constraints()).await.unwrap();
        let mut rx = source.video_track().unwrap().subscribe();

        assert!(matches!(rx.recv().await.unwrap(), MediaFrame::Video(_)));
        source.stop_all();
    }

    #[test]
    fn test_pattern_size() {
        assert_eq!(test_pattern(4, 3, 0).len(), 36);
    }
}
