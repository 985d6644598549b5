use serde::{Deserialize, Serialize};
use tracing::debug;

use super::track::{MediaTrack, TrackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Screen/window/tab video plus optional system audio
    Display,
    /// Microphone audio only
    Microphone,
}

/// An acquired capture handle owning its device tracks
#[derive(Debug, Clone)]
pub struct MediaSource {
    kind: SourceKind,
    tracks: Vec<MediaTrack>,
}

impl MediaSource {
    pub fn new(kind: SourceKind, tracks: Vec<MediaTrack>) -> Self {
        Self { kind, tracks }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    pub fn has_audio(&self) -> bool {
        self.audio_track().is_some()
    }

    /// Stop every track of this source, returning how many were still live
    pub fn stop_all(&self) -> usize {
        stop_tracks(&self.tracks)
    }
}

/// A derived stream assembled from tracks owned elsewhere
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    pub fn stop_all(&self) -> usize {
        stop_tracks(&self.tracks)
    }
}

fn stop_tracks(tracks: &[MediaTrack]) -> usize {
    // Each stop is independent; an already released track just reports false
    tracks.iter().filter(|track| track.stop()).count()
}

/// Combine the display's video with the mixed audio track, if any
pub fn compose(display: &MediaSource, mixed_audio: Option<&MediaTrack>) -> MediaStream {
    let mut tracks: Vec<MediaTrack> = display.video_track().into_iter().cloned().collect();
    tracks.extend(mixed_audio.cloned());

    debug!("Composed stream with {} tracks", tracks.len());

    MediaStream::new(tracks)
}
