//! Live media primitives shared by capture, mixing and recording
//!
//! A [`MediaTrack`] is a cloneable handle onto one live capture. Frames are
//! fanned out over a broadcast channel and the track lifecycle is observable
//! through a watch channel, so every consumer can subscribe for frames and
//! for the end-of-life signal independently.

pub mod frame;
pub mod source;
pub mod track;

pub use frame::{AudioFrame, AudioStreamSource, MediaFrame, VideoFrame};
pub use source::{compose, MediaSource, MediaStream, SourceKind};
pub use track::{forward_tracks, MediaTrack, TrackEvent, TrackKind, TrackState};
