use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use super::frame::MediaFrame;

/// Frames buffered per subscriber before it starts lagging
const FRAME_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Lifecycle of a live track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Producing frames
    Live,
    /// Released by its holder
    Stopped,
    /// Ended by its source (device unplugged, capture revoked from the OS UI)
    Ended,
}

impl TrackState {
    pub fn is_live(self) -> bool {
        self == TrackState::Live
    }
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    frames: broadcast::Sender<MediaFrame>,
    state: watch::Sender<TrackState>,
}

/// Handle to a live media track
///
/// Cloning the handle does not duplicate the track: every clone observes and
/// controls the same underlying capture.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .finish()
    }
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(TrackState::Live);

        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                frames,
                state,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn state(&self) -> TrackState {
        *self.inner.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    /// Release the track. Stopping a track that already left `Live` is a no-op.
    ///
    /// Returns `true` only for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        self.leave_live(TrackState::Stopped)
    }

    /// Mark the track as ended by its source
    pub fn end(&self) -> bool {
        self.leave_live(TrackState::Ended)
    }

    fn leave_live(&self, next: TrackState) -> bool {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.is_live() {
                *state = next;
                true
            } else {
                false
            }
        });

        if changed {
            debug!("Track {} ({}) -> {:?}", self.inner.label, self.inner.id, next);
        }

        changed
    }

    /// Publish a frame to every subscriber. Returns `false` once the track has
    /// left `Live`, which is the producer's cue to exit.
    pub fn push(&self, frame: MediaFrame) -> bool {
        if !self.is_live() {
            return false;
        }

        // No subscribers is fine: frames of an unobserved track are dropped
        let _ = self.inner.frames.send(frame);
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaFrame> {
        self.inner.frames.subscribe()
    }

    /// Resolves with the final state once the track is no longer live
    pub async fn ended(&self) -> TrackState {
        let mut rx = self.inner.state.subscribe();
        loop {
            let current = *rx.borrow_and_update();
            if !current.is_live() {
                return current;
            }
            if rx.changed().await.is_err() {
                return TrackState::Ended;
            }
        }
    }
}

/// Messages produced by [`forward_tracks`]
#[derive(Debug)]
pub enum TrackEvent {
    Frame { index: usize, frame: MediaFrame },
    Ended { index: usize },
}

/// Fan several tracks into one ordered channel
///
/// One forwarder task per track relays frames in arrival order and reports
/// `Ended` once its track leaves `Live`. The channel closes when every
/// forwarder has finished.
pub fn forward_tracks(tracks: &[MediaTrack]) -> mpsc::Receiver<TrackEvent> {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

    for (index, track) in tracks.iter().enumerate() {
        let track = track.clone();
        let tx = tx.clone();
        let mut frames = track.subscribe();

        tokio::spawn(async move {
            let ended = track.ended();
            tokio::pin!(ended);

            loop {
                tokio::select! {
                    biased;
                    recv = frames.recv() => match recv {
                        Ok(frame) => {
                            if tx.send(TrackEvent::Frame { index, frame }).await.is_err() {
                                return;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Subscriber of track {} lagged, {} frames skipped", track.label(), skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut ended => break,
                }
            }

            let _ = tx.send(TrackEvent::Ended { index }).await;
        });
    }

    rx
}
