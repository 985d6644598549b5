use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::messages::Messages;
use super::state::{Controls, Downloads, Preview, SessionState, SessionView, Transition};
use super::stats::{RecorderStats, SessionStats};
use super::ticker::{format_elapsed, spawn_ticker};
use crate::artifact::{Artifact, ArtifactBuilder};
use crate::audio::{AudioMixer, MixerConfig};
use crate::capture::SourceAcquirer;
use crate::error::{CaptureError, RecorderError, SessionError};
use crate::media::{compose, MediaSource, MediaStream, MediaTrack, TrackState};
use crate::recorder::{RecorderFactory, RecorderKind, RecorderSet, RecordingPlan};

/// Everything the session owns, guarded by one lock
struct SessionInner {
    state: SessionState,
    status: String,
    unsupported: bool,
    preview: Option<Preview>,
    display: Option<MediaSource>,
    microphone: Option<MediaSource>,
    mixed: Option<MediaTrack>,
    combined: Option<MediaStream>,
    recorders: Option<RecorderSet>,
    ticker: Option<JoinHandle<()>>,
    /// Every track handed to this session, for the release guarantee
    acquired: Vec<MediaTrack>,
    artifacts: Vec<Artifact>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    final_chunks: Vec<(RecorderKind, usize)>,
}

/// One capture session: `idle -> armed -> recording -> stopped`
///
/// Every control serializes on the session lock, so a transition always sees
/// the state left by the previous one. The `recording -> stopped` edge is
/// taken at most once no matter how many stop requests race for it.
pub struct SessionController {
    config: SessionConfig,
    acquirer: SourceAcquirer,
    recorders: Arc<dyn RecorderFactory>,
    mixer: AudioMixer,
    messages: &'static Messages,
    inner: Mutex<SessionInner>,
    view: Arc<watch::Sender<SessionView>>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        acquirer: SourceAcquirer,
        recorders: Arc<dyn RecorderFactory>,
        supported: bool,
    ) -> Arc<Self> {
        let messages = config.locale.messages();
        let status = if supported {
            messages.idle
        } else {
            messages.unsupported
        };

        let inner = SessionInner {
            state: SessionState::Idle,
            status: status.to_string(),
            unsupported: !supported,
            preview: None,
            display: None,
            microphone: None,
            mixed: None,
            combined: None,
            recorders: None,
            ticker: None,
            acquired: Vec::new(),
            artifacts: Vec::new(),
            started_at: None,
            stopped_at: None,
            final_chunks: Vec::new(),
        };

        let (view, _) = watch::channel(SessionView {
            session_id: config.session_id.clone(),
            state: inner.state,
            status: inner.status.clone(),
            elapsed: format_elapsed(std::time::Duration::ZERO),
            preview: None,
            controls: Controls::for_state(inner.state, inner.unsupported),
            unsupported: inner.unsupported,
            downloads: Downloads::default(),
        });

        info!("Session {} created (supported: {})", config.session_id, supported);

        Arc::new(Self {
            mixer: AudioMixer::new(MixerConfig::from(&config.audio)),
            config,
            acquirer,
            recorders,
            messages,
            inner: Mutex::new(inner),
            view: Arc::new(view),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.view.borrow().state
    }

    /// Latest snapshot of every surface
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// `idle -> armed`: acquire the display and bind the preview to it
    pub async fn acquire_display(self: &Arc<Self>) -> Result<Transition, SessionError> {
        let mut inner = self.inner.lock().await;

        if !Controls::for_state(inner.state, inner.unsupported).acquire_display {
            warn!("Session {}: acquire display ignored while {:?}", self.id(), inner.state);
            return Ok(Transition::Ignored);
        }

        let source = match self.acquirer.acquire_display().await {
            Ok(source) => source,
            Err(e) => {
                if !e.is_recoverable() {
                    inner.unsupported = true;
                }
                self.fail(&mut inner, &e);
                return Err(e.into());
            }
        };

        let Some(video) = source.video_track().cloned() else {
            source.stop_all();
            let e = CaptureError::DeviceUnavailable("display source has no video track".to_string());
            self.fail(&mut inner, &e);
            return Err(e.into());
        };

        inner.acquired.extend(source.tracks().iter().cloned());
        inner.preview = Some(Preview {
            track_id: video.id().to_string(),
            label: video.label().to_string(),
        });
        inner.display = Some(source);
        inner.state = SessionState::Armed;
        inner.status = self.messages.display_ready.to_string();
        self.publish(&inner);

        self.watch_display(video);

        info!("Session {} armed", self.id());

        Ok(Transition::Applied)
    }

    /// `armed -> recording`: acquire the microphone, mix, compose and start
    /// every recorder. On failure nothing stays started and the session
    /// remains armed.
    pub async fn begin_recording(&self) -> Result<Transition, SessionError> {
        let mut inner = self.inner.lock().await;

        if inner.state != SessionState::Armed {
            warn!("Session {}: begin recording ignored while {:?}", self.id(), inner.state);
            return Ok(Transition::Ignored);
        }

        let Some(display) = inner.display.clone() else {
            let e = CaptureError::DeviceUnavailable("no display source".to_string());
            self.fail(&mut inner, &e);
            return Err(e.into());
        };

        let microphone = match self.acquirer.acquire_microphone().await {
            Ok(source) => source,
            Err(e) => {
                self.fail(&mut inner, &e);
                return Err(e.into());
            }
        };

        let mixed = self.mixer.mix(&[&display, &microphone]);
        let combined = compose(&display, mixed.as_ref());
        let plan = RecordingPlan {
            combined: combined.clone(),
            source_audio: display.audio_track().cloned(),
            mic_audio: microphone.audio_track().cloned(),
        };

        let recorders = match self.start_recorders(&plan).await {
            Ok(set) => set,
            Err(e) => {
                microphone.stop_all();
                if let Some(track) = &mixed {
                    track.stop();
                }
                self.fail(&mut inner, &e);
                return Err(e.into());
            }
        };

        inner.acquired.extend(microphone.tracks().iter().cloned());
        inner.acquired.extend(mixed.iter().cloned());
        inner.microphone = Some(microphone);
        inner.mixed = mixed;
        inner.combined = Some(combined);
        inner.recorders = Some(recorders);
        inner.started_at = Some(Utc::now());
        inner.state = SessionState::Recording;
        inner.status = self.messages.recording.to_string();

        self.view.send_modify(|view| view.elapsed = format_elapsed(std::time::Duration::ZERO));
        self.publish(&inner);

        let view = Arc::clone(&self.view);
        inner.ticker = Some(spawn_ticker(self.config.tick_interval, move |elapsed| {
            view.send_modify(|view| view.elapsed = elapsed);
        }));

        info!("Session {} recording", self.id());

        Ok(Transition::Applied)
    }

    async fn start_recorders(&self, plan: &RecordingPlan) -> Result<RecorderSet, RecorderError> {
        let mut set = RecorderSet::assemble(self.recorders.as_ref(), plan)?;
        set.start(self.config.timeslice).await?;
        Ok(set)
    }

    /// `recording -> stopped`, shared by the stop control and the display
    /// ending on its own
    ///
    /// Stops every recorder and the ticker, releases every track, clears the
    /// preview, then builds the artifacts once every recorder has delivered
    /// its final chunk.
    pub async fn request_stop(&self) -> Transition {
        let mut inner = self.inner.lock().await;

        if inner.state != SessionState::Recording {
            debug!("Session {}: stop ignored while {:?}", self.id(), inner.state);
            return Transition::Ignored;
        }

        inner.state = SessionState::Stopped;
        inner.stopped_at = Some(Utc::now());
        info!("Session {} stopping", self.id());

        let mut recorders = inner.recorders.take();
        if let Some(set) = recorders.as_mut() {
            set.stop_all().await;
        }

        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
            // The last elapsed value is frozen once the task is gone
            let _ = ticker.await;
        }

        let released = release_all(&inner);
        inner.preview = None;
        debug!("Session {} released {} live tracks", self.id(), released);

        let mut buffers = match recorders.as_mut() {
            Some(set) => {
                let buffers = set.collect().await;
                inner.final_chunks = set.chunk_counts();
                buffers
            }
            None => Vec::new(),
        };

        let finalized_at = Utc::now();
        inner.artifacts = ArtifactBuilder::new(self.messages).build(&mut buffers, finalized_at);
        inner.status = self.messages.recording_complete.to_string();
        self.publish(&inner);

        info!(
            "Session {} stopped with {} artifacts",
            self.id(),
            inner.artifacts.len()
        );

        Transition::Applied
    }

    /// Stop the session when the display track ends from outside (the user
    /// revoking capture from the OS). Stops initiated by the session itself
    /// leave the track `Stopped` and are ignored here.
    fn watch_display(self: &Arc<Self>, video: MediaTrack) {
        let session: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            if video.ended().await != TrackState::Ended {
                return;
            }

            if let Some(session) = session.upgrade() {
                session.on_display_ended().await;
            }
        });
    }

    async fn on_display_ended(&self) {
        let mut inner = self.inner.lock().await;
        let state = inner.state;

        match state {
            SessionState::Recording => {
                info!("Session {}: display ended during recording", self.id());
                drop(inner);
                self.request_stop().await;
            }
            SessionState::Armed => {
                info!("Session {}: display ended while armed", self.id());
                if let Some(display) = inner.display.take() {
                    display.stop_all();
                }
                inner.preview = None;
                inner.state = SessionState::Idle;
                inner.status = self.messages.capture_ended.to_string();
                self.publish(&inner);
            }
            state => debug!("Session {}: display ended while {:?}", self.id(), state),
        }
    }

    fn fail(&self, inner: &mut SessionInner, e: &dyn std::fmt::Display) {
        error!("Session {}: {}", self.id(), e);
        inner.status = self.messages.error(e);
        self.publish(inner);
    }

    /// Push the lock-guarded state to every surface; the elapsed time is
    /// owned by the ticker
    fn publish(&self, inner: &SessionInner) {
        let controls = Controls::for_state(inner.state, inner.unsupported);
        let downloads = Downloads::from_artifacts(&inner.artifacts);

        self.view.send_modify(|view| {
            view.state = inner.state;
            view.status = inner.status.clone();
            view.preview = inner.preview.clone();
            view.controls = controls;
            view.unsupported = inner.unsupported;
            view.downloads = downloads;
        });
    }

    pub async fn display_source(&self) -> Option<MediaSource> {
        self.inner.lock().await.display.clone()
    }

    pub async fn microphone_source(&self) -> Option<MediaSource> {
        self.inner.lock().await.microphone.clone()
    }

    pub async fn mixed_track(&self) -> Option<MediaTrack> {
        self.inner.lock().await.mixed.clone()
    }

    pub async fn combined_stream(&self) -> Option<MediaStream> {
        self.inner.lock().await.combined.clone()
    }

    /// Every track acquired or derived during the session
    pub async fn acquired_tracks(&self) -> Vec<MediaTrack> {
        self.inner.lock().await.acquired.clone()
    }

    pub async fn artifacts(&self) -> Vec<Artifact> {
        self.inner.lock().await.artifacts.clone()
    }

    pub async fn artifact(&self, filename: &str) -> Option<Artifact> {
        self.inner
            .lock()
            .await
            .artifacts
            .iter()
            .find(|artifact| artifact.filename == filename)
            .cloned()
    }

    pub async fn stats(&self) -> SessionStats {
        let inner = self.inner.lock().await;

        let chunks = match &inner.recorders {
            Some(set) => set.chunk_counts(),
            None => inner.final_chunks.clone(),
        };
        let recorders: Vec<RecorderStats> = chunks
            .into_iter()
            .map(|(kind, chunks)| RecorderStats { kind, chunks })
            .collect();

        let duration = match (inner.started_at, inner.stopped_at) {
            (Some(start), Some(stop)) => stop.signed_duration_since(start),
            (Some(start), None) => Utc::now().signed_duration_since(start),
            _ => chrono::Duration::zero(),
        };

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: inner.state,
            started_at: inner.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_count: recorders.iter().map(|r| r.chunks).sum(),
            recorders,
            artifacts_count: inner.artifacts.len(),
        }
    }
}

/// Stop every held track, sources first, then the derived streams
///
/// Each stop is independent; already released tracks are skipped.
fn release_all(inner: &SessionInner) -> usize {
    let mut released = 0;

    if let Some(display) = &inner.display {
        released += display.stop_all();
    }
    if let Some(microphone) = &inner.microphone {
        released += microphone.stop_all();
    }
    if let Some(mixed) = &inner.mixed {
        released += usize::from(mixed.stop());
    }
    if let Some(combined) = &inner.combined {
        released += combined.stop_all();
    }
    released += inner.acquired.iter().filter(|track| track.stop()).count();

    released
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();

        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }

        let released = release_all(inner);
        if released > 0 {
            warn!(
                "Session {} dropped with {} live tracks, released",
                self.config.session_id, released
            );
        }
    }
}
