// Integration tests for recorders and the recorder set
//
// The stream recorder tests run on paused time so every timeslice fires
// deterministically. The set tests use fake recorders to observe start and
// stop calls.

use anyhow::Result;
use screen_recorder::capture::AudioConstraints;
use screen_recorder::error::RecorderError;
use screen_recorder::media::{
    AudioFrame, AudioStreamSource, MediaFrame, MediaStream, MediaTrack, TrackKind,
};
use screen_recorder::recorder::{
    EncodingRecorderFactory, Recorder, RecorderEvent, RecorderFactory, RecorderKind,
    RecorderSet, RecorderState, RecordingPlan,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn constraints() -> AudioConstraints {
    AudioConstraints {
        sample_rate: 16000,
        channels: 1,
        ..AudioConstraints::default()
    }
}

fn audio(samples: Vec<i16>, timestamp_ms: u64) -> MediaFrame {
    MediaFrame::Audio(AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
        source: AudioStreamSource::Microphone,
    })
}

async fn drain(mut events: mpsc::Receiver<RecorderEvent>) -> (Vec<(usize, Vec<u8>)>, bool) {
    let mut chunks = Vec::new();
    let mut stopped = false;

    while let Some(event) = events.recv().await {
        match event {
            RecorderEvent::DataAvailable(chunk) => chunks.push((chunk.sequence, chunk.data)),
            RecorderEvent::Stopped => {
                stopped = true;
                break;
            }
        }
    }

    (chunks, stopped)
}

#[tokio::test(start_paused = true)]
async fn test_wav_recorder_emits_a_chunk_per_timeslice() -> Result<()> {
    let mic = MediaTrack::new(TrackKind::Audio, "microphone");
    let factory = EncodingRecorderFactory::new(constraints());
    let mut recorder = factory.create(RecorderKind::MicAudio, MediaStream::new(vec![mic.clone()]))?;

    assert_eq!(recorder.mime_type(), "audio/wav");
    assert_eq!(recorder.extension(), "wav");

    let events = recorder.start(Duration::from_secs(1))?;
    let collector = tokio::spawn(drain(events));

    mic.push(audio(vec![1, 2], 0));
    sleep(Duration::from_millis(1500)).await;
    mic.push(audio(vec![3, 4], 1500));
    tokio::task::yield_now().await;

    recorder.stop().await?;
    let (chunks, stopped) = collector.await?;

    assert!(stopped);
    assert_eq!(chunks.len(), 2, "one timeslice plus the flush on stop");
    assert_eq!(chunks[0].0, 0);
    assert_eq!(chunks[1].0, 1);
    assert_eq!(&chunks[0].1[0..4], b"RIFF");
    assert!(chunks[0].1.ends_with(&[1, 0, 2, 0]));
    assert_eq!(chunks[1].1, vec![3, 0, 4, 0]);
    assert_eq!(recorder.state(), RecorderState::Inactive);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_terminal() -> Result<()> {
    let mic = MediaTrack::new(TrackKind::Audio, "microphone");
    let factory = EncodingRecorderFactory::new(constraints());
    let mut recorder = factory.create(RecorderKind::MicAudio, MediaStream::new(vec![mic]))?;

    let events = recorder.start(Duration::from_secs(1))?;
    let collector = tokio::spawn(drain(events));

    recorder.stop().await?;
    recorder.stop().await?;

    let (chunks, stopped) = collector.await?;
    assert!(stopped);
    assert!(chunks.is_empty(), "no audio, no chunks");

    let restart = recorder.start(Duration::from_secs(1));
    assert!(matches!(restart, Err(RecorderError::InvalidState { .. })));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_primary_recorder_writes_media_log() -> Result<()> {
    let video = MediaTrack::new(TrackKind::Video, "screen");
    let factory = EncodingRecorderFactory::new(constraints());
    let mut recorder = factory.create(RecorderKind::Primary, MediaStream::new(vec![video]))?;

    assert_eq!(recorder.mime_type(), "application/x-ndjson");

    let events = recorder.start(Duration::from_secs(1))?;
    let collector = tokio::spawn(drain(events));

    sleep(Duration::from_millis(1100)).await;
    recorder.stop().await?;

    let (chunks, _) = collector.await?;
    let text = String::from_utf8(chunks.into_iter().flat_map(|(_, data)| data).collect())?;
    let header: serde_json::Value = serde_json::from_str(text.lines().next().unwrap_or_default())?;

    assert_eq!(header["type"], "header");
    assert_eq!(header["sample_rate"], 16000);

    Ok(())
}

// ============================================================================
// Recorder set
// ============================================================================

struct FakeRecorder {
    kind: RecorderKind,
    state: RecorderState,
    fail_start: bool,
    fail_stop: bool,
    stops: Arc<AtomicUsize>,
    events: Option<mpsc::Sender<RecorderEvent>>,
}

#[async_trait::async_trait]
impl Recorder for FakeRecorder {
    fn kind(&self) -> RecorderKind {
        self.kind
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn mime_type(&self) -> &str {
        "application/octet-stream"
    }

    fn extension(&self) -> &str {
        "bin"
    }

    fn start(&mut self, _timeslice: Duration) -> Result<mpsc::Receiver<RecorderEvent>, RecorderError> {
        if self.fail_start {
            return Err(RecorderError::Encoder("refused to start".to_string()));
        }

        let (tx, rx) = mpsc::channel(8);
        let chunk = screen_recorder::recorder::Chunk {
            sequence: 0,
            data: self.kind.role().as_bytes().to_vec(),
        };
        tx.try_send(RecorderEvent::DataAvailable(chunk))
            .map_err(|e| RecorderError::Task(e.to_string()))?;

        self.events = Some(tx);
        self.state = RecorderState::Recording;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        if self.fail_stop && self.state == RecorderState::Recording {
            // Keeps the sender, so `Stopped` never arrives
            return Err(RecorderError::Encoder("flush failed".to_string()));
        }
        if self.state == RecorderState::Recording {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if let Some(tx) = self.events.take() {
                let _ = tx.send(RecorderEvent::Stopped).await;
            }
        }
        self.state = RecorderState::Inactive;
        Ok(())
    }
}

#[derive(Default)]
struct FakeFactory {
    failing: Option<RecorderKind>,
    failing_stop: Option<RecorderKind>,
    stops: Arc<AtomicUsize>,
}

impl RecorderFactory for FakeFactory {
    fn create(&self, kind: RecorderKind, _stream: MediaStream) -> Result<Box<dyn Recorder>, RecorderError> {
        Ok(Box::new(FakeRecorder {
            kind,
            state: RecorderState::Idle,
            fail_start: self.failing == Some(kind),
            fail_stop: self.failing_stop == Some(kind),
            stops: Arc::clone(&self.stops),
            events: None,
        }))
    }
}

fn plan(source_audio: bool, mic_audio: bool) -> RecordingPlan {
    let audio = |label: &str| MediaTrack::new(TrackKind::Audio, label);
    RecordingPlan {
        combined: MediaStream::new(vec![MediaTrack::new(TrackKind::Video, "screen")]),
        source_audio: source_audio.then(|| audio("system audio")),
        mic_audio: mic_audio.then(|| audio("microphone")),
    }
}

#[test]
fn test_set_cardinality_follows_available_tracks() -> Result<()> {
    let factory = FakeFactory::default();

    let cases = [
        (false, false, vec![RecorderKind::Primary]),
        (true, false, vec![RecorderKind::Primary, RecorderKind::SourceAudio]),
        (false, true, vec![RecorderKind::Primary, RecorderKind::MicAudio]),
        (
            true,
            true,
            vec![RecorderKind::Primary, RecorderKind::SourceAudio, RecorderKind::MicAudio],
        ),
    ];

    for (source_audio, mic_audio, expected) in cases {
        let set = RecorderSet::assemble(&factory, &plan(source_audio, mic_audio))?;
        assert_eq!(set.kinds(), expected);
    }

    Ok(())
}

#[tokio::test]
async fn test_failed_start_stops_the_started_recorders() -> Result<()> {
    let factory = FakeFactory {
        failing: Some(RecorderKind::MicAudio),
        ..FakeFactory::default()
    };
    let mut set = RecorderSet::assemble(&factory, &plan(true, true))?;

    let result = set.start(Duration::from_secs(1)).await;

    assert!(result.is_err());
    assert_eq!(factory.stops.load(Ordering::SeqCst), 2, "primary and source-audio stopped once");

    set.stop_all().await;
    assert_eq!(factory.stops.load(Ordering::SeqCst), 2, "inactive recorders are left untouched");

    Ok(())
}

#[tokio::test]
async fn test_collect_returns_buffers_primary_first() -> Result<()> {
    let factory = FakeFactory::default();
    let mut set = RecorderSet::assemble(&factory, &plan(true, true))?;

    set.start(Duration::from_secs(1)).await?;
    set.stop_all().await;
    let buffers = set.collect().await;

    let kinds: Vec<RecorderKind> = buffers.iter().map(|b| b.kind()).collect();
    assert_eq!(
        kinds,
        vec![RecorderKind::Primary, RecorderKind::SourceAudio, RecorderKind::MicAudio]
    );
    assert!(buffers.iter().all(|b| b.len() == 1));
    assert_eq!(
        set.chunk_counts(),
        vec![
            (RecorderKind::Primary, 1),
            (RecorderKind::SourceAudio, 1),
            (RecorderKind::MicAudio, 1)
        ]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_collect_does_not_wait_on_a_recorder_that_failed_to_stop() -> Result<()> {
    let factory = FakeFactory {
        failing_stop: Some(RecorderKind::MicAudio),
        ..FakeFactory::default()
    };
    let mut set = RecorderSet::assemble(&factory, &plan(true, true))?;

    set.start(Duration::from_secs(1)).await?;
    set.stop_all().await;
    let buffers = tokio::time::timeout(Duration::from_secs(5), set.collect()).await?;

    let kinds: Vec<RecorderKind> = buffers.iter().map(|b| b.kind()).collect();
    assert_eq!(
        kinds,
        vec![RecorderKind::Primary, RecorderKind::SourceAudio, RecorderKind::MicAudio]
    );
    assert_eq!(buffers[0].len(), 1);
    assert_eq!(buffers[1].len(), 1);
    assert!(buffers[2].is_empty(), "cancelled collector yields an empty buffer");

    Ok(())
}
