//! Downloadable files assembled from recorder buffers at finalize time

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::recorder::{ChunkBuffer, RecorderKind};
use crate::session::Messages;

/// A finalized recording, ready to be downloaded
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: RecorderKind,
    /// Human-readable link text
    pub label: String,
    pub mime_type: String,
    pub filename: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Artifact {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Write the artifact into `dir` under its own filename
    pub async fn save(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.data).await?;

        info!("Saved {} ({} bytes)", path.display(), self.data.len());

        Ok(path)
    }
}

/// Filename-safe form of the finalize instant
///
/// ISO-8601 UTC with millisecond precision, `:` and `.` replaced by `-`,
/// e.g. `2025-03-01T12-30-05-123Z`.
pub fn filename_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

pub struct ArtifactBuilder {
    messages: &'static Messages,
}

impl ArtifactBuilder {
    pub fn new(messages: &'static Messages) -> Self {
        Self { messages }
    }

    /// Package every buffer into an artifact and clear it
    ///
    /// The primary artifact is always produced, even when its buffer holds
    /// nothing; the audio-only ones only when their buffer has data. Every
    /// artifact of one call shares the timestamp of `at`.
    pub fn build(&self, buffers: &mut [ChunkBuffer], at: DateTime<Utc>) -> Vec<Artifact> {
        let timestamp = filename_timestamp(&at);
        let mut artifacts = Vec::with_capacity(buffers.len());

        for buffer in buffers.iter_mut() {
            let kind = buffer.kind();

            if buffer.is_empty() && kind != RecorderKind::Primary {
                debug!("{:?} buffer is empty, no artifact", kind);
                continue;
            }

            let data = buffer.take_payload();
            artifacts.push(Artifact {
                kind,
                label: self.messages.download_label(kind).to_string(),
                mime_type: buffer.mime_type().to_string(),
                filename: format!("{}-{}.{}", kind.role(), timestamp, buffer.extension()),
                data,
            });
        }

        info!(
            "Built {} artifacts: {:?}",
            artifacts.len(),
            artifacts.iter().map(|a| a.filename.as_str()).collect::<Vec<_>>()
        );

        artifacts
    }
}
