use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::{AudioConstraints, SyntheticConfig};
use crate::session::{Locale, SessionConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Directory of static client files served as fallback
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let audio = AudioConstraints::default();
        Self {
            echo_cancellation: audio.echo_cancellation,
            noise_suppression: audio.noise_suppression,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub timeslice_ms: u64,
    pub tick_interval_ms: u64,
    pub locale: Locale,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 1000,
            tick_interval_ms: 1000,
            locale: Locale::En,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SCREEN_RECORDER").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid screen recorder configuration")
    }

    pub fn audio_constraints(&self) -> AudioConstraints {
        AudioConstraints {
            echo_cancellation: self.capture.echo_cancellation,
            noise_suppression: self.capture.noise_suppression,
            sample_rate: self.capture.sample_rate,
            channels: self.capture.channels,
        }
    }

    /// Template for every session created by the service
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeslice: Duration::from_millis(self.recording.timeslice_ms.max(1)),
            tick_interval: Duration::from_millis(self.recording.tick_interval_ms.max(1)),
            locale: self.recording.locale,
            audio: self.audio_constraints(),
            ..SessionConfig::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "screen-recorder"

[service.http]
bind = "127.0.0.1"
port = 3000

[recording]
locale = "ja"
"#
        )
        .unwrap();

        let cfg = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(cfg.bind_address(), "127.0.0.1:3000");
        assert_eq!(cfg.recording.timeslice_ms, 1000);
        assert_eq!(cfg.capture.sample_rate, 44100);

        let session = cfg.session_config();
        assert_eq!(session.locale, Locale::Ja);
        assert_eq!(session.timeslice, Duration::from_secs(1));
        assert!(session.audio.echo_cancellation);
    }
}
