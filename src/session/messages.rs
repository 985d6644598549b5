use serde::{Deserialize, Serialize};

use crate::recorder::RecorderKind;

/// Display language of the status and download surfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::Ja => &JA,
        }
    }
}

/// User-facing strings for one locale
#[derive(Debug)]
pub struct Messages {
    pub idle: &'static str,
    pub display_ready: &'static str,
    pub recording: &'static str,
    pub recording_complete: &'static str,
    pub capture_ended: &'static str,
    pub unsupported: &'static str,
    /// Prepended to every error surfaced on the status line
    pub error_prefix: &'static str,
    pub download_primary: &'static str,
    pub download_source_audio: &'static str,
    pub download_mic_audio: &'static str,
}

impl Messages {
    pub fn error(&self, error: &dyn std::fmt::Display) -> String {
        format!("{}{}", self.error_prefix, error)
    }

    pub fn download_label(&self, kind: RecorderKind) -> &'static str {
        match kind {
            RecorderKind::Primary => self.download_primary,
            RecorderKind::SourceAudio => self.download_source_audio,
            RecorderKind::MicAudio => self.download_mic_audio,
        }
    }
}

static EN: Messages = Messages {
    idle: "ready to capture",
    display_ready: "screen capture ready",
    recording: "recording...",
    recording_complete: "recording complete",
    capture_ended: "screen capture ended",
    unsupported: "this platform does not support recording",
    error_prefix: "error: ",
    download_primary: "Download recording",
    download_source_audio: "Download system audio",
    download_mic_audio: "Download microphone audio",
};

static JA: Messages = Messages {
    idle: "待機中",
    display_ready: "スクリーンキャプチャ準備完了",
    recording: "録画中...",
    recording_complete: "録画完了",
    capture_ended: "スクリーンキャプチャが終了しました",
    unsupported: "お使いのブラウザはMediaRecorder APIをサポートしていません。",
    error_prefix: "エラー: ",
    download_primary: "クリックしてダウンロード",
    download_source_audio: "クリックしてダウンロード (システム音声)",
    download_mic_audio: "クリックしてダウンロード (マイク音声)",
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptureError;

    #[test]
    fn test_error_is_prefixed() {
        let en = Locale::En.messages().error(&CaptureError::UserCancelled);
        let ja = Locale::Ja.messages().error(&CaptureError::UserCancelled);

        assert_eq!(en, "error: capture cancelled by user");
        assert!(ja.starts_with("エラー: "));
    }

    #[test]
    fn test_locale_from_config_string() {
        let locale: Locale = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(locale.messages().recording_complete, "録画完了");
        assert_eq!(Locale::default(), Locale::En);
    }
}
