// 🎙️ Audio transcription through a whisper.cpp server

use crate::config::VoiceSettings;
use crate::error::{AdvisorError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Speech-to-text; `Ok(None)` means the audio held no recognizable speech
pub trait Transcriber {
    fn transcribe(&self, audio_file: &Path) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct InferenceReply {
    #[serde(default)]
    text: String,
}

pub struct WhisperServerTranscriber {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl WhisperServerTranscriber {
    pub fn new(settings: &VoiceSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(WhisperServerTranscriber {
            http,
            endpoint: settings.whisper_endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl Transcriber for WhisperServerTranscriber {
    fn transcribe(&self, audio_file: &Path) -> Result<Option<String>> {
        info!("Starting transcription of audio file: {}", audio_file.display());

        let form = reqwest::blocking::multipart::Form::new()
            .text("response_format", "json")
            .file("file", audio_file)?;

        let resp = self
            .http
            .post(format!("{}/inference", self.endpoint))
            .multipart(form)
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(AdvisorError::Transcription(format!("server returned {}: {}", status, body)));
        }

        let reply: InferenceReply = resp.json()?;
        let text = clean_transcript(&reply.text);
        match &text {
            Some(t) => debug!(chars = t.len(), "Transcription completed"),
            None => warn!("No speech detected in {}", audio_file.display()),
        }
        Ok(text)
    }
}

/// Trimmed transcript, or `None` when nothing but whitespace came back
pub fn clean_transcript(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_transcript() {
        assert_eq!(clean_transcript("  What card should I get?\n"), Some("What card should I get?".to_string()));
        assert_eq!(clean_transcript(" \n "), None);
    }

    #[test]
    fn test_missing_audio_file_is_error() {
        let transcriber = WhisperServerTranscriber::new(&VoiceSettings::default()).unwrap();
        let result = transcriber.transcribe(Path::new("/definitely/not/here.wav"));
        assert!(matches!(result, Err(AdvisorError::Io(_))));
    }
}
