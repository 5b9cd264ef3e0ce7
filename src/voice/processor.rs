// 🗣️ Voice Processor - answers spoken or typed questions from saved results

use super::speech::SpeechSynthesizer;
use super::transcriber::Transcriber;
use crate::analysis::{KycProfile, SpendingSummary};
use crate::llm::{CompletionBackend, RecommendationAdvisor, RecommendationContext};
use crate::pipeline::output_files;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct VoiceProcessor<B, T, S> {
    output_dir: PathBuf,
    advisor: RecommendationAdvisor<B>,
    transcriber: T,
    speech: S,
}

impl<B: CompletionBackend> VoiceProcessor<B, (), ()> {
    /// Answers typed questions only; no audio clients are created
    pub fn text_only(output_dir: impl Into<PathBuf>, advisor: RecommendationAdvisor<B>) -> Self {
        VoiceProcessor::new(output_dir, advisor, (), ())
    }
}

impl<B: CompletionBackend, T, S> VoiceProcessor<B, T, S> {
    pub fn new(output_dir: impl Into<PathBuf>, advisor: RecommendationAdvisor<B>, transcriber: T, speech: S) -> Self {
        VoiceProcessor {
            output_dir: output_dir.into(),
            advisor,
            transcriber,
            speech,
        }
    }

    /// Read whatever earlier results exist in the output directory
    pub fn load_recommendation_data(&self) -> RecommendationContext {
        let spending: Option<SpendingSummary> = self.read_optional(output_files::SPENDING_ANALYSIS);
        let kyc: Option<KycProfile> = self.read_optional(output_files::KYC_DETAILS);

        RecommendationContext {
            spending: spending.unwrap_or_default(),
            kyc: kyc.and_then(KycProfile::into_non_empty),
            interests: self.read_optional(output_files::USER_INTERESTS).unwrap_or_default(),
            products: self.read_optional(output_files::AVAILABLE_PRODUCTS).unwrap_or_default(),
            product_recommendations: self.read_optional(output_files::PRODUCT_RECOMMENDATIONS),
            credit_cards: self.read_optional(output_files::CREDIT_CARD_RECOMMENDATIONS),
        }
    }

    fn read_optional<V: DeserializeOwned>(&self, file_name: &str) -> Option<V> {
        let path = self.output_dir.join(file_name);
        if !path.exists() {
            debug!("{} not found, skipping", path.display());
            return None;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Error loading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Answer a typed question
    pub fn process_query(&self, query: &str) -> crate::Result<String> {
        let context = self.load_recommendation_data();
        let response = self.advisor.answer_query(query, &context)?;
        if response.is_empty() {
            warn!("Model returned an empty answer");
        }
        Ok(response)
    }

    pub fn response_audio_path(&self, audio_file: &Path) -> PathBuf {
        let stem = audio_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "query".to_string());
        self.output_dir.join("audio").join(format!("response_{}.mp3", stem))
    }
}

impl<B, T, S> VoiceProcessor<B, T, S>
where
    B: CompletionBackend,
    T: Transcriber,
    S: SpeechSynthesizer,
{
    /// Transcribe, answer, and speak the answer to `audio/response_<stem>.mp3`.
    ///
    /// Returns `None` when the recording has no recognizable speech.
    pub fn process_audio_file(&self, audio_file: &Path) -> crate::Result<Option<String>> {
        info!("Starting processing of audio file: {}", audio_file.display());

        let query = match self.transcriber.transcribe(audio_file)? {
            Some(text) => text,
            None => return Ok(None),
        };
        println!("🎙️  Transcribed: {}", query);

        let response = self.process_query(&query)?;
        if response.is_empty() {
            return Ok(Some(response));
        }

        let output = self.response_audio_path(audio_file);
        self.speech.synthesize(&response, &output)?;
        println!("✓ Response saved as audio: {}", output.display());

        Ok(Some(response))
    }
}
