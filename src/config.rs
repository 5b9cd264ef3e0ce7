// ⚙️ Configuration - advisor.toml + CLI overrides
// Every section falls back to defaults, so an empty or missing file is valid.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "advisor.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathSettings,
    pub data_files: DataFiles,
    pub analysis: AnalysisSettings,
    pub llm: LlmSettings,
    pub voice: VoiceSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// An explicit path must exist. The default path is optional: when it is
    /// absent the built-in defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(AdvisorError::Config(format!(
                    "config file '{}' not found",
                    path.display()
                )));
            }
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            AdvisorError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.spending_clusters == 0 {
            return Err(AdvisorError::Config(
                "analysis.spending_clusters must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analysis.high_value_quantile) {
            return Err(AdvisorError::Config(
                "analysis.high_value_quantile must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Fixed input file names inside the data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFiles {
    pub transactions: String,
    pub credit_card_transactions: String,
    pub social_media: String,
    pub kyc: String,
    pub emails: String,
    pub receiver_categories: String,
    pub credit_cards: String,
    pub loans: String,
    pub credit_card_list: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        DataFiles {
            transactions: "Account_Statement.csv".to_string(),
            credit_card_transactions: "credit_card_transactions.csv".to_string(),
            social_media: "social_media_posts.csv".to_string(),
            kyc: "KYC_Details.csv".to_string(),
            emails: "emails_to_wells_fargo.csv".to_string(),
            receiver_categories: "Receiver_vs_Category.csv".to_string(),
            credit_cards: "Wells_Fargo_Credit_Card_Details.csv".to_string(),
            loans: "Wells_Fargo_Loan_Details.csv".to_string(),
            credit_card_list: "credit_card_list.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// k for the spending k-means
    pub spending_clusters: usize,

    /// Quantile above which a purchase counts as high-value
    pub high_value_quantile: f64,

    /// Categories (lowercase) treated as recurring subscriptions
    pub subscription_categories: Vec<String>,

    pub subscription_savings_rate: f64,
    pub impulse_savings_rate: f64,

    /// Category spend (USD) above which the category becomes an interest
    pub interest_spend_threshold: f64,

    pub kmeans_seed: u64,
    pub kmeans_restarts: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            spending_clusters: 3,
            high_value_quantile: 0.9,
            subscription_categories: vec![
                "streaming".to_string(),
                "subscription".to_string(),
                "membership".to_string(),
            ],
            subscription_savings_rate: 0.20,
            impulse_savings_rate: 0.15,
            interest_spend_threshold: 100.0,
            kmeans_seed: 42,
            kmeans_restarts: 10,
        }
    }
}

/// Sampling parameters sent with a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub repeat_penalty: Option<f32>,
    #[serde(default)]
    pub stop: Vec<String>,
}

impl SamplingParams {
    /// JSON recommendations: low temperature for consistent structure
    pub fn recommendation() -> Self {
        SamplingParams {
            max_tokens: 2048,
            temperature: 0.3,
            top_p: Some(0.9),
            top_k: None,
            repeat_penalty: Some(1.1),
            stop: vec!["</s>".to_string(), "Human:".to_string(), "Assistant:".to_string()],
        }
    }

    /// Free-text answers to customer queries
    pub fn conversation() -> Self {
        SamplingParams {
            max_tokens: 512,
            temperature: 0.7,
            top_p: Some(0.95),
            top_k: Some(40),
            repeat_penalty: Some(1.1),
            stop: Vec::new(),
        }
    }

    /// Insights and email drafts
    pub fn analysis() -> Self {
        SamplingParams {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: None,
            top_k: None,
            repeat_penalty: None,
            stop: vec!["###".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the llama.cpp server
    pub endpoint: String,

    /// Model file the server is expected to have loaded (informational)
    pub model: String,

    pub timeout_secs: u64,

    pub recommendation: SamplingParams,
    pub conversation: SamplingParams,
    pub analysis: SamplingParams,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            endpoint: "http://127.0.0.1:8080".to_string(),
            model: "mistral-7b-instruct-v0.2.Q4_K_M.gguf".to_string(),
            timeout_secs: 300,
            recommendation: SamplingParams::recommendation(),
            conversation: SamplingParams::conversation(),
            analysis: SamplingParams::analysis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Base URL of the whisper.cpp server
    pub whisper_endpoint: String,
    pub tts_endpoint: String,
    pub language: String,
    pub slow: bool,
    pub timeout_secs: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            whisper_endpoint: "http://127.0.0.1:8081".to_string(),
            tts_endpoint: "https://translate.google.com/translate_tts".to_string(),
            language: "en".to_string(),
            slow: false,
            timeout_secs: 120,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
