// Personalized Banking Advisor - Core Library
// Exposes all modules for use in the CLI and tests

pub mod analysis;  // Profile extraction, clustering, savings analysis
pub mod config;
pub mod data;      // CSV tables and typed transactions
pub mod error;
pub mod llm;       // Model server client and prompt-driven services
pub mod logging;
pub mod pipeline;  // Run modes and output files
pub mod voice;     // Transcription, speech synthesis, query answering

// Re-export commonly used types
pub use analysis::{
    AvailableProducts, CreditProfile, DataExtractor, FinancialAnalyzer, FinancialReport,
    InterestProfile, KycProfile, SpendingSummary,
};
pub use config::{AppConfig, LlmSettings, SamplingParams, VoiceSettings};
pub use data::{FinancialData, FinancialDataLoader, Table, Transaction, TransactionSource};
pub use error::{AdvisorError, Result};
pub use llm::{
    CompletionBackend, CompletionRequest, CreditCardRecommendations, FinancialAnalyst,
    FinancialInsights, GrievanceAnalysis, LlamaServerBackend, ProductRecommendations,
    RecommendationAdvisor, RecommendationContext,
};
pub use pipeline::{output_files, save_json, Pipeline, Recommendations};
pub use voice::{GoogleTts, SpeechSynthesizer, Transcriber, VoiceProcessor, WhisperServerTranscriber};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
