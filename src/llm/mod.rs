// LLM layer: completion backends, prompt templates and the two model-facing services

pub mod advisor;
pub mod analyst;
pub mod client;
pub mod prompts;

pub use advisor::{
    CreditCardRecommendations, GrievanceAnalysis, ProductRecommendations, RecommendationAdvisor,
    RecommendationContext,
};
pub use analyst::{FinancialAnalyst, FinancialInsights};
pub use client::{CompletionBackend, CompletionRequest, LlamaServerBackend};
