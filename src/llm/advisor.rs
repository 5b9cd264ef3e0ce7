// 💡 Recommendation Advisor - product, card and grievance requests to the model
//
// Every structured request goes through `generate_json_response`, which keeps
// only the JSON object in the reply. A reply that still does not match the
// expected shape yields the empty result for that request.

use super::client::{CompletionBackend, CompletionRequest};
use super::prompts;
use crate::analysis::{AvailableProducts, KycProfile, SpendingSummary};
use crate::config::LlmSettings;
use crate::data::Record;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

// ============================================================================
// INPUT CONTEXT
// ============================================================================

/// Everything known about the customer when asking for recommendations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationContext {
    pub spending: SpendingSummary,
    pub kyc: Option<KycProfile>,
    pub interests: Vec<String>,
    pub products: AvailableProducts,
    /// Earlier recommendations, present when answering follow-up queries
    pub product_recommendations: Option<ProductRecommendations>,
    pub credit_cards: Option<CreditCardRecommendations>,
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSuggestion {
    pub card_name: String,
    pub reason: String,
    pub user_behavior_match: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanSuggestion {
    pub loan_type: String,
    pub reason: String,
    pub user_behavior_match: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherSuggestion {
    pub product_name: String,
    pub reason: String,
    pub user_behavior_match: String,
}

/// product_recommendations.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRecommendations {
    pub credit_card_recommendations: Vec<CardSuggestion>,
    pub loan_recommendations: Vec<LoanSuggestion>,
    pub other_recommendations: Vec<OtherSuggestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardRecommendation {
    pub card_name: String,
    pub reason: String,
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub annual_fee: String,
    #[serde(deserialize_with = "text_or_number")]
    pub credit_limit: String,
    #[serde(deserialize_with = "text_or_number")]
    pub interest_rate: String,
    pub user_behavior_match: String,
}

/// credit_card_recommendations.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCardRecommendations {
    pub recommendations: Vec<CreditCardRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentBreakdown {
    pub positive: String,
    pub negative: String,
    pub neutral: String,
}

/// grievance_analysis.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrievanceAnalysis {
    pub common_issues: Vec<String>,
    pub sentiment_analysis: SentimentBreakdown,
    pub recommendations: Vec<String>,
}

/// Models sometimes answer `"annual_fee": 95` instead of `"$95"`
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ============================================================================
// JSON EXTRACTION
// ============================================================================

/// Slice from the first `{` to the last `}` if it parses as JSON, otherwise
/// the trimmed reply unchanged
pub fn extract_json(reply: &str) -> String {
    let content = reply.trim();
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            let candidate = &content[start..=end];
            if serde_json::from_str::<Value>(candidate).is_ok() {
                return candidate.to_string();
            }
        }
    }
    content.to_string()
}

fn parse_or_default<T: DeserializeOwned + Default>(what: &str, content: &str) -> T {
    match serde_json::from_str::<T>(content) {
        Ok(parsed) => {
            info!("Generated {}", what);
            parsed
        }
        Err(e) => {
            error!("Error parsing {} response: {}", what, e);
            error!("Raw response: {}", content);
            T::default()
        }
    }
}

// ============================================================================
// ADVISOR
// ============================================================================

pub struct RecommendationAdvisor<B> {
    backend: B,
    settings: LlmSettings,
}

impl<B: CompletionBackend> RecommendationAdvisor<B> {
    pub fn new(backend: B, settings: &LlmSettings) -> Self {
        RecommendationAdvisor {
            backend,
            settings: settings.clone(),
        }
    }

    /// Ask for a JSON answer; returns the extracted JSON text
    pub fn generate_json_response(&self, prompt: &str) -> Result<String> {
        let full_prompt = format!("{}\n\n{}", prompts::JSON_SYSTEM_MESSAGE, prompt);
        let request = CompletionRequest::new(full_prompt, &self.settings.recommendation);
        let reply = self.backend.complete(&request)?;
        debug!(chars = reply.len(), "Received completion");
        Ok(extract_json(&reply))
    }

    pub fn product_recommendations(&self, ctx: &RecommendationContext) -> Result<ProductRecommendations> {
        info!("Generating product recommendations");
        let content = self.generate_json_response(&prompts::product_recommendations(ctx))?;
        Ok(parse_or_default("product recommendations", &content))
    }

    pub fn credit_card_recommendations(
        &self,
        ctx: &RecommendationContext,
    ) -> Result<CreditCardRecommendations> {
        info!("Generating credit card recommendations");
        let content = self.generate_json_response(&prompts::credit_card_recommendations(ctx))?;
        Ok(parse_or_default("credit card recommendations", &content))
    }

    pub fn analyze_grievances(&self, emails: &[Record]) -> Result<GrievanceAnalysis> {
        info!("Analyzing {} customer grievances", emails.len());
        let content = self.generate_json_response(&prompts::grievance_analysis(emails))?;
        Ok(parse_or_default("grievance analysis", &content))
    }

    /// Conversational answer to a customer question
    pub fn answer_query(&self, query: &str, ctx: &RecommendationContext) -> Result<String> {
        let preview: String = query.chars().take(100).collect();
        info!("Generating response for query: {}", preview);

        let request = CompletionRequest::new(
            prompts::customer_query(query, ctx),
            &self.settings.conversation,
        );
        let text = self.backend.complete(&request)?.trim().to_string();

        if text.starts_with('{') && text.ends_with('}') {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text) {
                if let Some(Value::String(response)) = obj.get("response") {
                    return Ok(response.clone());
                }
            }
        }
        Ok(text)
    }
}

// ============================================================================
// TESTS
// ============================================================================
