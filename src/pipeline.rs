// 🏦 Pipeline - load, extract, analyze, recommend, write results
//
// Each run mode reads the data directory and writes fixed-name files to the
// output directory. The model backend is passed in so tests can script it.

use crate::analysis::{
    extractor::social_interests, AvailableProducts, DataExtractor, FinancialAnalyzer, KycProfile,
    SpendingSummary,
};
use crate::config::AppConfig;
use crate::data::FinancialDataLoader;
use crate::llm::{
    CompletionBackend, CreditCardRecommendations, FinancialAnalyst, FinancialInsights,
    GrievanceAnalysis, ProductRecommendations, RecommendationAdvisor, RecommendationContext,
};
use crate::voice::{SpeechSynthesizer, Transcriber, VoiceProcessor};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Names of the files written to the output directory
pub mod output_files {
    pub const SPENDING_ANALYSIS: &str = "spending_analysis.json";
    pub const KYC_DETAILS: &str = "kyc_details.json";
    pub const USER_INTERESTS: &str = "user_interests.json";
    pub const INTEREST_PROFILE: &str = "interest_profile.json";
    pub const AVAILABLE_PRODUCTS: &str = "available_products.json";
    pub const CREDIT_PROFILE: &str = "credit_profile.json";
    pub const FINANCIAL_ANALYSIS: &str = "financial_analysis.json";
    pub const PRODUCT_RECOMMENDATIONS: &str = "product_recommendations.json";
    pub const CREDIT_CARD_RECOMMENDATIONS: &str = "credit_card_recommendations.json";
    pub const GRIEVANCE_ANALYSIS: &str = "grievance_analysis.json";
    pub const INSIGHTS: &str = "insights.txt";
    pub const EMAIL_DRAFT: &str = "email_draft.txt";
}

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

// ============================================================================
// FILE HELPERS
// ============================================================================

/// Write `value` as 2-space indented JSON to `output_dir/name`
pub fn save_json<T: Serialize + ?Sized>(output_dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = output_dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Saved {}", name);
    Ok(path)
}

fn save_text(output_dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = output_dir.join(name);
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Saved {}", name);
    Ok(path)
}

/// Read a file written by an earlier run; a missing file is an error
pub fn load_json<T: DeserializeOwned>(output_dir: &Path, name: &str) -> Result<T> {
    let path = output_dir.join(name);
    let content = fs::read_to_string(&path).with_context(|| {
        format!("Failed to read {} (run the full pipeline first)", path.display())
    })?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub products: ProductRecommendations,
    pub credit_cards: CreditCardRecommendations,
}

impl Recommendations {
    pub fn print(&self) {
        println!("\n{}", DIVIDER);
        println!("💳 Credit Card Recommendations");
        println!("{}", DIVIDER);
        if self.credit_cards.recommendations.is_empty() {
            println!("  (none)");
        }
        for (i, card) in self.credit_cards.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, card.card_name);
            if !card.reason.is_empty() {
                println!("     Why: {}", card.reason);
            }
            if !card.benefits.is_empty() {
                println!("     Benefits: {}", card.benefits.join("; "));
            }
            if !card.annual_fee.is_empty() {
                println!("     Annual fee: {}", card.annual_fee);
            }
        }

        println!("\n🏦 Loan Recommendations");
        if self.products.loan_recommendations.is_empty() {
            println!("  (none)");
        }
        for loan in &self.products.loan_recommendations {
            println!("  • {} - {}", loan.loan_type, loan.reason);
        }

        println!("\n✨ Other Products");
        if self.products.other_recommendations.is_empty() {
            println!("  (none)");
        }
        for other in &self.products.other_recommendations {
            println!("  • {} - {}", other.product_name, other.reason);
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<'a> {
    config: &'a AppConfig,
    as_of: NaiveDate,
}

impl<'a> Pipeline<'a> {
    /// `as_of` decides which month counts as the current one
    pub fn new(config: &'a AppConfig, as_of: NaiveDate) -> Self {
        Pipeline { config, as_of }
    }

    fn output_dir(&self) -> &Path {
        &self.config.paths.output_dir
    }

    fn loader(&self) -> FinancialDataLoader {
        FinancialDataLoader::new(&self.config.paths.data_dir, self.config.data_files.clone())
    }

    /// Load everything, extract the profile, analyze, and ask for recommendations
    pub fn run_full_pipeline<B: CompletionBackend>(&self, backend: &B) -> Result<Recommendations> {
        println!("🏦 Personalized Banking Advisor");
        println!("{}", DIVIDER);
        let out = self.output_dir();

        println!("\n📂 Loading data...");
        let data = self.loader().load_all();

        println!("\n🔎 Extracting customer profile...");
        let extractor = DataExtractor::new(&data, &self.config.analysis);
        let spending = extractor.spending_summary(self.as_of);
        let kyc = extractor.kyc_details();
        let interests = extractor.user_interests();
        let products = extractor.available_products();

        save_json(out, output_files::SPENDING_ANALYSIS, &spending)?;
        save_kyc(out, kyc.as_ref())?;
        save_json(out, output_files::USER_INTERESTS, &interests)?;
        save_json(out, output_files::INTEREST_PROFILE, &extractor.interest_profile(self.as_of))?;
        save_json(out, output_files::AVAILABLE_PRODUCTS, &products)?;
        save_json(out, output_files::CREDIT_PROFILE, &extractor.credit_profile())?;

        println!("\n📊 Analyzing spending...");
        let report = FinancialAnalyzer::new(&data, &self.config.analysis).report();
        save_json(out, output_files::FINANCIAL_ANALYSIS, &report)?;

        println!("\n🤖 Generating recommendations...");
        let context = RecommendationContext {
            spending,
            kyc,
            interests,
            products,
            ..Default::default()
        };
        let recommendations = self.recommend(backend, &context)?;

        recommendations.print();
        println!("\n✅ Pipeline complete. Results in {}", out.display());
        Ok(recommendations)
    }

    /// Refresh interests from new social posts and regenerate recommendations
    pub fn update_recommendations<B: CompletionBackend>(
        &self,
        backend: &B,
        posts_file: &Path,
    ) -> Result<Recommendations> {
        println!("🔄 Updating recommendations from {}", posts_file.display());
        println!("{}", DIVIDER);
        let out = self.output_dir();

        let spending: SpendingSummary = load_json(out, output_files::SPENDING_ANALYSIS)?;
        let kyc_value: Value = load_json(out, output_files::KYC_DETAILS)?;
        let old_interests: Vec<String> = load_json(out, output_files::USER_INTERESTS)?;
        let products: AvailableProducts = load_json(out, output_files::AVAILABLE_PRODUCTS)?;

        let posts = self.loader().load_social_media(Some(posts_file));
        let new_interests = social_interests(&posts);
        info!(new = new_interests.len(), previous = old_interests.len(), "Merging interests");

        let interests: Vec<String> = old_interests
            .into_iter()
            .chain(new_interests)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        println!("✓ Interests: {}", interests.join(", "));

        let mut kyc: Option<KycProfile> = serde_json::from_value::<KycProfile>(kyc_value)
            .context("Invalid KYC details")?
            .into_non_empty();
        match kyc.as_mut() {
            Some(profile) => {
                let joined = Value::from(interests.join(", "));
                profile.set("Interests", joined.clone());
                profile.set("Hobbies", joined);
            }
            None => warn!("No KYC details saved; interests are not recorded on the profile"),
        }

        println!("\n🤖 Regenerating recommendations...");
        let context = RecommendationContext {
            spending,
            kyc,
            interests,
            products,
            ..Default::default()
        };
        let recommendations = self.recommend(backend, &context)?;

        save_json(out, output_files::USER_INTERESTS, &context.interests)?;
        save_kyc(out, context.kyc.as_ref())?;

        recommendations.print();
        Ok(recommendations)
    }

    fn recommend<B: CompletionBackend>(
        &self,
        backend: &B,
        context: &RecommendationContext,
    ) -> Result<Recommendations> {
        let advisor = RecommendationAdvisor::new(backend, &self.config.llm);
        let out = self.output_dir();

        let products = advisor
            .product_recommendations(context)
            .context("Product recommendation request failed")?;
        let credit_cards = advisor
            .credit_card_recommendations(context)
            .context("Credit card recommendation request failed")?;

        // Nothing is written until both requests succeed
        save_json(out, output_files::PRODUCT_RECOMMENDATIONS, &products)?;
        save_json(out, output_files::CREDIT_CARD_RECOMMENDATIONS, &credit_cards)?;

        Ok(Recommendations {
            products,
            credit_cards,
        })
    }

    /// Summarize customer complaints from the email table
    pub fn run_grievance_analysis<B: CompletionBackend>(&self, backend: &B) -> Result<GrievanceAnalysis> {
        println!("📧 Analyzing customer grievances");
        println!("{}", DIVIDER);

        let emails = self.loader().load_emails();
        if emails.is_empty() {
            warn!("No customer emails found");
        }

        let advisor = RecommendationAdvisor::new(backend, &self.config.llm);
        let analysis = advisor
            .analyze_grievances(&emails.records())
            .context("Grievance analysis request failed")?;
        save_json(self.output_dir(), output_files::GRIEVANCE_ANALYSIS, &analysis)?;

        println!("\n🔍 Common issues:");
        for issue in &analysis.common_issues {
            println!("  • {}", issue);
        }
        Ok(analysis)
    }

    /// Narrative insights and a customer email from the spending analysis
    pub fn run_insights<B: CompletionBackend>(&self, backend: &B) -> Result<(FinancialInsights, String)> {
        println!("💡 Generating financial insights");
        println!("{}", DIVIDER);

        let data = self.loader().load_all();
        let report = FinancialAnalyzer::new(&data, &self.config.analysis).report();

        let analyst = FinancialAnalyst::new(backend, &self.config.llm);
        let insights = analyst
            .financial_insights(&report)
            .context("Insights request failed")?;
        save_text(self.output_dir(), output_files::INSIGHTS, &insights.to_text())?;

        let email = analyst.email_draft(&insights).context("Email draft request failed")?;
        save_text(self.output_dir(), output_files::EMAIL_DRAFT, &email)?;

        Ok((insights, email))
    }

    /// Typed-question front end over the results of earlier runs
    pub fn query_processor<B: CompletionBackend>(&self, backend: B) -> VoiceProcessor<B, (), ()> {
        let advisor = RecommendationAdvisor::new(backend, &self.config.llm);
        VoiceProcessor::text_only(self.output_dir(), advisor)
    }

    /// Voice/query front end over the results of earlier runs
    pub fn voice_processor<B, T, S>(
        &self,
        backend: B,
        transcriber: T,
        speech: S,
    ) -> VoiceProcessor<B, T, S>
    where
        B: CompletionBackend,
        T: Transcriber,
        S: SpeechSynthesizer,
    {
        let advisor = RecommendationAdvisor::new(backend, &self.config.llm);
        VoiceProcessor::new(self.output_dir(), advisor, transcriber, speech)
    }
}

/// A missing profile is written as `{}`
fn save_kyc(output_dir: &Path, kyc: Option<&KycProfile>) -> Result<PathBuf> {
    match kyc {
        Some(profile) => save_json(output_dir, output_files::KYC_DETAILS, profile),
        None => save_json(output_dir, output_files::KYC_DETAILS, &serde_json::json!({})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_json_is_indented() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_json(dir.path(), "x.json", &serde_json::json!({"a": [1]})).unwrap();
        let written = fs::read_to_string(path).unwrap();
        assert_eq!(written, "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn test_save_creates_nested_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        save_text(&nested, "note.txt", "hi").unwrap();
        assert_eq!(fs::read_to_string(nested.join("note.txt")).unwrap(), "hi");
    }

    #[test]
    fn test_load_json_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Vec<String>> = load_json(dir.path(), output_files::USER_INTERESTS);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("run the full pipeline first"));
    }

    #[test]
    fn test_missing_kyc_saved_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        save_kyc(dir.path(), None).unwrap();
        let written = fs::read_to_string(dir.path().join(output_files::KYC_DETAILS)).unwrap();
        assert_eq!(written, "{}");
    }
}
