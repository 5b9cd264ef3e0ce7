// End-to-end runs against CSV fixtures in a temp directory, with a scripted
// model backend standing in for the llama.cpp server.

use banking_advisor::config::DataFiles;
use banking_advisor::{
    output_files, AdvisorError, AppConfig, CompletionBackend, CompletionRequest, Pipeline, SpeechSynthesizer,
    Transcriber,
};
use chrono::NaiveDate;
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// FIXTURES
// ============================================================================

fn write_fixtures(data_dir: &Path) {
    let files = DataFiles::default();
    let write = |name: &str, content: &str| fs::write(data_dir.join(name), content).unwrap();

    write(
        &files.transactions,
        "Date,Receiver,Amount (USD),Transaction Type\n\
         2024-02-03,Whole Foods,180.00,Debit\n\
         2024-02-10,Acme Payroll,5200.00,Credit\n\
         2024-02-14,Le Bistro Restaurant,95.00,Debit\n\
         2024-03-02,Whole Foods,160.00,Debit\n\
         2024-03-05,Netflix,15.99,Debit\n\
         2024-03-09,Delta Airline,420.00,Debit\n\
         2024-03-10,Acme Payroll,5200.00,Credit\n",
    );
    write(
        &files.credit_card_transactions,
        "Date,Merchant,Amount ($),Category,Card ID,Transaction Type\n\
         2024-02-12,Amazon,220.00,Shopping,C1,Purchase\n\
         2024-03-03,Starbucks,12.50,Dining,C1,Purchase\n\
         2024-03-15,Amazon,40.00,Shopping,C1,Refund\n",
    );
    write(
        &files.receiver_categories,
        "Receiver,Category\n\
         Whole Foods,Grocery\n\
         Le Bistro Restaurant,Dining\n\
         Netflix,Subscription\n\
         Delta Airline,Transport\n\
         Acme Payroll,Income\n",
    );
    write(
        &files.kyc,
        "Name,Age,Employment Status,Annual Income (USD),Credit Score,City,State\n\
         Jordan Lee,29,Employed,\"85,000\",742,San Francisco,CA\n",
    );
    write(
        &files.social_media,
        "Date,Post Content\n\
         2024-03-01,Booked a vacation to Lisbon!\n\
         2024-03-08,Trying a new restaurant downtown\n",
    );
    write(
        &files.credit_cards,
        "Card Name,Annual Fee (USD),Interest Rate (%),Rewards\n\
         Active Cash,0,20.24,2% cash back\n\
         Autograph,0,20.24,3x points on dining and travel\n",
    );
    write(
        &files.loans,
        "Loan Type,Interest Rate (%),Loan Amount (USD),Monthly EMI (USD)\n\
         Personal Loan,7.99,\"20,000\",405\n",
    );
    write(
        &files.credit_card_list,
        "Card ID,Credit Limit (USD),Current Balance (USD)\nC1,10000,2500\n",
    );
    write(
        &files.emails,
        "From,Subject,Body\n\
         jordan@example.com,Late fee,I was charged a late fee even though I paid on time.\n",
    );
}

struct Workspace {
    _dir: TempDir,
    config: AppConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_fixtures(&data_dir);

        let mut config = AppConfig::default();
        config.paths.data_dir = data_dir;
        config.paths.output_dir = dir.path().join("output");
        Workspace { _dir: dir, config }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.config, NaiveDate::from_ymd_opt(2024, 3, 20).unwrap())
    }

    fn output(&self, name: &str) -> PathBuf {
        self.config.paths.output_dir.join(name)
    }

    fn read_json(&self, name: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(self.output(name)).unwrap()).unwrap()
    }
}

/// Answers by recognizing which prompt template it was sent
#[derive(Default)]
struct ScriptedModel {
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts
            .borrow()
            .iter()
            .filter(|p| p.contains(needle))
            .cloned()
            .collect()
    }
}

impl CompletionBackend for ScriptedModel {
    fn complete(&self, request: &CompletionRequest) -> banking_advisor::Result<String> {
        let prompt = request.prompt.clone();
        self.prompts.borrow_mut().push(prompt.clone());

        let reply = if prompt.contains("recommend appropriate Wells Fargo financial products") {
            r#"Here you go:
{"credit_card_recommendations": [{"card_name": "Autograph", "reason": "Travel and dining", "user_behavior_match": "Flights and restaurants"}],
 "loan_recommendations": [{"loan_type": "Personal Loan", "reason": "Low rate", "user_behavior_match": "Stable income"}],
 "other_recommendations": []}"#
        } else if prompt.contains("recommend appropriate Wells Fargo credit cards") {
            r#"{"recommendations": [{"card_name": "Autograph", "reason": "3x on travel", "benefits": ["3x points"], "annual_fee": 0, "credit_limit": "$10,000", "interest_rate": "20.24%", "user_behavior_match": "Frequent flyer"}]}"#
        } else if prompt.contains("customer grievances") {
            r#"{"common_issues": ["Late fees"], "sentiment_analysis": {"positive": "", "negative": "Frustrated", "neutral": ""}, "recommendations": ["Review fee policy"]}"#
        } else if prompt.contains("persuasive tone") {
            r#"{"response": "The Autograph card rewards your travel."}"#
        } else if prompt.contains("provide personalized insights") {
            "1. Key insights\nTravel leads.\n2. Recommendations\nUse Autograph.\n3. Action items\nSet a budget.\n4. Risk factors\nHigh utilization."
        } else if prompt.contains("draft a personalized email") {
            "Dear Jordan,\nHere is your summary.\nBest regards"
        } else {
            "unexpected prompt"
        };
        Ok(reply.to_string())
    }
}

/// Fails every request whose prompt contains `needle`, otherwise answers like
/// `ScriptedModel`
struct FailingModel {
    needle: &'static str,
    inner: ScriptedModel,
}

impl FailingModel {
    fn on(needle: &'static str) -> Self {
        FailingModel {
            needle,
            inner: ScriptedModel::default(),
        }
    }
}

impl CompletionBackend for FailingModel {
    fn complete(&self, request: &CompletionRequest) -> banking_advisor::Result<String> {
        if request.prompt.contains(self.needle) {
            return Err(AdvisorError::Llm {
                message: "server returned 503 Service Unavailable".to_string(),
            });
        }
        self.inner.complete(request)
    }
}

// ============================================================================
// FULL PIPELINE
// ============================================================================

#[test]
fn full_pipeline_writes_every_output() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();

    let recs = ws.pipeline().run_full_pipeline(&model).unwrap();

    for name in [
        output_files::SPENDING_ANALYSIS,
        output_files::KYC_DETAILS,
        output_files::USER_INTERESTS,
        output_files::INTEREST_PROFILE,
        output_files::AVAILABLE_PRODUCTS,
        output_files::CREDIT_PROFILE,
        output_files::FINANCIAL_ANALYSIS,
        output_files::PRODUCT_RECOMMENDATIONS,
        output_files::CREDIT_CARD_RECOMMENDATIONS,
    ] {
        assert!(ws.output(name).exists(), "missing {}", name);
    }

    assert_eq!(recs.credit_cards.recommendations[0].card_name, "Autograph");
    assert_eq!(recs.credit_cards.recommendations[0].annual_fee, "0");
    assert_eq!(recs.products.loan_recommendations[0].loan_type, "Personal Loan");
}

#[test]
fn spending_analysis_uses_resolved_signs() {
    let ws = Workspace::new();
    ws.pipeline().run_full_pipeline(&ScriptedModel::default()).unwrap();

    let spending = ws.read_json(output_files::SPENDING_ANALYSIS);
    // Bank debits 870.99, card charges 232.50; payroll and the refund are inflows
    assert_eq!(spending["bank_spend"], 870.99);
    assert_eq!(spending["credit_card_spend"], 232.5);
    assert_eq!(spending["total_spend"], 1103.49);
    assert_eq!(spending["max_spending_category"], "Transport");
    assert_eq!(spending["monthly_spending"]["2024-02"], 495.0);
    assert_eq!(spending["current_month_spending"], 608.49);
    assert_eq!(spending["top_merchants"][0]["merchant"], "Delta Airline");
}

#[test]
fn kyc_and_interests_are_derived() {
    let ws = Workspace::new();
    ws.pipeline().run_full_pipeline(&ScriptedModel::default()).unwrap();

    let kyc = ws.read_json(output_files::KYC_DETAILS);
    assert_eq!(kyc["Name"], "Jordan Lee");
    assert_eq!(kyc["age_group"], "early_career");
    assert_eq!(kyc["location_insights"]["cost_of_living"], "high");

    let interests: Vec<String> = serde_json::from_value(ws.read_json(output_files::USER_INTERESTS)).unwrap();
    // dining (107.50), grocery, shopping and transport pass the spend threshold
    assert_eq!(
        interests,
        vec!["dining", "food", "grocery", "shopping", "transport", "travel"]
    );

    let credit = ws.read_json(output_files::CREDIT_PROFILE);
    assert_eq!(credit["utilization_rate"], 25.0);
}

#[test]
fn recommendation_prompts_carry_the_profile() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();
    ws.pipeline().run_full_pipeline(&model).unwrap();

    let prompts = model.prompts_containing("recommend appropriate Wells Fargo credit cards");
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("- Income: $85,000.00"));
    assert!(prompt.contains("- Location: San Francisco, CA"));
    assert!(prompt.contains("Your highest spending category is Transport"));
    assert!(prompt.contains("\"Card Name\": \"Autograph\""));
}

// ============================================================================
// UPDATE MODE
// ============================================================================

#[test]
fn update_social_merges_interests() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();
    ws.pipeline().run_full_pipeline(&model).unwrap();

    let posts = ws.config.paths.data_dir.join("new_posts.csv");
    fs::write(&posts, "Post Content\nFinally joined a gym and started a workout plan\n").unwrap();

    ws.pipeline().update_recommendations(&model, &posts).unwrap();

    let interests: Vec<String> = serde_json::from_value(ws.read_json(output_files::USER_INTERESTS)).unwrap();
    assert_eq!(
        interests,
        vec!["dining", "fitness", "food", "grocery", "shopping", "transport", "travel"]
    );

    let kyc = ws.read_json(output_files::KYC_DETAILS);
    assert_eq!(
        kyc["Interests"],
        "dining, fitness, food, grocery, shopping, transport, travel"
    );
    assert_eq!(kyc["Hobbies"], kyc["Interests"]);
    assert_eq!(kyc["Name"], "Jordan Lee");

    let last_card_prompt = model
        .prompts_containing("recommend appropriate Wells Fargo credit cards")
        .pop()
        .unwrap();
    assert!(last_card_prompt.contains("fitness, food"));
}

#[test]
fn update_without_previous_run_fails() {
    let ws = Workspace::new();
    let posts = ws.config.paths.data_dir.join("social_media_posts.csv");

    let err = ws
        .pipeline()
        .update_recommendations(&ScriptedModel::default(), &posts)
        .unwrap_err();
    assert!(format!("{:#}", err).contains(output_files::SPENDING_ANALYSIS));
}

#[test]
fn model_failure_writes_no_recommendations() {
    let ws = Workspace::new();
    let model = FailingModel::on("recommend appropriate Wells Fargo credit cards");

    let err = ws.pipeline().run_full_pipeline(&model).unwrap_err();

    assert!(format!("{:#}", err).contains("503"));
    assert!(ws.output(output_files::SPENDING_ANALYSIS).exists());
    assert!(!ws.output(output_files::PRODUCT_RECOMMENDATIONS).exists());
    assert!(!ws.output(output_files::CREDIT_CARD_RECOMMENDATIONS).exists());
}

#[test]
fn failed_update_keeps_previous_recommendations() {
    let ws = Workspace::new();
    ws.pipeline().run_full_pipeline(&ScriptedModel::default()).unwrap();
    let before = ws.read_json(output_files::PRODUCT_RECOMMENDATIONS);

    let posts = ws.config.paths.data_dir.join("new_posts.csv");
    fs::write(&posts, "Post Content\nNew gym membership\n").unwrap();
    let model = FailingModel::on("recommend appropriate Wells Fargo");

    assert!(ws.pipeline().update_recommendations(&model, &posts).is_err());
    assert_eq!(ws.read_json(output_files::PRODUCT_RECOMMENDATIONS), before);
    let interests = ws.read_json(output_files::USER_INTERESTS);
    assert!(!interests.as_array().unwrap().contains(&Value::from("fitness")));
}

// ============================================================================
// OTHER MODES
// ============================================================================

#[test]
fn grievance_analysis_is_saved() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();

    let analysis = ws.pipeline().run_grievance_analysis(&model).unwrap();

    assert_eq!(analysis.common_issues, vec!["Late fees"]);
    assert!(ws.output(output_files::GRIEVANCE_ANALYSIS).exists());
    assert!(model.prompts_containing("I was charged a late fee").len() == 1);
}

#[test]
fn insights_are_split_and_emailed() {
    let ws = Workspace::new();
    let (insights, email) = ws.pipeline().run_insights(&ScriptedModel::default()).unwrap();

    assert_eq!(insights.key_insights, "1. Key insights\nTravel leads.");
    assert_eq!(insights.risk_factors, "4. Risk factors\nHigh utilization.");
    assert!(email.starts_with("Dear Jordan"));

    let text = fs::read_to_string(ws.output(output_files::INSIGHTS)).unwrap();
    assert!(text.contains("ACTION ITEMS\n3. Action items\nSet a budget."));
    assert!(ws.output(output_files::EMAIL_DRAFT).exists());
}

struct HeardQuestion;

impl Transcriber for HeardQuestion {
    fn transcribe(&self, _audio_file: &Path) -> banking_advisor::Result<Option<String>> {
        Ok(Some("Which card is best for my trips?".to_string()))
    }
}

struct FileSpeech;

impl SpeechSynthesizer for FileSpeech {
    fn synthesize(&self, text: &str, output_file: &Path) -> banking_advisor::Result<PathBuf> {
        fs::create_dir_all(output_file.parent().unwrap())?;
        fs::write(output_file, text.as_bytes())?;
        Ok(output_file.to_path_buf())
    }
}

#[test]
fn voice_query_uses_saved_results() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();
    ws.pipeline().run_full_pipeline(&model).unwrap();

    let pipeline = ws.pipeline();
    let voice = pipeline.voice_processor(&model, HeardQuestion, FileSpeech);
    let answer = voice.process_audio_file(Path::new("trip_question.wav")).unwrap();

    assert_eq!(answer.as_deref(), Some("The Autograph card rewards your travel."));
    let spoken = ws.output("audio").join("response_trip_question.mp3");
    assert_eq!(fs::read_to_string(spoken).unwrap(), "The Autograph card rewards your travel.");

    let query_prompt = model.prompts_containing("persuasive tone").pop().unwrap();
    assert!(query_prompt.contains("Query: Which card is best for my trips?"));
    assert!(query_prompt.contains("\"card_name\": \"Autograph\""));
    assert!(query_prompt.contains("- Credit Score: 742"));
    assert!(query_prompt.contains("Other Recommended Products: Personal Loan"));
}

#[test]
fn typed_query_needs_no_audio_clients() {
    let ws = Workspace::new();
    let model = ScriptedModel::default();
    ws.pipeline().run_full_pipeline(&model).unwrap();

    let answer = ws
        .pipeline()
        .query_processor(&model)
        .process_query("Which card is best for my trips?")
        .unwrap();

    assert_eq!(answer, "The Autograph card rewards your travel.");
    assert!(!ws.output("audio").exists());
}
