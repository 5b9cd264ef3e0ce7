// 📝 Prompt templates for the recommendation and analysis requests

use super::advisor::{CreditCardRecommendation, RecommendationContext};
use super::analyst::FinancialInsights;
use crate::analysis::{FinancialReport, KycProfile, SpendingSummary};
use crate::data::Record;
use serde::Serialize;
use serde_json::{Map, Value};

pub const JSON_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant that provides recommendations in JSON format. Always respond with valid JSON.";

const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// FORMATTING HELPERS
// ============================================================================

/// Dollar amount with thousands separators: `$85,000.00`
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

fn pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn kyc_text(kyc: Option<&KycProfile>, key: &str, missing: &str) -> String {
    kyc.and_then(|k| k.get_str(key))
        .unwrap_or_else(|| missing.to_string())
}

fn kyc_income(kyc: Option<&KycProfile>) -> f64 {
    kyc.and_then(|k| k.get_f64("Annual Income (USD)")).unwrap_or(0.0)
}

fn user_profile_section(kyc: Option<&KycProfile>) -> String {
    format!(
        "User Profile:\n\
         - Age: {}\n\
         - Income: {}\n\
         - Employment: {}\n\
         - Credit Score: {}\n\
         - Location: {}, {}",
        kyc_text(kyc, "Age", NOT_AVAILABLE),
        format_usd(kyc_income(kyc)),
        kyc_text(kyc, "Employment Status", NOT_AVAILABLE),
        kyc_text(kyc, "Credit Score", NOT_AVAILABLE),
        kyc_text(kyc, "City", NOT_AVAILABLE),
        kyc_text(kyc, "State", NOT_AVAILABLE),
    )
}

fn spending_section(spending: &SpendingSummary) -> String {
    let categories: Vec<String> = spending
        .top_categories(usize::MAX)
        .into_iter()
        .map(|(c, _)| c)
        .collect();
    let merchants: Vec<&str> = spending.top_merchants.iter().map(|m| m.merchant.as_str()).collect();

    format!(
        "Spending Patterns:\n\
         - Total Spending: {}\n\
         - Top Categories: {}\n\
         - Top Merchants: {}",
        format_usd(spending.total_spend),
        categories.join(", "),
        merchants.join(", "),
    )
}

/// Plain-language observations about the customer's spending
pub fn behavior_insights(spending: &SpendingSummary) -> Vec<String> {
    let mut insights = Vec::new();
    if !spending.spending_by_category.is_empty() {
        insights.push(format!(
            "Your highest spending category is {}",
            spending.max_spending_category
        ));
        insights.push(format!(
            "Your average transaction amount is ${:.2}",
            spending.avg_transaction_amount
        ));
    }
    if !spending.monthly_spending.is_empty() {
        insights.push(format!(
            "Your average monthly spending is ${:.2}",
            spending.average_monthly_spend()
        ));
    }
    insights
}

fn customer_sections(ctx: &RecommendationContext) -> String {
    format!(
        "{}\n\n{}\n\nUser Behavior Insights:\n{}\n\nUser Interests:\n{}",
        user_profile_section(ctx.kyc.as_ref()),
        spending_section(&ctx.spending),
        behavior_insights(&ctx.spending).join("\n"),
        ctx.interests.join(", "),
    )
}

// ============================================================================
// RECOMMENDATION PROMPTS
// ============================================================================

pub fn product_recommendations(ctx: &RecommendationContext) -> String {
    format!(
        r#"Based on the following user data, recommend appropriate Wells Fargo financial products:

{customer}

Available Wells Fargo Products:
Credit Cards:
{cards}

Loans:
{loans}

Please provide recommendations in the following JSON format:
{{
    "credit_card_recommendations": [
        {{
            "card_name": "string",
            "reason": "string",
            "user_behavior_match": "string"
        }}
    ],
    "loan_recommendations": [
        {{
            "loan_type": "string",
            "reason": "string",
            "user_behavior_match": "string"
        }}
    ],
    "other_recommendations": [
        {{
            "product_name": "string",
            "reason": "string",
            "user_behavior_match": "string"
        }}
    ]
}}

Important:
1. Only recommend Wells Fargo products from the available_products list
2. Include specific user behavior analysis in the reason and user_behavior_match fields
3. Focus on how the product's benefits align with the user's spending patterns and interests"#,
        customer = customer_sections(ctx),
        cards = pretty_json(&ctx.products.credit_cards),
        loans = pretty_json(&ctx.products.loans),
    )
}

pub fn credit_card_recommendations(ctx: &RecommendationContext) -> String {
    format!(
        r#"Based on the following user data, recommend appropriate Wells Fargo credit cards:

{customer}

Available Wells Fargo Credit Cards:
{cards}

Please provide recommendations in the following JSON format:
{{
    "recommendations": [
        {{
            "card_name": "string",
            "reason": "string",
            "benefits": ["string"],
            "annual_fee": "string",
            "credit_limit": "string",
            "interest_rate": "string",
            "user_behavior_match": "string"
        }}
    ]
}}

Important:
1. Only recommend Wells Fargo credit cards from the available list
2. Include specific user behavior analysis in the reason and user_behavior_match fields
3. Focus on how the card's benefits align with the user's spending patterns and interests"#,
        customer = customer_sections(ctx),
        cards = pretty_json(&ctx.products.credit_cards),
    )
}

pub fn grievance_analysis(emails: &[Record]) -> String {
    format!(
        r#"Analyze the following customer grievances and provide insights:

Grievances:
{emails}

Please provide analysis in the following JSON format:
{{
    "common_issues": ["string"],
    "sentiment_analysis": {{
        "positive": "string",
        "negative": "string",
        "neutral": "string"
    }},
    "recommendations": ["string"]
}}"#,
        emails = pretty_json(emails),
    )
}

/// Free-text answer to a customer question, persuasive but grounded in the profile
pub fn customer_query(query: &str, ctx: &RecommendationContext) -> String {
    let top_categories: Map<String, Value> = ctx
        .spending
        .top_categories(3)
        .into_iter()
        .map(|(c, a)| (c, Value::from(a)))
        .collect();
    let cards: &[CreditCardRecommendation] = ctx
        .credit_cards
        .as_ref()
        .map(|r| r.recommendations.as_slice())
        .unwrap_or(&[]);

    let other_products: Vec<&str> = ctx
        .product_recommendations
        .iter()
        .flat_map(|r| {
            r.loan_recommendations
                .iter()
                .map(|l| l.loan_type.as_str())
                .chain(r.other_recommendations.iter().map(|o| o.product_name.as_str()))
        })
        .filter(|name| !name.is_empty())
        .collect();
    let other_products = if other_products.is_empty() {
        "None".to_string()
    } else {
        other_products.join(", ")
    };

    format!(
        r#"Based on the user's query and profile, recommend our best products with a persuasive tone:

Query: {query}

Profile:
- Monthly Spend: ${spend:.2}
- Top Categories: {categories}
- Annual Income: {income}
- Credit Score: {score}

Available Cards:
{cards}

Other Recommended Products: {other_products}

Focus on:
1. Recommend specific cards matching their spending
2. Highlight relevant benefits and rewards
3. Include credit limits and rates
4. Be persuasive but professional"#,
        query = query,
        spend = ctx.spending.total_spend,
        categories = Value::Object(top_categories),
        income = format_usd(kyc_income(ctx.kyc.as_ref())),
        score = kyc_text(ctx.kyc.as_ref(), "Credit Score", "Not specified"),
        cards = pretty_json(cards),
        other_products = other_products,
    )
}

// ============================================================================
// ANALYSIS PROMPTS
// ============================================================================

pub fn financial_insights(report: &FinancialReport) -> String {
    format!(
        r#"Based on the following financial analysis, provide personalized insights and recommendations:

Spending Patterns:
{patterns}

Credit Score Factors:
{factors}

Savings Recommendations:
{savings}

Credit Card Usage:
{usage}

Please provide:
1. Key financial insights
2. Personalized recommendations
3. Action items for improvement
4. Risk factors to watch out for

Format your response in a clear, structured manner."#,
        patterns = pretty_json(&report.spending_patterns),
        factors = pretty_json(&report.credit_score_factors),
        savings = pretty_json(&report.savings_recommendations),
        usage = pretty_json(&report.credit_card_usage),
    )
}

pub fn email_draft(insights: &FinancialInsights) -> String {
    format!(
        r#"Based on the following financial analysis and insights, draft a personalized email to the customer:

Financial Analysis:
{insights}

Please draft a professional, friendly email that:
1. Highlights key findings
2. Provides actionable recommendations
3. Encourages engagement with financial services
4. Maintains a supportive and encouraging tone

Format the email with appropriate greeting and closing."#,
        insights = pretty_json(insights),
    )
}

// ============================================================================
// TESTS
// ============================================================================
