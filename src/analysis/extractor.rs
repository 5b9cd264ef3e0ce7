// 🔎 Data Extractor - turns loaded tables into the customer profile the
// recommendation prompts are built from

use super::stats::{mean, round2};
use crate::config::AnalysisSettings;
use crate::data::{column_f64, column_str, FinancialData, Record, Table, Transaction, TransactionSource};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

// ============================================================================
// KEYWORD TABLES
// ============================================================================

/// Topics detected in social posts for `user_interests`
const INTEREST_KEYWORDS: &[(&str, &[&str])] = &[
    ("travel", &["travel", "vacation", "trip", "holiday"]),
    ("technology", &["tech", "gadget", "computer", "phone"]),
    ("food", &["restaurant", "dining", "food", "cuisine"]),
    ("shopping", &["shopping", "store", "mall", "buy"]),
    ("entertainment", &["movie", "music", "concert", "show"]),
    ("fitness", &["gym", "workout", "fitness", "exercise"]),
    ("education", &["study", "course", "learn", "education"]),
];

/// Wider topic list used by `interest_profile`
const EXTENDED_INTEREST_KEYWORDS: &[(&str, &[&str])] = &[
    ("travel", &["travel", "vacation", "trip", "holiday", "explore", "adventure"]),
    ("technology", &["tech", "gadget", "computer", "phone", "coding", "programming"]),
    ("food", &["restaurant", "dining", "food", "cuisine", "cooking", "recipe"]),
    ("shopping", &["shopping", "store", "mall", "buy", "purchase", "deal"]),
    ("entertainment", &["movie", "music", "concert", "show", "theater", "performance"]),
    ("fitness", &["gym", "workout", "fitness", "exercise", "sports", "training"]),
    ("education", &["study", "course", "learn", "education", "university", "college"]),
    ("art", &["art", "design", "creative", "painting", "drawing", "photography"]),
    ("gaming", &["game", "gaming", "console", "playstation", "xbox", "nintendo"]),
    ("outdoor", &["hiking", "camping", "nature", "park", "outdoor", "adventure"]),
];

const CATEGORY_INTERESTS: &[(&str, &[&str])] = &[
    ("Dining", &["Food", "Restaurants", "Culinary"]),
    ("Entertainment", &["Entertainment", "Movies", "Streaming"]),
    ("Fitness", &["Fitness", "Health", "Sports"]),
    ("Shopping", &["Shopping", "Retail"]),
    ("Transport", &["Travel", "Transportation"]),
    ("Grocery", &["Cooking", "Food"]),
    ("Subscription", &["Entertainment", "Streaming", "Digital Services"]),
    ("Investment", &["Finance", "Investing"]),
    ("Fashion", &["Fashion", "Clothing", "Style"]),
    ("Electronics", &["Technology", "Gadgets"]),
];

/// (preference bucket, merchant keywords, preference label)
const MERCHANT_PREFERENCES: &[(&str, &[&str], &str)] = &[
    ("shopping", &["amazon", "walmart", "target"], "Online Shopping"),
    ("entertainment", &["netflix", "spotify", "hulu"], "Streaming"),
    ("dining", &["starbucks", "restaurant", "cafe"], "Dining Out"),
    ("fitness", &["gym", "fitness", "equinox"], "Gym"),
    ("travel", &["airline", "hotel", "booking"], "Travel"),
];

const POST_CONTENT: &str = "Post Content";

// ============================================================================
// OUTPUT TYPES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantSpend {
    pub merchant: String,
    pub amount: f64,
}

/// Written to spending_analysis.json and read back by the update flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingSummary {
    pub total_spend: f64,
    pub credit_card_spend: f64,
    pub bank_spend: f64,
    pub spending_by_category: BTreeMap<String, f64>,
    pub monthly_spending: BTreeMap<String, f64>,
    pub current_month_spending: f64,
    pub last_month_spending: f64,
    pub month_over_month_change: f64,
    pub max_spending_category: String,
    pub avg_transaction_amount: f64,
    pub top_merchants: Vec<MerchantSpend>,
}

impl SpendingSummary {
    /// Categories ordered by spend, largest first
    pub fn top_categories(&self, n: usize) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .spending_by_category
            .iter()
            .map(|(c, a)| (c.clone(), *a))
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs.truncate(n);
        pairs
    }

    pub fn average_monthly_spend(&self) -> f64 {
        let values: Vec<f64> = self.monthly_spending.values().copied().collect();
        mean(&values).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationInsights {
    pub cost_of_living: String,
    pub typical_activities: Vec<String>,
    pub market_segment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypicalSpendingPatterns {
    pub common_categories: Vec<String>,
    pub typical_merchants: Vec<String>,
    pub spending_trends: Vec<String>,
}

/// The KYC row with demographic insights merged in (kyc_details.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KycProfile {
    #[serde(flatten)]
    pub fields: Record,
    pub age_group: String,
    pub location_insights: LocationInsights,
    pub typical_spending_patterns: TypicalSpendingPatterns,
}

impl KycProfile {
    pub fn from_record(record: &Record) -> Self {
        let age = column_f64(record, &["Age"]).unwrap_or(0.0);
        let location = location_of(record);

        KycProfile {
            fields: record.clone(),
            age_group: age_group(age).to_string(),
            location_insights: location_insights(&location),
            typical_spending_patterns: typical_spending_patterns(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        column_str(&self.fields, &[key])
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        column_f64(&self.fields, &[key])
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `None` for the `{}` profile written when no KYC row existed
    pub fn into_non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestProfile {
    pub spending_habits: Vec<String>,
    pub hobbies: Vec<String>,
    pub frequent_activities: Vec<String>,
    pub preferences: BTreeMap<String, Vec<String>>,
    pub social_media_interests: Vec<String>,
}

/// Product catalogs (available_products.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableProducts {
    pub credit_cards: Vec<Record>,
    pub loans: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditProfile {
    pub total_credit_limit: f64,
    pub current_balance: f64,
    pub utilization_rate: f64,
    pub payment_history: String,
    pub avg_monthly_spend: f64,
}

// ============================================================================
// EXTRACTOR
// ============================================================================

pub struct DataExtractor {
    bank: Vec<Transaction>,
    cards: Vec<Transaction>,
    kyc: Table,
    social_media: Table,
    credit_cards: Table,
    loans: Table,
    credit_card_list: Table,
    interest_threshold: f64,
}

impl DataExtractor {
    pub fn new(data: &FinancialData, settings: &AnalysisSettings) -> Self {
        let extractor = DataExtractor {
            bank: data.bank_transactions(),
            cards: data.card_transactions(),
            kyc: data.kyc.clone(),
            social_media: data.social_media.clone(),
            credit_cards: data.credit_cards.clone(),
            loans: data.loans.clone(),
            credit_card_list: data.credit_card_list.clone(),
            interest_threshold: settings.interest_spend_threshold,
        };
        info!(
            bank = extractor.bank.len(),
            cards = extractor.cards.len(),
            "Data extractor initialized"
        );
        extractor
    }

    fn spending(&self) -> impl Iterator<Item = &Transaction> {
        self.bank.iter().chain(self.cards.iter()).filter(|t| t.is_spending())
    }

    /// Aggregate spending; `as_of` decides which month is "current"
    pub fn spending_summary(&self, as_of: NaiveDate) -> SpendingSummary {
        let mut summary = SpendingSummary::default();

        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_merchant: BTreeMap<String, f64> = BTreeMap::new();
        let mut amounts = Vec::new();

        for tx in self.spending() {
            let spend = tx.spend();
            match tx.source {
                TransactionSource::Bank => summary.bank_spend += spend,
                TransactionSource::CreditCard => summary.credit_card_spend += spend,
            }
            *by_category.entry(tx.category.clone()).or_default() += spend;
            *monthly.entry(tx.month_key()).or_default() += spend;
            *by_merchant.entry(tx.counterparty.clone()).or_default() += spend;
            amounts.push(spend);
        }

        if amounts.is_empty() {
            return summary;
        }

        summary.total_spend = round2(summary.bank_spend + summary.credit_card_spend);
        summary.bank_spend = round2(summary.bank_spend);
        summary.credit_card_spend = round2(summary.credit_card_spend);
        summary.spending_by_category = by_category.into_iter().map(|(c, a)| (c, round2(a))).collect();
        summary.monthly_spending = monthly.into_iter().map(|(m, a)| (m, round2(a))).collect();

        let current_key = as_of.format("%Y-%m").to_string();
        let last_key = previous_month_key(as_of);
        summary.current_month_spending = summary.monthly_spending.get(&current_key).copied().unwrap_or(0.0);
        summary.last_month_spending = summary.monthly_spending.get(&last_key).copied().unwrap_or(0.0);
        if summary.last_month_spending > 0.0 {
            summary.month_over_month_change = round2(
                (summary.current_month_spending - summary.last_month_spending)
                    / summary.last_month_spending
                    * 100.0,
            );
        }

        summary.max_spending_category = summary
            .top_categories(1)
            .into_iter()
            .next()
            .map(|(c, _)| c)
            .unwrap_or_default();

        summary.avg_transaction_amount = round2(mean(&amounts).unwrap_or(0.0));

        let mut merchants: Vec<MerchantSpend> = by_merchant
            .into_iter()
            .map(|(merchant, amount)| MerchantSpend {
                merchant,
                amount: round2(amount),
            })
            .collect();
        merchants.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.merchant.cmp(&b.merchant)));
        merchants.truncate(5);
        summary.top_merchants = merchants;

        summary
    }

    /// First KYC row plus demographic insights; `None` without KYC data
    pub fn kyc_details(&self) -> Option<KycProfile> {
        match self.kyc.first() {
            Some(record) => Some(KycProfile::from_record(record)),
            None => {
                warn!("No KYC details available");
                None
            }
        }
    }

    /// Interests from heavy spending categories and social posts, sorted
    pub fn user_interests(&self) -> Vec<String> {
        let mut interests = BTreeSet::new();

        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for tx in self.spending() {
            *by_category.entry(tx.category.clone()).or_default() += tx.spend();
        }
        for (category, amount) in by_category {
            if amount > self.interest_threshold {
                interests.insert(category.to_lowercase());
            }
        }

        interests.extend(social_interests(&self.social_media));
        interests.into_iter().collect()
    }

    /// Richer interest analysis combining categories, merchants and posts
    pub fn interest_profile(&self, as_of: NaiveDate) -> InterestProfile {
        let summary = self.spending_summary(as_of);

        let mut habits = BTreeSet::new();
        for (category, _) in summary.top_categories(5) {
            if let Some((_, mapped)) = CATEGORY_INTERESTS.iter().find(|(c, _)| *c == category) {
                habits.extend(mapped.iter().map(|s| s.to_string()));
            }
        }

        let mut preferences: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for merchant in &summary.top_merchants {
            let name = merchant.merchant.to_lowercase();
            if let Some((bucket, _, label)) = MERCHANT_PREFERENCES
                .iter()
                .find(|(_, keywords, _)| keywords.iter().any(|k| name.contains(k)))
            {
                preferences.entry(bucket.to_string()).or_default().push(label.to_string());
            }
        }

        let social = match_keywords(&self.social_media, EXTENDED_INTEREST_KEYWORDS);
        let hobbies: BTreeSet<String> = habits.iter().cloned().chain(social.iter().cloned()).collect();

        InterestProfile {
            spending_habits: habits.into_iter().collect(),
            hobbies: hobbies.into_iter().collect(),
            frequent_activities: summary.top_merchants.iter().map(|m| m.merchant.clone()).collect(),
            preferences,
            social_media_interests: social.into_iter().collect(),
        }
    }

    pub fn available_products(&self) -> AvailableProducts {
        AvailableProducts {
            credit_cards: self.credit_cards.records(),
            loans: self.loans.records(),
        }
    }

    pub fn credit_profile(&self) -> CreditProfile {
        let rows = self.credit_card_list.rows();
        let total_credit_limit: f64 = rows
            .iter()
            .filter_map(|r| column_f64(r, &["Credit Limit (USD)"]))
            .sum();
        let current_balance: f64 = rows
            .iter()
            .filter_map(|r| column_f64(r, &["Current Balance (USD)"]))
            .sum();
        let utilization_rate = if total_credit_limit > 0.0 {
            current_balance / total_credit_limit * 100.0
        } else {
            0.0
        };

        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        for tx in self.cards.iter().filter(|t| t.is_spending()) {
            *monthly.entry(tx.month_key()).or_default() += tx.spend();
        }
        let monthly_totals: Vec<f64> = monthly.into_values().collect();

        CreditProfile {
            total_credit_limit: round2(total_credit_limit),
            current_balance: round2(current_balance),
            utilization_rate: round2(utilization_rate),
            payment_history: "Good".to_string(),
            avg_monthly_spend: round2(mean(&monthly_totals).unwrap_or(0.0)),
        }
    }

    pub fn social_media_posts(&self) -> Vec<Record> {
        self.social_media.records()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Interest topics mentioned in the `Post Content` column
pub fn social_interests(posts: &Table) -> BTreeSet<String> {
    match_keywords(posts, INTEREST_KEYWORDS)
}

fn match_keywords(posts: &Table, keywords: &[(&str, &[&str])]) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if !posts.has_column(POST_CONTENT) {
        return found;
    }
    for row in posts.rows() {
        let content = match column_str(row, &[POST_CONTENT]) {
            Some(c) => c.to_lowercase(),
            None => continue,
        };
        for (topic, words) in keywords {
            if words.iter().any(|w| content.contains(w)) {
                found.insert(topic.to_string());
            }
        }
    }
    found
}

pub fn age_group(age: f64) -> &'static str {
    if age < 25.0 {
        "young_professional"
    } else if age < 35.0 {
        "early_career"
    } else if age < 45.0 {
        "mid_career"
    } else if age < 55.0 {
        "established_professional"
    } else {
        "senior"
    }
}

fn location_of(record: &Record) -> String {
    if let Some(location) = column_str(record, &["Location"]) {
        return location;
    }
    match (column_str(record, &["City"]), column_str(record, &["State"])) {
        (Some(city), Some(state)) => format!("{}, {}", city, state),
        (Some(city), None) => city,
        (None, Some(state)) => state,
        (None, None) => String::new(),
    }
}

pub fn location_insights(location: &str) -> LocationInsights {
    let metro = location.contains("New York") || location.contains("San Francisco");
    LocationInsights {
        cost_of_living: if metro { "high" } else { "medium" }.to_string(),
        typical_activities: strings(&["Dining", "Entertainment", "Shopping"]),
        market_segment: if metro { "urban" } else { "suburban" }.to_string(),
    }
}

fn typical_spending_patterns() -> TypicalSpendingPatterns {
    TypicalSpendingPatterns {
        common_categories: strings(&["Dining", "Entertainment", "Shopping"]),
        typical_merchants: strings(&["Restaurants", "Retail Stores", "Entertainment Venues"]),
        spending_trends: strings(&["Online Shopping", "Experiences", "Health & Wellness"]),
    }
}

fn previous_month_key(date: NaiveDate) -> String {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    format!("{:04}-{:02}", year, month)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// TESTS
// ============================================================================
