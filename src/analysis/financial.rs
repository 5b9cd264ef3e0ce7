// 📊 Financial Analyzer - spending patterns, clusters, savings potential
// Works on bank statement lines; card usage comes from the card statement.

use super::kmeans::KMeans;
use super::stats::{mean, normalized_entropy, population_std, quantile, round2, sample_std};
use crate::config::AnalysisSettings;
use crate::data::{column_f64, FinancialData, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const CLUSTER_LABELS: [&str; 3] = ["Low", "Medium", "High"];

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingPatterns {
    /// Signed sum per category, largest first
    pub category_spending: Vec<(String, f64)>,
    pub monthly_spending: BTreeMap<String, f64>,
    pub avg_transaction: BTreeMap<String, f64>,
    /// Top 10 receivers by signed sum
    pub top_merchants: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingCluster {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub sum: f64,
    pub top_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub clusters: Vec<SpendingCluster>,
    pub cluster_labels: Vec<String>,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardUsage {
    pub total_spending: f64,
    pub category_spending: BTreeMap<String, f64>,
    pub avg_transaction: f64,
    pub credit_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    pub subscription_spending: f64,
    pub subscription_savings: f64,
    pub high_value_threshold: f64,
    pub high_value_transactions: f64,
    pub impulse_savings: f64,
    pub total_potential_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditFactors {
    /// Coefficient of variation of monthly spending (lower = steadier)
    pub payment_consistency: f64,
    /// Normalized entropy of category spending shares, 0..1
    pub spending_diversity: f64,
}

/// Everything the analyzer produces, as written to financial_analysis.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub spending_patterns: SpendingPatterns,
    pub spending_clusters: Option<ClusterReport>,
    pub credit_card_usage: Option<CardUsage>,
    pub savings_recommendations: Option<SavingsReport>,
    pub credit_score_factors: Option<CreditFactors>,
}

// ============================================================================
// ANALYZER
// ============================================================================

pub struct FinancialAnalyzer {
    bank: Vec<Transaction>,
    cards: Vec<Transaction>,
    credit_limit: Option<f64>,
    card_balance: Option<f64>,
    settings: AnalysisSettings,
}

impl FinancialAnalyzer {
    pub fn new(data: &FinancialData, settings: &AnalysisSettings) -> Self {
        let limits: Vec<f64> = data
            .credit_card_list
            .rows()
            .iter()
            .filter_map(|r| column_f64(r, &["Credit Limit (USD)"]))
            .collect();
        let balances: Vec<f64> = data
            .credit_card_list
            .rows()
            .iter()
            .filter_map(|r| column_f64(r, &["Current Balance (USD)"]))
            .collect();

        Self::from_transactions(data.bank_transactions(), data.card_transactions(), settings)
            .with_card_limits(
                (!limits.is_empty()).then(|| limits.iter().sum()),
                (!balances.is_empty()).then(|| balances.iter().sum()),
            )
    }

    pub fn from_transactions(
        bank: Vec<Transaction>,
        cards: Vec<Transaction>,
        settings: &AnalysisSettings,
    ) -> Self {
        info!(bank = bank.len(), cards = cards.len(), "Initializing financial analyzer");
        FinancialAnalyzer {
            bank,
            cards,
            credit_limit: None,
            card_balance: None,
            settings: settings.clone(),
        }
    }

    pub fn with_card_limits(mut self, limit: Option<f64>, balance: Option<f64>) -> Self {
        self.credit_limit = limit;
        self.card_balance = balance;
        self
    }

    /// Run every analysis
    pub fn report(&self) -> FinancialReport {
        FinancialReport {
            spending_patterns: self.spending_patterns(),
            spending_clusters: self.spending_clusters(),
            credit_card_usage: self.credit_card_usage(),
            savings_recommendations: self.savings_recommendations(),
            credit_score_factors: self.credit_score_factors(),
        }
    }

    pub fn spending_patterns(&self) -> SpendingPatterns {
        if self.bank.is_empty() {
            warn!("No transaction data found");
            return SpendingPatterns::default();
        }

        let mut by_category: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_receiver: BTreeMap<String, f64> = BTreeMap::new();

        for tx in &self.bank {
            by_category.entry(tx.category.clone()).or_default().push(tx.amount);
            *monthly.entry(tx.month_key()).or_default() += tx.amount;
            *by_receiver.entry(tx.counterparty.clone()).or_default() += tx.amount;
        }

        let mut category_spending: Vec<(String, f64)> = by_category
            .iter()
            .map(|(c, amounts)| (c.clone(), round2(amounts.iter().sum())))
            .collect();
        sort_desc(&mut category_spending);

        let avg_transaction = by_category
            .iter()
            .filter_map(|(c, amounts)| mean(amounts).map(|m| (c.clone(), round2(m))))
            .collect();

        let mut top_merchants: Vec<(String, f64)> =
            by_receiver.into_iter().map(|(r, s)| (r, round2(s))).collect();
        sort_desc(&mut top_merchants);
        top_merchants.truncate(10);

        info!("Successfully analyzed spending patterns");
        SpendingPatterns {
            category_spending,
            monthly_spending: monthly.into_iter().map(|(m, s)| (m, round2(s))).collect(),
            avg_transaction,
            top_merchants,
        }
    }

    /// Cluster transaction amounts into Low / Medium / High groups
    pub fn spending_clusters(&self) -> Option<ClusterReport> {
        if self.bank.is_empty() {
            return None;
        }

        let amounts: Vec<f64> = self.bank.iter().map(|t| t.amount).collect();
        let scaled = standardize(&amounts);
        let points: Vec<Vec<f64>> = scaled.iter().map(|v| vec![*v]).collect();

        let fit = KMeans::new(self.settings.spending_clusters, self.settings.kmeans_seed)
            .with_restarts(self.settings.kmeans_restarts)
            .fit(&points)?
            .ordered_by_first_dim();

        let mut clusters = Vec::with_capacity(fit.k());
        for cluster in 0..fit.k() {
            let members: Vec<&Transaction> = self
                .bank
                .iter()
                .zip(&fit.labels)
                .filter(|(_, label)| **label == cluster)
                .map(|(tx, _)| tx)
                .collect();
            let member_amounts: Vec<f64> = members.iter().map(|t| t.amount).collect();

            clusters.push(SpendingCluster {
                label: cluster_label(cluster, fit.k()),
                count: members.len(),
                mean: round2(mean(&member_amounts).unwrap_or(0.0)),
                sum: round2(member_amounts.iter().sum()),
                top_category: modal_category(&members),
            });
        }

        Some(ClusterReport {
            cluster_labels: clusters.iter().map(|c| c.label.clone()).collect(),
            clusters,
            inertia: fit.inertia,
        })
    }

    pub fn credit_card_usage(&self) -> Option<CardUsage> {
        let spending: Vec<&Transaction> = self.cards.iter().filter(|t| t.is_spending()).collect();
        if spending.is_empty() {
            warn!("No credit card transaction data found");
            return None;
        }

        let amounts: Vec<f64> = spending.iter().map(|t| t.spend()).collect();
        let mut category_spending: BTreeMap<String, f64> = BTreeMap::new();
        for tx in &spending {
            *category_spending.entry(tx.category.clone()).or_default() += tx.spend();
        }

        let credit_utilization = match (self.card_balance, self.credit_limit) {
            (Some(balance), Some(limit)) if limit > 0.0 => round2(balance / limit * 100.0),
            _ => 0.0,
        };

        Some(CardUsage {
            total_spending: round2(amounts.iter().sum()),
            category_spending: category_spending
                .into_iter()
                .map(|(c, s)| (c, round2(s)))
                .collect(),
            avg_transaction: round2(mean(&amounts).unwrap_or(0.0)),
            credit_utilization,
        })
    }

    pub fn savings_recommendations(&self) -> Option<SavingsReport> {
        let spending: Vec<&Transaction> = self.bank.iter().filter(|t| t.is_spending()).collect();
        if spending.is_empty() {
            return None;
        }

        let subscription_spending: f64 = spending
            .iter()
            .filter(|t| {
                self.settings
                    .subscription_categories
                    .contains(&t.category.to_lowercase())
            })
            .map(|t| t.spend())
            .sum();

        let amounts: Vec<f64> = spending.iter().map(|t| t.spend()).collect();
        let threshold = quantile(&amounts, self.settings.high_value_quantile)?;
        let high_value: f64 = amounts.iter().filter(|a| **a > threshold).sum();

        let subscription_savings = subscription_spending * self.settings.subscription_savings_rate;
        let impulse_savings = high_value * self.settings.impulse_savings_rate;

        Some(SavingsReport {
            subscription_spending: round2(subscription_spending),
            subscription_savings: round2(subscription_savings),
            high_value_threshold: round2(threshold),
            high_value_transactions: round2(high_value),
            impulse_savings: round2(impulse_savings),
            total_potential_savings: round2(subscription_savings + impulse_savings),
        })
    }

    pub fn credit_score_factors(&self) -> Option<CreditFactors> {
        let spending: Vec<&Transaction> = self.bank.iter().filter(|t| t.is_spending()).collect();
        if spending.is_empty() {
            return None;
        }

        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for tx in &spending {
            *monthly.entry(tx.month_key()).or_default() += tx.spend();
            *by_category.entry(tx.category.clone()).or_default() += tx.spend();
        }

        let monthly_totals: Vec<f64> = monthly.into_values().collect();
        let payment_consistency = match (sample_std(&monthly_totals), mean(&monthly_totals)) {
            (Some(std), Some(m)) if m > 0.0 => std / m,
            _ => 0.0,
        };

        let shares: Vec<f64> = by_category.into_values().collect();

        Some(CreditFactors {
            payment_consistency: round4(payment_consistency),
            spending_diversity: round4(normalized_entropy(&shares)),
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Z-score with population std; constant input maps to zeros
fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values).unwrap_or(0.0);
    let std = population_std(values).unwrap_or(0.0);
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / std).collect()
}

fn cluster_label(index: usize, k: usize) -> String {
    if k == CLUSTER_LABELS.len() {
        CLUSTER_LABELS[index].to_string()
    } else {
        format!("Cluster {}", index + 1)
    }
}

/// Most frequent category; ties go to the first name alphabetically
fn modal_category(members: &[&Transaction]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tx in members {
        *counts.entry(tx.category.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (category, count) in counts {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((category, count));
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Sort (name, value) pairs by value descending, then name
fn sort_desc(pairs: &mut [(String, f64)]) {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransactionSource;
    use chrono::NaiveDate;

    fn tx(date: &str, amount: f64, counterparty: &str, category: &str) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            counterparty: counterparty.to_string(),
            category: category.to_string(),
            transaction_type: None,
            card_id: None,
            source: TransactionSource::Bank,
        }
    }

    fn analyzer(bank: Vec<Transaction>) -> FinancialAnalyzer {
        FinancialAnalyzer::from_transactions(bank, Vec::new(), &AnalysisSettings::default())
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("2024-01-03", -12.0, "Netflix", "Streaming"),
            tx("2024-01-05", -40.0, "Safeway", "Grocery"),
            tx("2024-01-09", -35.0, "Safeway", "Grocery"),
            tx("2024-01-15", 3000.0, "Employer", "Income"),
            tx("2024-02-03", -12.0, "Netflix", "Streaming"),
            tx("2024-02-10", -900.0, "Best Buy", "Electronics"),
            tx("2024-02-12", -45.0, "Safeway", "Grocery"),
            tx("2024-02-15", 3000.0, "Employer", "Income"),
            tx("2024-02-20", -60.0, "Chevron", "Transport"),
            tx("2024-02-25", -25.0, "Chevron", "Transport"),
        ]
    }

    #[test]
    fn test_spending_patterns() {
        let patterns = analyzer(sample()).spending_patterns();

        assert_eq!(patterns.category_spending[0], ("Income".to_string(), 6000.0));
        assert_eq!(
            patterns.category_spending.last().unwrap(),
            &("Electronics".to_string(), -900.0)
        );
        assert_eq!(patterns.monthly_spending["2024-01"], 2913.0);
        assert_eq!(patterns.avg_transaction["Grocery"], -40.0);
        assert_eq!(patterns.top_merchants[0].0, "Employer");
    }

    #[test]
    fn test_spending_patterns_empty() {
        assert_eq!(analyzer(Vec::new()).spending_patterns(), SpendingPatterns::default());
    }

    #[test]
    fn test_clusters_are_low_medium_high() {
        let report = analyzer(sample()).spending_clusters().unwrap();

        assert_eq!(report.cluster_labels, vec!["Low", "Medium", "High"]);
        let total: usize = report.clusters.iter().map(|c| c.count).sum();
        assert_eq!(total, 10);

        // The big purchase sits alone at the bottom, the two salaries at the top
        assert_eq!(report.clusters[0].count, 1);
        assert_eq!(report.clusters[0].top_category, "Electronics");
        assert_eq!(report.clusters[2].count, 2);
        assert_eq!(report.clusters[2].sum, 6000.0);
        assert_eq!(report.clusters[1].top_category, "Grocery");
    }

    #[test]
    fn test_clusters_none_without_transactions() {
        assert!(analyzer(Vec::new()).spending_clusters().is_none());
    }

    #[test]
    fn test_savings_recommendations() {
        let report = analyzer(sample()).savings_recommendations().unwrap();

        assert_eq!(report.subscription_spending, 24.0);
        assert_eq!(report.subscription_savings, 4.8);
        // Spending: 12, 40, 35, 12, 900, 45, 60, 25 -> 0.9 quantile = 312.0
        assert_eq!(report.high_value_threshold, 312.0);
        assert_eq!(report.high_value_transactions, 900.0);
        assert_eq!(report.impulse_savings, 135.0);
        assert_eq!(report.total_potential_savings, 139.8);
    }

    #[test]
    fn test_credit_score_factors() {
        let factors = analyzer(sample()).credit_score_factors().unwrap();

        // Monthly spending: 87 and 1042
        assert!(factors.payment_consistency > 1.0);
        assert!(factors.spending_diversity > 0.0 && factors.spending_diversity < 1.0);

        let single = analyzer(vec![tx("2024-01-01", -10.0, "A", "Grocery")])
            .credit_score_factors()
            .unwrap();
        assert_eq!(single.payment_consistency, 0.0);
        assert_eq!(single.spending_diversity, 0.0);
    }

    #[test]
    fn test_card_usage_with_utilization() {
        let mut card = tx("2024-01-04", -200.0, "Amazon", "Shopping");
        card.source = TransactionSource::CreditCard;
        let mut refund = tx("2024-01-06", 50.0, "Amazon", "Shopping");
        refund.source = TransactionSource::CreditCard;

        let usage = FinancialAnalyzer::from_transactions(
            Vec::new(),
            vec![card, refund],
            &AnalysisSettings::default(),
        )
        .with_card_limits(Some(5000.0), Some(1250.0))
        .credit_card_usage()
        .unwrap();

        assert_eq!(usage.total_spending, 200.0);
        assert_eq!(usage.avg_transaction, 200.0);
        assert_eq!(usage.category_spending["Shopping"], 200.0);
        assert_eq!(usage.credit_utilization, 25.0);
    }

    #[test]
    fn test_standardize_constant_values() {
        assert_eq!(standardize(&[4.0, 4.0]), vec![0.0, 0.0]);
    }
}
