// 📈 Financial Analyst - narrative insights and customer email drafts

use super::client::{CompletionBackend, CompletionRequest};
use super::prompts;
use crate::analysis::FinancialReport;
use crate::config::LlmSettings;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialInsights {
    pub key_insights: String,
    pub recommendations: String,
    pub action_items: String,
    pub risk_factors: String,
}

impl FinancialInsights {
    /// Split a reply into its numbered sections 1-4.
    ///
    /// When the reply does not have all four sections, every field carries
    /// the whole text.
    pub fn from_reply(reply: &str) -> Self {
        let text = reply.trim();
        match split_numbered_sections(text) {
            Some([key_insights, recommendations, action_items, risk_factors]) => FinancialInsights {
                key_insights,
                recommendations,
                action_items,
                risk_factors,
            },
            None => {
                warn!("Insights reply has no numbered sections; using the full text for each");
                FinancialInsights {
                    key_insights: text.to_string(),
                    recommendations: text.to_string(),
                    action_items: text.to_string(),
                    risk_factors: text.to_string(),
                }
            }
        }
    }

    /// Plain-text rendering for insights.txt
    pub fn to_text(&self) -> String {
        format!(
            "KEY INSIGHTS\n{}\n\nRECOMMENDATIONS\n{}\n\nACTION ITEMS\n{}\n\nRISK FACTORS\n{}\n",
            self.key_insights, self.recommendations, self.action_items, self.risk_factors
        )
    }
}

/// Number that opens a section heading such as "2.", "**3.**" or "### 4)".
/// Indented lines are list items, never headings.
fn heading_number(line: &str) -> Option<u32> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let stripped = line.trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    let mut chars = stripped.chars();
    let digit = chars.next()?.to_digit(10)?;
    match chars.next() {
        Some('.') | Some(')') => Some(digit),
        _ => None,
    }
}

fn split_numbered_sections(text: &str) -> Option<[String; 4]> {
    let mut sections: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        let next = sections.len() as u32 + 1;
        if next <= 4 && heading_number(line) == Some(next) {
            sections.push(vec![line.trim()]);
        } else if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }

    if sections.len() < 4 {
        return None;
    }

    let joined: Vec<String> = sections.iter().map(|lines| lines.join("\n").trim().to_string()).collect();
    joined.try_into().ok()
}

pub struct FinancialAnalyst<B> {
    backend: B,
    settings: LlmSettings,
}

impl<B: CompletionBackend> FinancialAnalyst<B> {
    pub fn new(backend: B, settings: &LlmSettings) -> Self {
        FinancialAnalyst {
            backend,
            settings: settings.clone(),
        }
    }

    fn generate(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(prompt, &self.settings.analysis);
        Ok(self.backend.complete(&request)?.trim().to_string())
    }

    pub fn financial_insights(&self, report: &FinancialReport) -> Result<FinancialInsights> {
        info!("Generating financial insights");
        let reply = self.generate(prompts::financial_insights(report))?;
        Ok(FinancialInsights::from_reply(&reply))
    }

    pub fn email_draft(&self, insights: &FinancialInsights) -> Result<String> {
        info!("Drafting customer email");
        self.generate(prompts::email_draft(insights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = "\
Here is your analysis.

1. Key financial insights
Dining is your largest category.

**2. Personalized recommendations**
Consider a dining rewards card.

3) Action items
- Cap restaurant spend at $300

### 4. Risk factors
Utilization is creeping up.
";

    #[test]
    fn test_sections_are_split() {
        let insights = FinancialInsights::from_reply(STRUCTURED);

        assert_eq!(
            insights.key_insights,
            "1. Key financial insights\nDining is your largest category."
        );
        assert!(insights.recommendations.contains("dining rewards card"));
        assert!(insights.action_items.starts_with("3) Action items"));
        assert!(insights.risk_factors.ends_with("Utilization is creeping up."));
        assert!(!insights.key_insights.contains("Here is your analysis"));
    }

    #[test]
    fn test_unstructured_reply_fills_every_field() {
        let insights = FinancialInsights::from_reply("  Spend less on coffee.  ");
        assert_eq!(insights.key_insights, "Spend less on coffee.");
        assert_eq!(insights.risk_factors, "Spend less on coffee.");
    }

    #[test]
    fn test_out_of_order_numbers_are_not_sections() {
        let text = "2. Second\n1. First\n3. Third\n4. Fourth";
        let insights = FinancialInsights::from_reply(text);
        assert_eq!(insights.key_insights, text);
    }

    #[test]
    fn test_indented_sub_items_stay_in_their_section() {
        let reply = "1. Key financial insights\n   1. Travel is your top category.\n   2. Income is stable.\n\
2. Personalized recommendations\n   Use a travel card.\n\
3. Action items\n   3. Set a travel budget.\n\
4. Risk factors\n   Utilization is high.";
        let insights = FinancialInsights::from_reply(reply);

        assert!(insights.key_insights.ends_with("2. Income is stable."));
        assert_eq!(
            insights.recommendations,
            "2. Personalized recommendations\n   Use a travel card."
        );
        assert!(insights.action_items.contains("Set a travel budget"));
        assert!(insights.risk_factors.starts_with("4. Risk factors"));
    }

    #[test]
    fn test_heading_number() {
        assert_eq!(heading_number("1. Insights"), Some(1));
        assert_eq!(heading_number("**2.** Recs"), Some(2));
        assert_eq!(heading_number("## 3) Actions"), Some(3));
        assert_eq!(heading_number("10 things"), None);
        assert_eq!(heading_number("- bullet"), None);
        assert_eq!(heading_number("   2. nested item"), None);
    }
}
