// Analysis layer: profile extraction and numeric spending analysis

pub mod extractor;
pub mod financial;
pub mod kmeans;
pub mod stats;

pub use extractor::{
    AvailableProducts, CreditProfile, DataExtractor, InterestProfile, KycProfile, MerchantSpend,
    SpendingSummary,
};
pub use financial::{FinancialAnalyzer, FinancialReport};
pub use kmeans::{KMeans, KMeansFit};
