//! # content-optimizer
//!
//! Multi-pass content compliance optimizer for SEO and readability.
//!
//! Given an article record and a focus keyword (plus ordered synonyms), the
//! optimizer detects SEO, readability and image defects, applies automated
//! corrections and repeats detect-correct-score cycles until a target
//! compliance score is reached, the iteration budget runs out, or progress
//! stagnates.

pub mod adaptive;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod media;
pub mod optimizer;
pub mod readability;
pub mod seo;

pub use content::{ContentRecord, ContentType, Issue, IssueType, Severity};
pub use error::{Error, Result};
pub use optimizer::{ContentOptimizer, OptimizationResult, OptimizerConfig, TerminationReason};
pub use seo::ValidationResult;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::InvalidInput("test".to_string());
        assert!(err.to_string().contains("test"));
    }
}
