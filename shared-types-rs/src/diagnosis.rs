// shared-types-rs/src/diagnosis.rs
// Structured diagnosis payload

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for any diagnosis field nobody could fill.
pub const NO_INFORMATION: &str = "No information available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    #[serde(rename = "Product Bug")]
    ProductBug,
    #[serde(rename = "Environment Issue")]
    EnvironmentIssue,
    #[serde(rename = "Automation Flaw")]
    AutomationFlaw,
    #[serde(rename = "Configuration Error")]
    ConfigurationError,
    Success,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::ProductBug => "Product Bug",
            FailureCategory::EnvironmentIssue => "Environment Issue",
            FailureCategory::AutomationFlaw => "Automation Flaw",
            FailureCategory::ConfigurationError => "Configuration Error",
            FailureCategory::Success => "Success",
        }
    }

    /// Lenient match for model output: ignores case, spaces, `_` and `-`.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized: String = input
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "productbug" => Some(FailureCategory::ProductBug),
            "environmentissue" => Some(FailureCategory::EnvironmentIssue),
            "automationflaw" => Some(FailureCategory::AutomationFlaw),
            "configurationerror" => Some(FailureCategory::ConfigurationError),
            "success" => Some(FailureCategory::Success),
            _ => None,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category, root cause, reproduction steps and suggested fix for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiagnosisRecord {
    pub failure_category: FailureCategory,
    pub root_cause_summary: String,
    pub reproduction_steps: Vec<String>,
    pub suggested_fix: String,
}

impl DiagnosisRecord {
    /// Blank text fields become [`NO_INFORMATION`].
    pub fn new(
        failure_category: FailureCategory,
        root_cause_summary: impl Into<String>,
        reproduction_steps: Vec<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            failure_category,
            root_cause_summary: or_no_information(root_cause_summary.into()),
            reproduction_steps,
            suggested_fix: or_no_information(suggested_fix.into()),
        }
    }

    /// Fixed diagnosis for a run with no failures.
    pub fn success() -> Self {
        Self {
            failure_category: FailureCategory::Success,
            root_cause_summary: "All tests passed successfully.".to_string(),
            reproduction_steps: Vec::new(),
            suggested_fix: "No fixes needed.".to_string(),
        }
    }
}

fn or_no_information(text: String) -> String {
    if text.trim().is_empty() {
        NO_INFORMATION.to_string()
    } else {
        text
    }
}
