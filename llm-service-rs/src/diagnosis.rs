//! Model-first diagnosis with a deterministic fallback.

use config_rs::LlmSettings;
use error_handling::FailSoft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{DiagnosisRecord, FailureCategory, FailureLogRecord, RetrievedContext};
use tracing::{info, warn};

use crate::llm_client::{LlmClient, LlmError};
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::rules::rule_based_diagnosis;

const SERVICE_NAME: &str = "llm";

/// Which path produced a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// The run passed; no diagnosis was needed.
    Success,
    Llm,
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisOutcome {
    pub record: DiagnosisRecord,
    pub source: DiagnosisSource,
    /// Why the model path was not used, if it was skipped or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct DiagnosisStage {
    client: Option<LlmClient>,
    fail_soft: FailSoft,
}

impl DiagnosisStage {
    pub fn new(settings: LlmSettings) -> Self {
        let client = match LlmClient::new(settings) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "LLM client unavailable, diagnosis will be rule-based");
                None
            }
        };
        Self::with_client(client)
    }

    pub fn with_client(client: Option<LlmClient>) -> Self {
        let configured = client.as_ref().map(LlmClient::is_configured).unwrap_or(false);
        Self {
            client,
            fail_soft: FailSoft::new(SERVICE_NAME, configured),
        }
    }

    pub fn from_env() -> Self {
        Self::new(LlmSettings::from_env())
    }

    /// Stage that never calls a model.
    pub fn rule_based() -> Self {
        Self::with_client(None)
    }

    pub fn is_llm_enabled(&self) -> bool {
        self.fail_soft.is_configured()
    }

    /// Diagnose one run. Always yields a fully populated record.
    pub async fn diagnose(&self, log: &FailureLogRecord, context: &RetrievedContext) -> DiagnosisOutcome {
        if !log.is_failed() {
            return DiagnosisOutcome {
                record: DiagnosisRecord::success(),
                source: DiagnosisSource::Success,
                reason: None,
            };
        }

        let fallback = rule_based_diagnosis(log);
        let prompt = build_prompt(log, context);

        let result = self
            .fail_soft
            .call("diagnose", || self.ask_model(&prompt), || Value::Null)
            .await;

        if result.enabled {
            if let Some(record) = merge_model_output(&result.value, &fallback) {
                info!(run_id = %log.run_id, category = %record.failure_category, "Diagnosis from model");
                return DiagnosisOutcome {
                    record,
                    source: DiagnosisSource::Llm,
                    reason: None,
                };
            }
        }

        let reason = result
            .reason
            .unwrap_or_else(|| "model output was not a JSON object".to_string());
        info!(run_id = %log.run_id, reason = %reason, "Using rule-based diagnosis");
        DiagnosisOutcome {
            record: fallback,
            source: DiagnosisSource::RuleBased,
            reason: Some(reason),
        }
    }

    async fn ask_model(&self, prompt: &str) -> Result<Value, LlmError> {
        let client = self.client.as_ref().ok_or(LlmError::NotConfigured)?;
        client.complete_json(prompt, SYSTEM_PROMPT).await
    }
}

fn text_field(output: &Value, key: &str) -> String {
    match output.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Fill a diagnosis from model output.
///
/// Missing text becomes "No information available."; a missing or unknown
/// category and missing steps come from `fallback`. `None` when the output
/// is not a JSON object.
pub fn merge_model_output(output: &Value, fallback: &DiagnosisRecord) -> Option<DiagnosisRecord> {
    if !output.is_object() {
        return None;
    }

    let category = output
        .get("FailureCategory")
        .and_then(Value::as_str)
        .and_then(FailureCategory::parse)
        .filter(|c| *c != FailureCategory::Success)
        .unwrap_or(fallback.failure_category);

    let steps: Vec<String> = match output.get("ReproductionSteps") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(step) => step.clone(),
                other => other.to_string(),
            })
            .filter(|step| !step.trim().is_empty())
            .collect(),
        Some(Value::String(step)) if !step.trim().is_empty() => vec![step.clone()],
        _ => Vec::new(),
    };
    let steps = if steps.is_empty() {
        fallback.reproduction_steps.clone()
    } else {
        steps
    };

    Some(DiagnosisRecord::new(
        category,
        text_field(output, "RootCauseSummary"),
        steps,
        text_field(output, "SuggestedFix"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::NO_INFORMATION;

    fn fallback() -> DiagnosisRecord {
        DiagnosisRecord::new(
            FailureCategory::EnvironmentIssue,
            "rule summary",
            vec!["curl -X GET 'http://api/health'".to_string()],
            "rule fix",
        )
    }

    #[test]
    fn test_full_output_is_used() {
        let output = json!({
            "FailureCategory": "Product Bug",
            "RootCauseSummary": "Login returns 500 for bad passwords.",
            "ReproductionSteps": ["curl -X POST 'http://api/login'"],
            "SuggestedFix": "Return 401 from the credential check."
        });
        let record = merge_model_output(&output, &fallback()).unwrap();

        assert_eq!(record.failure_category, FailureCategory::ProductBug);
        assert_eq!(record.reproduction_steps, vec!["curl -X POST 'http://api/login'"]);
        assert_eq!(record.suggested_fix, "Return 401 from the credential check.");
    }

    #[test]
    fn test_missing_fields_are_filled() {
        let record = merge_model_output(&json!({"FailureCategory": "flaky"}), &fallback()).unwrap();

        assert_eq!(record.failure_category, FailureCategory::EnvironmentIssue);
        assert_eq!(record.root_cause_summary, NO_INFORMATION);
        assert_eq!(record.suggested_fix, NO_INFORMATION);
        assert_eq!(record.reproduction_steps, fallback().reproduction_steps);
    }

    #[test]
    fn test_non_object_output_is_rejected() {
        assert!(merge_model_output(&json!(["a"]), &fallback()).is_none());
        assert!(merge_model_output(&Value::Null, &fallback()).is_none());
    }
}
