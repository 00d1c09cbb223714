//! Prompt construction for model-backed diagnosis.

use serde_json::json;
use shared_types::{FailureLogRecord, RetrievedContext};

pub const SYSTEM_PROMPT: &str = "You are an API quality coach diagnosing automated test failures.
Your output MUST be strictly formatted JSON with keys:
FailureCategory, RootCauseSummary, ReproductionSteps, SuggestedFix.

FailureCategory must be one of: Product Bug, Environment Issue, Automation Flaw, Configuration Error
RootCauseSummary is a plain-English paragraph explaining why the failure occurred
ReproductionSteps is an array of terminal-ready commands or API calls
SuggestedFix is a code snippet or step-by-step fix instructions";

/// One JSON document holding the instructions, the failure log and the
/// retrieved context, wrapped in the user message.
pub fn build_prompt(log: &FailureLogRecord, context: &RetrievedContext) -> String {
    let payload = json!({
        "instructions": {
            "task": "Automated failure analysis for an API test run.",
            "schema": {
                "FailureCategory": "string, one of \"Product Bug\", \"Environment Issue\", \"Automation Flaw\", \"Configuration Error\"",
                "RootCauseSummary": "string, plain-English paragraph describing why the failure occurred.",
                "ReproductionSteps": "array of strings, terminal-ready commands or API calls.",
                "SuggestedFix": "string, code snippet OR file path + line reference."
            }
        },
        "failure_log": log,
        "retrieved_context": context,
    });

    let document = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!(
        "Analyze this failing log and context.\nReturn ONLY the JSON object.\n\n{}",
        document
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{RunStatus, Snippet};

    #[test]
    fn test_prompt_embeds_log_and_context() {
        let log = FailureLogRecord {
            run_id: "run-p".to_string(),
            timestamp: Utc::now(),
            commit_hash: "c0ffee".to_string(),
            status: RunStatus::Failed,
            failure: None,
            request_history: Vec::new(),
        };
        let context = RetrievedContext {
            code: vec![Snippet::new("fn handler() {}")],
            docs: Vec::new(),
        };

        let prompt = build_prompt(&log, &context);
        let json_start = prompt.find('{').unwrap();
        let document: serde_json::Value = serde_json::from_str(&prompt[json_start..]).unwrap();

        assert_eq!(document["failure_log"]["commit_hash"], "c0ffee");
        assert_eq!(document["retrieved_context"]["code"][0]["text"], "fn handler() {}");
        assert!(document["instructions"]["schema"]["SuggestedFix"].is_string());
    }
}
