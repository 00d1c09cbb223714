//! PII redaction of failure logs
//!
//! Values stored under sensitive keys inside request and response bodies are
//! swapped for vault tokens. The canonical log is never touched: redaction
//! works on a copy, and a degraded result carries the unmodified copy.

use std::collections::{BTreeMap, HashMap};

use error_handling::FailSoftResult;
use integration_sdk::TokenizerClient;
use serde_json::{Map, Value};
use shared_types::{FailureLogRecord, ResponseBody};
use tracing::{debug, warn};

/// Body keys treated as personal data, compared case-insensitively.
pub const PII_FIELDS: [&str; 5] = ["ssn", "email", "phone", "credit_card", "password"];

fn is_pii_key(key: &str) -> bool {
    PII_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(key))
}

/// Visit every JSON body the log carries.
fn for_each_body(log: &mut FailureLogRecord, mut visit: impl FnMut(&mut Value)) {
    for record in &mut log.request_history {
        if let Some(body) = record.request_body.as_mut() {
            visit(body);
        }
        if let ResponseBody::Json(body) = &mut record.response_body {
            visit(body);
        }
    }
    if let Some(failure) = log.failure.as_mut() {
        let call = &mut failure.failing_call;
        if let Some(body) = call.request_data.body.as_mut() {
            visit(body);
        }
        if let ResponseBody::Json(body) = &mut call.response_data.body {
            visit(body);
        }
    }
}

fn walk(value: &mut Value, visit: &mut impl FnMut(&str, &mut Value)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if is_pii_key(key) && !child.is_object() && !child.is_array() && !child.is_null() {
                    visit(key, child);
                } else {
                    walk(child, visit);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, visit);
            }
        }
        _ => {}
    }
}

/// Distinct values per lowercased field name, in first-seen order.
fn collect_pii(log: &mut FailureLogRecord) -> BTreeMap<String, Vec<Value>> {
    let mut found: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for_each_body(log, |body| {
        walk(body, &mut |key, value| {
            let values = found.entry(key.to_ascii_lowercase()).or_default();
            if !values.contains(value) {
                values.push(value.clone());
            }
        });
    });
    found
}

/// Group values into vault records holding at most one value per field.
fn batches(found: &BTreeMap<String, Vec<Value>>) -> Vec<Map<String, Value>> {
    let depth = found.values().map(Vec::len).max().unwrap_or(0);
    (0..depth)
        .map(|i| {
            found
                .iter()
                .filter_map(|(field, values)| values.get(i).map(|v| (field.clone(), v.clone())))
                .collect()
        })
        .collect()
}

fn token_key(field: &str, value: &Value) -> (String, String) {
    (field.to_ascii_lowercase(), value.to_string())
}

/// Return a copy of `log` with PII values tokenized.
///
/// `enabled` is false when the vault is unavailable, any tokenize call
/// degraded, or a field came back without a token; in that case the
/// returned copy is identical to `log`.
pub async fn redact_failure_log(
    log: &FailureLogRecord,
    tokenizer: &TokenizerClient,
) -> FailSoftResult<FailureLogRecord> {
    if !tokenizer.is_enabled() {
        return FailSoftResult::degraded(log.clone(), "tokenizer is not configured");
    }

    let mut redacted = log.clone();
    let found = collect_pii(&mut redacted);
    if found.is_empty() {
        debug!(run_id = %log.run_id, "No PII fields in failure log");
        return FailSoftResult::enabled(redacted);
    }

    let mut tokens: HashMap<(String, String), Value> = HashMap::new();
    for record in batches(&found) {
        let result = tokenizer.tokenize(&record).await;
        if !result.enabled {
            let reason = result.reason.unwrap_or_else(|| "tokenize failed".to_string());
            warn!(run_id = %log.run_id, reason = %reason, "Leaving failure log unredacted");
            return FailSoftResult::degraded(log.clone(), reason);
        }
        for (field, original) in &record {
            let Some(token) = result.value.get(field) else {
                let reason = format!("tokenizer returned no token for {}", field);
                warn!(run_id = %log.run_id, reason = %reason, "Leaving failure log unredacted");
                return FailSoftResult::degraded(log.clone(), reason);
            };
            tokens.insert(token_key(field, original), token.clone());
        }
    }

    for_each_body(&mut redacted, |body| {
        walk(body, &mut |key, value| {
            if let Some(token) = tokens.get(&token_key(key, value)) {
                *value = token.clone();
            }
        });
    });

    debug!(run_id = %log.run_id, fields = found.len(), "Failure log tokenized");
    FailSoftResult::enabled(redacted)
}
