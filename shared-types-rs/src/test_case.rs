// shared-types-rs/src/test_case.rs
// Declarative test cases and the ordered table that drives a run

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::http::HttpMethod;

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Test case name must not be empty")]
    EmptyName,

    #[error("Duplicate test case name: {0}")]
    DuplicateName(String),

    #[error("Test case {0} has an empty endpoint")]
    EmptyEndpoint(String),

    #[error("Test case {0} has no expected status codes")]
    NoExpectedStatus(String),

    #[error("Failed to parse test suite: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A single declarative probe: what to call and what counts as passing.
///
/// Fields are private; `TestCase::new` is the only way in, so every
/// instance already satisfies the table's rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    name: String,
    method: HttpMethod,
    endpoint: String,
    payload: Option<Value>,
    expected_status: Vec<u16>,
    requires_json: bool,
}

impl TestCase {
    /// Build a validated test case.
    ///
    /// Duplicate status codes are dropped; declaration order is kept so
    /// failure reasons list codes the way the author wrote them.
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        endpoint: impl Into<String>,
        payload: Option<Value>,
        expected_status: impl IntoIterator<Item = u16>,
        requires_json: bool,
    ) -> Result<Self, SuiteError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SuiteError::EmptyName);
        }

        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(SuiteError::EmptyEndpoint(name));
        }

        let mut seen = HashSet::new();
        let expected_status: Vec<u16> = expected_status
            .into_iter()
            .filter(|code| seen.insert(*code))
            .collect();
        if expected_status.is_empty() {
            return Err(SuiteError::NoExpectedStatus(name));
        }

        // A JSON null payload means "no body".
        let payload = payload.filter(|p| !p.is_null());

        Ok(Self {
            name,
            method,
            endpoint,
            payload,
            expected_status,
            requires_json,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn expected_status(&self) -> &[u16] {
        &self.expected_status
    }

    pub fn requires_json(&self) -> bool {
        self.requires_json
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.expected_status.contains(&status)
    }

    /// Expected codes joined for humans, e.g. `200 or 401`.
    pub fn expected_description(&self) -> String {
        self.expected_status
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Full URL for this case against `base_url`, trailing slashes trimmed.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.endpoint)
    }
}

/// Raw shape accepted from JSON files.
#[derive(Debug, Deserialize)]
struct TestCaseDefinition {
    name: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    expected_status: Option<Vec<u16>>,
    #[serde(default)]
    requires_json: Option<bool>,
}

/// Defaults applied to missing fields, which differ between the list
/// form and the name-keyed form.
struct DefinitionDefaults {
    requires_json: bool,
}

impl TestCaseDefinition {
    fn into_case(self, name: String, defaults: &DefinitionDefaults) -> Result<TestCase, SuiteError> {
        let method = HttpMethod::try_from(self.method.as_deref().unwrap_or("GET"))?;
        TestCase::new(
            name,
            method,
            self.endpoint.unwrap_or_else(|| "/".to_string()),
            self.payload,
            self.expected_status.unwrap_or_else(|| vec![200]),
            self.requires_json.unwrap_or(defaults.requires_json),
        )
    }
}

/// Ordered table of test cases. Names are unique within a suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(cases: Vec<TestCase>) -> Result<Self, SuiteError> {
        let mut names = HashSet::new();
        for case in &cases {
            if !names.insert(case.name()) {
                return Err(SuiteError::DuplicateName(case.name().to_string()));
            }
        }
        Ok(Self { cases })
    }

    /// Built-in health and login checks.
    pub fn default_suite() -> Self {
        Self {
            cases: vec![
                TestCase {
                    name: "health_check".to_string(),
                    method: HttpMethod::Get,
                    endpoint: "/health".to_string(),
                    payload: None,
                    expected_status: vec![200],
                    requires_json: false,
                },
                TestCase {
                    name: "login_requirements".to_string(),
                    method: HttpMethod::Post,
                    endpoint: "/login".to_string(),
                    payload: Some(serde_json::json!({
                        "username": "test_user",
                        "password": "wrong_password"
                    })),
                    expected_status: vec![200, 401],
                    requires_json: true,
                },
            ],
        }
    }

    /// Sample storefront suite, handy as a template for new tables.
    pub fn ecommerce_example() -> Self {
        let json = serde_json::json!([
            {"name": "product_list", "method": "GET", "endpoint": "/api/products",
             "expected_status": [200], "requires_json": true},
            {"name": "product_search", "method": "GET", "endpoint": "/api/products?q=laptop",
             "expected_status": [200], "requires_json": true},
            {"name": "cart_add_item", "method": "POST", "endpoint": "/api/cart/items",
             "payload": {"product_id": "123", "quantity": 1},
             "expected_status": [200, 201], "requires_json": true},
            {"name": "checkout", "method": "POST", "endpoint": "/api/checkout",
             "payload": {"payment_method": "credit_card"},
             "expected_status": [200, 400], "requires_json": true}
        ]);
        match Self::from_value(json) {
            Ok(suite) => suite,
            Err(_) => Self { cases: Vec::new() },
        }
    }

    /// Parse a suite from JSON text.
    ///
    /// Accepts either an array of case objects (missing `requires_json`
    /// means false) or an object keyed by case name (missing fields default
    /// to GET `/`, status 200, JSON required).
    pub fn from_json_str(input: &str) -> Result<Self, SuiteError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| SuiteError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_value(value: Value) -> Result<Self, SuiteError> {
        match value {
            Value::Array(items) => {
                let defaults = DefinitionDefaults { requires_json: false };
                let mut cases = Vec::with_capacity(items.len());
                for item in items {
                    let def: TestCaseDefinition = serde_json::from_value(item)
                        .map_err(|e| SuiteError::ParseError(e.to_string()))?;
                    let name = def.name.clone().unwrap_or_default();
                    cases.push(def.into_case(name, &defaults)?);
                }
                Self::new(cases)
            }
            Value::Object(map) => Self::from_definitions(map),
            other => Err(SuiteError::ParseError(format!(
                "expected an array or object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Build from `name -> definition` pairs in iteration order.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, SuiteError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let defaults = DefinitionDefaults { requires_json: true };
        let mut cases = Vec::new();
        for (name, body) in definitions {
            let def: TestCaseDefinition = serde_json::from_value(body)
                .map_err(|e| SuiteError::ParseError(format!("{}: {}", name, e)))?;
            cases.push(def.into_case(name, &defaults)?);
        }
        Self::new(cases)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }
}

impl<'a> IntoIterator for &'a TestSuite {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
