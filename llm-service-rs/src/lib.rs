//! Diagnosis stage of the pipeline.
//!
//! A failed run is explained either by a chat-completion model or, when the
//! model is unavailable, by deterministic rules over the failure reason.

pub mod diagnosis;
pub mod llm_client;
pub mod prompt;
pub mod rules;


pub use diagnosis::{merge_model_output, DiagnosisOutcome, DiagnosisSource, DiagnosisStage};
pub use llm_client::{LlmClient, LlmError};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use rules::{classify, reproduction_steps, rule_based_diagnosis};
