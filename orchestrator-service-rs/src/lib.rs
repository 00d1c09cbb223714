//! Orchestration of one diagnostic run: execute the suite, build and
//! persist the failure log, retrieve context, diagnose, and publish.

pub mod pipeline;
pub mod publish;
pub mod stage;

pub use pipeline::{Pipeline, PipelineDeps, PipelineRunResult};
pub use publish::{collection_document, write_report, Publisher, ReportDocument};
pub use stage::PipelineStage;
