//! The underwriting workflow state machine: stage identifiers and branch
//! functions, the node handlers, and the engine that drives one run to a
//! terminal decision.

pub mod engine;
pub mod nodes;
pub mod stages;

pub use engine::{UnderwritingEngine, WorkflowRunError, MAX_STAGE_TRANSITIONS};
pub use nodes::{
    build_retrieval_query, validate_submission, EngineError, StageFailure, StageResult,
    UnderwritingNodes,
};
pub use stages::{next_stage, Stage, WorkflowMode};
