pub mod assessment;
pub mod decision;
pub mod enrichment;
pub mod run;
pub mod submission;

pub use assessment::{QuestionKind, Severity, UwAssessment, UwQuestion, UwTrigger};
pub use decision::{Decision, DecisionType, PremiumBreakdown};
pub use enrichment::{EnrichmentResult, HazardScores, NormalizedAddress, PropertyProfile};
pub use run::{RunId, RunRecord, RunStatus, ToolCall, WorkflowState};
pub use submission::QuoteSubmission;
