pub mod config;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod retrieval;
pub mod tools;

pub use domain::{
    Decision, DecisionType, EnrichmentResult, HazardScores, NormalizedAddress, PremiumBreakdown,
    PropertyProfile, QuestionKind, QuoteSubmission, RunId, RunRecord, RunStatus, Severity,
    ToolCall, UwAssessment, UwQuestion, UwTrigger, WorkflowState,
};
pub use errors::{ApplicationError, InterfaceError};
pub use pipeline::{
    Stage, UnderwritingEngine, UnderwritingNodes, WorkflowMode, WorkflowRunError,
};
pub use retrieval::{
    GuidelineDocument, GuidelineRetriever, GuidelineStore, IngestSummary, RetrievalChunk,
    RetrievalError,
};
pub use tools::{
    AddressNormalizer, CountyHazardScorer, DeterministicRatingEngine, HazardScorer,
    HeuristicAddressNormalizer, RatingEngine, RatingInput, ToolError,
};
