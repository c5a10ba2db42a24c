use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::domain::{QuoteSubmission, WorkflowState};
use crate::pipeline::nodes::{EngineError, UnderwritingNodes};
use crate::pipeline::stages::{next_stage, Stage, WorkflowMode};
use crate::retrieval::GuidelineRetriever;
use crate::tools::{AddressNormalizer, HazardScorer, RatingEngine};

/// Upper bound on stage transitions per run. The interactive graph makes at
/// most two pipeline passes, so hitting this means mis-wired routing.
pub const MAX_STAGE_TRANSITIONS: usize = 32;

/// A run that failed on infrastructure, distinct from a normal terminal
/// state. Business-rule outcomes (REFER / DECLINE) are never errors.
#[derive(Debug, Error)]
#[error("workflow failed at stage `{stage}`: {source}")]
pub struct WorkflowRunError {
    pub stage: Stage,
    #[source]
    pub source: EngineError,
    /// State as of the failure; fields populated after the failing stage
    /// must not be trusted, but the audit trail up to it is intact.
    pub state: Box<WorkflowState>,
}

/// The underwriting pipeline driver: dispatches stage handlers and follows
/// the pure branch function until a terminal decision or a failure.
pub struct UnderwritingEngine<A, H, R, G> {
    mode: WorkflowMode,
    nodes: UnderwritingNodes<A, H, R, G>,
}

impl<A, H, R, G> UnderwritingEngine<A, H, R, G>
where
    A: AddressNormalizer,
    H: HazardScorer,
    R: RatingEngine,
    G: GuidelineRetriever,
{
    pub fn new(mode: WorkflowMode, nodes: UnderwritingNodes<A, H, R, G>) -> Self {
        Self { mode, nodes }
    }

    /// Basic variant: missing fields route straight to a REFER decision.
    pub fn basic(nodes: UnderwritingNodes<A, H, R, G>) -> Self {
        Self::new(WorkflowMode::Basic, nodes)
    }

    /// Interactive variant: adds the missing-info handler and its
    /// back-edges.
    pub fn interactive(nodes: UnderwritingNodes<A, H, R, G>) -> Self {
        Self::new(WorkflowMode::Interactive, nodes)
    }

    pub fn mode(&self) -> WorkflowMode {
        self.mode
    }

    /// Runs one submission (or one missing-info round) to a terminal state.
    /// The engine is stateless between invocations: resuming after a pause
    /// is the caller re-invoking with the same submission plus answers.
    pub fn run(
        &self,
        submission: QuoteSubmission,
        answers: Option<BTreeMap<String, Value>>,
    ) -> Result<WorkflowState, WorkflowRunError> {
        let mut state = match answers {
            Some(answers) => WorkflowState::with_answers(submission, answers),
            None => WorkflowState::new(submission),
        };
        let mut stage = Stage::Validate;

        for _ in 0..MAX_STAGE_TRANSITIONS {
            state = self.nodes.execute(stage, state).map_err(|failure| WorkflowRunError {
                stage: failure.stage,
                source: failure.error,
                state: failure.state,
            })?;

            match next_stage(self.mode, stage, &state) {
                Some(next) => stage = next,
                None => return Ok(state),
            }
        }

        Err(WorkflowRunError {
            stage,
            source: EngineError::StageBudgetExhausted { steps: MAX_STAGE_TRANSITIONS },
            state: Box::new(state),
        })
    }
}
