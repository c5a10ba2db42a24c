use serde::{Deserialize, Serialize};

use crate::domain::{DecisionType, WorkflowState};

/// Stage identifiers of the underwriting pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Enrich,
    RetrieveGuidelines,
    UwAssess,
    CitationGuardrail,
    Rate,
    HandleMissingInfo,
    Decide,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Enrich => "enrich",
            Self::RetrieveGuidelines => "retrieve_guidelines",
            Self::UwAssess => "uw_assess",
            Self::CitationGuardrail => "citation_guardrail",
            Self::Rate => "rate",
            Self::HandleMissingInfo => "handle_missing_info",
            Self::Decide => "decide",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two engine variants: `Basic` routes missing fields straight to a
/// REFER decision; `Interactive` adds the missing-info handler and its
/// back-edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    Basic,
    Interactive,
}

impl std::str::FromStr for WorkflowMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "interactive" => Ok(Self::Interactive),
            other => Err(format!("unsupported workflow mode `{other}` (expected basic|interactive)")),
        }
    }
}

/// Pure branch function: the next stage given the current stage and state,
/// or `None` when the run is terminal. All conditional edges of the
/// pipeline live here so they are testable without the engine.
pub fn next_stage(mode: WorkflowMode, current: Stage, state: &WorkflowState) -> Option<Stage> {
    match current {
        Stage::Validate => {
            if state.missing_info.is_empty() {
                Some(Stage::Enrich)
            } else {
                match mode {
                    WorkflowMode::Basic => Some(Stage::Decide),
                    WorkflowMode::Interactive => Some(Stage::HandleMissingInfo),
                }
            }
        }
        Stage::HandleMissingInfo => {
            if state.missing_info.is_empty() {
                Some(Stage::Enrich)
            } else {
                Some(Stage::Decide)
            }
        }
        Stage::Enrich => Some(Stage::RetrieveGuidelines),
        Stage::RetrieveGuidelines => Some(Stage::UwAssess),
        Stage::UwAssess => Some(Stage::CitationGuardrail),
        Stage::CitationGuardrail => {
            // Rating is pointless once the run is forced to REFER.
            if state.citation_guardrail_triggered {
                Some(Stage::Decide)
            } else {
                Some(Stage::Rate)
            }
        }
        Stage::Rate => Some(Stage::Decide),
        Stage::Decide => {
            if mode == WorkflowMode::Interactive && refer_awaiting_answers(state) {
                Some(Stage::HandleMissingInfo)
            } else {
                None
            }
        }
    }
}

/// The decide -> missing-info back-edge is taken only while the caller's
/// answers are still unapplied; answers are consumed once, which bounds
/// every run at two pipeline passes.
fn refer_awaiting_answers(state: &WorkflowState) -> bool {
    let refer_with_questions = state.decision.as_ref().map_or(false, |decision| {
        decision.decision == DecisionType::Refer && !decision.required_questions.is_empty()
    });
    refer_with_questions && state.has_unapplied_answers()
}
