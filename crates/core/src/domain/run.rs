use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::assessment::UwAssessment;
use crate::domain::decision::{Decision, PremiumBreakdown};
use crate::domain::enrichment::EnrichmentResult;
use crate::domain::submission::QuoteSubmission;
use crate::pipeline::stages::Stage;
use crate::pipeline::WorkflowRunError;
use crate::retrieval::RetrievalChunk;

/// Audit record of one tool invocation. The list on [`WorkflowState`] is
/// append-only: entries are never rewritten or removed by any stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub input: Value,
    pub output: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, input: Value, output: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            output,
            timestamp: Utc::now(),
            execution_time_ms: None,
        }
    }

    pub fn with_duration(mut self, elapsed_ms: u64) -> Self {
        self.execution_time_ms = Some(elapsed_ms);
        self
    }
}

/// The single mutable aggregate threaded through every pipeline stage.
/// Owned exclusively by the engine for the duration of one run; handed
/// read-only to the run store afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub submission: QuoteSubmission,
    #[serde(default)]
    pub enrichment: Option<EnrichmentResult>,
    #[serde(default)]
    pub retrieved_guidelines: Vec<RetrievalChunk>,
    #[serde(default)]
    pub assessment: Option<UwAssessment>,
    #[serde(default)]
    pub decision: Option<Decision>,
    #[serde(default)]
    pub premium_breakdown: Option<PremiumBreakdown>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub current_stage: Option<Stage>,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub additional_answers: BTreeMap<String, Value>,
    /// Caller-supplied answers are consumed at most once per run; this flag
    /// is what keeps the decide -> missing-info back-edge from cycling.
    #[serde(default)]
    pub answers_applied: bool,
    #[serde(default)]
    pub citation_guardrail_triggered: bool,
}

impl WorkflowState {
    pub fn new(submission: QuoteSubmission) -> Self {
        Self::with_answers(submission, BTreeMap::new())
    }

    pub fn with_answers(submission: QuoteSubmission, answers: BTreeMap<String, Value>) -> Self {
        Self {
            submission,
            enrichment: None,
            retrieved_guidelines: Vec::new(),
            assessment: None,
            decision: None,
            premium_breakdown: None,
            tool_calls: Vec::new(),
            current_stage: None,
            missing_info: Vec::new(),
            additional_answers: answers,
            answers_applied: false,
            citation_guardrail_triggered: false,
        }
    }

    pub fn record_tool_call(&mut self, call: ToolCall) {
        self.tool_calls.push(call);
    }

    pub fn has_tool_call(&self, tool_name: &str) -> bool {
        self.tool_calls.iter().any(|call| call.tool_name == tool_name)
    }

    pub fn has_unapplied_answers(&self) -> bool {
        !self.answers_applied && !self.additional_answers.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    WaitingForInfo,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::WaitingForInfo => "waiting_for_info",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "waiting_for_info" => Ok(Self::WaitingForInfo),
            other => Err(format!("unknown run status `{other}`")),
        }
    }
}

/// Persistence-boundary record for one run. Created once, updated in place
/// on completion or failure, never deleted by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RunStatus,
    pub workflow_state: WorkflowState,
    #[serde(default)]
    pub stage_outputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RunRecord {
    /// Converts a terminal state into its audit record. A run that ended
    /// still waiting on applicant data is `WaitingForInfo`; every other
    /// terminal state is `Completed`.
    pub fn from_state(run_id: RunId, state: WorkflowState) -> Self {
        debug_assert!(
            state.decision.as_ref().map_or(true, |decision| !decision.rationale.is_empty()),
            "decision must carry a rationale before persistence",
        );
        debug_assert!(
            state.premium_breakdown.as_ref().map_or(true, |premium| {
                premium.total_premium == premium.base_premium + premium.hazard_surcharge
            }),
            "premium total must equal base plus surcharge",
        );

        let status = if state.missing_info.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::WaitingForInfo
        };
        let now = Utc::now();
        Self {
            run_id,
            created_at: now,
            updated_at: now,
            status,
            stage_outputs: stage_outputs(&state),
            workflow_state: state,
            error_message: None,
        }
    }

    pub fn from_failure(run_id: RunId, failure: &WorkflowRunError) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            created_at: now,
            updated_at: now,
            status: RunStatus::Failed,
            stage_outputs: stage_outputs(&failure.state),
            workflow_state: (*failure.state).clone(),
            error_message: Some(failure.to_string()),
        }
    }
}

/// Per-stage output summary kept alongside the full state for quick audit
/// queries; only stages that actually produced an artifact appear.
fn stage_outputs(state: &WorkflowState) -> BTreeMap<String, Value> {
    let mut outputs = BTreeMap::new();

    outputs.insert(
        Stage::Validate.as_str().to_string(),
        json!({ "missing_info": state.missing_info, "valid": state.missing_info.is_empty() }),
    );

    if let Some(enrichment) = &state.enrichment {
        outputs.insert(
            Stage::Enrich.as_str().to_string(),
            json!({
                "county": enrichment.normalized_address.county,
                "max_risk": enrichment.hazard_scores.max_risk(),
            }),
        );
    }

    if !state.retrieved_guidelines.is_empty() {
        outputs.insert(
            Stage::RetrieveGuidelines.as_str().to_string(),
            json!({ "chunks": state.retrieved_guidelines.len() }),
        );
    }

    if let Some(assessment) = &state.assessment {
        outputs.insert(
            Stage::UwAssess.as_str().to_string(),
            json!({
                "eligibility_score": assessment.eligibility_score,
                "triggers": assessment.triggers.len(),
                "citations": assessment.citations.len(),
            }),
        );
    }

    if state.citation_guardrail_triggered {
        outputs
            .insert(Stage::CitationGuardrail.as_str().to_string(), json!({ "triggered": true }));
    }

    if let Some(premium) = &state.premium_breakdown {
        outputs.insert(
            Stage::Rate.as_str().to_string(),
            json!({ "total_premium": premium.total_premium }),
        );
    }

    if let Some(decision) = &state.decision {
        outputs.insert(
            Stage::Decide.as_str().to_string(),
            json!({ "decision": decision.decision, "rationale": decision.rationale }),
        );
    }

    outputs
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::domain::decision::{Decision, DecisionType};
    use crate::domain::submission::QuoteSubmission;

    use super::{RunId, RunRecord, RunStatus, ToolCall, WorkflowState};

    fn submission() -> QuoteSubmission {
        QuoteSubmission {
            applicant_name: "Jane Doe".to_string(),
            address: "456 Oak Ave, Fresno, CA 93650".to_string(),
            property_type: "condo".to_string(),
            coverage_amount: Decimal::new(300_000, 0),
            construction_year: Some(2001),
            square_footage: Some(1400.0),
            roof_type: None,
            foundation_type: None,
            notes: None,
        }
    }

    fn decided_state(missing_info: Vec<String>) -> WorkflowState {
        let mut state = WorkflowState::new(submission());
        state.missing_info = missing_info;
        state.decision = Some(Decision {
            decision: DecisionType::Refer,
            rationale: "Property requires manual review. Score: 0.60".to_string(),
            citations: Vec::new(),
            premium: None,
            required_questions: Vec::new(),
            next_steps: Vec::new(),
        });
        state
    }

    #[test]
    fn completed_status_is_inferred_when_nothing_is_missing() {
        let record = RunRecord::from_state(RunId::generate(), decided_state(Vec::new()));
        assert_eq!(record.status, RunStatus::Completed);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn waiting_status_is_inferred_from_open_missing_info() {
        let record = RunRecord::from_state(
            RunId::generate(),
            decided_state(vec!["construction_year".to_string()]),
        );
        assert_eq!(record.status, RunStatus::WaitingForInfo);
    }

    #[test]
    fn stage_outputs_cover_only_populated_stages() {
        let record = RunRecord::from_state(RunId::generate(), decided_state(Vec::new()));

        assert!(record.stage_outputs.contains_key("validate"));
        assert!(record.stage_outputs.contains_key("decide"));
        assert!(!record.stage_outputs.contains_key("rate"));
        assert!(!record.stage_outputs.contains_key("citation_guardrail"));
    }

    #[test]
    fn tool_call_log_is_append_only_by_construction() {
        let mut state = WorkflowState::with_answers(submission(), BTreeMap::new());
        state.record_tool_call(ToolCall::new("validate_submission", json!({}), json!({})));
        state.record_tool_call(
            ToolCall::new("hazard_score", json!({}), json!({})).with_duration(3),
        );

        assert_eq!(state.tool_calls.len(), 2);
        assert!(state.has_tool_call("hazard_score"));
        assert!(!state.has_tool_call("rating_calculation"));
        assert_eq!(state.tool_calls[1].execution_time_ms, Some(3));
    }

    #[test]
    fn run_status_round_trips_through_strings() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::WaitingForInfo,
        ] {
            let parsed: RunStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
    }
}
