use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{
    Decision, DecisionType, EnrichmentResult, PropertyProfile, QuoteSubmission, Severity, ToolCall,
    UwAssessment, UwQuestion, UwTrigger, WorkflowState,
};
use crate::pipeline::stages::Stage;
use crate::retrieval::{GuidelineRetriever, RetrievalError, DEFAULT_TOP_K};
use crate::tools::{
    AddressNormalizer, CountyHazardScorer, DeterministicRatingEngine, HazardScorer,
    HeuristicAddressNormalizer, RatingEngine, RatingInput, ToolError, RATING_REFERENCE_YEAR,
};

pub const MAX_COVERAGE_AMOUNT: i64 = 10_000_000;
pub const MIN_CONSTRUCTION_YEAR: i32 = 1800;

const ELIGIBLE_PROPERTY_TYPES: [&str; 3] = ["single_family", "condo", "townhouse"];
const CITATION_KEYWORDS: [&str; 4] = ["risk", "requirement", "eligible", "standard"];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("invariant violation: {0}")]
    Invariant(String),
    #[error("stage budget exhausted after {steps} transitions")]
    StageBudgetExhausted { steps: usize },
}

/// A collaborator failure inside one stage. Carries the state back out so
/// the audit trail up to the failure survives for persistence.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: EngineError,
    pub state: Box<WorkflowState>,
}

impl StageFailure {
    fn at(stage: Stage, error: EngineError, state: WorkflowState) -> Self {
        Self { stage, error, state: Box::new(state) }
    }
}

pub type StageResult = Result<WorkflowState, StageFailure>;

/// The pipeline's stage handlers over their collaborator seams. Each
/// handler takes ownership of the state, mutates only its own fields, and
/// returns it; no handler reads a field an earlier stage has not populated.
pub struct UnderwritingNodes<A, H, R, G> {
    address: A,
    hazard: H,
    rating: R,
    retriever: G,
    top_k: usize,
}

impl<G> UnderwritingNodes<HeuristicAddressNormalizer, CountyHazardScorer, DeterministicRatingEngine, G>
where
    G: GuidelineRetriever,
{
    /// Default toolset: deterministic placeholder collaborators around the
    /// given retriever.
    pub fn with_defaults(retriever: G) -> Self {
        Self::new(
            HeuristicAddressNormalizer,
            CountyHazardScorer,
            DeterministicRatingEngine::default(),
            retriever,
            DEFAULT_TOP_K,
        )
    }
}

impl<A, H, R, G> UnderwritingNodes<A, H, R, G>
where
    A: AddressNormalizer,
    H: HazardScorer,
    R: RatingEngine,
    G: GuidelineRetriever,
{
    pub fn new(address: A, hazard: H, rating: R, retriever: G, top_k: usize) -> Self {
        Self { address, hazard, rating, retriever, top_k: top_k.max(1) }
    }

    pub fn execute(&self, stage: Stage, state: WorkflowState) -> StageResult {
        match stage {
            Stage::Validate => Ok(self.validate(state)),
            Stage::Enrich => self.enrich(state),
            Stage::RetrieveGuidelines => self.retrieve_guidelines(state),
            Stage::UwAssess => Ok(self.assess(state)),
            Stage::CitationGuardrail => Ok(self.citation_guardrail(state)),
            Stage::Rate => self.rate(state),
            Stage::HandleMissingInfo => Ok(self.handle_missing_info(state)),
            Stage::Decide => Ok(self.decide(state)),
        }
    }

    fn validate(&self, mut state: WorkflowState) -> WorkflowState {
        let missing = validate_submission(&state.submission);

        state.record_tool_call(ToolCall::new(
            "validate_submission",
            json!({ "submission": snapshot(&state.submission) }),
            json!({ "missing_info": missing, "valid": missing.is_empty() }),
        ));
        state.missing_info = missing;
        state.current_stage = Some(Stage::Validate);
        state
    }

    fn enrich(&self, mut state: WorkflowState) -> StageResult {
        let started = Instant::now();
        let normalized = match self.address.normalize(&state.submission) {
            Ok(normalized) => normalized,
            Err(error) => return Err(StageFailure::at(Stage::Enrich, error.into(), state)),
        };
        state.record_tool_call(
            ToolCall::new(
                "address_normalize",
                json!({ "address": state.submission.address }),
                json!({ "normalized_address": snapshot(&normalized) }),
            )
            .with_duration(elapsed_ms(started)),
        );

        let started = Instant::now();
        let hazard_scores = match self.hazard.score(&normalized) {
            Ok(scores) => scores,
            Err(error) => return Err(StageFailure::at(Stage::Enrich, error.into(), state)),
        };
        state.record_tool_call(
            ToolCall::new(
                "hazard_score",
                json!({ "address": snapshot(&normalized) }),
                json!({ "hazard_scores": snapshot(&hazard_scores) }),
            )
            .with_duration(elapsed_ms(started)),
        );

        state.enrichment = Some(EnrichmentResult {
            normalized_address: normalized,
            hazard_scores,
            property: PropertyProfile::from(&state.submission),
        });
        state.current_stage = Some(Stage::Enrich);
        Ok(state)
    }

    fn retrieve_guidelines(&self, mut state: WorkflowState) -> StageResult {
        let query = build_retrieval_query(&state.submission, state.enrichment.as_ref());

        let started = Instant::now();
        let chunks = match self.retriever.query(&query, self.top_k) {
            Ok(chunks) => chunks,
            Err(error) => {
                return Err(StageFailure::at(Stage::RetrieveGuidelines, error.into(), state))
            }
        };
        state.record_tool_call(
            ToolCall::new(
                "guideline_retrieval",
                json!({ "query": query, "top_k": self.top_k }),
                json!({ "retrieved_chunks": snapshot(&chunks) }),
            )
            .with_duration(elapsed_ms(started)),
        );

        state.retrieved_guidelines = chunks;
        state.current_stage = Some(Stage::RetrieveGuidelines);
        Ok(state)
    }

    fn assess(&self, mut state: WorkflowState) -> WorkflowState {
        let submission = &state.submission;
        let mut eligibility_score = 0.8f64;
        let mut triggers = Vec::new();
        let mut required_questions = Vec::new();

        if !ELIGIBLE_PROPERTY_TYPES.contains(&submission.property_type.as_str()) {
            triggers.push(UwTrigger {
                trigger_type: "property_type".to_string(),
                description: format!(
                    "Property type {} may not be eligible",
                    submission.property_type
                ),
                severity: Severity::High,
                requires_action: true,
            });
            eligibility_score -= 0.3;
        }

        if submission.construction_year.map_or(false, |year| year < 1940) {
            triggers.push(UwTrigger {
                trigger_type: "construction_age".to_string(),
                description: "Property constructed before 1940 requires additional review"
                    .to_string(),
                severity: Severity::Medium,
                requires_action: true,
            });
            eligibility_score -= 0.2;
            required_questions.push(UwQuestion::text_question(
                "construction_updates",
                "What updates have been made to electrical, plumbing, and roofing systems?",
            ));
        }

        if let Some(enrichment) = &state.enrichment {
            let scores = &enrichment.hazard_scores;
            if scores.wildfire_risk > 0.7 {
                triggers.push(UwTrigger {
                    trigger_type: "wildfire_risk".to_string(),
                    description: "High wildfire risk detected".to_string(),
                    severity: Severity::High,
                    requires_action: true,
                });
                eligibility_score -= 0.3;
                required_questions.push(UwQuestion::text_question(
                    "wildfire_mitigation",
                    "What wildfire mitigation measures are in place?",
                ));
            } else if scores.wildfire_risk > 0.5 {
                triggers.push(UwTrigger {
                    trigger_type: "wildfire_risk".to_string(),
                    description: "Moderate wildfire risk detected".to_string(),
                    severity: Severity::Medium,
                    requires_action: false,
                });
                eligibility_score -= 0.1;
            }

            if scores.flood_risk > 0.7 {
                triggers.push(UwTrigger {
                    trigger_type: "flood_risk".to_string(),
                    description: "High flood risk detected".to_string(),
                    severity: Severity::High,
                    requires_action: true,
                });
                eligibility_score -= 0.3;
                required_questions.push(UwQuestion::choice_question(
                    "elevation_certificate",
                    "Is an elevation certificate available?",
                    vec!["Yes".to_string(), "No".to_string(), "Unknown".to_string()],
                ));
            }
        }

        // Citations keep appearance order and duplicates.
        let citations: Vec<String> = state
            .retrieved_guidelines
            .iter()
            .filter(|chunk| {
                let text = chunk.text.to_lowercase();
                CITATION_KEYWORDS.iter().any(|keyword| text.contains(keyword))
            })
            .map(|chunk| chunk.citation_key())
            .collect();

        let eligibility_score = eligibility_score.clamp(0.0, 1.0);

        let mut reasoning_parts = Vec::new();
        if triggers.is_empty() {
            reasoning_parts.push("No significant risk factors identified".to_string());
        } else {
            reasoning_parts.push(format!("Identified {} risk factors:", triggers.len()));
            for trigger in &triggers {
                reasoning_parts.push(format!("- {}", trigger.description));
            }
        }
        reasoning_parts.push(format!("Eligibility score: {eligibility_score:.2}"));

        let confidence = if citations.is_empty() { 0.6 } else { 0.85 };
        let assessment = UwAssessment {
            eligibility_score,
            triggers,
            required_questions,
            reasoning: reasoning_parts.join("; "),
            citations,
            confidence,
        };

        state.record_tool_call(ToolCall::new(
            "underwriting_assessment",
            json!({
                "submission": snapshot(&state.submission),
                "enrichment": snapshot(&state.enrichment),
                "guidelines_count": state.retrieved_guidelines.len(),
            }),
            json!({ "assessment": snapshot(&assessment) }),
        ));
        state.assessment = Some(assessment);
        state.current_stage = Some(Stage::UwAssess);
        state
    }

    /// Structural invariant: no non-REFER decision may come out of an
    /// assessment with zero citations. This is the one node allowed to set
    /// the terminal decision before `decide` runs.
    fn citation_guardrail(&self, mut state: WorkflowState) -> WorkflowState {
        let citations_missing =
            state.assessment.as_ref().map_or(true, |assessment| assessment.citations.is_empty());

        if citations_missing {
            let required_questions = state
                .assessment
                .as_ref()
                .map(|assessment| assessment.required_questions.clone())
                .unwrap_or_default();
            let decision = Decision {
                decision: DecisionType::Refer,
                rationale:
                    "Insufficient evidence: underwriting assessment lacks citations from the guidelines"
                        .to_string(),
                citations: Vec::new(),
                premium: None,
                required_questions,
                next_steps: vec![
                    "Manual underwriter review required".to_string(),
                    "Guideline citations needed for decision".to_string(),
                ],
            };

            state.record_tool_call(ToolCall::new(
                "citation_guardrail",
                json!({
                    "assessment_citations": state
                        .assessment
                        .as_ref()
                        .map(|assessment| assessment.citations.clone())
                        .unwrap_or_default(),
                }),
                json!({ "guardrail_triggered": true, "forced_decision": snapshot(&decision) }),
            ));
            state.decision = Some(decision);
            state.citation_guardrail_triggered = true;
        } else {
            state.citation_guardrail_triggered = false;
        }

        state.current_stage = Some(Stage::CitationGuardrail);
        state
    }

    fn rate(&self, mut state: WorkflowState) -> StageResult {
        let hazard_scores = match &state.enrichment {
            Some(enrichment) => enrichment.hazard_scores,
            None => {
                debug_assert!(false, "rate stage requires enrichment");
                return Err(StageFailure::at(
                    Stage::Rate,
                    EngineError::Invariant("rate stage requires enrichment".to_string()),
                    state,
                ));
            }
        };

        let input = RatingInput {
            coverage_amount: state.submission.coverage_amount,
            property_type: state.submission.property_type.clone(),
            hazard_scores,
            construction_year: state.submission.construction_year,
        };

        let started = Instant::now();
        let premium = match self.rating.price(&input) {
            Ok(premium) => premium,
            Err(error) => return Err(StageFailure::at(Stage::Rate, error.into(), state)),
        };
        state.record_tool_call(
            ToolCall::new(
                "rating_calculation",
                json!({
                    "coverage_amount": input.coverage_amount,
                    "property_type": input.property_type,
                    "hazard_scores": snapshot(&input.hazard_scores),
                    "construction_year": input.construction_year,
                }),
                json!({ "premium_breakdown": snapshot(&premium) }),
            )
            .with_duration(elapsed_ms(started)),
        );

        state.premium_breakdown = Some(premium);
        state.current_stage = Some(Stage::Rate);
        Ok(state)
    }

    fn handle_missing_info(&self, mut state: WorkflowState) -> WorkflowState {
        if state.has_unapplied_answers() {
            let answers = state.additional_answers.clone();
            let mut applied = Vec::new();
            let mut ignored = Vec::new();
            for (field, value) in &answers {
                if state.submission.apply_answer(field, value) {
                    applied.push(field.clone());
                } else {
                    ignored.push(field.clone());
                }
            }

            state.missing_info.clear();
            state.answers_applied = true;
            state.record_tool_call(ToolCall::new(
                "process_additional_answers",
                json!({ "additional_answers": answers }),
                json!({
                    "updated_submission": snapshot(&state.submission),
                    "applied": applied,
                    "ignored": ignored,
                }),
            ));
        } else {
            let questions: Vec<UwQuestion> =
                state.missing_info.iter().map(|entry| UwQuestion::for_missing_field(entry)).collect();
            let decision = Decision {
                decision: DecisionType::Refer,
                rationale: format!(
                    "Additional information required: {}",
                    state.missing_info.join(", ")
                ),
                citations: Vec::new(),
                premium: None,
                required_questions: questions.clone(),
                next_steps: vec!["Provide missing information and resubmit".to_string()],
            };

            state.record_tool_call(ToolCall::new(
                "generate_missing_info_questions",
                json!({ "missing_info": state.missing_info }),
                json!({ "questions": snapshot(&questions) }),
            ));
            state.decision = Some(decision);
        }

        state.current_stage = Some(Stage::HandleMissingInfo);
        state
    }

    fn decide(&self, mut state: WorkflowState) -> WorkflowState {
        // Rule 1: the guardrail's decision passes through unchanged.
        if state.citation_guardrail_triggered {
            if let Some(existing) = &state.decision {
                state.record_tool_call(ToolCall::new(
                    "decision_making",
                    json!({ "citation_guardrail_triggered": true }),
                    json!({ "decision": snapshot(existing), "passthrough": true }),
                ));
                state.current_stage = Some(Stage::Decide);
                return state;
            }
        }

        let decision = if !state.missing_info.is_empty() {
            Decision {
                decision: DecisionType::Refer,
                rationale: format!(
                    "Missing required information: {}",
                    state.missing_info.join(", ")
                ),
                citations: Vec::new(),
                premium: None,
                required_questions: state
                    .missing_info
                    .iter()
                    .map(|entry| UwQuestion::for_missing_field(entry))
                    .collect(),
                next_steps: vec!["Provide missing information and resubmit".to_string()],
            }
        } else if let Some(assessment) = &state.assessment {
            let score = assessment.eligibility_score;
            if score >= 0.7 && !assessment.has_high_severity_trigger() {
                Decision {
                    decision: DecisionType::Accept,
                    rationale: format!("Property meets eligibility criteria. Score: {score:.2}"),
                    citations: assessment.citations.clone(),
                    premium: state.premium_breakdown.clone(),
                    required_questions: Vec::new(),
                    next_steps: vec![
                        "Policy issuance".to_string(),
                        "Payment collection".to_string(),
                        "Policy document delivery".to_string(),
                    ],
                }
            } else if score < 0.5 || assessment.has_high_severity_trigger() {
                Decision {
                    decision: DecisionType::Decline,
                    rationale: format!(
                        "Property does not meet eligibility requirements. Score: {score:.2}"
                    ),
                    citations: assessment.citations.clone(),
                    premium: None,
                    required_questions: Vec::new(),
                    next_steps: vec![
                        "Notify applicant of decline".to_string(),
                        "Provide specific reasons".to_string(),
                        "Suggest improvements for future consideration".to_string(),
                    ],
                }
            } else {
                Decision {
                    decision: DecisionType::Refer,
                    rationale: format!("Property requires manual review. Score: {score:.2}"),
                    citations: assessment.citations.clone(),
                    premium: None,
                    required_questions: assessment.required_questions.clone(),
                    next_steps: vec![
                        "Underwriter manual review".to_string(),
                        "Additional documentation may be required".to_string(),
                    ],
                }
            }
        } else {
            debug_assert!(false, "decide stage requires an assessment or missing info");
            Decision {
                decision: DecisionType::Refer,
                rationale: "Underwriting assessment unavailable; manual review required"
                    .to_string(),
                citations: Vec::new(),
                premium: None,
                required_questions: Vec::new(),
                next_steps: vec!["Underwriter manual review".to_string()],
            }
        };

        state.record_tool_call(ToolCall::new(
            "decision_making",
            json!({
                "eligibility_score": state
                    .assessment
                    .as_ref()
                    .map(|assessment| assessment.eligibility_score),
                "triggers": snapshot(
                    &state
                        .assessment
                        .as_ref()
                        .map(|assessment| assessment.triggers.clone())
                        .unwrap_or_default(),
                ),
                "missing_info": state.missing_info,
            }),
            json!({ "decision": snapshot(&decision) }),
        ));
        state.decision = Some(decision);
        state.current_stage = Some(Stage::Decide);
        state
    }
}

/// The validation rules, in order, appending rather than short-circuiting.
/// Pure and idempotent: re-validating an already-valid submission always
/// yields an empty list.
pub fn validate_submission(submission: &QuoteSubmission) -> Vec<String> {
    let mut missing = Vec::new();

    if submission.applicant_name.trim().is_empty() {
        missing.push("applicant_name".to_string());
    }
    if submission.address.trim().is_empty() {
        missing.push("address".to_string());
    }
    if submission.property_type.trim().is_empty() {
        missing.push("property_type".to_string());
    }
    if submission.coverage_amount <= Decimal::ZERO {
        missing.push("coverage_amount".to_string());
    }
    if submission.coverage_amount > Decimal::new(MAX_COVERAGE_AMOUNT, 0) {
        missing.push("coverage_amount exceeds maximum limit".to_string());
    }

    match submission.construction_year {
        Some(year) if year > RATING_REFERENCE_YEAR => {
            missing.push("construction_year cannot be in the future".to_string());
        }
        Some(year) if year < MIN_CONSTRUCTION_YEAR => {
            missing.push("construction_year seems too old".to_string());
        }
        Some(_) => {}
        None => missing.push("construction_year".to_string()),
    }

    if submission.square_footage.is_none() {
        missing.push("square_footage".to_string());
    }

    missing
}

/// Natural-language retrieval query assembled from the submission and its
/// enrichment, per the guideline lookup contract.
pub fn build_retrieval_query(
    submission: &QuoteSubmission,
    enrichment: Option<&EnrichmentResult>,
) -> String {
    let mut parts = vec![format!("property type {}", submission.property_type)];

    if let Some(enrichment) = enrichment {
        let scores = &enrichment.hazard_scores;
        if scores.wildfire_risk > 0.5 {
            parts.push("wildfire risk assessment".to_string());
        }
        if scores.flood_risk > 0.5 {
            parts.push("flood risk evaluation".to_string());
        }
        if scores.wind_risk > 0.5 {
            parts.push("wind damage risk".to_string());
        }
        if scores.earthquake_risk > 0.5 {
            parts.push("earthquake hazard".to_string());
        }
    }

    if let Some(year) = submission.construction_year {
        if year < 1940 {
            parts.push("old construction requirements".to_string());
        } else if year < 1970 {
            parts.push("older building standards".to_string());
        }
    }

    if let Some(roof_type) = &submission.roof_type {
        parts.push(format!("roof {roof_type}"));
    }
    if let Some(foundation_type) = &submission.foundation_type {
        parts.push(format!("foundation {foundation_type}"));
    }

    parts.join(" ")
}

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
