use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Choice,
    Numeric,
}

/// A flagged underwriting concern surfaced during assessment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UwTrigger {
    pub trigger_type: String,
    pub description: String,
    pub severity: Severity,
    pub requires_action: bool,
}

/// A pending information request, generated either by validation (missing
/// required fields) or by assessment (risk-driven follow-ups).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UwQuestion {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

impl UwQuestion {
    pub fn text_question(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind: QuestionKind::Text,
            required: true,
            options: Vec::new(),
        }
    }

    pub fn choice_question(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self { id: id.into(), text: text.into(), kind: QuestionKind::Choice, required: true, options }
    }

    /// Synthesizes the question for a missing-info entry. Ids stay
    /// well-formed by folding non-alphanumerics to underscores, so the
    /// entry `construction_year` becomes `missing_construction_year`.
    pub fn for_missing_field(entry: &str) -> Self {
        let slug: String = entry
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect();
        Self::text_question(
            format!("missing_{slug}"),
            format!("Please provide {}", entry.replace('_', " ")),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UwAssessment {
    /// Risk-acceptability aggregate in [0, 1]; clamped after adjustments.
    pub eligibility_score: f64,
    pub triggers: Vec<UwTrigger>,
    pub required_questions: Vec<UwQuestion>,
    pub reasoning: String,
    /// `doc_id:section` keys; duplicates preserved in appearance order.
    pub citations: Vec<String>,
    pub confidence: f64,
}

impl UwAssessment {
    pub fn has_high_severity_trigger(&self) -> bool {
        self.triggers.iter().any(|trigger| trigger.severity == Severity::High)
    }
}

#[cfg(test)]
mod tests {
    use super::{QuestionKind, Severity, UwAssessment, UwQuestion, UwTrigger};

    #[test]
    fn missing_field_question_ids_are_sanitized() {
        let plain = UwQuestion::for_missing_field("construction_year");
        assert_eq!(plain.id, "missing_construction_year");
        assert_eq!(plain.text, "Please provide construction year");
        assert_eq!(plain.kind, QuestionKind::Text);
        assert!(plain.required);

        let phrase = UwQuestion::for_missing_field("coverage_amount exceeds maximum limit");
        assert_eq!(phrase.id, "missing_coverage_amount_exceeds_maximum_limit");
    }

    #[test]
    fn high_severity_detection_scans_all_triggers() {
        let assessment = UwAssessment {
            eligibility_score: 0.5,
            triggers: vec![
                UwTrigger {
                    trigger_type: "construction_age".to_string(),
                    description: "Property constructed before 1940".to_string(),
                    severity: Severity::Medium,
                    requires_action: true,
                },
                UwTrigger {
                    trigger_type: "wildfire_risk".to_string(),
                    description: "High wildfire risk detected".to_string(),
                    severity: Severity::High,
                    requires_action: true,
                },
            ],
            required_questions: Vec::new(),
            reasoning: String::new(),
            citations: Vec::new(),
            confidence: 0.6,
        };

        assert!(assessment.has_high_severity_trigger());
    }
}
