use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::assessment::UwQuestion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    Accept,
    Refer,
    Decline,
}

/// Premium components rounded to two decimal places; the total is always
/// the exact sum of the rounded base and surcharge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    pub base_premium: Decimal,
    pub hazard_surcharge: Decimal,
    pub total_premium: Decimal,
    pub rating_factors: BTreeMap<String, Decimal>,
}

/// Terminal artifact of a run (or of one missing-info round).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionType,
    pub rationale: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub premium: Option<PremiumBreakdown>,
    #[serde(default)]
    pub required_questions: Vec<UwQuestion>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::DecisionType;

    #[test]
    fn decision_type_uses_upper_case_wire_names() {
        assert_eq!(serde_json::to_string(&DecisionType::Accept).expect("serialize"), "\"ACCEPT\"");
        assert_eq!(serde_json::to_string(&DecisionType::Refer).expect("serialize"), "\"REFER\"");
        assert_eq!(
            serde_json::from_str::<DecisionType>("\"DECLINE\"").expect("deserialize"),
            DecisionType::Decline
        );
    }
}
