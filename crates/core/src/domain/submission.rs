use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Applicant-provided quote request. Immutable for the lifetime of a run
/// except when missing-info answers are applied field-by-field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSubmission {
    pub applicant_name: String,
    pub address: String,
    /// Free-form; known values are `single_family`, `condo`, `townhouse`,
    /// `commercial`. Unknown values flow through and surface as triggers.
    pub property_type: String,
    pub coverage_amount: Decimal,
    #[serde(default)]
    pub construction_year: Option<i32>,
    #[serde(default)]
    pub square_footage: Option<f64>,
    #[serde(default)]
    pub roof_type: Option<String>,
    #[serde(default)]
    pub foundation_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl QuoteSubmission {
    /// Applies one follow-up answer to the named field, coercing the JSON
    /// value to the field's type. Returns false when the field is unknown
    /// or the value cannot be coerced; the submission is left untouched.
    pub fn apply_answer(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "applicant_name" => assign_string(&mut self.applicant_name, value),
            "address" => assign_string(&mut self.address, value),
            "property_type" => assign_string(&mut self.property_type, value),
            "coverage_amount" => match coerce_decimal(value) {
                Some(amount) => {
                    self.coverage_amount = amount;
                    true
                }
                None => false,
            },
            "construction_year" => match coerce_i32(value) {
                Some(year) => {
                    self.construction_year = Some(year);
                    true
                }
                None => false,
            },
            "square_footage" => match coerce_f64(value) {
                Some(area) => {
                    self.square_footage = Some(area);
                    true
                }
                None => false,
            },
            "roof_type" => assign_optional_string(&mut self.roof_type, value),
            "foundation_type" => assign_optional_string(&mut self.foundation_type, value),
            "notes" => assign_optional_string(&mut self.notes, value),
            _ => false,
        }
    }
}

fn assign_string(target: &mut String, value: &Value) -> bool {
    match value.as_str() {
        Some(text) => {
            *target = text.to_string();
            true
        }
        None => false,
    }
}

fn assign_optional_string(target: &mut Option<String>, value: &Value) -> bool {
    match value.as_str() {
        Some(text) => {
            *target = Some(text.to_string());
            true
        }
        None => false,
    }
}

fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => number.as_f64().and_then(Decimal::from_f64_retain),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|raw| i32::try_from(raw).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
