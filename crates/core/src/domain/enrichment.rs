use serde::{Deserialize, Serialize};

use crate::domain::submission::QuoteSubmission;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub county: Option<String>,
}

/// Four independent risk fractions, each always within [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HazardScores {
    pub wildfire_risk: f64,
    pub flood_risk: f64,
    pub wind_risk: f64,
    pub earthquake_risk: f64,
}

impl HazardScores {
    pub fn clamped(self) -> Self {
        Self {
            wildfire_risk: self.wildfire_risk.clamp(0.0, 1.0),
            flood_risk: self.flood_risk.clamp(0.0, 1.0),
            wind_risk: self.wind_risk.clamp(0.0, 1.0),
            earthquake_risk: self.earthquake_risk.clamp(0.0, 1.0),
        }
    }

    pub fn dimensions(&self) -> [(&'static str, f64); 4] {
        [
            ("wildfire", self.wildfire_risk),
            ("flood", self.flood_risk),
            ("wind", self.wind_risk),
            ("earthquake", self.earthquake_risk),
        ]
    }

    pub fn max_risk(&self) -> f64 {
        self.dimensions().iter().map(|(_, risk)| *risk).fold(0.0, f64::max)
    }
}

/// Snapshot of the physical-property fields carried alongside the derived
/// address and hazard data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyProfile {
    pub property_type: String,
    pub construction_year: Option<i32>,
    pub square_footage: Option<f64>,
    pub roof_type: Option<String>,
    pub foundation_type: Option<String>,
}

impl From<&QuoteSubmission> for PropertyProfile {
    fn from(submission: &QuoteSubmission) -> Self {
        Self {
            property_type: submission.property_type.clone(),
            construction_year: submission.construction_year,
            square_footage: submission.square_footage,
            roof_type: submission.roof_type.clone(),
            foundation_type: submission.foundation_type.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub normalized_address: NormalizedAddress,
    pub hazard_scores: HazardScores,
    pub property: PropertyProfile,
}
