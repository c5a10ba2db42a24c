use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::{HazardScores, PremiumBreakdown};
use crate::tools::ToolError;

/// Fixed reference year for construction-age factors and the future-year
/// validation check.
pub const RATING_REFERENCE_YEAR: i32 = 2024;

#[derive(Clone, Debug, PartialEq)]
pub struct RatingInput {
    pub coverage_amount: Decimal,
    pub property_type: String,
    pub hazard_scores: HazardScores,
    pub construction_year: Option<i32>,
}

pub trait RatingEngine: Send + Sync {
    fn price(&self, input: &RatingInput) -> Result<PremiumBreakdown, ToolError>;
}

/// Deterministic rating calculator. Stands in for actuarial tables; the
/// arithmetic is exact Decimal so the premium invariant holds bit-for-bit.
#[derive(Clone, Debug)]
pub struct DeterministicRatingEngine {
    base_rate_per_1000: Decimal,
    reference_year: i32,
}

impl Default for DeterministicRatingEngine {
    fn default() -> Self {
        Self { base_rate_per_1000: Decimal::new(250, 2), reference_year: RATING_REFERENCE_YEAR }
    }
}

impl DeterministicRatingEngine {
    pub fn new(base_rate_per_1000: Decimal, reference_year: i32) -> Self {
        Self { base_rate_per_1000, reference_year }
    }

    fn property_multiplier(property_type: &str) -> Decimal {
        match property_type {
            "single_family" => Decimal::new(10, 1),
            "condo" => Decimal::new(8, 1),
            "townhouse" => Decimal::new(9, 1),
            "commercial" => Decimal::new(15, 1),
            _ => Decimal::ONE,
        }
    }
}

const NEW_CONSTRUCTION_MAX_AGE: i32 = 10;
const OLD_CONSTRUCTION_MIN_AGE: i32 = 50;

impl RatingEngine for DeterministicRatingEngine {
    fn price(&self, input: &RatingInput) -> Result<PremiumBreakdown, ToolError> {
        let multiplier = Self::property_multiplier(&input.property_type);
        let mut base_premium =
            input.coverage_amount / Decimal::new(1000, 0) * self.base_rate_per_1000 * multiplier;

        let mut rating_factors: BTreeMap<String, Decimal> = BTreeMap::new();
        rating_factors.insert("base_rate".to_string(), self.base_rate_per_1000);
        rating_factors.insert("property_multiplier".to_string(), multiplier);

        if let Some(year) = input.construction_year {
            let age = self.reference_year - year;
            if age < NEW_CONSTRUCTION_MAX_AGE {
                let discount = Decimal::new(9, 1);
                base_premium *= discount;
                rating_factors.insert("construction_discount".to_string(), discount);
            } else if age > OLD_CONSTRUCTION_MIN_AGE {
                let surcharge = Decimal::new(12, 1);
                base_premium *= surcharge;
                rating_factors.insert("construction_surcharge".to_string(), surcharge);
            }
        }

        let scores = input.hazard_scores.clamped();
        let hazard_surcharge = hazard_component(scores.wildfire_risk, base_premium, 3)
            + hazard_component(scores.flood_risk, base_premium, 4)
            + hazard_component(scores.wind_risk, base_premium, 2)
            + hazard_component(scores.earthquake_risk, base_premium, 5);

        let hazard_load = if base_premium.is_zero() {
            Decimal::ZERO
        } else {
            (hazard_surcharge / base_premium).round_dp(4)
        };
        rating_factors.insert("hazard_load".to_string(), hazard_load);

        let base_premium = base_premium.round_dp(2);
        let hazard_surcharge = hazard_surcharge.round_dp(2);
        let total_premium = base_premium + hazard_surcharge;

        Ok(PremiumBreakdown { base_premium, hazard_surcharge, total_premium, rating_factors })
    }
}

/// One hazard dimension's surcharge: risk x base x weight, with the weight
/// expressed in tenths.
fn hazard_component(risk: f64, base_premium: Decimal, weight_tenths: i64) -> Decimal {
    let risk = Decimal::from_f64_retain(risk).unwrap_or(Decimal::ZERO);
    risk * base_premium * Decimal::new(weight_tenths, 1)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use crate::domain::HazardScores;

    use super::{DeterministicRatingEngine, RatingEngine, RatingInput};

    fn flat_scores(risk: f64) -> HazardScores {
        HazardScores {
            wildfire_risk: risk,
            flood_risk: risk,
            wind_risk: risk,
            earthquake_risk: risk,
        }
    }

    fn input(
        coverage: i64,
        property_type: &str,
        scores: HazardScores,
        year: Option<i32>,
    ) -> RatingInput {
        RatingInput {
            coverage_amount: Decimal::new(coverage, 0),
            property_type: property_type.to_string(),
            hazard_scores: scores,
            construction_year: year,
        }
    }

    #[test]
    fn base_premium_uses_rate_per_thousand_and_property_multiplier() {
        let engine = DeterministicRatingEngine::default();
        let premium = engine
            .price(&input(300_000, "single_family", flat_scores(0.0), None))
            .expect("price");

        // 300 * 2.50 * 1.0
        assert_eq!(premium.base_premium, Decimal::new(75_000, 2));
        assert_eq!(premium.hazard_surcharge, Decimal::ZERO);
        assert_eq!(premium.total_premium, premium.base_premium);
        assert_eq!(
            premium.rating_factors.get("property_multiplier"),
            Some(&Decimal::new(10, 1))
        );
    }

    #[test]
    fn condo_and_commercial_multipliers_scale_the_base() {
        let engine = DeterministicRatingEngine::default();
        let condo =
            engine.price(&input(100_000, "condo", flat_scores(0.0), None)).expect("price condo");
        let commercial = engine
            .price(&input(100_000, "commercial", flat_scores(0.0), None))
            .expect("price commercial");

        assert_eq!(condo.base_premium, Decimal::new(20_000, 2)); // 100 * 2.50 * 0.8
        assert_eq!(commercial.base_premium, Decimal::new(37_500, 2)); // 100 * 2.50 * 1.5
    }

    #[test]
    fn new_construction_earns_a_discount_factor() {
        let engine = DeterministicRatingEngine::default();
        let premium = engine
            .price(&input(200_000, "single_family", flat_scores(0.0), Some(2020)))
            .expect("price");

        // 200 * 2.50 * 1.0 * 0.9
        assert_eq!(premium.base_premium, Decimal::new(45_000, 2));
        assert_eq!(
            premium.rating_factors.get("construction_discount"),
            Some(&Decimal::new(9, 1))
        );
        assert!(!premium.rating_factors.contains_key("construction_surcharge"));
    }

    #[test]
    fn old_construction_carries_a_surcharge_factor() {
        let engine = DeterministicRatingEngine::default();
        let premium = engine
            .price(&input(200_000, "single_family", flat_scores(0.0), Some(1960)))
            .expect("price");

        // 200 * 2.50 * 1.0 * 1.2
        assert_eq!(premium.base_premium, Decimal::new(60_000, 2));
        assert_eq!(
            premium.rating_factors.get("construction_surcharge"),
            Some(&Decimal::new(12, 1))
        );
    }

    #[test]
    fn hazard_surcharge_weights_each_dimension() {
        let engine = DeterministicRatingEngine::default();
        let scores = HazardScores {
            wildfire_risk: 0.5,
            flood_risk: 0.5,
            wind_risk: 0.5,
            earthquake_risk: 0.5,
        };
        let premium =
            engine.price(&input(100_000, "single_family", scores, None)).expect("price");

        // base 250.00; surcharge = 0.5 * 250 * (0.3 + 0.4 + 0.2 + 0.5) = 175.00
        assert_eq!(premium.base_premium, Decimal::new(25_000, 2));
        assert_eq!(premium.hazard_surcharge, Decimal::new(17_500, 2));
        assert_eq!(premium.total_premium, Decimal::new(42_500, 2));
        assert_eq!(premium.rating_factors.get("hazard_load"), Some(&Decimal::new(7_000, 4)));
    }

    #[test]
    fn zero_coverage_reports_zero_hazard_load() {
        let engine = DeterministicRatingEngine::default();
        let premium =
            engine.price(&input(0, "single_family", flat_scores(0.9), None)).expect("price");

        assert_eq!(premium.total_premium, Decimal::ZERO);
        assert_eq!(premium.rating_factors.get("hazard_load"), Some(&Decimal::ZERO));
    }

    proptest! {
        #[test]
        fn total_is_always_the_sum_of_rounded_components(
            coverage in 1_000i64..5_000_000,
            property in prop_oneof![
                Just("single_family"),
                Just("condo"),
                Just("townhouse"),
                Just("commercial"),
                Just("farm"),
            ],
            wildfire in 0.0f64..1.0,
            flood in 0.0f64..1.0,
            wind in 0.0f64..1.0,
            earthquake in 0.0f64..1.0,
            year in proptest::option::of(1800i32..2024),
        ) {
            let engine = DeterministicRatingEngine::default();
            let premium = engine
                .price(&RatingInput {
                    coverage_amount: Decimal::new(coverage, 0),
                    property_type: property.to_string(),
                    hazard_scores: HazardScores {
                        wildfire_risk: wildfire,
                        flood_risk: flood,
                        wind_risk: wind,
                        earthquake_risk: earthquake,
                    },
                    construction_year: year,
                })
                .expect("price");

            prop_assert_eq!(
                premium.total_premium,
                premium.base_premium + premium.hazard_surcharge
            );
            prop_assert_eq!(premium.base_premium, premium.base_premium.round_dp(2));
            prop_assert_eq!(premium.hazard_surcharge, premium.hazard_surcharge.round_dp(2));
            prop_assert!(premium.hazard_surcharge >= Decimal::ZERO);
        }
    }
}
