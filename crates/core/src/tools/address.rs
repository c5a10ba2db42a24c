use crate::domain::{NormalizedAddress, QuoteSubmission};
use crate::tools::ToolError;

/// Address normalization collaborator. Implementations must be best-effort:
/// malformed input yields a partially-filled address, not an error.
pub trait AddressNormalizer: Send + Sync {
    fn normalize(&self, submission: &QuoteSubmission) -> Result<NormalizedAddress, ToolError>;
}

/// Comma-split parsing with a small city/county lookup. Stands in for a
/// geocoding service; only the interface is contractual.
#[derive(Clone, Debug, Default)]
pub struct HeuristicAddressNormalizer;

const CITY_COUNTIES: &[(&str, &str)] = &[
    ("Los Angeles", "Los Angeles County"),
    ("San Francisco", "San Francisco County"),
    ("San Diego", "San Diego County"),
    ("Sacramento", "Sacramento County"),
    ("Fresno", "Fresno County"),
];

impl AddressNormalizer for HeuristicAddressNormalizer {
    fn normalize(&self, submission: &QuoteSubmission) -> Result<NormalizedAddress, ToolError> {
        let parts: Vec<&str> = submission.address.split(',').map(str::trim).collect();

        let (street, city, state_zip) = match parts.as_slice() {
            [street, city, state_zip, ..] => {
                (street.to_string(), city.to_string(), state_zip.to_string())
            }
            [street, city_state_zip] => {
                let city = leading_alphabetic(city_state_zip);
                (street.to_string(), city, city_state_zip.to_string())
            }
            _ => (submission.address.trim().to_string(), String::new(), String::new()),
        };

        let (state, zip_code) = split_state_zip(&state_zip);

        let (latitude, longitude) = match city.as_str() {
            "Los Angeles" => (Some(34.0522), Some(-118.2437)),
            "San Francisco" => (Some(37.7749), Some(-122.4194)),
            _ => (None, None),
        };

        let county = CITY_COUNTIES
            .iter()
            .find(|(known_city, _)| *known_city == city)
            .map(|(_, county)| county.to_string());

        Ok(NormalizedAddress {
            street_address: street,
            city,
            state,
            zip_code,
            latitude,
            longitude,
            county,
        })
    }
}

/// First run of alphabetic words, used to peel a city name off a combined
/// "City ST 12345" fragment.
fn leading_alphabetic(fragment: &str) -> String {
    let mut words = Vec::new();
    for word in fragment.split_whitespace() {
        if word.chars().all(|ch| ch.is_ascii_alphabetic()) {
            words.push(word);
        } else {
            break;
        }
    }
    // Trailing state abbreviations ("Fresno CA") are not part of the city.
    if words.len() > 1 && words.last().map_or(false, |word| word.len() == 2) {
        words.pop();
    }
    words.join(" ")
}

fn split_state_zip(fragment: &str) -> (String, String) {
    let zip = fragment
        .split_whitespace()
        .find(|token| {
            let digits = token.chars().take_while(|ch| ch.is_ascii_digit()).count();
            digits == 5 && (token.len() == 5 || (token.len() == 10 && token.as_bytes()[5] == b'-'))
        })
        .unwrap_or("")
        .to_string();

    let state = fragment
        .split_whitespace()
        .filter(|token| *token != zip)
        .filter(|token| token.chars().all(|ch| ch.is_ascii_alphabetic()))
        .last()
        .unwrap_or("")
        .to_string();

    (state, zip)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::QuoteSubmission;

    use super::{AddressNormalizer, HeuristicAddressNormalizer};

    fn submission(address: &str) -> QuoteSubmission {
        QuoteSubmission {
            applicant_name: "Test Applicant".to_string(),
            address: address.to_string(),
            property_type: "single_family".to_string(),
            coverage_amount: Decimal::new(250_000, 0),
            construction_year: None,
            square_footage: None,
            roof_type: None,
            foundation_type: None,
            notes: None,
        }
    }

    #[test]
    fn three_part_address_parses_street_city_state_zip() {
        let normalizer = HeuristicAddressNormalizer;
        let address = normalizer
            .normalize(&submission("742 Evergreen Terrace, Sacramento, CA 95814"))
            .expect("normalize");

        assert_eq!(address.street_address, "742 Evergreen Terrace");
        assert_eq!(address.city, "Sacramento");
        assert_eq!(address.state, "CA");
        assert_eq!(address.zip_code, "95814");
        assert_eq!(address.county.as_deref(), Some("Sacramento County"));
    }

    #[test]
    fn known_cities_get_mock_coordinates() {
        let normalizer = HeuristicAddressNormalizer;
        let address = normalizer
            .normalize(&submission("1 Grand Ave, Los Angeles, CA 90012"))
            .expect("normalize");

        assert_eq!(address.latitude, Some(34.0522));
        assert_eq!(address.longitude, Some(-118.2437));
        assert_eq!(address.county.as_deref(), Some("Los Angeles County"));
    }

    #[test]
    fn two_part_address_extracts_a_city_best_effort() {
        let normalizer = HeuristicAddressNormalizer;
        let address =
            normalizer.normalize(&submission("9 Pine Rd, Fresno CA 93650")).expect("normalize");

        assert_eq!(address.street_address, "9 Pine Rd");
        assert_eq!(address.city, "Fresno");
        assert_eq!(address.zip_code, "93650");
    }

    #[test]
    fn single_line_address_is_a_result_not_an_error() {
        let normalizer = HeuristicAddressNormalizer;
        let address = normalizer.normalize(&submission("rural route 7")).expect("normalize");

        assert_eq!(address.street_address, "rural route 7");
        assert!(address.city.is_empty());
        assert!(address.state.is_empty());
        assert!(address.county.is_none());
    }

    #[test]
    fn zip_plus_four_is_recognized() {
        let normalizer = HeuristicAddressNormalizer;
        let address = normalizer
            .normalize(&submission("10 Bay St, San Francisco, CA 94105-1234"))
            .expect("normalize");

        assert_eq!(address.zip_code, "94105-1234");
        assert_eq!(address.state, "CA");
    }
}
