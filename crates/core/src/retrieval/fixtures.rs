//! Built-in guideline corpus, mirroring `data/guidelines/*.md`. Used for
//! seeding and for tests that need a populated store without touching the
//! filesystem.

use crate::retrieval::GuidelineDocument;

pub fn builtin_guidelines() -> Vec<GuidelineDocument> {
    vec![
        GuidelineDocument {
            doc_id: "property_eligibility".to_string(),
            version: "v1.0".to_string(),
            body: PROPERTY_ELIGIBILITY.to_string(),
        },
        GuidelineDocument {
            doc_id: "wildfire_risk".to_string(),
            version: "v1.0".to_string(),
            body: WILDFIRE_RISK.to_string(),
        },
        GuidelineDocument {
            doc_id: "catastrophe_perils".to_string(),
            version: "v1.0".to_string(),
            body: CATASTROPHE_PERILS.to_string(),
        },
        GuidelineDocument {
            doc_id: "rating_standards".to_string(),
            version: "v1.0".to_string(),
            body: RATING_STANDARDS.to_string(),
        },
    ]
}

const PROPERTY_ELIGIBILITY: &str = "\
# Eligible Property Types
Single family dwellings, condominium units, and townhouses are eligible for \
the standard homeowners program. Commercial occupancies are not eligible and \
must be referred to the commercial lines team. Mixed-use buildings require a \
field inspection before binding.

# Construction Year Requirements
Dwellings constructed before 1940 require documentation of electrical, \
plumbing, and roofing updates completed within the last 25 years. Knob and \
tube wiring is an automatic requirement for rewiring certification. Homes \
built to post-1970 building standards are acceptable without additional \
documentation.

# Coverage Limits
The maximum insurable coverage amount under the standard program is ten \
million dollars. Submissions above the program limit are not eligible for \
automated decisions and require referral to a senior underwriter.
";

const WILDFIRE_RISK: &str = "\
# Wildfire Risk Assessment
Properties with a wildfire risk score above 0.7 present severe exposure and \
require documented mitigation before binding. Brush clearance of at least \
100 feet of defensible space is the minimum requirement. Wood shake roofs in \
high wildfire zones are not eligible without a Class A fire-rated overlay.

# Mitigation Standards
Acceptable mitigation includes ember-resistant venting, defensible space \
maintained per the state standard, and a Class A fire-rated roof covering. \
A moderate wildfire risk score between 0.5 and 0.7 carries a surcharge but \
does not by itself make the property ineligible.
";

const CATASTROPHE_PERILS: &str = "\
# Flood Risk Evaluation
Structures in special flood hazard areas require an elevation certificate. \
A flood risk score above 0.7 indicates probable special-zone exposure; the \
requirement is a current elevation certificate or a declination of flood \
coverage signed by the applicant.

# Wind Damage Risk
Wind exposure is rated by county wind zone. Roof coverings older than 20 \
years in high wind zones require a roof condition certification to remain \
eligible for replacement-cost settlement.

# Earthquake Hazard
Earthquake shake risk is excluded from the base policy and rated separately. \
Raised foundations without cripple-wall bracing in high seismic zones are a \
retrofit requirement before the earthquake endorsement can be offered.
";

const RATING_STANDARDS: &str = "\
# Base Rating Standard
The base rate is applied per thousand dollars of coverage and adjusted by \
property type. New construction less than ten years old earns a discount; \
construction older than fifty years carries a surcharge reflecting loss \
experience.

# Hazard Load Requirements
Each hazard dimension contributes a surcharge proportional to its risk \
score. The combined hazard load is disclosed in the rating factors so the \
premium remains auditable. Any single peril scored above 0.7 requires the \
file to document why the risk remains eligible at the quoted premium.
";
