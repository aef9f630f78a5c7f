//! Predefined cleaning profiles.
//!
//! One profile per supported domain. Rules are declarative metadata
//! describing the intended treatment; the pipeline carries them through
//! a run and uses the profile's domain as context for text correction.

use crate::types::{CleaningProfile, Domain, Rule, RuleKind, RulePriority};
use serde_json::json;

fn profile(id: &str, name: &str, description: &str, domain: Domain, rules: Vec<Rule>) -> CleaningProfile {
    CleaningProfile {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        domain,
        rules,
    }
}

/// All built-in profiles, general-purpose first.
pub fn predefined() -> Vec<CleaningProfile> {
    use RuleKind::*;
    use RulePriority::*;

    vec![
        profile(
            "general",
            "General Purpose",
            "Standard cleaning for most datasets",
            Domain::General,
            vec![
                Rule::new(Missing, "impute", High),
                Rule::new(Outlier, "flag", Medium),
                Rule::new(Duplicate, "remove", High),
            ],
        ),
        profile(
            "finance",
            "Financial Data",
            "Optimized for financial datasets",
            Domain::Finance,
            vec![
                Rule::new(Missing, "impute", High),
                Rule::new(Outlier, "cap", High),
                Rule::new(Format, "standardize", High).with_parameter("decimals", json!(2)),
            ],
        ),
        profile(
            "healthcare",
            "Healthcare",
            "For medical and patient data",
            Domain::Healthcare,
            vec![
                Rule::new(Missing, "flag", High),
                Rule::new(Outlier, "flag", High),
                Rule::new(Duplicate, "flag", High),
            ],
        ),
        profile(
            "marketing",
            "Marketing",
            "For customer and campaign data",
            Domain::Marketing,
            vec![
                Rule::new(Missing, "impute", Medium),
                Rule::new(Duplicate, "merge", High),
                Rule::new(Format, "standardize", Medium),
            ],
        ),
        profile(
            "hr",
            "Human Resources",
            "For employee and recruitment data",
            Domain::Hr,
            vec![
                Rule::new(Missing, "flag", High),
                Rule::new(Duplicate, "flag", High),
                Rule::new(Format, "standardize", Medium),
                Rule::new(Outlier, "flag", Medium),
            ],
        ),
    ]
}

/// Look up a built-in profile by id (case-insensitive).
pub fn find(id: &str) -> Option<CleaningProfile> {
    predefined()
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

/// The profile used when none is specified.
pub fn general() -> CleaningProfile {
    predefined().swap_remove(0)
}
