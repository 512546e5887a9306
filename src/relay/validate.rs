use crate::relay::RespondentRecord;

use regex::Regex;
use std::sync::OnceLock;

/// Why a record was turned away by the validator.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RejectReason {
    InvalidId,
    InvalidEmail,
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::InvalidId => "invalid_id",
            RejectReason::InvalidEmail => "invalid_email",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(RejectReason),
}

// One letter prefix followed by exactly 7 digits, checked after lower-casing.
fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][0-9]{7}$").unwrap())
}

/// Checks a record against the institutional identity rules.
///
/// The institutional id and the email are normalized to lower case first.
/// The email must start with the normalized id and end with the
/// institutional domain suffix. Pure and deterministic, no I/O.
pub fn validate(record: &RespondentRecord, email_domain: &str) -> ValidationOutcome {
    let id = record.institutional_id.to_lowercase();
    let email = record.email.to_lowercase();

    if !id_pattern().is_match(&id) {
        return ValidationOutcome::Rejected(RejectReason::InvalidId);
    }
    if !(email.starts_with(&id) && email.ends_with(&email_domain.to_lowercase())) {
        return ValidationOutcome::Rejected(RejectReason::InvalidEmail);
    }
    ValidationOutcome::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "@ad.unsw.edu.au";

    fn record(zid: &str, email: &str) -> RespondentRecord {
        RespondentRecord {
            email: email.to_string(),
            institutional_id: zid.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn accepts_a_well_formed_record() {
        let outcome = validate(&record("z1234567", "z1234567@ad.unsw.edu.au"), DOMAIN);
        assert_eq!(outcome, ValidationOutcome::Accepted);
    }

    #[test]
    fn rejects_a_six_digit_id() {
        let outcome = validate(&record("z123456", "z123456@ad.unsw.edu.au"), DOMAIN);
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected(RejectReason::InvalidId)
        );
    }

    #[test]
    fn rejects_an_email_that_does_not_match_the_id() {
        let outcome = validate(&record("z1234567", "z1234568@ad.unsw.edu.au"), DOMAIN);
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected(RejectReason::InvalidEmail)
        );
    }

    #[test]
    fn rejects_an_email_on_the_wrong_domain() {
        let outcome = validate(&record("z1234567", "z1234567@gmail.com"), DOMAIN);
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected(RejectReason::InvalidEmail)
        );
    }

    #[test]
    fn upper_case_input_normalizes_to_the_same_outcome() {
        let outcome = validate(&record("Z1234567", "Z1234567@AD.UNSW.EDU.AU"), DOMAIN);
        assert_eq!(outcome, ValidationOutcome::Accepted);
    }

    #[test]
    fn rejects_an_empty_record() {
        let outcome = validate(&record("", ""), DOMAIN);
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected(RejectReason::InvalidId)
        );
    }
}
