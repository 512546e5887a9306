use crate::relay::{RelayResult, RespondentRecord};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

// Field names and locators of the target ballot form.
const FIELD_EMAIL: &str = "email";
const FIELD_FIRST_NAME: &str = "firstname";
const FIELD_LAST_NAME: &str = "lastname";
const FIELD_CAMPUS: &str = "orgname";
const FIELD_INSTITUTIONAL_ID: &str = "custom1";
const SUBMIT_BUTTON: &str = "input[type='submit']";
const CONFIRM_BUTTON: &str = "[name='act_confirm']";
const RESULT_PANE: &str = "main";

/// The validated payload submitted into the ballot form. Stored whole in the
/// succeeded ledger.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotPayload {
    pub email: String,
    pub zid: String,
    pub first_name: String,
    pub last_name: String,
    pub campus: String,
}

impl BallotPayload {
    /// Builds the payload from an accepted record, with the id and the email
    /// in their normalized lower-case form.
    pub fn new(record: &RespondentRecord, campus: &str) -> BallotPayload {
        BallotPayload {
            email: record.email.to_lowercase(),
            zid: record.institutional_id.to_lowercase(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            campus: campus.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FailureReason {
    /// The post-confirmation page did not carry the expected success phrase.
    AssertionMismatch,
    /// The automation layer itself failed: timeout, missing element, dead
    /// browser.
    Exception,
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::AssertionMismatch => "assertion_mismatch",
            FailureReason::Exception => "exception",
        }
    }
}

/// The terminal state of one submission attempt.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SubmissionOutcome {
    /// The ballot system already holds this record. Not an error.
    AlreadyRegistered,
    Succeeded,
    Failed(FailureReason),
}

/// Everything the driver needs to know about the target form.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FormTarget {
    pub url: String,
    /// Fixed blocking wait after each navigation or submission before the
    /// page content is inspected.
    pub settle: Duration,
    pub already_registered_marker: String,
    pub success_phrase: String,
}

/// One isolated automation session over the ballot form. The core only
/// depends on this capability surface, so the backend can be swapped out
/// without touching the pipeline.
pub trait FormSession {
    fn open(&mut self, url: &str) -> RelayResult<()>;
    /// Fills the form field with the given name attribute.
    fn fill(&mut self, field_name: &str, value: &str) -> RelayResult<()>;
    fn click(&mut self, selector: &str) -> RelayResult<()>;
    fn read_text(&mut self, selector: &str) -> RelayResult<String>;
    /// Releases the session and whatever storage it acquired.
    fn close(self);
}

pub trait SessionFactory {
    type Session: FormSession;
    fn open_session(&self) -> RelayResult<Self::Session>;
}

/// Drives one payload through the ballot form to a terminal outcome.
///
/// Each attempt gets its own isolated session, and the session is released
/// on every terminal path, including unexpected automation errors. Errors
/// never propagate out of here: one record's failure must not abort the
/// batch.
pub fn submit_registration<F: SessionFactory>(
    factory: &F,
    form: &FormTarget,
    payload: &BallotPayload,
) -> SubmissionOutcome {
    let mut session = match factory.open_session() {
        Ok(session) => session,
        Err(e) => {
            warn!("could not acquire a form session for {}: {}", payload.zid, e);
            return SubmissionOutcome::Failed(FailureReason::Exception);
        }
    };
    let outcome = match drive(&mut session, form, payload) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("submission attempt for {} errored: {}", payload.zid, e);
            SubmissionOutcome::Failed(FailureReason::Exception)
        }
    };
    session.close();
    outcome
}

// The per-attempt state machine: FormLoaded -> Submitted -> Confirmed.
fn drive<S: FormSession>(
    session: &mut S,
    form: &FormTarget,
    payload: &BallotPayload,
) -> RelayResult<SubmissionOutcome> {
    session.open(&form.url)?;
    thread::sleep(form.settle);

    session.fill(FIELD_EMAIL, &payload.email)?;
    session.fill(FIELD_FIRST_NAME, &payload.first_name)?;
    session.fill(FIELD_LAST_NAME, &payload.last_name)?;
    session.fill(FIELD_CAMPUS, &payload.campus)?;
    session.fill(FIELD_INSTITUTIONAL_ID, &payload.zid)?;
    session.click(SUBMIT_BUTTON)?;
    thread::sleep(form.settle);

    let text = session.read_text(RESULT_PANE)?;
    debug!("post-submit page text: {:?}", text);
    if text.contains(&form.already_registered_marker) {
        return Ok(SubmissionOutcome::AlreadyRegistered);
    }

    session.click(CONFIRM_BUTTON)?;
    thread::sleep(form.settle);

    let text = session.read_text(RESULT_PANE)?;
    debug!("post-confirm page text: {:?}", text);
    if text.contains(&form.success_phrase) {
        Ok(SubmissionOutcome::Succeeded)
    } else {
        Ok(SubmissionOutcome::Failed(FailureReason::AssertionMismatch))
    }
}
