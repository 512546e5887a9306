use log::{debug, info, warn};

use snafu::{ResultExt, Snafu};

pub mod chrome;
pub mod config_reader;
pub mod feed;
pub mod store;
pub mod submit;
pub mod validate;

use crate::relay::config_reader::{ColumnMap, RelayConfig};
use crate::relay::feed::{RawRow, ResponseFeed};
use crate::relay::store::{FailedEntry, JsonLedger, SeenSet};
use crate::relay::submit::{
    submit_registration, BallotPayload, SessionFactory, SubmissionOutcome,
};
use crate::relay::validate::{validate, ValidationOutcome};

#[derive(Debug, Snafu)]
pub enum RelayError {
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error serializing JSON content"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error fetching the response feed at {url}"))]
    FetchingFeed { source: reqwest::Error, url: String },
    #[snafu(display("The response feed at {url} returned status {status}"))]
    FeedStatus { status: u16, url: String },
    #[snafu(display("Error opening the feed workbook"))]
    OpeningWorkbook { source: calamine::XlsxError },
    #[snafu(display("The feed workbook has no usable sheet"))]
    EmptySheet {},
    #[snafu(display("Browser automation failure: {message}"))]
    Automation { message: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Canonical serialization of a raw feed row, used as the dedup key.
///
/// The underlying map is ordered by key, so two rows carrying the same
/// field/value pairs produce the same fingerprint no matter in which order
/// the feed returned the fields.
pub fn fingerprint(row: &RawRow) -> RelayResult<String> {
    serde_json::to_string(row).context(SerializingJsonSnafu {})
}

/// The semantic fields of one feed row, extracted by column header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RespondentRecord {
    pub email: String,
    pub institutional_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl RespondentRecord {
    /// Missing columns extract as empty strings. Those records then fail
    /// validation on their own instead of aborting the batch.
    pub fn from_row(row: &RawRow, columns: &ColumnMap) -> RespondentRecord {
        let get = |name: &str| row.get(name).cloned().unwrap_or_default();
        RespondentRecord {
            email: get(&columns.email),
            institutional_id: get(&columns.institutional_id),
            first_name: get(&columns.first_name),
            last_name: get(&columns.last_name),
        }
    }

    /// The identifier written to the failed ledger for later follow-up.
    pub fn identifier(&self) -> String {
        if self.institutional_id.is_empty() {
            self.email.clone()
        } else {
            self.institutional_id.to_lowercase()
        }
    }
}

/// Counts of what one pipeline run did, reported back to the caller.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunSummary {
    pub fetched: usize,
    pub new: usize,
    pub known: usize,
    pub rejected: usize,
    pub already_registered: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs one full ingestion pass: fetch the feed, drop the rows already seen,
/// validate the new ones and drive every accepted record through the ballot
/// form, recording every outcome.
///
/// A failure on one record never aborts the batch. The only errors that
/// propagate out of here are fatal ones: an unreachable feed or an
/// unwritable state file.
pub fn run_pipeline<F, S>(config: &RelayConfig, feed: &F, sessions: &S) -> RelayResult<RunSummary>
where
    F: ResponseFeed,
    S: SessionFactory,
{
    let rows = feed.fetch_rows()?;
    info!("fetched {} rows from the response feed", rows.len());

    let mut seen = SeenSet::load(&config.seen_set_path)?;
    let mut new_rows: Vec<RawRow> = Vec::new();
    let mut known = 0usize;
    for row in rows.iter() {
        let fp = fingerprint(row)?;
        if seen.insert(fp) {
            new_rows.push(row.clone());
        } else {
            known += 1;
        }
    }
    // Mark everything as seen and persist before attempting any submission,
    // so that a crash further down cannot lead to a duplicate ballot
    // submission on the next run.
    seen.save()?;
    info!(
        "{} new rows, {} already seen, seen set now holds {} fingerprints",
        new_rows.len(),
        known,
        seen.len()
    );

    let failed_ledger: JsonLedger<FailedEntry> = JsonLedger::new(&config.failed_ledger_path);
    let succeeded_ledger: JsonLedger<BallotPayload> =
        JsonLedger::new(&config.succeeded_ledger_path);

    let mut summary = RunSummary {
        fetched: rows.len(),
        new: new_rows.len(),
        known,
        ..RunSummary::default()
    };

    let form = config.form_target();

    for row in new_rows {
        let record = RespondentRecord::from_row(&row, &config.columns);
        debug!("processing record {:?}", record.identifier());

        match validate(&record, &config.email_domain) {
            ValidationOutcome::Rejected(reason) => {
                info!(
                    "rejecting record {}: {}",
                    record.identifier(),
                    reason.label()
                );
                failed_ledger.append(FailedEntry {
                    id: record.identifier(),
                    reason: reason.label().to_string(),
                })?;
                summary.rejected += 1;
                continue;
            }
            ValidationOutcome::Accepted => {}
        }

        let payload = BallotPayload::new(&record, &config.campus);
        match submit_registration(sessions, &form, &payload) {
            SubmissionOutcome::AlreadyRegistered => {
                // The ballot system already has this record. Terminal, but
                // not a failure: nothing to ledger.
                info!("{} is already registered with the ballot", payload.zid);
                summary.already_registered += 1;
            }
            SubmissionOutcome::Succeeded => {
                info!("{} submitted successfully", payload.zid);
                succeeded_ledger.append(payload)?;
                summary.succeeded += 1;
            }
            SubmissionOutcome::Failed(reason) => {
                warn!("{} failed to submit: {}", payload.zid, reason.label());
                failed_ledger.append(FailedEntry {
                    id: record.identifier(),
                    reason: reason.label().to_string(),
                })?;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
