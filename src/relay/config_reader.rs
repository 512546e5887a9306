use crate::relay::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::relay::submit::FormTarget;

// The external form needs a fixed settle delay after each navigation before
// its content can be inspected.
const DEFAULT_SETTLE_DELAY_SECS: u64 = 5;
const DEFAULT_ALREADY_REGISTERED_PHRASE: &str = "already in use";

/// Maps the semantic record fields to the column headers used by the feed.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    pub email: String,
    #[serde(rename = "institutionalId")]
    pub institutional_id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

/// The complete configuration of one relay deployment, read from a JSON file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(rename = "feedUrl")]
    pub feed_url: String,
    /// Path to a file holding the bearer token for the feed, if the sheet is
    /// not public.
    #[serde(rename = "credentialsPath")]
    pub credentials_path: Option<String>,
    #[serde(rename = "seenSetPath")]
    pub seen_set_path: String,
    #[serde(rename = "failedLedgerPath")]
    pub failed_ledger_path: String,
    #[serde(rename = "succeededLedgerPath")]
    pub succeeded_ledger_path: String,
    #[serde(rename = "targetFormUrl")]
    pub target_form_url: String,
    #[serde(rename = "browserBinaryPath")]
    pub browser_binary_path: Option<String>,
    #[serde(rename = "settleDelaySecs")]
    pub settle_delay_secs: Option<u64>,
    #[serde(rename = "emailDomain")]
    pub email_domain: String,
    /// Constant campus value submitted with every record.
    pub campus: String,
    /// The exact phrase the ballot form shows once a registration has been
    /// confirmed.
    #[serde(rename = "successPhrase")]
    pub success_phrase: String,
    #[serde(rename = "alreadyRegisteredPhrase")]
    pub already_registered_phrase: Option<String>,
    pub columns: ColumnMap,
}

impl RelayConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs.unwrap_or(DEFAULT_SETTLE_DELAY_SECS))
    }

    pub fn already_registered_marker(&self) -> String {
        self.already_registered_phrase
            .clone()
            .unwrap_or_else(|| DEFAULT_ALREADY_REGISTERED_PHRASE.to_string())
    }

    pub fn form_target(&self) -> FormTarget {
        FormTarget {
            url: self.target_form_url.clone(),
            settle: self.settle_delay(),
            already_registered_marker: self.already_registered_marker(),
            success_phrase: self.success_phrase.clone(),
        }
    }
}

pub fn read_config(path: &str) -> RelayResult<RelayConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RelayConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "feedUrl": "https://sheets.invalid/export?format=xlsx",
                "seenSetPath": "responses.json",
                "failedLedgerPath": "failed.json",
                "succeededLedgerPath": "succeeded.json",
                "targetFormUrl": "https://ballot.invalid/register",
                "emailDomain": "@ad.unsw.edu.au",
                "campus": "UNSW",
                "successPhrase": "Thank you for registering to vote",
                "columns": {
                    "email": "Email (MUST BE zID@ad.unsw.edu.au)",
                    "institutionalId": "zID (z0000000)",
                    "firstName": "First Name",
                    "lastName": "Last Name"
                }
            }"#,
        )
        .unwrap();

        let config = read_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.campus, "UNSW");
        assert_eq!(config.credentials_path, None);
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.already_registered_marker(), "already in use");
        assert_eq!(config.columns.institutional_id, "zID (z0000000)");
    }
}
