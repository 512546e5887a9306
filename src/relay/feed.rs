use crate::relay::*;

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use snafu::{ensure, OptionExt};

/// One feed row, keyed by column header. Ordered by key so that its
/// serialization is canonical.
pub type RawRow = BTreeMap<String, String>;

/// The external collaborator producing the respondent rows. A failure here
/// is fatal to the run.
pub trait ResponseFeed {
    fn fetch_rows(&self) -> RelayResult<Vec<RawRow>>;
}

/// Fetches the spreadsheet backing the registration form through its xlsx
/// export URL, optionally authenticating with a bearer token read from a
/// credentials file.
pub struct SheetsFeed {
    url: String,
    credentials_path: Option<String>,
}

impl SheetsFeed {
    pub fn new(url: String, credentials_path: Option<String>) -> SheetsFeed {
        SheetsFeed {
            url,
            credentials_path,
        }
    }

    fn bearer_token(&self) -> RelayResult<Option<String>> {
        match &self.credentials_path {
            Some(path) => {
                let token =
                    fs::read_to_string(path).context(OpeningJsonSnafu { path: path.clone() })?;
                Ok(Some(token.trim().to_string()))
            }
            None => Ok(None),
        }
    }
}

impl ResponseFeed for SheetsFeed {
    fn fetch_rows(&self) -> RelayResult<Vec<RawRow>> {
        info!("fetching the response sheet at {}", self.url);
        let client = reqwest::blocking::Client::new();
        let mut request = client.get(&self.url);
        if let Some(token) = self.bearer_token()? {
            request = request.bearer_auth(token);
        }
        let response = request.send().context(FetchingFeedSnafu {
            url: self.url.clone(),
        })?;
        ensure!(
            response.status().is_success(),
            FeedStatusSnafu {
                status: response.status().as_u16(),
                url: self.url.clone(),
            }
        );
        let body = response.bytes().context(FetchingFeedSnafu {
            url: self.url.clone(),
        })?;
        parse_sheet(&body)
    }
}

/// Parses the first worksheet of an xlsx body into one mapping per row, keyed
/// by the header row. Fully blank rows are skipped.
pub fn parse_sheet(body: &[u8]) -> RelayResult<Vec<RawRow>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(body.to_vec())).context(OpeningWorkbookSnafu {})?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptySheetSnafu {})?
        .context(OpeningWorkbookSnafu {})?;

    let mut rows = wrange.rows();
    let header = rows.next().context(EmptySheetSnafu {})?;
    let names: Vec<String> = header.iter().map(cell_to_string).collect();
    debug!("sheet header: {:?}", names);

    let mut res: Vec<RawRow> = Vec::new();
    for row in rows {
        let mut raw = RawRow::new();
        for (idx, name) in names.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            let value = row.get(idx).map(cell_to_string).unwrap_or_default();
            raw.insert(name.clone(), value);
        }
        if raw.values().all(|v| v.is_empty()) {
            continue;
        }
        res.push(raw);
    }
    info!("parsed {} rows from the sheet", res.len());
    Ok(res)
}

// Renders every cell the way a records-style sheet API would: whole numbers
// without a decimal part, empty cells as empty strings.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(f) => f.to_string(),
        DataType::Error(_) => String::new(),
        DataType::Empty => String::new(),
    }
}
