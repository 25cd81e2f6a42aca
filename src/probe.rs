use serde::Serialize;
use tracing::debug;

use crate::errors::ReportError;
use crate::extract::numeric;
use crate::store::SubmissionStore;

// CFDB7, then the older CF7DB plugin.
pub const TABLE_SUFFIXES: [&str; 2] = ["db7_forms", "cf7dbplugin_submits"];

pub const TIMESTAMP_COLUMNS: [&str; 7] = [
    "form_date",
    "created_on",
    "created_at",
    "submit_time",
    "submitted_at",
    "time",
    "date",
];
pub const FORM_ID_COLUMNS: [&str; 2] = ["form_id", "form_post_id"];
pub const PAYLOAD_COLUMNS: [&str; 4] = ["form_value", "data", "submitted_data", "meta_data"];

pub const AMBIGUOUS_TIMESTAMP_COLUMNS: [&str; 2] = ["created_on", "submit_time"];
pub const MILLIS_THRESHOLD: f64 = 2_000_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimestampEncoding {
    Formatted,
    EpochSeconds,
    EpochMillis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelection {
    pub timestamp: &'static str,
    pub form_id: Option<&'static str>,
    pub payload: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPlan {
    pub table: String,
    pub timestamp: &'static str,
    pub form_id: Option<&'static str>,
    pub payload: Option<&'static str>,
    pub encoding: TimestampEncoding,
}

pub fn candidate_tables(prefix: &str) -> Vec<String> {
    TABLE_SUFFIXES
        .iter()
        .map(|suffix| format!("{prefix}{suffix}"))
        .collect()
}

pub fn first_match(candidates: &[&'static str], columns: &[String]) -> Option<&'static str> {
    candidates
        .iter()
        .copied()
        .find(|candidate| columns.iter().any(|column| column == candidate))
}

pub fn select_columns(table: &str, columns: &[String]) -> Result<ColumnSelection, ReportError> {
    let timestamp = first_match(&TIMESTAMP_COLUMNS, columns).ok_or_else(|| {
        ReportError::NoDateColumn {
            table: table.to_string(),
        }
    })?;

    Ok(ColumnSelection {
        timestamp,
        form_id: first_match(&FORM_ID_COLUMNS, columns),
        payload: first_match(&PAYLOAD_COLUMNS, columns),
    })
}

pub fn encoding_from_sample(max_value: Option<&str>) -> TimestampEncoding {
    match max_value.and_then(numeric) {
        Some(value) if value > MILLIS_THRESHOLD => TimestampEncoding::EpochMillis,
        Some(_) => TimestampEncoding::EpochSeconds,
        None => TimestampEncoding::Formatted,
    }
}

pub async fn probe_schema(
    store: &dyn SubmissionStore,
    prefix: &str,
) -> Result<SchemaPlan, ReportError> {
    let candidates = candidate_tables(prefix);
    let mut table = None;
    for candidate in &candidates {
        if store.table_exists(candidate).await? {
            table = Some(candidate.clone());
            break;
        }
    }
    let table = table.ok_or_else(|| ReportError::NoTable {
        expected: candidates.join(" or "),
    })?;

    let columns = store.columns(&table).await?;
    let selection = select_columns(&table, &columns)?;

    let encoding = if AMBIGUOUS_TIMESTAMP_COLUMNS.contains(&selection.timestamp) {
        let max_value = store.max_value(&table, selection.timestamp).await?;
        encoding_from_sample(max_value.as_deref())
    } else {
        TimestampEncoding::Formatted
    };

    debug!(
        %table,
        timestamp = selection.timestamp,
        form_id = ?selection.form_id,
        payload = ?selection.payload,
        ?encoding,
        "probed submissions schema"
    );

    Ok(SchemaPlan {
        table,
        timestamp: selection.timestamp,
        form_id: selection.form_id,
        payload: selection.payload,
        encoding,
    })
}
