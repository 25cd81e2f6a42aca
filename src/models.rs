use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_FORM: i64 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub timestamp: Option<String>,
    pub form_id: Option<String>,
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub timestamp: DateTime<Utc>,
    pub form_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormInfo {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub label: String,
    pub values: Vec<u64>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub border_color: String,
    pub background_color: String,
}

impl From<&Series> for ChartDataset {
    fn from(series: &Series) -> Self {
        Self {
            label: series.label.clone(),
            data: series.values.clone(),
            border_color: series.color.clone(),
            background_color: series.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub range: Option<String>,
    pub form: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub range: u32,
    pub form: String,
    pub timezone: String,
    pub table: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub forms: Vec<FormInfo>,
}
