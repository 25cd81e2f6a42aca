use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tokio::fs;

use crate::errors::ReportError;
use crate::extract::{numeric, parse_timestamp};
use crate::models::RawRow;
use crate::probe::{SchemaPlan, TimestampEncoding};
use crate::window::ReportWindow;

pub const FORM_POST_TYPE: &str = "wpcf7_contact_form";
pub const FORM_POST_STATUSES: [&str; 3] = ["publish", "draft", "private"];

const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn table_exists(&self, table: &str) -> Result<bool, ReportError>;

    async fn columns(&self, table: &str) -> Result<Vec<String>, ReportError>;

    async fn max_value(&self, table: &str, column: &str) -> Result<Option<String>, ReportError>;

    async fn fetch_rows(
        &self,
        plan: &SchemaPlan,
        window: &ReportWindow,
    ) -> Result<Vec<RawRow>, ReportError>;

    async fn form_titles(&self) -> Result<HashMap<i64, String>, ReportError>;
}

pub struct MySqlStore {
    pool: MySqlPool,
    prefix: String,
}

impl MySqlStore {
    pub async fn connect(database_url: &str, prefix: &str) -> Result<Self, ReportError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::with_pool(pool, prefix))
    }

    pub fn with_pool(pool: MySqlPool, prefix: &str) -> Self {
        Self {
            pool,
            prefix: prefix.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBounds {
    Text(String, String),
    Seconds(i64, i64),
    Millis(i64, i64),
}

pub fn range_bounds(encoding: TimestampEncoding, window: &ReportWindow) -> RangeBounds {
    let (from, to) = (window.from_utc, window.to_utc);
    match encoding {
        TimestampEncoding::Formatted => RangeBounds::Text(
            from.format(SQL_DATETIME).to_string(),
            to.format(SQL_DATETIME).to_string(),
        ),
        TimestampEncoding::EpochSeconds => RangeBounds::Seconds(from.timestamp(), to.timestamp()),
        TimestampEncoding::EpochMillis => {
            RangeBounds::Millis(from.timestamp() * 1000, to.timestamp() * 1000)
        }
    }
}

pub fn range_query(plan: &SchemaPlan) -> String {
    let mut select = vec![format!("CAST(`{}` AS CHAR) AS ts", plan.timestamp)];
    if let Some(column) = plan.form_id {
        select.push(format!("CAST(`{column}` AS CHAR) AS fid"));
    }
    if let Some(column) = plan.payload {
        select.push(format!("CAST(`{column}` AS CHAR) AS payload"));
    }
    format!(
        "SELECT {} FROM `{}` WHERE `{}` BETWEEN ? AND ?",
        select.join(", "),
        plan.table,
        plan.timestamp
    )
}

fn row_text(row: &MySqlRow, column: &str) -> Result<Option<String>, ReportError> {
    Ok(row.try_get::<Option<String>, _>(column)?)
}

#[async_trait]
impl SubmissionStore for MySqlStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn table_exists(&self, table: &str) -> Result<bool, ReportError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, ReportError> {
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(COLUMN_NAME AS CHAR) FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Option<String>, ReportError> {
        let query = format!("SELECT CAST(MAX(`{column}`) AS CHAR) FROM `{table}`");
        let value: Option<String> = sqlx::query_scalar(&query).fetch_one(&self.pool).await?;
        Ok(value)
    }

    async fn fetch_rows(
        &self,
        plan: &SchemaPlan,
        window: &ReportWindow,
    ) -> Result<Vec<RawRow>, ReportError> {
        let query = range_query(plan);
        let statement = sqlx::query(&query);
        let rows = match range_bounds(plan.encoding, window) {
            RangeBounds::Text(from, to) => statement.bind(from).bind(to).fetch_all(&self.pool).await?,
            RangeBounds::Seconds(from, to) | RangeBounds::Millis(from, to) => {
                statement.bind(from).bind(to).fetch_all(&self.pool).await?
            }
        };

        let mut raw = Vec::with_capacity(rows.len());
        for row in rows {
            raw.push(RawRow {
                timestamp: row_text(&row, "ts")?,
                form_id: match plan.form_id {
                    Some(_) => row_text(&row, "fid")?,
                    None => None,
                },
                payload: match plan.payload {
                    Some(_) => row_text(&row, "payload")?,
                    None => None,
                },
            });
        }
        Ok(raw)
    }

    async fn form_titles(&self) -> Result<HashMap<i64, String>, ReportError> {
        let query = format!(
            "SELECT CAST(ID AS SIGNED) AS id, CAST(post_title AS CHAR) AS title FROM `{}posts` \
             WHERE post_type = ? AND post_status IN (?, ?, ?)",
            self.prefix
        );
        let mut statement = sqlx::query(&query).bind(FORM_POST_TYPE);
        for status in FORM_POST_STATUSES {
            statement = statement.bind(status);
        }
        let rows = statement.fetch_all(&self.pool).await?;

        let mut titles = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let title: Option<String> = row.try_get("title")?;
            titles.insert(id, title.unwrap_or_default());
        }
        Ok(titles)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    tables: BTreeMap<String, SnapshotTable>,
    #[serde(default)]
    forms: Vec<SnapshotForm>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SnapshotForm {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default = "default_status")]
    status: String,
}

fn default_status() -> String {
    "publish".to_string()
}

/// Store backed by a JSON export of the entry tables and form titles.
///
/// Range filtering mirrors the SQL `BETWEEN`: rows whose timestamp cannot be
/// read are passed through and left for the extractor to drop.
#[derive(Debug)]
pub struct SnapshotStore {
    snapshot: Snapshot,
}

impl SnapshotStore {
    pub async fn load(path: &Path) -> Result<Self, ReportError> {
        let bytes = fs::read(path).await.map_err(|err| {
            ReportError::Store(format!("failed to read snapshot {}: {err}", path.display()))
        })?;
        let snapshot = serde_json::from_slice(&bytes).map_err(|err| {
            ReportError::Store(format!("failed to parse snapshot {}: {err}", path.display()))
        })?;
        Ok(Self { snapshot })
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let snapshot = serde_json::from_str(json)
            .map_err(|err| ReportError::Store(format!("failed to parse snapshot: {err}")))?;
        Ok(Self { snapshot })
    }

    fn table(&self, table: &str) -> Result<&SnapshotTable, ReportError> {
        self.snapshot
            .tables
            .get(table)
            .ok_or_else(|| ReportError::Store(format!("table {table} does not exist")))
    }
}

fn cell_text(row: &BTreeMap<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl SubmissionStore for SnapshotStore {
    fn backend(&self) -> &'static str {
        "snapshot"
    }

    async fn table_exists(&self, table: &str) -> Result<bool, ReportError> {
        Ok(self.snapshot.tables.contains_key(table))
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, ReportError> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Option<String>, ReportError> {
        let values: Vec<String> = self
            .table(table)?
            .rows
            .iter()
            .filter_map(|row| cell_text(row, column))
            .collect();

        let numbers: Option<Vec<f64>> = values.iter().map(|value| numeric(value)).collect();
        let max = match numbers {
            Some(numbers) => numbers
                .iter()
                .zip(&values)
                .max_by(|a, b| a.0.total_cmp(b.0))
                .map(|(_, text)| text.clone()),
            None => values.into_iter().max(),
        };
        Ok(max)
    }

    async fn fetch_rows(
        &self,
        plan: &SchemaPlan,
        window: &ReportWindow,
    ) -> Result<Vec<RawRow>, ReportError> {
        let table = self.table(&plan.table)?;
        let rows = table
            .rows
            .iter()
            .map(|row| RawRow {
                timestamp: cell_text(row, plan.timestamp),
                form_id: plan.form_id.and_then(|column| cell_text(row, column)),
                payload: plan.payload.and_then(|column| cell_text(row, column)),
            })
            .filter(|row| {
                row.timestamp
                    .as_deref()
                    .and_then(|raw| parse_timestamp(raw, plan.encoding))
                    .is_none_or(|instant| window.contains(instant))
            })
            .collect();
        Ok(rows)
    }

    async fn form_titles(&self) -> Result<HashMap<i64, String>, ReportError> {
        Ok(self
            .snapshot
            .forms
            .iter()
            .filter(|form| FORM_POST_STATUSES.contains(&form.status.as_str()))
            .map(|form| (form.id, form.title.clone()))
            .collect())
    }
}
