use chrono::{DateTime, Utc};
use tracing::debug;

use crate::aggregate::aggregate;
use crate::config::ReportConfig;
use crate::errors::ReportError;
use crate::extract::extract;
use crate::models::{ChartDataset, FormInfo, ReportQuery, ReportResponse, Series};
use crate::probe::probe_schema;
use crate::series::{build_series, form_options, FormFilter};
use crate::store::SubmissionStore;
use crate::window::{parse_range, ReportWindow};

#[derive(Debug, Clone)]
pub struct Report {
    pub window: ReportWindow,
    pub filter: FormFilter,
    pub timezone: String,
    pub table: String,
    pub series: Vec<Series>,
    pub forms: Vec<FormInfo>,
}

impl Report {
    pub fn labels(&self) -> Vec<String> {
        self.window.labels()
    }

    pub fn datasets(&self) -> Vec<ChartDataset> {
        self.series.iter().map(ChartDataset::from).collect()
    }

    pub fn to_response(&self) -> ReportResponse {
        ReportResponse {
            range: self.window.range,
            form: self.filter.as_param(),
            timezone: self.timezone.clone(),
            table: self.table.clone(),
            labels: self.labels(),
            datasets: self.datasets(),
            forms: self.forms.clone(),
        }
    }
}

pub async fn build_report(
    store: &dyn SubmissionStore,
    config: &ReportConfig,
    query: &ReportQuery,
) -> Result<Report, ReportError> {
    build_report_at(store, config, query, Utc::now()).await
}

pub async fn build_report_at(
    store: &dyn SubmissionStore,
    config: &ReportConfig,
    query: &ReportQuery,
    now: DateTime<Utc>,
) -> Result<Report, ReportError> {
    let range = parse_range(query.range.as_deref());
    let filter = FormFilter::parse(query.form.as_deref());

    let plan = probe_schema(store, &config.table_prefix).await?;
    let window = ReportWindow::resolve_at(now, range, config.timezone);
    let titles = store.form_titles().await?;
    let rows = store.fetch_rows(&plan, &window).await?;

    let (submissions, dropped) = extract(&rows, plan.encoding);
    let buckets = aggregate(&submissions, &window, config.timezone);
    debug!(
        table = %plan.table,
        rows = rows.len(),
        dropped,
        skipped = buckets.skipped,
        "aggregated submissions"
    );

    Ok(Report {
        series: build_series(filter, &buckets, &titles),
        forms: form_options(&buckets, &titles),
        timezone: config.timezone.name().to_string(),
        table: plan.table,
        window,
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TOTAL_LABEL;
    use crate::store::SnapshotStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn config(timezone: &str) -> ReportConfig {
        ReportConfig::from_lookup(|key| match key {
            "REPORT_SNAPSHOT_PATH" => Some("unused.json".to_string()),
            "REPORT_TIMEZONE" => Some(timezone.to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn query(range: &str, form: &str) -> ReportQuery {
        ReportQuery {
            range: Some(range.to_string()),
            form: Some(form.to_string()),
        }
    }

    fn cfdb7_store() -> SnapshotStore {
        let day = |days: i64| (now() - Duration::days(days)).format("%Y-%m-%d %H:%M:%S").to_string();
        let json = serde_json::json!({
            "tables": {
                "wp_db7_forms": {
                    "columns": ["form_post_id", "form_value", "form_date"],
                    "rows": [
                        { "form_post_id": 12, "form_value": "a:0:{}", "form_date": day(0) },
                        { "form_post_id": 12, "form_value": "a:0:{}", "form_date": day(1) },
                        { "form_post_id": 30, "form_value": "a:0:{}", "form_date": day(1) },
                        { "form_post_id": null, "form_value": "{\"_wpcf7\": 30}", "form_date": day(2) },
                        { "form_post_id": null, "form_value": "broken", "form_date": day(3) },
                        { "form_post_id": 12, "form_value": "a:0:{}", "form_date": "not a date" },
                        { "form_post_id": 12, "form_value": "a:0:{}", "form_date": day(40) }
                    ]
                }
            },
            "forms": [
                { "id": 12, "title": "Contact us" },
                { "id": 30, "title": "Quote request", "status": "draft" }
            ]
        });
        SnapshotStore::from_json(&json.to_string()).unwrap()
    }

    #[tokio::test]
    async fn all_forms_report_totals_every_submission() {
        let report = build_report_at(&cfdb7_store(), &config("UTC"), &query("7", "all"), now())
            .await
            .unwrap();

        assert_eq!(report.table, "wp_db7_forms");
        assert_eq!(report.labels().len(), 7);
        assert_eq!(report.labels().last().unwrap(), "2026-03-10");
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.series[0].label, TOTAL_LABEL);
        assert_eq!(report.series[0].values, vec![0, 0, 0, 1, 1, 2, 1]);

        let ids: Vec<i64> = report.forms.iter().map(|form| form.id).collect();
        assert_eq!(ids, vec![12, 30]);
    }

    #[tokio::test]
    async fn single_form_report_uses_title() {
        let report = build_report_at(&cfdb7_store(), &config("UTC"), &query("7", "30"), now())
            .await
            .unwrap();
        assert_eq!(report.series[0].label, "Quote request");
        assert_eq!(report.series[0].values, vec![0, 0, 0, 0, 1, 1, 0]);

        let response = report.to_response();
        assert_eq!(response.form, "30");
        assert_eq!(response.datasets[0].border_color, "hsl(0 70% 45%)");
    }

    #[tokio::test]
    async fn invalid_range_falls_back_to_28_days() {
        let report = build_report_at(&cfdb7_store(), &config("UTC"), &query("31", "999"), now())
            .await
            .unwrap();
        assert_eq!(report.window.range, 28);
        assert_eq!(report.series[0].label, "#999");
        assert_eq!(report.series[0].values, vec![0; 28]);
    }

    #[tokio::test]
    async fn missing_date_column_stops_the_report() {
        let store = SnapshotStore::from_json(
            r#"{ "tables": { "wp_db7_forms": { "columns": ["form_id", "form_value"], "rows": [] } } }"#,
        )
        .unwrap();
        let err = build_report_at(&store, &config("UTC"), &ReportQuery::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::NoDateColumn { .. }));
    }

    #[tokio::test]
    async fn millisecond_entries_are_bucketed() {
        let millis = |days: i64| (now() - Duration::days(days)).timestamp() * 1000;
        let json = serde_json::json!({
            "tables": {
                "wp_cf7dbplugin_submits": {
                    "columns": ["submit_time", "form_name", "data"],
                    "rows": [
                        { "submit_time": millis(0), "data": "{\"form_id\": 5}" },
                        { "submit_time": millis(1), "data": "{\"form_id\": 5}" },
                        { "submit_time": millis(1), "data": null }
                    ]
                }
            }
        });
        let store = SnapshotStore::from_json(&json.to_string()).unwrap();
        let report = build_report_at(&store, &config("Europe/Rome"), &query("7", "all"), now())
            .await
            .unwrap();
        assert_eq!(report.timezone, "Europe/Rome");
        assert_eq!(report.series[0].values, vec![0, 0, 0, 0, 0, 2, 1]);
        assert_eq!(report.forms.len(), 1);
        assert_eq!(report.forms[0].title, "#5");
    }
}
