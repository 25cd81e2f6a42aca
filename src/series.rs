use std::collections::HashMap;

use crate::aggregate::FormBuckets;
use crate::models::{FormInfo, Series};

pub const TOTAL_LABEL: &str = "All submissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFilter {
    All,
    Form(i64),
}

impl FormFilter {
    // Whole-value parse: "12abc" and other non-numeric input read as "all",
    // not as form 12 or the unknown form.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value != "all" => value.parse().map_or(Self::All, Self::Form),
            _ => Self::All,
        }
    }

    pub fn as_param(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Form(id) => id.to_string(),
        }
    }
}

pub fn series_color(index: usize, count: usize) -> String {
    let hue = ((index * 360) as f64 / count.max(1) as f64).round() as u32;
    format!("hsl({hue} 70% 45%)")
}

pub fn form_label(form_id: i64, titles: &HashMap<i64, String>) -> String {
    match titles.get(&form_id) {
        Some(title) if !title.trim().is_empty() => title.clone(),
        _ => format!("#{form_id}"),
    }
}

pub fn build_series(
    filter: FormFilter,
    buckets: &FormBuckets,
    titles: &HashMap<i64, String>,
) -> Vec<Series> {
    let (label, values) = match filter {
        FormFilter::All => (TOTAL_LABEL.to_string(), buckets.totals()),
        FormFilter::Form(id) => (form_label(id, titles), buckets.form(id)),
    };

    vec![Series {
        label,
        values,
        color: series_color(0, 1),
    }]
}

pub fn form_options(buckets: &FormBuckets, titles: &HashMap<i64, String>) -> Vec<FormInfo> {
    buckets
        .active_forms()
        .into_iter()
        .map(|id| FormInfo {
            id,
            title: form_label(id, titles),
        })
        .collect()
}
