use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::models::{RawRow, Submission, UNKNOWN_FORM};
use crate::probe::TimestampEncoding;

pub type PayloadMap = Map<String, Value>;
type PayloadDecoder = fn(&str) -> Option<PayloadMap>;

/// Tried in order; the first decoder returning a map wins.
const PAYLOAD_DECODERS: [PayloadDecoder; 2] = [decode_json, decode_php_serialized];

const PAYLOAD_FORM_KEYS: [&str; 2] = ["_wpcf7", "form_id"];

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Rows whose timestamp cannot be read are dropped; the count is returned.
pub fn extract(rows: &[RawRow], encoding: TimestampEncoding) -> (Vec<Submission>, usize) {
    let mut submissions = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for row in rows {
        let Some(timestamp) = row
            .timestamp
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, encoding))
        else {
            dropped += 1;
            continue;
        };

        submissions.push(Submission {
            timestamp,
            form_id: resolve_form_id(row),
        });
    }

    (submissions, dropped)
}

pub fn parse_timestamp(raw: &str, encoding: TimestampEncoding) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    match encoding {
        TimestampEncoding::EpochMillis => {
            let seconds = (numeric(raw)? / 1000.0).round();
            DateTime::from_timestamp(seconds as i64, 0)
        }
        TimestampEncoding::EpochSeconds | TimestampEncoding::Formatted => match numeric(raw) {
            Some(seconds) => DateTime::from_timestamp(seconds.trunc() as i64, 0),
            None => parse_formatted(raw),
        },
    }
}

fn parse_formatted(raw: &str) -> Option<DateTime<Utc>> {
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn resolve_form_id(row: &RawRow) -> i64 {
    if let Some(id) = row.form_id.as_deref().and_then(numeric) {
        return id.trunc() as i64;
    }

    row.payload
        .as_deref()
        .and_then(decode_payload)
        .and_then(|map| form_id_from_payload(&map))
        .unwrap_or(UNKNOWN_FORM)
}

pub fn decode_payload(raw: &str) -> Option<PayloadMap> {
    PAYLOAD_DECODERS.iter().find_map(|decode| decode(raw))
}

pub fn form_id_from_payload(map: &PayloadMap) -> Option<i64> {
    PAYLOAD_FORM_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(numeric_value))
}

fn numeric_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => numeric(text).map(|float| float.trunc() as i64),
        _ => None,
    }
}

// rejects inf/NaN
pub(crate) fn numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn decode_json(raw: &str) -> Option<PayloadMap> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

// Older entries hold the fields as a PHP serialize()d array.
fn decode_php_serialized(raw: &str) -> Option<PayloadMap> {
    if !raw.starts_with("a:") {
        return None;
    }
    match PhpReader::new(raw.as_bytes()).value()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

struct PhpReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> PhpReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.next()? == byte).then_some(())
    }

    fn read_until(&mut self, stop: u8) -> Option<&'a str> {
        let rest = self.input.get(self.pos..)?;
        let len = rest.iter().position(|byte| *byte == stop)?;
        let text = std::str::from_utf8(&rest[..len]).ok()?;
        self.pos += len + 1;
        Some(text)
    }

    fn value(&mut self) -> Option<Value> {
        match self.next()? {
            b'N' => {
                self.expect(b';')?;
                Some(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.read_until(b';')? {
                    "0" => Some(Value::Bool(false)),
                    "1" => Some(Value::Bool(true)),
                    _ => None,
                }
            }
            b'i' => {
                self.expect(b':')?;
                let value = self.read_until(b';')?.parse::<i64>().ok()?;
                Some(Value::from(value))
            }
            b'd' => {
                self.expect(b':')?;
                let value = self.read_until(b';')?.parse::<f64>().ok()?;
                Some(Number::from_f64(value).map_or(Value::Null, Value::Number))
            }
            b's' => {
                self.expect(b':')?;
                let len = self.read_until(b':')?.parse::<usize>().ok()?;
                self.expect(b'"')?;
                let bytes = self.input.get(self.pos..self.pos.checked_add(len)?)?;
                self.pos += len;
                self.expect(b'"')?;
                self.expect(b';')?;
                Some(Value::String(String::from_utf8_lossy(bytes).into_owned()))
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.read_until(b':')?.parse::<usize>().ok()?;
                self.expect(b'{')?;
                let mut map = Map::new();
                for _ in 0..count {
                    let key = match self.value()? {
                        Value::String(key) => key,
                        Value::Number(key) => key.to_string(),
                        _ => return None,
                    };
                    let value = self.value()?;
                    map.insert(key, value);
                }
                self.expect(b'}')?;
                Some(Value::Object(map))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(timestamp: &str, form_id: Option<&str>, payload: Option<&str>) -> RawRow {
        RawRow {
            timestamp: Some(timestamp.to_string()),
            form_id: form_id.map(str::to_string),
            payload: payload.map(str::to_string),
        }
    }

    #[test]
    fn json_payload_supplies_form_id() {
        let row = row("2026-03-01 10:00:00", None, Some(r#"{"_wpcf7": 12}"#));
        assert_eq!(resolve_form_id(&row), 12);
    }

    #[test]
    fn json_payload_falls_back_to_form_id_key() {
        let row = row("2026-03-01 10:00:00", None, Some(r#"{"form_id": "31", "name": "Ada"}"#));
        assert_eq!(resolve_form_id(&row), 31);
    }

    #[test]
    fn serialized_payload_supplies_form_id() {
        let payload = r#"a:3:{s:6:"_wpcf7";s:2:"45";s:4:"name";s:7:"Mónica";i:0;b:1;}"#;
        let row = row("2026-03-01 10:00:00", None, Some(payload));
        assert_eq!(resolve_form_id(&row), 45);
    }

    #[test]
    fn nested_serialized_arrays_decode() {
        let payload = r#"a:2:{s:6:"fields";a:1:{i:0;s:1:"x";}s:7:"form_id";i:8;}"#;
        let map = decode_payload(payload).expect("decoded");
        assert_eq!(map["fields"]["0"], Value::String("x".to_string()));
        assert_eq!(form_id_from_payload(&map), Some(8));
    }

    #[test]
    fn direct_column_wins_over_payload() {
        let row = row("2026-03-01 10:00:00", Some("7"), Some(r#"{"_wpcf7": 12}"#));
        assert_eq!(resolve_form_id(&row), 7);
    }

    #[test]
    fn non_numeric_id_column_uses_payload() {
        let row = row("2026-03-01 10:00:00", Some("contact"), Some(r#"{"_wpcf7": 12}"#));
        assert_eq!(resolve_form_id(&row), 12);
    }

    #[test]
    fn malformed_payload_is_unknown_form() {
        for payload in ["not json", "a:2:{s:6:\"_wpcf7\"", "[1,2,3]", r#"{"_wpcf7": "abc"}"#] {
            let row = row("2026-03-01 10:00:00", None, Some(payload));
            assert_eq!(resolve_form_id(&row), UNKNOWN_FORM, "payload {payload}");
        }
    }

    #[test]
    fn millis_resolve_to_epoch_seconds() {
        let parsed = parse_timestamp("1700000000000", TimestampEncoding::EpochMillis).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
        let rounded = parse_timestamp("1700000000600", TimestampEncoding::EpochMillis).unwrap();
        assert_eq!(rounded.timestamp(), 1_700_000_001);
    }

    #[test]
    fn formatted_and_numeric_timestamps_parse() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();
        for raw in [
            "2026-03-01 10:15:00",
            "2026-03-01T10:15:00",
            "2026-03-01 10:15:00.000000",
            "2026-03-01T11:15:00+01:00",
        ] {
            assert_eq!(parse_timestamp(raw, TimestampEncoding::Formatted), Some(expected), "{raw}");
        }
        let epoch = expected.timestamp().to_string();
        assert_eq!(parse_timestamp(&epoch, TimestampEncoding::Formatted), Some(expected));
        assert_eq!(parse_timestamp(&epoch, TimestampEncoding::EpochSeconds), Some(expected));
    }

    #[test]
    fn unparseable_rows_are_dropped() {
        let rows = vec![
            row("2026-03-01 10:00:00", Some("3"), None),
            row("yesterday-ish", Some("3"), None),
            RawRow::default(),
        ];
        let (submissions, dropped) = extract(&rows, TimestampEncoding::Formatted);
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].form_id, 3);
        assert_eq!(dropped, 2);
    }
}
