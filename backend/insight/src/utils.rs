use chrono::prelude::*;
use tracing::warn;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_formatted() -> String {
    Local::now().to_rfc3339()
}

/// Wall-clock time as written. An offset is dropped, not applied, so the
/// calendar date stays the one in the stored value.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_timestamps(raw: &[String]) -> Vec<NaiveDateTime> {
    raw.iter()
        .filter_map(|value| {
            let parsed = parse_timestamp(value);
            if parsed.is_none() {
                warn!("Skipping unparsable timestamp {value:?}");
            }
            parsed
        })
        .collect()
}
