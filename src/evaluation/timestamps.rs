//! 발행 시각 파싱
//!
//! 두 가지 정책이 의도적으로 분리되어 있습니다.
//! - `parse_published_multi`: recency 메트릭용. 고정 포맷 3개를 먼저 시도하고 ISO-8601로 폴백
//! - `parse_published_iso`: 평균 나이 진단용. ISO-8601만 허용
//!
//! 오프셋이 없는 시각은 UTC로 간주합니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{EvalError, Result};

/// recency 메트릭이 먼저 시도하는 고정 포맷 (순서 유지)
const FIXED_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
];

/// ISO-8601 폴백에서 허용하는 오프셋 없는 형식
const NAIVE_ISO_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// 고정 포맷 → ISO-8601 순서로 파싱 (recency 정책)
pub fn parse_published_multi(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    FIXED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .map_or_else(|| parse_published_iso(raw), Ok)
}

/// ISO-8601 파싱 (평균 나이 정책)
///
/// 끝의 `Z`는 `+00:00`으로 취급합니다.
pub fn parse_published_iso(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let fail = || EvalError::ParseFailure {
        field: "published_at",
        value: raw.to_string(),
    };

    if raw.is_empty() {
        return Err(fail());
    }

    let normalized = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_ISO_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
    {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(fail())
}

/// 경과 시간 (시간 단위, 미래 시각이면 음수)
pub fn hours_between(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published).num_milliseconds() as f64 / 3_600_000.0
}
