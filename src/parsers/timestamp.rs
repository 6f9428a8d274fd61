use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses the handful of timestamp shapes Croatian price disclosures use:
/// ISO-8601 (`2026-01-05T07:10:01Z` or without the zone), a bare date
/// (`2026-01-05`), and the Croatian `DD.MM.YYYY[.][ HH:MM:SS]` form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    let croatian = trimmed.trim_end_matches('.');
    if let Ok(dt) = NaiveDateTime::parse_from_str(croatian, "%d.%m.%Y %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(croatian, "%d.%m.%Y") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_date() {
        assert!(parse_timestamp("2026-01-05").is_some());
    }

    #[test]
    fn parses_croatian_date() {
        assert!(parse_timestamp("29.12.2025").is_some());
    }

    #[test]
    fn parses_croatian_datetime() {
        assert!(parse_timestamp("29.12.2025 05:20:00").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("not-a-date"), None);
    }
}
