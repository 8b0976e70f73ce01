// Utility functions
use chrono::{DateTime, Datelike, Utc};

/// Parses an RFC 3339 timestamp into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `CIR-<year>-<seq:06>` reference of an analysis.
pub fn format_consulta_id(year: i32, seq: i64) -> String {
    format!("CIR-{}-{:06}", year, seq)
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offsets_into_utc() {
        let dt = parse_datetime("2025-03-01T10:00:00+01:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-01T09:00:00+00:00");
        assert!(parse_datetime("01/03/2025").is_none());
    }

    #[test]
    fn consulta_ids_are_zero_padded() {
        assert_eq!(format_consulta_id(2025, 7), "CIR-2025-000007");
        assert_eq!(format_consulta_id(2026, 1234567), "CIR-2026-1234567");
    }
}
