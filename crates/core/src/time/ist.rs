use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

// India Standard Time has no DST.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> anyhow::Result<FixedOffset> {
    FixedOffset::east_opt(IST_OFFSET_SECS).context("invalid IST offset")
}

/// NSE calendar date for a UTC instant. Export files are dated with this so that a
/// snapshot taken after midnight IST, but before midnight UTC, is filed under the Indian date.
pub fn market_date(at: DateTime<Utc>) -> NaiveDate {
    (at.naive_utc() + Duration::seconds(i64::from(IST_OFFSET_SECS))).date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn before_ist_midnight_keeps_utc_date() {
        // 2026-10-15 18:00 UTC = 23:30 IST
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap();
        assert_eq!(market_date(at), NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
    }

    #[test]
    fn after_ist_midnight_rolls_forward() {
        // 2026-10-15 18:30 UTC = 00:00 IST on the 16th
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 18, 30, 0).unwrap();
        assert_eq!(market_date(at), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }

    #[test]
    fn agrees_with_fixed_offset_conversion() {
        let at = Utc.with_ymd_and_hms(2026, 3, 31, 20, 15, 0).unwrap();
        let via_offset = at.with_timezone(&ist().unwrap()).date_naive();
        assert_eq!(market_date(at), via_offset);
    }
}
