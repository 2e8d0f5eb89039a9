use chrono::{DateTime, Datelike, Utc};

const MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Spanish relative timestamp: "Hace un momento", "Hace 5 min", "Hace 3 h",
/// then an absolute "4 mar 2024". Missing timestamps render as "N/A".
pub fn format_relative(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "N/A".to_string();
    };

    let seconds = (now - ts).num_seconds();
    if seconds < 60 {
        "Hace un momento".to_string()
    } else if seconds < 3_600 {
        format!("Hace {} min", seconds / 60)
    } else if seconds < 86_400 {
        format!("Hace {} h", seconds / 3_600)
    } else {
        format!("{} {} {}", ts.day(), MONTHS[ts.month0() as usize], ts.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 20, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_buckets() {
        let now = now();
        assert_eq!(format_relative(Some(now - Duration::seconds(59)), now), "Hace un momento");
        assert_eq!(format_relative(Some(now - Duration::seconds(60)), now), "Hace 1 min");
        assert_eq!(format_relative(Some(now - Duration::minutes(59)), now), "Hace 59 min");
        assert_eq!(format_relative(Some(now - Duration::hours(1)), now), "Hace 1 h");
        assert_eq!(format_relative(Some(now - Duration::hours(23)), now), "Hace 23 h");
    }

    #[test]
    fn test_absolute_after_a_day() {
        let now = now();
        assert_eq!(format_relative(Some(now - Duration::days(1)), now), "19 sept 2024");
        let ts = Utc.with_ymd_and_hms(2023, 1, 5, 12, 0, 0).unwrap();
        assert_eq!(format_relative(Some(ts), now), "5 ene 2023");
    }

    #[test]
    fn test_future_and_missing() {
        let now = now();
        assert_eq!(format_relative(Some(now + Duration::minutes(5)), now), "Hace un momento");
        assert_eq!(format_relative(None, now), "N/A");
    }
}
