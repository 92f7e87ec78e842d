use chrono::{DateTime, Utc};

/// Key of the single `info` row that tracks process starts.
pub const LAST_RUN_KEY: &str = "lastrun";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunRecord {
    FirstRun,
    Repeat { previous: String },
}

impl RunRecord {
    pub fn is_first_run(&self) -> bool {
        matches!(self, Self::FirstRun)
    }
}

/// Timestamps are stored as RFC 3339 text so rows written by older
/// deployments (JSON dates) stay readable.
pub fn run_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::run_timestamp;

    #[test]
    fn timestamps_use_millisecond_utc_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 23, 19).single().expect("valid date");
        assert_eq!(run_timestamp(at), "2026-10-19T08:23:19.000Z");
    }
}
