use crate::model::{Granularity, ReportType};

/// Lower edge and sample budget of one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    /// Inclusive lower bound in epoch millis, aligned to the granularity period.
    pub start_from: i64,
    /// Maximum samples requested per (device, pin).
    pub fetch_count: usize,
}

impl ReportWindow {
    /// The start is floored to the granularity period so that the first stored
    /// sample of the window (which sits on a period boundary) is not filtered out.
    pub fn compute(report_type: &ReportType, granularity: Granularity, now_millis: i64) -> Self {
        let period = granularity.period();
        let raw_start = now_millis - report_type.duration_millis();
        Self {
            start_from: raw_start.div_euclid(period) * period,
            fetch_count: report_type.fetch_count(granularity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_daily_report_hourly_granularity() {
        // 2024-03-10T12:34:56.789Z
        let now = 1_710_074_096_789;
        let window = ReportWindow::compute(&ReportType::Daily, Granularity::Hourly, now);
        assert_eq!(window.fetch_count, 24);
        // 2024-03-09T12:00:00Z
        assert_eq!(window.start_from, 1_709_985_600_000);
    }

    #[test]
    fn test_already_aligned_start_is_unchanged() {
        let now = 1_710_072_000_000; // exact hour
        let window = ReportWindow::compute(&ReportType::Weekly, Granularity::Hourly, now);
        assert_eq!(window.start_from, now - 7 * 86_400_000);
        assert_eq!(window.fetch_count, 168);
    }

    #[test]
    fn test_minute_alignment_drops_seconds() {
        let now = 1_710_074_096_789;
        let window = ReportWindow::compute(&ReportType::Daily, Granularity::Minute, now);
        assert_eq!(window.start_from % 60_000, 0);
        assert_eq!(window.start_from, 1_709_987_640_000);
    }

    fn any_granularity() -> impl Strategy<Value = Granularity> {
        prop_oneof![
            Just(Granularity::Minute),
            Just(Granularity::Hourly),
            Just(Granularity::Daily),
        ]
    }

    fn any_report_type() -> impl Strategy<Value = ReportType> {
        prop_oneof![
            Just(ReportType::Daily),
            Just(ReportType::Weekly),
            Just(ReportType::Monthly),
            (1u32..365).prop_map(|range_days| ReportType::OneTime { range_days }),
        ]
    }

    proptest! {
        #[test]
        fn prop_start_is_aligned_and_not_after_raw_start(
            now in -4_000_000_000_000i64..4_000_000_000_000i64,
            granularity in any_granularity(),
            report_type in any_report_type(),
        ) {
            let window = ReportWindow::compute(&report_type, granularity, now);
            let raw_start = now - report_type.duration_millis();
            prop_assert!(window.start_from <= raw_start);
            prop_assert!(raw_start - window.start_from < granularity.period());
            prop_assert_eq!(window.start_from.rem_euclid(granularity.period()), 0);
        }
    }
}
