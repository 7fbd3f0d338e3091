use chrono::{DateTime, Duration, Months, Utc};

use crate::config::DEFAULT_SUBSCRIPTION_FREQUENCY;
use crate::models::subscription::SubscriptionInterval;

/// Computes the next scheduled order date: the base timestamp advanced
/// by `frequency` units of the given calendar granularity.
///
/// A zero frequency falls back to the documented default of
/// `DEFAULT_SUBSCRIPTION_FREQUENCY`. Months use calendar-aware
/// arithmetic, so Jan 31 + 1 month lands on the last day of February.
pub fn next_order_date(
    interval: SubscriptionInterval,
    frequency: u32,
    from: DateTime<Utc>,
) -> DateTime<Utc> {
    let frequency = if frequency >= 1 {
        frequency
    } else {
        DEFAULT_SUBSCRIPTION_FREQUENCY
    };

    match interval {
        SubscriptionInterval::Days => from + Duration::days(i64::from(frequency)),
        SubscriptionInterval::Weeks => from + Duration::weeks(i64::from(frequency)),
        SubscriptionInterval::Months => from + Months::new(frequency),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn base() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test_case(SubscriptionInterval::Days, 1, "2024-01-02T00:00:00Z"; "one day")]
    #[test_case(SubscriptionInterval::Weeks, 4, "2024-01-29T00:00:00Z"; "four weeks")]
    #[test_case(SubscriptionInterval::Months, 1, "2024-02-01T00:00:00Z"; "one month")]
    #[test_case(SubscriptionInterval::Days, 30, "2024-01-31T00:00:00Z"; "thirty days")]
    #[test_case(SubscriptionInterval::Months, 12, "2025-01-01T00:00:00Z"; "twelve months")]
    fn test_advances_by_calendar_granularity(
        interval: SubscriptionInterval,
        frequency: u32,
        expected: &str,
    ) {
        let expected: DateTime<Utc> = expected.parse().unwrap();
        assert_eq!(next_order_date(interval, frequency, base()), expected);
    }

    #[test]
    fn test_zero_frequency_falls_back_to_default() {
        let expected: DateTime<Utc> = "2024-01-29T00:00:00Z".parse().unwrap();
        assert_eq!(
            next_order_date(SubscriptionInterval::Weeks, 0, base()),
            expected
        );
    }

    #[test]
    fn test_month_arithmetic_clamps_to_month_end() {
        let from: DateTime<Utc> = "2024-01-31T12:00:00Z".parse().unwrap();
        let expected: DateTime<Utc> = "2024-02-29T12:00:00Z".parse().unwrap();
        assert_eq!(
            next_order_date(SubscriptionInterval::Months, 1, from),
            expected
        );
    }

    #[test]
    fn test_result_preserves_time_of_day() {
        let from: DateTime<Utc> = "2024-06-15T08:30:45Z".parse().unwrap();
        let result = next_order_date(SubscriptionInterval::Days, 3, from);
        assert_eq!(result.to_rfc3339(), "2024-06-18T08:30:45+00:00");
    }
}
