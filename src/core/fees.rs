use crate::core::{
    FIRST_TIER_DAILY_FEE, FIRST_TIER_DAYS, LATE_FEE_CAP, SECOND_TIER_DAILY_FEE,
};
use crate::domain::model::{FeeStatus, LateFee};
use chrono::NaiveDateTime;

/// Whole calendar days between the due date and `now`, never negative.
/// Time of day is ignored on both sides.
pub fn days_overdue(due_date: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now.date() - due_date.date()).num_days().max(0)
}

/// Rounds to cents. The small nudge keeps values such as 0.5 from landing on
/// 0.49 after binary float representation.
pub fn round_cents(amount: f64) -> f64 {
    ((amount + 1e-9) * 100.0).round() / 100.0
}

pub fn fee_for_days(days_overdue: i64) -> f64 {
    if days_overdue <= 0 {
        return 0.0;
    }
    let first_tier = days_overdue.min(FIRST_TIER_DAYS) as f64 * FIRST_TIER_DAILY_FEE;
    let second_tier = (days_overdue - FIRST_TIER_DAYS).max(0) as f64 * SECOND_TIER_DAILY_FEE;
    round_cents((first_tier + second_tier).min(LATE_FEE_CAP))
}

pub fn assess(due_date: NaiveDateTime, now: NaiveDateTime) -> LateFee {
    let days = days_overdue(due_date, now);
    if days == 0 {
        return LateFee::on_time();
    }
    LateFee {
        fee_amount: fee_for_days(days),
        days_overdue: days,
        status: FeeStatus::Late,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_days_overdue_uses_calendar_dates() {
        let due = at(2024, 3, 10, 23);
        assert_eq!(days_overdue(due, at(2024, 3, 11, 1)), 1);
        assert_eq!(days_overdue(due, at(2024, 3, 10, 23)), 0);
        assert_eq!(days_overdue(due, at(2024, 3, 1, 12)), 0);
        assert_eq!(days_overdue(due, at(2024, 4, 9, 0)), 30);
    }

    #[test]
    fn test_fee_tiers() {
        assert_eq!(fee_for_days(0), 0.0);
        assert_eq!(fee_for_days(1), 0.5);
        assert_eq!(fee_for_days(7), 3.5);
        assert_eq!(fee_for_days(8), 4.5);
        assert_eq!(fee_for_days(10), 6.5);
        assert_eq!(fee_for_days(18), 14.5);
        assert_eq!(fee_for_days(19), 15.0);
        assert_eq!(fee_for_days(46), 15.0);
        assert_eq!(fee_for_days(365), 15.0);
    }

    #[test]
    fn test_fee_is_monotonic_with_expected_slopes() {
        let mut previous = fee_for_days(0);
        for day in 1..=60 {
            let fee = fee_for_days(day);
            assert!(fee >= previous, "fee dropped at day {}", day);
            let step = fee - previous;
            if fee < LATE_FEE_CAP {
                let expected = if day <= FIRST_TIER_DAYS { 0.5 } else { 1.0 };
                assert!((step - expected).abs() < 1e-9, "bad slope at day {}", day);
            }
            assert!(fee <= LATE_FEE_CAP);
            previous = fee;
        }
    }

    #[test]
    fn test_assess() {
        let due = at(2024, 1, 15, 9);
        assert_eq!(assess(due, at(2024, 1, 15, 18)), LateFee::on_time());

        let late = assess(due, at(2024, 1, 16, 8));
        assert_eq!(late.status, FeeStatus::Late);
        assert_eq!(late.days_overdue, 1);
        assert_eq!(late.fee_amount, 0.5);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(0.5), 0.5);
        assert_eq!(round_cents(0.1 + 0.2), 0.3);
        assert_eq!(round_cents(14.999), 15.0);
    }
}
