use chrono::{NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::model::employee::SalaryBasis;

/// Fixed single shift, 08:00-18:00. Arriving after the start accrues late
/// minutes; leaving after the end accrues overtime minutes.
pub static SHIFT_START: Lazy<NaiveTime> =
    Lazy::new(|| NaiveTime::from_hms_opt(8, 0, 0).expect("valid shift start"));
pub static SHIFT_END: Lazy<NaiveTime> =
    Lazy::new(|| NaiveTime::from_hms_opt(18, 0, 0).expect("valid shift end"));

/// Every started 20-minute block of lateness costs 50,000.
pub const PENALTY_BLOCK_MINUTES: i64 = 20;
pub const PENALTY_PER_BLOCK: Decimal = dec!(50_000);

pub const OVERTIME_RATE: Decimal = dec!(1.5);
/// Monthly salaries divide by a flat 30 when deriving the overtime day wage.
/// The payroll aggregator uses different divisors; the mismatch is part of
/// the observable contract and must not be unified here.
pub const MONTHLY_WAGE_DIVISOR: Decimal = dec!(30);
pub const HOURS_PER_DAY: Decimal = dec!(24);
const MINUTES_PER_HOUR: Decimal = dec!(60);

/// Whole minutes past shift start, zero at or before 08:00. The boundary is
/// strictly-greater-than: an 08:00:00 arrival is on time.
pub fn late_minutes(ts: NaiveDateTime) -> i64 {
    if ts.time() > *SHIFT_START {
        (ts - ts.date().and_time(*SHIFT_START)).num_minutes()
    } else {
        0
    }
}

/// Ceiling over 20-minute blocks: minute 1 already costs a full block.
pub fn late_penalty(late_minutes: i64) -> Decimal {
    if late_minutes <= 0 {
        return Decimal::ZERO;
    }
    let blocks = (late_minutes + PENALTY_BLOCK_MINUTES - 1) / PENALTY_BLOCK_MINUTES;
    Decimal::from(blocks) * PENALTY_PER_BLOCK
}

/// Whole minutes past shift end, zero at or before 18:00.
pub fn overtime_minutes(ts: NaiveDateTime) -> i64 {
    if ts.time() > *SHIFT_END {
        (ts - ts.date().and_time(*SHIFT_END)).num_minutes()
    } else {
        0
    }
}

/// Day wage used only for overtime: the base salary itself on a daily
/// basis, base / 30 on a monthly one.
pub fn overtime_daily_wage(basis: SalaryBasis, base_salary: Decimal) -> Decimal {
    match basis {
        SalaryBasis::Daily => base_salary,
        SalaryBasis::Monthly => base_salary / MONTHLY_WAGE_DIVISOR,
    }
}

/// overtime_pay = hours * (day wage / 24) * 1.5, rounded to 2 decimal
/// places half-up.
pub fn overtime_pay(overtime_minutes: i64, basis: SalaryBasis, base_salary: Decimal) -> Decimal {
    if overtime_minutes <= 0 {
        return Decimal::ZERO;
    }
    let hourly = overtime_daily_wage(basis, base_salary) / HOURS_PER_DAY;
    (Decimal::from(overtime_minutes) / MINUTES_PER_HOUR * hourly * OVERTIME_RATE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 13)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn on_time_arrival_is_not_late() {
        assert_eq!(late_minutes(at(8, 0, 0)), 0);
        assert_eq!(late_minutes(at(7, 30, 0)), 0);
        assert_eq!(late_penalty(0), Decimal::ZERO);
    }

    #[test]
    fn seconds_past_the_hour_round_down_to_whole_minutes() {
        assert_eq!(late_minutes(at(8, 0, 59)), 0);
        assert_eq!(late_minutes(at(8, 15, 30)), 15);
    }

    #[test]
    fn penalty_steps_at_twenty_minute_blocks() {
        assert_eq!(late_penalty(1), dec!(50_000));
        assert_eq!(late_penalty(15), dec!(50_000));
        assert_eq!(late_penalty(20), dec!(50_000));
        assert_eq!(late_penalty(21), dec!(100_000));
        assert_eq!(late_penalty(40), dec!(100_000));
        assert_eq!(late_penalty(41), dec!(150_000));
    }

    #[test]
    fn penalty_is_monotonic_in_late_minutes() {
        let mut prev = Decimal::ZERO;
        for minutes in 0..=120 {
            let p = late_penalty(minutes);
            assert!(p >= prev, "penalty decreased at minute {minutes}");
            prev = p;
        }
    }

    #[test]
    fn leaving_at_shift_end_earns_nothing() {
        assert_eq!(overtime_minutes(at(18, 0, 0)), 0);
        assert_eq!(overtime_pay(0, SalaryBasis::Monthly, dec!(9_000_000)), Decimal::ZERO);
    }

    #[test]
    fn monthly_overtime_uses_the_flat_thirty_divisor() {
        // 9,000,000 / 30 / 24 = 12,500 per hour; half an hour at 1.5x
        assert_eq!(overtime_minutes(at(18, 30, 0)), 30);
        assert_eq!(
            overtime_pay(30, SalaryBasis::Monthly, dec!(9_000_000)),
            dec!(9375.00)
        );
    }

    #[test]
    fn daily_basis_takes_the_base_salary_as_day_wage() {
        // 240 / 24 = 10 per hour; one hour at 1.5x
        assert_eq!(overtime_pay(60, SalaryBasis::Daily, dec!(240)), dec!(15.00));
    }

    #[test]
    fn overtime_pay_rounds_half_up() {
        // 162 / 24 = 6.75 per hour; 60 min * 6.75 * 1.5 = 10.125 -> 10.13
        assert_eq!(overtime_pay(60, SalaryBasis::Daily, dec!(162)), dec!(10.13));
    }

    #[test]
    fn overtime_pay_increases_with_minutes() {
        let mut prev = Decimal::ZERO;
        for minutes in 1..=180 {
            let p = overtime_pay(minutes, SalaryBasis::Monthly, dec!(9_000_000));
            assert!(p > prev, "pay did not increase at minute {minutes}");
            prev = p;
        }
    }
}
