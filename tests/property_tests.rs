//! Property tests for the station figures

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, Weekday};
use proptest::prelude::*;

use station_core::{
    compute_salary, expected_sales, hours_worked, price_line, utils::round_amount,
    FinancialReport, FuelPrice, MeterReading, ReportPeriod, ReportType, SalesMismatch,
    StationError,
};

fn cents(n: i64) -> BigDecimal {
    BigDecimal::new(n.into(), 2)
}

fn reading(start: &BigDecimal, end: &BigDecimal) -> MeterReading {
    let mut reading = MeterReading::new(
        "shift-1".to_string(),
        "pump-1".to_string(),
        "Petrol".to_string(),
        start.clone(),
    )
    .unwrap();
    reading.end_reading = Some(end.clone());
    reading
}

fn report_type_strategy() -> impl Strategy<Value = ReportType> {
    prop_oneof![
        Just(ReportType::Daily),
        Just(ReportType::Weekly),
        Just(ReportType::Monthly),
        Just(ReportType::Yearly),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A reading contributes exactly `(end - start) * price`, never negative
    #[test]
    fn prop_reading_contribution(
        start in 0i64..=10_000_000i64,
        delta in 0i64..=500_000i64,
        price in 1i64..=100_000i64
    ) {
        let start = cents(start);
        let end = &start + cents(delta);
        let price = FuelPrice::new("st-1".to_string(), "Petrol".to_string(), cents(price)).unwrap();

        let line = price_line(&reading(&start, &end), &price).unwrap();

        prop_assert_eq!(&line.amount, &((&end - &start) * &price.price_per_unit));
        prop_assert!(line.amount >= BigDecimal::from(0));
    }

    /// A counter that ran backwards is rejected instead of priced
    #[test]
    fn prop_backwards_counter_rejected(
        start in 1i64..=10_000_000i64,
        drop in 1i64..=10_000i64,
        price in 1i64..=100_000i64
    ) {
        let start = cents(start);
        let end = &start - cents(drop);
        let price = FuelPrice::new("st-1".to_string(), "Petrol".to_string(), cents(price)).unwrap();

        let result = price_line(&reading(&start, &end), &price);
        prop_assert!(matches!(result, Err(StationError::InvalidMeterDelta { .. })), "expected InvalidMeterDelta, got {:?}", result);
    }

    /// Expected sales is the rounded sum of the priced lines
    #[test]
    fn prop_expected_sales_is_rounded_sum(
        deltas in prop::collection::vec((0i64..=100_000i64, 1i64..=1_000i64), 0..6)
    ) {
        let lines: Vec<_> = deltas
            .iter()
            .map(|(delta, price)| {
                let price = FuelPrice::new("st-1".to_string(), "Diesel".to_string(), BigDecimal::new((*price).into(), 3)).unwrap();
                price_line(&reading(&BigDecimal::from(0), &cents(*delta)), &price).unwrap()
            })
            .collect();

        let raw = lines
            .iter()
            .fold(BigDecimal::from(0), |acc, line| acc + &line.amount);
        prop_assert_eq!(expected_sales(&lines, 2), round_amount(&raw, 2));
    }

    /// The signed mismatch is always `actual - expected`
    #[test]
    fn prop_mismatch_is_actual_minus_expected(
        expected in 0i64..=100_000_000i64,
        actual in 0i64..=100_000_000i64
    ) {
        let mismatch = SalesMismatch::new("shift-1".to_string(), cents(expected), cents(actual));

        prop_assert_eq!(mismatch.mismatch_amount(), &(cents(actual) - cents(expected)));
        prop_assert!(!mismatch.is_resolved());
    }

    /// Profit is always `sales - expenses`, and may be negative
    #[test]
    fn prop_profit_is_sales_minus_expenses(
        sales in 0i64..=100_000_000i64,
        expenses in 0i64..=100_000_000i64
    ) {
        let report = FinancialReport::new(
            "st-1".to_string(),
            ReportType::Monthly,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            cents(sales),
            cents(expenses),
        );

        prop_assert_eq!(report.profit_amount(), &(cents(sales) - cents(expenses)));
    }

    /// Salary is `round(Σ hours × rate)` for quarter-hour shifts
    #[test]
    fn prop_salary_matches_hours_times_rate(
        quarters in prop::collection::vec(0i64..=64i64, 0..10),
        rate in 0i64..=10_000i64
    ) {
        let hours: Vec<BigDecimal> = quarters
            .iter()
            .map(|q| hours_worked(Duration::minutes(q * 15)))
            .collect();
        let rate = cents(rate);

        let total_quarters: i64 = quarters.iter().sum();
        let expected = round_amount(
            &(BigDecimal::from(total_quarters) * &rate / BigDecimal::from(4)),
            2,
        );
        prop_assert_eq!(compute_salary(&hours, &rate, 2), expected);
    }

    /// Report windows tile the calendar without gaps or overlap
    #[test]
    fn prop_report_windows_are_contiguous(
        report_type in report_type_strategy(),
        offset in 0i64..=3_000i64
    ) {
        let anchor = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset);
        let period = ReportPeriod::containing(report_type, anchor, Weekday::Mon).unwrap();
        let next = ReportPeriod::containing(report_type, period.end, Weekday::Mon).unwrap();

        prop_assert!(period.contains(anchor));
        prop_assert!(!period.contains(period.end));
        prop_assert_eq!(next.start, period.end);
    }
}
