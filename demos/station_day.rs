//! One day at a fuel station: open a shift, close it, reconcile, pay and report

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use station_core::utils::MemoryStorage;
use station_core::{
    ClosingReading, CoreConfig, Employee, Expense, FixedClock, FuelPrice, NewShift,
    OpeningReading, PaymentMethod, ReportType, StationCore, StationStorage, Transaction,
    TracingActivitySink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn core_at(
    storage: &MemoryStorage,
    now: NaiveDateTime,
) -> Result<StationCore<MemoryStorage>, Box<dyn std::error::Error>> {
    Ok(StationCore::with_config(
        storage.clone(),
        CoreConfig::default(),
        Arc::new(FixedClock(now)),
        Arc::new(TracingActivitySink),
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "station_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("⛽ Station Core - A Day at the Pumps\n");

    let day = NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("invalid date")?;
    let at = |h: u32, m: u32| day.and_hms_opt(h, m, 0).ok_or("invalid time");

    // 1. Station setup
    let storage = MemoryStorage::new();
    storage.set_fuel_price(FuelPrice::new(
        "st-1".to_string(),
        "Petrol".to_string(),
        BigDecimal::from_str("1.50")?,
    )?)?;
    storage.set_fuel_price(FuelPrice::new(
        "st-1".to_string(),
        "Diesel".to_string(),
        BigDecimal::from_str("1.20")?,
    )?)?;
    storage.add_employee(Employee::new(
        "emp-1".to_string(),
        "st-1".to_string(),
        BigDecimal::from_str("15.00")?,
    )?)?;

    // 2. Open the morning shift
    let core = core_at(&storage, at(6, 0)?)?;
    let opened = core
        .start_shift(NewShift {
            station_id: "st-1".to_string(),
            employee_id: "emp-1".to_string(),
            dispenser_ids: vec!["pump-1".to_string(), "pump-2".to_string()],
            starting_cash: BigDecimal::from(200),
            opening_readings: vec![
                OpeningReading {
                    dispenser_id: "pump-1".to_string(),
                    fuel_type: "Petrol".to_string(),
                    start_reading: BigDecimal::from(1000),
                },
                OpeningReading {
                    dispenser_id: "pump-2".to_string(),
                    fuel_type: "Diesel".to_string(),
                    start_reading: BigDecimal::from(500),
                },
            ],
        })
        .await?;
    println!("  ✓ Shift {} opened at {}", opened.shift.id, opened.shift.start_time);

    // 3. Sales and an expense during the shift
    for (amount, method) in [("60.00", PaymentMethod::Cash), ("35.00", PaymentMethod::Card)] {
        let sale = Transaction::new(
            "st-1".to_string(),
            opened.shift.id.clone(),
            BigDecimal::from_str(amount)?,
            method,
            at(10, 30)?,
        )?;
        storage.save_transaction(&sale).await?;
    }
    let expense = Expense::new(
        "st-1".to_string(),
        BigDecimal::from_str("12.00")?,
        day,
        "cleaning".to_string(),
    )?;
    storage.save_expense(&expense).await?;

    // 4. Close with the evening counter values
    let closing: Vec<ClosingReading> = opened
        .readings
        .iter()
        .map(|r| ClosingReading {
            reading_id: r.id.clone(),
            end_reading: if r.fuel_type == "Petrol" {
                BigDecimal::from(1050)
            } else {
                BigDecimal::from(520)
            },
        })
        .collect();
    let core = core_at(&storage, at(14, 0)?)?;
    let closed = core
        .close_shift(&opened.shift.id, BigDecimal::from(295), closing)
        .await?;
    println!("  ✓ Shift closed at {:?}", closed.shift.end_time);

    // 5. Reconcile and resolve
    let outcome = core.calculate_sales_mismatch(&opened.shift.id).await?;
    for line in &outcome.lines {
        println!(
            "    {} {}: {} units × {} = {}",
            line.dispenser_id, line.fuel_type, line.volume, line.unit_price, line.amount
        );
    }
    println!(
        "  ⚖️  Expected {}, actual {}, mismatch {}",
        outcome.mismatch.expected_amount(),
        outcome.mismatch.actual_amount(),
        outcome.mismatch.mismatch_amount()
    );

    let resolved = core
        .resolve_sales_mismatch(&outcome.mismatch.id, "emp-7", "Pump 3 drift")
        .await?;
    println!(
        "  ✓ Resolved by {} ({})",
        resolved.resolved_by().unwrap_or("-"),
        resolved.resolution_note().unwrap_or("-")
    );

    // 6. Payroll
    let statement = core
        .calculate_employee_salary("emp-1", at(0, 0)?, at(23, 59)?)
        .await?;
    println!(
        "  💵 {} worked {} h across {} shift(s): {}",
        statement.employee_id, statement.total_hours, statement.shift_count, statement.salary
    );

    // 7. Daily report
    let report = core
        .generate_financial_report("st-1", ReportType::Daily, day)
        .await?;
    println!(
        "  📊 {} report {}: sales {}, expenses {}, profit {}",
        report.report_type,
        report.report_date,
        report.sales_amount(),
        report.expenses_amount(),
        report.profit_amount()
    );
    println!("\n{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
