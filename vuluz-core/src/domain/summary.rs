//! Dashboard aggregates: transaction summary and cashflow buckets

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::Transaction;

/// Income/expense totals plus month-over-month balance movement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    #[serde(default)]
    pub total_income: Decimal,
    #[serde(default)]
    pub total_expense: Decimal,
    #[serde(default)]
    pub net_income: Decimal,
    #[serde(default)]
    pub current_balance: Decimal,
    #[serde(default)]
    pub previous_month_balance: Decimal,
    #[serde(default)]
    pub balance_change: Decimal,
}

/// First and last day of the calendar month before `today`
fn previous_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_of_this_month = today.with_day(1).unwrap_or(today);
    let last_of_previous = first_of_this_month - Duration::days(1);
    let first_of_previous = last_of_previous.with_day(1).unwrap_or(last_of_previous);
    (first_of_previous, last_of_previous)
}

/// Compute the summary from a transaction list
///
/// Failed transactions are ignored; pending ones count because their
/// effect is already in the balance.
pub fn summarize(
    transactions: &[Transaction],
    current_balance: Decimal,
    today: NaiveDate,
) -> TransactionSummary {
    let (month_start, month_end) = previous_month(today);

    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut balance_change = Decimal::ZERO;

    for tx in transactions.iter().filter(|t| !t.is_failed()) {
        if tx.transaction_type.is_incoming() {
            total_income += tx.amount;
        } else {
            total_expense += tx.amount;
        }

        let date = tx.date.date();
        if date >= month_start && date <= month_end {
            balance_change += tx.signed_amount();
        }
    }

    TransactionSummary {
        total_income,
        total_expense,
        net_income: total_income - total_expense,
        current_balance,
        previous_month_balance: current_balance - balance_change,
        balance_change,
    }
}

/// Bucket size for cashflow charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashflowPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl CashflowPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashflowPeriod::Daily => "daily",
            CashflowPeriod::Weekly => "weekly",
            CashflowPeriod::Monthly => "monthly",
            CashflowPeriod::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for CashflowPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashflowPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(CashflowPeriod::Daily),
            "weekly" => Ok(CashflowPeriod::Weekly),
            "monthly" => Ok(CashflowPeriod::Monthly),
            "quarterly" => Ok(CashflowPeriod::Quarterly),
            _ => Err(Error::validation(
                "Invalid period. Use 'daily', 'weekly', 'monthly', or 'quarterly'.",
            )),
        }
    }
}

/// One bucket of a cashflow chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowPoint {
    pub label: String,
    #[serde(default)]
    pub income: Decimal,
    #[serde(default)]
    pub expense: Decimal,
    #[serde(default)]
    pub net: Decimal,
}

const DAY_LABELS: [&str; 7] = [
    "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY",
];

const MONTH_LABELS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Monday-based week number where week 1 is the week containing January 1st
pub fn week_of_year(date: NaiveDate) -> u32 {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let sunday = monday + Duration::days(6);
    if sunday.year() > date.year() {
        // This week already contains January 1st of next year
        return 1;
    }
    let jan1 = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
    let offset = jan1.weekday().num_days_from_monday();
    (date.ordinal0() + offset) / 7 + 1
}

/// Bucket key: (sort order, label). `None` drops the transaction.
fn bucket(period: CashflowPeriod, date: NaiveDate, week: (NaiveDate, NaiveDate)) -> Option<(u32, String)> {
    match period {
        CashflowPeriod::Daily => {
            if date < week.0 || date > week.1 {
                return None;
            }
            let idx = date.weekday().num_days_from_monday();
            Some((idx, DAY_LABELS[idx as usize].to_string()))
        }
        CashflowPeriod::Weekly => {
            let week = week_of_year(date);
            Some((week, format!("Week {}", week)))
        }
        CashflowPeriod::Monthly => {
            let idx = date.month0();
            Some((idx, MONTH_LABELS[idx as usize].to_string()))
        }
        CashflowPeriod::Quarterly => {
            let quarter = date.month0() / 3 + 1;
            Some((quarter, format!("Q{}", quarter)))
        }
    }
}

/// Aggregate income and expense per period bucket
///
/// Daily covers Monday..Sunday of the week containing `today` and always
/// returns all seven days. Other periods return only buckets with activity,
/// in calendar order.
pub fn cashflow(transactions: &[Transaction], period: CashflowPeriod, today: NaiveDate) -> Vec<CashflowPoint> {
    let week_start = today.week(Weekday::Mon).first_day();
    let week_end = week_start + Duration::days(6);

    let mut buckets: BTreeMap<u32, CashflowPoint> = BTreeMap::new();

    if period == CashflowPeriod::Daily {
        for (idx, label) in DAY_LABELS.iter().enumerate() {
            buckets.insert(idx as u32, empty_point(label));
        }
    }

    for tx in transactions.iter().filter(|t| !t.is_failed()) {
        let Some((order, label)) = bucket(period, tx.date.date(), (week_start, week_end)) else {
            continue;
        };
        let point = buckets.entry(order).or_insert_with(|| empty_point(&label));
        if tx.transaction_type.is_incoming() {
            point.income += tx.amount;
        } else {
            point.expense += tx.amount;
        }
        point.net = point.income - point.expense;
    }

    buckets.into_values().collect()
}

fn empty_point(label: &str) -> CashflowPoint {
    CashflowPoint {
        label: label.to_string(),
        income: Decimal::ZERO,
        expense: Decimal::ZERO,
        net: Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransactionStatus, TransactionType};
    use chrono::NaiveDateTime;

    fn tx(t: TransactionType, units: i64, date: &str) -> Transaction {
        let date = NaiveDateTime::parse_from_str(&format!("{} 10:00:00", date), "%Y-%m-%d %H:%M:%S").unwrap();
        Transaction::new(format!("{}-{}", t, date), t, Decimal::new(units, 0), date)
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_summarize_totals_and_previous_month() {
        let txs = vec![
            tx(TransactionType::TopUp, 100_000, "2024-04-02"),
            tx(TransactionType::TransferOut, 40_000, "2024-04-10"),
            tx(TransactionType::TransferIn, 25_000, "2024-05-03"),
            tx(TransactionType::Payment, 5_000, "2024-05-04"),
        ];
        let summary = summarize(&txs, Decimal::new(80_000, 0), day("2024-05-15"));

        assert_eq!(summary.total_income, Decimal::new(125_000, 0));
        assert_eq!(summary.total_expense, Decimal::new(45_000, 0));
        assert_eq!(summary.net_income, Decimal::new(80_000, 0));
        // April moved the balance by +60,000
        assert_eq!(summary.balance_change, Decimal::new(60_000, 0));
        assert_eq!(summary.previous_month_balance, Decimal::new(20_000, 0));
    }

    #[test]
    fn test_summarize_ignores_failed() {
        let mut failed = tx(TransactionType::TransferOut, 30, "2024-05-01");
        failed.status = TransactionStatus::Failed;
        let summary = summarize(&[failed], Decimal::new(100, 0), day("2024-05-15"));
        assert_eq!(summary.total_expense, Decimal::ZERO);
    }

    #[test]
    fn test_previous_month_wraps_year() {
        assert_eq!(previous_month(day("2024-01-10")), (day("2023-12-01"), day("2023-12-31")));
    }

    #[test]
    fn test_daily_cashflow_has_all_days() {
        // 2024-05-15 is a Wednesday; week runs 13th..19th
        let txs = vec![
            tx(TransactionType::TopUp, 50_000, "2024-05-13"),
            tx(TransactionType::TransferOut, 20_000, "2024-05-13"),
            tx(TransactionType::TopUp, 99_000, "2024-05-06"),
        ];
        let points = cashflow(&txs, CashflowPeriod::Daily, day("2024-05-15"));
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].label, "MONDAY");
        assert_eq!(points[0].income, Decimal::new(50_000, 0));
        assert_eq!(points[0].net, Decimal::new(30_000, 0));
        assert_eq!(points[6].label, "SUNDAY");
        assert_eq!(points[6].net, Decimal::ZERO);
    }

    #[test]
    fn test_monthly_cashflow_in_calendar_order() {
        let txs = vec![
            tx(TransactionType::TopUp, 10, "2024-08-01"),
            tx(TransactionType::TopUp, 10, "2024-04-01"),
            tx(TransactionType::Payment, 3, "2024-04-20"),
        ];
        let points = cashflow(&txs, CashflowPeriod::Monthly, day("2024-09-01"));
        let labels: Vec<_> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["APR", "AUG"]);
        assert_eq!(points[0].net, Decimal::new(7, 0));
    }

    #[test]
    fn test_quarterly_labels() {
        let txs = vec![tx(TransactionType::TopUp, 1, "2024-11-01")];
        let points = cashflow(&txs, CashflowPeriod::Quarterly, day("2024-12-01"));
        assert_eq!(points[0].label, "Q4");
    }

    #[test]
    fn test_week_of_year() {
        // 2024-01-01 is a Monday
        assert_eq!(week_of_year(day("2024-01-01")), 1);
        assert_eq!(week_of_year(day("2024-01-08")), 2);
        // 2023-01-01 is a Sunday, so Jan 2nd starts week 2
        assert_eq!(week_of_year(day("2023-01-01")), 1);
        assert_eq!(week_of_year(day("2023-01-02")), 2);
        // Week of 2024-12-30 contains Jan 1st 2025
        assert_eq!(week_of_year(day("2024-12-31")), 1);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Weekly".parse::<CashflowPeriod>().unwrap(), CashflowPeriod::Weekly);
        assert!("yearly".parse::<CashflowPeriod>().is_err());
    }
}
