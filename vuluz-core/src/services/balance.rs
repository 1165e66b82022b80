//! Balance view - formatted balance figures derived from wallet state

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::money::{change_percent, format_idr, format_signed_idr};
use crate::domain::TransactionSummary;
use crate::services::WalletState;

/// Balance card: current balance against the previous month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub balance: Decimal,
    pub previous_balance: Decimal,
    /// Month-over-month change in percent, two decimals
    pub change_percent: Decimal,
    pub formatted_balance: String,
    pub formatted_previous: String,
    pub formatted_change: String,
}

impl BalanceView {
    pub fn new(balance: Decimal, previous_balance: Decimal) -> Self {
        Self {
            balance,
            previous_balance,
            change_percent: change_percent(balance, previous_balance),
            formatted_balance: format_idr(balance),
            formatted_previous: format_idr(previous_balance),
            formatted_change: format_signed_idr(balance - previous_balance),
        }
    }

    /// Derive from state; without a summary the previous balance is zero
    pub fn from_state(state: &WalletState) -> Self {
        let previous = state
            .summary
            .as_ref()
            .map(|s| s.previous_month_balance)
            .unwrap_or_default();
        Self::new(state.balance, previous)
    }

    pub fn from_summary(summary: &TransactionSummary) -> Self {
        Self::new(summary.current_balance, summary.previous_month_balance)
    }

    pub fn is_up(&self) -> bool {
        self.change_percent >= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_against_previous_month() {
        let view = BalanceView::new(Decimal::new(1_250_000, 0), Decimal::new(1_000_000, 0));
        assert_eq!(view.change_percent.to_string(), "25.00");
        assert_eq!(view.formatted_balance, "Rp 1.250.000");
        assert_eq!(view.formatted_change, "+Rp 250.000");
        assert!(view.is_up());
    }

    #[test]
    fn test_zero_previous_balance() {
        let view = BalanceView::new(Decimal::new(50_000, 0), Decimal::ZERO);
        assert_eq!(view.change_percent.to_string(), "0.00");
    }

    #[test]
    fn test_from_state_without_summary() {
        let state = WalletState {
            balance: Decimal::new(75_000, 0),
            ..Default::default()
        };
        let view = BalanceView::from_state(&state);
        assert_eq!(view.previous_balance, Decimal::ZERO);
        assert_eq!(view.formatted_previous, "Rp 0");
    }

    #[test]
    fn test_decline() {
        let summary = TransactionSummary {
            current_balance: Decimal::new(900, 0),
            previous_month_balance: Decimal::new(1_000, 0),
            ..Default::default()
        };
        let view = BalanceView::from_summary(&summary);
        assert_eq!(view.change_percent.to_string(), "-10.00");
        assert_eq!(view.formatted_change, "-Rp 100");
        assert!(!view.is_up());
    }
}
