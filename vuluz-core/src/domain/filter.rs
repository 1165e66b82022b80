//! Transaction filter set and the fixed filtering pipeline
//!
//! The pipeline always runs in the same order:
//! type equality → date-from lower bound → date-to upper bound (end of day)
//! → case-insensitive search on description/counterparty → optional sort.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Transaction, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Amount,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort applied after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Backend `sortOrder` query value, e.g. `amount_desc`
    pub fn as_param(&self) -> String {
        self.to_string()
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let ordering = match self.key {
            SortKey::Amount => a.amount.cmp(&b.amount),
            SortKey::Date => a.date.cmp(&b.date),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Amount => "amount",
            SortKey::Date => "date",
        };
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}_{}", key, direction)
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (key, direction) = s
            .trim()
            .to_lowercase()
            .split_once('_')
            .map(|(k, d)| (k.to_string(), d.to_string()))
            .ok_or_else(|| Error::validation(format!("invalid sort order: {}", s)))?;

        let key = match key.as_str() {
            "amount" => SortKey::Amount,
            "date" => SortKey::Date,
            _ => return Err(Error::validation(format!("invalid sort key: {}", key))),
        };
        let direction = match direction.as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(Error::validation(format!("invalid sort direction: {}", direction))),
        };
        Ok(Self { key, direction })
    }
}

/// Transient filter set for browsing history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilters {
    pub transaction_type: Option<TransactionType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

impl TransactionFilters {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge a partial update into this filter set
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(t) = patch.transaction_type {
            self.transaction_type = t;
        }
        if let Some(d) = patch.date_from {
            self.date_from = d;
        }
        if let Some(d) = patch.date_to {
            self.date_to = d;
        }
        if let Some(s) = patch.search {
            // Empty search clears the field
            self.search = s.filter(|s| !s.trim().is_empty());
        }
        if let Some(s) = patch.sort {
            self.sort = s;
        }
    }

    /// Run the filtering pipeline over `source`, preserving source order
    /// unless a sort is set
    pub fn apply(&self, source: &[Transaction]) -> Vec<Transaction> {
        let lower = self.date_from.map(|d| d.and_time(NaiveTime::MIN));
        let upper = self.date_to.map(end_of_day);
        let term = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut result: Vec<Transaction> = source
            .iter()
            .filter(|tx| self.transaction_type.map_or(true, |t| tx.transaction_type == t))
            .filter(|tx| lower.map_or(true, |from| tx.date >= from))
            .filter(|tx| upper.map_or(true, |to| tx.date <= to))
            .filter(|tx| term.map_or(true, |term| tx.matches_search(term)))
            .cloned()
            .collect();

        if let Some(sort) = self.sort {
            // Stable: ties keep source order
            result.sort_by(|a, b| sort.compare(a, b));
        }

        result
    }

    /// Backend `/api/history` query parameters; unset fields are omitted
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(t) = self.transaction_type {
            params.push(("transactionType", t.label().to_string()));
        }
        if let Some(d) = self.date_from {
            params.push(("fromDate", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.date_to {
            params.push(("toDate", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(s) = &self.search {
            params.push(("search", s.clone()));
        }
        if let Some(sort) = self.sort {
            params.push(("sortOrder", sort.as_param()));
        }
        params
    }
}

/// Last representable instant of `date` (23:59:59.999)
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN))
}

/// Partial filter update
///
/// `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct FilterPatch {
    pub transaction_type: Option<Option<TransactionType>>,
    pub date_from: Option<Option<NaiveDate>>,
    pub date_to: Option<Option<NaiveDate>>,
    pub search: Option<Option<String>>,
    pub sort: Option<Option<SortOrder>>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_type(mut self, t: Option<TransactionType>) -> Self {
        self.transaction_type = Some(t);
        self
    }

    pub fn date_from(mut self, d: Option<NaiveDate>) -> Self {
        self.date_from = Some(d);
        self
    }

    pub fn date_to(mut self, d: Option<NaiveDate>) -> Self {
        self.date_to = Some(d);
        self
    }

    pub fn search(mut self, s: Option<impl Into<String>>) -> Self {
        self.search = Some(s.map(Into::into));
        self
    }

    pub fn sort(mut self, s: Option<SortOrder>) -> Self {
        self.sort = Some(s);
        self
    }
}

impl From<TransactionFilters> for FilterPatch {
    fn from(filters: TransactionFilters) -> Self {
        Self {
            transaction_type: Some(filters.transaction_type),
            date_from: Some(filters.date_from),
            date_to: Some(filters.date_to),
            search: Some(filters.search),
            sort: Some(filters.sort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tx(id: &str, t: TransactionType, cents: i64, date: &str, desc: &str, who: &str) -> Transaction {
        let date = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").unwrap();
        Transaction::new(id, t, Decimal::new(cents, 2), date)
            .with_description(desc)
            .with_counterparty(who)
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("tx_1001", TransactionType::TransferIn, 75000, "2023-11-20 14:30:00", "Payment from Sarah", "Sarah Smith"),
            tx("tx_1002", TransactionType::TransferOut, 12550, "2023-11-18 09:15:00", "Grocery shopping", "Michael Johnson"),
            tx("tx_1003", TransactionType::TopUp, 100000, "2023-11-15 11:45:00", "Monthly salary", "Bank Transfer"),
            tx("tx_1004", TransactionType::Payment, 4999, "2023-11-12 16:20:00", "Netflix subscription", "Netflix Inc."),
            tx("tx_1010", TransactionType::TopUp, 50000, "2023-10-20 14:20:00", "Bonus payment", "Bank Transfer"),
        ]
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty_filters_return_source_unchanged() {
        let source = sample();
        let filters = TransactionFilters::default();
        assert!(filters.is_empty());
        assert_eq!(filters.apply(&source), source);
    }

    #[test]
    fn test_type_filter() {
        let filters = TransactionFilters {
            transaction_type: Some(TransactionType::TopUp),
            ..Default::default()
        };
        let result = filters.apply(&sample());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|t| t.transaction_type == TransactionType::TopUp));
    }

    #[test]
    fn test_date_to_is_end_of_day_inclusive() {
        let filters = TransactionFilters {
            date_from: Some(day("2023-11-15")),
            date_to: Some(day("2023-11-20")),
            ..Default::default()
        };
        let ids: Vec<_> = filters.apply(&sample()).into_iter().map(|t| t.id).collect();
        // 14:30 on the 20th is still inside the range
        assert_eq!(ids, vec!["tx_1001", "tx_1002", "tx_1003"]);
    }

    #[test]
    fn test_search_is_case_insensitive_on_description_and_counterparty() {
        let filters = TransactionFilters {
            search: Some("bank".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.apply(&sample()).len(), 2);

        let filters = TransactionFilters {
            search: Some("GROCERY".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.apply(&sample())[0].id, "tx_1002");
    }

    #[test]
    fn test_sort_by_amount_desc() {
        let filters = TransactionFilters {
            sort: Some(SortOrder::new(SortKey::Amount, SortDirection::Desc)),
            ..Default::default()
        };
        let ids: Vec<_> = filters.apply(&sample()).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["tx_1003", "tx_1001", "tx_1010", "tx_1002", "tx_1004"]);
    }

    #[test]
    fn test_merge_and_clear_fields() {
        let mut filters = TransactionFilters::default();
        filters.merge(FilterPatch::new().transaction_type(Some(TransactionType::Payment)).search(Some("net")));
        assert_eq!(filters.transaction_type, Some(TransactionType::Payment));
        assert_eq!(filters.search.as_deref(), Some("net"));

        // Untouched fields survive, cleared fields go away
        filters.merge(FilterPatch::new().search(Some("")));
        assert_eq!(filters.transaction_type, Some(TransactionType::Payment));
        assert!(filters.search.is_none());
    }

    #[test]
    fn test_sort_order_round_trips_param() {
        let sort: SortOrder = "date_desc".parse().unwrap();
        assert_eq!(sort, SortOrder::new(SortKey::Date, SortDirection::Desc));
        assert_eq!(sort.as_param(), "date_desc");
        assert!("price_up".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_query_omits_unset_fields() {
        let filters = TransactionFilters {
            transaction_type: Some(TransactionType::TopUp),
            date_to: Some(day("2023-11-30")),
            ..Default::default()
        };
        let query = filters.to_query();
        assert_eq!(
            query,
            vec![
                ("transactionType", "Top Up".to_string()),
                ("toDate", "2023-11-30".to_string()),
            ]
        );
    }
}
