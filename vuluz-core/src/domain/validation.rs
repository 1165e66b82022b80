//! Form validation rules for login, registration and money commands

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::format_idr;
use crate::domain::result::{Error, Result};
use crate::domain::Registration;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").expect("account pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email.trim())
}

/// At least 8 characters with at least one letter and one digit
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Alphanumeric, dash or underscore; at least 6 characters
pub fn is_valid_account_number(account: &str) -> bool {
    account_re().is_match(account.trim())
}

/// Exactly six ASCII digits
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.is_empty() {
        return Err(Error::validation("PIN is required"));
    }
    if !is_valid_pin(pin) {
        return Err(Error::validation("PIN must be exactly 6 digits"));
    }
    Ok(())
}

pub fn validate_account_number(account: &str) -> Result<()> {
    if account.trim().is_empty() {
        return Err(Error::validation("Recipient account is required"));
    }
    if !is_valid_account_number(account) {
        return Err(Error::validation(
            "Please enter a valid account number (at least 6 alphanumeric characters)",
        ));
    }
    Ok(())
}

pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::validation("Email and password are required"));
    }
    if !is_valid_email(email) {
        return Err(Error::validation("Please enter a valid email address"));
    }
    Ok(())
}

/// Check every registration field before anything is sent
pub fn validate_registration(form: &Registration) -> Result<()> {
    if form.full_name.trim().is_empty() {
        return Err(Error::validation("Full name is required"));
    }
    if form.user_name.trim().is_empty() {
        return Err(Error::validation("Username is required"));
    }
    if !is_valid_email(&form.email) {
        return Err(Error::validation("Please enter a valid email address"));
    }
    if !is_valid_password(&form.password) {
        return Err(Error::validation(
            "Password must be at least 8 characters and contain numbers and letters",
        ));
    }
    validate_pin(&form.pin)
}

/// Inclusive amount bounds for a money command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountLimits {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Transfers: Rp 3.000 up to Rp 99.999.999
    pub fn transfer() -> Self {
        Self::new(Decimal::new(3_000, 0), Decimal::new(99_999_999, 0))
    }

    /// Top-ups: minimum Rp 10.000, same ceiling as transfers
    pub fn top_up() -> Self {
        Self::new(Decimal::new(10_000, 0), Decimal::new(99_999_999, 0))
    }

    pub fn check(&self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::validation("Please enter a valid amount greater than zero"));
        }
        if amount < self.min {
            return Err(Error::validation(format!(
                "Amount must be at least {}",
                format_idr(self.min)
            )));
        }
        if amount > self.max {
            return Err(Error::validation(format!(
                "Amount cannot exceed {}",
                format_idr(self.max)
            )));
        }
        Ok(())
    }
}

/// Funding source for a top-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "PayPal")]
    PayPal,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::PayPal,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::PayPal => "PayPal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "creditcard" | "credit" => Ok(PaymentMethod::CreditCard),
            "debitcard" | "debit" => Ok(PaymentMethod::DebitCard),
            "banktransfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "paypal" => Ok(PaymentMethod::PayPal),
            _ => Err(Error::validation(format!(
                "Unknown payment method '{}'. Use credit-card, debit-card, bank-transfer or paypal.",
                s
            ))),
        }
    }
}
