//! Wallet backend HTTP client
//!
//! Talks to the Vuluz REST backend. All bodies are JSON; authenticated
//! endpoints carry `Authorization: Bearer <token>`. Error responses carry
//! a `message` field which is surfaced to the user unchanged.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CashflowPeriod, CashflowPoint, Credentials, Favorite, Registration, Transaction,
    TransactionFilters, TransactionSummary, TransactionType, User,
};
use crate::ports::{AuthToken, CommandReceipt, TopUpRequest, TransferRequest, WalletApi};

/// Fallback shown when an error body carries no usable message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Environment variable overriding the backend base URL
pub const API_BASE_URL_ENV: &str = "VULUZ_API_BASE_URL";

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// =============================================================================
// Wire models
// =============================================================================

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default, alias = "transactionId", deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
}

impl StatusResponse {
    fn is_ok(&self) -> bool {
        matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            None | Some("ok") | Some("success")
        )
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    wallet_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    balance: Option<Decimal>,
}

impl From<ProfileResponse> for User {
    fn from(p: ProfileResponse) -> Self {
        let mut user = User::new(p.id.unwrap_or_default(), p.full_name, p.email);
        user.user_name = p.user_name;
        user.wallet_number = p.wallet_number;
        user.balance = p.balance.unwrap_or_default();
        user.avatar_url = p.avatar_url;
        user.gender = p.gender;
        user
    }
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    balance: Option<Decimal>,
}

/// One row of `/api/history`; amounts are signed, types are human labels
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(alias = "date", deserialize_with = "deserialize_datetime")]
    pub transaction_date: NaiveDateTime,
    #[serde(alias = "type")]
    pub transaction_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "counterparty")]
    pub account: Option<String>,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    /// Echo of the `Idempotency-Key` header the command was sent with
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
}

impl HistoryEntry {
    /// Map to a domain transaction; `index` keeps synthesized ids unique
    pub fn into_transaction(self, index: usize) -> Result<Transaction> {
        let transaction_type: TransactionType = self.transaction_type.parse()?;
        let id = self.id.unwrap_or_else(|| {
            format!("h{}-{}", self.transaction_date.and_utc().timestamp_millis(), index)
        });
        Ok(Transaction::new(id, transaction_type, self.amount, self.transaction_date)
            .with_description(self.description.unwrap_or_default())
            .with_counterparty(self.account.unwrap_or_default())
            .with_idempotency_key(self.idempotency_key))
    }
}

#[derive(Debug, Deserialize)]
struct FavoritesResponse {
    #[serde(default)]
    data: Vec<FavoriteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteEntry {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    wallet_number: String,
    #[serde(default)]
    wallet_name: Option<String>,
    #[serde(default, alias = "fullName")]
    owner_name: Option<String>,
}

impl From<FavoriteEntry> for Favorite {
    fn from(f: FavoriteEntry) -> Self {
        let mut favorite = Favorite::new(
            f.id.unwrap_or_else(|| f.wallet_number.clone()),
            f.owner_name.unwrap_or_default(),
            f.wallet_number,
        );
        favorite.wallet_name = f.wallet_name;
        favorite
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFavoriteResponse {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerResponse {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferBody<'a> {
    to_wallet_number: JsonValue,
    amount: JsonValue,
    notes: &'a str,
    pin: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopUpBody<'a> {
    amount: JsonValue,
    payment_method: &'a str,
    pin: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteBody {
    wallet_number: JsonValue,
}

// =============================================================================
// Lenient field decoders
// =============================================================================

/// Deserialize ID that can be number or string
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => Ok(s),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize optional ID that can be number or string
fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

fn amount_from_json<E: serde::de::Error>(value: JsonValue) -> std::result::Result<Decimal, E> {
    match value {
        JsonValue::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|e| E::custom(format!("invalid decimal: {}", e))),
        JsonValue::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| E::custom(format!("invalid decimal: {}", e))),
        _ => Err(E::custom("expected number or string for amount")),
    }
}

/// Deserialize amount that can be number or string
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    amount_from_json(value)
}

fn deserialize_optional_amount<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Null) | None => Ok(None),
        Some(v) => amount_from_json(v).map(Some),
    }
}

/// Parse a backend timestamp: epoch millis or an ISO-like string
pub fn parse_backend_datetime(value: &JsonValue) -> Option<NaiveDateTime> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.with_timezone(&Local).naive_local()),
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Local).naive_local());
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

fn deserialize_datetime<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    parse_backend_datetime(&value)
        .ok_or_else(|| D::Error::custom(format!("unrecognized timestamp: {}", value)))
}

/// JSON number for an amount; the backend rejects quoted amounts
fn json_amount(amount: Decimal) -> JsonValue {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        if let Some(i) = normalized.to_i64() {
            return JsonValue::from(i);
        }
    }
    normalized
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(normalized.to_string()))
}

/// Wallet numbers are numeric on the backend; keep anything else as text
fn json_wallet_number(wallet_number: &str) -> JsonValue {
    let trimmed = wallet_number.trim();
    trimmed
        .parse::<u64>()
        .map(JsonValue::from)
        .unwrap_or_else(|_| JsonValue::String(trimmed.to_string()))
}

/// Extract the user-facing message from an error body
pub fn error_message_from_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_ERROR_MESSAGE.to_string();
    }
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Object(map)) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
        Ok(JsonValue::String(s)) if !s.trim().is_empty() => s,
        Ok(_) => GENERIC_ERROR_MESSAGE.to_string(),
        // Plain-text bodies are short human messages on this backend
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => trimmed.to_string(),
        Err(_) => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

// =============================================================================
// HTTP client
// =============================================================================

/// REST implementation of [`WalletApi`]
#[derive(Debug)]
pub struct HttpWalletApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl HttpWalletApi {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            anyhow::bail!("API base URL cannot be empty");
        }
        Url::parse(trimmed).with_context(|| format!("Invalid API base URL: {}", trimmed))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            timeout,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.token().is_none() {
            return Err(Error::NotAuthenticated);
        }
        Ok(self.request(method, path))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| self.map_request_error(e))?;
        self.check_response_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(builder).await?;
        let parsed = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", what))?;
        Ok(parsed)
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Network("Unable to connect to the wallet server".to_string())
        } else {
            Error::Network(format!("Request failed: {}", error))
        }
    }

    /// Turn non-2xx responses into domain errors
    async fn check_response_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::api(status.as_u16(), error_message_from_body(&body)))
    }

    /// Money commands answer 200 with a status field; anything else is a rejection
    fn receipt(response: StatusResponse, fallback: &str) -> Result<CommandReceipt> {
        if !response.is_ok() {
            return Err(Error::api(200, response.message_or(GENERIC_ERROR_MESSAGE)));
        }
        Ok(CommandReceipt {
            message: response.message_or(fallback),
            transaction_id: response.id,
        })
    }
}

#[async_trait]
impl WalletApi for HttpWalletApi {
    fn name(&self) -> &str {
        "http"
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthToken> {
        let body = LoginBody {
            email: credentials.email.trim(),
            password: &credentials.password,
        };
        let response: StatusResponse = self
            .send_json(self.request(Method::POST, "/api/auth/login").json(&body), "login")
            .await?;

        let ok = response.status.as_deref().map(str::to_uppercase).as_deref() == Some("OK");
        match (ok, response.token.clone()) {
            (true, Some(token)) if !token.is_empty() => Ok(AuthToken {
                token,
                message: response.message,
            }),
            _ => Err(Error::api(200, response.message_or("Login failed"))),
        }
    }

    async fn register(&self, form: &Registration) -> Result<String> {
        let response: StatusResponse = self
            .send_json(
                self.request(Method::POST, "/api/auth/register").json(form),
                "register",
            )
            .await?;
        if !response.is_ok() {
            return Err(Error::api(200, response.message_or("Registration failed")));
        }
        Ok(response.message_or("Registration successful"))
    }

    async fn profile(&self) -> Result<User> {
        let profile: ProfileResponse = self
            .send_json(self.authed(Method::GET, "/api/profile")?, "profile")
            .await?;
        Ok(profile.into())
    }

    async fn balance(&self) -> Result<Decimal> {
        let response: BalanceResponse = self
            .send_json(self.authed(Method::GET, "/api/balance")?, "balance")
            .await?;
        Ok(response.balance.unwrap_or_default())
    }

    async fn history(&self, filters: &TransactionFilters) -> Result<Vec<Transaction>> {
        let builder = self
            .authed(Method::GET, "/api/history")?
            .query(&filters.to_query());
        let entries: Vec<HistoryEntry> = self.send_json(builder, "history").await?;
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| entry.into_transaction(i))
            .collect()
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<CommandReceipt> {
        let body = TransferBody {
            to_wallet_number: json_wallet_number(&request.to_wallet_number),
            amount: json_amount(request.amount),
            notes: &request.notes,
            pin: &request.pin,
        };
        let builder = self
            .authed(Method::POST, "/api/transfer")?
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string())
            .json(&body);
        let response: StatusResponse = self.send_json(builder, "transfer").await?;
        Self::receipt(response, "Transfer successful")
    }

    async fn top_up(&self, request: &TopUpRequest) -> Result<CommandReceipt> {
        let body = TopUpBody {
            amount: json_amount(request.amount),
            payment_method: request.payment_method.label(),
            pin: &request.pin,
            description: &request.description,
        };
        let builder = self
            .authed(Method::POST, "/api/topup")?
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string())
            .json(&body);
        let response: StatusResponse = self.send_json(builder, "top-up").await?;
        Self::receipt(response, "Top up successful")
    }

    async fn summary(&self) -> Result<TransactionSummary> {
        self.send_json(self.authed(Method::GET, "/api/summary")?, "summary")
            .await
    }

    async fn cashflow(&self, period: CashflowPeriod) -> Result<Vec<CashflowPoint>> {
        let builder = self
            .authed(Method::GET, "/api/cashflow")?
            .query(&[("period", period.as_str())]);
        self.send_json(builder, "cashflow").await
    }

    async fn favorites(&self) -> Result<Vec<Favorite>> {
        let response: FavoritesResponse = self
            .send_json(self.authed(Method::GET, "/api/getfavorites")?, "favorites")
            .await?;
        Ok(response.data.into_iter().map(Favorite::from).collect())
    }

    async fn add_favorite(&self, wallet_number: &str) -> Result<Favorite> {
        let body = FavoriteBody {
            wallet_number: json_wallet_number(wallet_number),
        };
        let response: AddFavoriteResponse = self
            .send_json(
                self.authed(Method::POST, "/api/favorite")?.json(&body),
                "favorite",
            )
            .await?;

        let failed = matches!(
            response.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("failed") | Some("error")
        );
        if failed {
            return Err(Error::api(
                200,
                response
                    .message
                    .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            ));
        }

        let wallet_number = wallet_number.trim().to_string();
        Ok(Favorite::new(
            response.id.unwrap_or_else(|| wallet_number.clone()),
            response.full_name.unwrap_or_default(),
            wallet_number,
        ))
    }

    async fn remove_favorite(&self, wallet_number: &str) -> Result<()> {
        let builder = self
            .authed(Method::DELETE, "/api/favorite/delete")?
            .query(&[("walletNumber", wallet_number.trim())]);
        self.send(builder).await?;
        Ok(())
    }

    async fn wallet_owner(&self, wallet_number: &str) -> Result<String> {
        let path = format!("/api/wallet/owner/{}", wallet_number.trim());
        let response: OwnerResponse = self
            .send_json(self.authed(Method::GET, &path)?, "wallet owner")
            .await?;
        response
            .full_name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::not_found(format!("wallet {}", wallet_number.trim())))
    }
}
