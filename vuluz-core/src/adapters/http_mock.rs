//! Mock wallet backend for testing the HTTP client
//!
//! A small blocking HTTP server on a random port that mimics the wallet
//! backend's endpoints and response shapes, and records what it received.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

pub const MOCK_TOKEN: &str = "mock_token";
pub const MOCK_PIN: &str = "123456";
pub const MOCK_WALLET: &str = "114516277";
const MOCK_PASSWORD: &str = "password1";

const OWNERS: &[(&str, &str)] = &[
    ("114516277", "John Doe"),
    ("223344556", "Budi Santoso"),
    ("334455667", "Siti Rahma"),
];

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: String,
}

struct MockState {
    balance: i64,
    favorites: Vec<(u64, String)>,
    next_favorite_id: u64,
    /// Success bodies by idempotency key, replayed on a repeat
    receipts: HashMap<String, String>,
    requests: Vec<RecordedRequest>,
}

/// Mock wallet server for testing
pub struct MockWalletServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockWalletServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState {
            balance: 150_000,
            favorites: vec![(1, "223344556".to_string())],
            next_favorite_id: 2,
            receipts: HashMap::new(),
            requests: Vec::new(),
        }));

        // Set listener to non-blocking for graceful shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_path(&self) -> Option<String> {
        self.requests().last().map(|r| r.path.clone())
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.requests().last().and_then(|r| r.authorization.clone())
    }

    /// Idempotency keys received, in arrival order
    pub fn idempotency_keys(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.idempotency_key)
            .collect()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockWalletServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one full request: headers, then `Content-Length` bytes of body
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];
    loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(split) = text.find("\r\n\r\n") {
            let head = text[..split].to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= split + 4 + content_length {
                let body = String::from_utf8_lossy(&data[split + 4..split + 4 + content_length]).to_string();
                return Some((head, body));
            }
        }
    }
    None
}

fn header(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|l| {
        let (n, v) = l.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim().to_string())
    })
}

fn query_param(path: &str, name: &str) -> Option<String> {
    let query = path.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.replace('+', " ").replace("%20", " "))
    })
}

fn owner_of(wallet: &str) -> Option<&'static str> {
    OWNERS.iter().find(|(w, _)| *w == wallet).map(|(_, n)| *n)
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, r#"{"message": "Invalid request"}"#);
        return;
    }
    let method = parts[0].to_string();
    let path = parts[1].to_string();
    let authorization = header(&head, "authorization");

    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        idempotency_key: header(&head, "idempotency-key"),
        body: body.clone(),
    });

    let route = path.split('?').next().unwrap_or(&path).to_string();
    let json_body: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);

    // Public endpoints
    match (method.as_str(), route.as_str()) {
        ("POST", "/api/auth/login") => {
            if json_body["password"] == MOCK_PASSWORD {
                let resp = json!({"status": "OK", "token": MOCK_TOKEN, "message": "Login success"});
                send_response(&mut stream, 200, &resp.to_string());
            } else {
                let resp = json!({"status": "Failed", "message": "Invalid email or password"});
                send_response(&mut stream, 400, &resp.to_string());
            }
            return;
        }
        ("POST", "/api/auth/register") => {
            let resp = json!({"status": "OK", "message": "Register success"});
            send_response(&mut stream, 200, &resp.to_string());
            return;
        }
        _ => {}
    }

    let expected = format!("Bearer {}", MOCK_TOKEN);
    if authorization.as_deref() != Some(expected.as_str()) {
        send_response(&mut stream, 401, "Invalid token or user not found");
        return;
    }

    match (method.as_str(), route.as_str()) {
        ("GET", "/api/profile") => {
            let resp = json!({
                "status": "OK", "id": 7, "email": "john@example.com", "userName": "john",
                "fullName": "John Doe", "gender": "male", "avatarUrl": null,
                "walletNumber": 114516277u64, "balance": state.balance, "walletName": "Personal"
            });
            send_response(&mut stream, 200, &resp.to_string());
        }
        ("GET", "/api/balance") => {
            let resp = json!({"balance": state.balance, "walletNumber": 114516277u64, "status": "OK"});
            send_response(&mut stream, 200, &resp.to_string());
        }
        ("GET", "/api/history") => {
            let rows = vec![
                json!({"transactionDate": 1_715_594_400_000i64, "transactionType": "Top Up",
                       "description": "Salary", "account": "Bank Transfer", "amount": 100000}),
                json!({"transactionDate": "2024-05-12T09:00:00", "transactionType": "Transfer Out",
                       "description": "Dinner", "account": "Budi Santoso", "amount": -30000}),
            ];
            let wanted = query_param(&path, "transactionType");
            let filtered: Vec<JsonValue> = rows
                .into_iter()
                .filter(|r| wanted.as_deref().map_or(true, |t| r["transactionType"] == t))
                .collect();
            send_response(&mut stream, 200, &JsonValue::Array(filtered).to_string());
        }
        ("POST", "/api/transfer") => {
            let key = header(&head, "idempotency-key");
            if let Some(body) = key.as_ref().and_then(|k| state.receipts.get(k)) {
                send_response(&mut stream, 200, body);
                return;
            }
            let amount = json_body["amount"].as_i64().unwrap_or(0);
            let to = json_body["toWalletNumber"].to_string().trim_matches('"').to_string();
            if json_body["pin"] != MOCK_PIN {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Invalid PIN"}"#);
            } else if to == MOCK_WALLET {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"You cant transfer to yourself"}"#);
            } else if amount > state.balance {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Balance is not enough"}"#);
            } else {
                state.balance -= amount;
                let body = r#"{"status":"Success","message":"Transfer success"}"#;
                if let Some(key) = key {
                    state.receipts.insert(key, body.to_string());
                }
                send_response(&mut stream, 200, body);
            }
        }
        ("POST", "/api/topup") => {
            let key = header(&head, "idempotency-key");
            if let Some(body) = key.as_ref().and_then(|k| state.receipts.get(k)) {
                send_response(&mut stream, 200, body);
                return;
            }
            let amount = json_body["amount"].as_i64().unwrap_or(0);
            if json_body["pin"] != MOCK_PIN {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Invalid PIN"}"#);
            } else if amount < 10_000 {
                send_response(
                    &mut stream,
                    400,
                    r#"{"status":"Failed","message":"Top-up amount must be greater than Rp.10.000"}"#,
                );
            } else {
                state.balance += amount;
                let body = r#"{"status":"Success","message":"Top up success"}"#;
                if let Some(key) = key {
                    state.receipts.insert(key, body.to_string());
                }
                send_response(&mut stream, 200, body);
            }
        }
        ("GET", "/api/summary") => {
            let resp = json!({
                "totalIncome": 100000, "totalExpense": 30000, "netIncome": 70000,
                "currentBalance": state.balance, "previousMonthBalance": 80000, "balanceChange": 70000
            });
            send_response(&mut stream, 200, &resp.to_string());
        }
        ("GET", "/api/cashflow") => {
            let resp = json!([
                {"label": "JAN", "income": 100000, "expense": 30000, "net": 70000},
                {"label": "FEB", "income": 0, "expense": 0, "net": 0}
            ]);
            send_response(&mut stream, 200, &resp.to_string());
        }
        ("GET", "/api/getfavorites") => {
            let data: Vec<JsonValue> = state
                .favorites
                .iter()
                .map(|(id, wallet)| {
                    json!({"id": id, "walletNumber": wallet.parse::<u64>().unwrap_or(0),
                           "walletName": "Personal", "ownerName": owner_of(wallet).unwrap_or("")})
                })
                .collect();
            send_response(&mut stream, 200, &json!({ "data": data }).to_string());
        }
        ("POST", "/api/favorite") => {
            let wallet = json_body["walletNumber"].to_string().trim_matches('"').to_string();
            if wallet == MOCK_WALLET {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Cannot add your own wallet"}"#);
            } else if state.favorites.iter().any(|(_, w)| *w == wallet) {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Wallet is already in favorites"}"#);
            } else if let Some(owner) = owner_of(&wallet) {
                let id = state.next_favorite_id;
                state.next_favorite_id += 1;
                state.favorites.push((id, wallet));
                let resp = json!({"id": id, "fullName": owner, "status": "OK", "message": "Favorite added"});
                send_response(&mut stream, 200, &resp.to_string());
            } else {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Wallet not found"}"#);
            }
        }
        ("DELETE", "/api/favorite/delete") => {
            let wallet = query_param(&path, "walletNumber").unwrap_or_default();
            let before = state.favorites.len();
            state.favorites.retain(|(_, w)| *w != wallet);
            if state.favorites.len() < before {
                send_response(&mut stream, 200, r#"{"status":"OK","message":"Favorite deleted"}"#);
            } else {
                send_response(&mut stream, 400, r#"{"status":"Failed","message":"Favorite not found"}"#);
            }
        }
        ("GET", r) if r.starts_with("/api/wallet/owner/") => {
            let wallet = r.trim_start_matches("/api/wallet/owner/");
            match owner_of(wallet) {
                Some(owner) => send_response(&mut stream, 200, &json!({ "fullName": owner }).to_string()),
                None => send_response(&mut stream, 404, r#"{"message":"Wallet not found"}"#),
            }
        }
        _ => send_response(&mut stream, 404, r#"{"message": "Endpoint not found"}"#),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
