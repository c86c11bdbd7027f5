//! Chrome DevTools Protocol page driver.
//!
//! One tab per target, one dedicated websocket per tab, so exclusive
//! ownership holds all the way down to the transport. Commands are
//! id-correlated JSON messages; protocol events arriving on the same
//! socket are skipped while waiting for a response.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use wakefleet::driver::{DriverFactory, PageDriver, WakeOutcome, WakeStrategy};
use wakefleet::error::{KeeperError, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);
const WAKE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const EVALUATE_TIMEOUT: Duration = Duration::from_secs(5);

/// `/json/version` response subset.
#[derive(Debug, Deserialize)]
pub struct CdpVersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
    #[serde(rename = "Browser")]
    pub browser: Option<String>,
}

/// `/json/new` response subset.
#[derive(Debug, Deserialize)]
struct TabInfo {
    id: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// Resolves browser metadata from `{endpoint}/json/version`.
pub async fn probe(client: &reqwest::Client, endpoint: &str) -> Result<CdpVersionInfo> {
    let url = format!("{}/json/version", endpoint.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| KeeperError::Driver(format!("CDP endpoint {url} unreachable: {e}")))?;
    if !response.status().is_success() {
        return Err(KeeperError::Driver(format!(
            "unexpected status {} from {url}",
            response.status()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| KeeperError::Driver(format!("failed to parse {url} response: {e}")))
}

/// Creates one devtools tab (and driver) per target.
#[derive(Clone)]
pub struct CdpDriverFactory {
    endpoint: String,
    client: reqwest::Client,
}

impl CdpDriverFactory {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| KeeperError::Driver(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Checks the endpoint answers before the keeper starts its loop.
    pub async fn verify(&self) -> Result<CdpVersionInfo> {
        probe(&self.client, &self.endpoint).await
    }
}

#[async_trait]
impl DriverFactory for CdpDriverFactory {
    async fn create(&self, target: &str) -> Result<Box<dyn PageDriver>> {
        let url = format!("{}/json/new?about:blank", self.endpoint);
        let response = self
            .client
            .put(&url)
            .send()
            .await
            .map_err(|e| KeeperError::Driver(format!("failed to create tab: {e}")))?;
        if !response.status().is_success() {
            return Err(KeeperError::Driver(format!(
                "unexpected status {} creating tab",
                response.status()
            )));
        }
        let tab: TabInfo = response
            .json()
            .await
            .map_err(|e| KeeperError::Driver(format!("failed to parse tab info: {e}")))?;

        let (socket, _) = connect_async(tab.web_socket_debugger_url.as_str())
            .await
            .map_err(|e| KeeperError::Driver(format!("websocket connect failed: {e}")))?;
        debug!(target = "wakefleet", url = %target, tab = %tab.id, "opened devtools tab");

        Ok(Box::new(CdpDriver {
            tab_id: tab.id,
            socket,
            next_id: 0,
            endpoint: self.endpoint.clone(),
            client: self.client.clone(),
        }))
    }
}

pub struct CdpDriver {
    tab_id: String,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    endpoint: String,
    client: reqwest::Client,
}

impl CdpDriver {
    /// Sends one command and waits for its correlated response.
    async fn command(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let payload = json!({ "id": id, "method": method, "params": params });

        let exchange = async {
            self.socket
                .send(Message::Text(payload.to_string()))
                .await
                .map_err(|e| KeeperError::Driver(format!("{method} send failed: {e}")))?;

            loop {
                let Some(frame) = self.socket.next().await else {
                    return Err(KeeperError::Driver(format!(
                        "connection closed during {method}"
                    )));
                };
                let frame =
                    frame.map_err(|e| KeeperError::Driver(format!("{method} receive failed: {e}")))?;
                let Message::Text(text) = frame else { continue };
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                // Events carry no id; stale responses carry a lower one.
                if value.get("id").and_then(Value::as_u64) != Some(id) {
                    continue;
                }
                if let Some(error) = value.get("error") {
                    let message = error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown protocol error");
                    return Err(KeeperError::Driver(format!("{method}: {message}")));
                }
                return Ok(value.get("result").cloned().unwrap_or(Value::Null));
            }
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| KeeperError::Timeout {
                ms: timeout.as_millis() as u64,
                condition: method.to_string(),
            })?
    }

    async fn evaluate(&mut self, expression: &str, timeout: Duration) -> Result<Value> {
        let result = self
            .command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
                timeout,
            )
            .await?;
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn selector_present(&mut self, selector: &str) -> Result<bool> {
        let escaped = escape_selector(selector);
        let value = self
            .evaluate(
                &format!("document.querySelector('{escaped}') !== null"),
                EVALUATE_TIMEOUT,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click_selector(&mut self, selector: &str) -> Result<()> {
        let escaped = escape_selector(selector);
        self.evaluate(
            &format!("document.querySelector('{escaped}').click()"),
            EVALUATE_TIMEOUT,
        )
        .await
        .map(|_| ())
    }
}

fn escape_selector(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let result = self
            .command("Page.navigate", json!({ "url": url }), timeout)
            .await
            .map_err(|e| KeeperError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        match result.get("errorText").and_then(Value::as_str) {
            Some(error_text) if !error_text.is_empty() => Err(KeeperError::Navigation {
                url: url.to_string(),
                message: error_text.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn reload(&mut self, timeout: Duration) -> Result<()> {
        self.command("Page.reload", json!({}), timeout)
            .await
            .map(|_| ())
    }

    async fn await_load(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            // Evaluation errors mid-navigation are expected; keep polling
            // until the deadline.
            if let Ok(value) = self.evaluate("document.readyState", EVALUATE_TIMEOUT).await {
                if value.as_str() == Some("complete") {
                    return Ok(());
                }
            }
            if Instant::now() + READY_POLL_INTERVAL >= deadline {
                return Err(KeeperError::Timeout {
                    ms: timeout.as_millis() as u64,
                    condition: "document.readyState == complete".to_string(),
                });
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn wake_if_sleeping(
        &mut self,
        strategies: &[WakeStrategy],
        timeout: Duration,
    ) -> Result<WakeOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            for strategy in strategies {
                if self.selector_present(&strategy.selector).await.unwrap_or(false) {
                    self.click_selector(&strategy.selector).await?;
                    return Ok(WakeOutcome::Activated {
                        strategy: strategy.name.clone(),
                    });
                }
            }
            if Instant::now() + WAKE_POLL_INTERVAL >= deadline {
                return Ok(WakeOutcome::Absent);
            }
            tokio::time::sleep(WAKE_POLL_INTERVAL).await;
        }
    }

    async fn send_activity(&mut self) {
        // A tiny pointer move plus a one-pixel scroll resets the idle timer.
        let _ = self
            .command(
                "Input.dispatchMouseEvent",
                json!({ "type": "mouseMoved", "x": 200, "y": 300 }),
                EVALUATE_TIMEOUT,
            )
            .await;
        let _ = self.evaluate("window.scrollBy(0, 1)", EVALUATE_TIMEOUT).await;
    }

    async fn close(&mut self) {
        let url = format!("{}/json/close/{}", self.endpoint, self.tab_id);
        if let Err(err) = self.client.get(&url).send().await {
            warn!(target = "wakefleet", tab = %self.tab_id, error = %err, "failed to close devtools tab");
        }
        let _ = self.socket.close(None).await;
    }
}
