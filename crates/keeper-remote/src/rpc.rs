use async_trait::async_trait;
use base64::Engine;
use keeper_types::{Address, RoundSnapshot};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::{Anomaly, ReadError, RemoteError, Result};
use crate::pot_layout::decode_snapshot;
use crate::reader::StateReader;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<AccountInfoResult>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    context: RpcContext,
    value: Option<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct RpcContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    data: (String, String),
    owner: String,
    lamports: u64,
}

/// Reads the pot account over the ledger's JSON-RPC interface
#[derive(Clone)]
pub struct RpcStateReader {
    client: Client,
    url: String,
    program_id: Address,
    pot: Address,
    commitment: String,
}

impl RpcStateReader {
    pub fn new(
        url: impl Into<String>,
        program_id: Address,
        pot: Address,
        commitment: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RemoteError::InvalidEndpoint(url));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url,
            program_id,
            pot,
            commitment: commitment.into(),
        })
    }

    fn request_body(&self) -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAccountInfo",
            "params": [
                self.pot.to_string(),
                { "encoding": "base64", "commitment": self.commitment }
            ]
        })
    }
}

#[async_trait]
impl StateReader for RpcStateReader {
    async fn fetch(&self) -> std::result::Result<RoundSnapshot, ReadError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| ReadError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReadError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ReadError::Unavailable(e.to_string()))?;

        parse_account_response(&body, &self.program_id)
    }
}

/// Interpret a `getAccountInfo` response body.
///
/// RPC-level errors are transient; anything wrong with the account itself
/// is an anomaly.
pub fn parse_account_response(
    body: &str,
    program_id: &Address,
) -> std::result::Result<RoundSnapshot, ReadError> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| ReadError::Unavailable(format!("invalid JSON-RPC response: {e}")))?;

    if let Some(error) = response.error {
        return Err(ReadError::Unavailable(format!(
            "rpc error {}: {}",
            error.code, error.message
        )));
    }

    let result = response
        .result
        .ok_or_else(|| ReadError::Unavailable("response has neither result nor error".to_string()))?;

    let account = result.value.ok_or(Anomaly::AccountMissing)?;

    let owner: Address = account
        .owner
        .parse()
        .map_err(|e: keeper_types::KeeperError| Anomaly::Malformed(e.to_string()))?;
    if owner != *program_id {
        return Err(Anomaly::OwnerMismatch {
            expected: *program_id,
            actual: owner,
        }
        .into());
    }

    let (encoded, encoding) = account.data;
    if encoding != "base64" {
        return Err(Anomaly::Malformed(format!("unexpected encoding {encoding}")).into());
    }
    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Anomaly::Malformed(format!("base64: {e}")))?;

    let snapshot = decode_snapshot(&data)?;
    tracing::debug!(
        slot = result.context.slot,
        lamports = account.lamports,
        state = %snapshot.state,
        "fetched pot account"
    );
    Ok(snapshot)
}
