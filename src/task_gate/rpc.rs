//! Minimal Solana JSON-RPC client for balance queries

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use super::BalanceSource;

/// Balance query errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Malformed RPC response: {0}")]
    Malformed(String),
}

/// `getBalance` over Solana JSON-RPC
#[derive(Clone)]
pub struct SolanaRpcClient {
    rpc_url: String,
    client: Client,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

/// Extract lamports from a `getBalance` response body
pub(crate) fn parse_balance_response(resp: &Value) -> Result<u64, RpcError> {
    if let Some(err) = resp.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(RpcError::Rpc(message));
    }

    resp.get("result")
        .and_then(|result| result.get("value"))
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::Malformed("missing result.value".to_string()))
}

#[async_trait]
impl BalanceSource for SolanaRpcClient {
    async fn get_balance(&self, address: &str) -> Result<u64, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address, { "commitment": "confirmed" }]
        });

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .json::<Value>()
            .await?;

        parse_balance_response(&resp)
    }
}
