//! Client task gate
//!
//! A task may only be marked complete when a wallet is connected and holds
//! at least [`MIN_TASK_BALANCE_SOL`].

mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use rpc::{RpcError, SolanaRpcClient};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub const MIN_TASK_BALANCE_SOL: f64 = 0.1;

const MIN_TASK_BALANCE_LAMPORTS: u64 = LAMPORTS_PER_SOL / 10;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Why a task was stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopAction {
    NotEnoughSol,
    WalletNotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGateResult {
    pub status: bool,
    pub is_stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_action: Option<StopAction>,
}

impl TaskGateResult {
    fn completed() -> Self {
        Self {
            status: true,
            is_stopped: false,
            stop_action: None,
        }
    }

    fn stopped(action: StopAction) -> Self {
        Self {
            status: false,
            is_stopped: true,
            stop_action: Some(action),
        }
    }

    fn failed() -> Self {
        Self {
            status: false,
            is_stopped: false,
            stop_action: None,
        }
    }
}

/// Wallet connection state and connect-modal control
pub trait WalletAdapter: Send + Sync {
    fn is_connected(&self) -> bool;

    fn public_key(&self) -> Option<String>;

    fn is_modal_visible(&self) -> bool;

    fn set_modal_visible(&self, visible: bool);
}

/// On-chain balance lookup in lamports
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_balance(&self, address: &str) -> Result<u64, RpcError>;
}

pub struct TaskGate {
    wallet: Arc<dyn WalletAdapter>,
    balances: Arc<dyn BalanceSource>,
}

impl TaskGate {
    pub fn new(wallet: Arc<dyn WalletAdapter>, balances: Arc<dyn BalanceSource>) -> Self {
        Self { wallet, balances }
    }

    /// Decide whether the current task can be completed
    ///
    /// Never fails: RPC errors yield `{status: false}`.
    pub async fn complete(&self) -> TaskGateResult {
        let public_key = match self.wallet.public_key() {
            Some(key) if self.wallet.is_connected() => key,
            _ => {
                if !self.wallet.is_modal_visible() {
                    self.wallet.set_modal_visible(true);
                }
                return TaskGateResult::stopped(StopAction::WalletNotConnected);
            }
        };

        let lamports = match self.balances.get_balance(&public_key).await {
            Ok(lamports) => lamports,
            Err(e) => {
                tracing::warn!(public_key = %public_key, error = %e, "Balance query failed");
                return TaskGateResult::failed();
            }
        };

        if lamports < MIN_TASK_BALANCE_LAMPORTS {
            tracing::debug!(
                public_key = %public_key,
                balance_sol = lamports_to_sol(lamports),
                "Balance below task threshold"
            );
            return TaskGateResult::stopped(StopAction::NotEnoughSol);
        }

        TaskGateResult::completed()
    }
}
