//! Wallet Auth Server Library
//!
//! Solana wallet challenge/response authentication: nonce-backed sign-in
//! challenges, ed25519 signature verification, per-method auth engines and
//! the HTTP API around them, plus the client-side task gate.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod task_gate;
pub mod users;
