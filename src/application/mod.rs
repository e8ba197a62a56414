//! Application layer containing the core business logic orchestration.
//!
//! `MarketplaceEngine` is the entry point for callers; its operations are
//! split by concern across `orders` and `wallet`. The `SettlementScheduler`
//! drives the same wallet operations from a timer.

pub mod engine;
mod orders;
pub mod retry;
pub mod settlement;
mod wallet;
