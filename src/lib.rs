//! Order lifecycle and wallet settlement engine for a two-sided marketplace.
//!
//! Orders move through a fixed state machine; approving one credits the
//! freelancer's wallet. Wallets track earnings and settled withdrawals, and
//! derive pending and available balances from the live withdrawal requests.
//! A background sweep settles withdrawals once their holding window ends.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;
