//! Ledger types and the rules that govern them. Nothing in here performs I/O;
//! the outside world is reached only through the traits in [`ports`].

pub mod account;
pub mod escrow;
pub mod events;
pub mod ids;
pub mod money;
pub mod order;
pub mod ports;
pub mod withdrawal;
