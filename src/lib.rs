//! # Transfer Ledger
//!
//! A balance ledger that lets registered users send funds to each other or
//! request funds subject to the payer's approval.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Uses 2 decimal places via `rust_decimal`
//! - **Atomic mutation**: affordability check, debit, credit and transfer
//!   record are one unit; no balance ever goes negative
//! - **Closed lifecycle**: `Pending -> Approved | Rejected`, each at most once
//! - **Pluggable store**: the engine depends on the [`LedgerStore`] trait
//!
//! ## Example
//!
//! ```
//! use std::str::FromStr;
//! use transfer_ledger::{LedgerConfig, Money, TransferEngine, TransferStatus};
//!
//! let engine = TransferEngine::with_config(LedgerConfig {
//!     opening_balance: Money::from_str("1000.00").unwrap(),
//! });
//! let alice = engine.register_user("alice").unwrap();
//! let bob = engine.register_user("bob").unwrap();
//!
//! let sent = engine.send(alice.id, bob.id, Money::from_str("100").unwrap()).unwrap();
//! assert_eq!(sent.status, TransferStatus::Approved);
//! assert_eq!(engine.get_balance(alice.id).unwrap().to_string(), "900.00");
//! ```

pub mod account;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod mutator;
pub mod script;
pub mod store;
pub mod transfer;
pub mod validator;

pub use account::{Account, User, UserId};
pub use config::LedgerConfig;
pub use decimal::Money;
pub use engine::TransferEngine;
pub use error::{ErrorKind, LedgerError, Result};
pub use script::{Command, CommandRecord};
pub use store::{InMemoryLedger, LedgerStore};
pub use transfer::{
    NewTransfer, Transfer, TransferDetails, TransferId, TransferKind, TransferStatus,
};
