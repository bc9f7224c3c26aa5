//! Error types for the transfer ledger.

use crate::account::UserId;
use crate::decimal::Money;
use crate::transfer::{TransferId, TransferKind, TransferStatus};
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse classification of a [`LedgerError`], for callers that map failures
/// onto an outer protocol (exit codes, HTTP statuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, rejected before any mutation.
    Validation,
    /// Payer cannot cover the amount; nothing was mutated.
    InsufficientFunds,
    /// Unknown user or transfer.
    NotFound,
    /// Status change attempted on a transfer that is no longer pending.
    InvalidState,
    /// The store could not complete the operation.
    Storage,
    /// Problems with the CLI input itself (file, CSV, arguments, config).
    Input,
}

/// Errors that can occur during ledger operation.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("User {user} cannot send or request funds to or from themselves")]
    SelfTransfer { user: UserId },

    #[error("Transfer amount must be greater than zero, got {amount}")]
    NonPositiveAmount { amount: Money },

    /// Status target other than Approved/Rejected
    #[error("Invalid status target '{0}': expected Approved or Rejected")]
    InvalidStatusTarget(String),

    /// Draft whose status is not its kind's starting status
    #[error("{kind} transfers start {expected}, not {status}")]
    InitialStatusMismatch {
        kind: TransferKind,
        expected: TransferStatus,
        status: TransferStatus,
    },

    #[error("Unknown transfer type '{0}': expected Send or Request")]
    UnknownTransferKind(String),

    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Invalid username '{0}'")]
    InvalidUsername(String),

    /// Crediting the recipient would exceed the representable range
    #[error("Balance overflow crediting user {user}")]
    BalanceOverflow { user: UserId },

    #[error("Insufficient funds: user {user} has {balance}, needs {amount}")]
    InsufficientFunds {
        user: UserId,
        balance: Money,
        amount: Money,
    },

    /// Approve/reject on a transfer that already reached a terminal state
    #[error("Transfer {transfer} is {status}, only Pending transfers can change status")]
    InvalidState {
        transfer: TransferId,
        status: TransferStatus,
    },

    #[error("No account for user {0}")]
    UserNotFound(UserId),

    #[error("No user named '{0}'")]
    UnknownUsername(String),

    #[error("Transfer {0} was not found")]
    TransferNotFound(TransferId),

    /// Underlying store unreachable or write failed
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid command record in a script
    #[error("Invalid command at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: transfer-ledger <script.csv>")]
    MissingArgument,
}

impl LedgerError {
    /// Classifies this error into the ledger's failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::SelfTransfer { .. }
            | LedgerError::NonPositiveAmount { .. }
            | LedgerError::InvalidStatusTarget(_)
            | LedgerError::InitialStatusMismatch { .. }
            | LedgerError::UnknownTransferKind(_)
            | LedgerError::DuplicateUsername(_)
            | LedgerError::InvalidUsername(_)
            | LedgerError::BalanceOverflow { .. } => ErrorKind::Validation,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InvalidState { .. } => ErrorKind::InvalidState,
            LedgerError::UserNotFound(_)
            | LedgerError::UnknownUsername(_)
            | LedgerError::TransferNotFound(_) => ErrorKind::NotFound,
            LedgerError::Storage(_) => ErrorKind::Storage,
            LedgerError::Io(_)
            | LedgerError::Csv(_)
            | LedgerError::InvalidConfig(_)
            | LedgerError::InvalidRecord { .. }
            | LedgerError::MissingArgument => ErrorKind::Input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LedgerError::SelfTransfer { user: 1001 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::InsufficientFunds {
                user: 1001,
                balance: Money::ZERO,
                amount: Money::from_cents(1),
            }
            .kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(LedgerError::TransferNotFound(3001).kind(), ErrorKind::NotFound);
        assert_eq!(
            LedgerError::InvalidState {
                transfer: 3001,
                status: TransferStatus::Approved,
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            LedgerError::Storage("lock poisoned".into()).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_messages() {
        let err = LedgerError::InvalidState {
            transfer: 3002,
            status: TransferStatus::Rejected,
        };
        assert_eq!(
            err.to_string(),
            "Transfer 3002 is Rejected, only Pending transfers can change status"
        );

        let err = LedgerError::InitialStatusMismatch {
            kind: TransferKind::Send,
            expected: TransferStatus::Approved,
            status: TransferStatus::Pending,
        };
        assert_eq!(err.to_string(), "Send transfers start Approved, not Pending");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
