//! Transfer records and their lifecycle states.

use crate::account::UserId;
use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use std::fmt;
use std::str::FromStr;

/// Transfer identifier, assigned by the store on creation.
pub type TransferId = u32;

/// Who initiated the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Payer-initiated; funds move immediately on creation.
    Send,

    /// Payee-initiated ask; funds move only once the payer approves.
    Request,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Send => "Send",
            TransferKind::Request => "Request",
        }
    }

    /// Status a freshly created transfer of this kind starts in.
    pub fn initial_status(&self) -> TransferStatus {
        match self {
            TransferKind::Send => TransferStatus::Approved,
            TransferKind::Request => TransferStatus::Pending,
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "send" => Ok(TransferKind::Send),
            "request" => Ok(TransferKind::Request),
            _ => Err(LedgerError::UnknownTransferKind(s.trim().to_string())),
        }
    }
}

/// Transfer lifecycle state.
///
/// `Pending` is the only non-terminal state. Legal transitions:
///
/// ```text
/// Pending ──► Approved
///    │
///    └──────► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "Pending",
            TransferStatus::Approved => "Approved",
            TransferStatus::Rejected => "Rejected",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Approved | TransferStatus::Rejected)
    }

    /// Checks that `self -> target` is a legal transition for transfer `id`.
    ///
    /// Only `Pending -> Approved` and `Pending -> Rejected` are allowed.
    /// Asking for `Pending` as a target is a validation error; leaving a
    /// terminal state is an invalid-state error.
    pub fn transition(self, id: TransferId, target: TransferStatus) -> Result<TransferStatus> {
        if target == TransferStatus::Pending {
            return Err(LedgerError::InvalidStatusTarget(target.to_string()));
        }
        if self.is_terminal() {
            return Err(LedgerError::InvalidState {
                transfer: id,
                status: self,
            });
        }
        Ok(target)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransferStatus::Pending),
            "approved" => Ok(TransferStatus::Approved),
            "rejected" => Ok(TransferStatus::Rejected),
            _ => Err(LedgerError::InvalidStatusTarget(s.trim().to_string())),
        }
    }
}

/// A persisted transfer.
///
/// Immutable except for `status`, which the store changes at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: TransferId,

    /// The payer. For a request this is the user being asked to pay.
    pub sender_id: UserId,

    /// The payee.
    pub recipient_id: UserId,

    /// Always strictly positive.
    pub amount: Money,

    pub kind: TransferKind,

    pub status: TransferStatus,
}

impl Transfer {
    /// Returns `true` if `user` is the sender or the recipient.
    pub fn involves(&self, user: UserId) -> bool {
        self.sender_id == user || self.recipient_id == user
    }

    /// Returns `true` if this transfer is waiting on `payer`'s decision.
    pub fn is_pending_for(&self, payer: UserId) -> bool {
        self.status == TransferStatus::Pending && self.sender_id == payer
    }
}

/// A transfer joined with both parties' usernames, as shown in history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDetails {
    pub transfer: Transfer,
    pub sender_username: String,
    pub recipient_username: String,
}

/// A validated transfer not yet persisted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub amount: Money,
    pub kind: TransferKind,
    pub status: TransferStatus,
}

impl NewTransfer {
    /// Builds a draft in the kind's initial status.
    pub fn new(sender_id: UserId, recipient_id: UserId, amount: Money, kind: TransferKind) -> Self {
        NewTransfer {
            sender_id,
            recipient_id,
            amount,
            kind,
            status: kind.initial_status(),
        }
    }

    /// Attaches the store-assigned id.
    pub fn into_transfer(self, id: TransferId) -> Transfer {
        Transfer {
            id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            amount: self.amount,
            kind: self.kind,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_by_kind() {
        assert_eq!(TransferKind::Send.initial_status(), TransferStatus::Approved);
        assert_eq!(TransferKind::Request.initial_status(), TransferStatus::Pending);
    }

    #[test]
    fn test_parse_kind_is_case_insensitive() {
        assert_eq!("send".parse::<TransferKind>().unwrap(), TransferKind::Send);
        assert_eq!(" REQUEST ".parse::<TransferKind>().unwrap(), TransferKind::Request);
        assert!(matches!(
            "gift".parse::<TransferKind>(),
            Err(LedgerError::UnknownTransferKind(k)) if k == "gift"
        ));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Approved".parse::<TransferStatus>().unwrap(), TransferStatus::Approved);
        assert_eq!("rejected".parse::<TransferStatus>().unwrap(), TransferStatus::Rejected);
        assert!(matches!(
            "Done".parse::<TransferStatus>(),
            Err(LedgerError::InvalidStatusTarget(_))
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Approved.is_terminal());
        assert!(TransferStatus::Rejected.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
    }

    #[test]
    fn test_pending_transitions_to_terminal() {
        let pending = TransferStatus::Pending;
        assert_eq!(
            pending.transition(1, TransferStatus::Approved).unwrap(),
            TransferStatus::Approved
        );
        assert_eq!(
            pending.transition(1, TransferStatus::Rejected).unwrap(),
            TransferStatus::Rejected
        );
    }

    #[test]
    fn test_terminal_states_cannot_transition() {
        for status in [TransferStatus::Approved, TransferStatus::Rejected] {
            for target in [TransferStatus::Approved, TransferStatus::Rejected] {
                assert!(matches!(
                    status.transition(7, target),
                    Err(LedgerError::InvalidState { transfer: 7, status: s }) if s == status
                ));
            }
        }
    }

    #[test]
    fn test_pending_is_not_a_target() {
        assert!(matches!(
            TransferStatus::Pending.transition(1, TransferStatus::Pending),
            Err(LedgerError::InvalidStatusTarget(_))
        ));
    }

    #[test]
    fn test_involvement_queries() {
        let transfer = NewTransfer::new(1, 2, Money::from_cents(100), TransferKind::Request)
            .into_transfer(3001);

        assert_eq!(transfer.id, 3001);
        assert!(transfer.involves(1));
        assert!(transfer.involves(2));
        assert!(!transfer.involves(3));
        assert!(transfer.is_pending_for(1));
        assert!(!transfer.is_pending_for(2));
    }
}
