//! Transfer lifecycle engine.
//!
//! Orchestrates validation, balance mutation and persistence behind the
//! operations users actually perform: register, send, request, approve,
//! reject and the read-side queries. The engine holds no balances itself;
//! every state change goes through one atomic [`LedgerStore`] call.

use crate::account::{Account, User, UserId};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::store::{InMemoryLedger, LedgerStore};
use crate::transfer::{
    NewTransfer, Transfer, TransferDetails, TransferId, TransferKind, TransferStatus,
};
use crate::validator;
use log::{debug, info, warn};
use std::collections::HashMap;

/// The transfer lifecycle engine.
///
/// # State machine
///
/// - `Send` transfers are validated, funded and persisted as `Approved` in one step.
///   If the payer cannot afford them nothing is persisted.
/// - `Request` transfers are persisted as `Pending` with no balance effect.
/// - A `Pending` transfer is approved (balances move) or rejected (nothing moves)
///   exactly once. An approval the payer can no longer afford fails and the
///   transfer stays `Pending`.
///
/// Failures are reported to the caller as-is; nothing is retried.
pub struct TransferEngine<S = InMemoryLedger> {
    store: S,
    config: LedgerConfig,
}

impl TransferEngine<InMemoryLedger> {
    /// Creates an engine over an empty in-memory ledger with default configuration.
    pub fn new() -> Self {
        Self::with_store(InMemoryLedger::new(), LedgerConfig::default())
    }

    /// Creates an engine over an empty in-memory ledger.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_store(InMemoryLedger::new(), config)
    }
}

impl Default for TransferEngine<InMemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LedgerStore> TransferEngine<S> {
    /// Creates an engine over an existing store.
    pub fn with_store(store: S, config: LedgerConfig) -> Self {
        TransferEngine { store, config }
    }

    /// The underlying store, for callers that need raw access (seeding, inspection).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a user; the new account gets the configured opening balance.
    pub fn register_user(&self, username: &str) -> Result<User> {
        self.store.register(username, self.config.opening_balance)
    }

    /// Current balance of `user`, or `UserNotFound`.
    pub fn get_balance(&self, user: UserId) -> Result<Money> {
        self.store.balance(user)
    }

    /// Balance lookup by (case-insensitive) username.
    pub fn balance_of(&self, username: &str) -> Result<Money> {
        let user = self.find_user(username)?;
        self.store.balance(user.id)
    }

    /// Every registered user, ordered by id.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.store.users()
    }

    /// Case-insensitive username lookup; `UnknownUsername` if nobody matches.
    pub fn find_user(&self, username: &str) -> Result<User> {
        self.store
            .user_by_name(username)?
            .ok_or_else(|| LedgerError::UnknownUsername(username.trim().to_string()))
    }

    /// Every account, ordered by owner id.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.store.accounts()
    }

    /// Whether `user` can currently cover `amount`.
    ///
    /// Advisory only: the authoritative check runs again inside the atomic
    /// mutation.
    pub fn can_afford(&self, user: UserId, amount: Money) -> Result<bool> {
        self.store.can_afford(user, amount)
    }

    /// Creates a transfer of the given kind.
    ///
    /// `sender` is always the payer. For a `Request`, that is the user being
    /// asked to pay and `recipient` is the requester.
    pub fn create_transfer(
        &self,
        sender: UserId,
        recipient: UserId,
        amount: Money,
        kind: TransferKind,
    ) -> Result<Transfer> {
        validator::validate_draft(sender, recipient, amount)?;

        let draft = NewTransfer::new(sender, recipient, amount, kind);
        match self.store.record_transfer(draft) {
            Ok(transfer) => {
                info!(
                    "Transfer {} created: {} {} from {} to {} ({})",
                    transfer.id,
                    transfer.kind,
                    transfer.amount,
                    transfer.sender_id,
                    transfer.recipient_id,
                    transfer.status
                );
                Ok(transfer)
            }
            Err(e) => {
                debug!(
                    "{} of {} from {} to {} refused: {}",
                    kind, amount, sender, recipient, e
                );
                Err(e)
            }
        }
    }

    /// Sends `amount` from `from` to `to` immediately.
    pub fn send(&self, from: UserId, to: UserId, amount: Money) -> Result<Transfer> {
        self.create_transfer(from, to, amount, TransferKind::Send)
    }

    /// `requester` asks `payer` for `amount`; nothing moves until approval.
    pub fn request(&self, requester: UserId, payer: UserId, amount: Money) -> Result<Transfer> {
        self.create_transfer(payer, requester, amount, TransferKind::Request)
    }

    /// Approves a pending transfer, moving its funds.
    ///
    /// If the payer can no longer afford it the call fails with
    /// `InsufficientFunds` and the transfer remains `Pending`.
    pub fn approve(&self, id: TransferId) -> Result<Transfer> {
        self.resolve(id, TransferStatus::Approved)
    }

    /// Rejects a pending transfer. No balance changes.
    pub fn reject(&self, id: TransferId) -> Result<Transfer> {
        self.resolve(id, TransferStatus::Rejected)
    }

    /// String-targeted status change; `status` must name Approved or Rejected.
    pub fn set_transfer_status(&self, id: TransferId, status: &str) -> Result<bool> {
        let target: TransferStatus = status.parse()?;
        self.resolve(id, target).map(|_| true)
    }

    fn resolve(&self, id: TransferId, target: TransferStatus) -> Result<Transfer> {
        match self.store.resolve(id, target) {
            Ok(transfer) => {
                info!("Transfer {} is now {}", id, transfer.status);
                Ok(transfer)
            }
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                warn!("Transfer {} left Pending: {}", id, e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// All transfers `user` sent or received, ordered by id.
    pub fn list_transfers(&self, user: UserId) -> Result<Vec<Transfer>> {
        self.store.balance(user)?;
        let transfers = self.store.transfers_for(user)?;
        debug!("User {} has {} transfers", user, transfers.len());
        Ok(transfers)
    }

    /// Pending transfers awaiting `user`'s decision as payer, ordered by id.
    pub fn list_pending_transfers(&self, user: UserId) -> Result<Vec<Transfer>> {
        self.store.balance(user)?;
        self.store.pending_for(user)
    }

    /// Looks up a transfer by id. Access is not scoped to the caller here.
    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer> {
        self.store
            .transfer(id)?
            .ok_or(LedgerError::TransferNotFound(id))
    }

    /// Every transfer in the ledger, ordered by id.
    pub fn all_transfers(&self) -> Result<Vec<Transfer>> {
        let transfers = self.store.all_transfers()?;
        debug!("Ledger holds {} transfers", transfers.len());
        Ok(transfers)
    }

    /// `user`'s transfers with both parties named, ordered by id.
    pub fn transfer_history(&self, user: UserId) -> Result<Vec<TransferDetails>> {
        let transfers = self.list_transfers(user)?;
        self.describe(transfers)
    }

    /// Attaches sender and recipient usernames to each transfer.
    ///
    /// Users are never removed, so every party of an already-read transfer
    /// is present in the user list read afterwards.
    pub fn describe(&self, transfers: Vec<Transfer>) -> Result<Vec<TransferDetails>> {
        let names = self.usernames()?;
        let name = |id: UserId| {
            names
                .get(&id)
                .cloned()
                .ok_or(LedgerError::UserNotFound(id))
        };

        transfers
            .into_iter()
            .map(|transfer| {
                Ok(TransferDetails {
                    sender_username: name(transfer.sender_id)?,
                    recipient_username: name(transfer.recipient_id)?,
                    transfer,
                })
            })
            .collect()
    }

    pub(crate) fn usernames(&self) -> Result<HashMap<UserId, String>> {
        Ok(self
            .list_users()?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    /// Three users each opened with 1000.00.
    fn engine() -> (TransferEngine, UserId, UserId, UserId) {
        let engine = TransferEngine::with_config(LedgerConfig {
            opening_balance: money("1000.00"),
        });
        let a = engine.register_user("alice").unwrap().id;
        let b = engine.register_user("bob").unwrap().id;
        let c = engine.register_user("carol").unwrap().id;
        (engine, a, b, c)
    }

    fn balance(engine: &TransferEngine, user: UserId) -> String {
        engine.get_balance(user).unwrap().to_string()
    }

    #[test]
    fn test_register_uses_configured_opening_balance() {
        let (engine, a, _, _) = engine();
        assert_eq!(balance(&engine, a), "1000.00");

        let plain = TransferEngine::new();
        let user = plain.register_user("dave").unwrap();
        assert_eq!(plain.get_balance(user.id).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_send_moves_funds_immediately() {
        let (engine, a, b, _) = engine();
        let transfer = engine.send(a, b, money("100.00")).unwrap();

        assert_eq!(transfer.status, TransferStatus::Approved);
        assert_eq!(transfer.kind, TransferKind::Send);
        assert_eq!(balance(&engine, a), "900.00");
        assert_eq!(balance(&engine, b), "1100.00");
    }

    #[test]
    fn test_send_beyond_balance_is_rejected_without_record() {
        let (engine, a, b, _) = engine();
        let result = engine.send(a, b, money("1000000.00"));

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(balance(&engine, a), "1000.00");
        assert_eq!(balance(&engine, b), "1000.00");
        assert!(engine.list_transfers(a).unwrap().is_empty());
    }

    #[test]
    fn test_self_transfer_rejected_for_both_kinds() {
        let (engine, a, _, _) = engine();
        assert!(matches!(
            engine.send(a, a, money("1.00")),
            Err(LedgerError::SelfTransfer { .. })
        ));
        assert!(matches!(
            engine.request(a, a, money("1.00")),
            Err(LedgerError::SelfTransfer { .. })
        ));
        assert!(engine.list_transfers(a).unwrap().is_empty());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let (engine, a, b, _) = engine();
        assert!(matches!(
            engine.send(a, b, Money::ZERO),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            engine.request(a, b, money("-3")),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_request_creates_pending_with_payer_as_sender() {
        let (engine, a, b, _) = engine();
        // b asks a for 200.00
        let transfer = engine.request(b, a, money("200.00")).unwrap();

        assert_eq!(transfer.sender_id, a);
        assert_eq!(transfer.recipient_id, b);
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(balance(&engine, a), "1000.00");
        assert_eq!(balance(&engine, b), "1000.00");
    }

    #[test]
    fn test_approve_and_reject() {
        let (engine, a, b, _) = engine();
        let rejected = engine.request(b, a, money("200.00")).unwrap();
        let approved = engine.request(b, a, money("200.00")).unwrap();

        assert_eq!(engine.reject(rejected.id).unwrap().status, TransferStatus::Rejected);
        assert_eq!(balance(&engine, a), "1000.00");

        assert_eq!(engine.approve(approved.id).unwrap().status, TransferStatus::Approved);
        assert_eq!(balance(&engine, a), "800.00");
        assert_eq!(balance(&engine, b), "1200.00");
    }

    #[test]
    fn test_second_decision_is_invalid_state() {
        let (engine, a, b, _) = engine();
        let t = engine.request(b, a, money("50.00")).unwrap();
        engine.approve(t.id).unwrap();

        assert!(matches!(
            engine.approve(t.id),
            Err(LedgerError::InvalidState { .. })
        ));
        assert!(matches!(engine.reject(t.id), Err(LedgerError::InvalidState { .. })));
        assert_eq!(balance(&engine, a), "950.00");
    }

    #[test]
    fn test_send_transfers_cannot_be_decided() {
        let (engine, a, b, _) = engine();
        let t = engine.send(a, b, money("10.00")).unwrap();
        assert!(matches!(engine.reject(t.id), Err(LedgerError::InvalidState { .. })));
    }

    #[test]
    fn test_unaffordable_approval_stays_pending() {
        let (engine, a, b, c) = engine();
        let t = engine.request(b, a, money("600.00")).unwrap();
        engine.send(a, c, money("500.00")).unwrap();

        assert!(matches!(
            engine.approve(t.id),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(engine.get_transfer(t.id).unwrap().status, TransferStatus::Pending);
        assert_eq!(balance(&engine, a), "500.00");
    }

    #[test]
    fn test_set_transfer_status_parses_target() {
        let (engine, a, b, _) = engine();
        let t = engine.request(b, a, money("1.00")).unwrap();

        assert!(matches!(
            engine.set_transfer_status(t.id, "Pending"),
            Err(LedgerError::InvalidStatusTarget(_))
        ));
        assert!(matches!(
            engine.set_transfer_status(t.id, "Cancelled"),
            Err(LedgerError::InvalidStatusTarget(_))
        ));
        assert!(engine.set_transfer_status(t.id, "Approved").unwrap());
        assert_eq!(balance(&engine, b), "1001.00");
    }

    #[test]
    fn test_get_transfer_not_found() {
        let (engine, _, _, _) = engine();
        assert!(matches!(
            engine.get_transfer(30000003),
            Err(LedgerError::TransferNotFound(30000003))
        ));
    }

    #[test]
    fn test_list_queries() {
        let (engine, a, b, c) = engine();
        engine.send(a, b, money("100.00")).unwrap();
        engine.request(b, a, money("200.00")).unwrap();
        engine.request(c, b, money("200.00")).unwrap();

        assert_eq!(engine.list_transfers(b).unwrap().len(), 3);
        assert_eq!(engine.list_transfers(c).unwrap().len(), 1);

        let pending = engine.list_pending_transfers(a).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient_id, b);
        assert!(engine.list_pending_transfers(c).unwrap().is_empty());

        assert!(matches!(
            engine.list_transfers(9999),
            Err(LedgerError::UserNotFound(9999))
        ));
    }

    #[test]
    fn test_balance_by_username() {
        let (engine, _, _, _) = engine();
        assert_eq!(engine.balance_of("ALICE").unwrap().to_string(), "1000.00");
        assert!(matches!(
            engine.balance_of("mallory"),
            Err(LedgerError::UnknownUsername(_))
        ));
    }

    #[test]
    fn test_can_afford() {
        let (engine, a, _, _) = engine();
        assert!(engine.can_afford(a, money("1000.00")).unwrap());
        assert!(!engine.can_afford(a, money("1000.01")).unwrap());
    }

    #[test]
    fn test_transfer_history_names_both_parties() {
        let (engine, a, b, c) = engine();
        engine.send(a, b, money("10.00")).unwrap();
        engine.request(c, a, money("5.00")).unwrap();
        engine.send(b, c, money("1.00")).unwrap();

        let history = engine.transfer_history(a).unwrap();
        let parties: Vec<_> = history
            .iter()
            .map(|d| (d.sender_username.as_str(), d.recipient_username.as_str()))
            .collect();
        assert_eq!(parties, vec![("alice", "bob"), ("alice", "carol")]);
        assert_eq!(history[1].transfer.kind, TransferKind::Request);

        assert!(matches!(
            engine.transfer_history(9999),
            Err(LedgerError::UserNotFound(9999))
        ));
    }

    #[test]
    fn test_all_transfers_in_id_order() {
        let (engine, a, b, c) = engine();
        engine.send(a, b, money("10.00")).unwrap();
        engine.send(b, c, money("10.00")).unwrap();
        engine.request(a, c, money("10.00")).unwrap();

        let ids: Vec<_> = engine.all_transfers().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3001, 3002, 3003]);
    }
}
