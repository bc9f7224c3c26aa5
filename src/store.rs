//! Ledger store: durable table of users, accounts and transfers.
//!
//! [`LedgerStore`] is the capability the lifecycle engine depends on. Each
//! method is a single atomic unit against one consistent state; in
//! particular the affordability check, both balance writes and the transfer
//! write happen together or not at all. [`InMemoryLedger`] implements it
//! with one mutex around the whole state.

use crate::account::{Account, User, UserId};
use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::mutator::{self, AccountTable};
use crate::transfer::{NewTransfer, Transfer, TransferId, TransferStatus};
use crate::validator;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// First id handed out to a registered user.
pub const FIRST_USER_ID: UserId = 1001;

/// First id handed out to a transfer.
pub const FIRST_TRANSFER_ID: TransferId = 3001;

/// Storage capability consumed by the transfer engine.
pub trait LedgerStore: Send + Sync {
    /// Creates a user and its single account, seeded with `opening_balance`.
    fn register(&self, username: &str, opening_balance: Money) -> Result<User>;

    /// All users ordered by id.
    fn users(&self) -> Result<Vec<User>>;

    /// Case-insensitive username lookup.
    fn user_by_name(&self, username: &str) -> Result<Option<User>>;

    fn balance(&self, owner: UserId) -> Result<Money>;

    /// All accounts ordered by owner id.
    fn accounts(&self) -> Result<Vec<Account>>;

    /// Whether `owner`'s current committed balance covers `amount`.
    fn can_afford(&self, owner: UserId, amount: Money) -> Result<bool>;

    /// Persists a new transfer and assigns its id.
    ///
    /// The draft is validated here as well as by callers: distinct parties,
    /// a positive amount and the kind's starting status. A draft in `Approved` status has its balance effect applied in the same
    /// atomic unit; if the mutation fails nothing is persisted.
    fn record_transfer(&self, draft: NewTransfer) -> Result<Transfer>;

    /// Moves a pending transfer to `target`.
    ///
    /// Approving applies the balance effect first; if that fails the status is
    /// left untouched.
    fn resolve(&self, id: TransferId, target: TransferStatus) -> Result<Transfer>;

    fn transfer(&self, id: TransferId) -> Result<Option<Transfer>>;

    /// Transfers where `user` is sender or recipient, ordered by id.
    fn transfers_for(&self, user: UserId) -> Result<Vec<Transfer>>;

    /// Pending transfers where `payer` is the sender, ordered by id.
    fn pending_for(&self, payer: UserId) -> Result<Vec<Transfer>>;

    /// Every transfer, ordered by id, read from one consistent state.
    fn all_transfers(&self) -> Result<Vec<Transfer>>;
}

#[derive(Debug)]
struct LedgerState {
    users: BTreeMap<UserId, User>,
    accounts: AccountTable,
    transfers: BTreeMap<TransferId, Transfer>,
    next_user_id: UserId,
    next_transfer_id: TransferId,
}

impl LedgerState {
    fn new() -> Self {
        LedgerState {
            users: BTreeMap::new(),
            accounts: AccountTable::new(),
            transfers: BTreeMap::new(),
            next_user_id: FIRST_USER_ID,
            next_transfer_id: FIRST_TRANSFER_ID,
        }
    }

    fn account(&self, owner: UserId) -> Result<&Account> {
        self.accounts
            .get(&owner)
            .ok_or(LedgerError::UserNotFound(owner))
    }

    fn collect_transfers<F>(&self, keep: F) -> Vec<Transfer>
    where
        F: Fn(&Transfer) -> bool,
    {
        // BTreeMap iteration is already id-ascending.
        self.transfers.values().filter(|t| keep(t)).cloned().collect()
    }
}

/// Thread-safe in-memory ledger.
///
/// All state sits behind a single `Mutex`, which gives every trait method
/// serializable isolation.
#[derive(Debug)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        InMemoryLedger {
            state: Mutex::new(LedgerState::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedger {
    fn register(&self, username: &str, opening_balance: Money) -> Result<User> {
        let name = username.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidUsername(username.to_string()));
        }
        if opening_balance.is_negative() {
            return Err(LedgerError::InvalidConfig(format!(
                "opening balance {} is negative",
                opening_balance
            )));
        }

        let mut state = self.lock()?;
        let taken = state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(name));
        if taken {
            return Err(LedgerError::DuplicateUsername(name.to_string()));
        }

        let id = state.next_user_id;
        let mut account = Account::new(id);
        if !account.credit(opening_balance) {
            return Err(LedgerError::BalanceOverflow { user: id });
        }

        let user = User {
            id,
            username: name.to_string(),
        };
        state.next_user_id += 1;
        state.users.insert(id, user.clone());
        state.accounts.insert(id, account);

        info!("Registered user {} ({}) with balance {}", id, name, opening_balance);
        Ok(user)
    }

    fn users(&self) -> Result<Vec<User>> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let name = username.trim();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn balance(&self, owner: UserId) -> Result<Money> {
        Ok(self.lock()?.account(owner)?.balance)
    }

    fn accounts(&self) -> Result<Vec<Account>> {
        let state = self.lock()?;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.owner_id);
        Ok(accounts)
    }

    fn can_afford(&self, owner: UserId, amount: Money) -> Result<bool> {
        let state = self.lock()?;
        Ok(validator::can_afford(state.account(owner)?, amount))
    }

    fn record_transfer(&self, draft: NewTransfer) -> Result<Transfer> {
        validator::validate_draft(draft.sender_id, draft.recipient_id, draft.amount)?;
        let expected = draft.kind.initial_status();
        if draft.status != expected {
            return Err(LedgerError::InitialStatusMismatch {
                kind: draft.kind,
                expected,
                status: draft.status,
            });
        }

        let mut state = self.lock()?;
        state.account(draft.sender_id)?;
        state.account(draft.recipient_id)?;

        if draft.status == TransferStatus::Approved {
            mutator::apply_transfer(
                &mut state.accounts,
                draft.sender_id,
                draft.recipient_id,
                draft.amount,
            )?;
        }

        let id = state.next_transfer_id;
        state.next_transfer_id += 1;
        let transfer = draft.into_transfer(id);
        state.transfers.insert(id, transfer.clone());

        debug!("Persisted transfer {:?}", transfer);
        Ok(transfer)
    }

    fn resolve(&self, id: TransferId, target: TransferStatus) -> Result<Transfer> {
        let mut state = self.lock()?;
        let current = state
            .transfers
            .get(&id)
            .cloned()
            .ok_or(LedgerError::TransferNotFound(id))?;

        let next = current.status.transition(id, target)?;
        if next == TransferStatus::Approved {
            mutator::apply_transfer(
                &mut state.accounts,
                current.sender_id,
                current.recipient_id,
                current.amount,
            )?;
        }

        let stored = state
            .transfers
            .get_mut(&id)
            .ok_or(LedgerError::TransferNotFound(id))?;
        stored.status = next;
        Ok(stored.clone())
    }

    fn transfer(&self, id: TransferId) -> Result<Option<Transfer>> {
        Ok(self.lock()?.transfers.get(&id).cloned())
    }

    fn transfers_for(&self, user: UserId) -> Result<Vec<Transfer>> {
        Ok(self.lock()?.collect_transfers(|t| t.involves(user)))
    }

    fn pending_for(&self, payer: UserId) -> Result<Vec<Transfer>> {
        Ok(self.lock()?.collect_transfers(|t| t.is_pending_for(payer)))
    }

    fn all_transfers(&self) -> Result<Vec<Transfer>> {
        Ok(self.lock()?.collect_transfers(|_| true))
    }
}
