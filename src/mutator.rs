//! Balance mutation: moves a transfer's amount between exactly two accounts.
//!
//! Both rows are read and both resulting balances computed before either
//! is written, so a failure leaves the table exactly as it was. Callers must
//! hold whatever lock makes the table consistent for the whole call.

use crate::account::{Account, UserId};
use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::validator;
use log::debug;
use std::collections::HashMap;

/// Accounts keyed by owner.
pub type AccountTable = HashMap<UserId, Account>;

/// Debits `sender` and credits `recipient` by `amount`, or changes nothing.
///
/// # Errors
///
/// - `SelfTransfer` if both ids are the same
/// - `NonPositiveAmount` if `amount` is zero or negative
/// - `UserNotFound` if either account is missing
/// - `InsufficientFunds` if the sender's current balance is below `amount`
/// - `BalanceOverflow` if the credit cannot be represented
pub fn apply_transfer(
    accounts: &mut AccountTable,
    sender: UserId,
    recipient: UserId,
    amount: Money,
) -> Result<()> {
    validator::validate_draft(sender, recipient, amount)?;

    let mut payer = accounts
        .get(&sender)
        .cloned()
        .ok_or(LedgerError::UserNotFound(sender))?;
    let mut payee = accounts
        .get(&recipient)
        .cloned()
        .ok_or(LedgerError::UserNotFound(recipient))?;

    validator::ensure_affordable(&payer, amount)?;
    if !payer.debit(amount) {
        return Err(LedgerError::InsufficientFunds {
            user: sender,
            balance: payer.balance,
            amount,
        });
    }
    if !payee.credit(amount) {
        return Err(LedgerError::BalanceOverflow { user: recipient });
    }

    debug!(
        "Moved {} from user {} (now {}) to user {} (now {})",
        amount, sender, payer.balance, recipient, payee.balance
    );

    accounts.insert(sender, payer);
    accounts.insert(recipient, payee);
    Ok(())
}
