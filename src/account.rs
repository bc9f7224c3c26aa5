//! Account and user models.
//!
//! Maintains the invariant: `balance >= 0` at all times.

use crate::decimal::Money;
use serde::Serialize;

/// Registered user identifier.
pub type UserId = u32;

/// A registered user, as listed to other users when picking a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A user's balance-holding account.
///
/// # Invariants
///
/// - `balance >= 0` after every operation; a debit that would break this is refused
/// - Exactly one account per user, never deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Owning user (one account per user).
    pub owner_id: UserId,

    /// Current balance. Never negative.
    pub balance: Money,
}

impl Account {
    /// Creates a new account with a zero balance.
    pub fn new(owner_id: UserId) -> Self {
        Account {
            owner_id,
            balance: Money::ZERO,
        }
    }

    /// Adds funds to the account.
    ///
    /// Returns `false` (leaving the balance untouched) if the sum overflows.
    pub fn credit(&mut self, amount: Money) -> bool {
        match self.balance.checked_add(amount) {
            Some(next) => {
                self.balance = next;
                true
            }
            None => false,
        }
    }

    /// Removes funds from the account.
    ///
    /// Returns `true` if the debit succeeded, `false` if the balance is
    /// smaller than `amount`.
    pub fn debit(&mut self, amount: Money) -> bool {
        if self.balance < amount {
            return false;
        }

        match self.balance.checked_sub(amount) {
            Some(next) => {
                self.balance = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn funded(s: &str) -> Account {
        let mut account = Account::new(1);
        assert!(account.credit(money(s)));
        account
    }

    #[test]
    fn test_new_account_has_zero_balance() {
        let account = Account::new(1001);
        assert_eq!(account.owner_id, 1001);
        assert_eq!(account.balance, Money::ZERO);
    }

    #[test]
    fn test_credit_increases_balance() {
        let mut account = Account::new(1);
        assert!(account.credit(money("10.25")));
        assert_eq!(account.balance.to_string(), "10.25");
    }

    #[test]
    fn test_debit_decreases_balance() {
        let mut account = funded("1000.00");
        assert!(account.debit(money("100.00")));
        assert_eq!(account.balance.to_string(), "900.00");
    }

    #[test]
    fn test_debit_of_exact_balance_leaves_zero() {
        let mut account = funded("50.00");
        assert!(account.debit(money("50.00")));
        assert!(account.balance.is_zero());
    }

    #[test]
    fn test_debit_fails_with_insufficient_funds() {
        let mut account = funded("10.00");
        assert!(!account.debit(money("10.01")));
        assert_eq!(account.balance.to_string(), "10.00");
    }
}
