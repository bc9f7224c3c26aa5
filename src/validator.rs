//! Transfer validation: is a proposed transfer well-formed, and can the
//! payer afford it right now?
//!
//! Everything here is pure. Affordability must be asked of the balance the
//! caller is about to mutate, under the same lock, never of an earlier read.

use crate::account::{Account, UserId};
use crate::decimal::Money;
use crate::error::{LedgerError, Result};

/// Rejects self-transfers and non-positive amounts.
pub fn validate_draft(sender: UserId, recipient: UserId, amount: Money) -> Result<()> {
    if sender == recipient {
        return Err(LedgerError::SelfTransfer { user: sender });
    }
    if !amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount { amount });
    }
    Ok(())
}

/// Returns `true` if `account.balance >= amount`.
#[inline]
pub fn can_afford(account: &Account, amount: Money) -> bool {
    account.balance >= amount
}

/// Like [`can_afford`], but reports the shortfall as an error.
pub fn ensure_affordable(account: &Account, amount: Money) -> Result<()> {
    if can_afford(account, amount) {
        Ok(())
    } else {
        Err(LedgerError::InsufficientFunds {
            user: account.owner_id,
            balance: account.balance,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn account(balance: &str) -> Account {
        let mut account = Account::new(1001);
        account.credit(money(balance));
        account
    }

    #[test]
    fn test_draft_accepts_distinct_parties_and_positive_amount() {
        assert!(validate_draft(1001, 1002, money("0.01")).is_ok());
    }

    #[test]
    fn test_draft_rejects_self_transfer() {
        assert!(matches!(
            validate_draft(1001, 1001, money("5")),
            Err(LedgerError::SelfTransfer { user: 1001 })
        ));
    }

    #[test]
    fn test_draft_rejects_zero_and_negative_amounts() {
        assert!(matches!(
            validate_draft(1, 2, Money::ZERO),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            validate_draft(1, 2, money("-1.00")),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_can_afford_boundaries() {
        let acc = account("1000.00");
        assert!(can_afford(&acc, money("100.00")));
        assert!(can_afford(&acc, money("1000.00")));
        assert!(!can_afford(&acc, money("1000.01")));
        assert!(!can_afford(&acc, money("1000000.00")));
    }

    #[test]
    fn test_ensure_affordable_reports_shortfall() {
        let acc = account("20.00");
        match ensure_affordable(&acc, money("25.00")) {
            Err(LedgerError::InsufficientFunds {
                user,
                balance,
                amount,
            }) => {
                assert_eq!(user, 1001);
                assert_eq!(balance.to_string(), "20.00");
                assert_eq!(amount.to_string(), "25.00");
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
    }
}
