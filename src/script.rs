//! Batch command scripts: CSV in, ledger state out.
//!
//! A script is a CSV file with header `op,user,counterparty,amount,transfer`.
//! Users are referred to by username. Rows are applied in order; a row that
//! fails is logged at warn level and skipped, the rest still run.

use crate::account::UserId;
use crate::decimal::Money;
use crate::engine::TransferEngine;
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use crate::transfer::{TransferId, TransferKind, TransferStatus};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;

/// Raw command record as read from CSV.
///
/// Every column but `op` is optional since each operation uses a different subset.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// Operation: register, send, request, approve, reject
    pub op: String,

    /// Acting user (registrant, sender or requester)
    pub user: Option<String>,

    /// The other party (recipient of a send, payer of a request)
    pub counterparty: Option<String>,

    pub amount: Option<String>,

    /// Transfer id for approve/reject
    pub transfer: Option<String>,
}

impl CommandRecord {
    /// Parses the raw record into a typed command.
    pub fn parse(&self) -> std::result::Result<Command, String> {
        let op = self.op.trim().to_lowercase();

        match op.as_str() {
            "register" => Ok(Command::Register {
                username: self.field(&self.user, "user")?,
            }),
            "send" => Ok(Command::Transfer {
                kind: TransferKind::Send,
                user: self.field(&self.user, "user")?,
                counterparty: self.field(&self.counterparty, "counterparty")?,
                amount: self.parse_amount()?,
            }),
            "request" => Ok(Command::Transfer {
                kind: TransferKind::Request,
                user: self.field(&self.user, "user")?,
                counterparty: self.field(&self.counterparty, "counterparty")?,
                amount: self.parse_amount()?,
            }),
            "approve" => Ok(Command::Decide {
                id: self.parse_transfer_id()?,
                target: TransferStatus::Approved,
            }),
            "reject" => Ok(Command::Decide {
                id: self.parse_transfer_id()?,
                target: TransferStatus::Rejected,
            }),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }

    fn field(&self, value: &Option<String>, name: &str) -> std::result::Result<String, String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("missing {}", name))
    }

    fn parse_amount(&self) -> std::result::Result<Money, String> {
        let raw = self.field(&self.amount, "amount")?;
        Money::from_str(&raw).map_err(|e| format!("bad amount '{}': {}", raw, e))
    }

    fn parse_transfer_id(&self) -> std::result::Result<TransferId, String> {
        let raw = self.field(&self.transfer, "transfer")?;
        raw.parse()
            .map_err(|e| format!("bad transfer id '{}': {}", raw, e))
    }
}

/// A parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register {
        username: String,
    },

    /// `send`: user pays counterparty. `request`: user asks counterparty to pay.
    Transfer {
        kind: TransferKind,
        user: String,
        counterparty: String,
        amount: Money,
    },

    Decide {
        id: TransferId,
        target: TransferStatus,
    },
}

#[derive(Serialize)]
struct AccountRow<'a> {
    user: UserId,
    username: &'a str,
    balance: Money,
}

#[derive(Serialize)]
struct TransferRow<'a> {
    transfer: TransferId,
    #[serde(rename = "type")]
    kind: &'a str,
    status: &'a str,
    sender: &'a str,
    recipient: &'a str,
    amount: Money,
}

impl<S: LedgerStore> TransferEngine<S> {
    /// Runs a CSV command script against the engine.
    ///
    /// Only I/O-level problems abort the run; failed commands are logged
    /// and skipped.
    pub fn process_csv<R: Read>(&self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
            let row = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row, e);
                    continue;
                }
            };

            let outcome = record
                .parse()
                .map_err(|message| LedgerError::InvalidRecord { row, message })
                .and_then(|command| self.execute(command));

            if let Err(e) = outcome {
                warn!("Row {}: {}", row, e);
            }
        }

        Ok(())
    }

    /// Applies one command.
    pub fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Register { username } => {
                self.register_user(&username)?;
            }
            Command::Transfer {
                kind,
                user,
                counterparty,
                amount,
            } => {
                let user = self.find_user(&user)?.id;
                let counterparty = self.find_user(&counterparty)?.id;
                match kind {
                    TransferKind::Send => self.send(user, counterparty, amount)?,
                    TransferKind::Request => self.request(user, counterparty, amount)?,
                };
            }
            Command::Decide { id, target } => {
                match target {
                    TransferStatus::Approved => self.approve(id)?,
                    TransferStatus::Rejected => self.reject(id)?,
                    TransferStatus::Pending => {
                        return Err(LedgerError::InvalidStatusTarget(target.to_string()))
                    }
                };
            }
        }
        Ok(())
    }

    /// Writes every account as CSV, ordered by user id.
    pub fn write_accounts<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(["user", "username", "balance"])?;

        let names = self.usernames()?;

        for account in self.accounts()? {
            csv_writer.serialize(AccountRow {
                user: account.owner_id,
                username: names.get(&account.owner_id).map_or("", String::as_str),
                balance: account.balance,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the full transfer history as CSV, ordered by transfer id.
    pub fn write_transfers<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        csv_writer.write_record(["transfer", "type", "status", "sender", "recipient", "amount"])?;

        let history = self.describe(self.all_transfers()?)?;
        debug!("Writing {} transfers", history.len());
        for details in &history {
            let transfer = &details.transfer;
            csv_writer.serialize(TransferRow {
                transfer: transfer.id,
                kind: transfer.kind.as_str(),
                status: transfer.status.as_str(),
                sender: &details.sender_username,
                recipient: &details.recipient_username,
                amount: transfer.amount,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
