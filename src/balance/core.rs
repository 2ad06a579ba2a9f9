//! The persisted pairwise debt ledger and its upsert semantics.
//!
//! Each row records that one user owes another a positive number of yen
//! within one group, keyed by (group, debtor, creditor). Rows accumulate as
//! expenses are created, shrink as settlements are recorded, and are deleted
//! the moment they reach zero; a zero balance is never stored. Both
//! directions of a pair may coexist in storage, since updates are applied
//! incrementally and netting only happens at read time (see
//! [crate::net_balances]).

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    database_id::{GroupId, UserId},
    split::DebtDelta,
};

/// A directed debt within one group: `user_from` owes `user_to` `amount`
/// yen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// The group the debt belongs to. Debts in different groups are never
    /// combined.
    pub group_id: GroupId,
    /// The debtor.
    pub user_from: UserId,
    /// The creditor.
    pub user_to: UserId,
    /// The amount owed in yen. Always positive.
    pub amount: i64,
}

/// Apply a debt delta to the ledger, accumulating onto any existing row for
/// the same (group, debtor, creditor) key or inserting a new one.
///
/// Callers applying more than one delta as a unit (e.g. expense creation)
/// must wrap the calls in a single SQL transaction so the unit is
/// all-or-nothing.
///
/// # Errors
/// Returns [Error::InvalidDelta] if the delta's amount is not positive or
/// the delta is a self-loop. Rejected before any mutation.
pub fn apply_delta(group_id: &str, delta: &DebtDelta, connection: &Connection) -> Result<(), Error> {
    validate_delta(delta)?;

    connection.execute(
        "INSERT INTO balance (group_id, user_from, user_to, amount)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(group_id, user_from, user_to)
         DO UPDATE SET amount = amount + excluded.amount",
        (group_id, &delta.user_from, &delta.user_to, delta.amount),
    )?;

    Ok(())
}

/// Subtract a previously applied debt delta from the ledger, deleting the
/// row if it lands exactly on zero.
///
/// Used to reverse an expense's deltas when the expense is deleted, and to
/// reduce a directed edge when a settlement is recorded against it.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidDelta] if the delta's amount is not positive or the
///   delta is a self-loop,
/// - or [Error::NotFound] if there is no row for the (group, debtor,
///   creditor) key, e.g. the debt was already settled,
/// - or [Error::InvariantViolation] if subtracting would leave the balance
///   negative, which indicates a bug in the calling sequence such as a
///   double reversal.
pub fn reverse_delta(
    group_id: &str,
    delta: &DebtDelta,
    connection: &Connection,
) -> Result<(), Error> {
    validate_delta(delta)?;

    let existing = get_balance(group_id, &delta.user_from, &delta.user_to, connection)?;
    let remaining = existing.amount - delta.amount;

    if remaining < 0 {
        let message = format!(
            "reversing ¥{} against {} -> {} in group {} would leave the balance at ¥{}",
            delta.amount, delta.user_from, delta.user_to, group_id, remaining
        );
        tracing::error!("{message}");
        return Err(Error::InvariantViolation(message));
    }

    if remaining == 0 {
        connection.execute(
            "DELETE FROM balance
             WHERE group_id = ?1 AND user_from = ?2 AND user_to = ?3",
            (group_id, &delta.user_from, &delta.user_to),
        )?;
    } else {
        connection.execute(
            "UPDATE balance SET amount = ?4
             WHERE group_id = ?1 AND user_from = ?2 AND user_to = ?3",
            (group_id, &delta.user_from, &delta.user_to, remaining),
        )?;
    }

    Ok(())
}

fn validate_delta(delta: &DebtDelta) -> Result<(), Error> {
    if delta.amount <= 0 {
        return Err(Error::InvalidDelta(format!(
            "amount must be positive, got ¥{}",
            delta.amount
        )));
    }

    if delta.user_from == delta.user_to {
        return Err(Error::InvalidDelta(format!(
            "{} cannot owe money to themselves",
            delta.user_from
        )));
    }

    Ok(())
}

/// Retrieve the directed balance for a (group, debtor, creditor) key.
///
/// # Errors
/// Returns [Error::NotFound] if no such debt exists.
pub fn get_balance(
    group_id: &str,
    user_from: &str,
    user_to: &str,
    connection: &Connection,
) -> Result<Balance, Error> {
    connection
        .prepare(
            "SELECT group_id, user_from, user_to, amount FROM balance
             WHERE group_id = :group_id AND user_from = :user_from AND user_to = :user_to",
        )?
        .query_one(
            &[
                (":group_id", &group_id),
                (":user_from", &user_from),
                (":user_to", &user_to),
            ],
            map_balance_row,
        )
        .map_err(|error| error.into())
}

/// List every balance in a group, ordered by debtor then creditor.
pub fn list_group_balances(group_id: &str, connection: &Connection) -> Result<Vec<Balance>, Error> {
    connection
        .prepare(
            "SELECT group_id, user_from, user_to, amount FROM balance
             WHERE group_id = :group_id
             ORDER BY user_from ASC, user_to ASC",
        )?
        .query_map(&[(":group_id", &group_id)], map_balance_row)?
        .map(|maybe_balance| maybe_balance.map_err(|error| error.into()))
        .collect()
}

/// Create the balance table in the database.
pub fn create_balance_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS balance (
            group_id TEXT NOT NULL,
            user_from TEXT NOT NULL,
            user_to TEXT NOT NULL,
            amount INTEGER NOT NULL,
            PRIMARY KEY (group_id, user_from, user_to)
        );

        CREATE INDEX IF NOT EXISTS idx_balance_user_from ON balance(user_from);
        CREATE INDEX IF NOT EXISTS idx_balance_user_to ON balance(user_to);",
    )?;

    Ok(())
}

/// Map a database row to a [Balance], starting at column `offset`.
pub fn map_balance_row_with_offset(row: &Row, offset: usize) -> Result<Balance, rusqlite::Error> {
    Ok(Balance {
        group_id: row.get(offset)?,
        user_from: row.get(offset + 1)?,
        user_to: row.get(offset + 2)?,
        amount: row.get(offset + 3)?,
    })
}

pub(crate) fn map_balance_row(row: &Row) -> Result<Balance, rusqlite::Error> {
    map_balance_row_with_offset(row, 0)
}
