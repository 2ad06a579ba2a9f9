//! Defines the core data models and database operations for expenses.
//!
//! Creating an expense writes two things atomically: the expense row itself,
//! and the debt deltas it implies against the group's balance ledger. The
//! per-debtor shares are stored on the row as JSON so that deleting the
//! expense can reverse exactly what was applied, without recomputing the
//! split.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    balance::{apply_delta, reverse_delta},
    database_id::{DatabaseId, GroupId, UserId},
    split::{DebtDelta, Share, equal_split, manual_split},
};

// ============================================================================
// MODELS
// ============================================================================

/// How an expense's amount was distributed among its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    /// Divided evenly among the payer and all debtors.
    Equal,
    /// Each debtor's share was stated explicitly.
    Manual,
}

impl SplitType {
    /// The string stored in the database for this split type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Manual => "manual",
        }
    }
}

/// The participants of a new expense, resolved once at the API boundary.
///
/// Request payloads arrive either as a plain list of debtor IDs (equal
/// split) or as a list of debtors with explicit amounts (manual split); this
/// enum is the single place that distinction lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// Divide the amount evenly among the payer and these debtors.
    ///
    /// Debtors must be in a stable, reproducible order (e.g. group
    /// membership join order) since the division remainder goes to the
    /// first debtors in the list.
    Equal {
        /// The debtors sharing the expense, not counting the payer.
        debtors: Vec<UserId>,
    },
    /// Charge each debtor the stated amount.
    Manual {
        /// The debtors and their stated shares. Must sum to the expense
        /// total.
        shares: Vec<Share>,
    },
}

/// A shared expense paid by one group member on behalf of others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: DatabaseId,
    /// The group the expense belongs to.
    pub group_id: GroupId,
    /// The member who paid.
    pub paid_by: UserId,
    /// The total amount paid in yen.
    pub amount: i64,
    /// A text description of what the expense was for.
    pub description: Option<String>,
    /// The per-debtor shares applied to the ledger, not including the
    /// payer's own share. This is the replayable record used to reverse the
    /// ledger when the expense is deleted.
    pub participants: Vec<Share>,
    /// How the amount was distributed.
    pub split_type: SplitType,
    /// When the expense happened.
    pub date: Date,
}

/// The details needed to create an [Expense].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    /// The group the expense belongs to.
    pub group_id: GroupId,
    /// The member who paid.
    pub paid_by: UserId,
    /// The total amount paid in yen.
    pub amount: i64,
    /// A text description of what the expense was for.
    pub description: Option<String>,
    /// How to distribute the amount.
    pub split: Split,
    /// When the expense happened.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create an expense and apply its debt deltas to the group's ledger.
///
/// The expense row and every ledger update happen in one SQL transaction:
/// either the whole unit is applied or none of it is.
///
/// An equal split over an empty ledger contribution (only the payer shared
/// the expense, or every share rounded to zero) is a valid no-op expense:
/// the row is still recorded.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - or [Error::NoParticipants] if the split names no debtors,
/// - or [Error::ParticipantTotalMismatch] if manual shares do not sum to
///   the expense amount,
/// - or [Error::InvalidDelta] if a share is malformed (e.g. a non-positive
///   manual amount),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(new: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    if new.amount <= 0 {
        return Err(Error::NonPositiveAmount(new.amount));
    }

    let (split_type, deltas) = match &new.split {
        Split::Equal { debtors } => {
            if debtors.is_empty() {
                return Err(Error::NoParticipants);
            }
            (SplitType::Equal, equal_split(new.amount, &new.paid_by, debtors))
        }
        Split::Manual { shares } => {
            if shares.is_empty() {
                return Err(Error::NoParticipants);
            }
            let total: i64 = shares.iter().map(|share| share.amount).sum();
            if total != new.amount {
                return Err(Error::ParticipantTotalMismatch {
                    want: new.amount,
                    got: total,
                });
            }
            (SplitType::Manual, manual_split(&new.paid_by, shares))
        }
    };

    // The stored participants mirror the applied deltas exactly.
    let participants: Vec<Share> = deltas
        .iter()
        .map(|delta| Share {
            user_id: delta.user_from.clone(),
            amount: delta.amount,
        })
        .collect();
    let participants_json = serde_json::to_string(&participants)
        .map_err(|error| Error::JsonSerializationError(error.to_string()))?;

    // Using unchecked_transaction because callers hand us a &Connection from
    // behind their own lock.
    let transaction = connection.unchecked_transaction()?;

    let expense = transaction
        .prepare(
            "INSERT INTO expense (group_id, paid_by, amount, description, participants, split_type, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, group_id, paid_by, amount, description, participants, split_type, date",
        )?
        .query_row(
            (
                &new.group_id,
                &new.paid_by,
                new.amount,
                &new.description,
                &participants_json,
                split_type.as_str(),
                new.date,
            ),
            map_expense_row,
        )?;

    for delta in &deltas {
        apply_delta(&new.group_id, delta, &transaction)?;
    }

    transaction.commit()?;

    tracing::debug!(
        "recorded expense {} of ¥{} in group {} ({} debtors)",
        expense.id,
        expense.amount,
        expense.group_id,
        expense.participants.len()
    );

    Ok(expense)
}

/// Delete an expense and reverse its debt deltas against the group's ledger.
///
/// Reversal replays the stored participant shares in the opposite direction,
/// deleting any ledger row that lands on zero. The reversal and the row
/// deletion happen in one SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingExpense] if `id` does not refer to an expense,
/// - or [Error::NotFound] if a ledger edge the expense created no longer
///   exists (e.g. it was already settled), in which case nothing is changed,
/// - or [Error::InvariantViolation] if reversal would leave a balance
///   negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_expense(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    let expense = get_expense(id, &transaction).map_err(|error| match error {
        Error::NotFound => Error::DeleteMissingExpense,
        error => error,
    })?;

    for share in &expense.participants {
        let delta = DebtDelta {
            user_from: share.user_id.clone(),
            user_to: expense.paid_by.clone(),
            amount: share.amount,
        };
        reverse_delta(&expense.group_id, &delta, &transaction)?;
    }

    transaction.execute("DELETE FROM expense WHERE id = ?1", [id])?;

    transaction.commit()?;

    Ok(())
}

/// Retrieve an expense from the database by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a valid expense, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_expense(id: DatabaseId, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, group_id, paid_by, amount, description, participants, split_type, date
             FROM expense WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_expense_row)
        .map_err(|error| error.into())
}

/// List a group's expenses, newest first.
pub fn list_group_expenses(group_id: &str, connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, group_id, paid_by, amount, description, participants, split_type, date
             FROM expense
             WHERE group_id = :group_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":group_id", &group_id)], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Create the expense table in the database.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id TEXT NOT NULL,
            paid_by TEXT NOT NULL,
            amount INTEGER NOT NULL,
            description TEXT,
            participants TEXT NOT NULL,
            split_type TEXT NOT NULL,
            date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_group_date ON expense(group_id, date);",
    )?;

    Ok(())
}

/// Map a database row to an [Expense].
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let participants_json: String = row.get(5)?;
    let participants = serde_json::from_str(&participants_json).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    let split_type: String = row.get(6)?;
    let split_type = match split_type.as_str() {
        "equal" => SplitType::Equal,
        "manual" => SplitType::Manual,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown split type \"{other}\"").into(),
            ));
        }
    };

    Ok(Expense {
        id: row.get(0)?,
        group_id: row.get(1)?,
        paid_by: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        participants,
        split_type,
        date: row.get(7)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
