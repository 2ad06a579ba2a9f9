//! Defines the core data models and database operations for settlements.
//!
//! A settlement records a real-world repayment and reduces exactly one
//! directed ledger edge: the debt from the settlement's payer to its
//! receiver. A reverse edge, if one exists, is deliberately left untouched:
//! repaying what you owe someone does not collect what they owe you, that
//! only falls out at read time through netting.

use std::str::FromStr;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    balance::{apply_delta, get_balance, reverse_delta},
    database_id::{DatabaseId, GroupId, UserId},
    split::DebtDelta,
};

// ============================================================================
// MODELS
// ============================================================================

/// How a settlement was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash in hand.
    Cash,
    /// A bank transfer.
    BankTransfer,
    /// PayPay.
    #[serde(rename = "paypay")]
    PayPay,
    /// LINE Pay.
    LinePay,
    /// Rakuten Pay.
    RakutenPay,
    /// Apple Pay.
    ApplePay,
    /// Merpay.
    Merpay,
    /// au PAY.
    AuPay,
    /// d払い (d-barai).
    DPay,
    /// A transportation IC card such as Suica.
    TransportationIc,
    /// A credit card.
    CreditCard,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// The string stored in the database for this payment method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::PayPay => "paypay",
            PaymentMethod::LinePay => "line_pay",
            PaymentMethod::RakutenPay => "rakuten_pay",
            PaymentMethod::ApplePay => "apple_pay",
            PaymentMethod::Merpay => "merpay",
            PaymentMethod::AuPay => "au_pay",
            PaymentMethod::DPay => "d_pay",
            PaymentMethod::TransportationIc => "transportation_ic",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "paypay" => Ok(PaymentMethod::PayPay),
            "line_pay" => Ok(PaymentMethod::LinePay),
            "rakuten_pay" => Ok(PaymentMethod::RakutenPay),
            "apple_pay" => Ok(PaymentMethod::ApplePay),
            "merpay" => Ok(PaymentMethod::Merpay),
            "au_pay" => Ok(PaymentMethod::AuPay),
            "d_pay" => Ok(PaymentMethod::DPay),
            "transportation_ic" => Ok(PaymentMethod::TransportationIc),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "other" => Ok(PaymentMethod::Other),
            other => Err(Error::UnknownPaymentMethod(other.to_owned())),
        }
    }
}

/// A recorded repayment that reduced a specific directed debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// The ID of the settlement.
    pub id: DatabaseId,
    /// The group the settled debt belongs to.
    pub group_id: GroupId,
    /// The member who paid the settlement, i.e. the original debtor.
    pub paid_by: UserId,
    /// The member who received it, i.e. the original creditor.
    pub paid_to: UserId,
    /// The amount repaid in yen.
    pub amount: i64,
    /// How the repayment was made.
    pub method: PaymentMethod,
    /// An optional note.
    pub description: Option<String>,
    /// When the settlement was recorded.
    pub settled_at: OffsetDateTime,
}

/// The details needed to create a [Settlement].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSettlement {
    /// The group the settled debt belongs to.
    pub group_id: GroupId,
    /// The member repaying their debt.
    pub paid_by: UserId,
    /// The member being repaid.
    pub paid_to: UserId,
    /// The amount repaid in yen.
    pub amount: i64,
    /// How the repayment was made.
    pub method: PaymentMethod,
    /// An optional note.
    pub description: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Record a settlement and reduce the directed debt it repays.
///
/// The settlement row and the ledger reduction happen in one SQL
/// transaction. The edge is deleted if the repayment lands exactly on zero.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - or [Error::NotFound] if there is no debt from `paid_by` to `paid_to`
///   in the group (it may already have been settled),
/// - or [Error::InsufficientBalance] if the settlement amount exceeds the
///   outstanding debt; nothing is changed,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_settlement(new: NewSettlement, connection: &Connection) -> Result<Settlement, Error> {
    if new.amount <= 0 {
        return Err(Error::NonPositiveAmount(new.amount));
    }

    let transaction = connection.unchecked_transaction()?;

    let balance = get_balance(&new.group_id, &new.paid_by, &new.paid_to, &transaction)?;
    if balance.amount < new.amount {
        return Err(Error::InsufficientBalance {
            available: balance.amount,
            requested: new.amount,
        });
    }

    let settlement = transaction
        .prepare(
            "INSERT INTO settlement (group_id, paid_by, paid_to, amount, method, description, settled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, group_id, paid_by, paid_to, amount, method, description, settled_at",
        )?
        .query_row(
            (
                &new.group_id,
                &new.paid_by,
                &new.paid_to,
                new.amount,
                new.method.as_str(),
                &new.description,
                OffsetDateTime::now_utc(),
            ),
            map_settlement_row,
        )?;

    reverse_delta(
        &new.group_id,
        &DebtDelta {
            user_from: new.paid_by.clone(),
            user_to: new.paid_to.clone(),
            amount: new.amount,
        },
        &transaction,
    )?;

    transaction.commit()?;

    tracing::debug!(
        "settled ¥{} from {} to {} in group {}",
        settlement.amount,
        settlement.paid_by,
        settlement.paid_to,
        settlement.group_id
    );

    Ok(settlement)
}

/// Cancel a settlement, restoring the debt it had repaid.
///
/// The restore goes through the ledger upsert: if the edge still exists the
/// amount is added back onto it, and if it has since disappeared the edge is
/// re-created. Row deletion and restore happen in one SQL transaction.
///
/// # Errors
/// Returns [Error::CancelMissingSettlement] if `id` does not refer to a
/// settlement, or [Error::SqlError] if there is some other SQL error.
pub fn cancel_settlement(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    let settlement = get_settlement(id, &transaction).map_err(|error| match error {
        Error::NotFound => Error::CancelMissingSettlement,
        error => error,
    })?;

    transaction.execute("DELETE FROM settlement WHERE id = ?1", [id])?;

    apply_delta(
        &settlement.group_id,
        &DebtDelta {
            user_from: settlement.paid_by.clone(),
            user_to: settlement.paid_to.clone(),
            amount: settlement.amount,
        },
        &transaction,
    )?;

    transaction.commit()?;

    Ok(())
}

/// Retrieve a settlement from the database by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a valid settlement,
/// or [Error::SqlError] if there is some other SQL error.
pub fn get_settlement(id: DatabaseId, connection: &Connection) -> Result<Settlement, Error> {
    connection
        .prepare(
            "SELECT id, group_id, paid_by, paid_to, amount, method, description, settled_at
             FROM settlement WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_settlement_row)
        .map_err(|error| error.into())
}

/// List a group's settlements, newest first.
pub fn list_group_settlements(
    group_id: &str,
    connection: &Connection,
) -> Result<Vec<Settlement>, Error> {
    connection
        .prepare(
            "SELECT id, group_id, paid_by, paid_to, amount, method, description, settled_at
             FROM settlement
             WHERE group_id = :group_id
             ORDER BY settled_at DESC, id DESC",
        )?
        .query_map(&[(":group_id", &group_id)], map_settlement_row)?
        .map(|maybe_settlement| maybe_settlement.map_err(|error| error.into()))
        .collect()
}

/// Create the settlement table in the database.
pub fn create_settlement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS settlement (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id TEXT NOT NULL,
            paid_by TEXT NOT NULL,
            paid_to TEXT NOT NULL,
            amount INTEGER NOT NULL,
            method TEXT NOT NULL,
            description TEXT,
            settled_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_settlement_group ON settlement(group_id, settled_at);",
    )?;

    Ok(())
}

/// Map a database row to a [Settlement].
pub fn map_settlement_row(row: &Row) -> Result<Settlement, rusqlite::Error> {
    let method: String = row.get(5)?;
    let method = method.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown payment method \"{method}\"").into(),
        )
    })?;

    Ok(Settlement {
        id: row.get(0)?,
        group_id: row.get(1)?,
        paid_by: row.get(2)?,
        paid_to: row.get(3)?,
        amount: row.get(4)?,
        method,
        description: row.get(6)?,
        settled_at: row.get(7)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
