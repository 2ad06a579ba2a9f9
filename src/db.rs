//! Database schema initialization.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, balance::create_balance_table, expense::create_expense_table,
    group::create_group_tables, settlement::create_settlement_table, user::create_user_table,
};

/// Create all of the ledger's tables.
///
/// Table creation runs inside one exclusive transaction so a half-created
/// schema is never observable.
///
/// # Errors
/// Returns [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_group_tables(&transaction)?;
    create_expense_table(&transaction)?;
    create_settlement_table(&transaction)?;
    create_balance_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
