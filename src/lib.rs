//! Warikan is a library for splitting group expenses and tracking who owes
//! whom.
//!
//! The crate is the ledger engine of a group expense-splitting app: it turns
//! expenses and settlements into a persisted table of directed pairwise
//! debts, nets opposite-direction debts at read time, and aggregates a
//! user's payables and receivables across groups. All amounts are integers
//! in yen.
//!
//! It has no HTTP surface of its own; request handling, authentication, and
//! rendering are the embedding application's job. The embedding application
//! is also expected to wrap calls touching the same ledger rows in its own
//! locking (e.g. a mutex around the [rusqlite::Connection]), which is why
//! the write paths here use unchecked SQL transactions on a shared
//! connection reference.

#![warn(missing_docs)]

mod balance;
mod database_id;
mod db;
mod error;
mod expense;
mod group;
mod settlement;
mod split;
mod user;

pub use balance::{
    AggregatedBalance, AggregatedBalances, Balance, BalanceWithDetails, GroupBalance,
    aggregate_balances_by_user, apply_delta, get_balance, list_balances_with_details,
    list_group_balances, net_balances, reverse_delta,
};
pub use database_id::{DatabaseId, GroupId, UserId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use expense::{
    Expense, NewExpense, Split, SplitType, create_expense, delete_expense, get_expense,
    list_group_expenses,
};
pub use group::{Group, add_group_member, get_group, insert_group, list_group_members};
pub use settlement::{
    NewSettlement, PaymentMethod, Settlement, cancel_settlement, create_settlement, get_settlement,
    list_group_settlements,
};
pub use split::{DebtDelta, Share, equal_split, manual_split};
pub use user::{User, get_user, insert_user};
