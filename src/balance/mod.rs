//! The pairwise debt ledger.
//!
//! This module contains everything related to balances:
//! - The [Balance] model and the upsert/reversal semantics of the persisted
//!   ledger
//! - Read-time netting of opposite-direction debts
//! - Cross-group aggregation of a user's payables and receivables

mod aggregation;
mod core;
mod netting;

pub use aggregation::{
    AggregatedBalance, AggregatedBalances, BalanceWithDetails, GroupBalance,
    aggregate_balances_by_user, list_balances_with_details,
};
pub use core::{
    Balance, apply_delta, create_balance_table, get_balance, list_group_balances,
    map_balance_row_with_offset, reverse_delta,
};
pub use netting::net_balances;
