//! Expense management: models, split resolution, and the atomic
//! expense-plus-ledger write path.

mod core;

pub use core::{
    Expense, NewExpense, Split, SplitType, create_expense, create_expense_table, delete_expense,
    get_expense, list_group_expenses, map_expense_row,
};
