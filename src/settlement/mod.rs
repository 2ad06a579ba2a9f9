//! Settlement management: recording repayments against directed debts and
//! cancelling them.

mod core;

pub use core::{
    NewSettlement, PaymentMethod, Settlement, cancel_settlement, create_settlement,
    create_settlement_table, get_settlement, list_group_settlements, map_settlement_row,
};
