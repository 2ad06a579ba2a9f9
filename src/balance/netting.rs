//! Read-time netting of opposite-direction debts.
//!
//! The persisted ledger may hold both an A→B and a B→A row for the same
//! pair, because writes are applied incrementally without eager netting.
//! Netting collapses the two into at most one edge for display and
//! aggregation. It is a pure view transform and never touches storage.

use std::collections::BTreeMap;

use super::Balance;

/// Collapse opposite-direction debts between the same pair into a single
/// net edge.
///
/// For each pair with edges in both directions, the output keeps one edge in
/// the direction of the larger amount, carrying the difference; exactly
/// equal amounts cancel to nothing. Single-direction edges pass through
/// unchanged. Debts are only ever netted within their own group: rows from
/// different groups never combine, so callers aggregating across groups can
/// partition first or not, with the same result.
///
/// The output is ordered by group and unordered user pair, and the function is
/// idempotent: netting an already-netted set returns it unchanged.
pub fn net_balances(balances: &[Balance]) -> Vec<Balance> {
    // Keyed by group and the *unordered* pair; the sign tracks direction,
    // positive meaning the lexicographically smaller user is the debtor.
    let mut net: BTreeMap<(&str, &str, &str), i64> = BTreeMap::new();

    for balance in balances {
        let (low, high, signed_amount) = if balance.user_from <= balance.user_to {
            (
                balance.user_from.as_str(),
                balance.user_to.as_str(),
                balance.amount,
            )
        } else {
            (
                balance.user_to.as_str(),
                balance.user_from.as_str(),
                -balance.amount,
            )
        };

        *net.entry((balance.group_id.as_str(), low, high))
            .or_insert(0) += signed_amount;
    }

    net.into_iter()
        .filter(|(_, amount)| *amount != 0)
        .map(|((group_id, low, high), amount)| {
            let (user_from, user_to) = if amount > 0 { (low, high) } else { (high, low) };

            Balance {
                group_id: group_id.to_owned(),
                user_from: user_from.to_owned(),
                user_to: user_to.to_owned(),
                amount: amount.abs(),
            }
        })
        .collect()
}
