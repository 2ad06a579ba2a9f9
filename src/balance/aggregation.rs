//! Cross-group balance aggregation for the dashboard read path.
//!
//! Answers "who do I owe, and who owes me, across all my groups?" by netting
//! each group's balances independently and then totalling the surviving
//! edges per counterparty. Debts are never netted across groups, so the same
//! counterparty can legitimately show up on both sides when two groups net
//! in opposite directions.

use std::collections::HashMap;

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    database_id::{GroupId, UserId},
    group::{Group, map_group_row_with_offset},
    user::{User, map_user_row_with_offset},
};

use super::{Balance, core::map_balance_row_with_offset, netting::net_balances};

/// A ledger row joined with the display details of both users and the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceWithDetails {
    /// The underlying ledger row.
    pub balance: Balance,
    /// Display details for the debtor.
    pub from_user: User,
    /// Display details for the creditor.
    pub to_user: User,
    /// Display details for the group the debt belongs to.
    pub group: Group,
}

/// One group's contribution to an aggregated balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupBalance {
    /// The group's ID.
    pub group_id: GroupId,
    /// The group's display name.
    pub group_name: String,
    /// The group's icon.
    pub group_icon: Option<String>,
    /// The net amount owed within this group, in yen.
    pub amount: i64,
}

/// A user's total debt to, or credit with, a single counterparty across all
/// shared groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedBalance {
    /// The counterparty's ID.
    pub user_id: UserId,
    /// The counterparty's display name, or "Unknown" if they have not set
    /// one.
    pub user_name: String,
    /// The counterparty's avatar image.
    pub user_image: Option<String>,
    /// The total across all shared groups, in yen.
    pub total_amount: i64,
    /// The per-group breakdown of the total.
    pub group_balances: Vec<GroupBalance>,
}

/// A user's payable and receivable totals, grouped by counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedBalances {
    /// Counterparties the user owes money to, largest total first.
    pub to_pay: Vec<AggregatedBalance>,
    /// Counterparties who owe the user money, largest total first.
    pub to_receive: Vec<AggregatedBalance>,
}

/// Aggregate a user's balances across all their groups.
///
/// Balances are partitioned by group and each group is netted independently
/// (see [net_balances]); netted edges touching `current_user_id` are then
/// bucketed by counterparty, totalled, and sorted descending by total
/// amount (counterparty ID as the tie-break so the order is deterministic).
///
/// Within a single group a counterparty can only appear on one side, since
/// netting leaves at most one direction per pair. Across groups they may
/// appear in both `to_pay` and `to_receive`; debts in different groups stay
/// separate.
pub fn aggregate_balances_by_user(
    balances: &[BalanceWithDetails],
    current_user_id: &str,
) -> AggregatedBalances {
    // Partition by group in first-seen order so group breakdowns come out in
    // a stable order.
    let mut group_order: Vec<&str> = Vec::new();
    let mut partitions: HashMap<&str, Vec<&BalanceWithDetails>> = HashMap::new();

    for balance in balances {
        let group_id = balance.balance.group_id.as_str();
        if !partitions.contains_key(group_id) {
            group_order.push(group_id);
        }
        partitions.entry(group_id).or_default().push(balance);
    }

    let mut to_pay: HashMap<&str, AggregatedBalance> = HashMap::new();
    let mut to_receive: HashMap<&str, AggregatedBalance> = HashMap::new();

    for group_id in group_order {
        let partition = &partitions[group_id];

        let mut users: HashMap<&str, &User> = HashMap::new();
        for balance in partition {
            users.insert(&balance.from_user.id, &balance.from_user);
            users.insert(&balance.to_user.id, &balance.to_user);
        }
        let group = &partition[0].group;

        let rows: Vec<Balance> = partition.iter().map(|b| b.balance.clone()).collect();

        for edge in net_balances(&rows) {
            let (bucket, counterparty_id) = if edge.user_from == current_user_id {
                (&mut to_pay, edge.user_to.as_str())
            } else if edge.user_to == current_user_id {
                (&mut to_receive, edge.user_from.as_str())
            } else {
                continue;
            };

            // Netted edges only ever involve users present in the input, so
            // the lookup cannot miss.
            let counterparty = users[counterparty_id];
            let entry = bucket
                .entry(counterparty.id.as_str())
                .or_insert_with(|| AggregatedBalance {
                    user_id: counterparty.id.clone(),
                    user_name: counterparty
                        .name
                        .clone()
                        .unwrap_or_else(|| "Unknown".to_owned()),
                    user_image: counterparty.image.clone(),
                    total_amount: 0,
                    group_balances: Vec::new(),
                });

            entry.total_amount += edge.amount;
            entry.group_balances.push(GroupBalance {
                group_id: group.id.clone(),
                group_name: group.name.clone(),
                group_icon: group.icon.clone(),
                amount: edge.amount,
            });
        }
    }

    AggregatedBalances {
        to_pay: sorted_by_total(to_pay),
        to_receive: sorted_by_total(to_receive),
    }
}

fn sorted_by_total(bucket: HashMap<&str, AggregatedBalance>) -> Vec<AggregatedBalance> {
    let mut aggregated: Vec<AggregatedBalance> = bucket.into_values().collect();
    aggregated.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    aggregated
}

/// List every balance touching a user across all groups, joined with user
/// and group display details.
///
/// This is the query feeding [aggregate_balances_by_user].
pub fn list_balances_with_details(
    user_id: &str,
    connection: &Connection,
) -> Result<Vec<BalanceWithDetails>, Error> {
    connection
        .prepare(
            "SELECT b.group_id, b.user_from, b.user_to, b.amount,
                    uf.id, uf.name, uf.image,
                    ut.id, ut.name, ut.image,
                    g.id, g.name, g.icon
             FROM balance b
             INNER JOIN user uf ON uf.id = b.user_from
             INNER JOIN user ut ON ut.id = b.user_to
             INNER JOIN \"group\" g ON g.id = b.group_id
             WHERE b.user_from = :user_id OR b.user_to = :user_id
             ORDER BY b.group_id ASC, b.user_from ASC, b.user_to ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_balance_with_details_row)?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

fn map_balance_with_details_row(row: &Row) -> Result<BalanceWithDetails, rusqlite::Error> {
    Ok(BalanceWithDetails {
        balance: map_balance_row_with_offset(row, 0)?,
        from_user: map_user_row_with_offset(row, 4)?,
        to_user: map_user_row_with_offset(row, 7)?,
        group: map_group_row_with_offset(row, 10)?,
    })
}

#[cfg(test)]
mod aggregation_tests {
    use crate::{
        balance::Balance,
        group::Group,
        user::User,
    };

    use super::{BalanceWithDetails, aggregate_balances_by_user};

    fn user(id: &str) -> User {
        User {
            id: id.to_owned(),
            name: Some(id.to_uppercase()),
            image: None,
        }
    }

    fn group(id: &str) -> Group {
        Group {
            id: id.to_owned(),
            name: format!("Group {id}"),
            icon: None,
        }
    }

    fn balance_with_details(
        group_id: &str,
        user_from: &str,
        user_to: &str,
        amount: i64,
    ) -> BalanceWithDetails {
        BalanceWithDetails {
            balance: Balance {
                group_id: group_id.to_owned(),
                user_from: user_from.to_owned(),
                user_to: user_to.to_owned(),
                amount,
            },
            from_user: user(user_from),
            to_user: user(user_to),
            group: group(group_id),
        }
    }

    #[test]
    fn buckets_netted_edges_by_counterparty() {
        let balances = vec![
            balance_with_details("g1", "me", "alice", 500),
            balance_with_details("g1", "bob", "me", 200),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        assert_eq!(aggregated.to_pay.len(), 1);
        assert_eq!(aggregated.to_pay[0].user_id, "alice");
        assert_eq!(aggregated.to_pay[0].user_name, "ALICE");
        assert_eq!(aggregated.to_pay[0].total_amount, 500);

        assert_eq!(aggregated.to_receive.len(), 1);
        assert_eq!(aggregated.to_receive[0].user_id, "bob");
        assert_eq!(aggregated.to_receive[0].total_amount, 200);
    }

    #[test]
    fn nets_within_a_group_before_bucketing() {
        let balances = vec![
            balance_with_details("g1", "me", "alice", 500),
            balance_with_details("g1", "alice", "me", 300),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        assert_eq!(aggregated.to_pay.len(), 1);
        assert_eq!(aggregated.to_pay[0].total_amount, 200);
        assert!(aggregated.to_receive.is_empty());
    }

    #[test]
    fn never_nets_across_groups() {
        // Equal and opposite debts in two different groups must both
        // survive, one on each side.
        let balances = vec![
            balance_with_details("g1", "me", "alice", 100),
            balance_with_details("g2", "alice", "me", 100),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        assert_eq!(aggregated.to_pay.len(), 1);
        assert_eq!(aggregated.to_pay[0].user_id, "alice");
        assert_eq!(aggregated.to_pay[0].total_amount, 100);
        assert_eq!(aggregated.to_pay[0].group_balances.len(), 1);
        assert_eq!(aggregated.to_pay[0].group_balances[0].group_id, "g1");

        assert_eq!(aggregated.to_receive.len(), 1);
        assert_eq!(aggregated.to_receive[0].user_id, "alice");
        assert_eq!(aggregated.to_receive[0].total_amount, 100);
        assert_eq!(aggregated.to_receive[0].group_balances[0].group_id, "g2");
    }

    #[test]
    fn totals_accumulate_across_groups_per_counterparty() {
        let balances = vec![
            balance_with_details("g1", "me", "alice", 400),
            balance_with_details("g2", "me", "alice", 600),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        assert_eq!(aggregated.to_pay.len(), 1);
        let alice = &aggregated.to_pay[0];
        assert_eq!(alice.total_amount, 1000);
        assert_eq!(alice.group_balances.len(), 2);
        assert_eq!(alice.group_balances[0].group_id, "g1");
        assert_eq!(alice.group_balances[0].amount, 400);
        assert_eq!(alice.group_balances[1].group_id, "g2");
        assert_eq!(alice.group_balances[1].amount, 600);
    }

    #[test]
    fn sorts_descending_by_total_amount() {
        let balances = vec![
            balance_with_details("g1", "me", "alice", 100),
            balance_with_details("g1", "me", "bob", 900),
            balance_with_details("g1", "me", "carol", 500),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        let order: Vec<&str> = aggregated
            .to_pay
            .iter()
            .map(|entry| entry.user_id.as_str())
            .collect();
        assert_eq!(order, vec!["bob", "carol", "alice"]);
    }

    #[test]
    fn ignores_edges_not_touching_the_current_user() {
        let balances = vec![
            balance_with_details("g1", "alice", "bob", 800),
            balance_with_details("g1", "me", "alice", 100),
        ];

        let aggregated = aggregate_balances_by_user(&balances, "me");

        assert_eq!(aggregated.to_pay.len(), 1);
        assert!(aggregated.to_receive.is_empty());
    }

    #[test]
    fn falls_back_to_unknown_for_unnamed_counterparties() {
        let mut balance = balance_with_details("g1", "me", "alice", 100);
        balance.to_user.name = None;

        let aggregated = aggregate_balances_by_user(&[balance], "me");

        assert_eq!(aggregated.to_pay[0].user_name, "Unknown");
    }
}

#[cfg(test)]
mod list_balances_with_details_tests {
    use rusqlite::Connection;

    use crate::{
        balance::apply_delta,
        db::initialize,
        group::{Group, insert_group},
        split::DebtDelta,
        user::{User, insert_user},
    };

    use super::list_balances_with_details;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        for id in ["alice", "bob", "carol"] {
            insert_user(
                &User {
                    id: id.to_owned(),
                    name: Some(id.to_owned()),
                    image: None,
                },
                &connection,
            )
            .unwrap();
        }

        for id in ["g1", "g2"] {
            insert_group(
                &Group {
                    id: id.to_owned(),
                    name: format!("Group {id}"),
                    icon: Some("⛺".to_owned()),
                },
                &connection,
            )
            .unwrap();
        }

        connection
    }

    fn delta(user_from: &str, user_to: &str, amount: i64) -> DebtDelta {
        DebtDelta {
            user_from: user_from.to_owned(),
            user_to: user_to.to_owned(),
            amount,
        }
    }

    #[test]
    fn returns_balances_in_either_direction_with_details() {
        let connection = get_test_connection();
        apply_delta("g1", &delta("alice", "bob", 500), &connection).unwrap();
        apply_delta("g2", &delta("carol", "alice", 250), &connection).unwrap();
        // Not visible to alice.
        apply_delta("g1", &delta("carol", "bob", 10_000), &connection).unwrap();

        let balances = list_balances_with_details("alice", &connection).unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].balance.group_id, "g1");
        assert_eq!(balances[0].from_user.name.as_deref(), Some("alice"));
        assert_eq!(balances[0].to_user.id, "bob");
        assert_eq!(balances[0].group.name, "Group g1");
        assert_eq!(balances[0].group.icon.as_deref(), Some("⛺"));
        assert_eq!(balances[1].balance.group_id, "g2");
        assert_eq!(balances[1].from_user.id, "carol");
    }

    #[test]
    fn returns_empty_for_a_user_with_no_balances() {
        let connection = get_test_connection();

        let balances = list_balances_with_details("alice", &connection).unwrap();

        assert!(balances.is_empty());
    }
}
