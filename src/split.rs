//! Split computation: turning an expense into directed pairwise debt deltas.

use serde::{Deserialize, Serialize};

use crate::database_id::UserId;

/// A directed debt created by an expense: `user_from` owes `user_to`
/// `amount` yen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtDelta {
    /// The debtor.
    pub user_from: UserId,
    /// The creditor, i.e. whoever paid the expense.
    pub user_to: UserId,
    /// The amount owed in yen. Always positive.
    pub amount: i64,
}

/// A debtor and the share of an expense they owe, in yen.
///
/// Serialized into the expense's participants column, so the field names
/// are part of the data-at-rest format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    /// The debtor.
    pub user_id: UserId,
    /// The amount they owe in yen.
    pub amount: i64,
}

/// Compute the debt deltas for an equal split.
///
/// The amount is divided by the number of debtors plus one, since the payer
/// shares the expense too. Integer division leaves a remainder of up to
/// `debtors` yen, which is distributed by charging the first `remainder`
/// debtors one extra yen each. This makes the split deterministic, but only
/// as deterministic as the order of `debtors`: callers must pass debtors in
/// a stable, reproducible order such as group membership join order (see
/// [crate::list_group_members]).
///
/// The payer's own share is absorbed rather than emitted, and any entry in
/// `debtors` equal to `paid_by` is skipped. Debtors whose share rounds down
/// to zero are omitted, since a zero debt is not a debt. An empty debtor
/// list yields an empty delta list, a no-op expense.
///
/// Invariant: the emitted deltas plus the payer's absorbed share sum to
/// exactly `amount`.
pub fn equal_split(amount: i64, paid_by: &str, debtors: &[UserId]) -> Vec<DebtDelta> {
    let debtors: Vec<&UserId> = debtors.iter().filter(|id| *id != paid_by).collect();

    if debtors.is_empty() {
        return Vec::new();
    }

    let sharers = debtors.len() as i64 + 1;
    let per_person = amount / sharers;
    let remainder = amount % sharers;

    debtors
        .into_iter()
        .enumerate()
        .map(|(i, debtor)| DebtDelta {
            user_from: debtor.clone(),
            user_to: paid_by.to_owned(),
            amount: per_person + if (i as i64) < remainder { 1 } else { 0 },
        })
        .filter(|delta| delta.amount > 0)
        .collect()
}

/// Compute the debt deltas for a manual split.
///
/// Each share becomes a delta of exactly its stated amount; a share naming
/// the payer is skipped. Checking that the shares sum to the expense total
/// is the caller's job (see [crate::create_expense]), this function takes
/// the stated amounts at face value.
pub fn manual_split(paid_by: &str, shares: &[Share]) -> Vec<DebtDelta> {
    shares
        .iter()
        .filter(|share| share.user_id != paid_by)
        .map(|share| DebtDelta {
            user_from: share.user_id.clone(),
            user_to: paid_by.to_owned(),
            amount: share.amount,
        })
        .collect()
}

#[cfg(test)]
mod equal_split_tests {
    use super::{DebtDelta, equal_split};

    fn debtors(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn divides_evenly_when_there_is_no_remainder() {
        let deltas = equal_split(3000, "payer", &debtors(&["alice", "bob"]));

        assert_eq!(
            deltas,
            vec![
                DebtDelta {
                    user_from: "alice".to_owned(),
                    user_to: "payer".to_owned(),
                    amount: 1000
                },
                DebtDelta {
                    user_from: "bob".to_owned(),
                    user_to: "payer".to_owned(),
                    amount: 1000
                },
            ]
        );
    }

    #[test]
    fn gives_remainder_to_first_debtors_in_order() {
        let deltas = equal_split(1000, "payer", &debtors(&["alice", "bob"]));

        // 1000 / 3 = 333 r 1, so the first debtor owes one extra yen.
        assert_eq!(deltas[0].amount, 334);
        assert_eq!(deltas[1].amount, 333);
    }

    #[test]
    fn four_way_split_with_no_remainder() {
        let deltas = equal_split(100, "payer", &debtors(&["a", "b", "c"]));

        assert!(deltas.iter().all(|delta| delta.amount == 25));
    }

    #[test]
    fn four_way_split_with_remainder_of_one() {
        let deltas = equal_split(101, "payer", &debtors(&["a", "b", "c"]));

        assert_eq!(deltas[0].amount, 26);
        assert_eq!(deltas[1].amount, 25);
        assert_eq!(deltas[2].amount, 25);
    }

    #[test]
    fn conserves_money() {
        for amount in [1, 2, 3, 99, 100, 101, 1000, 3000, 9999] {
            for debtor_count in 1..=5 {
                let ids: Vec<String> = (0..debtor_count).map(|i| format!("user{i}")).collect();
                let deltas = equal_split(amount, "payer", &ids);

                // The payer's absorbed share is the base share; the whole
                // remainder went to the first debtors one yen at a time.
                let payer_share = amount / (debtor_count as i64 + 1);
                let emitted: i64 = deltas.iter().map(|delta| delta.amount).sum();

                assert_eq!(
                    emitted + payer_share,
                    amount,
                    "amount={amount} debtors={debtor_count}"
                );
            }
        }
    }

    #[test]
    fn zero_debtors_is_a_no_op() {
        let deltas = equal_split(5000, "payer", &[]);

        assert!(deltas.is_empty());
    }

    #[test]
    fn payer_in_the_debtor_list_is_skipped() {
        let deltas = equal_split(3000, "payer", &debtors(&["payer", "alice", "bob"]));

        assert_eq!(deltas.len(), 2);
        assert!(deltas.iter().all(|delta| delta.user_from != "payer"));
    }

    #[test]
    fn zero_shares_are_omitted() {
        // 2 yen over four sharers: two debtors owe a yen, one owes nothing.
        let deltas = equal_split(2, "payer", &debtors(&["a", "b", "c"]));

        assert_eq!(deltas.len(), 2);
        assert!(deltas.iter().all(|delta| delta.amount == 1));
    }
}

#[cfg(test)]
mod manual_split_tests {
    use super::{Share, manual_split};

    #[test]
    fn emits_stated_amounts() {
        let shares = vec![
            Share {
                user_id: "alice".to_owned(),
                amount: 700,
            },
            Share {
                user_id: "bob".to_owned(),
                amount: 300,
            },
        ];

        let deltas = manual_split("payer", &shares);

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].user_from, "alice");
        assert_eq!(deltas[0].user_to, "payer");
        assert_eq!(deltas[0].amount, 700);
        assert_eq!(deltas[1].amount, 300);
    }

    #[test]
    fn skips_shares_naming_the_payer() {
        let shares = vec![
            Share {
                user_id: "payer".to_owned(),
                amount: 500,
            },
            Share {
                user_id: "alice".to_owned(),
                amount: 500,
            },
        ];

        let deltas = manual_split("payer", &shares);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].user_from, "alice");
    }
}
