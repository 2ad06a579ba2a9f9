//! Defines the crate level error type.

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A malformed debt delta was passed to the ledger, e.g. a non-positive
    /// amount or a debt from a user to themselves. Rejected before any
    /// mutation.
    #[error("invalid balance delta: {0}")]
    InvalidDelta(String),

    /// A settlement amount exceeded the outstanding directed debt it was
    /// recorded against. Rejected before any mutation.
    #[error("settlement of ¥{requested} exceeds the outstanding balance of ¥{available}")]
    InsufficientBalance {
        /// The amount currently owed on the directed edge.
        available: i64,
        /// The settlement amount that was requested.
        requested: i64,
    },

    /// The ledger reached an internally inconsistent state, e.g. a reversal
    /// that would leave a balance negative.
    ///
    /// This indicates a bug in the calling sequence (such as reversing the
    /// same expense twice) and is logged loudly rather than clamped.
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// The requested resource could not be found.
    ///
    /// For balances this typically means the debt was already settled or
    /// netted away, and callers should surface an "already settled" message.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An expense or settlement amount was zero or negative.
    #[error("¥{0} is not a valid amount, amounts must be a positive number of yen")]
    NonPositiveAmount(i64),

    /// An expense was created without any participants.
    #[error("an expense must have at least one participant")]
    NoParticipants,

    /// The per-participant amounts of a manual split did not sum to the
    /// expense total.
    #[error("participant amounts sum to ¥{got} but the expense total is ¥{want}")]
    ParticipantTotalMismatch {
        /// The expense total.
        want: i64,
        /// The sum of the participant amounts.
        got: i64,
    },

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to cancel a settlement that does not exist
    #[error("tried to cancel a settlement that is not in the database")]
    CancelMissingSettlement,

    /// A payment method string did not match any known payment method.
    #[error("unknown payment method \"{0}\"")]
    UnknownPaymentMethod(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JsonSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
