//! Projection errors. All of these are fatal for the output they occur in;
//! sibling outputs proceed.

use catsync_expr::ExprError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("record from {origin}: external_id evaluated to an empty string")]
    EmptyExternalId { origin: String },

    /// Two records claim the same stable key, so the reconciler could not
    /// tell them apart across runs.
    #[error("duplicate external_id '{external_id}' produced by records from {first_origin} and {second_origin}")]
    DuplicateExternalId {
        external_id: String,
        first_origin: String,
        second_origin: String,
    },

    #[error("record from {origin}: no value for required attribute '{attribute}'")]
    MissingRequired { attribute: String, origin: String },

    #[error("record from {origin}: attribute '{attribute}' expects {expected}, got {actual}")]
    AttributeType {
        attribute: String,
        origin: String,
        expected: &'static str,
        actual: String,
    },

    #[error("record from {origin}: rank {value} does not fit a 32-bit integer")]
    RankOutOfRange { origin: String, value: i64 },
}
