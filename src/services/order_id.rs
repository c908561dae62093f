//! Sequential, human-readable order ids (`O001`, `O002`, ...).

use chrono::Utc;
use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, Statement};

use crate::{
    entity::orders::Entity as Orders,
    error::{AppError, AppResult},
};

pub const ORDER_ID_PREFIX: char = 'O';
pub const MAX_LOOKUP_ATTEMPTS: u64 = 10;

pub fn format_order_id(sequence: u64) -> String {
    format!("{ORDER_ID_PREFIX}{sequence:03}")
}

pub fn fallback_order_id(unix_millis: i64) -> String {
    format!("{ORDER_ID_PREFIX}{unix_millis}")
}

/// Draw the next sequence value. `nextval` is not rolled back with the
/// transaction, so concurrent placements never see the same number.
async fn next_sequence<C: ConnectionTrait>(conn: &C) -> AppResult<u64> {
    let row = conn
        .query_one(Statement::from_string(
            DbBackend::Postgres,
            "SELECT nextval('order_seq') AS seq",
        ))
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order_seq returned no row")))?;
    let seq: i64 = row.try_get("", "seq")?;
    u64::try_from(seq).map_err(|_| AppError::Internal(anyhow::anyhow!("negative order sequence {seq}")))
}

/// Next free id from `order_seq`.
///
/// Ids written outside the sequence (imports, seeds) are skipped by point
/// lookup; after too many of those the id falls back to a timestamp.
pub async fn next_order_id<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    for _ in 0..MAX_LOOKUP_ATTEMPTS {
        let candidate = format_order_id(next_sequence(conn).await?);
        let taken = Orders::find_by_id(candidate.clone()).one(conn).await?;
        if taken.is_none() {
            return Ok(candidate);
        }
        tracing::debug!(candidate = %candidate, "order id taken, advancing");
    }

    let fallback = fallback_order_id(Utc::now().timestamp_millis());
    tracing::warn!(order_id = %fallback, "sequential order ids exhausted, using timestamp id");
    Ok(fallback)
}
