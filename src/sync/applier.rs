// ABOUTME: Applies a batch of UPDATE statements to a destination in one transaction
// ABOUTME: Commits once at the end; any failure rolls back the whole batch

use crate::driver::Connection;
use crate::error::ApplyError;

/// Execute `statements` in order and commit them together.
///
/// Returns `Ok(false)` without touching the connection when there is no
/// connection or nothing to apply. On failure the transaction is rolled back
/// so a later batch on the same connection never sees partial work.
pub async fn apply(
    conn: Option<&mut dyn Connection>,
    statements: &[String],
) -> Result<bool, ApplyError> {
    let conn = match conn {
        Some(conn) if !statements.is_empty() => conn,
        _ => return Ok(false),
    };

    for (index, sql) in statements.iter().enumerate() {
        if let Err(source) = conn.execute(sql).await {
            rollback(conn).await;
            return Err(ApplyError::Statement { index, source });
        }
        tracing::trace!("Executed: {}", sql);
    }

    if let Err(e) = conn.commit().await {
        rollback(conn).await;
        return Err(ApplyError::Commit(e));
    }

    Ok(true)
}

async fn rollback(conn: &mut dyn Connection) {
    if let Err(e) = conn.rollback().await {
        // The execute or commit error is what gets reported
        tracing::warn!("Rollback after failed apply also failed: {}", e);
    }
}
