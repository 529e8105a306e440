//! Wallet Pass Repository
//!
//! Maps card numbers to Pass2U pass ids.

use super::RepoResult;
use sqlx::SqlitePool;

pub async fn find_pass_id(pool: &SqlitePool, card_number: u32) -> RepoResult<Option<String>> {
    let pass_id =
        sqlx::query_scalar::<_, String>("SELECT pass_id FROM wallet_passes WHERE card_number = ?")
            .bind(card_number)
            .fetch_optional(pool)
            .await?;
    Ok(pass_id)
}

/// Record the pass for a card, replacing any earlier one
pub async fn upsert(pool: &SqlitePool, card_number: u32, pass_id: &str) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO wallet_passes (card_number, pass_id, created_at) VALUES (?, ?, ?)
         ON CONFLICT(card_number) DO UPDATE SET pass_id = excluded.pass_id, created_at = excluded.created_at",
    )
    .bind(card_number)
    .bind(pass_id)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, card_number: u32) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM wallet_passes WHERE card_number = ?")
        .bind(card_number)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
