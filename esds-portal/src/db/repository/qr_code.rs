//! QR Code Repository

use super::{RepoError, RepoResult};
use shared::models::{QrCode, QrCodeCreate};
use sqlx::SqlitePool;

const COLUMNS: &str = "code_id, target_url, description, scan_count, created_at";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<QrCode>> {
    let codes = sqlx::query_as::<_, QrCode>(&format!(
        "SELECT {COLUMNS} FROM qr_codes ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(codes)
}

pub async fn find_by_id(pool: &SqlitePool, code_id: &str) -> RepoResult<Option<QrCode>> {
    let code = sqlx::query_as::<_, QrCode>(&format!(
        "SELECT {COLUMNS} FROM qr_codes WHERE code_id = ?"
    ))
    .bind(code_id)
    .fetch_optional(pool)
    .await?;
    Ok(code)
}

pub async fn create(pool: &SqlitePool, data: QrCodeCreate) -> RepoResult<QrCode> {
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO qr_codes (code_id, target_url, description, scan_count, created_at) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(&data.code_id)
    .bind(&data.target_url)
    .bind(&data.description)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("QR code {} already exists", data.code_id))
        }
        other => other,
    })?;
    find_by_id(pool, &data.code_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create QR code".into()))
}

/// Count one scan and return the updated record
///
/// `None` when the code does not exist.
pub async fn record_scan(pool: &SqlitePool, code_id: &str) -> RepoResult<Option<QrCode>> {
    let code = sqlx::query_as::<_, QrCode>(&format!(
        "UPDATE qr_codes SET scan_count = scan_count + 1 WHERE code_id = ? RETURNING {COLUMNS}"
    ))
    .bind(code_id)
    .fetch_optional(pool)
    .await?;
    Ok(code)
}

pub async fn delete(pool: &SqlitePool, code_id: &str) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM qr_codes WHERE code_id = ?")
        .bind(code_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn create_data(code_id: &str) -> QrCodeCreate {
        QrCodeCreate {
            code_id: code_id.to_string(),
            target_url: format!("https://esds.org.uk/{code_id}"),
            description: "Flyer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = memory_pool().await;
        let created = create(&pool, create_data("freshers")).await.unwrap();
        assert_eq!(created.scan_count, 0);
        assert_eq!(created.description, "Flyer");

        let found = find_by_id(&pool, "freshers").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(find_by_id(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_id() {
        let pool = memory_pool().await;
        create(&pool, create_data("freshers")).await.unwrap();
        let err = create(&pool, create_data("freshers")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_record_scan() {
        let pool = memory_pool().await;
        create(&pool, create_data("poster")).await.unwrap();

        record_scan(&pool, "poster").await.unwrap();
        let code = record_scan(&pool, "poster").await.unwrap().unwrap();
        assert_eq!(code.scan_count, 2);

        assert!(record_scan(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_delete() {
        let pool = memory_pool().await;
        create(&pool, create_data("first")).await.unwrap();
        create(&pool, create_data("second")).await.unwrap();

        let ids: Vec<String> = find_all(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code_id)
            .collect();
        assert_eq!(ids, vec!["second", "first"]);

        assert!(delete(&pool, "first").await.unwrap());
        assert!(!delete(&pool, "first").await.unwrap());
        assert_eq!(find_all(&pool).await.unwrap().len(), 1);
    }
}
