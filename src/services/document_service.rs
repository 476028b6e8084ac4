use serde_json::json;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::document::{AdminDocument, DocumentType, UserDocument};
use crate::services::storage_service::{FileStore, UploadedFile, DOCUMENT_KINDS};

const DOCUMENT_COLUMNS: &str =
    "id, user_id, doc_type, filename, url, size, metadata, verified, created_at";

#[derive(Clone)]
pub struct DocumentService {
    pool: PgPool,
    files: FileStore,
}

impl DocumentService {
    pub fn new(pool: PgPool, files: FileStore) -> Self {
        Self { pool, files }
    }

    /// Stores the file under `<type>/` and records it. The file is removed again if
    /// the row cannot be written.
    pub async fn upload(
        &self,
        user_id: i64,
        doc_type: DocumentType,
        file: UploadedFile,
        public_base_url: &str,
    ) -> Result<UserDocument> {
        let stored = self.files.save(doc_type.as_str(), &file, DOCUMENT_KINDS).await?;
        let url = format!(
            "{}/uploads/{}",
            public_base_url.trim_end_matches('/'),
            stored.relative_path
        );
        let metadata = json!({
            "originalName": file.original_name,
            "mimeType": stored.kind.mime_type(),
        });

        let sql = format!(
            r#"
            INSERT INTO user_documents (user_id, doc_type, filename, url, size, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, UserDocument>(&sql)
            .bind(user_id)
            .bind(doc_type.as_str())
            .bind(&stored.filename)
            .bind(&url)
            .bind(stored.size)
            .bind(&metadata)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(document) => {
                tracing::info!(user_id, document_id = document.id, doc_type = doc_type.as_str(), "document uploaded");
                Ok(document)
            }
            Err(e) => {
                self.files.remove(&stored.relative_path).await;
                Err(e.into())
            }
        }
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<UserDocument>> {
        let sql = format!(
            "SELECT {} FROM user_documents WHERE user_id = $1 ORDER BY created_at DESC",
            DOCUMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserDocument>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn delete(&self, user_id: i64, document_id: i64) -> Result<()> {
        let row: Option<(String, String)> = sqlx::query_as(
            "DELETE FROM user_documents WHERE id = $1 AND user_id = $2 RETURNING doc_type, filename",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        let (doc_type, filename) =
            row.ok_or_else(|| Error::NotFound("Document not found".into()))?;

        self.files.remove(&format!("{}/{}", doc_type, filename)).await;
        tracing::info!(user_id, document_id, "document deleted");
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<AdminDocument>> {
        Ok(sqlx::query_as::<_, AdminDocument>(
            r#"
            SELECT d.id, d.user_id, u.email AS user_email, d.doc_type, d.filename, d.url,
                   d.size, d.metadata, d.verified, d.created_at
            FROM user_documents d
            JOIN users u ON u.id = d.user_id
            ORDER BY d.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn set_verified(&self, document_id: i64, verified: bool) -> Result<UserDocument> {
        let sql = format!(
            "UPDATE user_documents SET verified = $1 WHERE id = $2 RETURNING {}",
            DOCUMENT_COLUMNS
        );
        sqlx::query_as::<_, UserDocument>(&sql)
            .bind(verified)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Document not found".into()))
    }
}
