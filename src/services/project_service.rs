use sqlx::PgPool;

use crate::dto::project_dto::{CreateProjectPayload, UpdateProjectPayload};
use crate::error::{Error, Result};
use crate::models::project::{Project, ProjectMedia};
use crate::services::storage_service::{FileKind, FileStore, UploadedFile, MEDIA_KINDS};

const PROJECT_COLUMNS: &str =
    "id, client_id, title, project_type, location, budget, description, status, created_at, updated_at";
const MEDIA_DIR: &str = "projects";
const DEFAULT_STATUS: &str = "active";

#[derive(Clone)]
pub struct ProjectService {
    pool: PgPool,
    files: FileStore,
}

impl ProjectService {
    pub fn new(pool: PgPool, files: FileStore) -> Self {
        Self { pool, files }
    }

    pub async fn create(&self, client_id: i64, payload: CreateProjectPayload) -> Result<Project> {
        let sql = format!(
            r#"
            INSERT INTO projects (client_id, title, project_type, location, budget, description, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(client_id)
            .bind(&payload.title)
            .bind(payload.project_type.unwrap_or_default())
            .bind(payload.location.unwrap_or_default())
            .bind(payload.budget.unwrap_or_default())
            .bind(&payload.description)
            .bind(DEFAULT_STATUS)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(project_id = project.id, client_id, "project created");
        Ok(project)
    }

    pub async fn list_for_client(&self, client_id: i64) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE client_id = $1 ORDER BY created_at DESC",
            PROJECT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn update(
        &self,
        project_id: i64,
        user_id: i64,
        payload: UpdateProjectPayload,
    ) -> Result<Project> {
        self.ensure_owner(project_id, user_id).await?;
        let sql = format!(
            r#"
            UPDATE projects SET
                title = $1, project_type = $2, location = $3, budget = $4,
                description = $5, status = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(payload.title.unwrap_or_default())
            .bind(payload.project_type.unwrap_or_default())
            .bind(payload.location.unwrap_or_default())
            .bind(payload.budget.unwrap_or_default())
            .bind(payload.description.unwrap_or_default())
            .bind(payload.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()))
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(project_id, user_id, "project updated");
        Ok(project)
    }

    pub async fn delete(&self, project_id: i64, user_id: i64) -> Result<()> {
        self.ensure_owner(project_id, user_id).await?;
        let media: Vec<String> =
            sqlx::query_scalar("SELECT filename FROM project_media WHERE project_id = $1")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        for filename in media {
            self.files.remove(&format!("{}/{}", MEDIA_DIR, filename)).await;
        }
        tracing::info!(project_id, user_id, "project deleted");
        Ok(())
    }

    pub async fn add_media(
        &self,
        project_id: i64,
        user_id: i64,
        file: UploadedFile,
    ) -> Result<ProjectMedia> {
        self.ensure_owner(project_id, user_id).await?;
        let stored = self.files.save(MEDIA_DIR, &file, MEDIA_KINDS).await?;
        let url = format!("/uploads/{}", stored.relative_path);
        let media_type = match stored.kind {
            FileKind::Mp4 | FileKind::Webm => "video",
            _ => "image",
        };

        let inserted = sqlx::query_as::<_, ProjectMedia>(
            r#"
            INSERT INTO project_media (project_id, media_type, url, filename)
            VALUES ($1, $2, $3, $4)
            RETURNING id, project_id, media_type, url, filename, created_at
            "#,
        )
        .bind(project_id)
        .bind(media_type)
        .bind(&url)
        .bind(&stored.filename)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(media) => {
                tracing::info!(project_id, media_id = media.id, "project media stored");
                Ok(media)
            }
            Err(e) => {
                self.files.remove(&stored.relative_path).await;
                Err(e.into())
            }
        }
    }

    async fn ensure_owner(&self, project_id: i64, user_id: i64) -> Result<()> {
        let owner = sqlx::query_scalar::<_, i64>("SELECT client_id FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Project not found".into()))?;
        if owner != user_id {
            return Err(Error::Forbidden(
                "Unauthorized: Project does not belong to this user".into(),
            ));
        }
        Ok(())
    }
}
