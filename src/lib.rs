pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    audit_service::AuditRecorder, auth_service::AuthService, document_service::DocumentService,
    email_service::EmailService, profile_service::ProfileService,
    project_service::ProjectService, storage_service::FileStore, user_service::UserService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub audit: AuditRecorder,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub document_service: DocumentService,
    pub project_service: ProjectService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Arc<Config>, audit: AuditRecorder) -> error::Result<Self> {
        let email = EmailService::from_config(&config)?;
        Ok(Self::with_email(pool, config, audit, email))
    }

    /// Same as [`AppState::new`] with an explicit mail transport.
    pub fn with_email(
        pool: PgPool,
        config: Arc<Config>,
        audit: AuditRecorder,
        email: EmailService,
    ) -> Self {
        let files = FileStore::new(&config.uploads_dir, config.max_upload_bytes);

        let auth_service = AuthService::new(
            pool.clone(),
            email,
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
        );
        let profile_service = ProfileService::new(pool.clone());
        let document_service = DocumentService::new(pool.clone(), files.clone());
        let project_service = ProjectService::new(pool.clone(), files);
        let user_service = UserService::new(pool.clone());

        Self {
            pool,
            config,
            audit,
            auth_service,
            profile_service,
            document_service,
            project_service,
            user_service,
        }
    }
}
