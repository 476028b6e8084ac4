pub mod audit_log;
pub mod document;
pub mod project;
pub mod user;
