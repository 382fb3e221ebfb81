//! Database models and queries

pub mod comments;
pub mod compositions;
pub mod follows;
pub mod init;
pub mod migrations;
pub mod models;
pub mod sessions;
pub mod users;

pub use init::*;
pub use models::*;
