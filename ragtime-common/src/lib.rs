//! # Ragtime Common Library
//!
//! Shared code for the Ragtime web application including:
//! - Database models and queries
//! - Configuration loading and profile selection
//! - Password and session token primitives
//! - Slug generation for compositions
//! - Pagination utilities

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod slug;

pub use error::{Error, Result};
