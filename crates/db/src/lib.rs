//! MongoDB access for the bootstrap.
//!
//! This crate provides:
//! - Authenticated connection to the administrative database ([`AdminSession`])
//! - Sibling-database selection without reconnecting ([`TargetDatabase`])
//! - The user-store seam the bootstrap is written against ([`UserDirectory`])
//! - Error classification ([`DbError`], [`FailureKind`])

mod commands;
mod connection;
mod directory;
mod error;

pub use commands::{create_user_command, users_info_command};
pub use connection::{AdminSession, TargetDatabase};
pub use directory::UserDirectory;
pub use error::{DbError, FailureKind};
