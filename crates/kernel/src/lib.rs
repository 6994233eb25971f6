//! Core types shared by every mongo-entrypoint crate: layered settings,
//! redacted secrets, and the service-account model.

pub mod account;
pub mod secret;
pub mod settings;

pub use account::{Role, RoleGrant, ServiceAccount, UserRecord};
pub use secret::Secret;
pub use settings::Settings;
