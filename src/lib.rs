//! mongo-entrypoint
//!
//! One-shot bootstrap that provisions the backend service account on a
//! MongoDB server at container startup.

pub mod bootstrap;

pub use bootstrap::{provision, run, verify, ProvisionReport, VerificationReport};
