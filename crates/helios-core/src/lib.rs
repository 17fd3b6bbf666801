//! # helios-core
//! Foundation types and collaborator traits for the Helios risk oracle.

pub mod address;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
