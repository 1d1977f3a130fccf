//! # Posts Core
//!
//! The domain layer of the post store.
//! This crate contains the post model, the authorization policy and the port
//! traits that storage adapters implement. It performs no I/O.

pub mod domain;
pub mod error;
pub mod policy;
pub mod ports;

pub use error::{PostError, RepoError};
