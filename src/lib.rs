//! Ephemeral, token-scoped FHIR session gateway.
//!
//! Sits between client applications and a per-user linked-data pod: an
//! in-memory, per-access-token FHIR-shaped record store, lazily hydrated
//! from and written through to the pod, garbage-collected on token expiry.

pub mod api;
pub mod auth;
pub mod conformance;
pub mod config;
pub mod error;
pub mod hydration;
pub mod logging;
pub mod pod;
pub mod resources;
pub mod services;
pub mod session;
pub mod state;
mod testdata;

pub use error::{Error, Result};
