//! Domain model and validation engine for the entity store.
//!
//! Everything in this crate is pure: no I/O, no logging, no async. The
//! storage crate and the HTTP layer build on these types.

pub mod entity;
pub mod error;
pub mod relationship;
pub mod schema;
pub mod types;
pub mod validation;
