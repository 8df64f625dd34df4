//! # rgy-core: Foundational Types for the Registry Core
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on:
//!
//! - [`Timestamp`]: UTC, seconds precision, with `start_of_time()` and
//!   `end_of_time()` sentinels and saturating, leap-safe arithmetic.
//! - [`EntityKey`]: opaque key for every persisted entity. Cross-entity
//!   references are keys, never pointers.
//! - [`ClientId`]: validated registrar identifier.
//! - [`Money`]: currency amount in minor units.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rgy-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use error::CoreError;
pub use identity::{ClientId, EntityKey};
pub use money::Money;
pub use temporal::Timestamp;
