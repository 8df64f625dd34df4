//! # rgy-flows: Registry Transactional Core
//!
//! Decides what a domain, contact or host effectively is at any instant and
//! what billing follows from each mutation.
//!
//! - **Resources** ([`resource`]): `Domain`, `Contact`, `Host` and the
//!   capability traits operations are written against.
//! - **Resolver** ([`resolver`]): the pure projection of a stored resource to
//!   `now`. Grace expiry, auto-renew and automatic transfer approval happen
//!   here and nowhere else.
//! - **Operations** ([`ops`]): create, renew, delete, restore, transfer and
//!   status changes. Each maps a resolved view to a [`FlowOutcome`].
//! - **Store** ([`store`]): in-memory, optimistic, with a by-name index that
//!   respects validity intervals.
//! - **Registry** ([`registry`]): load, resolve, operate and commit, with
//!   retry on contention.
//!
//! Configuration ([`config`]), time ([`clock`]) and prices ([`pricing`]) are
//! explicit values; nothing reads global state.

pub mod clock;
pub mod config;
pub mod error;
pub mod ops;
pub mod outcome;
pub mod pricing;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod store;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, RegistryConfig, TldConfig};
pub use error::FlowError;
pub use ops::{CreateRequest, FlowContext};
pub use outcome::{Entity, EntityChange, FlowOutcome};
pub use pricing::{PricedAction, Pricing, TldPricing};
pub use registry::Registry;
pub use resolver::{project, resolve, Precondition, ResolvedResource};
pub use resource::{
    Contact, DeletionPhase, Domain, EppResource, HasGracePeriods, HasTransferData, Host, Resource,
    ResourceBase, ResourceKind,
};
pub use store::InMemoryStore;
