//! # rgy-billing: Billing Records
//!
//! The entities a mutation produces alongside the updated resource:
//!
//! - **Events** ([`event`]): `OneTime`, `Recurring` and `Cancellation`
//!   billing events. The durable record consumed by invoicing.
//!
//! - **Grace periods** ([`grace`]): reversible windows after billable
//!   actions, plus the redemption overlay after a delete.
//!
//! - **Poll messages** ([`poll`]): registrar notifications, including
//!   notices about outcomes scheduled for the future.
//!
//! - **History** ([`history`]): one entry per mutation; parent of the
//!   events and messages it produced.
//!
//! All cross-references are [`rgy_core::EntityKey`] fields.

pub mod error;
pub mod event;
pub mod grace;
pub mod history;
pub mod poll;

pub use error::BillingError;
pub use event::{BillingEvent, BillingFlag, BillingReason, Cancellation, OneTime, Recurring};
pub use grace::{GracePeriod, GracePeriodStatus};
pub use history::{HistoryEntry, HistoryType};
pub use poll::{AutorenewPoll, OneTimePoll, PollMessage, TransferResponse};
