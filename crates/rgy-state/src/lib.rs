//! # rgy-state: Time-Versioned Values and Lifecycle States
//!
//! State primitives shared by the billing engine and the flows:
//!
//! - **Timed transition map** (`timed.rs`): a piecewise-constant function of
//!   time starting at `START_OF_TIME`, validated on construction against a
//!   per-use-site [`TransitionRule`].
//!
//! - **Token validity** (`token.rs`): the `NotStarted → Valid → Ended`
//!   graph with `Cancelled` reachable from both live states, and
//!   [`AllocationToken`].
//!
//! - **Schedules** (`schedule.rs`): TLD launch phases and fee schedules,
//!   using permissive transitions.
//!
//! - **Status values** (`status.rs`): the resource status catalogue and the
//!   operations each status blocks.
//!
//! - **Transfer** (`transfer.rs`): the pending-transfer lifecycle and
//!   [`TransferData`].
//!
//! ## Design
//!
//! Status-like enums expose `valid_transitions()` and `is_terminal()` so the
//! same graph drives runtime checks and timed-map validation. No state is
//! represented by a bare string.

pub mod error;
pub mod schedule;
pub mod status;
pub mod timed;
pub mod token;
pub mod transfer;

pub use error::StateError;
pub use schedule::{FeeSchedule, TldState, TldStateSchedule};
pub use status::{GuardedOperation, StatusValue};
pub use timed::{AnyTransition, GraphTransitions, TimedTransitionMap, TransitionGraph, TransitionRule};
pub use token::{AllocationToken, TokenStatus, TokenStatusMap};
pub use transfer::{TransferData, TransferStatus};
