//! # seal-core — Seal Lifecycle Domain
//!
//! Pure domain logic for tracking physical tamper-evident security seals:
//!
//! - [`SealStatus`] — the closed set of lifecycle states. Unknown status
//!   strings are structurally unrepresentable; they are rejected at
//!   deserialization.
//! - [`lifecycle`] — the transition table ([`validate_transition`]) and
//!   actor capability checks ([`authorize`]). Pure predicates: the caller
//!   supplies the current state and the actor, this crate answers whether
//!   the operation is permitted and what the next state is.
//! - [`numbering`] — sequential seal-number batches for bulk generation.
//! - [`replay`] — reconstruct a seal's final status from its audit-log
//!   action sequence alone.
//!
//! No storage, no HTTP, no async. The `seal-api` crate executes these
//! rules inside database transactions.

pub mod lifecycle;
pub mod numbering;
pub mod replay;
pub mod status;

pub use lifecycle::{authorize, validate_transition, AccessError, Actor, Holder, SealOperation, TransitionError};
pub use numbering::{sequential_numbers, NumberingError};
pub use replay::{replay, ReplayError};
pub use status::SealStatus;
