//! # API Route Modules
//!
//! Route modules for the seal tracking API surface:
//!
//! - `seals` — seal inventory and lifecycle transitions: listing,
//!   creation, bulk generation, assignment, issue, use, return,
//!   reactivation, cancellation, barcode checks, and the status report.
//! - `technicians` — technician self-service (register, login,
//!   my-seals, install, return) and admin management.
//! - `auth` — user login against the users table, returning an HS256
//!   JWT.
//! - `logs` — read-only audit log queries (admin).
//!
//! Each module exposes `router()` for endpoints behind the auth
//! middleware; `technicians` and `auth` additionally expose
//! `public_router()` for the unauthenticated login/registration paths.

pub mod auth;
pub mod logs;
pub mod seals;
pub mod technicians;
