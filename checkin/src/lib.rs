//! Weekly check-in step sequencer.
//!
//! This crate drives the check-in wizard: a persisted, branch-aware state
//! machine that walks a user through a variable-length sequence of screens,
//! different for each experiment arm, and resumes where it stopped after a
//! restart. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (flows, skip rules, due window).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting storage (the durable key/value store, the
//!   persisted step slot, session flags, configuration).
//!
//! [`sequencer`] combines both behind the operations screens call,
//! [`completion`] finalizes a flow, and [`navigation`] delivers the current
//! step to the external router once it is ready.

pub mod completion;
pub mod core;
pub mod errors;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod navigation;
pub mod sequencer;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
