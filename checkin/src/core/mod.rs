//! Deterministic, pure logic behind the check-in wizard.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod flows;
pub mod schedule;
pub mod transitions;
pub mod types;
